/// Runtime settings for topicmap binaries
///
/// Read from the environment, with command-line flags taking precedence
/// where a binary offers them.

use std::path::PathBuf;

pub const MAPPING_ENV: &str = "TOPICMAP_MAPPING";
pub const LOG_ENV: &str = "RUST_LOG";

const DEFAULT_MAPPING: &str = "mapping.yaml";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Mapping table file (YAML or JSON)
    pub mapping_path: PathBuf,
    /// `tracing-subscriber` filter directive
    pub log_filter: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            mapping_path: lookup(MAPPING_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAPPING)),
            log_filter: lookup(LOG_ENV)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Override the mapping path when one is given.
    pub fn with_mapping_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.mapping_path = path;
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}
