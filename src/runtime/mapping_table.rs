//! Mapping table: per message type, the topic patterns it answers to and the
//! dotted paths its fields are extracted from.
//!
//! Configuration shape (YAML or JSON):
//!
//! ```yaml
//! KojiRepoChange:
//!   matches: /topic/VirtualTopic.koji.repo.*     # or a list of patterns
//!   topic: topic
//!   msg_id: headers.message-id
//!   repo_tag: msg.repo.tag_name
//! ```
//!
//! Only a document that is not a mapping of type names fails the load. A
//! malformed entry (non-string path, bad `matches`, body that is not a
//! mapping) is kept as loaded with its defects recorded; it never produces a
//! message, and its siblings are unaffected.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::extraction::FieldPath;
use crate::runtime::topic_matcher::{RawMatches, TopicPatterns};

/// Field name every entry must declare to be constructible.
pub const TOPIC_FIELD: &str = "topic";

/// Key that holds the topic patterns of an entry.
pub const MATCHES_KEY: &str = "matches";

/// Errors raised while loading a mapping table.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed to read mapping file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse mapping: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid pattern '{pattern}' in entry '{type_name}': {source}")]
    InvalidPattern {
        type_name: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Entry as written in configuration, before validation.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    matches: Option<serde_yaml::Value>,

    #[serde(flatten)]
    fields: IndexMap<String, serde_yaml::Value>,
}

/// One declared message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    type_name: String,
    patterns: TopicPatterns,
    fields: IndexMap<String, FieldPath>,
    defects: Vec<EntryDiagnostic>,
}

impl MappingEntry {
    /// Create an entry answering to `patterns`, with no fields declared yet.
    ///
    /// # Example
    /// ```
    /// use topicmap::runtime::MappingEntry;
    ///
    /// let entry = MappingEntry::new("KojiRepoChange", ["/topic/VirtualTopic.koji.repo.*"])
    ///     .unwrap()
    ///     .with_field("topic", "topic")
    ///     .with_field("repo_tag", "msg.repo.tag_name");
    ///
    /// assert!(entry.matches_topic("/topic/VirtualTopic.koji.repo.done"));
    /// assert!(entry.has_topic_field());
    /// ```
    pub fn new<I, S>(type_name: impl Into<String>, patterns: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let type_name = type_name.into();
        let patterns = TopicPatterns::compile(patterns).map_err(|(pattern, source)| {
            MappingError::InvalidPattern {
                type_name: type_name.clone(),
                pattern,
                source,
            }
        })?;

        Ok(Self {
            type_name,
            patterns,
            fields: IndexMap::new(),
            defects: Vec::new(),
        })
    }

    /// Create an entry with no `matches`; it can never be selected.
    pub fn unmatchable(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            patterns: TopicPatterns::default(),
            fields: IndexMap::new(),
            defects: Vec::new(),
        }
    }

    /// Declare (or redeclare) a field and its dotted path.
    pub fn with_field(mut self, name: impl Into<String>, path: &str) -> Self {
        self.fields.insert(name.into(), FieldPath::from_dotted(path));
        self
    }

    /// Drop a field declaration, returning its path if it existed.
    pub fn remove_field(&mut self, name: &str) -> Option<FieldPath> {
        self.fields.shift_remove(name)
    }

    /// Replace the topic patterns.
    pub fn set_patterns(&mut self, patterns: TopicPatterns) {
        self.patterns = patterns;
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn patterns(&self) -> &TopicPatterns {
        &self.patterns
    }

    /// Declared fields in configuration order.
    pub fn fields(&self) -> &IndexMap<String, FieldPath> {
        &self.fields
    }

    /// True if any of this entry's patterns matches `topic`.
    pub fn matches_topic(&self, topic: &str) -> bool {
        self.patterns.matches(topic)
    }

    pub fn has_topic_field(&self) -> bool {
        self.fields.contains_key(TOPIC_FIELD)
    }

    /// Fields passed to the constructor: every declaration except `topic`.
    pub fn construction_fields(&self) -> impl Iterator<Item = (&String, &FieldPath)> {
        self.fields.iter().filter(|(name, _)| name.as_str() != TOPIC_FIELD)
    }

    /// Names of declared fields whose path could not be loaded.
    pub fn invalid_fields(&self) -> impl Iterator<Item = &str> {
        self.defects.iter().filter_map(|defect| match defect {
            EntryDiagnostic::InvalidField { field, .. } => Some(field.as_str()),
            _ => None,
        })
    }

    /// Defects recorded while loading this entry.
    pub fn defects(&self) -> &[EntryDiagnostic] {
        &self.defects
    }

    fn from_config(type_name: String, value: serde_yaml::Value) -> Self {
        let raw: RawEntry = match serde_yaml::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                let mut entry = Self::unmatchable(type_name);
                entry.defects.push(EntryDiagnostic::InvalidEntry(e.to_string()));
                return entry;
            }
        };

        let mut entry = Self::unmatchable(type_name);
        match raw.matches.map(serde_yaml::from_value::<Option<RawMatches>>) {
            None | Some(Ok(None)) => {}
            Some(Ok(Some(matches))) => match TopicPatterns::compile(matches.into_vec()) {
                Ok(patterns) => entry.patterns = patterns,
                Err((pattern, e)) => entry.defects.push(EntryDiagnostic::InvalidMatches(format!(
                    "pattern '{}': {}",
                    pattern, e
                ))),
            },
            Some(Err(e)) => entry
                .defects
                .push(EntryDiagnostic::InvalidMatches(e.to_string())),
        }

        for (name, value) in raw.fields {
            match value.as_str() {
                Some(path) => {
                    entry.fields.insert(name, FieldPath::from_dotted(path));
                }
                None => entry.defects.push(EntryDiagnostic::InvalidField {
                    field: name,
                    reason: "path must be a string".to_string(),
                }),
            }
        }

        entry
    }
}

/// A defect that keeps an entry from ever producing a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDiagnostic {
    /// `matches` absent or empty
    NoPatterns,
    /// No `topic` field declared
    NoTopicField,
    /// Entry body is not a mapping of field names
    InvalidEntry(String),
    /// `matches` is neither a pattern nor a list of patterns, or a pattern does not compile
    InvalidMatches(String),
    /// A field path is not a string
    InvalidField { field: String, reason: String },
}

impl std::fmt::Display for EntryDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDiagnostic::NoPatterns => write!(f, "no '{}' patterns; entry never matches", MATCHES_KEY),
            EntryDiagnostic::NoTopicField => {
                write!(f, "no '{}' field declared; matches produce no message", TOPIC_FIELD)
            }
            EntryDiagnostic::InvalidEntry(reason) => write!(f, "invalid entry: {}", reason),
            EntryDiagnostic::InvalidMatches(reason) => {
                write!(f, "invalid '{}': {}", MATCHES_KEY, reason)
            }
            EntryDiagnostic::InvalidField { field, reason } => {
                write!(f, "invalid field '{}': {}", field, reason)
            }
        }
    }
}

/// Ordered set of mapping entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    /// Parse a mapping table from YAML (JSON is accepted too).
    pub fn from_yaml_str(contents: &str) -> Result<Self, MappingError> {
        let raw: IndexMap<String, serde_yaml::Value> = serde_yaml::from_str(contents)?;

        let entries: Vec<MappingEntry> = raw
            .into_iter()
            .map(|(type_name, value)| MappingEntry::from_config(type_name, value))
            .collect();

        for entry in &entries {
            for defect in entry.defects() {
                tracing::warn!("Mapping entry '{}': {}", entry.type_name(), defect);
            }
        }

        Ok(Self { entries })
    }

    /// Load a mapping table from a YAML or JSON file.
    ///
    /// # Example
    /// ```ignore
    /// use topicmap::runtime::MappingTable;
    ///
    /// let table = MappingTable::load_from_file("config/mapping.yaml")?;
    /// println!("{} message types", table.len());
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let table = Self::from_yaml_str(&contents)?;
        tracing::info!(
            "Loaded {} mapping entries from {}",
            table.len(),
            path.display()
        );

        Ok(table)
    }

    /// Build a table from already-constructed entries, keeping their order.
    pub fn from_entries(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    /// Entries in configuration order.
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn get(&self, type_name: &str) -> Option<&MappingEntry> {
        self.entries.iter().find(|e| e.type_name == type_name)
    }

    pub fn get_mut(&mut self, type_name: &str) -> Option<&mut MappingEntry> {
        self.entries.iter_mut().find(|e| e.type_name == type_name)
    }

    /// Append an entry, replacing any existing entry of the same type in place.
    pub fn insert(&mut self, entry: MappingEntry) {
        match self.get_mut(&entry.type_name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove(&mut self, type_name: &str) -> Option<MappingEntry> {
        let index = self.entries.iter().position(|e| e.type_name == type_name)?;
        Some(self.entries.remove(index))
    }

    /// Find the first entry whose patterns match `topic`.
    pub fn find_match(&self, topic: &str) -> Option<&MappingEntry> {
        self.entries.iter().find(|e| e.matches_topic(topic))
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.type_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that can never produce a message, with the reason.
    pub fn diagnostics(&self) -> Vec<(&str, EntryDiagnostic)> {
        let mut found = Vec::new();
        for entry in &self.entries {
            let name = entry.type_name.as_str();
            found.extend(entry.defects.iter().map(|defect| (name, defect.clone())));

            let unreadable = entry
                .defects
                .iter()
                .any(|defect| matches!(defect, EntryDiagnostic::InvalidEntry(_)));
            let bad_matches = entry
                .defects
                .iter()
                .any(|defect| matches!(defect, EntryDiagnostic::InvalidMatches(_)));

            if entry.patterns.is_empty() && !unreadable && !bad_matches {
                found.push((name, EntryDiagnostic::NoPatterns));
            }
            if !entry.has_topic_field() && !unreadable {
                found.push((name, EntryDiagnostic::NoTopicField));
            }
        }
        found
    }
}

/// Shared, hot-swappable handle to the current mapping table.
///
/// Readers take an immutable snapshot; writers swap in a whole new table.
#[derive(Debug, Clone, Default)]
pub struct SharedMappingTable {
    current: Arc<RwLock<Arc<MappingTable>>>,
}

impl SharedMappingTable {
    pub fn new(table: MappingTable) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    /// The table as of now. Later replacements do not affect the snapshot.
    pub fn snapshot(&self) -> Arc<MappingTable> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a new table, returning the previous one.
    pub fn replace(&self, table: MappingTable) -> Arc<MappingTable> {
        let count = table.len();
        let previous = std::mem::replace(&mut *self.current.write(), Arc::new(table));
        tracing::info!("Mapping table replaced ({} entries)", count);
        previous
    }

    /// Copy the current table, edit the copy, and swap it in.
    pub fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut MappingTable),
    {
        let mut guard = self.current.write();
        let mut table = (**guard).clone();
        edit(&mut table);
        *guard = Arc::new(table);
    }

    /// Reload from a file; the current table stays in place on error.
    pub fn reload_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), MappingError> {
        let table = MappingTable::load_from_file(path)?;
        self.replace(table);
        Ok(())
    }
}

impl From<MappingTable> for SharedMappingTable {
    fn from(table: MappingTable) -> Self {
        Self::new(table)
    }
}
