//! Dotted-path field extraction over loosely-typed message payloads.
//!
//! Bus payloads have no fixed schema, so a path is resolved against a
//! `serde_json::Value` tree one segment at a time. Any miss yields `None`
//! rather than an error.

use serde_json::{Map, Value};
use std::fmt;

/// Represents a path to a field in a nested message
///
/// # Examples
///
/// - `topic` - top-level key
/// - `headers.message-id` - key inside the headers mapping
/// - `msg.builds.[0].nvr` - first element of a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// The raw path string
    pub raw: String,
    /// Parsed path segments
    pub segments: Vec<PathSegment>,
}

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A mapping key (e.g., "headers", "message-id")
    Field(String),
    /// A sequence index (e.g., [0], [5])
    Index(usize),
}

impl FieldPath {
    /// Parse a field path with a given delimiter
    ///
    /// # Example
    ///
    /// ```
    /// use topicmap::FieldPath;
    ///
    /// let path = FieldPath::parse("msg/repo/tag_name", "/");
    /// assert_eq!(path.segments.len(), 3);
    /// ```
    pub fn parse(path: &str, delimiter: &str) -> Self {
        let segments = path
            .split(delimiter)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with('[') && s.ends_with(']') {
                    if let Ok(index) = s[1..s.len() - 1].parse::<usize>() {
                        return PathSegment::Index(index);
                    }
                }

                PathSegment::Field(s.to_string())
            })
            .collect();

        Self {
            raw: path.to_string(),
            segments,
        }
    }

    /// Create a field path from a dotted string (the mapping table format)
    pub fn from_dotted(path: &str) -> Self {
        Self::parse(path, ".")
    }

    /// Walk `root` segment by segment.
    ///
    /// Returns `None` when a key is missing, an index is out of range, the
    /// walk hits a scalar before the path is exhausted, or the path is empty.
    ///
    /// ```
    /// use serde_json::json;
    /// use topicmap::FieldPath;
    ///
    /// let msg = json!({"headers": {"message-id": "a1"}});
    /// let path = FieldPath::from_dotted("headers.message-id");
    /// assert_eq!(path.resolve(&msg), Some(&json!("a1")));
    /// assert_eq!(FieldPath::from_dotted("headers.missing").resolve(&msg), None);
    /// ```
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        if self.segments.is_empty() {
            return None;
        }

        walk(root, &self.segments)
    }

    /// Resolve against a top-level mapping (an inbound message root).
    pub fn resolve_in<'a>(&self, root: &'a Map<String, Value>) -> Option<&'a Value> {
        match self.segments.split_first()? {
            (PathSegment::Field(key), rest) => walk(root.get(key)?, rest),
            (PathSegment::Index(_), _) => None,
        }
    }

    /// Resolve to an owned value, mapping "absent" to JSON `null`.
    pub fn resolve_or_null(&self, root: &Value) -> Value {
        self.resolve(root).cloned().unwrap_or(Value::Null)
    }
}

fn walk<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| match (segment, node) {
            (PathSegment::Field(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            // Bare numeric segments index sequences too ("builds.0.nvr")
            (PathSegment::Field(key), Value::Array(items)) => {
                key.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            _ => None,
        })
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
