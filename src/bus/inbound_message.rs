/// Inbound bus message
///
/// A topic plus a loosely-typed payload tree (`headers`, `msg`, `body`, ...).
/// No schema is imposed; field paths decide what is read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extraction::FieldPath;

const TOPIC_KEY: &str = "topic";
const HEADERS_KEY: &str = "headers";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InboundMessage {
    root: Map<String, Value>,
}

impl InboundMessage {
    /// Create a message with only a topic set
    pub fn new(topic: impl Into<String>) -> Self {
        let mut root = Map::new();
        root.insert(TOPIC_KEY.to_string(), Value::String(topic.into()));
        Self { root }
    }

    /// Wrap an already-deserialized value; `None` unless it is a mapping.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(root) => Some(Self { root }),
            _ => None,
        }
    }

    /// Set a header, creating the headers mapping if needed
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let headers = self
            .root
            .entry(HEADERS_KEY)
            .or_insert_with(|| Value::Object(Map::new()));

        if !headers.is_object() {
            *headers = Value::Object(Map::new());
        }
        if let Value::Object(map) = headers {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Set a top-level payload key (e.g. `msg`, `body`)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.root.insert(key.into(), value.into());
        self
    }

    /// The routing topic. `None` if missing or not a string.
    pub fn topic(&self) -> Option<&str> {
        self.root.get(TOPIC_KEY).and_then(Value::as_str)
    }

    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.root.get(HEADERS_KEY).and_then(Value::as_object)
    }

    /// Resolve a dotted path against the whole message.
    pub fn resolve(&self, path: &FieldPath) -> Option<&Value> {
        path.resolve_in(&self.root)
    }

    /// Remove a top-level key, returning its value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.root.remove(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}
