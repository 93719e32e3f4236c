/// Schemaless parsed message
///
/// The message type name plus every resolved field, for consumers that have
/// no compiled-in message types (the CLI, forwarding, debugging).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericMessage {
    #[serde(rename = "type")]
    type_name: String,

    fields: IndexMap<String, Value>,
}

impl GenericMessage {
    pub fn new(type_name: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// A field value; `Some(Value::Null)` for declared fields whose path was absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_shape() {
        let mut fields = IndexMap::new();
        fields.insert("msg_id".to_string(), json!("x1"));
        fields.insert("tag".to_string(), Value::Null);

        let msg = GenericMessage::new("Foo", fields);

        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"Foo","fields":{"msg_id":"x1","tag":null}}"#
        );
        assert_eq!(msg.get("tag"), Some(&Value::Null));
        assert_eq!(msg.get("other"), None);
    }
}
