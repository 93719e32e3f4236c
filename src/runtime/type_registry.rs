//! Type registry: message type names to constructors.
//!
//! The parser looks the matched entry's type name up here and hands the
//! resolved fields to the registered factory. A factory either builds the
//! message or rejects the field set; it never panics.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::bus::GenericMessage;

/// Resolved field values keyed by declared field name, in declaration order.
/// Absent paths are `Value::Null`.
pub type FieldValues = IndexMap<String, Value>;

/// Error type for message construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructError {
    #[error("message type not registered: {0}")]
    UnknownType(String),

    #[error("{type_name} rejected fields: {reason}")]
    Rejected { type_name: String, reason: String },
}

/// Trait for message constructors
pub trait MessageFactory<M>: Send + Sync {
    /// Build a message from its resolved fields.
    fn construct(&self, fields: FieldValues) -> Result<M, ConstructError>;
}

/// Closure-based implementation of MessageFactory
impl<M, F> MessageFactory<M> for F
where
    F: Fn(FieldValues) -> Result<M, ConstructError> + Send + Sync,
{
    fn construct(&self, fields: FieldValues) -> Result<M, ConstructError> {
        self(fields)
    }
}

/// Registry for storing and invoking message constructors
pub struct TypeRegistry<M> {
    factories: HashMap<String, Box<dyn MessageFactory<M>>>,
}

impl<M: 'static> TypeRegistry<M> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a constructor under `name`, replacing any previous one.
    ///
    /// # Example
    ///
    /// ```
    /// use topicmap::runtime::{ConstructError, FieldValues, TypeRegistry};
    ///
    /// let mut registry: TypeRegistry<String> = TypeRegistry::new();
    /// registry.register("Ping", Box::new(|fields: FieldValues| {
    ///     fields
    ///         .get("msg_id")
    ///         .and_then(|v| v.as_str())
    ///         .map(str::to_string)
    ///         .ok_or_else(|| ConstructError::Rejected {
    ///             type_name: "Ping".to_string(),
    ///             reason: "msg_id required".to_string(),
    ///         })
    /// }));
    /// assert!(registry.has_type("Ping"));
    /// ```
    pub fn register(&mut self, name: impl Into<String>, factory: Box<dyn MessageFactory<M>>) {
        self.factories.insert(name.into(), factory);
    }

    /// Register a serde-deserializable type.
    ///
    /// The field map is deserialized into `T` as if it were a JSON object.
    /// `Option` fields take absent paths and plain fields are required. A
    /// declared field that `T` has no slot for rejects the whole field set,
    /// whether or not `T` uses `#[serde(deny_unknown_fields)]`.
    ///
    /// ```
    /// use serde::Deserialize;
    /// use topicmap::runtime::TypeRegistry;
    ///
    /// #[derive(Debug, Deserialize)]
    /// struct KojiRepoChange {
    ///     msg_id: Option<String>,
    ///     repo_tag: Option<String>,
    /// }
    ///
    /// let mut registry: TypeRegistry<KojiRepoChange> = TypeRegistry::new();
    /// registry.register_type::<KojiRepoChange>("KojiRepoChange");
    /// ```
    pub fn register_type<T>(&mut self, name: impl Into<String>)
    where
        T: DeserializeOwned + Into<M> + 'static,
    {
        let type_name = name.into();
        let label = type_name.clone();

        self.register(
            type_name,
            Box::new(move |fields: FieldValues| -> Result<M, ConstructError> {
                let object: serde_json::Map<String, Value> = fields.into_iter().collect();
                let mut unexpected = Vec::new();

                let parsed: T = serde_ignored::deserialize(Value::Object(object), |path| {
                    if let serde_ignored::Path::Map {
                        parent: serde_ignored::Path::Root,
                        key,
                    } = path
                    {
                        unexpected.push(key);
                    }
                })
                .map_err(|e| ConstructError::Rejected {
                    type_name: label.clone(),
                    reason: e.to_string(),
                })?;

                if !unexpected.is_empty() {
                    return Err(ConstructError::Rejected {
                        type_name: label.clone(),
                        reason: format!("unexpected field(s): {}", unexpected.join(", ")),
                    });
                }

                Ok(parsed.into())
            }),
        );
    }

    /// Invoke the constructor registered under `name`.
    pub fn construct(&self, name: &str, fields: FieldValues) -> Result<M, ConstructError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConstructError::UnknownType(name.to_string()))?;

        factory.construct(fields)
    }

    /// Check if a type is registered
    pub fn has_type(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Get list of all registered type names
    pub fn list_types(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.factories.len()
    }
}

impl TypeRegistry<GenericMessage> {
    /// Register `name` as a schemaless type that accepts any field set.
    pub fn register_generic(&mut self, name: impl Into<String>) {
        let type_name = name.into();
        let label = type_name.clone();

        self.register(
            type_name,
            Box::new(move |fields: FieldValues| -> Result<GenericMessage, ConstructError> {
                Ok(GenericMessage::new(label.clone(), fields))
            }),
        );
    }
}

impl<M: 'static> Default for TypeRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}
