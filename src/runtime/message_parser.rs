//! Message parser: topic classification and typed construction.
//!
//! For one inbound message:
//! 1. Read the topic (no topic, no match)
//! 2. Scan mapping entries in order; the first whose patterns match wins
//! 3. Require valid field paths and a `topic` field declaration on that entry
//! 4. Resolve every other declared field path (absent paths become `null`)
//! 5. Hand the fields to the registered constructor for the entry's type
//!
//! Every failure collapses to "no message" for `parse`; `try_parse` reports
//! the reason.

use crate::bus::InboundMessage;
use crate::runtime::mapping_table::{MappingEntry, SharedMappingTable};
use crate::runtime::type_registry::{ConstructError, FieldValues, TypeRegistry};

/// Why a message produced no typed result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("message has no topic")]
    MissingTopic,

    #[error("no mapping entry matches topic '{topic}'")]
    NoMatchingEntry { topic: String },

    #[error("mapping entry '{type_name}' has an invalid path for field '{field}'")]
    InvalidField { type_name: String, field: String },

    #[error("mapping entry '{type_name}' declares no 'topic' field")]
    MissingTopicField { type_name: String },

    #[error("mapping entry '{type_name}' has no registered message type")]
    UnknownType { type_name: String },

    #[error("construction failed: {0}")]
    Construction(ConstructError),
}

impl ParseError {
    /// True for defects in the mapping table or registry rather than in the message.
    pub fn is_config_defect(&self) -> bool {
        matches!(
            self,
            ParseError::InvalidField { .. }
                | ParseError::MissingTopicField { .. }
                | ParseError::UnknownType { .. }
                | ParseError::Construction(_)
        )
    }
}

/// Outcome of matching and field resolution, before construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub type_name: String,
    pub topic: String,
    /// Constructor fields in declaration order (`topic` excluded)
    pub fields: FieldValues,
}

/// Classifies inbound messages against a mapping table and builds typed
/// messages through a type registry.
///
/// The table is re-read on every call, so replacing it through the shared
/// handle takes effect on the next message.
pub struct MessageParser<M> {
    table: SharedMappingTable,
    registry: TypeRegistry<M>,
}

impl<M: 'static> MessageParser<M> {
    /// Create a new message parser.
    ///
    /// # Example
    /// ```
    /// use serde::Deserialize;
    /// use topicmap::{InboundMessage, MappingTable, MessageParser, TypeRegistry};
    ///
    /// #[derive(Debug, Deserialize)]
    /// #[serde(deny_unknown_fields)]
    /// struct Foo {
    ///     msg_id: Option<String>,
    ///     tag: Option<String>,
    /// }
    ///
    /// let table = MappingTable::from_yaml_str(r#"
    /// Foo:
    ///   matches: ["/t/a.b.*"]
    ///   topic: topic
    ///   msg_id: headers.message-id
    ///   tag: msg.repo.tag_name
    /// "#).unwrap();
    ///
    /// let mut registry: TypeRegistry<Foo> = TypeRegistry::new();
    /// registry.register_type::<Foo>("Foo");
    ///
    /// let parser = MessageParser::new(table.into(), registry);
    /// let msg = InboundMessage::new("/t/a.b.done").with_header("message-id", "x1");
    ///
    /// let foo = parser.parse(&msg).unwrap();
    /// assert_eq!(foo.msg_id.as_deref(), Some("x1"));
    /// assert_eq!(foo.tag, None);
    /// ```
    pub fn new(table: SharedMappingTable, registry: TypeRegistry<M>) -> Self {
        Self { table, registry }
    }

    /// Parse a message into its typed form, or `None` if it does not cleanly
    /// resolve to exactly one constructible message.
    pub fn parse(&self, message: &InboundMessage) -> Option<M> {
        match self.try_parse(message) {
            Ok(parsed) => Some(parsed),
            Err(err) if err.is_config_defect() => {
                tracing::warn!("Message not parsed: {}", err);
                None
            }
            Err(err) => {
                tracing::debug!("Message not parsed: {}", err);
                None
            }
        }
    }

    /// Same as [`parse`](Self::parse), reporting why no message was produced.
    pub fn try_parse(&self, message: &InboundMessage) -> Result<M, ParseError> {
        let classification = self.classify(message)?;

        self.registry
            .construct(&classification.type_name, classification.fields)
            .map_err(|err| match err {
                ConstructError::UnknownType(type_name) => ParseError::UnknownType { type_name },
                rejected => ParseError::Construction(rejected),
            })
    }

    /// Match the topic and resolve fields without constructing anything.
    pub fn classify(&self, message: &InboundMessage) -> Result<Classification, ParseError> {
        let topic = message.topic().ok_or(ParseError::MissingTopic)?;

        let table = self.table.snapshot();
        let entry = table
            .find_match(topic)
            .ok_or_else(|| ParseError::NoMatchingEntry {
                topic: topic.to_string(),
            })?;

        if let Some(field) = entry.invalid_fields().next() {
            return Err(ParseError::InvalidField {
                type_name: entry.type_name().to_string(),
                field: field.to_string(),
            });
        }

        if !entry.has_topic_field() {
            return Err(ParseError::MissingTopicField {
                type_name: entry.type_name().to_string(),
            });
        }

        Ok(Classification {
            type_name: entry.type_name().to_string(),
            topic: topic.to_string(),
            fields: resolve_fields(entry, message),
        })
    }

    /// Parse each message independently, keeping input order.
    pub fn parse_batch<'a, I>(&self, messages: I) -> Vec<Option<M>>
    where
        I: IntoIterator<Item = &'a InboundMessage>,
    {
        messages.into_iter().map(|m| self.parse(m)).collect()
    }

    /// Handle to the mapping table this parser reads.
    pub fn table(&self) -> &SharedMappingTable {
        &self.table
    }

    pub fn registry(&self) -> &TypeRegistry<M> {
        &self.registry
    }
}

fn resolve_fields(entry: &MappingEntry, message: &InboundMessage) -> FieldValues {
    entry
        .construction_fields()
        .map(|(name, path)| {
            let value = message.resolve(path).cloned().unwrap_or_default();
            (name.clone(), value)
        })
        .collect()
}
