//! # Topicmap: Topic-Pattern Message Classification
//!
//! Topicmap turns raw pub/sub bus messages (a topic plus a nested payload of
//! headers and body fields) into typed messages, driven by a mapping table.
//!
//! ## Features
//!
//! - **Topic matching**: literal topics or shell-style globs (`/topic/VirtualTopic.koji.repo.*`)
//! - **Dotted-path extraction**: `headers.message-id`, `body.msg.decision_context`, `msg.builds.[0].nvr`
//! - **Type registry**: any `serde::Deserialize` type, or a closure, per message type name
//! - **Hot reload**: the mapping table sits behind a swappable shared handle
//! - **Safe degradation**: every defect yields "no message", never a panic
//!
//! ## Example: Mapping Table
//!
//! ```yaml
//! KojiRepoChange:
//!   matches:
//!     - /topic/VirtualTopic.koji.repo.done
//!   topic: topic
//!   msg_id: headers.message-id
//!   repo_tag: msg.repo.tag_name
//!
//! GreenwaveDecisionUpdate:
//!   matches: /topic/VirtualTopic.eng.greenwave.decision.update
//!   topic: topic
//!   msg_id: headers.message-id
//!   decision_context: body.msg.decision_context
//!   policies_satisfied: body.msg.policies_satisfied
//! ```

// Core modules
pub mod extraction;
pub mod settings;

// Inbound and schemaless message types
pub mod bus;

// Mapping table, matcher, registry and parser
pub mod runtime;

// Re-export key types
pub use bus::{GenericMessage, InboundMessage};
pub use extraction::{FieldPath, PathSegment};
pub use settings::Settings;

pub use runtime::{
    Classification, ConstructError, FieldValues, MappingEntry, MappingError, MappingTable,
    MessageParser, ParseError, SharedMappingTable, TypeRegistry,
};
