//! Runtime for topic classification and typed message construction.
//!
//! This module holds the mapping table, the topic matcher, the type registry
//! and the parser that ties them together.

pub mod mapping_table;
pub mod message_parser;
pub mod topic_matcher;
pub mod type_registry;

// Re-export key types
pub use mapping_table::{
    EntryDiagnostic, MappingEntry, MappingError, MappingTable, SharedMappingTable, TOPIC_FIELD,
};
pub use message_parser::{Classification, MessageParser, ParseError};
pub use topic_matcher::{RawMatches, TopicPattern, TopicPatterns};
pub use type_registry::{ConstructError, FieldValues, MessageFactory, TypeRegistry};
