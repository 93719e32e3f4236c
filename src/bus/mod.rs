/// Bus message types
///
/// Inbound messages as delivered (already deserialized) by a bus consumer,
/// and a schemaless result type for callers without typed messages.

pub mod inbound_message;
pub mod generic_message;

pub use inbound_message::InboundMessage;
pub use generic_message::GenericMessage;
