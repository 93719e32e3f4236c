//! Integration tests for topic patterns, field paths and the schemaless registry

use serde::Deserialize;
use serde_json::{json, Value};
use topicmap::{GenericMessage, InboundMessage, MappingTable, MessageParser, TypeRegistry};

#[derive(Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct Foo {
    msg_id: Option<String>,
    tag: Option<String>,
}

fn mapping(matches: &str) -> MappingTable {
    MappingTable::from_yaml_str(&format!(
        r#"
Foo:
  matches: ["{}"]
  topic: topic
  msg_id: headers.message-id
  tag: msg.repo.tag_name
"#,
        matches
    ))
    .unwrap()
}

fn foo_parser(matches: &str) -> MessageParser<Foo> {
    let mut registry = TypeRegistry::new();
    registry.register_type::<Foo>("Foo");
    MessageParser::new(mapping(matches).into(), registry)
}

fn message() -> InboundMessage {
    InboundMessage::from_value(json!({
        "topic": "/t/a.b.done",
        "headers": {"message-id": "x1"},
        "msg": {"repo": {"tag_name": "t1"}},
    }))
    .unwrap()
}

#[test]
fn test_literal_match() {
    let foo = foo_parser("/t/a.b.done").parse(&message());

    assert_eq!(
        foo,
        Some(Foo {
            msg_id: Some("x1".to_string()),
            tag: Some("t1".to_string()),
        })
    );
}

#[test]
fn test_wildcard_match() {
    let foo = foo_parser("/t/a.b.*").parse(&message());

    assert_eq!(
        foo,
        Some(Foo {
            msg_id: Some("x1".to_string()),
            tag: Some("t1".to_string()),
        })
    );
}

#[test]
fn test_wildcard_requires_final_segment() {
    let parser = foo_parser("a.b.*");

    assert!(parser.parse(&InboundMessage::new("a.b.c")).is_some());
    assert!(parser.parse(&InboundMessage::new("a.b")).is_none());
}

#[test]
fn test_missing_payload_resolves_to_none() {
    let mut msg = message();
    msg.remove("msg");

    assert_eq!(
        foo_parser("/t/a.b.done").parse(&msg),
        Some(Foo {
            msg_id: Some("x1".to_string()),
            tag: None,
        })
    );
}

#[test]
fn test_payload_of_wrong_shape_resolves_to_none() {
    let msg = message().with("msg", json!(["not", "a", "mapping"]));

    assert_eq!(
        foo_parser("/t/a.b.done").parse(&msg),
        Some(Foo {
            msg_id: Some("x1".to_string()),
            tag: None,
        })
    );
}

#[test]
fn test_non_string_topic_is_no_match() {
    let msg = InboundMessage::from_value(json!({"topic": ["/t/a.b.done"]})).unwrap();

    assert_eq!(foo_parser("/t/a.b.*").parse(&msg), None);
}

#[test]
fn test_generic_registry_keeps_structure() {
    let table = MappingTable::from_yaml_str(
        r#"
BuildDone:
  matches: /topic/VirtualTopic.eng.brew.build.*
  topic: topic
  msg_id: headers.message-id
  first_nvr: msg.builds.[0].nvr
  builds: msg.builds
"#,
    )
    .unwrap();

    let mut registry: TypeRegistry<GenericMessage> = TypeRegistry::new();
    for name in table.type_names() {
        registry.register_generic(name);
    }
    let parser: MessageParser<GenericMessage> = MessageParser::new(table.into(), registry);

    let msg = InboundMessage::new("/topic/VirtualTopic.eng.brew.build.complete")
        .with("msg", json!({"builds": [{"nvr": "pkg-1.0-1"}]}));
    let parsed = parser.parse(&msg).unwrap();

    assert_eq!(parsed.type_name(), "BuildDone");
    assert_eq!(parsed.get("msg_id"), Some(&Value::Null));
    assert_eq!(parsed.get("first_nvr"), Some(&json!("pkg-1.0-1")));
    assert_eq!(parsed.get("builds"), Some(&json!([{"nvr": "pkg-1.0-1"}])));
}

#[test]
fn test_classify_without_construction() {
    let parser = foo_parser("/t/*");
    let classification = parser.classify(&message()).unwrap();

    assert_eq!(classification.type_name, "Foo");
    assert_eq!(classification.fields.get("tag"), Some(&json!("t1")));
}
