//! Common library module for integration tests
// See https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

// Not every test file uses every function
#![allow(dead_code)]

use std::path::PathBuf;

use chainjson::tree::{ValueKind, ValueRef};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn get_test_data_file_path() -> PathBuf {
    // Get path of test file, see https://stackoverflow.com/a/30004252
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/test_data.json");
    path
}

#[derive(PartialEq, Debug)]
pub enum JsonEvent {
    ArrayStart,
    ArrayEnd,
    ObjectStart,
    ObjectEnd,
    MemberName(String),

    StringValue(String),
    // Contains string representation of number value
    NumberValue(String),
    BoolValue(bool),
    NullValue,
}

fn string_value(s: &str) -> JsonEvent {
    JsonEvent::StringValue(s.to_owned())
}

fn member_name(s: &str) -> JsonEvent {
    JsonEvent::MemberName(s.to_owned())
}

/// Gets the events expected for the parsed document at the path returned by
/// [`get_test_data_file_path`]
///
/// The parser stores all scalars as strings, so numbers and literals appear as
/// [`JsonEvent::StringValue`].
pub fn get_expected_events() -> Vec<JsonEvent> {
    vec![
        JsonEvent::ArrayStart,
        // Arrays
        JsonEvent::ArrayStart,
        JsonEvent::ArrayEnd,
        //   Array with single item
        JsonEvent::ArrayStart,
        string_value("1"),
        JsonEvent::ArrayEnd,
        //   Array with multiple items
        JsonEvent::ArrayStart,
        string_value("1"),
        string_value("a"),
        string_value("true"),
        JsonEvent::ObjectStart,
        member_name("nested"),
        JsonEvent::ArrayStart,
        JsonEvent::ObjectStart,
        member_name("nested2"),
        JsonEvent::ArrayStart,
        string_value("2"),
        JsonEvent::ArrayEnd,
        JsonEvent::ObjectEnd,
        JsonEvent::ArrayEnd,
        JsonEvent::ObjectEnd,
        JsonEvent::ArrayEnd,
        // Objects
        JsonEvent::ObjectStart,
        JsonEvent::ObjectEnd,
        //   Object with single member
        JsonEvent::ObjectStart,
        member_name("name"),
        string_value("1"),
        JsonEvent::ObjectEnd,
        //   Object with multiple members, including duplicate and empty names
        JsonEvent::ObjectStart,
        member_name("name1"),
        string_value("false"),
        member_name("name2"),
        string_value("value"),
        member_name("name1"),
        string_value("2"),
        member_name(""),
        string_value("3"),
        JsonEvent::ObjectEnd,
        // Strings
        string_value("string"),
        string_value("\u{00E9} \u{20AC} \u{1F600}"),
        string_value("AA/"),
        // Unquoted scalars
        string_value("-1.5e3"),
        string_value("null"),
        JsonEvent::ArrayEnd,
    ]
}

/// Collects the events describing `value` and everything nested inside it
///
/// Recursive, so only suitable for documents of moderate depth.
pub fn collect_events(value: ValueRef<'_>, events: &mut Vec<JsonEvent>) {
    match value.kind() {
        ValueKind::Object => {
            events.push(JsonEvent::ObjectStart);
            for member in value.as_object().unwrap().members() {
                events.push(member_name(member.name_str().unwrap()));
                collect_events(member.value(), events);
            }
            events.push(JsonEvent::ObjectEnd);
        }
        ValueKind::Array => {
            events.push(JsonEvent::ArrayStart);
            for element in value.elements().unwrap() {
                collect_events(element, events);
            }
            events.push(JsonEvent::ArrayEnd);
        }
        ValueKind::String => events.push(string_value(value.as_str().unwrap())),
        ValueKind::Integer => {
            events.push(JsonEvent::NumberValue(value.as_i64().unwrap().to_string()))
        }
        ValueKind::Double => {
            events.push(JsonEvent::NumberValue(value.as_f64().unwrap().to_string()))
        }
        ValueKind::Boolean => events.push(JsonEvent::BoolValue(value.as_bool().unwrap())),
        ValueKind::Null => events.push(JsonEvent::NullValue),
        ValueKind::Uninitialized => panic!("Unexpected uninitialized value"),
    }
}

pub fn document_events(value: ValueRef<'_>) -> Vec<JsonEvent> {
    let mut events = Vec::new();
    collect_events(value, &mut events);
    events
}

/// Creates JSON text with `depth` nested arrays, the innermost one containing `"x"`
pub fn nested_arrays(depth: usize) -> String {
    let mut json = "[".repeat(depth);
    json.push_str("\"x\"");
    json.push_str(&"]".repeat(depth));
    json
}
