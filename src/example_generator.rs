//! Example JSON payloads synthesized from Go type names and variable names.
//!
//! All output is compact single-line JSON text, ready to be placed verbatim in a
//! request body.

use crate::type_resolver::StructField;

/// Shape used when a body is read without any decode target, e.g. `io.ReadAll(r.Body)`.
pub const REQUEST_SHAPE: &str = r#"{"data":"string","parameters":{}}"#;

const USER_SHAPE: &str = r#"{"name":"string","email":"string","id":"string"}"#;
const CREATE_SHAPE: &str = r#"{"name":"string","value":"string","type":"string"}"#;
const UPDATE_SHAPE: &str = r#"{"id":"string","name":"string","value":"string"}"#;
const DELETE_SHAPE: &str = r#"{"id":"string","reason":"string"}"#;
const GENERIC_SHAPE: &str =
    r#"{"id":"string","name":"string","value":"string","timestamp":"2024-01-01T00:00:00Z"}"#;

const INTEGER_TYPES: &[&str] = &[
    "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "byte", "rune",
];

/// Representative JSON value for a canonical type string.
///
/// # Examples
///
/// ```
/// use postman_from_source::example_generator::value_for_type;
///
/// assert_eq!(value_for_type("[]int64"), "[0]");
/// assert_eq!(value_for_type("*bool"), "false");
/// assert_eq!(value_for_type("uuid.UUID"), "\"string\"");
/// ```
pub fn value_for_type(type_name: &str) -> String {
    if let Some(inner) = type_name.strip_prefix('*') {
        return value_for_type(inner);
    }
    if let Some(element) = type_name.strip_prefix("[]") {
        return format!("[{}]", value_for_type(element));
    }
    if type_name.starts_with("map[") {
        return "{}".to_string();
    }
    match type_name {
        "string" => r#""string""#.to_string(),
        "float32" | "float64" => "0.0".to_string(),
        "bool" => "false".to_string(),
        t if INTEGER_TYPES.contains(&t) => "0".to_string(),
        _ => r#""string""#.to_string(),
    }
}

/// Renders struct fields as a JSON object, skipping fields excluded with `json:"-"`.
///
/// Keys keep declaration order and are JSON-escaped; no whitespace is emitted.
pub fn render_struct_json(fields: &[StructField]) -> String {
    let pairs: Vec<String> = fields
        .iter()
        .filter(|f| f.is_serialized())
        .map(|f| format!("{}:{}", json_key(&f.json_key), value_for_type(&f.type_name)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

fn json_key(key: &str) -> String {
    serde_json::to_string(key).unwrap_or_else(|_| format!("\"{}\"", key))
}

/// Guesses a payload from the name of the variable a body is decoded into.
///
/// The first matching substring of the lower-cased name decides the shape.
pub fn body_for_variable_name(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("user") {
        USER_SHAPE
    } else if has("create") || has("post") {
        CREATE_SHAPE
    } else if has("update") || has("put") || has("patch") {
        UPDATE_SHAPE
    } else if has("delete") {
        DELETE_SHAPE
    } else if has("request") || has("req") {
        REQUEST_SHAPE
    } else {
        GENERIC_SHAPE
    }
}
