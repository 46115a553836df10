//! Invocation schema parsed from the string-encoded `ToolSchema` field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Structured description of the input a capability accepts and the output it
/// promises.
///
/// The schema is parsed once when the contract is constructed. Text that is not
/// a JSON object degrades to the empty schema instead of failing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationSchema(Map<String, Value>);

impl InvocationSchema {
    /// Returns the empty schema.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a string-encoded schema, falling back to the empty schema.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(value),
            Err(_) => Self::empty(),
        }
    }

    /// Wraps an already decoded value; anything but an object is empty.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::empty(),
        }
    }

    /// Returns `true` when the schema carries no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw schema object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the declared `input` section when it is present and non-empty.
    #[must_use]
    pub fn input(&self) -> Option<&Value> {
        self.0.get("input").filter(|value| !is_blank(value))
    }

    /// Returns the declared `output.format` when it is a non-blank string.
    #[must_use]
    pub fn output_format(&self) -> Option<&str> {
        self.0
            .get("output")
            .and_then(|output| output.get("format"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|format| !format.is_empty())
    }

    /// Builds the JSON Schema advertised to protocol clients for tool input.
    ///
    /// An `input` that already declares a `type` is passed through. An
    /// `input.parameters` map becomes the object's properties, together with
    /// `input.required`. Any other object is read as a bare properties map.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let Some(Value::Object(input)) = self.input() else {
            return json!({ "type": "object", "properties": {} });
        };

        if input.contains_key("type") {
            return Value::Object(input.clone());
        }

        let mut schema = Map::new();
        schema.insert("type".into(), Value::from("object"));
        if let Some(parameters) = input.get("parameters") {
            schema.insert("properties".into(), parameters.clone());
            if let Some(required) = input.get("required").filter(|v| v.is_array()) {
                schema.insert("required".into(), required.clone());
            }
        } else {
            schema.insert("properties".into(), Value::Object(input.clone()));
        }
        Value::Object(schema)
    }

    /// Encodes the schema back into its string wire form.
    #[must_use]
    pub fn to_wire_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_text_degrades_to_empty() {
        assert!(InvocationSchema::parse("{not json").is_empty());
        assert!(InvocationSchema::parse("[1, 2]").is_empty());
        assert!(InvocationSchema::parse("").is_empty());
    }

    #[test]
    fn exposes_input_and_output_format() {
        let schema = InvocationSchema::parse(
            r#"{"input":{"parameters":{"query":{"type":"string"}},"required":["query"]},"output":{"format":"json"}}"#,
        );
        assert!(schema.input().is_some());
        assert_eq!(schema.output_format(), Some("json"));

        let input = schema.input_schema();
        assert_eq!(input["type"], "object");
        assert_eq!(input["properties"]["query"]["type"], "string");
        assert_eq!(input["required"][0], "query");
    }

    #[test]
    fn blank_sections_are_missing() {
        let schema = InvocationSchema::parse(r#"{"input":{},"output":{"format":"  "}}"#);
        assert!(schema.input().is_none());
        assert!(schema.output_format().is_none());
        assert_eq!(schema.input_schema()["properties"], json!({}));
    }

    #[test]
    fn typed_input_passes_through() {
        let schema = InvocationSchema::parse(
            r#"{"input":{"type":"object","properties":{"n":{"type":"integer"}}}}"#,
        );
        assert_eq!(schema.input_schema()["properties"]["n"]["type"], "integer");
    }
}
