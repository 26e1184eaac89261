//! Decoding raw model text into a [`TargetShape`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::shape::{FieldKind, ObjectSchema, TargetShape};
use crate::error::{GatewayError, Result};

/// A decoded value matching its [`TargetShape`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StructuredResult {
    /// Object with exactly the declared fields.
    Object(Map<String, Value>),
    /// Ordered list of strings.
    Strings(Vec<String>),
    /// String-keyed map of arbitrary values.
    Mapping(Map<String, Value>),
    /// Ordered list of objects with exactly the declared fields.
    Objects(Vec<Map<String, Value>>),
}

impl StructuredResult {
    /// Converts the result into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Object(map) | Self::Mapping(map) => Value::Object(map),
            Self::Strings(items) => Value::Array(items.into_iter().map(Value::String).collect()),
            Self::Objects(items) => Value::Array(items.into_iter().map(Value::Object).collect()),
        }
    }

    /// Deserializes the result into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SchemaDecode`] if the value does not fit `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.into_value();
        serde_json::from_value::<T>(value.clone()).map_err(|e| GatewayError::SchemaDecode {
            shape: std::any::type_name::<T>().to_string(),
            message: e.to_string(),
            content: value.to_string(),
        })
    }
}

/// Decodes `raw` against `shape` in a single attempt.
///
/// A surrounding markdown code fence is stripped before parsing. Nothing
/// else in the text is altered.
///
/// # Errors
///
/// Returns [`GatewayError::SchemaDecode`] on malformed syntax, a missing
/// required field, or a type mismatch. No partial value is returned.
pub fn decode(raw: &str, shape: &TargetShape) -> Result<StructuredResult> {
    let text = strip_code_fence(raw);
    let fail = |message: String| {
        debug!(shape = %shape.name(), %message, "structured decode failed");
        GatewayError::SchemaDecode {
            shape: shape.name(),
            message,
            content: raw.to_string(),
        }
    };

    match shape {
        TargetShape::Object(schema) => {
            let value = parse_json(text).map_err(fail)?;
            validate_object(&value, schema, "$")
                .map(StructuredResult::Object)
                .map_err(fail)
        }
        TargetShape::ListOfStrings => decode_strings(text).map(StructuredResult::Strings).map_err(fail),
        TargetShape::Mapping => match parse_json(text).map_err(fail)? {
            Value::Object(map) => Ok(StructuredResult::Mapping(map)),
            other => Err(fail(format!("expected object, found {}", type_name(&other)))),
        },
        TargetShape::ListOf(schema) => match parse_json(text).map_err(fail)? {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| validate_object(item, schema, &format!("$[{i}]")))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(StructuredResult::Objects)
                .map_err(fail),
            other => Err(fail(format!("expected array, found {}", type_name(&other)))),
        },
    }
}

/// Strips a surrounding ```` ``` ```` or ```` ```json ```` fence.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the language tag on the opening fence line, if any.
    let inner = match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with(['{', '[']) => body,
        _ => inner,
    };
    inner.trim()
}

fn parse_json(text: &str) -> std::result::Result<Value, String> {
    serde_json::from_str(text).map_err(|e| format!("malformed JSON: {e}"))
}

/// Accepts a JSON array of strings, or a comma-separated line.
fn decode_strings(text: &str) -> std::result::Result<Vec<String>, String> {
    if !text.starts_with('[') {
        return Ok(text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect());
    }

    match parse_json(text)? {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s),
                other => Err(format!("$[{i}]: expected string, found {}", type_name(&other))),
            })
            .collect(),
        other => Err(format!("expected array, found {}", type_name(&other))),
    }
}

/// Validates `value` against `schema`, keeping only declared fields.
fn validate_object(
    value: &Value,
    schema: &ObjectSchema,
    path: &str,
) -> std::result::Result<Map<String, Value>, String> {
    let Value::Object(map) = value else {
        return Err(format!(
            "{path}: expected object `{}`, found {}",
            schema.name,
            type_name(value)
        ));
    };

    let mut decoded = Map::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let field_path = format!("{path}.{}", field.name);
        let field_value = map
            .get(&field.name)
            .ok_or_else(|| format!("{field_path}: missing required field"))?;
        decoded.insert(
            field.name.clone(),
            validate_field(field_value, &field.kind, &field_path)?,
        );
    }
    Ok(decoded)
}

fn validate_field(
    value: &Value,
    kind: &FieldKind,
    path: &str,
) -> std::result::Result<Value, String> {
    let mismatch = || {
        format!(
            "{path}: expected {}, found {}",
            kind.describe(),
            type_name(value)
        )
    };

    match kind {
        FieldKind::Any => Ok(value.clone()),
        FieldKind::String if value.is_string() => Ok(value.clone()),
        FieldKind::Integer if value.is_i64() || value.is_u64() => Ok(value.clone()),
        FieldKind::Number if value.is_number() => Ok(value.clone()),
        FieldKind::Boolean if value.is_boolean() => Ok(value.clone()),
        FieldKind::StringList => match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        return Err(format!(
                            "{path}[{i}]: expected string, found {}",
                            type_name(item)
                        ));
                    }
                }
                Ok(value.clone())
            }
            _ => Err(mismatch()),
        },
        FieldKind::Object(schema) => validate_object(value, schema, path).map(Value::Object),
        FieldKind::ObjectList(schema) => match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| validate_object(item, schema, &format!("{path}[{i}]")).map(Value::Object))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn city() -> ObjectSchema {
        ObjectSchema::new("city")
            .field("name", FieldKind::String)
            .field("population", FieldKind::Integer)
            .field("coastal", FieldKind::Boolean)
            .field("landmarks", FieldKind::StringList)
    }

    fn expect_decode_error(result: Result<StructuredResult>) -> (String, String) {
        match result {
            Err(GatewayError::SchemaDecode { shape, message, .. }) => (shape, message),
            other => unreachable!("expected SchemaDecode, got {other:?}"),
        }
    }

    #[test]
    fn test_object_round_trip() {
        let intended = json!({
            "name": "Lisbon",
            "population": 545_000,
            "coastal": true,
            "landmarks": ["Belém Tower", "Alfama"]
        });
        let result = decode(&intended.to_string(), &TargetShape::Object(city()))
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(result.into_value(), intended);
    }

    #[test]
    fn test_object_ignores_unknown_fields() {
        let raw = r#"{"name": "Oslo", "population": 700000, "coastal": true,
                      "landmarks": [], "mayor": "unknown"}"#;
        let result =
            decode(raw, &TargetShape::Object(city())).unwrap_or_else(|_| unreachable!());
        let StructuredResult::Object(map) = result else {
            unreachable!()
        };
        assert!(!map.contains_key("mayor"));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_object_missing_field_is_decode_error() {
        let raw = r#"{"name": "Oslo", "population": 700000, "landmarks": []}"#;
        let (shape, message) = expect_decode_error(decode(raw, &TargetShape::Object(city())));
        assert_eq!(shape, "city");
        assert!(message.contains("$.coastal"));
        assert!(message.contains("missing"));
    }

    #[test]
    fn test_object_type_mismatch_is_decode_error() {
        let raw = r#"{"name": "Oslo", "population": "many", "coastal": true, "landmarks": []}"#;
        let (_, message) = expect_decode_error(decode(raw, &TargetShape::Object(city())));
        assert!(message.contains("$.population: expected integer, found string"));
    }

    #[test]
    fn test_null_is_a_type_mismatch() {
        let raw = r#"{"name": null, "population": 1, "coastal": false, "landmarks": []}"#;
        let (_, message) = expect_decode_error(decode(raw, &TargetShape::Object(city())));
        assert!(message.contains("found null"));
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let (_, message) =
            expect_decode_error(decode("{\"name\": ", &TargetShape::Object(city())));
        assert!(message.starts_with("malformed JSON"));
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let raw = "```json\n[\"a\", \"b\"]\n```";
        let result = decode(raw, &TargetShape::ListOfStrings).unwrap_or_else(|_| unreachable!());
        assert_eq!(
            result,
            StructuredResult::Strings(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_bare_fence_without_language_tag() {
        assert_eq!(strip_code_fence("```\n{\"k\": 1}\n```"), "{\"k\": 1}");
        assert_eq!(strip_code_fence("```{\"k\": 1}```"), "{\"k\": 1}");
    }

    #[test]
    fn test_list_of_strings_preserves_order() {
        let raw = r#"["Eiffel Tower", "Louvre", "Montmartre"]"#;
        let result = decode(raw, &TargetShape::ListOfStrings).unwrap_or_else(|_| unreachable!());
        assert_eq!(
            result,
            StructuredResult::Strings(vec![
                "Eiffel Tower".to_string(),
                "Louvre".to_string(),
                "Montmartre".to_string(),
            ])
        );
    }

    #[test]
    fn test_list_of_strings_accepts_comma_separated_line() {
        let result = decode("red, green ,blue", &TargetShape::ListOfStrings)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            result,
            StructuredResult::Strings(vec![
                "red".to_string(),
                "green".to_string(),
                "blue".to_string()
            ])
        );
    }

    #[test]
    fn test_list_of_strings_rejects_non_string_items() {
        let (_, message) = expect_decode_error(decode(r#"["a", 2]"#, &TargetShape::ListOfStrings));
        assert!(message.contains("$[1]"));
    }

    #[test]
    fn test_mapping_keeps_nested_values() {
        let raw = r#"{"days": 3, "tips": {"food": ["pastel de nata"]}}"#;
        let result = decode(raw, &TargetShape::Mapping).unwrap_or_else(|_| unreachable!());
        assert_eq!(result.into_value()["tips"]["food"][0], "pastel de nata");
    }

    #[test]
    fn test_mapping_rejects_array() {
        let (shape, _) = expect_decode_error(decode("[1, 2]", &TargetShape::Mapping));
        assert_eq!(shape, "mapping");
    }

    #[test]
    fn test_list_of_objects_validates_each_item() {
        let raw = r#"[
            {"name": "Porto", "population": 230000, "coastal": true, "landmarks": []},
            {"name": "Évora", "population": 57000, "landmarks": []}
        ]"#;
        let (shape, message) = expect_decode_error(decode(raw, &TargetShape::ListOf(city())));
        assert_eq!(shape, "list_of_city");
        assert!(message.contains("$[1].coastal"));
    }

    #[test]
    fn test_list_of_objects_success() {
        let raw = r#"[{"name": "Porto", "population": 230000, "coastal": true, "landmarks": ["Ribeira"]}]"#;
        let result = decode(raw, &TargetShape::ListOf(city())).unwrap_or_else(|_| unreachable!());
        let StructuredResult::Objects(items) = result else {
            unreachable!()
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["landmarks"], json!(["Ribeira"]));
    }

    #[test]
    fn test_nested_object_list_path_in_error() {
        let schema = ObjectSchema::new("trip").field("stops", FieldKind::ObjectList(city()));
        let raw = r#"{"stops": [{"name": 1, "population": 1, "coastal": true, "landmarks": []}]}"#;
        let (_, message) = expect_decode_error(decode(raw, &TargetShape::Object(schema)));
        assert!(message.contains("$.stops[0].name: expected string, found number"));
    }

    #[test]
    fn test_decode_error_keeps_raw_content() {
        let raw = "Sure! Here is your plan.";
        match decode(raw, &TargetShape::Mapping) {
            Err(GatewayError::SchemaDecode { content, .. }) => assert_eq!(content, raw),
            other => unreachable!("expected SchemaDecode, got {other:?}"),
        }
    }
}
