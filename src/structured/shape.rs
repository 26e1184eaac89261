//! Target shape descriptors.

use std::fmt::Write;

use serde_json::{Map, Value, json};

/// Expected type of one object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string.
    String,
    /// JSON integer.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// Array of strings.
    StringList,
    /// Nested object.
    Object(ObjectSchema),
    /// Array of nested objects.
    ObjectList(ObjectSchema),
    /// Any value, including null.
    Any,
}

impl FieldKind {
    /// Human-readable type name used in decode errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Number => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::StringList => "array of strings".to_string(),
            Self::Object(schema) => format!("object `{}`", schema.name),
            Self::ObjectList(schema) => format!("array of `{}`", schema.name),
            Self::Any => "any".to_string(),
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            Self::String => json!({"type": "string"}),
            Self::Integer => json!({"type": "integer"}),
            Self::Number => json!({"type": "number"}),
            Self::Boolean => json!({"type": "boolean"}),
            Self::StringList => json!({"type": "array", "items": {"type": "string"}}),
            Self::Object(schema) => schema.json_schema(),
            Self::ObjectList(schema) => json!({"type": "array", "items": schema.json_schema()}),
            Self::Any => json!({}),
        }
    }
}

/// A named, typed field of an [`ObjectSchema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// JSON key.
    pub name: String,
    /// Expected type.
    pub kind: FieldKind,
}

/// Named object with required, typed fields.
///
/// Every declared field is required. Keys not declared here are ignored
/// when decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSchema {
    /// Schema name, reported in decode errors.
    pub name: String,
    /// Declared fields in display order.
    pub fields: Vec<FieldSpec>,
}

impl ObjectSchema {
    /// Creates an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a required field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
        });
        self
    }

    /// Renders a JSON Schema (draft 2020-12 subset) for this object.
    #[must_use]
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.kind.json_schema()))
            .collect();
        let required: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// The structured form expected from a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetShape {
    /// A single object matching the schema.
    Object(ObjectSchema),
    /// An ordered list of plain strings.
    ListOfStrings,
    /// A string-keyed map of arbitrary values.
    Mapping,
    /// An ordered list of objects, each matching the schema.
    ListOf(ObjectSchema),
}

const JSON_ONLY: &str = "Do not include any explanations, only provide a RFC8259 compliant JSON \
                         response following this format without deviation.\n\
                         Do not wrap the response in markdown code blocks.";

impl TargetShape {
    /// Shape name reported in decode errors.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Object(schema) => schema.name.clone(),
            Self::ListOfStrings => "list_of_strings".to_string(),
            Self::Mapping => "mapping".to_string(),
            Self::ListOf(schema) => format!("list_of_{}", schema.name),
        }
    }

    /// Instructions appended to the user message so the model answers in
    /// this shape.
    #[must_use]
    pub fn format_instructions(&self) -> String {
        let mut text = String::new();
        match self {
            Self::Object(schema) => {
                let _ = write!(
                    text,
                    "Your response should be a single JSON object.\n{JSON_ONLY}\n\
                     Here is the JSON Schema your output must adhere to:\n{}",
                    pretty(&schema.json_schema())
                );
            }
            Self::ListOfStrings => {
                let _ = write!(
                    text,
                    "Your response should be a JSON array of strings, \
                     e.g. [\"foo\", \"bar\", \"baz\"].\n{JSON_ONLY}"
                );
            }
            Self::Mapping => {
                let _ = write!(
                    text,
                    "Your response should be a JSON object with string keys; \
                     values may be any JSON value, including nested objects.\n{JSON_ONLY}"
                );
            }
            Self::ListOf(schema) => {
                let array_schema = json!({"type": "array", "items": schema.json_schema()});
                let _ = write!(
                    text,
                    "Your response should be a JSON array of objects.\n{JSON_ONLY}\n\
                     Here is the JSON Schema your output must adhere to:\n{}",
                    pretty(&array_schema)
                );
            }
        }
        text
    }

    /// Appends the format instructions to `message`.
    #[must_use]
    pub fn instruct(&self, message: &str) -> String {
        format!("{message}\n\n{}", self.format_instructions())
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
