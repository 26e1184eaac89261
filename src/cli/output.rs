//! Output formatting for CLI results.

use std::fmt::Write;

use serde::Serialize;

use crate::error::Result;
use crate::provider::ProviderKind;
use crate::structured::StructuredResult;
use crate::templates::{PromptTemplate, TemplateCatalog};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name. Anything unrecognised is text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Json`](crate::GatewayError::Json) if
    /// serialization fails.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    provider: &'static str,
    response: &'a str,
}

/// Formats a chat reply.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_reply(provider: ProviderKind, response: &str, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(response.to_string()),
        OutputFormat::Json => format.to_json(&ReplyOutput {
            provider: provider.as_str(),
            response,
        }),
    }
}

/// Formats a decoded structured result.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_structured(
    shape: &str,
    result: &StructuredResult,
    format: OutputFormat,
) -> Result<String> {
    match (format, result) {
        (OutputFormat::Text, StructuredResult::Strings(items)) => Ok(items
            .iter()
            .fold(String::new(), |mut out, item| {
                let _ = writeln!(out, "- {item}");
                out
            })),
        (OutputFormat::Text, _) => format.to_json(result),
        (OutputFormat::Json, _) => format.to_json(&serde_json::json!({
            "shape": shape,
            "result": result,
        })),
    }
}

/// Formats the template catalog listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_template_list(catalog: &TemplateCatalog, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut output = format!("{} template(s):\n", catalog.templates().len());
            for template in catalog.templates() {
                let names: Vec<&str> = template.variables.iter().map(|v| v.name.as_str()).collect();
                let _ = writeln!(
                    output,
                    "  {:<14} {} [{}]",
                    template.id,
                    template.description,
                    names.join(", ")
                );
            }
            Ok(output)
        }
        OutputFormat::Json => format.to_json(catalog.templates()),
    }
}

/// Formats a single template's details.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_template(template: &PromptTemplate, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut output = format!(
                "{} ({})\n{}\n\nVariables:\n",
                template.name, template.id, template.description
            );
            for var in &template.variables {
                let marker = if var.required { "required" } else { "optional" };
                let _ = writeln!(
                    output,
                    "  {:<10} {} ({marker}), {}",
                    var.name, var.label, var.placeholder
                );
            }
            let _ = write!(output, "\nTemplate:\n{}\n", template.template);
            Ok(output)
        }
        OutputFormat::Json => format.to_json(template),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("json", OutputFormat::Json; "json")]
    #[test_case("JSON", OutputFormat::Json; "uppercase json")]
    #[test_case("text", OutputFormat::Text; "text")]
    #[test_case("yaml", OutputFormat::Text; "unknown falls back to text")]
    fn test_parse(input: &str, expected: OutputFormat) {
        assert_eq!(OutputFormat::parse(input), expected);
    }

    #[test]
    fn test_reply_json_carries_provider() {
        let output = format_reply(ProviderKind::LocalRuntime, "hi", OutputFormat::Json)
            .unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap_or_default();
        assert_eq!(value["provider"], "ollama");
        assert_eq!(value["response"], "hi");
    }

    #[test]
    fn test_string_list_renders_as_bullets() {
        let result = StructuredResult::Strings(vec!["a".to_string(), "b".to_string()]);
        let output =
            format_structured("list_of_strings", &result, OutputFormat::Text).unwrap_or_default();
        assert_eq!(output, "- a\n- b\n");
    }

    #[test]
    fn test_template_list_names_every_template() {
        let catalog = TemplateCatalog::builtin();
        let output = format_template_list(&catalog, OutputFormat::Text).unwrap_or_default();
        assert!(output.starts_with("4 template(s):"));
        for id in ["code-review", "learning-plan", "product-spec", "rewrite"] {
            assert!(output.contains(id));
        }
    }
}
