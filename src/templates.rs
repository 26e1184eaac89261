//! Prompt template catalog.
//!
//! A read-only list of named templates with `{placeholder}` variables,
//! offered to front ends. The routing and decoding logic never consults it.
//!
//! Template text is loaded from `<dir>/<id>.st` when such a file exists,
//! falling back to the compiled-in default for that template.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{GatewayError, Result};

/// Default template directory under the user's home.
const DEFAULT_TEMPLATE_DIR: &str = ".config/llm-gateway/templates";

/// File extension of template overrides.
const TEMPLATE_EXTENSION: &str = "st";

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

/// A variable a template expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateVariable {
    /// Placeholder name inside the template text.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Example input.
    pub placeholder: String,
    /// Whether a value must be supplied.
    pub required: bool,
}

impl TemplateVariable {
    fn required(name: &str, label: &str, placeholder: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            placeholder: placeholder.to_string(),
            required: true,
        }
    }
}

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptTemplate {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Template text with `{variable}` placeholders.
    pub template: String,
    /// Variables the template expects.
    pub variables: Vec<TemplateVariable>,
}

impl PromptTemplate {
    /// Substitutes `values` into the template.
    ///
    /// Placeholders not declared as variables are left untouched. Optional
    /// variables without a value render as empty text.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] when a required variable is
    /// missing or blank.
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String> {
        let missing: Vec<&str> = self
            .variables
            .iter()
            .filter(|v| v.required)
            .filter(|v| values.get(&v.name).is_none_or(|s| s.trim().is_empty()))
            .map(|v| v.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(GatewayError::invalid_request(format!(
                "template '{}' is missing required variables: {}",
                self.id,
                missing.join(", ")
            )));
        }

        let Some(placeholder) = PLACEHOLDER.as_ref() else {
            return Ok(self.template.clone());
        };

        let rendered = placeholder.replace_all(&self.template, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            if self.variables.iter().any(|v| v.name == name) {
                values.get(name).cloned().unwrap_or_default()
            } else {
                caps[0].to_string()
            }
        });
        Ok(rendered.into_owned())
    }
}

/// The set of available templates.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<PromptTemplate>,
}

impl TemplateCatalog {
    /// Loads templates, falling back to compiled-in defaults per template.
    ///
    /// Resolution order for the directory:
    /// 1. Explicit `template_dir` argument
    /// 2. `GATEWAY_TEMPLATE_DIR` environment variable
    /// 3. `~/.config/llm-gateway/templates/`
    #[must_use]
    pub fn load(template_dir: Option<&Path>) -> Self {
        let resolved_dir = template_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("GATEWAY_TEMPLATE_DIR").ok().map(PathBuf::from))
            .or_else(|| dirs::home_dir().map(|h| h.join(DEFAULT_TEMPLATE_DIR)));

        let mut catalog = Self::builtin();
        if let Some(dir) = resolved_dir {
            for template in &mut catalog.templates {
                let path = dir.join(format!("{}.{TEMPLATE_EXTENSION}", template.id));
                if let Ok(text) = std::fs::read_to_string(&path) {
                    template.template = text.trim().to_string();
                }
            }
        }
        catalog
    }

    /// Returns compiled-in templates without checking the filesystem.
    #[must_use]
    pub fn builtin() -> Self {
        let templates = vec![
            PromptTemplate {
                id: "code-review".to_string(),
                name: "Code Reviewer".to_string(),
                description: "Review code for bugs, security, and style issues.".to_string(),
                template: include_str!("../prompts/code-review.st").trim().to_string(),
                variables: vec![
                    TemplateVariable::required("language", "Programming Language", "e.g., Rust, Python"),
                    TemplateVariable::required("focus", "Focus Area", "e.g., security, performance, style"),
                    TemplateVariable::required("code", "Code Snippet", "Paste your code here"),
                ],
            },
            PromptTemplate {
                id: "learning-plan".to_string(),
                name: "Learning Plan".to_string(),
                description: "Generate a structured learning plan for a topic.".to_string(),
                template: include_str!("../prompts/learning-plan.st").trim().to_string(),
                variables: vec![
                    TemplateVariable::required("topic", "Topic", "e.g., async Rust"),
                    TemplateVariable::required("level", "Level", "e.g., beginner, intermediate"),
                    TemplateVariable::required("duration", "Duration (weeks)", "e.g., 4"),
                ],
            },
            PromptTemplate {
                id: "product-spec".to_string(),
                name: "Product Spec".to_string(),
                description: "Draft a concise product specification.".to_string(),
                template: include_str!("../prompts/product-spec.st").trim().to_string(),
                variables: vec![
                    TemplateVariable::required("product", "Product", "e.g., AI chat app"),
                    TemplateVariable::required("audience", "Audience", "e.g., developers"),
                ],
            },
            PromptTemplate {
                id: "rewrite".to_string(),
                name: "Rewrite with Tone".to_string(),
                description: "Rewrite text with a specific tone and length.".to_string(),
                template: include_str!("../prompts/rewrite.st").trim().to_string(),
                variables: vec![
                    TemplateVariable::required("tone", "Tone", "e.g., professional, friendly"),
                    TemplateVariable::required("length", "Max Words", "e.g., 120"),
                    TemplateVariable::required("text", "Text", "Paste your text here"),
                ],
            },
        ];
        Self { templates }
    }

    /// All templates in catalog order.
    #[must_use]
    pub fn templates(&self) -> &[PromptTemplate] {
        &self.templates
    }

    /// Looks up a template by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PromptTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }
}
