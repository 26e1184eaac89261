//! Provider abstraction.
//!
//! The two backends are a closed set described by [`ProviderKind`]. The
//! kind decides how a prompt is assembled and how options are mapped; a
//! [`ChatBackend`] performs the actual call. Adding a backend means adding
//! a variant here and an implementation of the trait, not touching callers.

pub mod ollama;
pub mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::conversation::ConversationModel;
use crate::error::Result;
use crate::options::{ProviderOptions, SamplingOptions, map_options};
use crate::prompt::{ProviderPrompt, assemble};
use crate::relay::StreamChunk;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

/// Which backend handles a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// API-hosted provider speaking the `OpenAI` chat completion protocol.
    PrimaryApi,
    /// Locally hosted Ollama runtime. Used whenever no provider is named.
    #[default]
    LocalRuntime,
}

impl ProviderKind {
    /// Parses an enumerated provider name (case-insensitive).
    ///
    /// Returns `None` for names outside the known set so that a typo is
    /// never mistaken for a real selection.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "primary-api" | "api" => Some(Self::PrimaryApi),
            "ollama" | "local" | "local-runtime" => Some(Self::LocalRuntime),
            _ => None,
        }
    }

    /// Resolves an optional selector, defaulting to [`ProviderKind::LocalRuntime`].
    ///
    /// Absent, empty, and unrecognised names all fall back to the local
    /// runtime. Unrecognised non-empty names are logged.
    #[must_use]
    pub fn resolve(name: Option<&str>) -> Self {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Self::default();
        };
        Self::from_name(name).unwrap_or_else(|| {
            warn!(selector = name, "unrecognised provider selector, using local runtime");
            Self::default()
        })
    }

    /// Canonical provider name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryApi => "openai",
            Self::LocalRuntime => "ollama",
        }
    }

    /// Assembles the prompt shape this provider expects.
    #[must_use]
    pub fn assemble_prompt(self, conversation: &ConversationModel) -> ProviderPrompt {
        assemble(self, conversation)
    }

    /// Maps generic sampling options onto this provider's option surface.
    #[must_use]
    pub fn map_options(self, options: &SamplingOptions) -> ProviderOptions {
        map_options(self, options)
    }

    /// Builds the complete provider call for a conversation.
    #[must_use]
    pub fn build_call(
        self,
        conversation: &ConversationModel,
        options: &SamplingOptions,
    ) -> ProviderCall {
        ProviderCall {
            prompt: self.assemble_prompt(conversation),
            options: self.map_options(options),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully assembled call, ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCall {
    /// Provider-native prompt.
    pub prompt: ProviderPrompt,
    /// Provider-native options.
    pub options: ProviderOptions,
}

/// Token usage statistics from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated in the completion.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

/// Result of a single-shot call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Generated text content.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
}

/// Native chunk stream produced by a backend.
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Transport seam for one backend.
///
/// Implementations hold a long-lived client and are shared read-only
/// across all requests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider this backend serves.
    fn kind(&self) -> ProviderKind;

    /// Model identifier used for calls.
    fn model(&self) -> &str;

    /// Executes a single-shot completion.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Provider`](crate::GatewayError::Provider) on
    /// transport or API failures.
    async fn complete(&self, call: &ProviderCall) -> Result<Completion>;

    /// Starts a streaming completion.
    ///
    /// The returned stream is lazy: nothing beyond the initial request is
    /// read until it is polled.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Provider`](crate::GatewayError::Provider) when
    /// the stream cannot be opened.
    async fn stream(&self, call: &ProviderCall) -> Result<ProviderStream>;
}
