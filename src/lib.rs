//! # llm-gateway
//!
//! A unified chat gateway in front of two structurally different LLM
//! backends: an API-hosted provider speaking the `OpenAI` chat protocol and
//! a locally hosted Ollama runtime.
//!
//! ## Overview
//!
//! A request arrives as a provider-agnostic [`ConversationModel`] plus
//! optional [`SamplingOptions`]. The [`ProviderRouter`] picks a backend
//! (the local runtime unless told otherwise), the prompt is assembled in
//! the shape that backend expects, and the call runs as one of:
//!
//! - a single completion ([`Gateway::simple_chat`], [`Gateway::role_chat`])
//! - a pull-driven, cancellable chunk stream ([`Gateway::stream_chat`])
//! - a completion decoded into a [`TargetShape`] ([`Gateway::structured_chat`])
//!
//! ## Example
//!
//! ```no_run
//! use llm_gateway::{Gateway, GatewayConfig, ProviderKind};
//!
//! # async fn run() -> llm_gateway::Result<()> {
//! let config = GatewayConfig::from_env()?;
//! let gateway = Gateway::from_config(&config)?;
//! let reply = gateway.simple_chat("hello", Some(ProviderKind::PrimaryApi)).await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod options;
pub mod prompt;
pub mod provider;
pub mod relay;
pub mod router;
pub mod structured;
pub mod templates;
pub mod usage;

pub use config::{GatewayConfig, GatewayConfigBuilder};
pub use conversation::{ConversationModel, ConversationTurn, Role};
pub use error::{GatewayError, Result};
pub use gateway::Gateway;
pub use options::{OllamaOptions, OpenAiOptions, ProviderOptions, SamplingOptions};
pub use prompt::{ChatMessage, ProviderPrompt};
pub use provider::{
    ChatBackend, Completion, OllamaBackend, OpenAiBackend, ProviderCall, ProviderKind,
    ProviderStream, TokenUsage,
};
pub use relay::{ChatStream, StreamChunk};
pub use router::{BoundProvider, ProviderRouter};
pub use structured::{ObjectSchema, StructuredResult, TargetShape};
pub use templates::{PromptTemplate, TemplateCatalog};
pub use usage::{AuditUsageLogger, UsageObserver, UsageRecord};
