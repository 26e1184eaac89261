//! Gateway configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! It is read once at start-up; the provider handles built from it are never
//! reconfigured per request.

use std::path::PathBuf;

use crate::error::{GatewayError, Result};

/// Default model for the API-hosted provider.
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
/// Default address of the local Ollama runtime.
const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
/// Default model for the local runtime.
const DEFAULT_OLLAMA_MODEL: &str = "tinyllama";

/// Configuration for the gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    /// API key for the API-hosted provider.
    ///
    /// Only calls routed to that provider need it; the local runtime works
    /// without one.
    pub api_key: Option<String>,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model used by the API-hosted provider.
    pub openai_model: String,
    /// Base URL of the Ollama runtime.
    pub ollama_host: String,
    /// Model used by the local runtime.
    pub ollama_model: String,
    /// Directory containing prompt template overrides.
    pub template_dir: Option<PathBuf>,
}

impl GatewayConfig {
    /// Creates a new builder for `GatewayConfig`.
    #[must_use]
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a model name is blank.
    pub fn from_env() -> Result<Self> {
        Self::builder().from_env().build()
    }

    /// Returns the API key for the API-hosted provider.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ApiKeyMissing`] if none was configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(GatewayError::ApiKeyMissing)
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("openai_model", &self.openai_model)
            .field("ollama_host", &self.ollama_host)
            .field("ollama_model", &self.ollama_model)
            .field("template_dir", &self.template_dir)
            .finish()
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug, Clone, Default)]
pub struct GatewayConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    openai_model: Option<String>,
    ollama_host: Option<String>,
    ollama_model: Option<String>,
    template_dir: Option<PathBuf>,
}

impl GatewayConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("GATEWAY_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("GATEWAY_BASE_URL"))
                .ok();
        }
        if self.openai_model.is_none() {
            self.openai_model = std::env::var("GATEWAY_OPENAI_MODEL").ok();
        }
        if self.ollama_host.is_none() {
            self.ollama_host = std::env::var("OLLAMA_HOST").ok();
        }
        if self.ollama_model.is_none() {
            self.ollama_model = std::env::var("GATEWAY_OLLAMA_MODEL").ok();
        }
        if self.template_dir.is_none() {
            self.template_dir = std::env::var("GATEWAY_TEMPLATE_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API-hosted model.
    #[must_use]
    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    /// Sets the Ollama host.
    #[must_use]
    pub fn ollama_host(mut self, host: impl Into<String>) -> Self {
        self.ollama_host = Some(host.into());
        self
    }

    /// Sets the local runtime model.
    #[must_use]
    pub fn ollama_model(mut self, model: impl Into<String>) -> Self {
        self.ollama_model = Some(model.into());
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    /// Builds the [`GatewayConfig`].
    ///
    /// # Errors
    ///
    /// A blank API key counts as unset.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a model name is blank.
    pub fn build(self) -> Result<GatewayConfig> {
        let openai_model = self
            .openai_model
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let ollama_model = self
            .ollama_model
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
        if openai_model.trim().is_empty() || ollama_model.trim().is_empty() {
            return Err(GatewayError::Config {
                message: "model names must not be blank".to_string(),
            });
        }

        Ok(GatewayConfig {
            api_key: self.api_key.filter(|k| !k.trim().is_empty()),
            base_url: self.base_url,
            openai_model,
            ollama_host: self
                .ollama_host
                .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            ollama_model,
            template_dir: self.template_dir,
        })
    }
}
