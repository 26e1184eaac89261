//! Ollama backend using the `ollama-rs` crate.
//!
//! The local runtime is driven through its generate endpoint, which takes
//! a single prompt string. Conversations therefore arrive here already
//! flattened into a transcript.

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use ollama_rs::Ollama;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::models::ModelOptions;
use tracing::debug;

use super::{ChatBackend, Completion, ProviderCall, ProviderKind, ProviderStream, TokenUsage};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::options::{OllamaOptions, ProviderOptions};
use crate::prompt::ProviderPrompt;
use crate::relay::StreamChunk;

/// Ollama backend.
pub struct OllamaBackend {
    client: Ollama,
    model: String,
}

impl OllamaBackend {
    /// Creates a backend from gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the configured host is not a
    /// valid URL.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Ollama::try_new(config.ollama_host.as_str()).map_err(|e| {
            GatewayError::Config {
                message: format!("invalid Ollama host '{}': {e}", config.ollama_host),
            }
        })?;

        Ok(Self {
            client,
            model: config.ollama_model.clone(),
        })
    }

    /// Converts mapped options into the SDK option object.
    ///
    /// Returns `None` when the caller supplied nothing, so the request
    /// carries no options block at all.
    fn model_options(options: &OllamaOptions) -> Option<ModelOptions> {
        if options.is_empty() {
            return None;
        }
        let mut model_options = ModelOptions::default();
        if let Some(temperature) = options.temperature {
            model_options = model_options.temperature(temperature);
        }
        if let Some(top_p) = options.top_p {
            model_options = model_options.top_p(top_p);
        }
        if let Some(num_predict) = options.num_predict {
            model_options = model_options.num_predict(num_predict);
        }
        Some(model_options)
    }

    fn build_request(&self, call: &ProviderCall) -> Result<GenerationRequest> {
        let ProviderPrompt::Transcript(prompt) = &call.prompt else {
            return Err(GatewayError::invalid_request(
                "the local runtime accepts only a flattened transcript prompt",
            ));
        };

        let mut request = GenerationRequest::new(self.model.clone(), prompt.clone());
        if let ProviderOptions::Ollama(options) = &call.options
            && let Some(model_options) = Self::model_options(options)
        {
            request = request.options(model_options);
        }
        Ok(request)
    }

    fn request_error(e: &ollama_rs::error::OllamaError) -> GatewayError {
        GatewayError::Provider {
            provider: ProviderKind::LocalRuntime,
            message: e.to_string(),
        }
    }
}

fn saturate(count: Option<u64>) -> u32 {
    count.map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

impl std::fmt::Debug for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaBackend")
            .field("client", &"<ollama-rs::Ollama>")
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalRuntime
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, call: &ProviderCall) -> Result<Completion> {
        let request = self.build_request(call)?;

        let response = self
            .client
            .generate(request)
            .await
            .map_err(|e| Self::request_error(&e))?;

        let prompt_tokens = saturate(response.prompt_eval_count);
        let completion_tokens = saturate(response.eval_count);
        let usage = TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        };

        debug!(model = %self.model, total_tokens = usage.total_tokens, "ollama completion");

        Ok(Completion {
            content: response.response,
            usage,
        })
    }

    async fn stream(&self, call: &ProviderCall) -> Result<ProviderStream> {
        let request = self.build_request(call)?;

        let stream = self
            .client
            .generate_stream(request)
            .await
            .map_err(|e| Self::request_error(&e))?;

        // One network read may decode into several responses; each becomes
        // its own chunk so boundaries match what the runtime produced.
        let mapped = stream.flat_map(|result| {
            let items: Vec<Result<StreamChunk>> = match result {
                Ok(responses) => responses
                    .into_iter()
                    .map(|r| {
                        Ok(StreamChunk {
                            text: r.response,
                            is_final: r.done,
                        })
                    })
                    .collect(),
                Err(e) => vec![Err(GatewayError::Stream {
                    provider: ProviderKind::LocalRuntime,
                    message: e.to_string(),
                })],
            };
            stream::iter(items)
        });

        Ok(Box::pin(mapped))
    }
}
