//! `OpenAI` backend using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API via the base URL override in
//! [`GatewayConfig`].

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionStreamResponse,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use super::{ChatBackend, Completion, ProviderCall, ProviderKind, ProviderStream, TokenUsage};
use crate::config::GatewayConfig;
use crate::conversation::Role;
use crate::error::{GatewayError, Result};
use crate::options::{OpenAiOptions, ProviderOptions};
use crate::prompt::{ChatMessage, ProviderPrompt, user_message};
use crate::relay::StreamChunk;

/// `OpenAI`-compatible backend.
///
/// Wraps one long-lived `async-openai` client; the client pools its own
/// connections and is safe to share across tasks. Without an API key no
/// client is built and every call fails with
/// [`GatewayError::ApiKeyMissing`].
pub struct OpenAiBackend {
    client: Option<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiBackend {
    /// Creates a backend from gateway configuration.
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        let client = config.require_api_key().ok().map(|key| {
            let mut openai_config = OpenAIConfig::new().with_api_key(key);
            if let Some(ref base_url) = config.base_url {
                openai_config = openai_config.with_api_base(base_url);
            }
            Client::with_config(openai_config)
        });
        if client.is_none() {
            debug!("no API key configured, openai backend disabled");
        }

        Self {
            client,
            model: config.openai_model.clone(),
        }
    }

    /// Returns `true` when an API key was configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&Client<OpenAIConfig>> {
        self.client.as_ref().ok_or(GatewayError::ApiKeyMissing)
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        }
    }

    /// Builds an `OpenAI` chat completion request from an assembled call.
    ///
    /// Option fields the caller did not supply stay `None` so the API
    /// applies its own defaults.
    fn build_request(&self, call: &ProviderCall, stream: bool) -> CreateChatCompletionRequest {
        let messages: Vec<_> = match &call.prompt {
            ProviderPrompt::Messages(messages) => {
                messages.iter().map(Self::convert_message).collect()
            }
            ProviderPrompt::Transcript(text) => vec![Self::convert_message(&user_message(text))],
        };

        let options = match call.options {
            ProviderOptions::OpenAi(options) => options,
            ProviderOptions::Ollama(_) => OpenAiOptions::default(),
        };

        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: options.temperature,
            max_completion_tokens: options.max_tokens,
            top_p: options.top_p,
            presence_penalty: options.presence_penalty,
            stream: if stream { Some(true) } else { None },
            ..Default::default()
        }
    }

    fn request_error(e: &async_openai::error::OpenAIError) -> GatewayError {
        GatewayError::Provider {
            provider: ProviderKind::PrimaryApi,
            message: e.to_string(),
        }
    }
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("configured", &self.is_configured())
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::PrimaryApi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, call: &ProviderCall) -> Result<Completion> {
        let client = self.client()?;
        let request = self.build_request(call, false);

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| Self::request_error(&e))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        debug!(model = %self.model, total_tokens = usage.total_tokens, "openai completion");

        Ok(Completion { content, usage })
    }

    async fn stream(&self, call: &ProviderCall) -> Result<ProviderStream> {
        let client = self.client()?;
        let request = self.build_request(call, true);

        let stream = client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| Self::request_error(&e))?;

        let mapped = stream.map(
            |result: std::result::Result<
                CreateChatCompletionStreamResponse,
                async_openai::error::OpenAIError,
            >| {
                match result {
                    Ok(response) => {
                        let choice = response.choices.first();
                        let text = choice
                            .and_then(|c| c.delta.content.as_ref())
                            .cloned()
                            .unwrap_or_default();
                        let is_final = choice.is_some_and(|c| c.finish_reason.is_some());
                        Ok(StreamChunk { text, is_final })
                    }
                    Err(e) => Err(GatewayError::Stream {
                        provider: ProviderKind::PrimaryApi,
                        message: e.to_string(),
                    }),
                }
            },
        );

        Ok(Box::pin(mapped))
    }
}
