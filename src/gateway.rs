//! Gateway facade.
//!
//! Exposes the four call shapes the request layer relies on: simple chat,
//! role-based chat, streamed chat, and structured chat. Each call resolves
//! a provider, assembles the provider-native prompt and options, executes,
//! and for structured calls decodes the raw text exactly once.

use std::sync::Arc;

use futures_util::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::conversation::ConversationModel;
use crate::error::{GatewayError, Result};
use crate::options::SamplingOptions;
use crate::provider::{ProviderCall, ProviderKind, ProviderStream};
use crate::relay::{ChatStream, StreamChunk, relay};
use crate::router::{BoundProvider, ProviderRouter};
use crate::structured::{StructuredResult, TargetShape, decode};
use crate::usage::{AuditUsageLogger, UsageObserver, UsageRecord};

/// Entry point for all chat operations.
#[derive(Clone)]
pub struct Gateway {
    router: ProviderRouter,
    observer: Arc<dyn UsageObserver>,
}

impl Gateway {
    /// Creates a gateway that logs usage with [`AuditUsageLogger`].
    #[must_use]
    pub fn new(router: ProviderRouter) -> Self {
        Self {
            router,
            observer: Arc::new(AuditUsageLogger),
        }
    }

    /// Creates a gateway with real backends built from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a backend cannot be constructed.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Ok(Self::new(ProviderRouter::from_config(config)?))
    }

    /// Replaces the usage observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn UsageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The underlying router.
    #[must_use]
    pub const fn router(&self) -> &ProviderRouter {
        &self.router
    }

    /// Sends a single free-text message with default options.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an empty message and
    /// [`GatewayError::Provider`] if the backend call fails.
    pub async fn simple_chat(&self, message: &str, selector: Option<ProviderKind>) -> Result<String> {
        self.role_chat(
            &ConversationModel::new(message),
            &SamplingOptions::default(),
            selector,
        )
        .await
    }

    /// Sends a conversation with system prompt and history.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an empty user message and
    /// [`GatewayError::Provider`] if the backend call fails.
    pub async fn role_chat(
        &self,
        conversation: &ConversationModel,
        options: &SamplingOptions,
        selector: Option<ProviderKind>,
    ) -> Result<String> {
        validate(conversation)?;
        let bound = self.router.route(selector);
        let call = bound.build_call(conversation, options);
        self.complete(bound, &call).await
    }

    /// Streams a conversation. Dropping the stream cancels the upstream call.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an empty user message and
    /// [`GatewayError::Provider`] if the stream cannot be opened.
    pub async fn stream_chat(
        &self,
        conversation: &ConversationModel,
        options: &SamplingOptions,
        selector: Option<ProviderKind>,
    ) -> Result<ChatStream> {
        self.stream_chat_cancellable(conversation, options, selector, CancellationToken::new())
            .await
    }

    /// Streams a conversation until it completes, fails, or `cancel` fires.
    ///
    /// If `cancel` fires while the stream is being opened, the returned
    /// stream is empty.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an empty user message and
    /// [`GatewayError::Provider`] if the stream cannot be opened.
    pub async fn stream_chat_cancellable(
        &self,
        conversation: &ConversationModel,
        options: &SamplingOptions,
        selector: Option<ProviderKind>,
        cancel: CancellationToken,
    ) -> Result<ChatStream> {
        validate(conversation)?;
        let bound = self.router.route(selector);
        let call = bound.build_call(conversation, options);
        debug!(provider = %bound.kind, prompt = call.prompt.kind(), "opening stream");

        let upstream: ProviderStream = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(provider = %bound.kind, "stream cancelled before it opened");
                Box::pin(stream::empty::<Result<StreamChunk>>()) as ProviderStream
            }
            opened = bound.backend.stream(&call) => opened?,
        };

        Ok(relay(upstream, cancel, bound.kind))
    }

    /// Sends a free-text message and decodes the reply into `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SchemaDecode`] if the reply does not fit the
    /// shape, plus the errors of [`Gateway::role_chat`].
    pub async fn structured_chat(
        &self,
        message: &str,
        shape: &TargetShape,
        selector: Option<ProviderKind>,
    ) -> Result<StructuredResult> {
        self.structured_chat_with(&ConversationModel::new(message), shape, selector)
            .await
    }

    /// Sends a conversation and decodes the reply into `shape`.
    ///
    /// The shape's format instructions are appended to the user message.
    /// Decoding is attempted once; a malformed reply is returned as an error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SchemaDecode`] if the reply does not fit the
    /// shape, plus the errors of [`Gateway::role_chat`].
    pub async fn structured_chat_with(
        &self,
        conversation: &ConversationModel,
        shape: &TargetShape,
        selector: Option<ProviderKind>,
    ) -> Result<StructuredResult> {
        validate(conversation)?;
        let instructed = ConversationModel {
            user_message: shape.instruct(&conversation.user_message),
            ..conversation.clone()
        };

        let bound = self.router.route(selector);
        let call = bound.build_call(&instructed, &SamplingOptions::default());
        let raw = self.complete(bound, &call).await?;

        let result = decode(&raw, shape)?;
        debug!(provider = %bound.kind, shape = %shape.name(), "structured response decoded");
        Ok(result)
    }

    async fn complete(&self, bound: BoundProvider<'_>, call: &ProviderCall) -> Result<String> {
        debug!(
            provider = %bound.kind,
            prompt = call.prompt.kind(),
            prompt_len = call.prompt.text_len(),
            "invoking provider"
        );
        let completion = bound.backend.complete(call).await?;

        self.observer.observe(&UsageRecord::new(
            bound.kind,
            bound.backend.model(),
            completion.usage,
        ));
        info!(provider = %bound.kind, response_len = completion.content.len(), "chat completed");

        Ok(completion.content)
    }
}

fn validate(conversation: &ConversationModel) -> Result<()> {
    if conversation.user_message.trim().is_empty() {
        return Err(GatewayError::invalid_request("user message cannot be empty"));
    }
    Ok(())
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
