//! Provider routing.
//!
//! The router holds one long-lived backend per provider, created at
//! start-up, and resolves a selector to the backend plus the prompt and
//! option variant that go with it. It performs no I/O of its own.

use std::sync::Arc;

use tracing::debug;

use crate::config::GatewayConfig;
use crate::conversation::ConversationModel;
use crate::error::Result;
use crate::options::SamplingOptions;
use crate::provider::{ChatBackend, OllamaBackend, OpenAiBackend, ProviderCall, ProviderKind};

/// Shared, pre-initialised backends keyed by provider.
#[derive(Clone)]
pub struct ProviderRouter {
    primary_api: Arc<dyn ChatBackend>,
    local_runtime: Arc<dyn ChatBackend>,
}

/// A backend bound to the provider variant that drives it.
#[derive(Clone, Copy)]
pub struct BoundProvider<'a> {
    /// Resolved provider.
    pub kind: ProviderKind,
    /// Backend handle.
    pub backend: &'a dyn ChatBackend,
}

impl BoundProvider<'_> {
    /// Assembles the provider-native call for a conversation.
    #[must_use]
    pub fn build_call(
        &self,
        conversation: &ConversationModel,
        options: &SamplingOptions,
    ) -> ProviderCall {
        self.kind.build_call(conversation, options)
    }
}

impl ProviderRouter {
    /// Creates a router from explicit backends.
    pub fn new(primary_api: Arc<dyn ChatBackend>, local_runtime: Arc<dyn ChatBackend>) -> Self {
        Self {
            primary_api,
            local_runtime,
        }
    }

    /// Creates the real `OpenAI` and Ollama backends from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`](crate::GatewayError::Config) if a
    /// backend cannot be constructed.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(OpenAiBackend::new(config)),
            Arc::new(OllamaBackend::new(config)?),
        ))
    }

    /// Returns the backend for an already-resolved provider.
    #[must_use]
    pub fn backend(&self, kind: ProviderKind) -> &dyn ChatBackend {
        match kind {
            ProviderKind::PrimaryApi => self.primary_api.as_ref(),
            ProviderKind::LocalRuntime => self.local_runtime.as_ref(),
        }
    }

    /// Binds a provider. `None` selects the local runtime.
    #[must_use]
    pub fn route(&self, selector: Option<ProviderKind>) -> BoundProvider<'_> {
        let kind = selector.unwrap_or_default();
        let backend = self.backend(kind);
        debug!(provider = %kind, model = backend.model(), "routed request");
        BoundProvider { kind, backend }
    }

    /// Binds a provider from a free-text name, defaulting to the local runtime.
    #[must_use]
    pub fn route_name(&self, name: Option<&str>) -> BoundProvider<'_> {
        self.route(Some(ProviderKind::resolve(name)))
    }
}

impl std::fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRouter")
            .field("primary_api", &self.primary_api.model())
            .field("local_runtime", &self.local_runtime.model())
            .finish()
    }
}
