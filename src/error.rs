//! Error types for the gateway.
//!
//! Every failure surfaced by the library is a [`GatewayError`]. Provider
//! failures carry the identity of the backend that produced them so the
//! caller can decide presentation without inspecting messages.

use thiserror::Error;

use crate::provider::ProviderKind;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors produced by the gateway core.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The selected backend failed, timed out, or returned a transport error.
    #[error("{provider} provider request failed: {message}")]
    Provider {
        /// Backend that failed.
        provider: ProviderKind,
        /// Error detail reported by the client.
        message: String,
    },

    /// The backend failed after a stream had started.
    #[error("{provider} stream failed: {message}")]
    Stream {
        /// Backend that failed.
        provider: ProviderKind,
        /// Error detail reported by the client.
        message: String,
    },

    /// Raw model text did not decode into the requested shape.
    #[error("failed to decode response as {shape}: {message}")]
    SchemaDecode {
        /// Name of the target shape.
        shape: String,
        /// Parse or validation failure.
        message: String,
        /// Raw text returned by the provider.
        content: String,
    },

    /// Structurally invalid input.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
    },

    /// No API key configured for the API-hosted provider.
    #[error("API key missing: set OPENAI_API_KEY or GATEWAY_API_KEY")]
    ApiKeyMissing,

    /// Start-up configuration could not be applied.
    #[error("configuration error: {message}")]
    Config {
        /// Configuration failure detail.
        message: String,
    },

    /// Reading a request file or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A request file or result could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Creates an [`GatewayError::InvalidRequest`] from a message.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Returns the backend responsible for this error, if any.
    #[must_use]
    pub const fn provider(&self) -> Option<ProviderKind> {
        match self {
            Self::Provider { provider, .. } | Self::Stream { provider, .. } => Some(*provider),
            _ => None,
        }
    }

    /// Returns `true` for errors raised by a backend call.
    #[must_use]
    pub const fn is_provider_error(&self) -> bool {
        self.provider().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_carries_identity() {
        let err = GatewayError::Provider {
            provider: ProviderKind::PrimaryApi,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.provider(), Some(ProviderKind::PrimaryApi));
        assert!(err.is_provider_error());
        assert_eq!(
            err.to_string(),
            "openai provider request failed: connection refused"
        );
    }

    #[test]
    fn test_decode_error_is_not_provider_error() {
        let err = GatewayError::SchemaDecode {
            shape: "trip_plan".to_string(),
            message: "missing field `destination`".to_string(),
            content: "{}".to_string(),
        };
        assert!(!err.is_provider_error());
        assert!(err.to_string().contains("trip_plan"));
    }
}
