//! Token usage observation.
//!
//! After each completed single-shot call the gateway hands a read-only
//! [`UsageRecord`] to a [`UsageObserver`]. Observers cannot fail and have
//! no influence on the call they observe.

use serde::Serialize;
use tracing::info;

use crate::provider::{ProviderKind, TokenUsage};

/// Token counts for one completed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    /// Backend that served the call.
    pub provider: ProviderKind,
    /// Model identifier.
    pub model: String,
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Completion tokens.
    pub output_tokens: u32,
    /// Total tokens.
    pub total_tokens: u32,
}

impl UsageRecord {
    /// Builds a record from backend usage.
    pub fn new(provider: ProviderKind, model: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            provider,
            model: model.into(),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// Side-channel receiver of usage records.
///
/// Implementations must return quickly; they run inline on the request task.
pub trait UsageObserver: Send + Sync {
    /// Receives the usage of one completed call.
    fn observe(&self, record: &UsageRecord);
}

/// Default observer: one structured log event per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditUsageLogger;

impl UsageObserver for AuditUsageLogger {
    fn observe(&self, record: &UsageRecord) {
        info!(
            provider = %record.provider,
            model = %record.model,
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            total_tokens = record.total_tokens,
            "token usage"
        );
    }
}
