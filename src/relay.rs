//! Streaming relay.
//!
//! Wraps a backend's native chunk stream into the gateway's own stream.
//! The relay is pull-driven: the upstream is polled only when the caller
//! asks for the next chunk, so a slow consumer never causes buffering.
//!
//! Cancellation releases the upstream (which aborts the underlying HTTP
//! request) as soon as the token fires, whether or not the caller is
//! polling at that moment. After cancellation, completion, or an error the
//! stream keeps returning `None`.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::error::Result;
use crate::provider::{ProviderKind, ProviderStream};

/// One fragment of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text fragment exactly as emitted by the provider.
    pub text: String,
    /// `true` when the provider marked this as its last chunk.
    pub is_final: bool,
}

impl StreamChunk {
    /// Creates a non-final chunk.
    pub fn fragment(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// Caller-facing chunk stream.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Upstream slot shared with the cancellation watcher. `None` once released.
type UpstreamSlot = Arc<Mutex<Option<ProviderStream>>>;

struct RelayState {
    upstream: UpstreamSlot,
    cancel: CancellationToken,
    provider: ProviderKind,
    delivered: usize,
    // Stops the watcher task when the relay is dropped.
    _watcher: Option<DropGuard>,
}

/// Relays `upstream` to the caller until it ends, fails, or `cancel` fires.
///
/// - Chunks are delivered in provider order, one upstream item per chunk,
///   and nothing is added: the caller sees exactly what the provider sent.
/// - A chunk marked `is_final` ends the sequence.
/// - An upstream error is delivered once and terminates the sequence;
///   chunks already delivered are not retracted.
#[must_use]
pub fn relay(upstream: ProviderStream, cancel: CancellationToken, provider: ProviderKind) -> ChatStream {
    let upstream: UpstreamSlot = Arc::new(Mutex::new(Some(upstream)));
    let state = RelayState {
        _watcher: release_on_cancel(&upstream, &cancel, provider),
        upstream,
        cancel,
        provider,
        delivered: 0,
    };

    let chunks = stream::unfold(state, |mut state| async move {
        let upstream = Arc::clone(&state.upstream);
        let mut slot = upstream.lock().await;
        let source = slot.as_mut()?;

        let next = tokio::select! {
            biased;
            () = state.cancel.cancelled() => None,
            item = source.next() => Some(item),
        };

        match next {
            None => {
                *slot = None;
                debug!(
                    provider = %state.provider,
                    delivered = state.delivered,
                    "stream cancelled by caller"
                );
                None
            }
            Some(Some(Ok(chunk))) => {
                state.delivered += 1;
                if chunk.is_final {
                    *slot = None;
                    debug!(provider = %state.provider, delivered = state.delivered, "stream complete");
                }
                drop(slot);
                Some((Ok(chunk), state))
            }
            Some(Some(Err(e))) => {
                *slot = None;
                debug!(provider = %state.provider, delivered = state.delivered, error = %e, "stream failed");
                drop(slot);
                Some((Err(e), state))
            }
            Some(None) => {
                *slot = None;
                debug!(provider = %state.provider, delivered = state.delivered, "upstream ended");
                None
            }
        }
    });

    Box::pin(chunks.fuse())
}

/// Spawns a task that drops the upstream as soon as `cancel` fires.
///
/// Outside a tokio runtime no task is spawned and cancellation is observed
/// on the next pull instead.
fn release_on_cancel(
    upstream: &UpstreamSlot,
    cancel: &CancellationToken,
    provider: ProviderKind,
) -> Option<DropGuard> {
    let handle = tokio::runtime::Handle::try_current().ok()?;
    let slot = Arc::downgrade(upstream);
    let cancel = cancel.clone();
    let finished = CancellationToken::new();
    let relay_finished = finished.clone();

    handle.spawn(async move {
        tokio::select! {
            () = cancel.cancelled() => {
                let Some(slot) = slot.upgrade() else {
                    return;
                };
                let released = slot.lock().await.take();
                if released.is_some() {
                    debug!(provider = %provider, "upstream released on cancel");
                }
            }
            () = relay_finished.cancelled() => {}
        }
    });

    Some(finished.drop_guard())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn upstream_of(items: Vec<Result<StreamChunk>>, pulled: Arc<AtomicUsize>) -> ProviderStream {
        Box::pin(stream::iter(items).inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn fragments(texts: &[&str]) -> Vec<Result<StreamChunk>> {
        texts.iter().map(|t| Ok(StreamChunk::fragment(*t))).collect()
    }

    async fn collect_texts(stream: ChatStream) -> Vec<String> {
        stream
            .filter_map(|item| async move { item.ok() })
            .map(|c| c.text)
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_delivers_all_chunks_in_order() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let upstream = upstream_of(fragments(&["a", "b", "c"]), Arc::clone(&pulled));
        let relayed = relay(upstream, CancellationToken::new(), ProviderKind::LocalRuntime);

        let chunks: Vec<StreamChunk> = relayed
            .map(|item| item.unwrap_or_else(|_| unreachable!()))
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::fragment("a"),
                StreamChunk::fragment("b"),
                StreamChunk::fragment("c"),
            ]
        );
        assert_eq!(pulled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_stream_keeps_returning_none() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let upstream = upstream_of(fragments(&["only"]), Arc::clone(&pulled));
        let mut relayed = relay(upstream, CancellationToken::new(), ProviderKind::PrimaryApi);

        assert!(matches!(relayed.next().await, Some(Ok(ref c)) if c.text == "only"));
        for _ in 0..3 {
            assert!(relayed.next().await.is_none());
        }
    }

    #[tokio::test]
    async fn test_provider_final_chunk_is_passed_through() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let items = vec![
            Ok(StreamChunk::fragment("Hel")),
            Ok(StreamChunk {
                text: "lo".to_string(),
                is_final: true,
            }),
            // Anything after the final marker is never pulled.
            Ok(StreamChunk::fragment("late")),
        ];
        let relayed = relay(
            upstream_of(items, Arc::clone(&pulled)),
            CancellationToken::new(),
            ProviderKind::PrimaryApi,
        );

        assert_eq!(collect_texts(relayed).await, vec!["Hel", "lo"]);
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pull_driven_backpressure() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let upstream = upstream_of(fragments(&["1", "2", "3", "4"]), Arc::clone(&pulled));
        let mut relayed = relay(upstream, CancellationToken::new(), ProviderKind::LocalRuntime);

        assert_eq!(pulled.load(Ordering::SeqCst), 0);
        let _ = relayed.next().await;
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
        let _ = relayed.next().await;
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancellation_delivers_strict_prefix() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let upstream = upstream_of(fragments(&["a", "b", "c", "d"]), Arc::clone(&pulled));
        let cancel = CancellationToken::new();
        let mut relayed = relay(upstream, cancel.clone(), ProviderKind::LocalRuntime);

        let mut received = Vec::new();
        for _ in 0..2 {
            if let Some(Ok(chunk)) = relayed.next().await {
                received.push(chunk.text);
            }
        }
        cancel.cancel();

        for _ in 0..3 {
            assert!(relayed.next().await.is_none());
        }
        assert_eq!(received, vec!["a", "b"]);
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_cancel_releases_upstream_without_further_pull() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&released));
        let upstream: ProviderStream = Box::pin(
            stream::iter(fragments(&["first"]))
                .chain(stream::pending())
                .map(move |item| {
                    let _held = &flag;
                    item
                }),
        );
        let cancel = CancellationToken::new();
        let mut relayed = relay(upstream, cancel.clone(), ProviderKind::PrimaryApi);

        assert!(matches!(relayed.next().await, Some(Ok(ref c)) if c.text == "first"));
        assert!(!released.load(Ordering::SeqCst));

        cancel.cancel();
        for _ in 0..10 {
            if released.load(Ordering::SeqCst) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(released.load(Ordering::SeqCst));

        assert!(relayed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_relay_releases_upstream() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&released));
        let upstream: ProviderStream = Box::pin(stream::pending::<Result<StreamChunk>>().map(move |item| {
            let _held = &flag;
            item
        }));
        let relayed = relay(upstream, CancellationToken::new(), ProviderKind::LocalRuntime);

        drop(relayed);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_pull_yields_nothing() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let upstream = upstream_of(fragments(&["a"]), Arc::clone(&pulled));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut relayed = relay(upstream, cancel, ProviderKind::PrimaryApi);
        assert!(relayed.next().await.is_none());
        assert_eq!(pulled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_terminates_without_retracting() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let items = vec![
            Ok(StreamChunk::fragment("partial")),
            Err(GatewayError::Stream {
                provider: ProviderKind::LocalRuntime,
                message: "connection reset".to_string(),
            }),
            Ok(StreamChunk::fragment("never")),
        ];
        let mut relayed = relay(
            upstream_of(items, Arc::clone(&pulled)),
            CancellationToken::new(),
            ProviderKind::LocalRuntime,
        );

        assert!(matches!(relayed.next().await, Some(Ok(ref c)) if c.text == "partial"));
        let err = relayed.next().await;
        assert!(matches!(
            err,
            Some(Err(GatewayError::Stream {
                provider: ProviderKind::LocalRuntime,
                ..
            }))
        ));
        assert!(relayed.next().await.is_none());
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }
}
