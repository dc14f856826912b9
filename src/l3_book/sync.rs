use super::engine::BookEngine;
use super::types::{BookError, BookSnapshot, DepthSnapshot, Ticker};
use crate::coinbase::FeedMessage;
use crate::feed::{FeedClient, FeedConfig, FeedDirective, FeedError, FeedHandler};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

/// Supplies a full-depth, sequence-stamped snapshot on demand. Called once
/// per (re)synchronization cycle.
pub trait SnapshotFetcher {
    type Error: std::fmt::Debug + Send;

    fn fetch_snapshot(
        &self,
        product_id: &str,
    ) -> impl Future<Output = Result<DepthSnapshot, Self::Error>> + Send;
}

struct Shared {
    engine: RwLock<BookEngine>,
    corruption: AtomicU64,
}

/// A continuously maintained live book for one product.
///
/// One background task (the feed lifecycle) is the sole mutator; the write
/// lock is held per event application, never across a receive or a delay, so
/// reader calls observe each event's effect atomically and never wait out a
/// reconnect. Readers get materialized copies, not references into the live
/// maps.
pub struct LiveBook<F>
where
    F: SnapshotFetcher + Send + Sync + 'static,
{
    shared: Arc<Shared>,
    feed: FeedClient<BookDriver<F>>,
}

impl<F> LiveBook<F>
where
    F: SnapshotFetcher + Send + Sync + 'static,
{
    pub fn new(product_id: impl Into<String>, fetcher: F) -> Self {
        let product_id = product_id.into();
        let config = FeedConfig {
            products: vec![product_id.clone()],
            ..FeedConfig::default()
        };
        Self::with_config(config, product_id, fetcher)
    }

    /// Full control over the transport config; `product_id` names the book
    /// to snapshot, independent of the subscription list.
    pub fn with_config(config: FeedConfig, product_id: impl Into<String>, fetcher: F) -> Self {
        let driver = BookDriver::new(product_id.into(), fetcher);
        let shared = driver.shared.clone();
        LiveBook {
            shared,
            feed: FeedClient::new(config, driver),
        }
    }

    /// Begins the connect/listen lifecycle in the background and returns
    /// immediately. The first feed message triggers the snapshot fetch.
    pub fn start(&self) {
        self.feed.start();
    }

    /// Stops the feed. Idempotent.
    pub fn close(&self) {
        self.feed.close();
    }

    pub fn is_synced(&self) -> bool {
        self.shared.engine.read().is_synced()
    }

    /// Last fully-applied sequence, `None` while a (re)sync is in progress.
    pub fn sequence(&self) -> Option<u64> {
        self.shared.engine.read().sequence()
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.shared.engine.read().best_bid()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.shared.engine.read().best_ask()
    }

    pub fn ticker(&self) -> Option<Ticker> {
        self.shared.engine.read().ticker().cloned()
    }

    /// Immutable copy of the whole book, `None` while not yet synced.
    pub fn snapshot(&self) -> Option<BookSnapshot> {
        self.shared.engine.read().snapshot()
    }

    /// Number of head/maker mismatches observed since construction. A
    /// non-zero value means the feed and the local book disagreed and a
    /// resync was forced.
    pub fn corruption_count(&self) -> u64 {
        self.shared.corruption.load(Ordering::Relaxed)
    }
}

/// The sole consumer of the transport's callbacks: sequencing protocol,
/// snapshot bootstrap, and resync decisions.
pub(crate) struct BookDriver<F> {
    product_id: String,
    fetcher: F,
    shared: Arc<Shared>,
}

impl<F> BookDriver<F>
where
    F: SnapshotFetcher + Send + Sync + 'static,
{
    fn new(product_id: String, fetcher: F) -> Self {
        BookDriver {
            product_id,
            fetcher,
            shared: Arc::new(Shared {
                engine: RwLock::new(BookEngine::new()),
                corruption: AtomicU64::new(0),
            }),
        }
    }

    async fn handle(&self, message: FeedMessage) -> FeedDirective {
        if let FeedMessage::Error(err) = &message {
            warn!(message = %err.message, "feed reported an error");
            return FeedDirective::Continue;
        }

        let Some(event) = message.into_book_event() else {
            return FeedDirective::Continue;
        };

        // First sequenced message after (re)start: bootstrap from a full
        // snapshot, then run this event through the normal sequence check.
        if !self.shared.engine.read().is_synced() {
            match self.fetcher.fetch_snapshot(&self.product_id).await {
                Ok(snapshot) => {
                    let sequence = snapshot.sequence;
                    self.shared.engine.write().load_snapshot(snapshot);
                    info!(product_id = %self.product_id, sequence, "book synchronized");
                }
                Err(e) => {
                    error!(product_id = %self.product_id, error = ?e, "snapshot fetch failed");
                    return self.resync();
                }
            }
        }

        // Bind before matching: the arms below re-lock for the reset.
        let applied = self.shared.engine.write().apply(&event);
        match applied {
            Ok(_) => FeedDirective::Continue,
            Err(BookError::SequenceGap { cursor, sequence }) => {
                warn!(cursor, sequence, "sequence gap, resynchronizing");
                self.resync()
            }
            Err(err @ BookError::HeadMismatch { .. }) => {
                self.shared.corruption.fetch_add(1, Ordering::Relaxed);
                error!(error = %err, "book diverged from feed, resynchronizing");
                self.resync()
            }
            Err(BookError::NotSynced) => self.resync(),
        }
    }

    /// Back to the uninitialized sentinel; the transport reopens after its
    /// fixed delay and the next message refetches the snapshot.
    fn resync(&self) -> FeedDirective {
        self.shared.engine.write().reset();
        FeedDirective::Restart
    }
}

impl<F> FeedHandler for BookDriver<F>
where
    F: SnapshotFetcher + Send + Sync + 'static,
{
    fn on_open(&self) {
        info!(product_id = %self.product_id, "feed open");
    }

    async fn on_message(&self, message: FeedMessage) -> FeedDirective {
        self.handle(message).await
    }

    fn on_close(&self) {
        info!(product_id = %self.product_id, "feed closed");
    }

    /// Every transport-level error is recoverable via full resync.
    fn on_error(&self, error: &FeedError) -> FeedDirective {
        warn!(error = %error, "feed error, resynchronizing");
        self.resync()
    }
}
