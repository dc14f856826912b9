use crate::coinbase::FeedMessage;
use crate::ws::{self, WsError, WsStream};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Delay before retrying a failed connect.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(10);
/// Delay between tearing a connection down for resync and reopening it.
pub const RESTART_DELAY: Duration = Duration::from_secs(5);
/// A keepalive ping is sent whenever wall-clock time crosses into a new
/// window of this many seconds.
const KEEPALIVE_WINDOW_SECS: u64 = 30;

const DEFAULT_FEED_URL: &str = "wss://ws-feed.exchange.coinbase.com";
const DEFAULT_PRODUCT: &str = "BTC-USD";

/// What the handler wants the transport to do after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedDirective {
    Continue,
    /// Tear the connection down, wait [`RESTART_DELAY`], reconnect.
    Restart,
}

/// Capability set the transport is polymorphic over. The transport itself
/// carries no order-book semantics; whoever implements this does.
pub trait FeedHandler: Send + Sync + 'static {
    /// Called once per established connection, after the subscribe frame.
    fn on_open(&self);

    /// Called with every successfully parsed feed message.
    fn on_message(&self, message: FeedMessage) -> impl Future<Output = FeedDirective> + Send;

    /// Called exactly once when the client is closed.
    fn on_close(&self);

    /// Called on every receive-path failure. The listen loop does not exit
    /// on errors; it follows the returned directive.
    fn on_error(&self, error: &FeedError) -> FeedDirective;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// Full data subscription for the configured products.
    Subscribe,
    /// Heartbeat-only mode; unsubscribed again on close.
    Heartbeat,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub products: Vec<String>,
    pub mode: ChannelMode,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            url: DEFAULT_FEED_URL.to_owned(),
            products: Vec::new(),
            mode: ChannelMode::Subscribe,
        }
    }
}

impl FeedConfig {
    fn subscribe_frame(&self) -> serde_json::Value {
        match self.mode {
            ChannelMode::Subscribe => {
                let products: Vec<&str> = if self.products.is_empty() {
                    vec![DEFAULT_PRODUCT]
                } else {
                    self.products.iter().map(String::as_str).collect()
                };
                json!({ "type": "subscribe", "product_ids": products })
            }
            ChannelMode::Heartbeat => json!({ "type": "heartbeat", "on": true }),
        }
    }
}

/// One persistent feed connection and its lifecycle:
/// Disconnected → Connecting → Subscribed → Listening → Closing.
///
/// `start` runs the whole lifecycle in a background task. Connect failures
/// retry after a fixed delay; listen failures are routed to the handler,
/// which steers recovery through [`FeedDirective`]s. `close` is idempotent
/// and callable from any context.
pub struct FeedClient<H> {
    inner: Arc<Inner<H>>,
}

struct Inner<H> {
    config: FeedConfig,
    handler: H,
    stopped: AtomicBool,
}

impl<H> Clone for FeedClient<H> {
    fn clone(&self) -> Self {
        FeedClient {
            inner: self.inner.clone(),
        }
    }
}

impl<H: FeedHandler> FeedClient<H> {
    pub fn new(config: FeedConfig, handler: H) -> Self {
        FeedClient {
            inner: Arc::new(Inner {
                config,
                handler,
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn handler(&self) -> &H {
        &self.inner.handler
    }

    pub fn is_closed(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Spawns the connect/listen lifecycle and returns immediately.
    pub fn start(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            Self::run(inner).await;
        });
    }

    /// Stops the lifecycle. The listen loop observes the flag after at most
    /// one further in-flight receive and tears the connection down.
    pub fn close(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            self.inner.handler.on_close();
        }
    }

    async fn run(inner: Arc<Inner<H>>) {
        while !inner.stopped.load(Ordering::SeqCst) {
            // Connecting: retry until the subscribe handshake goes through.
            let mut stream = loop {
                if inner.stopped.load(Ordering::SeqCst) {
                    return;
                }
                match Self::open(&inner).await {
                    Ok(stream) => break stream,
                    Err(e) => {
                        warn!(error = %e, "feed connect failed, retrying");
                        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                    }
                }
            };

            let directive = Self::listen(&inner, &mut stream).await;
            Self::teardown(&inner, stream).await;

            if directive == FeedDirective::Restart && !inner.stopped.load(Ordering::SeqCst) {
                debug!("feed restarting after delay");
                tokio::time::sleep(RESTART_DELAY).await;
            }
        }
    }

    async fn open(inner: &Inner<H>) -> Result<WsStream, FeedError> {
        let mut stream = ws::connect(&inner.config.url)
            .await
            .map_err(FeedError::Connect)?;
        stream
            .send_json(&inner.config.subscribe_frame())
            .await
            .map_err(FeedError::Connect)?;
        info!(url = %inner.config.url, "feed subscribed");
        inner.handler.on_open();
        Ok(stream)
    }

    /// Listening: one blocking receive per iteration. Errors are delivered
    /// to the handler and the loop keeps going unless it is told to restart
    /// or the stop flag has been set.
    async fn listen(inner: &Inner<H>, stream: &mut WsStream) -> FeedDirective {
        let mut ping_window = current_window();

        loop {
            if inner.stopped.load(Ordering::SeqCst) {
                return FeedDirective::Continue;
            }

            let window = current_window();
            if window != ping_window {
                ping_window = window;
                if let Err(e) = stream.send_ping().await {
                    let error = FeedError::Receive(e);
                    if inner.handler.on_error(&error) == FeedDirective::Restart {
                        return FeedDirective::Restart;
                    }
                    continue;
                }
            }

            let error = match stream.receive().await {
                Ok(Some(bytes)) => match serde_json::from_slice::<FeedMessage>(&bytes) {
                    Ok(message) => {
                        if inner.handler.on_message(message).await == FeedDirective::Restart {
                            return FeedDirective::Restart;
                        }
                        continue;
                    }
                    Err(e) => FeedError::Parse(e),
                },
                Ok(None) => FeedError::ConnectionClosed,
                Err(e) => FeedError::Receive(e),
            };

            if inner.handler.on_error(&error) == FeedDirective::Restart {
                return FeedDirective::Restart;
            }
        }
    }

    async fn teardown(inner: &Inner<H>, mut stream: WsStream) {
        if inner.config.mode == ChannelMode::Heartbeat {
            let _ = stream
                .send_json(&json!({ "type": "heartbeat", "on": false }))
                .await;
        }
        stream.close().await;
    }
}

fn current_window() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs() / KEEPALIVE_WINDOW_SECS
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("connect failed: {0}")]
    Connect(#[source] WsError),
    #[error("receive failed: {0}")]
    Receive(#[source] WsError),
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("malformed feed frame: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn subscribe_frame_defaults_product() {
        let config = FeedConfig::default();
        assert_eq!(
            config.subscribe_frame(),
            json!({ "type": "subscribe", "product_ids": ["BTC-USD"] })
        );
    }

    #[test]
    fn subscribe_frame_lists_configured_products() {
        let config = FeedConfig {
            products: vec!["ETH-USD".into(), "BTC-USD".into()],
            ..FeedConfig::default()
        };
        assert_eq!(
            config.subscribe_frame(),
            json!({ "type": "subscribe", "product_ids": ["ETH-USD", "BTC-USD"] })
        );
    }

    #[test]
    fn heartbeat_frame() {
        let config = FeedConfig {
            mode: ChannelMode::Heartbeat,
            ..FeedConfig::default()
        };
        assert_eq!(
            config.subscribe_frame(),
            json!({ "type": "heartbeat", "on": true })
        );
    }
}
