//! Realtime snapshot feed with reconnect backoff.
//!
//! The feed is level-triggered: every message carries the full current
//! row set for its scope, not a diff. Snapshots are published through a
//! `tokio::sync::watch` channel, which gives superseding-replace
//! semantics for free - if a newer snapshot arrives while an older one
//! is still undelivered, the newer one wins entirely - while observers
//! still see snapshots in arrival order.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use lineup_core::{Collection, Filter, Record, Timestamp};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::config::ReconnectConfig;

/// One authoritative row set for a subscribed scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Full current row set, in the order the service emitted it.
    pub rows: Vec<Record>,
    /// When this client observed the snapshot.
    pub observed_at: Timestamp,
}

/// Wire shape of one feed message.
#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[allow(dead_code)]
    collection: String,
    rows: Vec<Record>,
}

/// A standing subscription to one collection under one filter.
///
/// Dropping or [`close`](Self::close)-ing the subscription stops
/// delivery and releases the underlying connection. A stalled feed is
/// not an outage on its own; callers needing a guaranteed point-in-time
/// answer use an explicit fetch.
pub struct Subscription {
    rx: watch::Receiver<Option<Snapshot>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Assemble a subscription from a snapshot channel and the task that
    /// feeds it. `task` is `None` for in-process feeds (tests, fakes).
    pub fn new(rx: watch::Receiver<Option<Snapshot>>, task: Option<JoinHandle<()>>) -> Self {
        Self { rx, task }
    }

    /// Wait for the next snapshot. Returns `None` once the feed has
    /// been closed from the producing side.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        loop {
            self.rx.changed().await.ok()?;
            let snapshot = self.rx.borrow_and_update().clone();
            if snapshot.is_some() {
                return snapshot;
            }
        }
    }

    /// The most recently delivered snapshot, if any, without waiting.
    pub fn latest(&self) -> Option<Snapshot> {
        self.rx.borrow().clone()
    }

    /// Stop delivery and release the connection.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Websocket client that keeps one feed per subscription alive across
/// reconnects.
#[derive(Clone)]
pub struct RealtimeClient {
    endpoint: String,
    api_key: Option<String>,
    bearer_token: Option<String>,
    reconnect: ReconnectConfig,
}

impl RealtimeClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        bearer_token: Option<String>,
        reconnect: ReconnectConfig,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            bearer_token,
            reconnect,
        }
    }

    /// Open a standing feed for `collection` under `filter`. The filter
    /// must match the shape used for reads so the feed covers exactly
    /// the same rows.
    pub fn subscribe(&self, collection: Collection, filter: &Filter) -> Subscription {
        let (tx, rx) = watch::channel(None);
        let frame = serde_json::json!({
            "action": "subscribe",
            "collection": collection.wire_name(),
            "filter": filter,
        })
        .to_string();
        let client = self.clone();
        let task = tokio::spawn(async move {
            client.run_feed(frame, tx).await;
        });
        Subscription::new(rx, Some(task))
    }

    async fn run_feed(&self, frame: String, tx: watch::Sender<Option<Snapshot>>) {
        let mut backoff = self.reconnect.initial_ms;
        loop {
            if tx.is_closed() {
                return;
            }
            match self.connect(&frame).await {
                Ok(mut stream) => {
                    backoff = self.reconnect.initial_ms;
                    while let Some(message) = stream.next().await {
                        match message {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<FeedMessage>(&text) {
                                    Ok(msg) => {
                                        let snapshot = Snapshot {
                                            rows: msg.rows,
                                            observed_at: Utc::now(),
                                        };
                                        if tx.send(Some(snapshot)).is_err() {
                                            return;
                                        }
                                    }
                                    Err(err) => {
                                        warn!(%err, "undecodable feed message, skipping");
                                    }
                                }
                            }
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(err) => {
                                warn!(%err, "feed stream error");
                                break;
                            }
                        }
                    }
                    debug!("feed disconnected, reconnecting");
                }
                Err(err) => {
                    warn!(%err, "feed connect failed");
                }
            }

            let delay = jittered_backoff(backoff, self.reconnect.jitter_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let next = (backoff as f64 * self.reconnect.multiplier) as u64;
            backoff = next.min(self.reconnect.max_ms);
        }
    }

    async fn connect(
        &self,
        frame: &str,
    ) -> Result<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        tokio_tungstenite::tungstenite::Error,
    > {
        let mut request = Request::builder()
            .uri(self.endpoint.clone())
            .body(())
            .map_err(tokio_tungstenite::tungstenite::Error::HttpFormat)?;
        let headers = request.headers_mut();
        if let Some(api_key) = &self.api_key {
            if let Ok(value) = api_key.parse() {
                headers.insert("x-api-key", value);
            }
        }
        if let Some(token) = &self.bearer_token {
            if let Ok(value) = format!("Bearer {token}").parse() {
                headers.insert("authorization", value);
            }
        }
        let (mut stream, _) = tokio_tungstenite::connect_async(request).await?;
        stream.send(Message::Text(frame.to_string())).await?;
        Ok(stream)
    }
}

fn jittered_backoff(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_nanos(0))
        .subsec_nanos() as u64;
    let jitter = nanos % jitter_ms;
    base_ms.saturating_add(jitter)
}
