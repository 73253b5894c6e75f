//! Upstream vendor WebSocket client.
//!
//! Maintains a single live streaming connection to the market-data
//! vendor, translates the subscribe/unsubscribe/trade wire protocol,
//! and recovers transparently from drops via exponential backoff. A
//! vendor 429 during the handshake puts the client into a rate-limit
//! cooldown during which no connect attempt is made. The feed is best
//! effort: nothing here surfaces an error to request handlers.

use crate::config::FeedConfig;
use crate::feed::cache::{PriceCache, PriceTick};
use dashmap::DashSet;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle state of the upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt in flight.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The upstream socket is open.
    Connected,
    /// The vendor rate-limited the handshake; cooldown active.
    RateLimited,
}

impl ConnectionState {
    /// Lowercase name for API responses.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::RateLimited => "rate_limited",
        }
    }
}

/// Event emitted on the internal bus for every inbound trade record.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A trade observed on the upstream feed.
    Trade {
        /// Uppercase ticker symbol.
        symbol: String,
        /// Trade price.
        price: f64,
        /// Trade volume.
        volume: f64,
        /// Trade timestamp in epoch milliseconds.
        timestamp_ms: i64,
    },
}

/// Reconnect bookkeeping: attempt counter and rate-limit cooldown.
#[derive(Debug, Default)]
struct ReconnectState {
    attempts: u32,
    rate_limited_until: Option<Instant>,
}

/// Outbound control frame in the vendor wire format.
#[derive(Serialize)]
struct ControlFrame<'a> {
    r#type: &'a str,
    symbol: &'a str,
}

/// Inbound frame, dispatched on the `type` discriminator. Unrecognized
/// types deserialize into `Other` and are ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum InboundFrame {
    Trade {
        #[serde(default)]
        data: Vec<TradeRecord>,
    },
    Ping,
    #[serde(other)]
    Other,
}

/// One trade record in the vendor's compact field naming.
#[derive(Debug, Deserialize)]
struct TradeRecord {
    s: String,
    p: f64,
    #[serde(default)]
    v: f64,
    t: i64,
}

/// Client for the vendor's streaming WebSocket API.
pub struct FeedClient {
    config: FeedConfig,
    cache: Arc<PriceCache>,
    /// Symbols desired upstream. Replayed against every new connection.
    subscriptions: DashSet<String>,
    state: Mutex<ConnectionState>,
    reconnect: Mutex<ReconnectState>,
    /// Write half of the current connection, when one exists.
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    recv_task: Mutex<Option<JoinHandle<()>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    /// Collapses concurrent connect attempts into one.
    connect_lock: tokio::sync::Mutex<()>,
    event_tx: broadcast::Sender<FeedEvent>,
}

impl FeedClient {
    /// Creates a new feed client. Does not connect.
    ///
    /// A missing API key is not an error: the client stays in a
    /// permanently disabled mode and every operation is a no-op.
    #[must_use]
    pub fn new(config: FeedConfig, cache: Arc<PriceCache>) -> Self {
        if config.api_key.is_none() {
            warn!("no feed API key configured, live price data disabled");
        }

        let (event_tx, _) = broadcast::channel(1024);

        Self {
            config,
            cache,
            subscriptions: DashSet::new(),
            state: Mutex::new(ConnectionState::Disconnected),
            reconnect: Mutex::new(ReconnectState::default()),
            outbound: Mutex::new(None),
            recv_task: Mutex::new(None),
            reconnect_task: Mutex::new(None),
            connect_lock: tokio::sync::Mutex::new(()),
            event_tx,
        }
    }

    /// True when an API key is configured.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// True when the upstream socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Number of reconnect attempts since the last successful connect.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect.lock().attempts
    }

    /// True while the rate-limit cooldown is active.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.reconnect
            .lock()
            .rate_limited_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Returns a receiver for feed events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<FeedEvent> {
        self.event_tx.subscribe()
    }

    /// Symbols currently subscribed upstream.
    #[must_use]
    pub fn subscribed_symbols(&self) -> Vec<String> {
        self.subscriptions
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Latest cached price for a symbol. Never blocks on network I/O.
    #[must_use]
    pub fn latest_price(&self, symbol: &str) -> Option<PriceTick> {
        self.cache.get(symbol)
    }

    /// Explicitly connects to the upstream feed.
    ///
    /// Re-arms the automatic retry mechanism, so a client that gave up
    /// after exhausting its attempts resumes retrying. A no-op while
    /// connected, while a connect is in flight, or while the
    /// rate-limit cooldown is active. Failures are logged, never
    /// returned.
    pub async fn connect(self: &Arc<Self>) {
        self.reconnect.lock().attempts = 0;
        self.try_connect().await;
    }

    /// Subscribes to trades for a symbol.
    ///
    /// Idempotent: a symbol already in the subscription set sends no
    /// wire message. Triggers a connect when not connected.
    pub async fn subscribe(self: &Arc<Self>, symbol: &str) {
        if !self.enabled() {
            debug!("feed disabled, ignoring subscribe for {}", symbol);
            return;
        }

        let symbol = symbol.to_uppercase();
        if !self.subscriptions.insert(symbol.clone()) {
            return;
        }

        info!("subscribing upstream to {}", symbol);

        if self.is_connected() {
            self.send_control("subscribe", &symbol);
        } else {
            // The new entry is replayed by the connect path.
            self.connect().await;
        }
    }

    /// Unsubscribes from trades for a symbol.
    pub fn unsubscribe(&self, symbol: &str) {
        if !self.enabled() {
            return;
        }

        let symbol = symbol.to_uppercase();
        if self.subscriptions.remove(&symbol).is_none() {
            return;
        }

        info!("unsubscribing upstream from {}", symbol);

        if self.is_connected() {
            self.send_control("unsubscribe", &symbol);
        }
    }

    /// Tears down the connection, cancelling the receive loop and any
    /// pending reconnect timer.
    pub fn disconnect(&self) {
        if let Some(task) = self.reconnect_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.recv_task.lock().take() {
            task.abort();
        }
        if let Some(tx) = self.outbound.lock().take() {
            let _ = tx.send(Message::Close(None));
        }
        self.set_state(ConnectionState::Disconnected);
        info!("disconnected from upstream feed");
    }

    /// Connect attempt without re-arming the attempt counter. Used by
    /// both the public entry point and the reconnect timer.
    async fn try_connect(self: &Arc<Self>) {
        let Some(api_key) = self.config.api_key.clone() else {
            debug!("feed disabled, ignoring connect request");
            return;
        };

        let _guard = self.connect_lock.lock().await;

        if matches!(
            self.connection_state(),
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            return;
        }

        if self.is_rate_limited() {
            debug!("rate-limit cooldown active, skipping connect");
            return;
        }

        self.set_state(ConnectionState::Connecting);
        let url = format!("{}?token={}", self.config.url, api_key);
        info!("connecting to upstream feed");

        match connect_async(url).await {
            Ok((stream, _response)) => {
                {
                    let mut rc = self.reconnect.lock();
                    rc.attempts = 0;
                    rc.rate_limited_until = None;
                }
                self.set_state(ConnectionState::Connected);
                info!("connected to upstream feed");

                let (mut write, read) = stream.split();
                let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
                *self.outbound.lock() = Some(out_tx);

                // Socket writer: drains the outbound queue so control
                // messages never block callers on network I/O.
                tokio::spawn(async move {
                    while let Some(msg) = out_rx.recv().await {
                        if write.send(msg).await.is_err() {
                            break;
                        }
                    }
                });

                let client = Arc::clone(self);
                let handle = tokio::spawn(async move { client.receive_loop(read).await });
                if let Some(prev) = self.recv_task.lock().replace(handle) {
                    prev.abort();
                }

                for symbol in self.subscriptions.iter() {
                    self.send_control("subscribe", symbol.key());
                }
            }
            Err(err) => {
                if is_rate_limit(&err) {
                    warn!(
                        "upstream feed rate limited, cooling down for {}s",
                        self.config.rate_limit_cooldown_secs
                    );
                    self.reconnect.lock().rate_limited_until =
                        Some(Instant::now() + self.config.rate_limit_cooldown());
                    self.set_state(ConnectionState::RateLimited);
                } else {
                    warn!("failed to connect to upstream feed: {}", err);
                    self.set_state(ConnectionState::Disconnected);
                    self.schedule_reconnect();
                }
            }
        }
    }

    /// Inbound receive loop. Runs until the connection closes, errors,
    /// or the task is aborted by [`FeedClient::disconnect`].
    async fn receive_loop(self: Arc<Self>, mut read: SplitStream<WsStream>) {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => self.process_frame(&text),
                Ok(Message::Close(_)) => {
                    warn!("upstream feed closed by server");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("upstream feed receive error: {}", err);
                    break;
                }
            }
        }

        *self.outbound.lock() = None;
        self.set_state(ConnectionState::Disconnected);
        self.schedule_reconnect();
    }

    /// Parses one inbound text frame. A malformed frame is dropped;
    /// it must never terminate the receive loop.
    fn process_frame(&self, text: &str) {
        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(err) => {
                debug!("dropping malformed feed frame: {}", err);
                return;
            }
        };

        match frame {
            InboundFrame::Trade { data } => {
                for trade in data {
                    let symbol = trade.s.to_uppercase();
                    self.cache.set(&symbol, trade.p, trade.t);

                    let _ = self.event_tx.send(FeedEvent::Trade {
                        symbol: symbol.clone(),
                        price: trade.p,
                        volume: trade.v,
                        timestamp_ms: trade.t,
                    });

                    debug!("trade: {} @ {}", symbol, trade.p);
                }
            }
            InboundFrame::Ping => debug!("received ping from upstream"),
            InboundFrame::Other => {}
        }
    }

    /// Schedules a reconnect attempt after the next backoff delay.
    /// Stores the timer handle so teardown can cancel it.
    fn schedule_reconnect(self: &Arc<Self>) {
        let Some(delay) = self.next_backoff() else {
            return;
        };

        info!("scheduling feed reconnect in {:?}", delay);

        let client = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            client.try_connect().await;
        });
        if let Some(prev) = self.reconnect_task.lock().replace(handle) {
            prev.abort();
        }
    }

    /// Advances the attempt counter and returns the backoff delay, or
    /// `None` when attempts are exhausted or a cooldown is active.
    fn next_backoff(&self) -> Option<Duration> {
        let mut rc = self.reconnect.lock();

        if rc
            .rate_limited_until
            .is_some_and(|until| Instant::now() < until)
        {
            return None;
        }
        if rc.attempts >= self.config.max_reconnect_attempts {
            warn!("feed reconnect attempts exhausted, waiting for an explicit connect");
            return None;
        }

        rc.attempts += 1;
        Some(self.config.reconnect_base_delay() * 2u32.pow(rc.attempts - 1))
    }

    /// Queues a control frame on the current connection, if any.
    fn send_control(&self, kind: &str, symbol: &str) -> bool {
        let Some(tx) = self.outbound.lock().clone() else {
            return false;
        };
        let Ok(frame) = serde_json::to_string(&ControlFrame {
            r#type: kind,
            symbol,
        }) else {
            return false;
        };
        tx.send(Message::Text(frame.into())).is_ok()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }
}

/// True when the handshake failed with an HTTP 429.
fn is_rate_limit(err: &tungstenite::Error) -> bool {
    matches!(err, tungstenite::Error::Http(response) if response.status() == 429)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(api_key: Option<&str>) -> Arc<FeedClient> {
        let config = FeedConfig {
            // Nothing listens here; connect attempts fail fast.
            url: "ws://127.0.0.1:9".to_string(),
            api_key: api_key.map(str::to_string),
            ..FeedConfig::default()
        };
        Arc::new(FeedClient::new(config, Arc::new(PriceCache::new())))
    }

    #[test]
    fn test_backoff_schedule_doubles_then_gives_up() {
        let client = test_client(Some("key"));

        let delays: Vec<_> = (0..5).map(|_| client.next_backoff()).collect();
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_secs(5)),
                Some(Duration::from_secs(10)),
                Some(Duration::from_secs(20)),
                Some(Duration::from_secs(40)),
                Some(Duration::from_secs(80)),
            ]
        );

        // Attempt 6 exceeds the cap.
        assert_eq!(client.next_backoff(), None);
        assert_eq!(client.reconnect_attempts(), 5);
    }

    #[test]
    fn test_cooldown_preempts_backoff() {
        let client = test_client(Some("key"));
        client.reconnect.lock().rate_limited_until =
            Some(Instant::now() + Duration::from_secs(300));

        assert!(client.is_rate_limited());
        assert_eq!(client.next_backoff(), None);
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_connect_is_noop_during_cooldown() {
        let client = test_client(Some("key"));
        {
            let mut rc = client.reconnect.lock();
            rc.rate_limited_until = Some(Instant::now() + Duration::from_secs(300));
        }
        client.set_state(ConnectionState::RateLimited);

        client.connect().await;

        assert_eq!(client.connection_state(), ConnectionState::RateLimited);
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_disabled_client_ignores_operations() {
        let client = test_client(None);

        assert!(!client.enabled());
        client.connect().await;
        client.subscribe("AAPL").await;
        client.unsubscribe("AAPL");

        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert!(client.subscribed_symbols().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let client = test_client(Some("key"));

        client.subscribe("aapl").await;
        client.subscribe("AAPL").await;

        assert_eq!(client.subscribed_symbols(), vec!["AAPL".to_string()]);
    }

    #[test]
    fn test_trade_frame_updates_cache_and_emits_in_order() {
        let client = test_client(Some("key"));
        let mut events = client.subscribe_events();

        client.process_frame(
            r#"{"type":"trade","data":[
                {"s":"TSLA","p":250.10,"v":100,"t":1700000000000},
                {"s":"TSLA","p":250.25,"v":50,"t":1700000000100}
            ]}"#,
        );

        let tick = client.latest_price("TSLA").expect("price cached");
        assert_eq!(tick.price, 250.25);
        assert_eq!(tick.timestamp_ms, 1_700_000_000_100);

        let FeedEvent::Trade { symbol, price, .. } = events.try_recv().expect("first event");
        assert_eq!(symbol, "TSLA");
        assert_eq!(price, 250.10);
        let FeedEvent::Trade { price, .. } = events.try_recv().expect("second event");
        assert_eq!(price, 250.25);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_malformed_frame_does_not_poison_the_parser() {
        let client = test_client(Some("key"));

        client.process_frame("{ this is not json");
        client.process_frame(r#"{"type":"trade","data":"oops"}"#);
        client.process_frame(r#"{"type":"trade","data":[{"s":"AAPL","p":187.5,"v":10,"t":1700000000000}]}"#);

        assert_eq!(client.latest_price("AAPL").map(|t| t.price), Some(187.5));
    }

    #[test]
    fn test_ping_and_unknown_frames_are_ignored() {
        let client = test_client(Some("key"));

        client.process_frame(r#"{"type":"ping"}"#);
        client.process_frame(r#"{"type":"news","data":[]}"#);

        assert!(client.latest_price("AAPL").is_none());
    }

    #[test]
    fn test_429_detection() {
        let mut response = tungstenite::handshake::client::Response::new(None);
        *response.status_mut() = tungstenite::http::StatusCode::TOO_MANY_REQUESTS;
        assert!(is_rate_limit(&tungstenite::Error::Http(Box::new(response))));
        assert!(!is_rate_limit(&tungstenite::Error::ConnectionClosed));
    }
}
