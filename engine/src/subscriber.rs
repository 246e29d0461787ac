use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use migration_core::telemetry::{
    HEARTBEAT_TIMEOUTS, LOG_EVENTS_TOTAL, MALFORMED_MESSAGES_TOTAL, WEBSOCKET_RECONNECTS, WEBSOCKET_STATUS,
};
use migration_core::{LogEvent, UNKNOWN_PROGRAM};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

pub const BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const BACKOFF_CAP: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("no pong within {0:?}")]
    HeartbeatTimeout(Duration),
    #[error("every logsSubscribe request was rejected")]
    NoSubscriptions,
    #[error("event receiver dropped")]
    ChannelClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Subscribed,
    Closed,
    Errored,
    Reconnecting,
}

/// Doubling delay between reconnects, capped; reset once a subscription is live again.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    cap: Duration,
    current: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(BACKOFF_BASE, BACKOFF_CAP)
    }
}

impl ReconnectBackoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap, current: base }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.cap);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Ack { request_id: u64, subscription_id: u64 },
    Rejected { request_id: u64, reason: String },
    Log(LogEvent),
    Ignored,
}

pub fn subscribe_request(request_id: u64, program_id: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": request_id,
        "method": "logsSubscribe",
        "params": [{ "mentions": [program_id] }, { "commitment": "confirmed" }]
    })
}

/// Classifies one text frame. `subscriptions` maps subscription id to program id;
/// notifications from unknown subscriptions are attributed to [`UNKNOWN_PROGRAM`].
pub fn parse_message(text: &str, subscriptions: &HashMap<u64, String>) -> Result<Inbound, serde_json::Error> {
    let json: Value = serde_json::from_str(text)?;

    // 1. Responses to our own requests (id based)
    if let Some(request_id) = json.get("id").and_then(Value::as_u64) {
        if let Some(subscription_id) = json.get("result").and_then(Value::as_u64) {
            return Ok(Inbound::Ack { request_id, subscription_id });
        }
        if let Some(err) = json.get("error") {
            return Ok(Inbound::Rejected { request_id, reason: err.to_string() });
        }
        return Ok(Inbound::Ignored);
    }

    // 2. Notifications (params based)
    if json.get("method").and_then(Value::as_str) != Some("logsNotification") {
        return Ok(Inbound::Ignored);
    }
    let Some(params) = json.get("params") else {
        return Ok(Inbound::Ignored);
    };
    let Some(value) = params.get("result").and_then(|r| r.get("value")) else {
        return Ok(Inbound::Ignored);
    };
    let Some(signature) = value.get("signature").and_then(Value::as_str) else {
        return Ok(Inbound::Ignored);
    };

    let program_id = params
        .get("subscription")
        .and_then(Value::as_u64)
        .and_then(|id| subscriptions.get(&id))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_PROGRAM.to_string());
    let logs = value
        .get("logs")
        .and_then(Value::as_array)
        .map(|lines| lines.iter().filter_map(|l| l.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    Ok(Inbound::Log(LogEvent { program_id, signature: signature.to_string(), logs }))
}

/// One WebSocket connection serving a `logsSubscribe` per program id.
pub struct LogSubscriber {
    ws_url: String,
    program_ids: Vec<String>,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    backoff: ReconnectBackoff,
    state: ConnectionState,
    next_request_id: u64,
}

impl LogSubscriber {
    pub fn new(ws_url: impl Into<String>, program_ids: Vec<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            program_ids,
            heartbeat_interval: Duration::from_secs(15),
            heartbeat_timeout: Duration::from_secs(10),
            backoff: ReconnectBackoff::default(),
            state: ConnectionState::Disconnected,
            next_request_id: 1,
        }
    }

    pub fn with_heartbeat(mut self, interval: Duration, timeout: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.heartbeat_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: ReconnectBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!("📡 Subscriber {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Runs until the event receiver is dropped. Reconnects forever otherwise.
    pub async fn run(mut self, events: mpsc::UnboundedSender<LogEvent>) {
        info!("📡 Starting log subscriber: {} ({} programs)", self.ws_url, self.program_ids.len());

        loop {
            if let Err(SubscriberError::ChannelClosed) = self.connect_once(&events).await {
                info!("📡 Event receiver gone, subscriber stopping");
                WEBSOCKET_STATUS.set(0);
                self.transition(ConnectionState::Disconnected);
                return;
            }

            let delay = self.schedule_reconnect();
            tokio::time::sleep(delay).await;
        }
    }

    /// One connection lifetime. Leaves the state at `Closed` or `Errored`.
    async fn connect_once(&mut self, events: &mpsc::UnboundedSender<LogEvent>) -> Result<(), SubscriberError> {
        self.transition(ConnectionState::Connecting);
        match self.session(events).await {
            Ok(()) => {
                self.transition(ConnectionState::Closed);
                warn!("📡 Subscription closed by peer");
                Ok(())
            }
            Err(SubscriberError::ChannelClosed) => Err(SubscriberError::ChannelClosed),
            Err(e) => {
                self.transition(ConnectionState::Errored);
                error!("❌ Subscription failed: {}", e);
                Err(e)
            }
        }
    }

    fn schedule_reconnect(&mut self) -> Duration {
        WEBSOCKET_STATUS.set(0);
        self.transition(ConnectionState::Reconnecting);
        let delay = self.backoff.next_delay();
        WEBSOCKET_RECONNECTS.inc();
        warn!("🔄 Reconnecting in {:?}...", delay);
        delay
    }

    async fn session(&mut self, events: &mpsc::UnboundedSender<LogEvent>) -> Result<(), SubscriberError> {
        let (ws_stream, _) = connect_async(self.ws_url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        // 1. Subscribe every program
        let mut pending: HashMap<u64, String> = HashMap::new();
        let mut subscriptions: HashMap<u64, String> = HashMap::new();
        for program_id in self.program_ids.clone() {
            let request_id = self.next_request_id;
            self.next_request_id += 1;
            let request = subscribe_request(request_id, &program_id);
            write.send(Message::Text(request.to_string().into())).await?;
            pending.insert(request_id, program_id);
        }

        // 2. Heartbeat
        let mut heartbeat = tokio::time::interval_at(Instant::now() + self.heartbeat_interval, self.heartbeat_interval);
        let mut pong_deadline: Option<Instant> = None;

        // 3. Main loop
        loop {
            let deadline = pong_deadline.unwrap_or_else(|| Instant::now() + self.heartbeat_timeout);
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => match parse_message(&text, &subscriptions) {
                            Ok(Inbound::Ack { request_id, subscription_id }) => {
                                if let Some(program_id) = pending.remove(&request_id) {
                                    info!("✅ Subscribed: {} (ID: {})", program_id, subscription_id);
                                    subscriptions.insert(subscription_id, program_id);
                                    if self.state != ConnectionState::Subscribed {
                                        self.transition(ConnectionState::Subscribed);
                                        self.backoff.reset();
                                        WEBSOCKET_STATUS.set(1);
                                    }
                                }
                            }
                            Ok(Inbound::Rejected { request_id, reason }) => {
                                let program = pending.remove(&request_id).unwrap_or_default();
                                error!("❌ logsSubscribe rejected for {}: {}", program, reason);
                                if pending.is_empty() && subscriptions.is_empty() {
                                    return Err(SubscriberError::NoSubscriptions);
                                }
                            }
                            Ok(Inbound::Log(event)) => {
                                LOG_EVENTS_TOTAL.inc();
                                events.send(event).map_err(|_| SubscriberError::ChannelClosed)?;
                            }
                            Ok(Inbound::Ignored) => {}
                            Err(e) => {
                                MALFORMED_MESSAGES_TOTAL.inc();
                                warn!("⚠️ Malformed frame skipped: {}", e);
                            }
                        },
                        Some(Ok(Message::Pong(_))) => pong_deadline = None,
                        Some(Ok(Message::Ping(payload))) => write.send(Message::Pong(payload)).await?,
                        Some(Ok(Message::Close(frame))) => {
                            debug!("Close frame: {:?}", frame);
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_deadline.is_none() {
                        write.send(Message::Ping(Default::default())).await?;
                        pong_deadline = Some(Instant::now() + self.heartbeat_timeout);
                    }
                }
                _ = tokio::time::sleep_until(deadline), if pong_deadline.is_some() => {
                    HEARTBEAT_TIMEOUTS.inc();
                    return Err(SubscriberError::HeartbeatTimeout(self.heartbeat_timeout));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "subscriber_tests.rs"]
mod subscriber_tests;
