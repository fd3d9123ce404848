//! The OneBot channel: connection supervision, the read loop, outbound
//! sending and inbound dispatch.
//!
//! Exactly one logical connection exists at a time. The supervisor owns the
//! socket lifecycle: it dials, hands the read half to a listener task, keeps
//! the write half behind a write-exclusive lock, and re-dials from a
//! background loop when the listener exits on a transport error. The
//! listener itself never re-dials.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use ingot_core::{Channel, ChannelError, ChannelResult, InboundMessage, InboundSink, OutboundMessage};

use crate::config::OneBotConfig;
use crate::dedup::DedupWindow;
use crate::event::{NormalizedEvent, normalize};
use crate::state::ConnectionState;
use crate::trigger::TriggerClassifier;
use crate::wire::{ApiRequest, RawEvent, flex_i64};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Floor for the reconnect interval, to avoid hot-looping against an
/// unreachable endpoint.
#[cfg(not(test))]
const RECONNECT_FLOOR: Duration = Duration::from_secs(5);
/// Lowered in tests so reconnection can be exercised without multi-second
/// waits.
#[cfg(test)]
const RECONNECT_FLOOR: Duration = Duration::from_millis(200);

/// Handshake timeout for a single dial attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Channel adapter for OneBot v11 over a persistent WebSocket.
pub struct OneBotChannel {
    shared: Arc<Shared>,
}

/// State shared between the caller-facing channel and its background tasks.
struct Shared {
    config: OneBotConfig,
    sink: Arc<dyn InboundSink>,
    trigger: TriggerClassifier,
    /// Lifecycle state; mutated only by the supervisor and the listener's
    /// error path.
    state: Mutex<ConnectionState>,
    /// Write half of the live socket. Also the write-exclusive lock: frames
    /// from concurrent senders never interleave on the wire.
    writer: tokio::sync::Mutex<Option<WsSink>>,
    dedup: Mutex<DedupWindow>,
    /// Connection-scoped monotonically increasing correlation counter.
    echo_counter: AtomicI64,
    running: AtomicBool,
    shutdown: CancellationToken,
}

impl OneBotChannel {
    /// Creates the channel. Does not connect; call
    /// [`start`](ingot_core::Channel::start).
    pub fn new(config: OneBotConfig, sink: Arc<dyn InboundSink>) -> Self {
        let trigger = TriggerClassifier::new(config.group_trigger_prefixes.clone());
        let dedup = Mutex::new(DedupWindow::with_capacity(config.dedup_capacity));
        Self {
            shared: Arc::new(Shared {
                config,
                sink,
                trigger,
                state: Mutex::new(ConnectionState::Disconnected),
                writer: tokio::sync::Mutex::new(None),
                dedup,
                echo_counter: AtomicI64::new(0),
                running: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }
}

#[async_trait]
impl Channel for OneBotChannel {
    fn name(&self) -> &str {
        "onebot"
    }

    async fn start(&self) -> ChannelResult<()> {
        let shared = &self.shared;
        if shared.config.ws_url.is_empty() {
            return Err(ChannelError::NotConfigured("ws_url is empty".to_string()));
        }

        info!(url = %shared.config.ws_url, "Starting OneBot channel");

        match shared.connect().await {
            Ok(source) => shared.spawn_listener(source),
            Err(e) if shared.config.reconnect_interval_secs == 0 => {
                // No reconnect loop to recover this; fail the start.
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, "Initial connection failed, will retry in background");
            }
        }

        if shared.config.reconnect_interval_secs > 0 {
            let shared = Arc::clone(shared);
            tokio::spawn(async move { shared.reconnect_loop().await });
        }

        shared.running.store(true, Ordering::SeqCst);
        info!("OneBot channel started");
        Ok(())
    }

    async fn stop(&self) -> ChannelResult<()> {
        let shared = &self.shared;
        info!("Stopping OneBot channel");
        shared.running.store(false, Ordering::SeqCst);
        shared.transition(ConnectionState::Closing);
        shared.shutdown.cancel();

        // Closing the write half induces the read error that terminates a
        // live listener.
        let mut writer = shared.writer.lock().await;
        if let Some(mut sink) = writer.take() {
            let _ = sink.close().await;
        }
        drop(writer);

        shared.transition(ConnectionState::Disconnected);
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> ChannelResult<()> {
        let shared = &self.shared;
        if !self.is_running() {
            return Err(ChannelError::NotConnected(
                "OneBot channel not running".to_string(),
            ));
        }

        // Connection check comes before destination validation.
        let mut writer = shared.writer.lock().await;
        let sink = writer.as_mut().ok_or_else(|| {
            ChannelError::NotConnected("OneBot WebSocket not connected".to_string())
        })?;

        let (action, params) = build_send_request(&msg.chat_id, &msg.content)?;
        let echo = format!("send_{}", shared.echo_counter.fetch_add(1, Ordering::SeqCst) + 1);

        let request = ApiRequest {
            action,
            params,
            echo,
        };
        let frame =
            serde_json::to_string(&request).map_err(|e| ChannelError::Serialization(e.to_string()))?;

        debug!(action = %action, chat_id = %msg.chat_id, "Sending OneBot action");
        sink.send(Message::Text(frame.into()))
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

impl Shared {
    /// Applies a state transition, rejecting illegal edges.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.lock();
        if state.can_transition(next) {
            trace!(from = ?*state, to = ?next, "Connection state transition");
            *state = next;
            true
        } else {
            trace!(from = ?*state, to = ?next, "Ignoring illegal state transition");
            false
        }
    }

    fn connection_state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Dials the endpoint and stores the write half; returns the read half
    /// for a listener task.
    async fn connect(&self) -> ChannelResult<WsSource> {
        self.transition(ConnectionState::Connecting);

        let url = &self.config.ws_url;
        let connected = async {
            let mut request = url
                .as_str()
                .into_client_request()
                .map_err(|e| ChannelError::ConnectionFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
            if let Some(token) = &self.config.access_token {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    ChannelError::ConnectionFailed {
                        url: url.clone(),
                        reason: format!("invalid access token: {e}"),
                    }
                })?;
                request.headers_mut().insert(AUTHORIZATION, value);
            }

            connect_async(request)
                .await
                .map_err(|e| ChannelError::ConnectionFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })
        };

        let result = tokio::time::timeout(CONNECT_TIMEOUT, connected)
            .await
            .unwrap_or_else(|_| {
                Err(ChannelError::ConnectionFailed {
                    url: url.clone(),
                    reason: "handshake timed out".to_string(),
                })
            });

        match result {
            Ok((stream, _response)) => {
                let (ws_tx, ws_rx) = stream.split();
                *self.writer.lock().await = Some(ws_tx);
                self.transition(ConnectionState::Connected);
                info!(url = %url, "WebSocket connected");
                Ok(ws_rx)
            }
            Err(e) => {
                self.transition(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Spawns the single read loop for one connection generation.
    fn spawn_listener(self: &Arc<Self>, source: WsSource) {
        let shared = Arc::clone(self);
        tokio::spawn(async move { shared.listen(source).await });
    }

    /// Reads frames until the transport fails or shutdown is requested.
    /// Recovery is the reconnect loop's job; this loop never re-dials.
    async fn listen(self: Arc<Self>, mut source: WsSource) {
        loop {
            let msg = tokio::select! {
                _ = self.shutdown.cancelled() => return,
                msg = source.next() => msg,
            };

            match msg {
                Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()).await,
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => self.handle_frame(text).await,
                    Err(e) => warn!(error = %e, "Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Ping(data))) => {
                    trace!("Received ping, sending pong");
                    let mut writer = self.writer.lock().await;
                    if let Some(sink) = writer.as_mut() {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    info!("Server closed connection");
                    self.teardown().await;
                    return;
                }
                Some(Err(e)) => {
                    error!(error = %e, "WebSocket read error");
                    self.teardown().await;
                    return;
                }
                None => {
                    info!("WebSocket stream ended");
                    self.teardown().await;
                    return;
                }
            }
        }
    }

    /// Clears the shared write half and marks the connection lost.
    async fn teardown(&self) {
        let mut writer = self.writer.lock().await;
        if let Some(mut sink) = writer.take() {
            let _ = sink.close().await;
        }
        drop(writer);
        self.transition(ConnectionState::Disconnected);
    }

    /// Re-dials on a fixed interval while the connection is down.
    async fn reconnect_loop(self: Arc<Self>) {
        let interval =
            Duration::from_secs(self.config.reconnect_interval_secs).max(RECONNECT_FLOOR);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }

            if self.connection_state() != ConnectionState::Disconnected {
                continue;
            }

            info!("Attempting to reconnect");
            match self.connect().await {
                Ok(source) => self.spawn_listener(source),
                Err(e) => error!(error = %e, "Reconnect failed"),
            }
        }
    }

    /// Decodes one frame, discards control/response frames, routes events.
    async fn handle_frame(&self, raw: &str) {
        trace!(len = raw.len(), "Frame received");

        let event: RawEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, payload = %truncate(raw, 200), "Dropping malformed frame");
                return;
            }
        };

        // Fire-and-forget correlation: response frames are recognized and
        // discarded, never matched to a waiting caller.
        if event.is_api_response() {
            debug!(echo = %event.echo, "Discarding API response frame");
            return;
        }

        self.dispatch(&event).await;
    }

    /// Routes an inbound event by `post_type`.
    async fn dispatch(&self, raw: &RawEvent) {
        match raw.post_type.as_str() {
            "message" => match normalize(raw) {
                Ok(event) => self.handle_message(event).await,
                Err(e) => warn!(error = %e, "Dropping unnormalizable message event"),
            },
            "meta_event" => self.handle_meta_event(raw),
            "notice" => debug!(sub_type = %raw.sub_type, "Notice event received"),
            "request" => debug!(sub_type = %raw.sub_type, "Request event received"),
            "" => debug!("Event with empty post_type, ignoring"),
            other => debug!(post_type = %other, "Unknown post_type, ignoring"),
        }
    }

    fn handle_meta_event(&self, raw: &RawEvent) {
        match raw.meta_event_type.as_str() {
            "lifecycle" => info!(sub_type = %raw.sub_type, "Lifecycle event"),
            "heartbeat" => trace!("Heartbeat received"),
            other => debug!(meta_event_type = %other, "Unknown meta_event_type"),
        }
    }

    /// Decides whether and how to hand message content to the sink.
    async fn handle_message(&self, event: NormalizedEvent) {
        if self.dedup.lock().check_and_insert(&event.message_id) {
            debug!(message_id = %event.message_id, "Duplicate message, skipping");
            return;
        }

        let mut content = event.content;
        if content.is_empty() {
            debug!(message_id = %event.message_id, "Empty message, ignoring");
            return;
        }

        let sender_id = event.user_id.to_string();
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("message_id".to_string(), event.message_id.clone());

        let chat_id = match event.message_type.as_str() {
            "private" => {
                let chat_id = format!("private:{sender_id}");
                info!(
                    sender = %sender_id,
                    message_id = %event.message_id,
                    content = %truncate(&content, 100),
                    "Received private message"
                );
                chat_id
            }
            "group" => {
                let group_id = event.group_id.to_string();
                metadata.insert("group_id".to_string(), group_id.clone());

                if let Ok(sender_user_id) = flex_i64(&event.sender.user_id)
                    && sender_user_id > 0
                {
                    metadata.insert("sender_user_id".to_string(), sender_user_id.to_string());
                }
                if !event.sender.card.is_empty() {
                    metadata.insert("sender_name".to_string(), event.sender.card.clone());
                } else if !event.sender.nickname.is_empty() {
                    metadata.insert("sender_name".to_string(), event.sender.nickname.clone());
                }

                let (triggered, stripped) =
                    self.trigger.classify(&content, event.is_bot_mentioned);
                if !triggered {
                    debug!(
                        sender = %sender_id,
                        group = %group_id,
                        is_mentioned = event.is_bot_mentioned,
                        "Group message ignored (no trigger)"
                    );
                    return;
                }
                content = stripped;

                info!(
                    sender = %sender_id,
                    group = %group_id,
                    message_id = %event.message_id,
                    is_mentioned = event.is_bot_mentioned,
                    content = %truncate(&content, 100),
                    "Received group message"
                );
                format!("group:{group_id}")
            }
            other => {
                warn!(
                    message_type = %other,
                    message_id = %event.message_id,
                    user_id = event.user_id,
                    "Unknown message type, cannot route"
                );
                return;
            }
        };

        if !event.sender.nickname.is_empty() {
            metadata.insert("nickname".to_string(), event.sender.nickname.clone());
        }

        self.sink
            .deliver(InboundMessage {
                sender_id,
                chat_id,
                content,
                attachments: Vec::new(),
                metadata,
            })
            .await;
    }
}

/// Maps a composite chat id to an action name and parameters.
///
/// `group:<id>` and `private:<id>` address the two scopes; a bare numeric id
/// defaults to private.
fn build_send_request(chat_id: &str, content: &str) -> ChannelResult<(&'static str, Value)> {
    if let Some(rest) = chat_id.strip_prefix("group:") {
        let group_id: i64 = rest
            .parse()
            .map_err(|_| ChannelError::InvalidChatId(chat_id.to_string()))?;
        return Ok((
            "send_group_msg",
            json!({"group_id": group_id, "message": content}),
        ));
    }

    let rest = chat_id.strip_prefix("private:").unwrap_or(chat_id);
    let user_id: i64 = rest
        .parse()
        .map_err(|_| ChannelError::InvalidChatId(chat_id.to_string()))?;
    Ok((
        "send_private_msg",
        json!({"user_id": user_id, "message": content}),
    ))
}

/// Shortens `s` to `max` characters for logging, appending `…` when cut.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}
