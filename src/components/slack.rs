//! Slack integration
//!
//! Two halves: a thin Web API client for outbound messages, and a Socket
//! Mode connection for inbound message events. Socket Mode opens a
//! short-lived websocket URL via `apps.connections.open`, then receives
//! `events_api` envelopes which must be acked by envelope id.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};

use crate::engine::listener::{EventSource, InboundEvent, TriggerFilter};
use crate::registry::{Component, ComponentSpec, IntegrationError, InvocationKind, ParamKind, ParamSpec};

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";
const CONNECTIONS_OPEN_URL: &str = "https://slack.com/api/apps.connections.open";

type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Minimal Slack Web API client.
pub struct SlackClient {
    client: reqwest::Client,
    token: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
        }
    }

    /// `chat.postMessage`; returns the posted message's `ts` and channel.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
    ) -> Result<(String, String), IntegrationError> {
        let response: Value = self
            .client
            .post(POST_MESSAGE_URL)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "channel": channel, "text": text }))
            .send()
            .await?
            .json()
            .await?;

        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            let reason = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(IntegrationError::Api(format!(
                "chat.postMessage failed: {}",
                reason
            )));
        }

        let ts = response
            .get("ts")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let channel = response
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or(channel)
            .to_string();
        Ok((ts, channel))
    }

    /// `apps.connections.open`; returns the wss URL for Socket Mode.
    pub async fn open_socket_url(&self) -> Result<String, IntegrationError> {
        let response: Value = self
            .client
            .post(CONNECTIONS_OPEN_URL)
            .bearer_auth(&self.token)
            .send()
            .await?
            .json()
            .await?;

        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            let reason = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(IntegrationError::Api(format!(
                "apps.connections.open failed: {}",
                reason
            )));
        }

        response
            .get("url")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                IntegrationError::Api("apps.connections.open returned no url".to_string())
            })
    }
}

/// `slack.send_message`: post a message to a channel.
pub struct SendMessage;

impl SendMessage {
    pub fn spec() -> ComponentSpec {
        ComponentSpec::new(
            "slack.send_message",
            vec![
                ParamSpec::required("token", ParamKind::String),
                ParamSpec::required("channel", ParamKind::String),
                ParamSpec::required("message", ParamKind::String),
            ],
            vec!["message_ts", "channel"],
            InvocationKind::Network,
        )
    }
}

#[async_trait]
impl Component for SendMessage {
    async fn invoke(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        let token = config.get("token").map(String::as_str).unwrap_or("");
        let channel = config.get("channel").map(String::as_str).unwrap_or("");
        let message = config.get("message").map(String::as_str).unwrap_or("");

        let (ts, channel) = SlackClient::new(token).post_message(channel, message).await?;
        Ok(HashMap::from([
            ("message_ts".to_string(), ts),
            ("channel".to_string(), channel),
        ]))
    }
}

/// Socket Mode connection surfacing message events.
pub struct SlackSocketSource {
    token: String,
    socket: Option<SocketStream>,
}

impl SlackSocketSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            socket: None,
        }
    }

    /// Ack an `events_api` envelope so Slack does not redeliver it.
    async fn ack(&mut self, envelope_id: &str) -> Result<(), IntegrationError> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| IntegrationError::Connection("socket not connected".to_string()))?;
        let ack = serde_json::json!({ "envelope_id": envelope_id });
        socket
            .send(Message::Text(ack.to_string()))
            .await
            .map_err(|e| IntegrationError::Connection(e.to_string()))
    }
}

/// Extract a message event from an `events_api` envelope payload.
fn message_event(payload: &Value) -> Option<InboundEvent> {
    let event = payload.get("event")?;
    if event.get("type").and_then(Value::as_str) != Some("message") {
        return None;
    }
    // Bot and edited messages carry no plain `user`; skip them so workflows
    // never trigger off their own sends.
    let user_id = event.get("user").and_then(Value::as_str)?;

    Some(InboundEvent {
        channel: event
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        user_id: user_id.to_string(),
        text: event
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        timestamp: event
            .get("ts")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

#[async_trait]
impl EventSource for SlackSocketSource {
    async fn connect(&mut self) -> Result<(), IntegrationError> {
        let url = SlackClient::new(&self.token).open_socket_url().await?;
        let (socket, _) = connect_async(&url)
            .await
            .map_err(|e| IntegrationError::Connection(e.to_string()))?;
        debug!("socket mode connected");
        self.socket = Some(socket);
        Ok(())
    }

    async fn next_event(&mut self) -> Result<InboundEvent, IntegrationError> {
        loop {
            let message = {
                let socket = self.socket.as_mut().ok_or_else(|| {
                    IntegrationError::Connection("socket not connected".to_string())
                })?;
                socket.next().await
            };

            match message {
                Some(Ok(Message::Text(text))) => {
                    let envelope: Value = match serde_json::from_str(&text) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            warn!(error = %e, "ignoring malformed envelope");
                            continue;
                        }
                    };

                    match envelope.get("type").and_then(Value::as_str) {
                        Some("hello") => continue,
                        Some("disconnect") => {
                            return Err(IntegrationError::Connection(
                                "server requested disconnect".to_string(),
                            ));
                        }
                        Some("events_api") => {
                            if let Some(id) = envelope.get("envelope_id").and_then(Value::as_str) {
                                let id = id.to_string();
                                self.ack(&id).await?;
                            }
                            if let Some(event) = envelope
                                .get("payload")
                                .and_then(|p| message_event(p))
                            {
                                return Ok(event);
                            }
                        }
                        _ => continue,
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let socket = self.socket.as_mut().ok_or_else(|| {
                        IntegrationError::Connection("socket not connected".to_string())
                    })?;
                    socket
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| IntegrationError::Connection(e.to_string()))?;
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(IntegrationError::Connection("socket closed".to_string()));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(IntegrationError::Connection(e.to_string()));
                }
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
            debug!("socket mode disconnected");
        }
    }
}

/// `slack.receive_message`: one-shot trigger for direct runs.
///
/// Blocks until a message matching the channel/keyword filter arrives, then
/// returns the event payload. Bounded by its own `timeout` parameter in
/// seconds; `-1` waits indefinitely. Persistent listening goes through the
/// supervisor with a [`SlackSocketSource`] instead.
pub struct ReceiveMessage;

impl ReceiveMessage {
    pub fn spec() -> ComponentSpec {
        ComponentSpec::new(
            "slack.receive_message",
            vec![
                ParamSpec::required("token", ParamKind::String),
                ParamSpec::optional("channel", ParamKind::String),
                ParamSpec::optional("keyword", ParamKind::String),
                ParamSpec::optional("timeout", ParamKind::Number),
            ],
            vec!["message_text", "user_id", "channel", "timestamp"],
            InvocationKind::Subscribe,
        )
    }
}

#[async_trait]
impl Component for ReceiveMessage {
    async fn invoke(
        &self,
        config: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, IntegrationError> {
        let token = config.get("token").cloned().unwrap_or_default();
        let timeout: i64 = config
            .get("timeout")
            .and_then(|v| v.parse().ok())
            .unwrap_or(-1);
        let filter = TriggerFilter::from_config(config);

        let mut source = SlackSocketSource::new(token);
        source.connect().await?;

        let outcome = {
            let matching = async {
                loop {
                    let event = source.next_event().await?;
                    if filter.matches(&event) {
                        return Ok(event);
                    }
                    debug!("event did not match filter, waiting for next");
                }
            };

            if timeout >= 0 {
                match tokio::time::timeout(Duration::from_secs(timeout as u64), matching).await {
                    Ok(result) => result,
                    Err(_) => Err(IntegrationError::Timeout(timeout as u64 * 1000)),
                }
            } else {
                matching.await
            }
        };

        source.disconnect().await;
        let event = outcome?;
        Ok(event.into_payload())
    }
}
