//! Chat session channel
//!
//! One WebSocket connection is one conversation. The greeting goes out
//! first, then every text frame is run through the turn pipeline and
//! answered with a JSON envelope `{text, audio, emotion}`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Instant;

use snow_paws_agent::SessionState;

use crate::metrics::{
    record_error, record_heartbeat, record_session_closed, record_session_opened, record_turn,
};
use crate::state::AppState;
use crate::ServerError;

/// Reply to a heartbeat frame
pub const HEARTBEAT_ACK: &str = r#"{"type":"heartbeat"}"#;

const HEARTBEAT_SENTINEL: &str = "heartbeat";

/// Lifecycle of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    GreetingSent,
    AwaitingMessage,
    Processing,
    Closed,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Connecting => "connecting",
            ChannelState::GreetingSent => "greeting_sent",
            ChannelState::AwaitingMessage => "awaiting_message",
            ChannelState::Processing => "processing",
            ChannelState::Closed => "closed",
        }
    }

    /// Whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: ChannelState) -> bool {
        use ChannelState::*;
        matches!(
            (self, next),
            (Connecting, GreetingSent)
                | (GreetingSent, AwaitingMessage)
                | (AwaitingMessage, Processing)
                | (Processing, AwaitingMessage)
                | (_, Closed)
        )
    }
}

/// Inbound text frame after parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Heartbeat,
    Text(String),
    Empty,
}

#[derive(Debug, Deserialize)]
struct JsonFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
}

impl InboundFrame {
    /// Accepts raw text, the `heartbeat` sentinel, and JSON frames of the
    /// form `{"type": "...", "text": "..."}`
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return InboundFrame::Empty;
        }
        if trimmed == HEARTBEAT_SENTINEL {
            return InboundFrame::Heartbeat;
        }

        if trimmed.starts_with('{') {
            if let Ok(frame) = serde_json::from_str::<JsonFrame>(trimmed) {
                match frame.kind.as_deref() {
                    Some(HEARTBEAT_SENTINEL) => return InboundFrame::Heartbeat,
                    None | Some("message") | Some("text") | Some("chat") => {
                        if let Some(text) = frame.text {
                            return Self::from_text(&text);
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        InboundFrame::Text(trimmed.to_string())
    }

    fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            InboundFrame::Empty
        } else {
            InboundFrame::Text(text.to_string())
        }
    }
}

/// Connection state with logged transitions
struct Channel {
    session_id: String,
    state: ChannelState,
}

impl Channel {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            state: ChannelState::Connecting,
        }
    }

    fn transition(&mut self, next: ChannelState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                session_id = %self.session_id,
                from = self.state.as_str(),
                to = next.as_str(),
                "Unexpected channel transition"
            );
        }
        tracing::debug!(
            session_id = %self.session_id,
            from = self.state.as_str(),
            to = next.as_str(),
            "Channel state changed"
        );
        self.state = next;
    }
}

type Sender = SplitSink<WebSocket, Message>;
type Receiver = SplitStream<WebSocket>;

/// `GET /chat`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut session = SessionState::new();
    let mut channel = Channel::new(session.id());
    let opened = Instant::now();
    record_session_opened();
    tracing::info!(session_id = %session.id(), "Chat session opened");

    let (mut sender, mut receiver) = socket.split();
    let result = run(&state, &mut session, &mut channel, &mut sender, &mut receiver).await;

    if let Err(e) = result {
        record_error("websocket");
        tracing::warn!(session_id = %session.id(), error = %e, "Chat session ended with error");
    }
    channel.transition(ChannelState::Closed);
    let _ = sender.close().await;
    record_session_closed(opened.elapsed());
    tracing::info!(
        session_id = %session.id(),
        turns = session.turns().len(),
        duration_secs = opened.elapsed().as_secs(),
        "Chat session closed"
    );
}

/// Drive the connection until the client leaves
async fn run(
    state: &AppState,
    session: &mut SessionState,
    channel: &mut Channel,
    sender: &mut Sender,
    receiver: &mut Receiver,
) -> Result<(), ServerError> {
    let greeting = state.pipeline.greeting(session).await?;
    send_text(sender, envelope_json(&greeting)?).await?;
    channel.transition(ChannelState::GreetingSent);
    channel.transition(ChannelState::AwaitingMessage);

    let max_pending = state.config.server.max_pending_messages;
    let mut pending: VecDeque<String> = VecDeque::new();

    loop {
        let text = match pending.pop_front() {
            Some(text) => text,
            None => match receiver.next().await {
                None | Some(Ok(Message::Close(_))) => return Ok(()),
                Some(Err(e)) => return Err(ServerError::WebSocket(e.to_string())),
                Some(Ok(Message::Ping(data))) => {
                    send(sender, Message::Pong(data)).await?;
                    continue;
                }
                Some(Ok(Message::Text(raw))) => match InboundFrame::parse(&raw) {
                    InboundFrame::Heartbeat => {
                        answer_heartbeat(sender).await?;
                        continue;
                    }
                    InboundFrame::Empty => continue,
                    InboundFrame::Text(text) => text,
                },
                Some(Ok(_)) => continue,
            },
        };

        channel.transition(ChannelState::Processing);
        let report = {
            let turn = state.pipeline.process(&text, session);
            tokio::pin!(turn);

            loop {
                tokio::select! {
                    result = &mut turn => break result?,
                    incoming = receiver.next() => match incoming {
                        None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
                            tracing::info!(
                                session_id = %channel.session_id,
                                "Client left mid-turn, dropping reply"
                            );
                            return Ok(());
                        }
                        Some(Ok(Message::Ping(data))) => send(sender, Message::Pong(data)).await?,
                        Some(Ok(Message::Text(raw))) => match InboundFrame::parse(&raw) {
                            InboundFrame::Heartbeat => answer_heartbeat(sender).await?,
                            InboundFrame::Empty => {}
                            InboundFrame::Text(queued) => {
                                if pending.len() < max_pending {
                                    pending.push_back(queued);
                                } else {
                                    record_error("pending_overflow");
                                    tracing::warn!(
                                        session_id = %channel.session_id,
                                        max_pending,
                                        "Pending queue full, dropping message"
                                    );
                                }
                            }
                        },
                        Some(Ok(_)) => {}
                    }
                }
            }
        };

        send_text(sender, envelope_json(&report.envelope)?).await?;
        record_turn(&report, state.pipeline.speech_enabled());
        channel.transition(ChannelState::AwaitingMessage);
    }
}

fn envelope_json(envelope: &snow_paws_core::MessageEnvelope) -> Result<String, ServerError> {
    envelope
        .to_json()
        .map_err(|e| ServerError::Internal(e.to_string()))
}

async fn answer_heartbeat(sender: &mut Sender) -> Result<(), ServerError> {
    record_heartbeat();
    send_text(sender, HEARTBEAT_ACK.to_string()).await
}

async fn send_text(sender: &mut Sender, text: String) -> Result<(), ServerError> {
    send(sender, Message::Text(text)).await
}

async fn send(sender: &mut Sender, message: Message) -> Result<(), ServerError> {
    sender
        .send(message)
        .await
        .map_err(|e| ServerError::WebSocket(e.to_string()))
}
