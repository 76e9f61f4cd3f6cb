//! Chat sessions over a real socket

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

use snow_paws_agent::{ResponseGenerator, TurnPipeline};
use snow_paws_config::{Persona, Settings};
use snow_paws_llm::{GenerationOptions, Message, MockBackend};
use snow_paws_server::websocket::HEARTBEAT_ACK;
use snow_paws_server::{create_router, AppState};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(pipeline: TurnPipeline) -> String {
    let app = create_router(AppState::new(Settings::default(), pipeline));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{}/chat", addr)
}

/// Pipeline whose model echoes the user text after `delay`
fn echo_pipeline(delay: Duration) -> (TurnPipeline, MockBackend) {
    let persona = Arc::new(Persona::snow_paws());
    let backend = MockBackend::new(|messages: &[Message], _: &GenerationOptions| {
        Ok(format!("echo: {}", messages.last().unwrap().content))
    })
    .with_delay(delay);
    let generator = ResponseGenerator::new(
        persona.clone(),
        Arc::new(backend.clone()),
        GenerationOptions::new().with_timeout(Duration::from_secs(5)),
    );
    (TurnPipeline::canned_only(persona).with_generator(generator), backend)
}

async fn connect(url: &str) -> Client {
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

async fn send(socket: &mut Client, text: &str) {
    socket.send(WsMessage::Text(text.to_string())).await.unwrap();
}

/// Next text frame, skipping control frames
async fn next_text(socket: &mut Client) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("frame within deadline")
            .expect("socket open")
            .unwrap();
        match frame {
            WsMessage::Text(text) => return text,
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

async fn next_envelope(socket: &mut Client) -> serde_json::Value {
    serde_json::from_str(&next_text(socket).await).unwrap()
}

#[tokio::test]
async fn test_greeting_then_replies_in_order() {
    let persona = Persona::snow_paws();
    let url = serve(TurnPipeline::canned_only(Arc::new(Persona::snow_paws()))).await;
    let mut socket = connect(&url).await;

    let greeting = next_envelope(&mut socket).await;
    assert_eq!(greeting["text"], persona.greeting.en);
    assert_eq!(greeting["emotion"], "happy");
    assert!(greeting["audio"].is_null());

    send(&mut socket, "tell me a story").await;
    send(&mut socket, "I feel tired").await;

    assert_eq!(next_envelope(&mut socket).await["text"], persona.canned[2].reply.en);
    assert_eq!(next_envelope(&mut socket).await["text"], persona.canned[3].reply.en);
}

#[tokio::test]
async fn test_heartbeat_gets_ack_and_no_envelope() {
    let persona = Persona::snow_paws();
    let url = serve(TurnPipeline::canned_only(Arc::new(Persona::snow_paws()))).await;
    let mut socket = connect(&url).await;
    next_envelope(&mut socket).await;

    send(&mut socket, "heartbeat").await;
    assert_eq!(next_text(&mut socket).await, HEARTBEAT_ACK);

    send(&mut socket, r#"{"type":"heartbeat"}"#).await;
    assert_eq!(next_text(&mut socket).await, HEARTBEAT_ACK);

    // The frame after the acks is the reply to this message
    send(&mut socket, "tell me a story").await;
    let reply = next_envelope(&mut socket).await;
    assert_eq!(reply["text"], persona.canned[2].reply.en);
}

#[tokio::test]
async fn test_messages_during_slow_turn_are_queued() {
    let (pipeline, backend) = echo_pipeline(Duration::from_millis(200));
    let url = serve(pipeline).await;
    let mut socket = connect(&url).await;
    next_envelope(&mut socket).await;

    send(&mut socket, "first question").await;
    send(&mut socket, "second question").await;
    send(&mut socket, "heartbeat").await;

    // Heartbeat is answered while the first turn is still running
    assert_eq!(next_text(&mut socket).await, HEARTBEAT_ACK);
    assert_eq!(next_envelope(&mut socket).await["text"], "echo: first question");
    assert_eq!(next_envelope(&mut socket).await["text"], "echo: second question");
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_close_mid_turn_sends_nothing() {
    let (pipeline, backend) = echo_pipeline(Duration::from_millis(300));
    let url = serve(pipeline).await;
    let mut socket = connect(&url).await;
    next_envelope(&mut socket).await;

    send(&mut socket, "first question").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    socket.close(None).await.unwrap();

    let drain = async {
        while let Some(frame) = socket.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => panic!("reply after close: {}", text),
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), drain).await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(backend.call_count(), 1);
}
