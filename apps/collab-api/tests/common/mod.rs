use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use collab_api::config::Config;
use collab_api::AppState;

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for an expected frame before failing.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Config suitable for tests: long idle timeout, small queues.
pub fn test_config() -> Config {
    Config {
        client_idle_timeout: Duration::from_secs(30),
        outbound_queue_capacity: 64,
        ..Config::default()
    }
}

/// Build the full application router wired to a fresh state.
pub fn test_app() -> (Router, AppState) {
    let state = AppState::new(test_config());
    let app = collab_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the background.
pub async fn start_server_with(config: Config) -> (SocketAddr, AppState) {
    let state = AppState::new(config);
    let app = collab_api::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

pub async fn start_server() -> (SocketAddr, AppState) {
    start_server_with(test_config()).await
}

/// Connect to `/collab` and consume the `connected` greeting.
/// Returns the stream and the server-assigned connection ID.
pub async fn connect(addr: SocketAddr) -> (Ws, String) {
    let url = format!("ws://{addr}/collab");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");

    let hello = recv(&mut ws).await;
    assert_eq!(hello["event"], "connected");
    let connection_id = hello["data"]["connectionId"]
        .as_str()
        .expect("connectionId present")
        .to_string();
    (ws, connection_id)
}

/// Send `{ "event": event, "data": data }`.
pub async fn send(ws: &mut Ws, event: &str, data: Value) {
    let frame = serde_json::json!({ "event": event, "data": data });
    ws.send(tungstenite::Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

/// Read the next JSON event, skipping control frames.
pub async fn recv(ws: &mut Ws) -> Value {
    loop {
        let msg = time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for event")
            .expect("stream ended")
            .expect("ws read error");

        match msg {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(&text).expect("parse event");
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("Expected text frame, got: {other:?}"),
        }
    }
}

/// Assert nothing arrives within `window`.
pub async fn assert_silent(ws: &mut Ws, window: Duration) {
    if let Ok(Some(Ok(msg))) = time::timeout(window, ws.next()).await {
        panic!("Expected no event, got: {msg:?}");
    }
}

/// Join a project and return the `joined-project` reply.
pub async fn join(ws: &mut Ws, project_id: &str) -> Value {
    send(ws, "join-project", serde_json::json!({ "projectId": project_id })).await;
    let reply = recv(ws).await;
    assert_eq!(reply["event"], "joined-project", "unexpected reply: {reply}");
    reply
}
