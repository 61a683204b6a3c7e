//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::AppState;

use super::events::{ClientEvent, Connected, ServerEvent};
use super::handler::handle_event;

/// Close codes (4000-range for application-level).
const CLOSE_IDLE_TIMEOUT: u16 = 4009;

type WsSink = SplitSink<WebSocket, Message>;

pub fn router() -> Router<AppState> {
    Router::new().route("/collab", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, ws_rx) = socket.split();
    let (connection_id, outbound) = state.connections.register();

    tracing::info!(%connection_id, "collab connection established");

    let hello = ServerEvent::Connected(Connected {
        connection_id: connection_id.clone(),
        idle_timeout_ms: duration_ms(state.config.client_idle_timeout),
    });
    if send_event(&mut ws_tx, &hello).await.is_ok() {
        run_connection(&state, &connection_id, ws_tx, ws_rx, outbound).await;
    }

    // The transport is gone: drop the connection from every project it joined.
    let left = state.coordinator.disconnect(&connection_id);
    state.connections.unregister(&connection_id);

    tracing::info!(%connection_id, sessions_left = left, "collab connection ended");
}

/// Main loop: decode client events, forward queued broadcasts, enforce the idle timeout.
async fn run_connection(
    state: &AppState,
    connection_id: &str,
    mut ws_tx: WsSink,
    mut ws_rx: SplitStream<WebSocket>,
    mut outbound: mpsc::Receiver<Arc<ServerEvent>>,
) {
    let idle_timeout = state.config.client_idle_timeout;
    let idle = time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            // Client sends us a message.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);

                        let reply = match ClientEvent::decode(text.as_str()) {
                            Ok(event) => handle_event(&state.coordinator, connection_id, event),
                            Err(err) => {
                                tracing::debug!(%connection_id, %err, "undecodable collab frame");
                                Some(ServerEvent::error(&err))
                            }
                        };

                        if let Some(reply) = reply {
                            if send_event(&mut ws_tx, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, %connection_id, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Event relayed by the coordinator.
            event = outbound.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut ws_tx, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // No traffic from the client within the idle window.
            _ = &mut idle => {
                tracing::debug!(%connection_id, "idle timeout, closing connection");
                let _ = send_close(&mut ws_tx, CLOSE_IDLE_TIMEOUT, "Idle timeout").await;
                break;
            }
        }
    }
}

/// Serialize and write one event. Serialization failures are logged and skipped.
async fn send_event(ws_tx: &mut WsSink, event: &ServerEvent) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(?err, event = event.name(), "failed to serialize collab event");
            return Ok(());
        }
    };
    ws_tx.send(Message::Text(json.into())).await
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
