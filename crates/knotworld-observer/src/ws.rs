//! `WebSocket` handler for real-time tick streaming.
//!
//! Clients connect to `GET /ws/ticks`. The first frame carries the full
//! current snapshot so a client can draw the grid immediately; every
//! following frame is one [`TickBroadcast`]. A client that falls behind
//! skips the lagged messages and resumes from the newest tick.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use knotworld_types::SimulationSnapshot;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, TickBroadcast};

/// A frame sent to `WebSocket` clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsFrame<'a> {
    /// Initial state on connect.
    Snapshot(&'a SimulationSnapshot),
    /// One completed tick.
    Tick(&'a TickBroadcast),
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming ticks.
///
/// # Route
///
/// `GET /ws/ticks`
pub async fn ws_ticks(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn send_frame(socket: &mut WebSocket, frame: &WsFrame<'_>) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "failed to serialize websocket frame");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

/// Subscribe first, then send the snapshot, so no tick falls between the
/// two.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    let mut rx = state.subscribe();
    let initial = state.snapshot.read().await.clone();
    if !send_frame(&mut socket, &WsFrame::Snapshot(&initial)).await {
        debug!("WebSocket client disconnected before the snapshot");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(tick) => {
                        if !send_frame(&mut socket, &WsFrame::Tick(&tick)).await {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket error");
                        return;
                    }
                    // Client text and binary frames carry no commands.
                    _ => {}
                }
            }
        }
    }
}
