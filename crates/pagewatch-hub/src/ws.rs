use crate::coordinator::HubHandle;
use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, ConnectInfo, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use pagewatch_core::{decode_client_msg, encode_msg, FrameError};
use std::{net::SocketAddr, time::Duration};
use tracing::{debug, info, warn};

pub const HUB_PATH: &str = "/_/hub";

#[derive(Clone)]
struct AppState {
    hub: HubHandle,
    write_timeout: Duration,
}

pub fn router(hub: HubHandle, write_timeout: Duration) -> Router {
    Router::new()
        .route(HUB_PATH, get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(status_handler))
        .with_state(AppState { hub, write_timeout })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    if !addr.ip().is_loopback() {
        warn!(event = "remote_rejected", remote = %addr);
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(state, socket, addr))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.hub.stats().await {
        Some(stats) => Json(stats).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn handle_socket(state: AppState, socket: WebSocket, remote: SocketAddr) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (peer, mut outbound) = state.hub.open_peer();
    let conn_id = peer.conn_id().to_string();
    info!(event = "tab_connected", conn_id = %conn_id, remote = %remote);

    let write_timeout = state.write_timeout;
    let writer_conn_id = conn_id.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let text = match encode_msg(&msg) {
                Ok(text) => text,
                Err(err) => {
                    warn!(event = "encode_error", conn_id = %writer_conn_id, error = %err);
                    continue;
                }
            };
            match tokio::time::timeout(write_timeout, ws_sender.send(Message::Text(text))).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    debug!(event = "write_error", conn_id = %writer_conn_id, error = %err);
                    return;
                }
                Err(_) => {
                    warn!(event = "write_timeout", conn_id = %writer_conn_id);
                    return;
                }
            }
        }
    });

    loop {
        let result = tokio::select! {
            _ = &mut write_task => break,
            next = ws_receiver.next() => match next {
                Some(result) => result,
                None => break,
            },
        };
        let msg = match result {
            Ok(value) => value,
            Err(err) => {
                warn!(event = "read_error", conn_id = %conn_id, error = %err);
                break;
            }
        };
        let text = match msg {
            Message::Text(text) => text,
            Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!(event = "protocol_violation", conn_id = %conn_id, error = "binary frame is not utf-8");
                    continue;
                }
            },
            Message::Close(_) => {
                info!(event = "tab_close", conn_id = %conn_id);
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        let msg = match decode_client_msg(&text) {
            Ok(msg) => msg,
            Err(FrameError::OversizedFrame { size, max }) => {
                warn!(event = "message_too_large", conn_id = %conn_id, size, max);
                continue;
            }
            Err(err) => {
                warn!(event = "protocol_violation", conn_id = %conn_id, error = %err);
                continue;
            }
        };
        if !state.hub.control(&peer, msg).await {
            break;
        }
    }

    state.hub.detach(&conn_id).await;
    drop(peer);
    write_task.abort();
}
