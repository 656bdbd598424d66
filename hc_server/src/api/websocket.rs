//! Websocket upgrade and the per-connection pumps.
//!
//! The upgrade request passes the session gate, then the connection gets
//! two cooperative tasks: the reader decodes frames under a rolling 60 s
//! deadline (any frame, pongs included, extends it) and the writer
//! drains the client's send queue with a 10 s per-frame deadline,
//! pinging every 54 s to keep the peer's half alive. Either side failing
//! funnels into the single unregister join point.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Duration, Instant, MissedTickBehavior};

use holdem_core::auth::{Claims, SessionGate};
use holdem_core::net::{ClientHandle, ClientMessage, ServerMessage};

use super::AppState;

const READ_DEADLINE: Duration = Duration::from_secs(60);
const WRITE_DEADLINE: Duration = Duration::from_secs(10);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(54);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// `GET /ws?token=<bearer>` (or `Authorization: Bearer <t>`): validate
/// the token and upgrade. Invalid or missing credentials never upgrade.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let Some(token) = SessionGate::extract_token(query.token.as_deref(), auth_header) else {
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
    };
    let claims = match state.gate.verify(&token) {
        Ok(claims) => claims,
        Err(_) => return (StatusCode::UNAUTHORIZED, "invalid token").into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, claims, state))
}

async fn handle_socket(socket: WebSocket, claims: Claims, state: AppState) {
    let (sink, stream) = socket.split();
    let (client, outbound) = ClientHandle::new(claims.user_id);
    let client_id = client.client_id;
    tracing::info!(user_id = claims.user_id, username = %claims.username, "websocket connected");

    state.hub.register(client).await;
    let writer = tokio::spawn(write_pump(sink, outbound));

    read_pump(stream, &claims, &state).await;

    // Single join point: unregistering closes the send queue, which
    // stops the writer; the disconnect handler folds any live seat.
    state.hub.unregister(client_id).await;
    state.service.handle_disconnect(claims.user_id).await;
    writer.abort();
    tracing::info!(user_id = claims.user_id, "websocket disconnected");
}

/// Decode inbound frames and dispatch by message type. Returns when the
/// socket closes, errors, times out, or sends an undecodable frame.
async fn read_pump(mut stream: SplitStream<WebSocket>, claims: &Claims, state: &AppState) {
    loop {
        let frame = match timeout(READ_DEADLINE, stream.next()).await {
            Err(_) => {
                tracing::debug!(user_id = claims.user_id, "read deadline expired");
                return;
            }
            Ok(None) => return,
            Ok(Some(Err(error))) => {
                tracing::debug!(user_id = claims.user_id, %error, "websocket read error");
                return;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => state.service.handle_message(claims.user_id, message).await,
                Err(error) => {
                    tracing::warn!(user_id = claims.user_id, %error, "undecodable frame; closing");
                    return;
                }
            },
            Message::Close(_) => return,
            // Protocol pings are answered by axum; pongs land here and
            // extend the deadline simply by restarting the loop.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Binary(_) => {
                tracing::warn!(user_id = claims.user_id, "binary frame on text protocol; closing");
                return;
            }
        }
    }
}

/// Drain the send queue to the socket and emit keepalive pings. Exits
/// when the queue closes (unregistration) or a write fails or times out.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
) {
    let mut keepalive = interval_at(Instant::now() + KEEPALIVE_INTERVAL, KEEPALIVE_INTERVAL);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                };
                let frame = match serde_json::to_string(&message) {
                    Ok(frame) => frame,
                    Err(error) => {
                        tracing::error!(%error, "outbound message failed to serialize");
                        continue;
                    }
                };
                match timeout(WRITE_DEADLINE, sink.send(Message::Text(frame.into()))).await {
                    Ok(Ok(())) => {}
                    _ => return,
                }
            }
            _ = keepalive.tick() => {
                match timeout(WRITE_DEADLINE, sink.send(Message::Ping(Vec::new().into()))).await {
                    Ok(Ok(())) => {}
                    _ => return,
                }
            }
        }
    }
}
