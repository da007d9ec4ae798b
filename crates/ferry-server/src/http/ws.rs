/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! WebSocket push channel for workers.
//!
//! Each connection subscribes to the relay event bus and forwards
//! `new_request` and `request_completed` events as JSON text frames. Workers
//! may send `report_result` and `claim` messages on the same socket; each is
//! answered with an ack frame, or an `error` frame when it cannot be parsed or
//! processed. A connection that falls behind the bus skips the events it
//! missed and carries on; the pending listing still has them.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::wire::{parse_reported_status, reporting_worker, ClientMessage, ServerMessage};
use super::AppState;

pub(crate) async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let connection = state.next_connection_id();
    info!(connection, "Worker connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.engine.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send(&mut sender, &ServerMessage::from(event)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(connection, skipped, "Worker connection lagged behind the event bus");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_client_message(&state, text.as_str()).await;
                    if send(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    warn!(connection, bytes = data.len(), "Ignoring binary frame");
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    debug!(connection, ?frame, "Worker sent close");
                    break;
                }
                Some(Err(e)) => {
                    warn!(connection, "WebSocket error: {}", e);
                    break;
                }
                None => break,
            },
        }
    }

    info!(connection, "Worker disconnected");
}

async fn send(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode outbound message: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await
}

/// Processes one text frame from a worker and returns the reply to send.
pub(crate) async fn handle_client_message(state: &AppState, text: &str) -> ServerMessage {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("Malformed worker message: {}", e);
            return ServerMessage::Error {
                message: format!("Invalid message format: {}", e),
            };
        }
    };

    let result = match message {
        ClientMessage::ReportResult {
            category,
            request_id,
            status,
            worker_id,
        } => report_result(state, category, request_id, status, worker_id).await,
        ClientMessage::Claim {
            category,
            request_id,
            worker_id,
        } => state
            .engine
            .claim(&category, &request_id, &worker_id)
            .await
            .map(|locked| ServerMessage::ClaimAck {
                category,
                request_id,
                locked,
            })
            .map_err(ApiError::from),
    };

    result.unwrap_or_else(|err| ServerMessage::Error {
        message: err.message(),
    })
}

async fn report_result(
    state: &AppState,
    category: String,
    request_id: String,
    status: Option<String>,
    worker_id: Option<String>,
) -> Result<ServerMessage, ApiError> {
    let status = parse_reported_status(status.as_deref())?;
    let worker_id = reporting_worker(worker_id);

    let accepted = state
        .engine
        .report_result(&category, &request_id, status, &worker_id)
        .await?;

    Ok(ServerMessage::ReportAck {
        category,
        request_id,
        accepted,
    })
}
