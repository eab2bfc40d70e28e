//! WebSocket transport for requester pages and the approver UI.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, Utf8Bytes, WebSocket},
    },
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt, stream::SplitStream};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use wallet_mediator_core::{ContextId, DecisionBus, ExtensionMessage, IncomingCall, SenderData};
use wallet_mediator_pipeline::Mediator;

use crate::{
    bridge::{ApproverSurface, SocketContexts},
    origin::PageBinding,
    protocol::{ClientMessage, ServerMessage},
};

/// WebSocket handler state.
#[derive(Clone)]
pub struct WsState {
    /// Pipeline answering requester calls.
    pub mediator: Arc<Mediator>,
    /// Connected requester pages.
    pub contexts: Arc<SocketContexts>,
    /// Connected approvers.
    pub surface: Arc<ApproverSurface>,
    /// Bus approver decisions are published on.
    pub bus: DecisionBus,
}

/// Requester upgrade handler.
///
/// The socket is bound to the request's `Origin` header.
pub async fn rpc_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<WsState>,
) -> impl IntoResponse {
    let page = PageBinding::from_header(
        headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok()),
    );
    ws.on_upgrade(|socket| handle_requester(socket, state, page))
}

/// Approver upgrade handler.
pub async fn approver_handler(
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_approver(socket, state))
}

async fn handle_requester(socket: WebSocket, state: WsState, mut page: PageBinding) {
    let (mut sender, mut receiver) = socket.split();
    let context = ContextId::Named(Uuid::new_v4().to_string());

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.contexts.register(context.clone(), tx.clone());
    tracing::info!(%context, origin = ?page.origin(), "Requester connected");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(text) = next_text(&mut receiver).await {
        let client_msg: ClientMessage = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid client message: {e}");
                let _ = tx.send(ServerMessage::Error {
                    message: format!("Invalid message: {e}"),
                });
                continue;
            }
        };

        match client_msg {
            ClientMessage::Hello { url } => {
                if page.announce(url.clone()) {
                    tracing::debug!(%context, %url, "Requester announced page");
                } else {
                    tracing::warn!(
                        %context,
                        %url,
                        origin = ?page.origin(),
                        "Refusing page url outside the connection origin"
                    );
                    let _ = tx.send(ServerMessage::Error {
                        message: "Page url does not match the connection origin.".to_owned(),
                    });
                }
            }
            ClientMessage::Request { id, method, params } => {
                let sender_data = SenderData::new(page.url(), context.clone());
                let call = IncomingCall::new(method, params, sender_data);
                let mediator = Arc::clone(&state.mediator);
                let tx = tx.clone();
                // Spawned so the loop keeps reading context replies.
                tokio::spawn(async move {
                    let outcome = mediator.handle(call).await;
                    let _ = tx.send(ServerMessage::response(id, outcome));
                });
            }
            ClientMessage::ContextReply { id, result, error } => {
                let reply = error.map_or_else(|| Ok(result.unwrap_or(Value::Null)), Err);
                if !state.contexts.resolve(&context, id, reply) {
                    tracing::warn!(%context, id, "Reply to unknown context call");
                }
            }
            ClientMessage::Ping => {
                let _ = tx.send(ServerMessage::Pong);
            }
        }
    }

    state.contexts.unregister(&context);
    send_task.abort();
    tracing::info!(%context, "Requester disconnected");
}

async fn handle_approver(socket: WebSocket, state: WsState) {
    let (mut sender, mut receiver) = socket.split();

    let mut events = state.surface.subscribe();
    let initial = state.surface.current().await;
    tracing::info!("Approver connected");

    let send_task = tokio::spawn(async move {
        let mut next = Some(initial);
        loop {
            let event = match next.take() {
                Some(event) => event,
                None => match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Approver lagged by {n} events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize approver event: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(text) = next_text(&mut receiver).await {
        let message: ExtensionMessage = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid approver message: {e}");
                continue;
            }
        };
        if !message.is_decision() {
            tracing::debug!(action = %message.action, "Ignoring approver message");
            continue;
        }
        if state.bus.publish(message) == 0 {
            tracing::debug!("Decision published with no request waiting");
        }
    }

    send_task.abort();
    tracing::info!("Approver disconnected");
}

/// Next text frame, or `None` once the socket is closed.
async fn next_text(receiver: &mut SplitStream<WebSocket>) -> Option<Utf8Bytes> {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => return Some(s.into()),
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("WebSocket error: {e}");
                return None;
            }
        }
    }
    None
}

/// Create the mediator router.
///
/// # Example
/// ```ignore
/// let app = Router::new().merge(create_router(state));
/// ```
#[must_use]
pub fn create_router(state: WsState) -> axum::Router {
    axum::Router::new()
        .route("/rpc", get(rpc_handler))
        .route("/approver", get(approver_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
