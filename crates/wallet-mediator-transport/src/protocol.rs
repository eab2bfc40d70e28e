//! Wire protocol for requester and approver sockets.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wallet_mediator_core::{
    MediationOutcome,
    outcome::ErrorObject,
    traits::{ContextMessage, PendingRequestRecord},
};

/// Message from a requester page to the wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Announce the full page url. It must lie within the connection origin.
    Hello { url: String },
    /// JSON-RPC style method call.
    Request {
        id: Value,
        method: String,
        #[serde(default)]
        params: Vec<Value>,
    },
    /// Reply to a [`ServerMessage::ContextCall`].
    ContextReply {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Ping for keepalive.
    Ping,
}

/// Message from the wallet to a requester page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Outcome of a request: exactly one of `result` or `error`.
    Response {
        id: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorObject>,
    },
    /// Execute a read-only call in the page and reply with `context_reply`.
    ContextCall { id: u64, message: ContextMessage },
    /// Protocol error.
    Error { message: String },
    /// Pong response.
    Pong,
}

impl ServerMessage {
    /// Build the response to request `id`.
    #[must_use]
    pub fn response(id: Value, outcome: MediationOutcome) -> Self {
        match outcome {
            MediationOutcome::Result(result) => Self::Response {
                id,
                result: Some(result),
                error: None,
            },
            MediationOutcome::Error(error) => Self::Response {
                id,
                result: None,
                error: Some(error),
            },
        }
    }
}

/// Message from the wallet to the approver UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApproverEvent {
    /// Bring the approver forward and show the pending request, if any.
    Show {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request: Option<PendingRequestRecord>,
    },
}
