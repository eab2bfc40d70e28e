//! Collaborator traits: persistent stores, UI surface and page contexts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    call::{ContextId, IncomingCall, SenderData},
    decision::{RequestId, UNRESTRICTED_METHOD_CALL},
};

/// Accounts an origin has been granted access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccountsRecord {
    /// Scheme+host origin the record belongs to.
    pub url_origin: String,
    /// Connected addresses, without duplicates.
    pub accounts: Vec<String>,
}

impl ConnectedAccountsRecord {
    /// Create a record, dropping duplicate addresses but keeping order.
    #[must_use]
    pub fn new(url_origin: impl Into<String>, accounts: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(accounts.len());
        for account in accounts {
            if !unique.contains(&account) {
                unique.push(account);
            }
        }
        Self {
            url_origin: url_origin.into(),
            accounts: unique,
        }
    }

    /// Whether `address` is connected.
    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.accounts.iter().any(|a| a == address)
    }
}

/// The restricted request currently awaiting a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequestRecord {
    /// Id the approver must echo back on its decision.
    pub request_id: RequestId,
    pub method: String,
    pub params: Vec<Value>,
    pub request_data: PendingRequestData,
}

/// Requester information shown by the approver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequestData {
    pub sender_data: SenderData,
}

impl PendingRequestRecord {
    /// Derive the record from a call.
    #[must_use]
    pub fn from_call(request_id: RequestId, call: &IncomingCall) -> Self {
        Self {
            request_id,
            method: call.method.clone(),
            params: call.params.clone(),
            request_data: PendingRequestData {
                sender_data: call.sender_data.clone(),
            },
        }
    }
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Persistent per-origin connection state.
#[async_trait]
pub trait ConnectedAccountsStore: Send + Sync {
    /// Get the record for an origin.
    async fn get_connected_accounts(
        &self,
        origin: &str,
    ) -> Result<Option<ConnectedAccountsRecord>, StorageError>;

    /// Create or replace the record for an origin.
    async fn set_connected_accounts(&self, record: ConnectedAccountsRecord)
    -> Result<(), StorageError>;
}

/// Persistent slot holding the request shown by the approver.
#[async_trait]
pub trait PendingRequestStore: Send + Sync {
    /// Overwrite the slot.
    async fn set_pending_request(&self, record: PendingRequestRecord) -> Result<(), StorageError>;

    /// Read the slot.
    async fn get_pending_request(&self) -> Result<Option<PendingRequestRecord>, StorageError>;

    /// Empty the slot.
    async fn clear_pending_request(&self) -> Result<(), StorageError>;
}

/// UI surface error.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("No approver surface attached")]
    Unavailable,
    #[error("Failed to open approver surface: {0}")]
    Failed(String),
}

/// Brings the interactive approver to the foreground.
#[async_trait]
pub trait UiSurface: Send + Sync {
    /// Fire-and-forget; callers only log failures.
    async fn open(&self) -> Result<(), SurfaceError>;
}

/// Message sent to a page context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub name: String,
    pub data: IncomingCall,
}

impl ContextMessage {
    /// Wrap a read-only call for execution in its page context.
    #[must_use]
    pub fn unrestricted_call(call: IncomingCall) -> Self {
        Self {
            name: UNRESTRICTED_METHOD_CALL.to_owned(),
            data: call,
        }
    }
}

/// Page context error.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Page context not found: {0}")]
    NotFound(ContextId),
    #[error("Page context disconnected")]
    Disconnected,
    #[error("{0}")]
    Rejected(String),
}

/// Request/response channel to the page context a call came from.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Send a message to `context` and await its reply.
    async fn send_to_context(
        &self,
        context: &ContextId,
        message: ContextMessage,
    ) -> Result<Value, ContextError>;
}
