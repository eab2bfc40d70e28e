//! Approver decisions and the messages that carry them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::registry::{self, MethodFamily};

/// Action tag of a decision message.
pub const DAPP_RESPONSE: &str = "DAPP_RESPONSE";

/// Name of the message sent to a page context for read-only calls.
pub const UNRESTRICTED_METHOD_CALL: &str = "UNRESTRICTED_METHOD_CALL";

/// Identifier of one mediation cycle.
pub type RequestId = Uuid;

/// Raw message observed on the decision bus.
///
/// Other extension traffic shares the bus, so only `action` is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionMessage {
    pub action: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub has_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

impl ExtensionMessage {
    /// Build a decision message as an approver would.
    #[must_use]
    pub fn dapp_response(
        request_id: Option<RequestId>,
        method: impl Into<String>,
        has_approved: bool,
        response: Option<Value>,
    ) -> Self {
        Self {
            action: DAPP_RESPONSE.to_owned(),
            method: method.into(),
            has_approved,
            response,
            request_id,
        }
    }

    /// Whether this message carries an approver decision.
    #[must_use]
    pub fn is_decision(&self) -> bool {
        self.action == DAPP_RESPONSE
    }

    /// Decode into a [`Decision`]; `None` for non-decision traffic.
    #[must_use]
    pub fn to_decision(&self) -> Option<Decision> {
        self.is_decision().then(|| Decision::decode(self))
    }
}

/// Method-specific part of an approved decision, decoded once at the bus
/// boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionPayload {
    /// Accounts the user chose to connect.
    Connection { accounts: Option<Vec<String>> },
    /// Hash of the submitted transaction, or the approver's failure.
    Transaction {
        transaction_hash: Option<String>,
        error: Option<Value>,
    },
    /// Produced signature, or the approver's failure.
    Signature {
        signature: Option<String>,
        error: Option<Value>,
    },
    /// Decision for a method outside the restricted families.
    Other,
}

/// Approve/reject outcome for one mediation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub request_id: Option<RequestId>,
    pub method: String,
    pub approved: bool,
    pub payload: DecisionPayload,
}

impl Decision {
    /// Decode a decision message, picking the payload by method family.
    #[must_use]
    pub fn decode(message: &ExtensionMessage) -> Self {
        let response = message.response.as_ref();
        let field = |name: &str| response.and_then(|r| r.get(name));
        let non_empty = |name: &str| {
            field(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let error = || field("error").filter(|e| !e.is_null()).cloned();

        let payload = match registry::family(&message.method) {
            Some(MethodFamily::Connection) => DecisionPayload::Connection {
                accounts: field("accounts")
                    .and_then(|a| serde_json::from_value::<Vec<String>>(a.clone()).ok()),
            },
            Some(MethodFamily::Transaction) => DecisionPayload::Transaction {
                transaction_hash: non_empty("transactionHash"),
                error: error(),
            },
            Some(MethodFamily::Signature) => DecisionPayload::Signature {
                signature: non_empty("signature"),
                error: error(),
            },
            None => DecisionPayload::Other,
        };

        Self {
            request_id: message.request_id,
            method: message.method.clone(),
            approved: message.has_approved,
            payload,
        }
    }

    /// Whether this decision may resolve the cycle `request_id`.
    ///
    /// Decisions without an id come from approvers that predate request ids
    /// and are accepted on the strength of the single-flight guard.
    #[must_use]
    pub fn answers(&self, request_id: RequestId) -> bool {
        self.request_id.is_none_or(|id| id == request_id)
    }
}
