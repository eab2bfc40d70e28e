//! Inbound method calls issued by requesters.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Opaque identifier of the page context that issued a call.
///
/// Browser transports use numeric tab ids, socket transports use strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextId {
    /// Numeric context (e.g. a browser tab).
    Numeric(u64),
    /// Named context (e.g. a socket connection id).
    Named(String),
}

impl Default for ContextId {
    fn default() -> Self {
        Self::Numeric(0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Named(id) => f.write_str(id),
        }
    }
}

impl From<u64> for ContextId {
    fn from(id: u64) -> Self {
        Self::Numeric(id)
    }
}

impl From<String> for ContextId {
    fn from(id: String) -> Self {
        Self::Named(id)
    }
}

/// Who sent a call and from where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderData {
    /// Full url of the requesting page.
    #[serde(default)]
    pub url: String,
    /// Context the call arrived from, used to route read-only calls back.
    #[serde(default, alias = "tabId")]
    pub context_id: ContextId,
}

impl SenderData {
    /// Create sender data for a page url and context.
    #[must_use]
    pub fn new(url: impl Into<String>, context_id: impl Into<ContextId>) -> Self {
        Self {
            url: url.into(),
            context_id: context_id.into(),
        }
    }

    /// Resolve the scheme+host origin of the sender url.
    ///
    /// Returns `None` when the url cannot be parsed or has an opaque origin.
    #[must_use]
    pub fn origin(&self) -> Option<String> {
        let origin = Url::parse(&self.url).ok()?.origin();
        origin.is_tuple().then(|| origin.ascii_serialization())
    }
}

/// A method call received from a requester. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCall {
    /// JSON-RPC method name.
    pub method: String,
    /// Positional parameters.
    #[serde(default)]
    pub params: Vec<Value>,
    /// Sender of the call.
    #[serde(default)]
    pub sender_data: SenderData,
}

impl IncomingCall {
    /// Create a new call.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Vec<Value>, sender_data: SenderData) -> Self {
        Self {
            method: method.into(),
            params,
            sender_data,
        }
    }

    /// Origin of the requester, see [`SenderData::origin`].
    #[must_use]
    pub fn origin(&self) -> Option<String> {
        self.sender_data.origin()
    }

    /// Context the call was issued from.
    #[must_use]
    pub const fn context_id(&self) -> &ContextId {
        &self.sender_data.context_id
    }

    /// String parameter at `index`, if present.
    #[must_use]
    pub fn param_str(&self, index: usize) -> Option<&str> {
        self.params.get(index).and_then(Value::as_str)
    }
}
