//! Caller-visible outcomes and provider errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Fixed provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum MethodErrorCode {
    UnsupportedMethod = 4001,
    UnauthorizedAccount = 4100,
}

impl MethodErrorCode {
    /// Numeric wire code.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

pub const UNSUPPORTED_METHOD_MESSAGE: &str = "The requested method is not supported.";

/// Error returned to a requester.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The user rejected the request in the approver.
    #[error("User rejected the request.")]
    UserRejected,
    /// The method could not be completed. Carries the approver's or page
    /// context's failure when one was supplied.
    #[error("{}", .message.as_deref().unwrap_or(UNSUPPORTED_METHOD_MESSAGE))]
    UnsupportedMethod {
        message: Option<String>,
        data: Option<Value>,
    },
    /// The origin or account is not authorized.
    #[error("{message}")]
    UnauthorizedAccount { message: String },
    /// Another restricted request is being mediated.
    #[error("A request is already pending.")]
    RequestPending,
    /// No decision arrived within the configured timeout.
    #[error("The request timed out waiting for user approval.")]
    TimedOut,
}

impl ProviderError {
    /// Unsupported-method error with just a message.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            message: Some(message.into()),
            data: None,
        }
    }

    /// Unauthorized-account error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::UnauthorizedAccount {
            message: message.into(),
        }
    }

    /// Numeric wire code.
    ///
    /// User rejection uses the standard provider code, which coincides with
    /// the unsupported-method code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::UnauthorizedAccount { .. } => MethodErrorCode::UnauthorizedAccount.code(),
            Self::UserRejected
            | Self::UnsupportedMethod { .. }
            | Self::RequestPending
            | Self::TimedOut => MethodErrorCode::UnsupportedMethod.code(),
        }
    }

    /// Convert into the wire error object.
    #[must_use]
    pub fn to_object(&self) -> ErrorObject {
        let data = match self {
            Self::UnsupportedMethod { data, .. } => data.clone(),
            _ => None,
        };
        ErrorObject {
            code: self.code(),
            message: self.to_string(),
            data,
        }
    }
}

/// Wire error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Value returned to the requester: exactly one of result or error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediationOutcome {
    Result(Value),
    Error(ErrorObject),
}

impl MediationOutcome {
    /// Successful outcome.
    #[must_use]
    pub const fn result(value: Value) -> Self {
        Self::Result(value)
    }

    /// Error outcome.
    #[must_use]
    pub fn error(error: &ProviderError) -> Self {
        Self::Error(error.to_object())
    }

    /// Result payload, if any.
    #[must_use]
    pub const fn as_result(&self) -> Option<&Value> {
        match self {
            Self::Result(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Error payload, if any.
    #[must_use]
    pub const fn as_error(&self) -> Option<&ErrorObject> {
        match self {
            Self::Result(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

impl From<ProviderError> for MediationOutcome {
    fn from(error: ProviderError) -> Self {
        Self::error(&error)
    }
}

impl From<Result<Value, ProviderError>> for MediationOutcome {
    fn from(result: Result<Value, ProviderError>) -> Self {
        match result {
            Ok(value) => Self::Result(value),
            Err(error) => Self::error(&error),
        }
    }
}
