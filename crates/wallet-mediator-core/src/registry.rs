//! Method classification tables.
//!
//! The registry only routes: a method it does not recognize is classified as
//! [`Classification::Unknown`] and passed on untouched.

use serde::{Deserialize, Serialize};

pub const PERSONAL_SIGN: &str = "personal_sign";
pub const ZOND_REQUEST_ACCOUNTS: &str = "zond_requestAccounts";
pub const ZOND_SEND_TRANSACTION: &str = "zond_sendTransaction";
pub const ZOND_SIGN_TYPED_DATA_V4: &str = "zond_signTypedData_v4";

/// Methods that require an interactive approval.
pub const RESTRICTED_METHODS: &[&str] = &[
    PERSONAL_SIGN,
    ZOND_REQUEST_ACCOUNTS,
    ZOND_SEND_TRANSACTION,
    ZOND_SIGN_TYPED_DATA_V4,
];

/// Read-only methods that only require an existing connection.
pub const UNRESTRICTED_METHODS: &[&str] = &[
    "net_version",
    "wallet_revokePermissions",
    "web3_clientVersion",
    "zond_accounts",
    "zond_blockNumber",
    "zond_call",
    "zond_chainId",
    "zond_estimateGas",
    "zond_feeHistory",
    "zond_gasPrice",
    "zond_getBalance",
    "zond_getBlockByHash",
    "zond_getBlockByNumber",
    "zond_getBlockTransactionCountByHash",
    "zond_getBlockTransactionCountByNumber",
    "zond_getCode",
    "zond_getTransactionByHash",
    "zond_getTransactionCount",
    "zond_getTransactionReceipt",
    "zondWallet_getProviderState",
];

/// Routing class of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Forwarded to the page context once the origin is connected.
    Unrestricted,
    /// Mediated through the approver.
    Restricted,
    /// Not handled here.
    Unknown,
}

/// Family of a restricted method, which decides how a decision is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodFamily {
    /// Account connection (`zond_requestAccounts`).
    Connection,
    /// Transaction submission (`zond_sendTransaction`).
    Transaction,
    /// Personal or typed-data signing.
    Signature,
}

/// Classify a method name.
#[must_use]
pub fn classify(method: &str) -> Classification {
    if RESTRICTED_METHODS.iter().any(|m| *m == method) {
        Classification::Restricted
    } else if UNRESTRICTED_METHODS.iter().any(|m| *m == method) {
        Classification::Unrestricted
    } else {
        Classification::Unknown
    }
}

/// Family of a restricted method; `None` for everything else.
#[must_use]
pub fn family(method: &str) -> Option<MethodFamily> {
    match method {
        ZOND_REQUEST_ACCOUNTS => Some(MethodFamily::Connection),
        ZOND_SEND_TRANSACTION => Some(MethodFamily::Transaction),
        PERSONAL_SIGN | ZOND_SIGN_TYPED_DATA_V4 => Some(MethodFamily::Signature),
        _ => None,
    }
}

/// Position of the signing address in the params of a signing method.
#[must_use]
pub fn signer_param_index(method: &str) -> Option<usize> {
    match method {
        PERSONAL_SIGN => Some(0),
        ZOND_SIGN_TYPED_DATA_V4 => Some(1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_classify_round_trip() {
        for method in RESTRICTED_METHODS {
            assert_eq!(classify(method), Classification::Restricted, "{method}");
        }
        for method in UNRESTRICTED_METHODS {
            assert_eq!(classify(method), Classification::Unrestricted, "{method}");
        }
    }

    #[test]
    fn test_tables_are_disjoint() {
        for method in RESTRICTED_METHODS {
            assert!(!UNRESTRICTED_METHODS.contains(method), "{method} in both tables");
        }
    }

    #[test]
    fn test_unknown_methods() {
        assert_eq!(classify("eth_sign"), Classification::Unknown);
        assert_eq!(classify(""), Classification::Unknown);
        assert_eq!(classify("Personal_Sign"), Classification::Unknown);
    }

    #[test]
    fn test_every_restricted_method_has_a_family() {
        for method in RESTRICTED_METHODS {
            assert!(family(method).is_some(), "{method}");
        }
        assert_eq!(family("zond_chainId"), None);
    }

    #[test]
    fn test_signer_positions() {
        assert_eq!(signer_param_index(PERSONAL_SIGN), Some(0));
        assert_eq!(signer_param_index(ZOND_SIGN_TYPED_DATA_V4), Some(1));
        assert_eq!(signer_param_index(ZOND_SEND_TRANSACTION), None);
    }
}
