//! Turns approver decisions into caller-visible outcomes.

use std::sync::Arc;

use serde_json::Value;
use wallet_mediator_core::{
    ConnectedAccountsStore, Decision, DecisionPayload, IncomingCall, MediationOutcome,
    ProviderError, traits::ConnectedAccountsRecord,
};

/// Maps a decision to an outcome per method family.
///
/// The only writer of connected-accounts records.
pub struct ResultMapper {
    accounts: Arc<dyn ConnectedAccountsStore>,
}

impl ResultMapper {
    /// Create a mapper persisting connections into `accounts`.
    #[must_use]
    pub fn new(accounts: Arc<dyn ConnectedAccountsStore>) -> Self {
        Self { accounts }
    }

    /// Map `decision`, taken for `call`, to the outcome returned to the
    /// requester.
    pub async fn map_decision(&self, call: &IncomingCall, decision: Decision) -> MediationOutcome {
        if !decision.approved {
            return ProviderError::UserRejected.into();
        }

        match decision.payload {
            DecisionPayload::Connection { accounts: Some(accounts) } => {
                self.connect(call, accounts).await.into()
            }
            DecisionPayload::Connection { accounts: None } => incomplete(None).into(),
            DecisionPayload::Transaction {
                transaction_hash: Some(hash),
                ..
            }
            | DecisionPayload::Signature {
                signature: Some(hash),
                ..
            } => MediationOutcome::result(Value::String(hash)),
            DecisionPayload::Transaction { error, .. }
            | DecisionPayload::Signature { error, .. } => incomplete(error).into(),
            DecisionPayload::Other => incomplete(None).into(),
        }
    }

    async fn connect(
        &self,
        call: &IncomingCall,
        accounts: Vec<String>,
    ) -> Result<Value, ProviderError> {
        let origin = call.origin().ok_or_else(|| {
            ProviderError::unsupported("The requesting origin could not be resolved.")
        })?;

        // The requester receives exactly the set that was stored.
        let record = ConnectedAccountsRecord::new(origin.clone(), accounts);
        let connected = record.accounts.clone();
        self.accounts
            .set_connected_accounts(record)
            .await
            .map_err(|e| {
                tracing::error!(%origin, "Failed to persist connected accounts: {e}");
                ProviderError::unsupported(e.to_string())
            })?;

        tracing::info!(%origin, count = connected.len(), "Origin connected");
        Ok(Value::from(connected))
    }
}

/// Approved, but without the expected payload. Carries the approver's error
/// when it supplied one.
fn incomplete(error: Option<Value>) -> ProviderError {
    let message = error
        .as_ref()
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_owned);
    ProviderError::UnsupportedMethod {
        message,
        data: error,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wallet_mediator_core::{ContextId, ExtensionMessage, SenderData};

    use super::*;
    use crate::storage::MemoryStore;

    const PAGE: &str = "https://dapp.example/mint";

    fn setup() -> (Arc<MemoryStore>, ResultMapper) {
        let store = Arc::new(MemoryStore::new());
        let mapper = ResultMapper::new(store.clone());
        (store, mapper)
    }

    fn decision(method: &str, approved: bool, response: Value) -> Decision {
        ExtensionMessage::dapp_response(None, method, approved, Some(response))
            .to_decision()
            .unwrap()
    }

    fn call(method: &str) -> IncomingCall {
        IncomingCall::new(method, vec![], SenderData::new(PAGE, ContextId::Numeric(5)))
    }

    #[tokio::test]
    async fn test_rejection() {
        let (store, mapper) = setup();
        let outcome = mapper
            .map_decision(
                &call("zond_requestAccounts"),
                decision("zond_requestAccounts", false, json!({ "accounts": ["Z1"] })),
            )
            .await;

        let error = outcome.as_error().unwrap();
        assert_eq!(error.message, "User rejected the request.");
        assert!(store.get_connected_accounts("https://dapp.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connection_persists_exact_set() {
        let (store, mapper) = setup();
        let outcome = mapper
            .map_decision(
                &call("zond_requestAccounts"),
                decision(
                    "zond_requestAccounts",
                    true,
                    json!({ "accounts": ["Z111", "Z222"] }),
                ),
            )
            .await;

        assert_eq!(outcome, MediationOutcome::result(json!(["Z111", "Z222"])));
        let record = store
            .get_connected_accounts("https://dapp.example")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.accounts, vec!["Z111", "Z222"]);
    }

    #[tokio::test]
    async fn test_transaction_hash_and_failure() {
        let (_, mapper) = setup();

        let ok = mapper
            .map_decision(
                &call("zond_sendTransaction"),
                decision("zond_sendTransaction", true, json!({ "transactionHash": "0xfeed" })),
            )
            .await;
        assert_eq!(ok.as_result(), Some(&json!("0xfeed")));

        let failed = mapper
            .map_decision(
                &call("zond_sendTransaction"),
                decision(
                    "zond_sendTransaction",
                    true,
                    json!({ "error": { "message": "insufficient funds", "code": -32000 } }),
                ),
            )
            .await;
        let error = failed.as_error().unwrap();
        assert_eq!(error.code, 4001);
        assert_eq!(error.message, "insufficient funds");
        assert_eq!(error.data.as_ref().unwrap()["code"], json!(-32000));
    }

    #[tokio::test]
    async fn test_signature_without_payload() {
        let (_, mapper) = setup();

        let ok = mapper
            .map_decision(
                &call("personal_sign"),
                decision("personal_sign", true, json!({ "signature": "0xsig" })),
            )
            .await;
        assert_eq!(ok.as_result(), Some(&json!("0xsig")));

        let bare = mapper
            .map_decision(
                &call("zond_signTypedData_v4"),
                decision("zond_signTypedData_v4", true, json!({})),
            )
            .await;
        let error = bare.as_error().unwrap();
        assert_eq!(error.code, 4001);
        assert!(error.data.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method_approved() {
        let (_, mapper) = setup();
        let outcome = mapper
            .map_decision(&call("zond_mine"), decision("zond_mine", true, json!({})))
            .await;
        assert_eq!(
            outcome.as_error().unwrap().message,
            "The requested method is not supported."
        );
    }

    #[tokio::test]
    async fn test_connection_from_opaque_origin_fails() {
        let (_, mapper) = setup();
        let opaque = IncomingCall::new(
            "zond_requestAccounts",
            vec![],
            SenderData::new("about:blank", ContextId::Numeric(1)),
        );
        let outcome = mapper
            .map_decision(
                &opaque,
                decision("zond_requestAccounts", true, json!({ "accounts": ["Z1"] })),
            )
            .await;
        assert!(outcome.as_error().is_some());
    }
}
