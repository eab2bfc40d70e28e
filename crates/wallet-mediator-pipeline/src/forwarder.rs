//! Execution of read-only calls in the requester's page context.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use wallet_mediator_core::{
    IncomingCall, MediationOutcome, PageContext, ProviderError,
    outcome::ErrorObject,
    traits::ContextMessage,
};

/// Delegates unrestricted calls to the page context they came from.
pub struct UnrestrictedForwarder {
    context: Arc<dyn PageContext>,
}

impl UnrestrictedForwarder {
    /// Create a forwarder.
    #[must_use]
    pub fn new(context: Arc<dyn PageContext>) -> Self {
        Self { context }
    }

    /// Forward `call` and return the page context's payload verbatim.
    ///
    /// # Errors
    /// Returns an unsupported-method error carrying the failure message.
    pub async fn forward(&self, call: &IncomingCall) -> Result<Value, ProviderError> {
        self.context
            .send_to_context(call.context_id(), ContextMessage::unrestricted_call(call.clone()))
            .await
            .map_err(|e| {
                tracing::warn!(
                    method = %call.method,
                    context = %call.context_id(),
                    "Forwarding failed: {e}"
                );
                ProviderError::unsupported(e.to_string())
            })
    }
}

/// Handles methods the registry does not know.
#[async_trait]
pub trait FallbackHandler: Send + Sync {
    /// Produce the outcome for an unknown method.
    async fn handle(&self, call: IncomingCall) -> MediationOutcome;
}

/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Default fallback: the method does not exist.
#[derive(Debug, Default, Clone)]
pub struct MethodNotFound;

#[async_trait]
impl FallbackHandler for MethodNotFound {
    async fn handle(&self, call: IncomingCall) -> MediationOutcome {
        MediationOutcome::Error(ErrorObject {
            code: METHOD_NOT_FOUND,
            message: format!("The method \"{}\" does not exist / is not available.", call.method),
            data: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wallet_mediator_core::{ContextId, SenderData, traits::ContextError};

    use super::*;

    struct EchoContext;

    #[async_trait]
    impl PageContext for EchoContext {
        async fn send_to_context(
            &self,
            context: &ContextId,
            message: ContextMessage,
        ) -> Result<Value, ContextError> {
            match context {
                ContextId::Numeric(7) => Ok(json!({
                    "name": message.name,
                    "method": message.data.method,
                })),
                other => Err(ContextError::NotFound(other.clone())),
            }
        }
    }

    #[tokio::test]
    async fn test_forward_returns_payload_verbatim() {
        let forwarder = UnrestrictedForwarder::new(Arc::new(EchoContext));
        let call = IncomingCall::new(
            "zond_chainId",
            vec![],
            SenderData::new("https://a.example", ContextId::Numeric(7)),
        );

        let value = forwarder.forward(&call).await.unwrap();
        assert_eq!(
            value,
            json!({ "name": "UNRESTRICTED_METHOD_CALL", "method": "zond_chainId" })
        );
    }

    #[tokio::test]
    async fn test_forward_failure_is_unsupported_method() {
        let forwarder = UnrestrictedForwarder::new(Arc::new(EchoContext));
        let call = IncomingCall::new(
            "zond_chainId",
            vec![],
            SenderData::new("https://a.example", ContextId::Numeric(8)),
        );

        let err = forwarder.forward(&call).await.unwrap_err();
        assert_eq!(err.code(), 4001);
        assert_eq!(err.to_string(), "Page context not found: 8");
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let outcome = MethodNotFound
            .handle(IncomingCall::new("eth_mining", vec![], SenderData::default()))
            .await;
        assert_eq!(outcome.as_error().unwrap().code, METHOD_NOT_FOUND);
    }
}
