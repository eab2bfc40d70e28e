//! Origin-scoped preconditions.

use std::sync::Arc;

use wallet_mediator_core::{
    Classification, ConnectedAccountsStore, IncomingCall, ProviderError,
    registry, traits::ConnectedAccountsRecord,
};

/// Checks whether a call may proceed, before any mediation starts.
///
/// Only reads connection state.
pub struct PermissionGate {
    accounts: Arc<dyn ConnectedAccountsStore>,
}

impl PermissionGate {
    /// Create a gate over a connected-accounts store.
    #[must_use]
    pub fn new(accounts: Arc<dyn ConnectedAccountsStore>) -> Self {
        Self { accounts }
    }

    /// Check the precondition of `call`.
    ///
    /// - Signing methods: the signer must be connected to the origin.
    /// - Unrestricted methods: the origin must have a connected account.
    /// - Anything else proceeds.
    ///
    /// # Errors
    /// Returns an unauthorized-account error when the check fails.
    pub async fn check_precondition(&self, call: &IncomingCall) -> Result<(), ProviderError> {
        match registry::classify(&call.method) {
            Classification::Unrestricted => self.check_connected(call).await,
            Classification::Restricted => match registry::signer_param_index(&call.method) {
                Some(index) => self.check_signer(call, index).await,
                None => Ok(()),
            },
            Classification::Unknown => Ok(()),
        }
    }

    async fn check_signer(&self, call: &IncomingCall, index: usize) -> Result<(), ProviderError> {
        let signer = call.param_str(index).unwrap_or_default();
        let authorized = match self.record_for(call).await {
            Some(record) => !signer.is_empty() && record.contains(signer),
            None => false,
        };

        if authorized {
            Ok(())
        } else {
            tracing::debug!(method = %call.method, signer, "Signer not connected to origin");
            Err(ProviderError::unauthorized(format!(
                "The requested account {signer} has not been authorized by the user."
            )))
        }
    }

    async fn check_connected(&self, call: &IncomingCall) -> Result<(), ProviderError> {
        let connected = self
            .record_for(call)
            .await
            .is_some_and(|record| !record.accounts.is_empty());

        if connected {
            Ok(())
        } else {
            tracing::debug!(method = %call.method, "Origin has no active connection");
            Err(ProviderError::unauthorized(
                "The dApp is not connected to the wallet.",
            ))
        }
    }

    /// Connection record for the call's origin. Unresolvable origins and
    /// storage failures count as not connected.
    async fn record_for(&self, call: &IncomingCall) -> Option<ConnectedAccountsRecord> {
        let origin = call.origin()?;
        match self.accounts.get_connected_accounts(&origin).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(%origin, "Failed to read connected accounts: {e}");
                None
            }
        }
    }
}
