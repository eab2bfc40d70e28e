//! Mediator routing inbound calls through the pipeline.

use std::sync::Arc;

use wallet_mediator_approval::{ApprovalRelay, MediationError, SingleFlightGuard};
use wallet_mediator_core::{
    Classification, ConnectedAccountsStore, DecisionBus, IncomingCall, MediationOutcome,
    MediatorConfig, PageContext, PendingRequestStore, ProviderError, UiSurface, registry,
};

use crate::{
    forwarder::{FallbackHandler, MethodNotFound, UnrestrictedForwarder},
    gate::PermissionGate,
    mapper::ResultMapper,
};

/// External collaborators of the mediator.
pub struct Collaborators {
    pub accounts: Arc<dyn ConnectedAccountsStore>,
    pub pending: Arc<dyn PendingRequestStore>,
    pub surface: Arc<dyn UiSurface>,
    pub context: Arc<dyn PageContext>,
}

impl Collaborators {
    /// Use one store for both connected accounts and the pending request.
    pub fn with_store<S>(
        store: Arc<S>,
        surface: Arc<dyn UiSurface>,
        context: Arc<dyn PageContext>,
    ) -> Self
    where
        S: ConnectedAccountsStore + PendingRequestStore + 'static,
    {
        Self {
            accounts: store.clone(),
            pending: store,
            surface,
            context,
        }
    }
}

/// Entry point for requester calls.
///
/// Restricted methods are gated, serialized by the single-flight guard and
/// resolved by the approver; unrestricted methods are gated and forwarded;
/// everything else goes to the fallback handler.
pub struct Mediator {
    gate: PermissionGate,
    guard: SingleFlightGuard,
    relay: ApprovalRelay,
    mapper: ResultMapper,
    forwarder: UnrestrictedForwarder,
    fallback: Arc<dyn FallbackHandler>,
    config: MediatorConfig,
}

impl Mediator {
    /// Create a new mediator listening for decisions on `bus`.
    #[must_use]
    pub fn new(collaborators: Collaborators, bus: DecisionBus, config: MediatorConfig) -> Self {
        let Collaborators {
            accounts,
            pending,
            surface,
            context,
        } = collaborators;

        Self {
            gate: PermissionGate::new(Arc::clone(&accounts)),
            guard: SingleFlightGuard::new(),
            relay: ApprovalRelay::new(pending, surface, bus),
            mapper: ResultMapper::new(accounts),
            forwarder: UnrestrictedForwarder::new(context),
            fallback: Arc::new(MethodNotFound),
            config,
        }
    }

    /// Replace the handler for unknown methods.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackHandler>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Whether a restricted request is awaiting a decision.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// Handle one inbound call.
    pub async fn handle(&self, call: IncomingCall) -> MediationOutcome {
        let classification = registry::classify(&call.method);
        tracing::debug!(method = %call.method, ?classification, "Routing call");

        match classification {
            Classification::Restricted => self.mediate(&call).await,
            Classification::Unrestricted => self.forward(&call).await,
            Classification::Unknown => self.fallback.handle(call).await,
        }
    }

    async fn forward(&self, call: &IncomingCall) -> MediationOutcome {
        if let Err(e) = self.gate.check_precondition(call).await {
            return e.into();
        }
        self.forwarder.forward(call).await.into()
    }

    async fn mediate(&self, call: &IncomingCall) -> MediationOutcome {
        if self.guard.is_busy() {
            return self.reject_busy(call).await;
        }

        if let Err(e) = self.gate.check_precondition(call).await {
            return e.into();
        }

        // Another call may have taken the slot while the gate was awaited.
        let Some(permit) = self.guard.try_acquire() else {
            return self.reject_busy(call).await;
        };

        let mut mediation = match self.relay.begin_mediation(call, permit).await {
            Ok(mediation) => mediation,
            Err(e) => {
                tracing::error!(method = %call.method, "Could not start mediation: {e}");
                return ProviderError::unsupported(e.to_string()).into();
            }
        };

        let outcome = match mediation.decision(self.config.decision_timeout).await {
            Ok(decision) => self.mapper.map_decision(call, decision).await,
            Err(MediationError::TimedOut(limit)) => {
                tracing::warn!(request_id = %mediation.request_id(), ?limit, "Decision timed out");
                ProviderError::TimedOut.into()
            }
            Err(e) => {
                tracing::error!(request_id = %mediation.request_id(), "Mediation failed: {e}");
                ProviderError::unsupported(e.to_string()).into()
            }
        };

        mediation.finish().await;
        outcome
    }

    async fn reject_busy(&self, call: &IncomingCall) -> MediationOutcome {
        tracing::info!(method = %call.method, "Rejecting call, a request is already pending");
        self.relay.surface().await;
        ProviderError::RequestPending.into()
    }
}
