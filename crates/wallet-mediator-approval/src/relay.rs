//! Hand-off of restricted requests to the interactive approver.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use uuid::Uuid;
use wallet_mediator_core::{
    Decision, DecisionBus, IncomingCall, PendingRequestStore, RequestId, UiSurface,
    traits::{PendingRequestRecord, StorageError},
};

use crate::{
    correlator::{CorrelationError, PendingDecision},
    guard::FlightPermit,
};

/// Mediation error.
#[derive(Debug, Error)]
pub enum MediationError {
    #[error("Failed to persist pending request: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
    #[error("No decision within {0:?}")]
    TimedOut(Duration),
}

/// Persists the pending request, surfaces the approver and hands back an
/// awaitable decision.
pub struct ApprovalRelay {
    store: Arc<dyn PendingRequestStore>,
    surface: Arc<dyn UiSurface>,
    bus: DecisionBus,
}

impl ApprovalRelay {
    /// Create a relay.
    #[must_use]
    pub fn new(
        store: Arc<dyn PendingRequestStore>,
        surface: Arc<dyn UiSurface>,
        bus: DecisionBus,
    ) -> Self {
        Self {
            store,
            surface,
            bus,
        }
    }

    /// Bring the approver to the foreground. Failures are only logged, the
    /// surface may already be open.
    pub async fn surface(&self) {
        if let Err(e) = self.surface.open().await {
            tracing::warn!("Could not open the approver surface: {e}");
        }
    }

    /// Start mediating `call` while holding `permit`.
    ///
    /// The pending request is written before the approver is surfaced, and
    /// the decision subscription is taken after that.
    ///
    /// # Errors
    /// Returns error if the pending request cannot be persisted; the permit
    /// is released in that case.
    pub async fn begin_mediation(
        &self,
        call: &IncomingCall,
        permit: FlightPermit,
    ) -> Result<Mediation, MediationError> {
        let request_id = Uuid::new_v4();
        self.store
            .set_pending_request(PendingRequestRecord::from_call(request_id, call))
            .await?;

        self.surface().await;

        tracing::info!(%request_id, method = %call.method, "Awaiting approver decision");
        Ok(Mediation {
            pending: Some(PendingDecision::subscribe(&self.bus, request_id)),
            request_id,
            store: Arc::clone(&self.store),
            permit: Some(permit),
        })
    }
}

/// One mediation cycle in the pending state.
///
/// Holds the single-flight permit until [`Mediation::finish`] runs or the
/// value is dropped.
pub struct Mediation {
    request_id: RequestId,
    pending: Option<PendingDecision>,
    store: Arc<dyn PendingRequestStore>,
    permit: Option<FlightPermit>,
}

impl Mediation {
    /// Id generated for this cycle.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Wait for the decision, bounded by `timeout` when given.
    ///
    /// # Errors
    /// Returns error on timeout, if the bus closes, or when called twice.
    pub async fn decision(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Decision, MediationError> {
        let pending = self
            .pending
            .take()
            .ok_or(MediationError::Correlation(CorrelationError::BusClosed))?;

        match timeout {
            None => Ok(pending.wait().await?),
            Some(limit) => tokio::time::timeout(limit, pending.wait())
                .await
                .map_err(|_| MediationError::TimedOut(limit))?
                .map_err(MediationError::from),
        }
    }

    /// End the cycle: clear the pending request, then release the slot.
    pub async fn finish(mut self) {
        if let Err(e) = self.store.clear_pending_request().await {
            tracing::error!(request_id = %self.request_id, "Failed to clear pending request: {e}");
        }
        self.permit.take();
        tracing::info!(request_id = %self.request_id, "Mediation finished");
    }
}

impl Drop for Mediation {
    fn drop(&mut self) {
        // Abandoned before `finish`: clear in the background. The permit
        // moves into the task so no new cycle starts before the clear.
        let Some(permit) = self.permit.take() else {
            return;
        };
        tracing::warn!(request_id = %self.request_id, "Mediation abandoned");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = Arc::clone(&self.store);
            let request_id = self.request_id;
            handle.spawn(async move {
                if let Err(e) = store.clear_pending_request().await {
                    tracing::error!(%request_id, "Failed to clear abandoned request: {e}");
                }
                drop(permit);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use wallet_mediator_core::{ContextId, ExtensionMessage, SenderData, traits::SurfaceError};

    use super::*;
    use crate::guard::SingleFlightGuard;

    #[derive(Default)]
    struct Journal {
        events: Mutex<Vec<String>>,
        pending: Mutex<Option<PendingRequestRecord>>,
        fail_surface: bool,
    }

    impl Journal {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PendingRequestStore for Journal {
        async fn set_pending_request(
            &self,
            record: PendingRequestRecord,
        ) -> Result<(), StorageError> {
            self.events.lock().unwrap().push("set".into());
            *self.pending.lock().unwrap() = Some(record);
            Ok(())
        }

        async fn get_pending_request(&self) -> Result<Option<PendingRequestRecord>, StorageError> {
            Ok(self.pending.lock().unwrap().clone())
        }

        async fn clear_pending_request(&self) -> Result<(), StorageError> {
            self.events.lock().unwrap().push("clear".into());
            *self.pending.lock().unwrap() = None;
            Ok(())
        }
    }

    #[async_trait]
    impl UiSurface for Journal {
        async fn open(&self) -> Result<(), SurfaceError> {
            self.events.lock().unwrap().push("open".into());
            if self.fail_surface {
                Err(SurfaceError::Failed("popup blocked".into()))
            } else {
                Ok(())
            }
        }
    }

    fn relay(journal: &Arc<Journal>, bus: &DecisionBus) -> ApprovalRelay {
        ApprovalRelay::new(journal.clone(), journal.clone(), bus.clone())
    }

    fn call() -> IncomingCall {
        IncomingCall::new(
            "zond_sendTransaction",
            vec![json!({ "to": "Z20aa" })],
            SenderData::new("https://dapp.example/app", ContextId::Numeric(3)),
        )
    }

    #[tokio::test]
    async fn test_writes_record_then_surfaces_then_subscribes() {
        let journal = Arc::new(Journal::default());
        let bus = DecisionBus::default();
        let guard = SingleFlightGuard::new();

        let mut mediation = relay(&journal, &bus)
            .begin_mediation(&call(), guard.try_acquire().unwrap())
            .await
            .unwrap();

        assert_eq!(journal.events(), vec!["set", "open"]);
        assert_eq!(bus.subscriber_count(), 1);

        let record = journal.get_pending_request().await.unwrap().unwrap();
        assert_eq!(record.request_id, mediation.request_id());
        assert_eq!(record.method, "zond_sendTransaction");

        bus.publish(ExtensionMessage::dapp_response(
            Some(record.request_id),
            "zond_sendTransaction",
            false,
            None,
        ));
        let decision = mediation.decision(None).await.unwrap();
        assert!(!decision.approved);
        assert!(guard.is_busy());

        mediation.finish().await;
        assert!(!guard.is_busy());
        assert_eq!(journal.events(), vec!["set", "open", "clear"]);
        assert!(journal.get_pending_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_surface_failure_is_not_fatal() {
        let journal = Arc::new(Journal {
            fail_surface: true,
            ..Journal::default()
        });
        let bus = DecisionBus::default();
        let guard = SingleFlightGuard::new();

        let mediation = relay(&journal, &bus)
            .begin_mediation(&call(), guard.try_acquire().unwrap())
            .await;

        assert!(mediation.is_ok());
    }

    #[tokio::test]
    async fn test_timeout_then_finish_releases() {
        let journal = Arc::new(Journal::default());
        let bus = DecisionBus::default();
        let guard = SingleFlightGuard::new();

        let mut mediation = relay(&journal, &bus)
            .begin_mediation(&call(), guard.try_acquire().unwrap())
            .await
            .unwrap();

        let err = mediation
            .decision(Some(Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, MediationError::TimedOut(_)));

        mediation.finish().await;
        assert!(!guard.is_busy());
    }

    #[tokio::test]
    async fn test_drop_clears_then_releases() {
        let journal = Arc::new(Journal::default());
        let bus = DecisionBus::default();
        let guard = SingleFlightGuard::new();

        let mediation = relay(&journal, &bus)
            .begin_mediation(&call(), guard.try_acquire().unwrap())
            .await
            .unwrap();
        drop(mediation);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(journal.get_pending_request().await.unwrap().is_none());
        assert_eq!(journal.events(), vec!["set", "open", "clear"]);
        assert!(!guard.is_busy());
    }
}
