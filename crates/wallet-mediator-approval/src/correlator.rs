//! Correlates approver decisions with the mediation that awaits them.

use futures::{StreamExt, stream::BoxStream};
use wallet_mediator_core::{Decision, DecisionBus, RequestId};

/// Correlation error.
#[derive(Debug, thiserror::Error)]
pub enum CorrelationError {
    #[error("Decision bus closed")]
    BusClosed,
}

/// One-shot subscription waiting for the decision of one request.
///
/// Created at mediation start; dropping it unsubscribes.
pub struct PendingDecision {
    request_id: RequestId,
    decisions: BoxStream<'static, Decision>,
}

impl PendingDecision {
    /// Subscribe to `bus` on behalf of `request_id`.
    #[must_use]
    pub fn subscribe(bus: &DecisionBus, request_id: RequestId) -> Self {
        Self {
            request_id,
            decisions: bus.decisions(),
        }
    }

    /// Request this subscription answers for.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Wait for the first decision addressed to this request, then
    /// unsubscribe.
    ///
    /// Decisions carrying another request's id are ignored. Decisions
    /// without an id are accepted.
    ///
    /// # Errors
    /// Returns error if the bus is closed before a decision arrives.
    pub async fn wait(mut self) -> Result<Decision, CorrelationError> {
        while let Some(decision) = self.decisions.next().await {
            if !decision.answers(self.request_id) {
                tracing::warn!(
                    request_id = %self.request_id,
                    foreign_id = ?decision.request_id,
                    "Ignoring decision addressed to another request"
                );
                continue;
            }

            tracing::debug!(
                request_id = %self.request_id,
                method = %decision.method,
                approved = decision.approved,
                "Decision accepted"
            );
            return Ok(decision);
        }
        Err(CorrelationError::BusClosed)
    }
}
