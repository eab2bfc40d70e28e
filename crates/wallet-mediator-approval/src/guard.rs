//! Single-flight guard for restricted requests.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Allows at most one restricted request to be mediated at a time.
///
/// Cloning shares the same slot.
#[derive(Debug, Clone)]
pub struct SingleFlightGuard {
    slot: Arc<Semaphore>,
}

impl Default for SingleFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleFlightGuard {
    /// Create an idle guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the slot if nobody holds it.
    ///
    /// The slot is released when the returned permit is dropped.
    #[must_use]
    pub fn try_acquire(&self) -> Option<FlightPermit> {
        let permit = Arc::clone(&self.slot).try_acquire_owned().ok()?;
        tracing::debug!("Single-flight slot acquired");
        Some(FlightPermit { _permit: permit })
    }

    /// Whether a mediation currently holds the slot.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }
}

/// Proof of holding the single-flight slot.
#[derive(Debug)]
pub struct FlightPermit {
    _permit: OwnedSemaphorePermit,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        tracing::debug!("Single-flight slot released");
    }
}
