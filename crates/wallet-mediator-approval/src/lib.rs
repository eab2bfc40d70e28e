//! Single-flight approval relay for restricted wallet methods.
//!
//! Provides:
//! - `SingleFlightGuard` - At most one restricted request in flight
//! - `ApprovalRelay` - Pending-request hand-off to the approver
//! - `PendingDecision` - Request-id correlation of approver decisions

pub mod correlator;
pub mod guard;
pub mod relay;

pub use correlator::{CorrelationError, PendingDecision};
pub use guard::{FlightPermit, SingleFlightGuard};
pub use relay::{ApprovalRelay, Mediation, MediationError};
