//! Request mediation pipeline for the wallet provider.
//!
//! Provides:
//! - `Mediator` - Route calls through gate, approval and forwarding
//! - `PermissionGate`, `ResultMapper`, `UnrestrictedForwarder`
//! - Storage implementations (memory)

pub mod forwarder;
pub mod gate;
pub mod mapper;
pub mod mediator;
pub mod storage;

pub use forwarder::{FallbackHandler, MethodNotFound, UnrestrictedForwarder};
pub use gate::PermissionGate;
pub use mapper::ResultMapper;
pub use mediator::{Collaborators, Mediator};
