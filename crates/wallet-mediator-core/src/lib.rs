//! Core abstractions for mediating untrusted wallet provider requests.
//!
//! This crate provides the fundamental building blocks:
//! - `IncomingCall` - Immutable inbound method call plus sender data
//! - `registry` - Restricted/unrestricted method tables
//! - `Decision` - Approver decision decoded into a per-family payload
//! - `MediationOutcome` / `ProviderError` - Caller-visible results
//! - `DecisionBus` - Broadcast bus carrying approver messages
//! - Collaborator traits (stores, UI surface, page context)

pub mod bus;
pub mod call;
pub mod config;
pub mod decision;
pub mod outcome;
pub mod registry;
pub mod traits;

pub use bus::DecisionBus;
pub use call::{ContextId, IncomingCall, SenderData};
pub use config::MediatorConfig;
pub use decision::{Decision, DecisionPayload, ExtensionMessage, RequestId};
pub use outcome::{MediationOutcome, MethodErrorCode, ProviderError};
pub use registry::{Classification, MethodFamily};
pub use traits::{ConnectedAccountsStore, PageContext, PendingRequestStore, UiSurface};
