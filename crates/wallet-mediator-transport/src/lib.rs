//! Socket transport for the wallet mediator.
//!
//! Provides:
//! - Wire protocol (JSON, tagged by `type`)
//! - Socket-backed page context and approver surface
//! - Origin binding of requester sockets
//! - WebSocket transport (feature: websocket)

pub mod bridge;
pub mod origin;
pub mod protocol;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use bridge::{ApproverSurface, SocketContexts};
pub use origin::PageBinding;
pub use protocol::{ApproverEvent, ClientMessage, ServerMessage};
#[cfg(feature = "websocket")]
pub use websocket::{WsState, create_router};
