//! Broadcast bus carrying messages from the approver context.

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};

use crate::decision::{Decision, ExtensionMessage};

/// Default number of undelivered messages kept per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// Publish/subscribe bus for extension messages.
///
/// Messages are delivered only to subscribers that exist at publish time;
/// nothing is replayed to late subscribers.
#[derive(Clone)]
pub struct DecisionBus {
    sender: broadcast::Sender<ExtensionMessage>,
}

impl Default for DecisionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DecisionBus {
    /// Create a new bus.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a message to all current subscribers.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, message: ExtensionMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    /// Get a receiver for live messages.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ExtensionMessage> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stream of decoded decisions, skipping other traffic.
    #[must_use]
    pub fn decisions(&self) -> futures::stream::BoxStream<'static, Decision> {
        BroadcastStream::new(self.subscribe())
            .filter_map(|res: Result<ExtensionMessage, BroadcastStreamRecvError>| async move {
                match res {
                    Ok(message) => message.to_decision(),
                    Err(e) => {
                        tracing::warn!("Decision subscriber dropped messages: {e}");
                        None
                    }
                }
            })
            .boxed()
    }
}
