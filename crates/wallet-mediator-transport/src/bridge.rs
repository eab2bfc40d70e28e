//! Socket-backed implementations of the page-context and UI-surface
//! collaborators.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use wallet_mediator_core::{
    ContextId, PageContext, PendingRequestStore, UiSurface,
    traits::{ContextError, ContextMessage, SurfaceError},
};

use crate::protocol::{ApproverEvent, ServerMessage};

type Reply = Result<Value, String>;

struct InFlight {
    context: ContextId,
    reply: oneshot::Sender<Reply>,
}

/// Connected requester pages, addressable by context id.
///
/// Read-only calls are sent to the page as `context_call` messages and
/// resolved when the page answers with a matching `context_reply`.
#[derive(Default)]
pub struct SocketContexts {
    peers: Mutex<HashMap<ContextId, mpsc::UnboundedSender<ServerMessage>>>,
    in_flight: Mutex<HashMap<u64, InFlight>>,
    next_call: AtomicU64,
}

impl SocketContexts {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outbound channel of a page.
    pub fn register(&self, context: ContextId, tx: mpsc::UnboundedSender<ServerMessage>) {
        if let Ok(mut peers) = self.peers.lock() {
            peers.insert(context, tx);
        }
    }

    /// Forget a page. Its unanswered calls fail with
    /// [`ContextError::Disconnected`].
    pub fn unregister(&self, context: &ContextId) {
        if let Ok(mut peers) = self.peers.lock() {
            peers.remove(context);
        }
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.retain(|_, call| &call.context != context);
        }
    }

    /// Deliver the reply `from` a page to call `id`.
    ///
    /// Returns `false` if no call with that id is waiting on `from`; a
    /// reply from any other page leaves the call in flight.
    pub fn resolve(&self, from: &ContextId, id: u64, reply: Reply) -> bool {
        let waiting = {
            let Ok(mut in_flight) = self.in_flight.lock() else {
                return false;
            };
            let addressed = in_flight.get(&id).is_some_and(|call| &call.context == from);
            if addressed {
                in_flight.remove(&id)
            } else {
                None
            }
        };
        waiting.is_some_and(|call| call.reply.send(reply).is_ok())
    }

    fn peer(&self, context: &ContextId) -> Option<mpsc::UnboundedSender<ServerMessage>> {
        self.peers.lock().ok()?.get(context).cloned()
    }
}

#[async_trait]
impl PageContext for SocketContexts {
    async fn send_to_context(
        &self,
        context: &ContextId,
        message: ContextMessage,
    ) -> Result<Value, ContextError> {
        let peer = self
            .peer(context)
            .ok_or_else(|| ContextError::NotFound(context.clone()))?;

        let id = self.next_call.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.in_flight
            .lock()
            .map_err(|_| ContextError::Disconnected)?
            .insert(
                id,
                InFlight {
                    context: context.clone(),
                    reply: tx,
                },
            );

        if peer.send(ServerMessage::ContextCall { id, message }).is_err() {
            if let Ok(mut in_flight) = self.in_flight.lock() {
                in_flight.remove(&id);
            }
            return Err(ContextError::Disconnected);
        }

        rx.await
            .map_err(|_| ContextError::Disconnected)?
            .map_err(ContextError::Rejected)
    }
}

/// Approver UI surface reached through connected approver sockets.
pub struct ApproverSurface {
    events: broadcast::Sender<ApproverEvent>,
    pending: Arc<dyn PendingRequestStore>,
}

impl ApproverSurface {
    /// Create a surface that shows the request held in `pending`.
    #[must_use]
    pub fn new(pending: Arc<dyn PendingRequestStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { events, pending }
    }

    /// Subscribe an approver socket.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ApproverEvent> {
        self.events.subscribe()
    }

    /// The event an approver should render right now.
    pub async fn current(&self) -> ApproverEvent {
        let request = match self.pending.get_pending_request().await {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Failed to read pending request: {e}");
                None
            }
        };
        ApproverEvent::Show { request }
    }
}

#[async_trait]
impl UiSurface for ApproverSurface {
    async fn open(&self) -> Result<(), SurfaceError> {
        if self.events.receiver_count() == 0 {
            return Err(SurfaceError::Unavailable);
        }
        let event = self.current().await;
        self.events
            .send(event)
            .map(|_| ())
            .map_err(|e| SurfaceError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;
    use wallet_mediator_core::{IncomingCall, SenderData, traits::PendingRequestRecord};
    use wallet_mediator_pipeline::storage::MemoryStore;

    use super::*;

    fn chain_id_call() -> ContextMessage {
        ContextMessage::unrestricted_call(IncomingCall::new(
            "zond_chainId",
            vec![],
            SenderData::new("https://a.example", "page-1".to_owned()),
        ))
    }

    #[tokio::test]
    async fn test_context_call_round_trip() {
        let contexts = Arc::new(SocketContexts::new());
        let page = ContextId::from("page-1".to_owned());
        let (tx, mut rx) = mpsc::unbounded_channel();
        contexts.register(page.clone(), tx);

        let caller = {
            let contexts = Arc::clone(&contexts);
            let page = page.clone();
            tokio::spawn(async move { contexts.send_to_context(&page, chain_id_call()).await })
        };

        let Some(ServerMessage::ContextCall { id, message }) = rx.recv().await else {
            panic!("expected a context call");
        };
        assert_eq!(message.name, "UNRESTRICTED_METHOD_CALL");
        assert!(contexts.resolve(&page, id, Ok(json!("0x1"))));

        assert_eq!(caller.await.unwrap().unwrap(), json!("0x1"));
        assert!(!contexts.resolve(&page, id, Ok(json!("late"))));
    }

    #[tokio::test]
    async fn test_page_error_is_rejected() {
        let contexts = Arc::new(SocketContexts::new());
        let page = ContextId::Numeric(3);
        let (tx, mut rx) = mpsc::unbounded_channel();
        contexts.register(page.clone(), tx);

        let caller = {
            let contexts = Arc::clone(&contexts);
            tokio::spawn(async move { contexts.send_to_context(&page, chain_id_call()).await })
        };

        if let Some(ServerMessage::ContextCall { id, .. }) = rx.recv().await {
            contexts.resolve(&ContextId::Numeric(3), id, Err("execution reverted".into()));
        }
        let err = caller.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "execution reverted");
    }

    #[tokio::test]
    async fn test_reply_from_another_page_is_ignored() {
        let contexts = Arc::new(SocketContexts::new());
        let victim = ContextId::from("victim".to_owned());
        let intruder = ContextId::from("intruder".to_owned());
        let (victim_tx, mut victim_rx) = mpsc::unbounded_channel();
        let (intruder_tx, _intruder_rx) = mpsc::unbounded_channel();
        contexts.register(victim.clone(), victim_tx);
        contexts.register(intruder.clone(), intruder_tx);

        let caller = {
            let contexts = Arc::clone(&contexts);
            let victim = victim.clone();
            tokio::spawn(async move { contexts.send_to_context(&victim, chain_id_call()).await })
        };
        let Some(ServerMessage::ContextCall { id, .. }) = victim_rx.recv().await else {
            panic!("expected a context call");
        };

        assert!(!contexts.resolve(&intruder, id, Ok(json!(["ZATTACKER"]))));
        assert!(!caller.is_finished());

        assert!(contexts.resolve(&victim, id, Ok(json!(["Z20aa"]))));
        assert_eq!(caller.await.unwrap().unwrap(), json!(["Z20aa"]));
    }

    #[tokio::test]
    async fn test_unknown_and_disconnected_pages() {
        let contexts = Arc::new(SocketContexts::new());
        let err = contexts
            .send_to_context(&ContextId::Numeric(1), chain_id_call())
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::NotFound(_)));

        let page = ContextId::Numeric(2);
        let (tx, mut rx) = mpsc::unbounded_channel();
        contexts.register(page.clone(), tx);
        let caller = {
            let contexts = Arc::clone(&contexts);
            let page = page.clone();
            tokio::spawn(async move { contexts.send_to_context(&page, chain_id_call()).await })
        };
        rx.recv().await.unwrap();
        contexts.unregister(&page);

        assert!(matches!(caller.await.unwrap(), Err(ContextError::Disconnected)));
    }

    #[tokio::test]
    async fn test_surface_without_approver_is_unavailable() {
        let surface = ApproverSurface::new(Arc::new(MemoryStore::new()));
        assert!(matches!(surface.open().await, Err(SurfaceError::Unavailable)));
    }

    #[tokio::test]
    async fn test_surface_shows_pending_request() {
        let store = Arc::new(MemoryStore::new());
        let surface = ApproverSurface::new(store.clone());
        let mut approver = surface.subscribe();

        let id = Uuid::new_v4();
        let call = IncomingCall::new("personal_sign", vec![json!("Z1")], SenderData::default());
        store
            .set_pending_request(PendingRequestRecord::from_call(id, &call))
            .await
            .unwrap();

        tokio_test::assert_ok!(surface.open().await);
        let ApproverEvent::Show { request } = tokio_test::assert_ok!(approver.recv().await);
        assert_eq!(request.unwrap().request_id, id);
    }
}
