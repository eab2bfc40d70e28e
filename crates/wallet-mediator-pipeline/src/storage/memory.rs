//! In-memory wallet storage.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use wallet_mediator_core::{
    ConnectedAccountsStore, PendingRequestStore,
    traits::{ConnectedAccountsRecord, PendingRequestRecord, StorageError},
};

/// In-memory storage implementation.
///
/// Useful for development and tests.
/// Data is lost on restart.
pub struct MemoryStore {
    connected: RwLock<HashMap<String, ConnectedAccountsRecord>>,
    pending: RwLock<Option<PendingRequestRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connected: RwLock::new(HashMap::new()),
            pending: RwLock::new(None),
        }
    }

    /// Create a store with pre-connected origins.
    #[must_use]
    pub fn with_connections(records: impl IntoIterator<Item = ConnectedAccountsRecord>) -> Self {
        let connected = records
            .into_iter()
            .map(|record| (record.url_origin.clone(), record))
            .collect();
        Self {
            connected: RwLock::new(connected),
            pending: RwLock::new(None),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectedAccountsStore for MemoryStore {
    async fn get_connected_accounts(
        &self,
        origin: &str,
    ) -> Result<Option<ConnectedAccountsRecord>, StorageError> {
        Ok(self
            .connected
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .get(origin)
            .cloned())
    }

    async fn set_connected_accounts(
        &self,
        record: ConnectedAccountsRecord,
    ) -> Result<(), StorageError> {
        self.connected
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .insert(record.url_origin.clone(), record);
        Ok(())
    }
}

#[async_trait]
impl PendingRequestStore for MemoryStore {
    async fn set_pending_request(&self, record: PendingRequestRecord) -> Result<(), StorageError> {
        *self
            .pending
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))? = Some(record);
        Ok(())
    }

    async fn get_pending_request(&self) -> Result<Option<PendingRequestRecord>, StorageError> {
        Ok(self
            .pending
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .clone())
    }

    async fn clear_pending_request(&self) -> Result<(), StorageError> {
        self.pending
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .take();
        Ok(())
    }
}
