use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cursor::CursorState;
use crate::error::SyncError;
use crate::response::Response;

/// Persistence boundary for responses. `record_id` is unique: one response
/// per external record, ever.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn insert(&self, response: Response) -> Result<(), SyncError>;
    async fn find_by_record_id(&self, record_id: &str) -> Result<Option<Response>, SyncError>;
    async fn update(&self, response: &Response) -> Result<(), SyncError>;
}

/// Persistence boundary for per-subscription cursors.
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load(&self, subscription_id: &str) -> Result<Option<CursorState>, SyncError>;
    async fn save(&self, state: &CursorState) -> Result<(), SyncError>;
}

/// In-memory response store used by tests and the CLI sync runner.
#[derive(Default)]
pub struct MemoryResponseStore {
    by_record_id: RwLock<HashMap<String, Response>>,
}

impl MemoryResponseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseStore for MemoryResponseStore {
    async fn insert(&self, response: Response) -> Result<(), SyncError> {
        let mut map = self.by_record_id.write().await;
        if map.contains_key(&response.record_id) {
            return Err(SyncError::Store(format!(
                "response for record '{}' already exists",
                response.record_id
            )));
        }
        map.insert(response.record_id.clone(), response);
        Ok(())
    }

    async fn find_by_record_id(&self, record_id: &str) -> Result<Option<Response>, SyncError> {
        Ok(self.by_record_id.read().await.get(record_id).cloned())
    }

    async fn update(&self, response: &Response) -> Result<(), SyncError> {
        let mut map = self.by_record_id.write().await;
        match map.get_mut(&response.record_id) {
            Some(existing) => {
                *existing = response.clone();
                Ok(())
            }
            None => Err(SyncError::Store(format!(
                "no response for record '{}'",
                response.record_id
            ))),
        }
    }
}

/// In-memory cursor store.
#[derive(Default)]
pub struct MemoryCursorStore {
    by_subscription: RwLock<HashMap<String, CursorState>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self, subscription_id: &str) -> Result<Option<CursorState>, SyncError> {
        Ok(self
            .by_subscription
            .read()
            .await
            .get(subscription_id)
            .cloned())
    }

    async fn save(&self, state: &CursorState) -> Result<(), SyncError> {
        self.by_subscription
            .write()
            .await
            .insert(state.subscription_id.clone(), state.clone());
        Ok(())
    }
}
