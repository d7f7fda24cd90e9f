// # Memory Session Store
//
// In-memory implementation of SessionStore.
//
// Nothing survives a restart, so a process using it always starts
// anonymous. Useful for tests and for embedding where the host keeps its
// own persistence.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::SessionStore;

/// In-memory session store
///
/// Cloning yields a handle to the same map, which lets tests simulate a
/// process restart by building a second context over a clone.
///
/// # Example
///
/// ```rust,no_run
/// use ledgersync_core::state::MemorySessionStore;
/// use ledgersync_core::traits::SessionStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemorySessionStore::new();
///     store.set("bankUser", r#"{"email":"a@b.com","role":"admin"}"#).await?;
///     assert!(store.get("bankUser").await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySessionStore {
    /// Create a new empty memory session store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored keys
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.inner.write().await.remove(key);
        Ok(())
    }
}
