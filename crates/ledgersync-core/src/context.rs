//! Process-wide context
//!
//! ```text
//!                ┌──────────────┐
//!   callers ───▶ │ SyncContext  │ ──── SyncEvent ───▶ notifications / navigation
//!                └──────────────┘
//!                   │        │
//!                   ▼        ▼
//!        ┌────────────────┐ ┌─────────────┐
//!        │ SessionManager │ │ LedgerStore │
//!        └────────────────┘ └─────────────┘
//!                   │        │
//!                   ▼        ▼
//!               ┌──────────────┐      ┌───────────┐
//!               │ ActionClient │ ───▶ │ Transport │
//!               └──────────────┘      └───────────┘
//! ```
//!
//! Built once per process and handed to whoever needs it; there is no
//! ambient global state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::client::ActionClient;
use crate::config::{SessionStoreConfig, SyncConfig};
use crate::error::Result;
use crate::notify::{Notifier, SyncEvent};
use crate::session::SessionManager;
use crate::state::{FileSessionStore, MemorySessionStore};
use crate::store::LedgerStore;
use crate::traits::{SessionStore, Transport};

/// Owns the session manager and the ledger store
pub struct SyncContext {
    client: Arc<ActionClient>,
    session: Arc<SessionManager>,
    ledger: LedgerStore,
}

impl SyncContext {
    /// Wire a context and restore any persisted session
    ///
    /// # Returns
    ///
    /// A tuple of (context, event_receiver) where event_receiver yields
    /// notifications
    pub async fn new(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (notifier, rx) = Notifier::channel(config.event_channel_capacity);
        let client = Arc::new(ActionClient::new(transport, notifier.clone()));
        Ok((Self::assemble(client, session_store, &config, notifier).await, rx))
    }

    /// Like [`new`](Self::new), with a pre-built client (custom success rules)
    ///
    /// The client is rebound to the context's notifier, so its transport
    /// failures reach the returned receiver.
    pub async fn with_client(
        config: SyncConfig,
        client: ActionClient,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (notifier, rx) = Notifier::channel(config.event_channel_capacity);
        let client = Arc::new(client.with_notifier(notifier.clone()));
        Ok((Self::assemble(client, session_store, &config, notifier).await, rx))
    }

    /// Build the configured session store, then [`new`](Self::new)
    pub async fn from_config(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;
        let store: Arc<dyn SessionStore> = match &config.session.store {
            SessionStoreConfig::File { path } => Arc::new(FileSessionStore::new(path).await?),
            SessionStoreConfig::Memory => Arc::new(MemorySessionStore::new()),
        };
        Self::new(config, transport, store).await
    }

    async fn assemble(
        client: Arc<ActionClient>,
        session_store: Arc<dyn SessionStore>,
        config: &SyncConfig,
        notifier: Notifier,
    ) -> Self {
        let session = Arc::new(SessionManager::new(
            client.clone(),
            session_store,
            &config.session,
            notifier.clone(),
        ));
        let ledger = LedgerStore::new(client.clone(), session.clone(), notifier);

        if let Some(restored) = session.restore().await {
            info!("Resuming session for {}", restored.email);
        }

        Self {
            client,
            session,
            ledger,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// Direct access to the action catalog
    pub fn client(&self) -> &ActionClient {
        &self.client
    }

    /// Log out and forget every cached list
    pub async fn logout(&self) {
        self.session.logout().await;
        self.ledger.clear().await;
    }
}
