//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that stand in for the remote
//! endpoint and the session storage medium.

#![allow(dead_code)]

use async_trait::async_trait;
use ledgersync_core::error::{Error, Result};
use ledgersync_core::traits::{Params, SessionStore, Transport};
use ledgersync_core::{MemorySessionStore, Session, SyncConfig, SyncContext, SyncEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};

pub const ENDPOINT: &str = "http://ledger.test/api";
pub const ADMIN: &str = "admin@bank.com";

/// One recorded transport call
#[derive(Debug, Clone)]
pub struct Call {
    pub action: String,
    pub params: Vec<(&'static str, String)>,
}

/// A transport answering from a per-action script
///
/// Each action has a queue of replies; the last reply is sticky. Actions
/// with no script, or marked failing, return a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<Vec<String>>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<Call>>,
    call_count: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a reply for `action`
    pub fn reply(&self, action: &str, body: impl Into<String>) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(action.to_string())
            .or_default()
            .push(body.into());
        self
    }

    /// Make every call to `action` fail at the transport level
    pub fn fail(&self, action: &str) -> &Self {
        self.failing.lock().unwrap().push(action.to_string());
        self
    }

    /// Park calls to `action` until the returned handle is notified
    pub fn hold(&self, action: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds
            .lock()
            .unwrap()
            .insert(action.to_string(), notify.clone());
        notify
    }

    /// Total number of requests sent
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Number of requests sent for `action`
    pub fn count(&self, action: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.action == action)
            .count()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self, action: &str) -> Option<String> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(action)?;
        if queue.len() > 1 {
            Some(queue.remove(0))
        } else {
            queue.first().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, action: &str, params: &Params) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call {
            action: action.to_string(),
            params: params.to_vec(),
        });

        let hold = self.holds.lock().unwrap().get(action).cloned();
        if let Some(hold) = hold {
            hold.notified().await;
        }

        if self.failing.lock().unwrap().iter().any(|a| a == action) {
            return Err(Error::transport("connection refused"));
        }

        self.next_reply(action)
            .ok_or_else(|| Error::transport(format!("no scripted reply for {action}")))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A session store that counts writes
#[derive(Clone, Default)]
pub struct CountingSessionStore {
    inner: MemorySessionStore,
    set_count: Arc<AtomicUsize>,
    remove_count: Arc<AtomicUsize>,
}

impl CountingSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share contents with an existing memory store
    pub fn wrapping(inner: MemorySessionStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn set_count(&self) -> usize {
        self.set_count.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.remove_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for CountingSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_count.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.remove_count.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }
}

/// Default configuration against the fake endpoint
pub fn test_config() -> SyncConfig {
    SyncConfig::new(ENDPOINT)
}

/// A memory store already holding an admin session
pub async fn signed_in_store() -> MemorySessionStore {
    let store = MemorySessionStore::new();
    let record = serde_json::to_string(&Session::admin(ADMIN)).unwrap();
    store.set("bankUser", &record).await.unwrap();
    store
}

/// A context whose session is restored as authenticated
pub async fn authenticated_context(
    transport: Arc<ScriptedTransport>,
) -> (SyncContext, mpsc::Receiver<SyncEvent>) {
    let store = signed_in_store().await;
    let (ctx, rx) = SyncContext::new(test_config(), transport, Arc::new(store))
        .await
        .expect("context construction succeeds");
    assert!(ctx.session().is_authenticated().await);
    (ctx, rx)
}

/// A context with nothing persisted
pub async fn anonymous_context(
    transport: Arc<ScriptedTransport>,
) -> (SyncContext, mpsc::Receiver<SyncEvent>) {
    SyncContext::new(test_config(), transport, Arc::new(MemorySessionStore::new()))
        .await
        .expect("context construction succeeds")
}

/// Render a holder table: header row plus one row per (hid, name, balance)
pub fn holder_table(rows: &[(&str, &str, f64)]) -> String {
    let mut html = String::from(
        "<html><body><table>\n<tr><th>Date</th><th>HID</th><th>Name</th><th>Mobile</th>\
         <th>Deposit</th><th>Withdraw</th><th>Charges</th><th>Balance</th><th>Status</th></tr>\n",
    );
    for (hid, name, balance) in rows {
        html.push_str(&format!(
            "<tr><td>2024-01-05</td><td>{hid}</td><td>{name}</td><td>9876543210</td>\
             <td>{balance}</td><td>0</td><td>0</td><td>{balance}</td><td>to give</td></tr>\n"
        ));
    }
    html.push_str("</table></body></html>");
    html
}

/// Everything currently queued on the event channel
pub fn drain(rx: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn failures(events: &[SyncEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SyncEvent::Failure { .. }))
        .count()
}
