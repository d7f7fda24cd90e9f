// # Session Store Trait
//
// Defines the interface for the small key/value storage that keeps the
// authenticated session across process restarts.
//
// ## Purpose
//
// The store is deliberately dumb: it holds opaque strings under keys, like
// browser local storage. Serializing the session and deciding that a
// malformed record means "no session" is the session manager's job.
//
// ## Implementations
//
// - File-based: JSON file with atomic writes and backup recovery
// - Memory: for tests and embedded use

use async_trait::async_trait;

/// Trait for session store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently.
///
/// ## Implementation Guidelines
///
/// - **Async I/O only**: never block the runtime
/// - **Durable writes**: `set` and `remove` persist before returning
/// - **Idempotent remove**: removing a missing key is not an error
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the value stored under `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(String))`: The stored value
    /// - `Ok(None)`: Nothing stored
    /// - `Err(Error)`: Storage error
    async fn get(&self, key: &str) -> Result<Option<String>, crate::Error>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), crate::Error>;

    /// Delete `key` (succeeds when it did not exist)
    async fn remove(&self, key: &str) -> Result<(), crate::Error>;
}
