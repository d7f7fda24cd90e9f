// # Transport Trait
//
// Defines the single request/response contract with the remote endpoint.
//
// ## Implementations
//
// - HTTP: `ledgersync-http` crate (`HttpTransport`, reqwest)
// - Tests: scripted doubles that answer per action
//
// ## Usage
//
// ```rust,ignore
// use ledgersync_core::Transport;
//
// let transport = /* Transport implementation */;
// let body = transport
//     .request("getPenalty", &[("hid", "H1".to_string())])
//     .await?;
// ```

use async_trait::async_trait;

/// Query parameters for one request, in the order they are sent
pub type Params = [(&'static str, String)];

/// Trait for transport implementations
///
/// A transport issues one GET per call against the configured endpoint,
/// adding `action=<action>` to `params`. It never inspects or parses the
/// body: whatever text the server returned is handed back unchanged.
///
/// # Failure contract
///
/// - Deadline elapsed: [`crate::Error::Timeout`], and no partial body is
///   ever returned.
/// - Network, DNS or connection failure: [`crate::Error::Transport`]
///   carrying the underlying message.
/// - HTTP status codes are not interpreted; a body is a body.
///
/// # Thread Safety
///
/// Implementations must be usable from concurrent tasks. Two overlapping
/// calls are two independent requests; no de-duplication, no queueing,
/// no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `action` with `params` and return the raw response text
    async fn request(&self, action: &str, params: &Params) -> Result<String, crate::Error>;

    /// Human-readable name for logs
    fn name(&self) -> &'static str {
        "transport"
    }
}
