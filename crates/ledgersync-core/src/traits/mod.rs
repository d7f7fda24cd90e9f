//! Core traits for the synchronization layer
//!
//! - [`Transport`]: Send one action to the remote endpoint
//! - [`SessionStore`]: Persist the authenticated session

pub mod session_store;
pub mod transport;

pub use session_store::SessionStore;
pub use transport::{Params, Transport};
