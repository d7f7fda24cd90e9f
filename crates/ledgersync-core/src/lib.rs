// # ledgersync-core
//
// Typed client-side synchronization layer for a text-based ledger endpoint.
//
// ## Architecture Overview
//
// - **Transport**: Trait for sending one action to the remote endpoint
// - **parse**: Stateless decoders for the endpoint's three text formats
// - **ActionClient**: One typed method per remote action
// - **SessionManager**: Login / OTP / logout state machine with a persisted session
// - **LedgerStore**: Holder snapshot refreshed after every confirmed mutation
// - **SyncContext**: Owns the above; constructed once and passed explicitly
//
// ## Design Principles
//
// 1. **Text in, types out**: only the parsers and the action client know the wire formats
// 2. **Degrade, don't fail**: malformed records are dropped and counted, never thrown
// 3. **Server first**: no local patching; read-after-write comes from a full re-fetch
// 4. **Library-First**: the CLI is a thin shell over this crate

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod notify;
pub mod parse;
pub mod session;
pub mod state;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use client::{
    Action, ActionClient, CommandOutcome, DepositRequest, LoginRequest, NewHolder, OtpRequest,
    PenaltyRequest, SuccessRule, WithdrawRequest,
};
pub use config::{SessionConfig, SessionStoreConfig, SyncConfig, TransportConfig};
pub use context::SyncContext;
pub use error::{Error, Result};
pub use model::{
    Admin, Holder, LedgerSummary, LogEntry, Penalty, Role, Session, Standing, Transaction,
    TransactionKind,
};
pub use notify::{Notifier, SyncEvent};
pub use parse::Parsed;
pub use session::{AuthState, SessionManager};
pub use state::{FileSessionStore, MemorySessionStore};
pub use store::{LedgerStore, Operation, OperationStatus};
pub use traits::{SessionStore, Transport};
