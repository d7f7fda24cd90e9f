//! Domain state store
//!
//! Holds the authoritative in-memory snapshot of holders, penalties, logs
//! and admins. Every mutation goes to the server first and, once the server
//! confirms, the whole holder snapshot is fetched again. Nothing is ever
//! patched locally, so a failed mutation leaves the snapshot untouched.
//!
//! ## Loading and errors
//!
//! Progress is tracked per [`Operation`] so concurrent operations do not
//! overwrite each other's loading flag. [`LedgerStore::error`] still
//! reports a single last error: whichever operation settled most recently
//! wins, and a success clears it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::{
    ActionClient, CommandOutcome, DepositRequest, NewHolder, PenaltyRequest, WithdrawRequest,
};
use crate::error::Result;
use crate::model::{Admin, Holder, LedgerSummary, LogEntry, Penalty, Transaction};
use crate::notify::Notifier;
use crate::session::SessionManager;

/// Operation kinds tracked by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchHolders,
    AddHolder,
    Deposit,
    Withdraw,
    AddPenalty,
    FetchPenalties,
    FetchLogs,
    FetchAdmins,
}

/// Progress of one operation kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStatus {
    /// Invocations started and not yet settled
    pub in_flight: usize,
    /// Error of the most recently settled invocation
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct LedgerState {
    holders: Vec<Holder>,
    transactions: Vec<Transaction>,
    penalties: Vec<Penalty>,
    logs: Vec<LogEntry>,
    admins: Vec<Admin>,
    operations: HashMap<Operation, OperationStatus>,
    error: Option<String>,
}

/// Snapshot owner and mutation entry point
pub struct LedgerStore {
    client: Arc<ActionClient>,
    session: Arc<SessionManager>,
    state: RwLock<LedgerState>,
    notifier: Notifier,
}

impl LedgerStore {
    pub fn new(client: Arc<ActionClient>, session: Arc<SessionManager>, notifier: Notifier) -> Self {
        Self {
            client,
            session,
            state: RwLock::new(LedgerState::default()),
            notifier,
        }
    }

    /// Replace the holder snapshot with the server's
    ///
    /// No-op while not authenticated.
    pub async fn fetch_holders(&self) {
        if !self.session.is_authenticated().await {
            debug!("Not authenticated, skipping holder refresh");
            return;
        }

        self.begin(Operation::FetchHolders).await;
        let holders = self.client.list_holders().await.into_records();
        debug!("Holder snapshot: {} record(s)", holders.len());

        let mut state = self.state.write().await;
        state.holders = holders;
        Self::settle_locked(&mut state, Operation::FetchHolders, None);
    }

    pub async fn add_holder(&self, holder: &NewHolder) -> bool {
        self.mutate(
            Operation::AddHolder,
            "Holder added successfully",
            self.client.add_holder(holder),
        )
        .await
    }

    pub async fn make_deposit(&self, req: &DepositRequest) -> bool {
        self.mutate(
            Operation::Deposit,
            "Deposit successful",
            self.client.deposit(req),
        )
        .await
    }

    pub async fn make_withdrawal(&self, req: &WithdrawRequest) -> bool {
        self.mutate(
            Operation::Withdraw,
            "Withdrawal successful",
            self.client.withdraw(req),
        )
        .await
    }

    pub async fn add_penalty(&self, req: &PenaltyRequest) -> bool {
        self.mutate(
            Operation::AddPenalty,
            "Penalty added successfully",
            self.client.add_penalty(req),
        )
        .await
    }

    /// Replace the penalty list with those of `hid`
    pub async fn fetch_penalties_for_holder(&self, hid: &str) {
        self.begin(Operation::FetchPenalties).await;
        let penalties = self.client.list_penalties(hid).await.into_records();

        let mut state = self.state.write().await;
        state.penalties = penalties;
        Self::settle_locked(&mut state, Operation::FetchPenalties, None);
    }

    /// Replace the log list; no-op while not authenticated
    pub async fn fetch_logs(&self) {
        if !self.session.is_authenticated().await {
            return;
        }

        self.begin(Operation::FetchLogs).await;
        let logs = self.client.read_logs().await.into_records();

        let mut state = self.state.write().await;
        state.logs = logs;
        Self::settle_locked(&mut state, Operation::FetchLogs, None);
    }

    /// Replace the admin list; no-op while not authenticated
    pub async fn fetch_admins(&self) {
        if !self.session.is_authenticated().await {
            return;
        }

        self.begin(Operation::FetchAdmins).await;
        let admins = self.client.read_admins().await.into_records();

        let mut state = self.state.write().await;
        state.admins = admins;
        Self::settle_locked(&mut state, Operation::FetchAdmins, None);
    }

    /// Transactions are not served by the endpoint; the caller supplies them
    pub async fn set_transactions(&self, transactions: Vec<Transaction>) {
        self.state.write().await.transactions = transactions;
    }

    pub async fn holders(&self) -> Vec<Holder> {
        self.state.read().await.holders.clone()
    }

    pub async fn holder(&self, hid: &str) -> Option<Holder> {
        self.state
            .read()
            .await
            .holders
            .iter()
            .find(|h| h.hid == hid)
            .cloned()
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.state.read().await.transactions.clone()
    }

    pub async fn penalties(&self) -> Vec<Penalty> {
        self.state.read().await.penalties.clone()
    }

    pub async fn logs(&self) -> Vec<LogEntry> {
        self.state.read().await.logs.clone()
    }

    pub async fn admins(&self) -> Vec<Admin> {
        self.state.read().await.admins.clone()
    }

    /// Totals over the current holder snapshot
    pub async fn summary(&self) -> LedgerSummary {
        LedgerSummary::from_holders(&self.state.read().await.holders)
    }

    /// Holders whose name or hid contains `query` (case-insensitive),
    /// highest balance first, at most `limit`
    pub async fn top_holders(&self, query: &str, limit: usize) -> Vec<Holder> {
        let needle = query.to_lowercase();
        let mut matches: Vec<Holder> = self
            .state
            .read()
            .await
            .holders
            .iter()
            .filter(|h| {
                h.name.to_lowercase().contains(&needle) || h.hid.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.balance.total_cmp(&a.balance));
        matches.truncate(limit);
        matches
    }

    /// Last error of whichever operation settled most recently
    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// True while any operation is in flight
    pub async fn is_loading(&self) -> bool {
        self.state
            .read()
            .await
            .operations
            .values()
            .any(|s| s.in_flight > 0)
    }

    pub async fn is_loading_op(&self, op: Operation) -> bool {
        self.status(op).await.in_flight > 0
    }

    pub async fn status(&self, op: Operation) -> OperationStatus {
        self.state
            .read()
            .await
            .operations
            .get(&op)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop every list, status and error
    pub async fn clear(&self) {
        *self.state.write().await = LedgerState::default();
    }

    /// Server first; on confirmation, refresh the whole holder snapshot
    async fn mutate(
        &self,
        op: Operation,
        success_message: &str,
        call: impl Future<Output = Result<CommandOutcome>>,
    ) -> bool {
        self.begin(op).await;

        match call.await {
            Ok(CommandOutcome::Success { message }) => {
                info!("{:?} confirmed: {}", op, message);
                self.notifier.success(success_message);
                self.settle(op, None).await;
                self.fetch_holders().await;
                true
            }
            Ok(CommandOutcome::Rejected { message }) => {
                info!("{:?} rejected: {}", op, message);
                self.notifier.failure(message.clone());
                self.settle(op, Some(message)).await;
                false
            }
            Err(e) => {
                // The client has already notified about transport failures.
                self.settle(op, Some(e.to_string())).await;
                false
            }
        }
    }

    async fn begin(&self, op: Operation) {
        self.state
            .write()
            .await
            .operations
            .entry(op)
            .or_default()
            .in_flight += 1;
    }

    async fn settle(&self, op: Operation, error: Option<String>) {
        let mut state = self.state.write().await;
        Self::settle_locked(&mut state, op, error);
    }

    fn settle_locked(state: &mut LedgerState, op: Operation, error: Option<String>) {
        let status = state.operations.entry(op).or_default();
        status.in_flight = status.in_flight.saturating_sub(1);
        status.last_error = error.clone();
        state.error = error;
    }
}
