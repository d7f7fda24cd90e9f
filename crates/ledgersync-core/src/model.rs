//! Domain records decoded from the remote ledger
//!
//! Every type here is produced by the parsers or by the session manager.
//! The client never fabricates holders, penalties or log entries; it only
//! decodes what the server returned.

use serde::{Deserialize, Serialize};

/// Identity and ledger snapshot for one account holder
///
/// `balance` is computed by the server and is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    /// Unique holder identifier
    pub hid: String,
    pub name: String,
    pub mobile: String,
    /// Not part of the table format, always empty when decoded from it
    pub email: String,
    pub total_deposit: f64,
    pub withdraw: f64,
    pub charges: f64,
    pub balance: f64,
    /// Raw status label as sent by the server ("to give", "to take", ...)
    pub status: String,
    /// Running penalty total, not part of the table format
    pub penalty: f64,
    /// Creation or last-touch date
    pub date: String,
}

impl Holder {
    /// Interpret the status label
    pub fn standing(&self) -> Standing {
        Standing::from_label(&self.status)
    }
}

/// Tri-state reading of a holder's status label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    /// The holder owes money
    ToGive,
    /// The holder is owed money
    ToTake,
    Balanced,
}

impl Standing {
    /// Map a status label; unknown labels read as balanced
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "to give" => Standing::ToGive,
            "to take" => Standing::ToTake,
            _ => Standing::Balanced,
        }
    }
}

/// Kind of a historical ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Penalty,
}

/// Immutable record of one deposit, withdrawal or penalty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: String,
    pub time: String,
    pub hid: String,
    pub amount: f64,
    /// Withdrawal fee, when one applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charges: Option<f64>,
    pub note: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

/// Disciplinary charge against one holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    /// Synthesized from the report line position, not server-provided
    pub id: String,
    pub date: String,
    /// Empty when the server omits it
    pub time: String,
    pub hid: String,
    pub amount: f64,
    pub reason: String,
}

/// Audit record of a system action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub action: String,
    pub user: String,
    pub details: String,
    pub status: String,
}

/// Privileged user identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

/// Role of an authenticated identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Holder,
}

/// Authenticated identity, persisted across restarts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hid: Option<String>,
}

impl Session {
    /// Session for an administrator, the only role the OTP flow grants
    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: Role::Admin,
            hid: None,
        }
    }
}

/// Dashboard totals derived from a holder snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub holders: usize,
    pub total_deposits: f64,
    pub total_withdrawals: f64,
    pub total_penalties: f64,
    pub total_balance: f64,
}

impl LedgerSummary {
    /// Aggregate a snapshot
    pub fn from_holders(holders: &[Holder]) -> Self {
        holders.iter().fold(
            Self {
                holders: holders.len(),
                ..Self::default()
            },
            |mut acc, h| {
                acc.total_deposits += h.total_deposit;
                acc.total_withdrawals += h.withdraw;
                acc.total_penalties += h.penalty;
                acc.total_balance += h.balance;
                acc
            },
        )
    }
}
