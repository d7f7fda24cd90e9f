// # Response Parsers
//
// Stateless decoders for the three text formats the endpoint speaks:
//
// - `holders`: HTML table -> Holder
// - `penalties`: "Key: value" report lines -> Penalty
// - `records`: ", "-delimited lines -> LogEntry / Admin
//
// None of them can fail. A record that cannot be interpreted is dropped,
// counted in `Parsed::skipped` and logged at WARN, so a single malformed
// row never costs the caller the rest of the listing.

pub mod holders;
pub mod penalties;
pub mod records;

pub use holders::parse_holders;
pub use penalties::{NO_PENALTIES_SENTINEL, parse_penalties};
pub use records::{parse_admins, parse_logs};

/// Records decoded from one response plus the number of records dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    /// Decoded records, in source order
    pub records: Vec<T>,
    /// Records that were present but could not be interpreted
    pub skipped: usize,
}

impl<T> Parsed<T> {
    /// Build a result from decoded records and a skip count
    pub fn new(records: Vec<T>, skipped: usize) -> Self {
        Self { records, skipped }
    }

    /// Empty, non-degraded result
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    /// True when at least one record was dropped
    pub fn is_degraded(&self) -> bool {
        self.skipped > 0
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Discard the skip count
    pub fn into_records(self) -> Vec<T> {
        self.records
    }

    /// Log a WARN diagnostic when records were dropped
    pub(crate) fn log_degradation(self, format: &str) -> Self {
        if self.is_degraded() {
            tracing::warn!(
                "Dropped {} malformed {} record(s), kept {}",
                self.skipped,
                format,
                self.records.len()
            );
        }
        self
    }
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Lenient number parsing: anything unreadable counts as zero
pub(crate) fn parse_amount(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
