//! Penalty report decoding
//!
//! ```text
//! Penalty Details:
//! Date: 2024-01-05, Amount: 200, Reason: late fee
//! Date: 2024-02-11, Amount: 50, Reason: missed meeting, second time
//! ```

use std::sync::LazyLock;

use regex::Regex;

use super::{Parsed, parse_amount};
use crate::model::Penalty;

/// Leading text the server sends when a holder has no penalties
pub const NO_PENALTIES_SENTINEL: &str = "No penalties found";

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Date: ([^,]+)").expect("valid date regex"));

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Amount: ([^,]+)").expect("valid amount regex"));

// Reason runs to the end of the line, commas included.
static REASON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Reason: (.+)").expect("valid reason regex"));

/// Decode a penalty report for holder `hid`
///
/// The first line is a header. A line becomes a [`Penalty`] only when all
/// three labels are present; its id is `P<line index>` and `time` is empty.
pub fn parse_penalties(text: &str, hid: &str) -> Parsed<Penalty> {
    if text.trim_start().starts_with(NO_PENALTIES_SENTINEL) {
        return Parsed::empty();
    }

    let mut penalties = Vec::new();
    let mut skipped = 0;

    for (index, line) in text.split('\n').enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let date = DATE.captures(line);
        let amount = AMOUNT.captures(line);
        let reason = REASON.captures(line);

        match (date, amount, reason) {
            (Some(date), Some(amount), Some(reason)) => penalties.push(Penalty {
                id: format!("P{index}"),
                date: date[1].trim().to_string(),
                time: String::new(),
                hid: hid.to_string(),
                amount: parse_amount(&amount[1]),
                reason: reason[1].trim().to_string(),
            }),
            _ => {
                tracing::debug!("Skipping penalty line {}: missing label", index);
                skipped += 1;
            }
        }
    }

    Parsed::new(penalties, skipped).log_degradation("penalty")
}
