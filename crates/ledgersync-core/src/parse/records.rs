//! Comma-space delimited records (`readlogs`, `readadmin`)

use super::Parsed;
use crate::model::{Admin, LogEntry, Role};

/// Field separator used by both listings
pub const SEPARATOR: &str = ", ";

/// Header marker for the log listing
pub const LOG_HEADER_MARKER: &str = "timestamp";

/// Header marker for the admin listing
pub const ADMIN_HEADER_MARKER: &str = "email";

const LOG_FIELDS: usize = 5;
const ADMIN_FIELDS: usize = 2;

/// Decode the audit log listing
pub fn parse_logs(text: &str) -> Parsed<LogEntry> {
    parse_delimited(text, LOG_HEADER_MARKER, LOG_FIELDS, |fields| LogEntry {
        timestamp: fields[0].to_string(),
        action: fields[1].to_string(),
        user: fields[2].to_string(),
        details: fields[3].to_string(),
        status: fields[4].to_string(),
    })
    .log_degradation("log")
}

/// Decode the admin listing; the 4th field, when present, is the last login
pub fn parse_admins(text: &str) -> Parsed<Admin> {
    parse_delimited(text, ADMIN_HEADER_MARKER, ADMIN_FIELDS, |fields| Admin {
        email: fields[0].to_string(),
        role: Role::Admin,
        last_login: fields.get(3).map(|s| s.to_string()),
    })
    .log_degradation("admin")
}

/// Skip line 0 only when it carries `header_marker`, then map every
/// non-blank line that splits into at least `min_fields` fields.
fn parse_delimited<T>(
    text: &str,
    header_marker: &str,
    min_fields: usize,
    build: impl Fn(&[&str]) -> T,
) -> Parsed<T> {
    let mut lines = text.split('\n').peekable();
    if lines
        .peek()
        .is_some_and(|first| first.contains(header_marker))
    {
        lines.next();
    }

    let mut records = Vec::new();
    let mut skipped = 0;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        if fields.len() < min_fields {
            skipped += 1;
            continue;
        }
        records.push(build(&fields));
    }

    Parsed::new(records, skipped)
}
