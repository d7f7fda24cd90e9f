//! Holder table decoding
//!
//! The `tget` action answers with an HTML document holding one table.
//! Row 0 is the header; each following row carries at least nine `<td>`
//! cells in this order:
//!
//! ```text
//! date | hid | name | mobile | totalDeposit | withdraw | charges | balance | status
//! ```
//!
//! Closing tags are optional: a row ends at its `</tr>`, the next `<tr>`
//! or `</table>`, and a cell ends at its `</td>` or the next `<td>`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{Parsed, parse_amount};
use crate::model::Holder;

/// Minimum cell count for a data row
pub const HOLDER_COLUMNS: usize = 9;

static ROW_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<tr\b[^>]*>").expect("valid row regex"));

static ROW_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</tr\s*>|</table\s*>").expect("valid row end regex"));

static CELL_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<td\b[^>]*>").expect("valid cell regex"));

static CELL_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</td\s*>").expect("valid cell end regex"));

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});

/// Decode the holder table
///
/// Short rows are skipped and counted; numeric cells that do not parse
/// become `0.0`. `email` and `penalty` are not part of this format.
pub fn parse_holders(html: &str) -> Parsed<Holder> {
    let mut holders = Vec::new();
    let mut skipped = 0;

    for row in segments(html, &ROW_START, &ROW_END).into_iter().skip(1) {
        let cells: Vec<String> = segments(row, &CELL_START, &CELL_END)
            .into_iter()
            .map(cell_text)
            .collect();

        if cells.len() < HOLDER_COLUMNS {
            tracing::debug!("Skipping holder row with {} cell(s)", cells.len());
            skipped += 1;
            continue;
        }

        holders.push(Holder {
            date: cells[0].clone(),
            hid: cells[1].clone(),
            name: cells[2].clone(),
            mobile: cells[3].clone(),
            total_deposit: parse_amount(&cells[4]),
            withdraw: parse_amount(&cells[5]),
            charges: parse_amount(&cells[6]),
            balance: parse_amount(&cells[7]),
            status: cells[8].clone(),
            email: String::new(),
            penalty: 0.0,
        });
    }

    Parsed::new(holders, skipped).log_degradation("holder")
}

/// Content after each `start` tag, up to the next `start` tag or the
/// first `end` match before it
fn segments<'a>(text: &'a str, start: &Regex, end: &Regex) -> Vec<&'a str> {
    let opens: Vec<_> = start.find_iter(text).collect();

    opens
        .iter()
        .enumerate()
        .map(|(i, open)| {
            let limit = opens.get(i + 1).map_or(text.len(), |next| next.start());
            let body = &text[open.end()..limit];
            end.find(body).map_or(body, |close| &body[..close.start()])
        })
        .collect()
}

/// Text content of a cell: nested markup stripped, entities decoded, trimmed
fn cell_text(inner: &str) -> String {
    let stripped = TAG.replace_all(inner, "");
    decode_entities(&stripped).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => numeric_entity(name),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "<tr><th>Date</th><th>HID</th><th>Name</th><th>Mobile</th>\
        <th>Deposit</th><th>Withdraw</th><th>Charges</th><th>Balance</th><th>Status</th></tr>";

    fn row(hid: &str, deposit: &str, balance: &str) -> String {
        format!(
            "<tr><td>2024-01-05</td><td>{hid}</td><td>Asha</td><td>9876543210</td>\
             <td>{deposit}</td><td>200</td><td>10</td><td>{balance}</td><td>to take</td></tr>"
        )
    }

    fn table(rows: &[String]) -> String {
        format!(
            "<html><body><table border=\"1\">{HEADER}{}</table></body></html>",
            rows.concat()
        )
    }

    #[test]
    fn decodes_rows_in_order() {
        let html = table(&[row("H1", "1000", "790"), row("H2", "50.5", "40.5")]);
        let parsed = parse_holders(&html);

        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.len(), 2);

        let first = &parsed.records[0];
        assert_eq!(first.date, "2024-01-05");
        assert_eq!(first.hid, "H1");
        assert_eq!(first.name, "Asha");
        assert_eq!(first.mobile, "9876543210");
        assert_eq!(first.total_deposit, 1000.0);
        assert_eq!(first.withdraw, 200.0);
        assert_eq!(first.charges, 10.0);
        assert_eq!(first.balance, 790.0);
        assert_eq!(first.status, "to take");
        assert_eq!(first.email, "");
        assert_eq!(first.penalty, 0.0);

        assert_eq!(parsed.records[1].hid, "H2");
        assert_eq!(parsed.records[1].total_deposit, 50.5);
    }

    #[test]
    fn non_numeric_money_defaults_to_zero() {
        let html = table(&[row("H1", "—", "")]);
        let parsed = parse_holders(&html);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.records[0].total_deposit, 0.0);
        assert_eq!(parsed.records[0].balance, 0.0);
    }

    #[test]
    fn short_rows_are_skipped_without_affecting_later_rows() {
        let short = "<tr><td>2024-01-05</td><td>H9</td><td>Broken</td></tr>".to_string();
        let html = table(&[row("H1", "1", "1"), short, row("H2", "2", "2")]);
        let parsed = parse_holders(&html);

        assert_eq!(parsed.skipped, 1);
        let hids: Vec<&str> = parsed.records.iter().map(|h| h.hid.as_str()).collect();
        assert_eq!(hids, ["H1", "H2"]);
    }

    #[test]
    fn header_row_is_skipped_even_with_td_cells() {
        let html = table(&[]).replace("<th>", "<td>").replace("</th>", "</td>");
        let parsed = parse_holders(&html);
        assert!(parsed.is_empty());
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn cell_markup_and_entities_are_flattened() {
        let html = table(&[
            "<TR class=\"odd\"><TD>2024-02-01</TD><td align=\"left\"> H3 </td>\
             <td><b>Ravi &amp; Sons</b></td><td>&#57;&#x39;</td><td>1e3</td><td>0</td>\
             <td>0</td><td>1000</td><td>to&nbsp;give</td></TR>"
                .to_string(),
        ]);
        let parsed = parse_holders(&html);

        assert_eq!(parsed.len(), 1);
        let holder = &parsed.records[0];
        assert_eq!(holder.hid, "H3");
        assert_eq!(holder.name, "Ravi & Sons");
        assert_eq!(holder.mobile, "99");
        assert_eq!(holder.total_deposit, 1000.0);
        assert_eq!(holder.status, "to give");
    }

    #[test]
    fn unclosed_rows_and_cells_are_separate_holders() {
        let unclosed = |hid: &str| {
            format!(
                "\n<tr><td>2024-01-05<td>{hid}<td>Asha<td>9876543210\
                 <td>100<td>0<td>0<td>100<td>to give"
            )
        };
        let html = format!(
            "<table>{HEADER}{}{}{}</table><p>Updated daily</p>",
            unclosed("H1"),
            row("H2", "5", "5"),
            unclosed("H3")
        );
        let parsed = parse_holders(&html);

        assert_eq!(parsed.skipped, 0);
        let hids: Vec<&str> = parsed.records.iter().map(|h| h.hid.as_str()).collect();
        assert_eq!(hids, ["H1", "H2", "H3"]);
        assert_eq!(parsed.records[0].balance, 100.0);
        assert_eq!(parsed.records[2].status, "to give");
    }

    #[test]
    fn garbage_input_yields_nothing() {
        assert!(parse_holders("").is_empty());
        assert!(parse_holders("Error: script failed").is_empty());
        assert!(parse_holders("<table><tr><td>").is_empty());
    }
}
