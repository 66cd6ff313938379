use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;

use super::normalize::{parse_br_date, parse_money};
use crate::models::Payment;

/// A date followed by an amount, optionally prefixed with R$.
static INSTALLMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2}[/.\-]\d{2}[/.\-]\d{4})\s+(?:R\$)?\s*([\d.,]+)")
        .expect("invalid installment regex")
});

/// Scan text for installment pairs, in document order.
///
/// Dates before `min_year` are discarded (issue dates and legal references
/// match the same shape). Zero amounts are skipped. Survivors are numbered
/// 1..N in order of appearance.
pub fn extract_payments(text: &str, min_year: i32) -> Vec<Payment> {
    let mut payments = Vec::new();

    for caps in INSTALLMENT_LINE.captures_iter(text) {
        let Some(due_date) = parse_br_date(&caps[1]) else {
            continue;
        };
        if due_date.year() < min_year {
            tracing::debug!(date = %due_date, "Skipping installment date before cutoff");
            continue;
        }
        let value = parse_money(&caps[2]);
        if value <= 0.0 {
            continue;
        }
        payments.push(Payment {
            number: payments.len() as u32 + 1,
            due_date,
            value,
            status: None,
        });
    }

    payments
}
