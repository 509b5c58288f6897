//! Order number format: `PREFIX-YYYYMMDD-NNN`
//!
//! `NNN` restarts at 1 every day and is zero-padded to three digits. Past
//! 999 it simply grows wider, so the sequence must be compared numerically,
//! never as text.

use chrono::NaiveDate;

/// Day prefix every order number of `date` starts with, e.g. `VG-20240315-`
pub fn day_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}-", prefix, date.format("%Y%m%d"))
}

/// Build an order number from a day prefix and a sequence
pub fn format_order_number(day_prefix: &str, sequence: u32) -> String {
    format!("{}{:03}", day_prefix, sequence)
}

/// Sequence part of `order_number` if it belongs to `day_prefix`
pub fn parse_sequence(day_prefix: &str, order_number: &str) -> Option<u32> {
    order_number.strip_prefix(day_prefix)?.parse().ok()
}

/// Sequence following the highest one issued today
pub fn next_sequence(highest: Option<u32>) -> u32 {
    highest.map_or(1, |seq| seq + 1)
}
