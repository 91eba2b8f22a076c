use regex::Regex;
use std::sync::LazyLock;

use crate::models::{CapturedItem, Snapshot};

static NON_NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9.,]").unwrap());

/// Reads a price out of noisy page text, e.g. `"€ 1 234,56"` becomes `1234.56`.
///
/// Everything except ASCII digits, `.` and `,` is dropped and `,` is read as
/// the decimal separator. Text that leaves nothing parseable behind yields
/// `0.0` rather than an error, so a broken price cell never aborts a capture.
pub fn parse_price(raw: &str) -> f64 {
    let cleaned = NON_NUMERIC.replace_all(raw, "").replace(',', ".");
    if cleaned.is_empty() {
        return 0.0;
    }

    match cleaned.parse::<f64>() {
        Ok(price) if price.is_finite() => price,
        _ => 0.0,
    }
}

pub fn parse_name(raw: &str) -> String {
    raw.trim().to_string()
}

/// Pairs raw name and price texts positionally into a snapshot.
///
/// Surplus entries on the longer side have no counterpart and are dropped.
pub fn parse_capture(raw_names: &[String], raw_prices: &[String]) -> Snapshot {
    if raw_names.len() != raw_prices.len() {
        tracing::warn!(
            names = raw_names.len(),
            prices = raw_prices.len(),
            "Name and price counts differ, pairing the first {} entries",
            raw_names.len().min(raw_prices.len())
        );
    }

    raw_names
        .iter()
        .zip(raw_prices)
        .map(|(name, price)| CapturedItem::new(parse_name(name), parse_price(price)))
        .collect()
}
