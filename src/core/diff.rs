use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

use crate::models::{ChangeRecord, Snapshot};

/// A current item that has a namesake in the previous snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPair {
    pub name: String,
    pub previous_price: f64,
    pub current_price: f64,
    /// `None` when the previous price was zero and no percentage exists.
    pub delta_percent: Option<f64>,
}

/// Left-joins `current` onto `previous` by exact item name.
///
/// Items only present in `current` are skipped, and items that disappeared
/// since `previous` produce nothing. When `previous` repeats a name, its
/// first occurrence is the match for every current item with that name.
/// Output follows the order of `current`.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<MatchedPair> {
    let mut previous_prices: HashMap<&str, f64> = HashMap::with_capacity(previous.len());
    for item in previous {
        previous_prices.entry(item.name.as_str()).or_insert(item.price);
    }

    current
        .iter()
        .filter_map(|item| {
            let previous_price = *previous_prices.get(item.name.as_str())?;
            Some(MatchedPair {
                name: item.name.clone(),
                previous_price,
                current_price: item.price,
                delta_percent: percent_change(previous_price, item.price),
            })
        })
        .collect()
}

/// `(current - previous) / previous * 100`, rounded half-to-even to two places.
///
/// `None` when no finite percentage exists, i.e. the previous price was zero
/// or too close to zero for the quotient to fit an `f64`.
pub fn percent_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }

    let raw = (current - previous) / previous * 100.0;
    if !raw.is_finite() {
        return None;
    }

    match Decimal::from_f64(raw) {
        Some(delta) => delta
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
            .to_f64(),
        // Past Decimal's range two decimal places are below f64 precision
        None => Some(raw),
    }
}

/// Keeps pairs whose absolute delta reaches `threshold_percent`.
pub fn filter(source: &str, pairs: &[MatchedPair], threshold_percent: f64) -> Vec<ChangeRecord> {
    pairs
        .iter()
        .filter_map(|pair| {
            let Some(delta) = pair.delta_percent else {
                if pair.previous_price == 0.0 {
                    tracing::debug!(item = %pair.name, "Skipping item with zero previous price");
                } else {
                    tracing::debug!(
                        item = %pair.name,
                        previous = pair.previous_price,
                        "Skipping item whose change is not a finite percentage"
                    );
                }
                return None;
            };

            (delta.abs() >= threshold_percent).then(|| ChangeRecord {
                source: source.to_string(),
                name: pair.name.clone(),
                previous_price: pair.previous_price,
                current_price: pair.current_price,
                delta_percent: delta,
            })
        })
        .collect()
}
