//! Money arithmetic and numeric coercion.

use std::str::FromStr;

use rust_decimal::prelude::*;
use serde_json::Value;

/// Round to 2 decimal places, half away from zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Largest magnitude accepted for any numeric field.
///
/// Products and sums of accepted values stay well inside `Decimal` range.
pub const MAX_AMOUNT: f64 = 1e12;

/// Magnitudes below this are read as zero.
const MIN_AMOUNT: f64 = 1e-9;

/// Parse a numeric string (plain or scientific notation) into a decimal.
///
/// Blank strings, non-finite spellings (`NaN`, `Infinity`) and magnitudes
/// above [`MAX_AMOUNT`] yield `None`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    s.parse::<f64>().ok().and_then(canonical)
}

/// Coerce an untrusted JSON value into a decimal.
///
/// Accepts JSON numbers and strings holding a finite number; anything else is `None`.
pub fn coerce_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.as_f64().and_then(canonical),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Every accepted number is read as a double and kept as its shortest
/// decimal spelling, so `"12.50"` and `12.5` give the same value and a
/// value written back out as a JSON number reads back unchanged.
fn canonical(number: f64) -> Option<Decimal> {
    if !number.is_finite() || number.abs() > MAX_AMOUNT {
        return None;
    }
    if number.abs() < MIN_AMOUNT {
        return Some(Decimal::ZERO);
    }

    Decimal::from_str(&number.to_string()).ok()
}

/// Sum of amounts, saturating at the `Decimal` bounds.
pub fn sum<I: IntoIterator<Item = Decimal>>(amounts: I) -> Decimal {
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |acc, a| acc.saturating_add(a))
}

/// Percentage rate (e.g. 20) as a multiplier (0.20).
pub fn rate_multiplier(rate: Decimal) -> Decimal {
    rate / Decimal::ONE_HUNDRED
}
