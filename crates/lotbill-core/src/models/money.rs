//! Serialize money as JSON numbers.
//!
//! The decimal is printed first and the text parsed as `f64`, which gives the
//! nearest double, so `12.34` is written as `12.34` and reads back as the
//! same decimal.

use rust_decimal::Decimal;
use serde::{ser, Serializer};

pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    let number: f64 = value.to_string().parse().map_err(ser::Error::custom)?;
    serializer.serialize_f64(number)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => super::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }
}
