//! Fixed-point monetary amounts
//!
//! Amounts are stored as an integer number of cents so arithmetic is exact.
//! On the wire (remote documents) they appear as plain decimal numbers with
//! two fractional digits, e.g. `12.50`.

use anyhow::{bail, Result};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monetary amount with two decimal places, stored as cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Create an amount from a number of cents
    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// The amount as cents
    pub fn cents(self) -> i64 {
        self.0
    }

    /// Convert to a plain decimal number for document payloads
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parse a plain decimal number, rounding to the nearest cent
    ///
    /// Rejects non-finite values and values too large to represent.
    pub fn from_decimal(value: f64) -> Result<Self> {
        if !value.is_finite() {
            bail!("Invalid monetary amount: {}", value);
        }
        let cents = (value * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            bail!("Monetary amount out of range: {}", value);
        }
        Ok(Money(cents as i64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::from_decimal(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents_roundtrip() {
        let m = Money::from_cents(1250);
        assert_eq!(m.cents(), 1250);
        assert_eq!(m.to_decimal(), 12.5);
    }

    #[test]
    fn test_from_decimal_rounds_to_cent() {
        assert_eq!(Money::from_decimal(12.505).unwrap().cents(), 1251);
        assert_eq!(Money::from_decimal(0.1).unwrap().cents(), 10);
        assert_eq!(Money::from_decimal(-3.99).unwrap().cents(), -399);
    }

    #[test]
    fn test_from_decimal_rejects_non_finite() {
        assert!(Money::from_decimal(f64::NAN).is_err());
        assert!(Money::from_decimal(f64::INFINITY).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1250).to_string(), "12.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_serde_plain_decimal() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, "19.99");
        let back: Money = serde_json::from_str("19.99").unwrap();
        assert_eq!(back.cents(), 1999);
        // Whole-number documents parse too
        let whole: Money = serde_json::from_str("20").unwrap();
        assert_eq!(whole.cents(), 2000);
    }
}
