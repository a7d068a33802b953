//! Exact two-digit decimal prices.
//!
//! Prices are held as a count of minor units so arithmetic and equality stay
//! exact. On the wire they travel as decimal strings (`"149.90"`); numbers are
//! accepted on input and rounded to the nearest cent.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const CENTS_PER_UNIT: i64 = 100;
const MAX_FRACTION_DIGITS: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("price is empty")]
    Empty,
    #[error("price must not be negative")]
    Negative,
    #[error("price `{0}` is not a decimal number")]
    Malformed(String),
    #[error("price `{0}` has more than two fractional digits")]
    TooPrecise(String),
    #[error("price exceeds the supported range")]
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: i64,
}

impl Price {
    pub const ZERO: Price = Price { cents: 0 };

    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents < 0 {
            return Err(PriceError::Negative);
        }
        Ok(Self { cents })
    }

    pub fn cents(self) -> i64 {
        self.cents
    }

    /// Floating-point view used by consumers that only understand plain numbers.
    pub fn as_f64(self) -> f64 {
        self.cents as f64 / CENTS_PER_UNIT as f64
    }

    fn from_f64(value: f64) -> Result<Self, PriceError> {
        if !value.is_finite() {
            return Err(PriceError::Malformed(value.to_string()));
        }
        if value < 0.0 {
            return Err(PriceError::Negative);
        }
        let cents = (value * CENTS_PER_UNIT as f64).round();
        if cents > i64::MAX as f64 {
            return Err(PriceError::OutOfRange);
        }
        Self::from_cents(cents as i64)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }
        if trimmed.starts_with('-') {
            return Err(PriceError::Negative);
        }

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };

        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
            return Err(PriceError::Malformed(trimmed.to_string()));
        }
        if fraction.len() > MAX_FRACTION_DIGITS {
            return Err(PriceError::TooPrecise(trimmed.to_string()));
        }

        let whole: i64 = whole.parse().map_err(|_| PriceError::OutOfRange)?;
        let mut fraction_cents: i64 = if fraction.is_empty() {
            0
        } else {
            fraction
                .parse()
                .map_err(|_| PriceError::Malformed(trimmed.to_string()))?
        };
        if fraction.len() == 1 {
            fraction_cents *= 10;
        }

        whole
            .checked_mul(CENTS_PER_UNIT)
            .and_then(|value| value.checked_add(fraction_cents))
            .ok_or(PriceError::OutOfRange)
            .and_then(Self::from_cents)
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.cents / CENTS_PER_UNIT,
            self.cents % CENTS_PER_UNIT
        )
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawPrice {
            Text(String),
            Number(f64),
        }

        match RawPrice::deserialize(deserializer)? {
            RawPrice::Text(text) => text.parse().map_err(serde::de::Error::custom),
            RawPrice::Number(value) => Price::from_f64(value).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!("120".parse::<Price>().unwrap().cents(), 12_000);
        assert_eq!("120.5".parse::<Price>().unwrap().cents(), 12_050);
        assert_eq!("120.05".parse::<Price>().unwrap().cents(), 12_005);
        assert_eq!(" 0.99 ".parse::<Price>().unwrap().cents(), 99);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!("".parse::<Price>(), Err(PriceError::Empty));
        assert_eq!("-1".parse::<Price>(), Err(PriceError::Negative));
        assert!(matches!(
            "1.234".parse::<Price>(),
            Err(PriceError::TooPrecise(_))
        ));
        assert!(matches!(".5".parse::<Price>(), Err(PriceError::Malformed(_))));
        assert!(matches!("1e3".parse::<Price>(), Err(PriceError::Malformed(_))));
        assert_eq!(
            "99999999999999999999".parse::<Price>(),
            Err(PriceError::OutOfRange)
        );
    }

    #[test]
    fn displays_two_fraction_digits() {
        assert_eq!(Price::from_cents(12_005).unwrap().to_string(), "120.05");
        assert_eq!(Price::ZERO.to_string(), "0.00");
    }

    #[test]
    fn float_view_matches_decimal_literal() {
        let price: Price = "249.99".parse().unwrap();
        assert_eq!(price.as_f64(), 249.99);
    }

    #[test]
    fn serde_accepts_strings_and_numbers() {
        let from_text: Price = serde_json::from_str("\"75.10\"").unwrap();
        let from_number: Price = serde_json::from_str("75.1").unwrap();
        assert_eq!(from_text, from_number);
        assert_eq!(serde_json::to_string(&from_text).unwrap(), "\"75.10\"");
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }
}
