//! Currency tags and minor-unit conversion
//!
//! Amounts inside the engine are always integer minor units. Display strings
//! exist only at the boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currency tag with its minor-unit exponent (USD = 2, JPY = 0)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub exponent: u8,
}

impl Currency {
    pub fn new(code: impl Into<String>, exponent: u8) -> Self {
        Self {
            code: code.into(),
            exponent,
        }
    }

    /// Minor units per display unit
    pub fn scale(&self) -> Option<u64> {
        10u64.checked_pow(u32::from(self.exponent))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Malformed amount '{0}'")]
    Malformed(String),

    #[error("Negative amount '{0}'")]
    Negative(String),

    #[error("Amount '{amount}' has more than {exponent} decimal places")]
    Precision { amount: String, exponent: u8 },

    #[error("Amount '{0}' overflows")]
    Overflow(String),
}

/// Format minor units for display ("1234" → "12.34" for exponent 2)
///
/// Works on the decimal digits, so exponents beyond `u64` scale still place
/// the point correctly.
pub fn format_minor(amount: u64, currency: &Currency) -> String {
    let exponent = currency.exponent as usize;
    if exponent == 0 {
        return amount.to_string();
    }
    let digits = format!("{:0width$}", amount, width = exponent + 1);
    let (whole, fraction) = digits.split_at(digits.len() - exponent);
    format!("{whole}.{fraction}")
}

/// Parse a display amount into minor units ("12.3" → 1230 for exponent 2)
pub fn parse_display(text: &str, currency: &Currency) -> Result<u64, MoneyError> {
    let trimmed = text.trim();
    if trimmed.starts_with('-') {
        return Err(MoneyError::Negative(text.to_string()));
    }

    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
        return Err(MoneyError::Malformed(text.to_string()));
    }
    if fraction.len() > currency.exponent as usize {
        return Err(MoneyError::Precision {
            amount: text.to_string(),
            exponent: currency.exponent,
        });
    }

    let overflow = || MoneyError::Overflow(text.to_string());
    let scale = currency.scale().ok_or_else(overflow)?;
    let whole: u64 = whole.parse().map_err(|_| overflow())?;

    let mut minor = 0u64;
    if !fraction.is_empty() {
        let padding = currency.exponent as u32 - fraction.len() as u32;
        let digits: u64 = fraction.parse().map_err(|_| overflow())?;
        minor = digits * 10u64.pow(padding);
    }

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(minor))
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Currency {
        Currency::new("USD", 2)
    }

    #[test]
    fn test_format() {
        assert_eq!(format_minor(1234, &usd()), "12.34");
        assert_eq!(format_minor(5, &usd()), "0.05");
        assert_eq!(format_minor(700, &Currency::new("JPY", 0)), "700");
        assert_eq!(format_minor(0, &usd()), "0.00");
    }

    #[test]
    fn test_format_wide_exponent() {
        let wide = Currency::new("WIDE", 21);
        assert_eq!(wide.scale(), None);
        assert_eq!(format_minor(1234, &wide), "0.000000000000000001234");
        assert_eq!(format_minor(u64::MAX, &wide), "0.018446744073709551615");
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse_display("12.34", &usd()), Ok(1234));
        assert_eq!(parse_display("12.3", &usd()), Ok(1230));
        assert_eq!(parse_display("12", &usd()), Ok(1200));
        assert_eq!(parse_display(" 0.05 ", &usd()), Ok(5));
    }

    #[test]
    fn test_parse_rejects() {
        assert!(matches!(parse_display("-1", &usd()), Err(MoneyError::Negative(_))));
        assert!(matches!(parse_display("1.234", &usd()), Err(MoneyError::Precision { .. })));
        assert!(matches!(parse_display("abc", &usd()), Err(MoneyError::Malformed(_))));
        assert!(matches!(parse_display(".5", &usd()), Err(MoneyError::Malformed(_))));
        assert!(matches!(
            parse_display("184467440737095516.16", &usd()),
            Err(MoneyError::Overflow(_))
        ));
    }
}
