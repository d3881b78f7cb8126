//! Fixed-point decimal amounts.
//!
//! Balances, transfer amounts and fees cross the adapter boundary as decimal
//! strings at the asset's declared precision ("1.23" of a 2-decimal token,
//! "0.000021" ETH). Internally they are integers in the smallest denomination.

use std::fmt;

use alloy_primitives::U256;

use crate::error::EvmError;

/// A non-negative amount of an asset with `decimals` fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    raw: U256,
    decimals: u8,
}

impl Amount {
    /// Wraps an amount already expressed in the smallest denomination.
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self::from_raw(U256::ZERO, decimals)
    }

    /// Parses a decimal string such as `"1.5"` or `"0.000021"`.
    ///
    /// Rejects signs, exponents, separators and any non-zero digit beyond
    /// `decimals` fractional places. Surrounding whitespace is ignored.
    pub fn parse(input: &str, decimals: u8) -> Result<Self, EvmError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(EvmError::InvalidAmount("empty amount".into()));
        }
        if s.starts_with('-') {
            return Err(EvmError::InvalidAmount(format!("negative amount {s}")));
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(EvmError::InvalidAmount(format!("malformed amount {s}")));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(EvmError::InvalidAmount(format!("malformed amount {s}")));
        }

        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.len() > decimals as usize {
            return Err(EvmError::InvalidAmount(format!(
                "{s} exceeds precision of {decimals} decimals"
            )));
        }

        let mut digits = String::with_capacity(int_part.len() + decimals as usize);
        digits.push_str(int_part);
        digits.push_str(frac_part);
        for _ in frac_part.len()..decimals as usize {
            digits.push('0');
        }
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Self::zero(decimals));
        }

        let raw = U256::from_str_radix(digits, 10)
            .map_err(|e| EvmError::InvalidAmount(format!("{s}: {e}")))?;
        Ok(Self { raw, decimals })
    }

    /// Parses a decimal string using as many decimals as it carries, for
    /// unitless factors like `"1.3"`.
    pub fn parse_factor(input: &str) -> Result<Self, EvmError> {
        let decimals = input
            .trim()
            .split_once('.')
            .map(|(_, f)| f.len())
            .unwrap_or(0);
        let decimals = u8::try_from(decimals)
            .map_err(|_| EvmError::InvalidAmount(format!("factor {input} is too precise")))?;
        Self::parse(input, decimals)
    }

    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        self.same_precision(other)?;
        self.raw
            .checked_add(other.raw)
            .map(|raw| Self::from_raw(raw, self.decimals))
    }

    /// `None` when `other > self` or the precisions differ.
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        self.same_precision(other)?;
        self.raw
            .checked_sub(other.raw)
            .map(|raw| Self::from_raw(raw, self.decimals))
    }

    /// Multiplies by a unitless decimal factor, truncating toward zero.
    pub fn mul_factor(&self, factor: &Amount) -> Option<Amount> {
        let scale = U256::from(10u64).checked_pow(U256::from(factor.decimals))?;
        let product = self.raw.checked_mul(factor.raw)?;
        Some(Self::from_raw(product / scale, self.decimals))
    }

    fn same_precision(&self, other: &Amount) -> Option<()> {
        (self.decimals == other.decimals).then_some(())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.raw.to_string();
        let decimals = self.decimals as usize;
        if decimals == 0 {
            return f.write_str(&digits);
        }

        let padded = if digits.len() <= decimals {
            format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.is_empty() {
            f.write_str(int_part)
        } else {
            write!(f, "{int_part}.{frac_part}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_integer_and_fraction() {
        let a = Amount::parse("1.23", 2).unwrap();
        assert_eq!(a.raw(), U256::from(123u64));
        assert_eq!(a.decimals(), 2);

        let wei = Amount::parse("1", 18).unwrap();
        assert_eq!(wei.raw(), U256::from(1_000_000_000_000_000_000u128));
    }

    #[test]
    fn parse_leading_dot_and_trailing_zeros() {
        assert_eq!(Amount::parse(".5", 1).unwrap().raw(), U256::from(5u64));
        assert_eq!(Amount::parse("1.2300", 2).unwrap().raw(), U256::from(123u64));
        assert!(Amount::parse("0", 2).unwrap().is_zero());
        assert!(Amount::parse("0.00", 2).unwrap().is_zero());
    }

    #[test]
    fn parse_rejects_excess_precision() {
        let err = Amount::parse("1.234", 2).unwrap_err();
        assert!(matches!(err, EvmError::InvalidAmount(msg) if msg.contains("precision")));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in ["", "-1", "1e5", "1,5", "abc", ".", "1.2.3", "+1"] {
            assert!(Amount::parse(bad, 8).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Amount::parse("4.00", 2).unwrap().to_string(), "4");
        assert_eq!(Amount::parse("0.3", 2).unwrap().to_string(), "0.3");
        assert_eq!(
            Amount::from_raw(U256::from(21_000u64 * 20_000_000_000u64), 18).to_string(),
            "0.00042"
        );
        assert_eq!(Amount::from_raw(U256::from(7u64), 0).to_string(), "7");
        assert_eq!(Amount::zero(18).to_string(), "0");
    }

    #[test]
    fn arithmetic_requires_same_precision() {
        let a = Amount::parse("5", 2).unwrap();
        let b = Amount::parse("1", 2).unwrap();
        assert_eq!(a.checked_sub(&b).unwrap().to_string(), "4");
        assert_eq!(a.checked_add(&b).unwrap().to_string(), "6");
        assert!(b.checked_sub(&a).is_none());
        assert!(a.checked_sub(&Amount::parse("1", 3).unwrap()).is_none());
    }

    #[test]
    fn ordering_follows_value() {
        let small = Amount::parse("0.30", 2).unwrap();
        let big = Amount::parse("0.50", 2).unwrap();
        assert!(small < big);
    }

    #[test]
    fn mul_factor_scales_and_truncates() {
        let fee = Amount::parse("0.00042", 18).unwrap();
        let scale = Amount::parse_factor("1.3").unwrap();
        assert_eq!(fee.mul_factor(&scale).unwrap().to_string(), "0.000546");

        let cents = Amount::parse("0.05", 2).unwrap();
        let half = Amount::parse_factor("0.5").unwrap();
        assert_eq!(cents.mul_factor(&half).unwrap().to_string(), "0.02");
    }
}
