//! Conversion between base-unit integers and decimal strings.
//!
//! Base units are `U256`. Decimal rendering goes through
//! `alloy_primitives::utils`; rounding for display is done on the decimal
//! string so no precision is lost to floating point.

use alloy_primitives::U256;
use alloy_primitives::utils::{format_units, parse_ether};

use crate::constants::NATIVE_DECIMALS;
use crate::error::UnitsError;

/// Parse a whole-unit decimal amount (e.g. `"0.05"`) into native base units.
///
/// # Examples
///
/// ```
/// use alloy_primitives::U256;
/// use tap_core::units::parse_native;
/// assert_eq!(parse_native("1.5").unwrap(), U256::from(1_500_000_000_000_000_000u128));
/// ```
pub fn parse_native(amount: &str) -> Result<U256, UnitsError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(UnitsError::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(UnitsError::Negative(trimmed.to_string()));
    }
    parse_ether(trimmed).map_err(|e| UnitsError::InvalidAmount(format!("{trimmed}: {e}")))
}

/// Render base units as a decimal string, trimming trailing zeros but
/// keeping at least one fractional digit (`"1.0"`, `"0.25"`).
pub fn format_units_trimmed(value: U256, decimals: u8) -> Result<String, UnitsError> {
    let raw = format_units(value, decimals).map_err(|_| UnitsError::Decimals(decimals))?;
    Ok(trim_fraction(&raw))
}

/// [`format_units_trimmed`] for the native currency.
pub fn format_native(value: U256) -> String {
    // 18 decimals is always a valid unit.
    format_units_trimmed(value, NATIVE_DECIMALS).unwrap_or_else(|_| value.to_string())
}

/// Render base units rounded half-up to exactly `places` fractional digits.
///
/// ```
/// use alloy_primitives::U256;
/// use tap_core::units::format_fixed;
/// let wei = U256::from(1_234_567_000_000_000_000u128);
/// assert_eq!(format_fixed(wei, 18, 4).unwrap(), "1.2346");
/// ```
pub fn format_fixed(value: U256, decimals: u8, places: usize) -> Result<String, UnitsError> {
    let raw = format_units(value, decimals).map_err(|_| UnitsError::Decimals(decimals))?;
    round_decimal_str(&raw, places)
}

/// Round a non-negative decimal string half-up to `places` fractional digits.
pub fn round_decimal_str(value: &str, places: usize) -> Result<String, UnitsError> {
    let (int_part, frac_part) = value.split_once('.').unwrap_or((value, ""));
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UnitsError::InvalidAmount(value.to_string()));
    }

    let mut digits: Vec<u8> = int_part.bytes().map(|b| b - b'0').collect();
    let int_len = digits.len();
    let frac = frac_part.as_bytes();
    for i in 0..places {
        digits.push(frac.get(i).map_or(0, |b| b - b'0'));
    }

    let round_up = frac.get(places).is_some_and(|b| *b >= b'5');
    if round_up {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let split = digits.len() - places;
    debug_assert!(split >= int_len);
    let mut out: String = digits[..split].iter().map(|d| char::from(b'0' + d)).collect();
    if places > 0 {
        out.push('.');
        out.extend(digits[split..].iter().map(|d| char::from(b'0' + d)));
    }
    Ok(out)
}

fn trim_fraction(raw: &str) -> String {
    match raw.split_once('.') {
        Some((int_part, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{int_part}.0")
            } else {
                format!("{int_part}.{frac}")
            }
        }
        None => format!("{raw}.0"),
    }
}
