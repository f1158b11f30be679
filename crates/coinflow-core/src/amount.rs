//! Fixed-point amount arithmetic.
//!
//! Every amount handled by the wallet core is an unsigned integer at
//! [`DECIMALS`] decimal places: coin amounts in base units, currency amounts
//! and exchange rates at the same scale. Intermediate products use `u128`
//! so that `value * rate` never wraps; results that do not fit in `u64`
//! are reported as [`AmountError::Overflow`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{COIN, DECIMALS};
use crate::error::AmountError;

/// Rounding policy for fixed-point division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounding {
    /// Round half up.
    #[default]
    Nearest,
    /// Truncate toward zero. Used for "max amount" so the result is always affordable.
    Down,
}

impl Rounding {
    /// `Down` when `round_down` is set, `Nearest` otherwise.
    pub fn from_round_down(round_down: bool) -> Self {
        if round_down { Self::Down } else { Self::Nearest }
    }
}

/// Compute `a * b / d` with the given rounding, without intermediate overflow.
pub fn mul_div(a: u64, b: u64, d: u64, rounding: Rounding) -> Result<u64, AmountError> {
    if d == 0 {
        return Err(AmountError::ZeroRate);
    }
    let product = (a as u128) * (b as u128);
    let d = d as u128;
    let quotient = match rounding {
        Rounding::Down => product / d,
        Rounding::Nearest => (product + d / 2) / d,
    };
    u64::try_from(quotient).map_err(|_| AmountError::Overflow)
}

/// Exchange rate: currency units per whole coin, at [`DECIMALS`] places.
///
/// A rate of `Rate::from_whole(2000)` means one coin is worth 2000 units of
/// the fiat currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rate(u64);

impl Rate {
    /// Create a rate from its fixed-point representation. Zero is rejected.
    pub fn new(value: u64) -> Result<Self, AmountError> {
        if value == 0 {
            return Err(AmountError::ZeroRate);
        }
        Ok(Self(value))
    }

    /// Rate of `whole` currency units per coin.
    ///
    /// # Examples
    ///
    /// ```
    /// use coinflow_core::amount::Rate;
    /// let rate = Rate::from_whole(2000).unwrap();
    /// assert_eq!(rate.value(), 2000 * 100_000_000);
    /// ```
    pub fn from_whole(whole: u64) -> Result<Self, AmountError> {
        whole
            .checked_mul(COIN)
            .ok_or(AmountError::Overflow)
            .and_then(Self::new)
    }

    /// Fixed-point value of this rate.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Convert a coin amount (base units) into currency: `coin * rate`.
    pub fn to_currency(&self, coin: u64, rounding: Rounding) -> Result<u64, AmountError> {
        mul_div(coin, self.0, COIN, rounding)
    }

    /// Convert a currency amount into coin base units: `currency / rate`.
    pub fn to_coin(&self, currency: u64, rounding: Rounding) -> Result<u64, AmountError> {
        mul_div(currency, COIN, self.0, rounding)
    }
}

impl FromStr for Rate {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_amount(s, DECIMALS)?)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_amount(self.0, DECIMALS, Rounding::Nearest))
    }
}

/// Parse a decimal string into a fixed-point amount.
///
/// At most `max_decimals` fractional digits are accepted (capped at
/// [`DECIMALS`]). Surrounding whitespace is ignored; signs, exponents and
/// grouping separators are rejected.
///
/// # Examples
///
/// ```
/// use coinflow_core::amount::parse_amount;
/// assert_eq!(parse_amount("0.9999", 8).unwrap(), 99_990_000);
/// assert_eq!(parse_amount("12", 2).unwrap(), 1_200_000_000);
/// assert!(parse_amount("1.234", 2).is_err());
/// ```
pub fn parse_amount(s: &str, max_decimals: u32) -> Result<u64, AmountError> {
    let s = s.trim();
    if s.is_empty() || s == "." {
        return Err(AmountError::Empty);
    }
    if s.starts_with('-') {
        return Err(AmountError::Negative);
    }

    let max_decimals = max_decimals.min(DECIMALS);
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    if let Some(c) = whole.chars().chain(frac.chars()).find(|c| !c.is_ascii_digit()) {
        return Err(AmountError::InvalidCharacter(c));
    }

    let significant = frac.trim_end_matches('0');
    if significant.len() > max_decimals as usize {
        return Err(AmountError::TooPrecise {
            got: significant.len(),
            max: max_decimals,
        });
    }

    let mut value: u64 = 0;
    for digit in whole.bytes() {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(digit - b'0')))
            .ok_or(AmountError::Overflow)?;
    }
    value = value.checked_mul(COIN).ok_or(AmountError::Overflow)?;

    let mut scale = COIN;
    let mut fraction: u64 = 0;
    for digit in significant.bytes() {
        scale /= 10;
        fraction += u64::from(digit - b'0') * scale;
    }

    value.checked_add(fraction).ok_or(AmountError::Overflow)
}

/// Round a fixed-point amount to `decimals` fractional digits.
///
/// Rounding up past `u64::MAX` falls back to truncation.
pub fn round_to_decimals(value: u64, decimals: u32, rounding: Rounding) -> u64 {
    let decimals = decimals.min(DECIMALS);
    let step = 10u64.pow(DECIMALS - decimals);
    let down = value - value % step;
    match rounding {
        Rounding::Down => down,
        Rounding::Nearest => {
            if value % step >= step.div_ceil(2) && step > 1 {
                down.checked_add(step).unwrap_or(down)
            } else {
                down
            }
        }
    }
}

/// Format a fixed-point amount with at most `decimals` fractional digits.
///
/// Trailing fractional zeros are dropped.
///
/// # Examples
///
/// ```
/// use coinflow_core::amount::{format_amount, Rounding};
/// assert_eq!(format_amount(199_980_000_000, 2, Rounding::Nearest), "1999.8");
/// assert_eq!(format_amount(100_000_000, 8, Rounding::Nearest), "1");
/// assert_eq!(format_amount(12_345_678, 2, Rounding::Down), "0.12");
/// ```
pub fn format_amount(value: u64, decimals: u32, rounding: Rounding) -> String {
    let decimals = decimals.min(DECIMALS);
    let rounded = round_to_decimals(value, decimals, rounding);
    let whole = rounded / COIN;
    let frac = format!("{:08}", rounded % COIN);
    let frac = frac[..decimals as usize].trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

/// Format a signed base-unit amount (transaction net value).
pub fn format_signed(value: i64, decimals: u32) -> String {
    let formatted = format_amount(value.unsigned_abs(), decimals, Rounding::Nearest);
    if value < 0 {
        format!("-{formatted}")
    } else {
        formatted
    }
}
