//! # Rational numbers
//!
//! Exact fractions used for every value on a stackbee stack.
//!
//! Values are always kept in lowest terms with a positive denominator, so
//! derived equality and hashing are value equality. Arithmetic never fails:
//! dividing or taking the remainder by zero yields zero, and so does a
//! result too large for the `i64` representation.

use crate::error::{self, Error, Result};
use num_integer::Integer;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::str::FromStr;

/// An exact fraction `numer / denom` in lowest terms.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rational {
    numer: i64,
    denom: i64,
}

impl Rational {
    pub const ZERO: Rational = Rational { numer: 0, denom: 1 };
    pub const ONE: Rational = Rational { numer: 1, denom: 1 };

    /// Create a normalized rational. A zero denominator yields zero.
    pub fn new(numer: i64, denom: i64) -> Self {
        Self::from_i128(numer as i128, denom as i128)
    }

    /// Create an integer rational
    pub const fn int(value: i64) -> Self {
        Rational { numer: value, denom: 1 }
    }

    /// Normalize a wide intermediate result, absorbing degenerate cases into zero.
    fn from_i128(numer: i128, denom: i128) -> Self {
        if denom == 0 || numer == 0 {
            return Self::ZERO;
        }
        let gcd = numer.gcd(&denom);
        let (mut numer, mut denom) = (numer / gcd, denom / gcd);
        if denom < 0 {
            numer = -numer;
            denom = -denom;
        }
        match (i64::try_from(numer), i64::try_from(denom)) {
            (Ok(numer), Ok(denom)) => Rational { numer, denom },
            _ => Self::ZERO,
        }
    }

    pub fn numer(&self) -> i64 {
        self.numer
    }

    pub fn denom(&self) -> i64 {
        self.denom
    }

    pub fn is_zero(&self) -> bool {
        self.numer == 0
    }

    /// The branch condition of `bgtz`
    pub fn is_positive(&self) -> bool {
        self.numer > 0
    }

    pub fn is_integer(&self) -> bool {
        self.denom == 1
    }

    /// The integer value, if this rational has no fractional part
    pub fn to_integer(&self) -> Option<i64> {
        self.is_integer().then_some(self.numer)
    }

    /// Parse a whitespace- or comma-separated list of rationals, e.g. `"1 2 -1/3"`
    pub fn parse_list(text: &str) -> Result<Vec<Rational>> {
        text.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Rational::int(value)
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

impl Add for Rational {
    type Output = Rational;

    fn add(self, rhs: Rational) -> Rational {
        let (a, b) = (self.wide(), rhs.wide());
        Rational::from_i128(a.0 * b.1 + b.0 * a.1, a.1 * b.1)
    }
}

impl Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Rational {
        let (a, b) = (self.wide(), rhs.wide());
        Rational::from_i128(a.0 * b.1 - b.0 * a.1, a.1 * b.1)
    }
}

impl Mul for Rational {
    type Output = Rational;

    fn mul(self, rhs: Rational) -> Rational {
        let (a, b) = (self.wide(), rhs.wide());
        Rational::from_i128(a.0 * b.0, a.1 * b.1)
    }
}

impl Div for Rational {
    type Output = Rational;

    /// `x / 0 = 0`
    fn div(self, rhs: Rational) -> Rational {
        let (a, b) = (self.wide(), rhs.wide());
        Rational::from_i128(a.0 * b.1, a.1 * b.0)
    }
}

impl Rem for Rational {
    type Output = Rational;

    /// Truncating remainder, `x - y * trunc(x / y)`; `x % 0 = 0`.
    fn rem(self, rhs: Rational) -> Rational {
        if rhs.is_zero() {
            return Rational::ZERO;
        }
        let (a, b) = (self.wide(), rhs.wide());
        // x / y = p / q, and x % y = (p % q) / (a.den * b.den)
        let p = a.0 * b.1;
        let q = a.1 * b.0;
        Rational::from_i128(p % q, a.1 * b.1)
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational::from_i128(-(self.numer as i128), self.denom as i128)
    }
}

impl Rational {
    fn wide(self) -> (i128, i128) {
        (self.numer as i128, self.denom as i128)
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.wide(), other.wide());
        (a.0 * b.1).cmp(&(b.0 * a.1))
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// Text form
// =============================================================================

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denom == 1 {
            write!(f, "{}", self.numer)
        } else {
            write!(f, "{}/{}", self.numer, self.denom)
        }
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Rational {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (numer, denom) = match s.split_once('/') {
            Some((n, d)) => (n, d),
            None => (s, "1"),
        };
        let numer: i64 = numer.parse().map_err(|_| error::invalid_rational(s))?;
        let denom: i64 = denom.parse().map_err(|_| error::invalid_rational(s))?;
        if denom == 0 {
            return Err(error::invalid_rational(s));
        }
        Ok(Rational::new(numer, denom))
    }
}

impl TryFrom<String> for Rational {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Rational> for String {
    fn from(value: Rational) -> Self {
        value.to_string()
    }
}
