//! Fixed-point money types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits kept by [`Amount`].
pub const SCALE: u32 = 2;
const FACTOR: i64 = 10i64.pow(SCALE);

/// A monetary amount stored as an integer count of hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    minor: i64,
}

impl Amount {
    /// Creates an amount from minor units (hundredths).
    pub const fn from_minor(minor: i64) -> Self {
        Self { minor }
    }

    /// Creates a whole amount, or `None` on overflow.
    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(FACTOR).map(Self::from_minor)
    }

    /// Builds an amount from an integer digit string and a fraction digit
    /// string. Fractions longer than [`SCALE`] are rounded half away from zero.
    pub fn from_digits(int_digits: &str, frac_digits: &str) -> Option<Self> {
        if !int_digits.bytes().all(|b| b.is_ascii_digit())
            || !frac_digits.bytes().all(|b| b.is_ascii_digit())
            || (int_digits.is_empty() && frac_digits.is_empty())
        {
            return None;
        }

        let mut units: i64 = 0;
        for b in int_digits.bytes() {
            units = units.checked_mul(10)?.checked_add(i64::from(b - b'0'))?;
        }

        let frac = frac_digits.as_bytes();
        let mut minor_frac: i64 = 0;
        for i in 0..SCALE as usize {
            let digit = frac.get(i).map_or(0, |b| i64::from(b - b'0'));
            minor_frac = minor_frac * 10 + digit;
        }
        if frac.get(SCALE as usize).is_some_and(|b| *b >= b'5') {
            minor_frac += 1;
        }

        units.checked_mul(FACTOR)?.checked_add(minor_frac).map(Self::from_minor)
    }

    /// The same amount with the opposite sign.
    pub const fn negated(self) -> Self {
        Self::from_minor(-self.minor)
    }

    pub const fn minor(&self) -> i64 {
        self.minor
    }

    /// Returns the whole part if the amount has no fraction.
    pub fn as_whole(&self) -> Option<i64> {
        (self.minor % FACTOR == 0).then_some(self.minor / FACTOR)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        let factor = FACTOR.unsigned_abs();
        write!(f, "{}{}.{:0width$}", sign, abs / factor, abs % factor, width = SCALE as usize)
    }
}

impl FromStr for Amount {
    type Err = String;

    /// Parses the canonical form only (`"1250.00"`, `"-3.5"`, `"7"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_digits, frac_digits) = body.split_once('.').unwrap_or((body, ""));
        let amount = Amount::from_digits(int_digits, frac_digits)
            .ok_or_else(|| format!("Invalid amount: {}", s))?;
        Ok(if negative { amount.negated() } else { amount })
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// ISO 4217 style three-letter currency code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Validates and uppercases a currency code.
    pub fn new(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
            Some(Self(code.to_ascii_uppercase()))
        } else {
            None
        }
    }

    /// US dollar, the fallback default currency.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(&value).ok_or_else(|| format!("Invalid currency code: {}", value))
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::try_from(s.to_string())
    }
}

/// A normalized price: a lower bound, an optional upper bound, and a currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    /// Single amount, or the lower bound of a range.
    pub min: Amount,
    /// Upper bound, kept only when ranges are preserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Amount>,
    pub currency: Currency,
}

impl Price {
    /// Creates a single-amount price.
    pub fn simple(amount: Amount, currency: Currency) -> Self {
        Self { min: amount, max: None, currency }
    }

    /// Creates a price range; bounds are put in order.
    pub fn range(a: Amount, b: Amount, currency: Currency) -> Self {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        Self { min, max: Some(max), currency }
    }

    pub fn is_range(&self) -> bool {
        self.max.is_some()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}-{} {}", self.min, max, self.currency),
            None => write!(f, "{} {}", self.min, self.currency),
        }
    }
}
