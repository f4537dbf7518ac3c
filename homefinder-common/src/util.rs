use serde::Deserialize;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }
}

/// Reads the integer prefix of `input`, ignoring leading whitespace.
///
/// `"3 rooms"` gives 3 and `"2.5"` gives 2. Input without leading digits, or
/// whose prefix overflows an `i64`, gives `None`.
#[must_use]
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = unsigned
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }

    let digits = &unsigned[..digits_len];
    if negative {
        format!("-{digits}").parse().ok()
    } else {
        digits.parse().ok()
    }
}

/// An integer as sent by form-backed clients: a JSON number or a numeric
/// string.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(untagged)]
pub enum LooseInteger {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl LooseInteger {
    /// Fractions are truncated toward zero, strings go through
    /// [`parse_leading_int`].
    #[must_use]
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            LooseInteger::Integer(value) => Some(*value),
            #[allow(clippy::cast_possible_truncation)]
            LooseInteger::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            LooseInteger::Float(_) => None,
            LooseInteger::Text(text) => parse_leading_int(text),
        }
    }

    /// Like [`Self::to_integer`], but `None` unless the value fits an `i32`.
    #[must_use]
    pub fn to_i32(&self) -> Option<i32> {
        self.to_integer().and_then(|value| i32::try_from(value).ok())
    }

    /// The value only if it is a whole number: `1000`, `1000.0` and `"1000"`
    /// pass, `1000.75` and `"1000 EUR"` do not.
    #[must_use]
    pub fn to_exact_integer(&self) -> Option<i64> {
        match self {
            LooseInteger::Integer(value) => Some(*value),
            LooseInteger::Float(value) => exact_float(*value),
            LooseInteger::Text(text) => {
                let text = text.trim();
                text.parse()
                    .ok()
                    .or_else(|| text.parse().ok().and_then(exact_float))
            }
        }
    }

    /// Zero, NaN and the empty string, the values a form sends for a field
    /// left blank.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_blank(&self) -> bool {
        match self {
            LooseInteger::Integer(value) => *value == 0,
            LooseInteger::Float(value) => *value == 0.0 || value.is_nan(),
            LooseInteger::Text(text) => text.trim().is_empty(),
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
fn exact_float(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}
