//! Duration strings in the format the Pulumi Cloud API speaks.
//!
//! The service parses and prints durations like Go's `time.Duration`:
//! `"1h30m"` is accepted and printed back as `"1h30m0s"`. Normalizing user
//! input to the printed form keeps refreshed state from producing diffs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

/// Largest magnitude a duration may have (one past `i64::MAX` for negatives).
const LIMIT: u128 = 1 << 63;

/// A signed span of nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GoDuration(i64);

/// Errors from [`GoDuration::parse`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DurationError {
    /// Malformed or out of range.
    #[error("time: invalid duration {0:?}")]
    Invalid(String),
    /// A number without a unit.
    #[error("time: missing unit in duration {0:?}")]
    MissingUnit(String),
    /// A unit that is not one of ns, us, µs, ms, s, m, h.
    #[error("time: unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit {
        /// The unit as written.
        unit: String,
        /// The whole input.
        input: String,
    },
}

impl GoDuration {
    /// Creates a duration from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Returns the duration in nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Parses a duration such as `"300ms"`, `"-1.5h"` or `"2h45m"`.
    ///
    /// # Errors
    ///
    /// Returns a [`DurationError`] naming the problem and the input.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn parse(input: &str) -> Result<Self, DurationError> {
        let invalid = || DurationError::Invalid(input.to_string());

        let mut s = input;
        let mut negative = false;
        if let Some(rest) = s.strip_prefix('-') {
            negative = true;
            s = rest;
        } else if let Some(rest) = s.strip_prefix('+') {
            s = rest;
        }

        if s == "0" {
            return Ok(Self(0));
        }
        if s.is_empty() {
            return Err(invalid());
        }

        let mut total: u128 = 0;
        while !s.is_empty() {
            let first = s.as_bytes()[0];
            if !(first == b'.' || first.is_ascii_digit()) {
                return Err(invalid());
            }

            let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
            let mut whole: u128 = 0;
            for digit in s[..int_len].bytes() {
                whole = whole * 10 + u128::from(digit - b'0');
                if whole > LIMIT {
                    return Err(invalid());
                }
            }
            s = &s[int_len..];

            let mut fraction: u128 = 0;
            let mut scale: f64 = 1.0;
            let mut frac_len = 0;
            if let Some(rest) = s.strip_prefix('.') {
                s = rest;
                frac_len = s.bytes().take_while(u8::is_ascii_digit).count();
                let mut overflowed = false;
                for digit in s[..frac_len].bytes() {
                    if overflowed {
                        continue;
                    }
                    let next = fraction * 10 + u128::from(digit - b'0');
                    if next > LIMIT {
                        overflowed = true;
                        continue;
                    }
                    fraction = next;
                    scale *= 10.0;
                }
                s = &s[frac_len..];
            }
            if int_len == 0 && frac_len == 0 {
                return Err(invalid());
            }

            let unit_len = s
                .char_indices()
                .find(|(_, c)| *c == '.' || c.is_ascii_digit())
                .map_or(s.len(), |(i, _)| i);
            if unit_len == 0 {
                return Err(DurationError::MissingUnit(input.to_string()));
            }
            let unit_str = &s[..unit_len];
            s = &s[unit_len..];
            let unit = match unit_str {
                "ns" => NANOSECOND,
                "us" | "\u{b5}s" | "\u{3bc}s" => MICROSECOND,
                "ms" => MILLISECOND,
                "s" => SECOND,
                "m" => MINUTE,
                "h" => HOUR,
                _ => {
                    return Err(DurationError::UnknownUnit {
                        unit: unit_str.to_string(),
                        input: input.to_string(),
                    });
                }
            };

            if whole > LIMIT / unit {
                return Err(invalid());
            }
            let mut value = whole * unit;
            if fraction > 0 {
                value += (fraction as f64 * (unit as f64 / scale)) as u128;
                if value > LIMIT {
                    return Err(invalid());
                }
            }
            total += value;
            if total > LIMIT {
                return Err(invalid());
            }
        }

        if negative {
            return Ok(Self((total as i128).wrapping_neg() as i64));
        }
        if total > LIMIT - 1 {
            return Err(invalid());
        }
        Ok(Self(total as i64))
    }

    /// Parses `input` and prints it back in canonical form.
    ///
    /// # Errors
    ///
    /// Returns a [`DurationError`] if `input` does not parse.
    pub fn normalize(input: &str) -> Result<String, DurationError> {
        Self::parse(input).map(|d| d.to_string())
    }
}

/// Formats the low `precision` digits of `value` as a fraction without
/// trailing zeros, returning the remaining high digits.
fn format_fraction(value: u128, precision: u32) -> (String, u128) {
    let mut digits = Vec::new();
    let mut printing = false;
    let mut rest = value;
    for _ in 0..precision {
        let digit = rest % 10;
        printing = printing || digit != 0;
        if printing {
            digits.push(char::from(b'0' + u8::try_from(digit).unwrap_or(0)));
        }
        rest /= 10;
    }
    if !printing {
        return (String::new(), rest);
    }
    digits.push('.');
    (digits.into_iter().rev().collect(), rest)
}

impl fmt::Display for GoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.0 < 0;
        let magnitude = u128::from(self.0.unsigned_abs());
        let sign = if negative { "-" } else { "" };

        if magnitude == 0 {
            return write!(f, "0s");
        }

        if magnitude < SECOND {
            let (precision, unit) = if magnitude < MICROSECOND {
                (0, "ns")
            } else if magnitude < MILLISECOND {
                (3, "\u{b5}s")
            } else {
                (6, "ms")
            };
            let (fraction, whole) = format_fraction(magnitude, precision);
            return write!(f, "{sign}{whole}{fraction}{unit}");
        }

        let (fraction, seconds) = format_fraction(magnitude, 9);
        let minutes = seconds / 60;
        let hours = minutes / 60;
        if hours > 0 {
            write!(f, "{sign}{hours}h{}m{}{fraction}s", minutes % 60, seconds % 60)
        } else if minutes > 0 {
            write!(f, "{sign}{minutes}m{}{fraction}s", seconds % 60)
        } else {
            write!(f, "{sign}{seconds}{fraction}s")
        }
    }
}

impl FromStr for GoDuration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for GoDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GoDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
