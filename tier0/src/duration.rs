//! Stable duration type for protocol wire format.
//!
//! [`DurationMs`] serializes as a plain integer (milliseconds), not as
//! serde's internal `{"secs": N, "nanos": N}` format. Configuration
//! surfaces additionally accept human-readable strings ("5s", "24h")
//! via [`DurationMs::parse`] / [`DurationSpec`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DurationError;

/// Unit table in descending magnitude. Display picks the largest unit
/// that divides the value exactly, so `parse(format(d)) == d` and
/// canonical strings round-trip unchanged.
const UNITS: [(&str, u64); 5] = [
    ("d", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
    ("ms", 1),
];

/// Duration in milliseconds with a stable JSON serialization format.
///
/// Serializes as a plain `u64` integer representing milliseconds.
/// This is the canonical wire format for all durations in the protocol.
///
/// # Examples
///
/// ```
/// use tier0::DurationMs;
///
/// let d = DurationMs::parse("5s").unwrap();
/// assert_eq!(d.as_millis(), 5_000);
/// assert_eq!(d.to_string(), "5s");
///
/// let json = serde_json::to_string(&d).unwrap();
/// assert_eq!(json, "5000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationMs(u64);

impl DurationMs {
    /// Zero duration.
    pub const ZERO: Self = Self(0);

    /// Create from milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Create from seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Get the value in milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Convert to `std::time::Duration`.
    pub fn to_std(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Saturating addition.
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Parse a human duration string.
    ///
    /// Accepts a non-negative integer followed by optional whitespace and
    /// a case-sensitive unit: `ms`, `s`, `second(s)`, `m`, `minute(s)`,
    /// `h`, `hour(s)`, `d`, `day(s)`. Anything else fails with
    /// [`DurationError::InvalidDuration`]. Conversion is exact.
    pub fn parse(s: &str) -> Result<Self, DurationError> {
        let invalid = || DurationError::InvalidDuration(s.to_owned());

        let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        if digits_end == 0 {
            return Err(invalid());
        }
        let count: u64 = s[..digits_end].parse().map_err(|_| invalid())?;

        let unit = s[digits_end..].trim_start();
        let per_unit = match unit {
            "ms" => 1,
            "s" | "second" | "seconds" => 1_000,
            "m" | "minute" | "minutes" => 60_000,
            "h" | "hour" | "hours" => 3_600_000,
            "d" | "day" | "days" => 86_400_000,
            _ => return Err(invalid()),
        };

        count
            .checked_mul(per_unit)
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl From<u64> for DurationMs {
    fn from(ms: u64) -> Self {
        Self(ms)
    }
}

impl From<Duration> for DurationMs {
    fn from(d: Duration) -> Self {
        Self(d.as_millis() as u64)
    }
}

impl From<DurationMs> for Duration {
    fn from(d: DurationMs) -> Self {
        Duration::from_millis(d.0)
    }
}

impl Default for DurationMs {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for DurationMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (unit, per) in UNITS {
            if self.0 >= per && self.0 % per == 0 {
                return write!(f, "{}{unit}", self.0 / per);
            }
        }
        write!(f, "{}ms", self.0)
    }
}

/// A duration as it appears in configuration: either raw milliseconds
/// or a human string. Deserializes untagged, converts via `TryFrom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationSpec {
    /// Plain integer milliseconds.
    Millis(u64),
    /// Human string, e.g. `"30s"` or `"24 hours"`.
    Human(String),
}

impl TryFrom<DurationSpec> for DurationMs {
    type Error = DurationError;

    fn try_from(spec: DurationSpec) -> Result<Self, Self::Error> {
        match spec {
            DurationSpec::Millis(ms) => Ok(DurationMs::from_millis(ms)),
            DurationSpec::Human(s) => DurationMs::parse(&s),
        }
    }
}
