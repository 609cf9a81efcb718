//! Duration strings that keep their original spelling
//!
//! Configuration durations such as `"30s"` or `"14d"` are validated when they
//! are deserialized but stored as the text the operator wrote. Converting to a
//! [`Duration`] and back would rewrite equivalent spellings (`"14d"` -> `"2w"`),
//! so callers convert on demand with [`DurationString::to_duration`].

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([0-9]+)y)?(([0-9]+)w)?(([0-9]+)d)?(([0-9]+)h)?(([0-9]+)m)?(([0-9]+)s)?(([0-9]+)ms)?$",
    )
    .expect("duration pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("empty duration string")]
    Empty,
    #[error("not a valid duration string: {0:?}")]
    Invalid(String),
    #[error("duration out of range: {0:?}")]
    Overflow(String),
}

/// Parse a duration such as `1h30m` or `500ms`.
///
/// Units must appear in the order y, w, d, h, m, s, ms, each at most once.
/// A year is 365 days. `"0"` is accepted as zero.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    match input {
        "" => return Err(DurationError::Empty),
        "0" => return Ok(Duration::ZERO),
        _ => {}
    }

    let caps = DURATION_RE
        .captures(input)
        .ok_or_else(|| DurationError::Invalid(input.to_string()))?;

    // (capture group holding the number, milliseconds per unit)
    const UNITS: [(usize, u64); 7] = [
        (2, 365 * 24 * 60 * 60 * 1000),
        (4, 7 * 24 * 60 * 60 * 1000),
        (6, 24 * 60 * 60 * 1000),
        (8, 60 * 60 * 1000),
        (10, 60 * 1000),
        (12, 1000),
        (14, 1),
    ];

    let overflow = || DurationError::Overflow(input.to_string());
    let mut total_ms: u64 = 0;
    for (group, unit_ms) in UNITS {
        if let Some(m) = caps.get(group) {
            let n: u64 = m.as_str().parse().map_err(|_| overflow())?;
            let part = n.checked_mul(unit_ms).ok_or_else(overflow)?;
            total_ms = total_ms.checked_add(part).ok_or_else(overflow)?;
        }
    }

    Ok(Duration::from_millis(total_ms))
}

/// A validated duration kept in its original textual form.
///
/// An empty string is valid and means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DurationString(String);

impl DurationString {
    pub fn new(value: impl Into<String>) -> Result<Self, DurationError> {
        let value = value.into();
        if !value.is_empty() {
            parse_duration(&value)?;
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `None` when unset. The text was validated on construction.
    pub fn to_duration(&self) -> Option<Duration> {
        if self.0.is_empty() {
            return None;
        }
        parse_duration(&self.0).ok()
    }
}

impl fmt::Display for DurationString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DurationString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DurationString::new(raw).map_err(serde::de::Error::custom)
    }
}
