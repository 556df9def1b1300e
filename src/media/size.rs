use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{ConvertError, ConvertResult};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * 1024;

/// `<number><unit>-<number><unit>`, units KB or MB in any case.
static SIZE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d+)?(?:MB|KB))-(\d+(?:\.\d+)?(?:MB|KB))$")
        .expect("size range pattern is valid")
});

/// Inclusive byte-size window the re-encoded output must land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeTarget {
    min_bytes: u64,
    max_bytes: u64,
}

impl SizeTarget {
    /// Builds a target, rejecting windows where `min >= max`.
    pub fn new(min_bytes: u64, max_bytes: u64) -> ConvertResult<Self> {
        if min_bytes >= max_bytes {
            return Err(ConvertError::EmptyRange { min_bytes, max_bytes });
        }
        Ok(Self { min_bytes, max_bytes })
    }

    pub fn min_bytes(&self) -> u64 {
        self.min_bytes
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn contains(&self, len: u64) -> bool {
        self.min_bytes <= len && len <= self.max_bytes
    }

    pub fn is_below(&self, len: u64) -> bool {
        len < self.min_bytes
    }

    pub fn is_above(&self, len: u64) -> bool {
        len > self.max_bytes
    }
}

impl std::fmt::Display for SizeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", display_size(self.min_bytes), display_size(self.max_bytes))
    }
}

/// Converts a `<number>KB` / `<number>MB` token into bytes (1024-based).
///
/// Fractional values are rounded to the nearest byte.
pub fn convert_to_bytes(token: &str) -> ConvertResult<u64> {
    let invalid = || ConvertError::InvalidSizeRange { input: token.to_string() };

    let upper = token.trim().to_ascii_uppercase();
    let (number, multiplier) = if let Some(n) = upper.strip_suffix("MB") {
        (n, MIB)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, KIB)
    } else {
        return Err(invalid());
    };

    let value: f64 = number.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }

    Ok((value * multiplier as f64).round() as u64)
}

/// Formats a byte count with two decimals, in KB below 1024 KB and MB above.
pub fn display_size(bytes: u64) -> String {
    let kb = bytes as f64 / KIB as f64;
    if kb >= 1024.0 {
        format!("{:.2}MB", kb / 1024.0)
    } else {
        format!("{kb:.2}KB")
    }
}

/// Returns the two size tokens when `input` has the `<min>-<max>` shape.
///
/// This is purely syntactic: `3MB-2MB` matches.
pub fn match_size_range(input: &str) -> Option<(&str, &str)> {
    let caps = SIZE_RANGE_RE.captures(input)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Parses a `<min>-<max>` token into a validated [`SizeTarget`].
pub fn parse_size_range(input: &str) -> ConvertResult<SizeTarget> {
    let (min, max) = match_size_range(input).ok_or_else(|| ConvertError::InvalidSizeRange {
        input: input.to_string(),
    })?;

    SizeTarget::new(convert_to_bytes(min)?, convert_to_bytes(max)?)
}
