//! Byte sizes written as `"100MB"`, `"512KiB"` or a plain integer

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KIB: u64 = 1024;

/// Binary unit suffixes, largest first
const UNITS: &[(&str, u64)] = &[
    ("TB", KIB * KIB * KIB * KIB),
    ("GB", KIB * KIB * KIB),
    ("MB", KIB * KIB),
    ("KB", KIB),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("empty size")]
    Empty,

    #[error("invalid size number in {0:?}")]
    InvalidNumber(String),

    #[error("unknown size unit {0:?}")]
    UnknownUnit(String),

    #[error("size {0:?} does not fit in 64 bits")]
    Overflow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    let multiplier = match unit {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => KIB,
        "M" | "MB" | "MIB" => KIB * KIB,
        "G" | "GB" | "GIB" => KIB * KIB * KIB,
        "T" | "TB" | "TIB" => KIB * KIB * KIB * KIB,
        _ => return None,
    };
    Some(multiplier)
}

impl FromStr for ByteSize {
    type Err = SizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(SizeParseError::Empty);
        }

        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);

        let number: u64 = digits
            .parse()
            .map_err(|_| SizeParseError::InvalidNumber(s.to_string()))?;
        let multiplier = unit_multiplier(&unit.trim().to_ascii_uppercase())
            .ok_or_else(|| SizeParseError::UnknownUnit(unit.trim().to_string()))?;

        number
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| SizeParseError::Overflow(s.to_string()))
    }
}

impl fmt::Display for ByteSize {
    /// Largest unit that divides evenly, otherwise one decimal place
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(&(unit, divisor)) = UNITS.iter().find(|(_, divisor)| self.0 >= *divisor) else {
            return write!(f, "{}B", self.0);
        };

        if self.0 % divisor == 0 {
            write!(f, "{}{}", self.0 / divisor, unit)
        } else {
            write!(f, "{:.1}{}", self.0 as f64 / divisor as f64, unit)
        }
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if UNITS.iter().any(|(_, divisor)| self.0 >= *divisor && self.0 % divisor == 0) {
            serializer.collect_str(self)
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Bytes(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawSize::deserialize(deserializer)? {
            RawSize::Bytes(bytes) => Ok(ByteSize(bytes)),
            RawSize::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
