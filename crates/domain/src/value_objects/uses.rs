//! Limited-use resources: how many uses, and when they come back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::rules::RestType;

/// Stored value meaning "no limit".
pub const UNLIMITED_USES: i32 = -1;

/// When a limited-use resource refills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetTiming {
    ShortRest,
    LongRest,
    Dawn,
}

impl ResetTiming {
    /// Single-letter storage code (S, L, D).
    pub fn code(&self) -> &'static str {
        match self {
            Self::ShortRest => "S",
            Self::LongRest => "L",
            Self::Dawn => "D",
        }
    }

    /// Whether a rest of the given type refills this resource.
    ///
    /// A long rest also covers short-rest and dawn resources.
    pub fn refills_on(&self, rest: RestType) -> bool {
        match (self, rest) {
            (Self::ShortRest, _) => true,
            (Self::LongRest | Self::Dawn, RestType::Long) => true,
            (Self::LongRest | Self::Dawn, RestType::Short) => false,
        }
    }
}

impl fmt::Display for ResetTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ShortRest => "short rest",
            Self::LongRest => "long rest",
            Self::Dawn => "dawn",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for ResetTiming {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "short" | "short_rest" => Ok(Self::ShortRest),
            "l" | "long" | "long_rest" => Ok(Self::LongRest),
            "d" | "dawn" => Ok(Self::Dawn),
            _ => Err(DomainError::parse(format!("Unknown reset timing: {}", s))),
        }
    }
}

/// Maximum uses of a resource: a number, or unlimited.
///
/// Serialized as the raw integer with `-1` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum UsesLimit {
    Limited(u32),
    Unlimited,
}

impl UsesLimit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Clamp a remaining count to this limit.
    pub fn cap(&self, remaining: u32) -> u32 {
        match self {
            Self::Limited(max) => remaining.min(*max),
            Self::Unlimited => remaining,
        }
    }
}

impl TryFrom<i32> for UsesLimit {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            UNLIMITED_USES => Ok(Self::Unlimited),
            v if v >= 0 => Ok(Self::Limited(v as u32)),
            v => Err(DomainError::validation(format!(
                "Uses must be -1 (unlimited) or non-negative, got {}",
                v
            ))),
        }
    }
}

impl From<UsesLimit> for i32 {
    fn from(limit: UsesLimit) -> i32 {
        match limit {
            UsesLimit::Limited(v) => v as i32,
            UsesLimit::Unlimited => UNLIMITED_USES,
        }
    }
}

impl fmt::Display for UsesLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(v) => write!(f, "{}", v),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_timing_codes() {
        assert_eq!(ResetTiming::from_str("S").unwrap(), ResetTiming::ShortRest);
        assert_eq!(ResetTiming::from_str("l").unwrap(), ResetTiming::LongRest);
        assert_eq!(ResetTiming::from_str("D").unwrap(), ResetTiming::Dawn);
        assert!(ResetTiming::from_str("X").is_err());
        assert_eq!(ResetTiming::Dawn.code(), "D");
    }

    #[test]
    fn test_long_rest_refills_everything() {
        for timing in [ResetTiming::ShortRest, ResetTiming::LongRest, ResetTiming::Dawn] {
            assert!(timing.refills_on(RestType::Long));
        }
        assert!(ResetTiming::ShortRest.refills_on(RestType::Short));
        assert!(!ResetTiming::LongRest.refills_on(RestType::Short));
    }

    #[test]
    fn test_minus_one_is_unlimited() {
        assert_eq!(UsesLimit::try_from(-1).unwrap(), UsesLimit::Unlimited);
        assert_eq!(UsesLimit::try_from(3).unwrap(), UsesLimit::Limited(3));
        assert!(UsesLimit::try_from(-2).is_err());
        assert_eq!(i32::from(UsesLimit::Unlimited), -1);
    }

    #[test]
    fn test_cap() {
        assert_eq!(UsesLimit::Limited(2).cap(5), 2);
        assert_eq!(UsesLimit::Unlimited.cap(5), 5);
    }

    #[test]
    fn test_serde_as_integer() {
        assert_eq!(serde_json::to_string(&UsesLimit::Unlimited).unwrap(), "-1");
        let parsed: UsesLimit = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, UsesLimit::Limited(4));
    }
}
