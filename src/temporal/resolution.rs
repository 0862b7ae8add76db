//! Time-unit resolutions for temporal values

use crate::temporal::error::TemporalError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The unit a temporal value is quantized to
///
/// Year and month are calendar-relative; every other resolution is a fixed
/// duration. The discriminants are the on-disk tag of a datetime column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Resolution {
    Year = 0,
    Month = 1,
    Week = 2,
    Day = 3,
    Hour = 4,
    Minute = 5,
    Second = 6,
    Millisecond = 7,
    Microsecond = 8,
    Nanosecond = 9,
    Picosecond = 10,
    Femtosecond = 11,
    Attosecond = 12,
}

impl Resolution {
    /// All resolutions, coarsest first
    pub fn all() -> &'static [Resolution] {
        &[
            Resolution::Year,
            Resolution::Month,
            Resolution::Week,
            Resolution::Day,
            Resolution::Hour,
            Resolution::Minute,
            Resolution::Second,
            Resolution::Millisecond,
            Resolution::Microsecond,
            Resolution::Nanosecond,
            Resolution::Picosecond,
            Resolution::Femtosecond,
            Resolution::Attosecond,
        ]
    }

    /// Lowercase unit name (`"millisecond"`)
    pub fn name(&self) -> &'static str {
        match self {
            Resolution::Year => "year",
            Resolution::Month => "month",
            Resolution::Week => "week",
            Resolution::Day => "day",
            Resolution::Hour => "hour",
            Resolution::Minute => "minute",
            Resolution::Second => "second",
            Resolution::Millisecond => "millisecond",
            Resolution::Microsecond => "microsecond",
            Resolution::Nanosecond => "nanosecond",
            Resolution::Picosecond => "picosecond",
            Resolution::Femtosecond => "femtosecond",
            Resolution::Attosecond => "attosecond",
        }
    }

    /// datetime64 unit code (`"Y"`, `"M"`, `"W"`, ... `"as"`)
    ///
    /// Codes are case-sensitive: `M` is month, `m` is minute.
    pub fn code(&self) -> &'static str {
        match self {
            Resolution::Year => "Y",
            Resolution::Month => "M",
            Resolution::Week => "W",
            Resolution::Day => "D",
            Resolution::Hour => "h",
            Resolution::Minute => "m",
            Resolution::Second => "s",
            Resolution::Millisecond => "ms",
            Resolution::Microsecond => "us",
            Resolution::Nanosecond => "ns",
            Resolution::Picosecond => "ps",
            Resolution::Femtosecond => "fs",
            Resolution::Attosecond => "as",
        }
    }

    /// True for year and month, whose ticks count calendar units
    pub fn is_calendar(&self) -> bool {
        matches!(self, Resolution::Year | Resolution::Month)
    }

    /// Number of decimal fraction digits of a second, for sub-second units
    pub fn fraction_digits(&self) -> Option<u32> {
        match self {
            Resolution::Millisecond => Some(3),
            Resolution::Microsecond => Some(6),
            Resolution::Nanosecond => Some(9),
            Resolution::Picosecond => Some(12),
            Resolution::Femtosecond => Some(15),
            Resolution::Attosecond => Some(18),
            _ => None,
        }
    }

    /// Seconds per tick for hour, minute and second
    pub(crate) fn whole_seconds(&self) -> Option<i128> {
        match self {
            Resolution::Hour => Some(3600),
            Resolution::Minute => Some(60),
            Resolution::Second => Some(1),
            _ => None,
        }
    }

    /// Finest resolution implied by a count of fraction digits
    pub(crate) fn from_fraction_digits(digits: usize) -> Resolution {
        match digits {
            0 => Resolution::Second,
            1..=3 => Resolution::Millisecond,
            4..=6 => Resolution::Microsecond,
            7..=9 => Resolution::Nanosecond,
            10..=12 => Resolution::Picosecond,
            13..=15 => Resolution::Femtosecond,
            _ => Resolution::Attosecond,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u8> for Resolution {
    type Error = TemporalError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Resolution::all()
            .get(value as usize)
            .copied()
            .ok_or_else(|| TemporalError::UnknownResolution(format!("tag {}", value)))
    }
}

impl FromStr for Resolution {
    type Err = TemporalError;

    /// Accepts unit names (case-insensitive) or datetime64 codes (case-sensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(res) = Resolution::all().iter().find(|r| r.code() == s) {
            return Ok(*res);
        }
        let lower = s.to_ascii_lowercase();
        Resolution::all()
            .iter()
            .find(|r| r.name() == lower || format!("{}s", r.name()) == lower)
            .copied()
            .ok_or_else(|| TemporalError::UnknownResolution(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirteen_resolutions() {
        assert_eq!(Resolution::all().len(), 13);
        for (i, res) in Resolution::all().iter().enumerate() {
            assert_eq!(*res as u8 as usize, i);
            assert_eq!(Resolution::try_from(i as u8).unwrap(), *res);
        }
        assert!(Resolution::try_from(13).is_err());
    }

    #[test]
    fn test_parse_names_and_codes() {
        assert_eq!("M".parse::<Resolution>().unwrap(), Resolution::Month);
        assert_eq!("m".parse::<Resolution>().unwrap(), Resolution::Minute);
        assert_eq!("as".parse::<Resolution>().unwrap(), Resolution::Attosecond);
        assert_eq!("Week".parse::<Resolution>().unwrap(), Resolution::Week);
        assert_eq!("seconds".parse::<Resolution>().unwrap(), Resolution::Second);
        assert!("fortnight".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_fraction_digits() {
        assert_eq!(Resolution::Second.fraction_digits(), None);
        assert_eq!(Resolution::Millisecond.fraction_digits(), Some(3));
        assert_eq!(Resolution::Attosecond.fraction_digits(), Some(18));
        assert_eq!(Resolution::from_fraction_digits(4), Resolution::Microsecond);
        assert_eq!(Resolution::from_fraction_digits(21), Resolution::Attosecond);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Resolution::Femtosecond).unwrap();
        assert_eq!(json, "\"femtosecond\"");
        let restored: Resolution = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, Resolution::Femtosecond);
    }
}
