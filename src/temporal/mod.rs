//! Resolution-tagged datetime values
//!
//! A [`TemporalValue`] is a signed 64-bit tick count since
//! 1970-01-01T00:00:00 together with the [`Resolution`] that gives the ticks
//! meaning. The same tick count denotes different instants at different
//! resolutions, so the two are never separated.
//!
//! - **resolution**: the thirteen units, year down to attosecond
//! - **calendar**: exact Gregorian arithmetic behind every conversion
//! - **parser**: calendar text into fields
//!
//! Quantization always floors. Year and month ticks count calendar units;
//! week ticks count ISO weeks, with week 0 starting Monday 1969-12-29.
//!
//! # Example
//!
//! ```rust
//! use tilestore::temporal::{Resolution, TemporalValue};
//!
//! let ms = TemporalValue::parse("2020-07-26 13:45:55.123", Resolution::Millisecond).unwrap();
//! assert_eq!(ms.to_ticks(), 1_595_771_155_123);
//!
//! let week = TemporalValue::parse("2020-07-26 13:45:55", Resolution::Week).unwrap();
//! assert_eq!(week.to_string(), "2020-07-20");
//! ```

pub mod calendar;
pub mod error;
pub mod parser;
pub mod resolution;

pub use calendar::Instant;
pub use error::{TemporalError, TemporalResult};
pub use parser::{parse_calendar, CalendarParts};
pub use resolution::Resolution;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// How to treat text that is more precise than the target resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Floor to the resolution; out-of-range instants wrap to 64 bits
    #[default]
    Truncate,
    /// Fail instead of discarding a non-zero component or wrapping
    Reject,
}

/// An instant quantized to one of thirteen resolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemporalValue {
    resolution: Resolution,
    ticks: i64,
}

impl TemporalValue {
    /// Wrap a raw tick count
    pub fn from_ticks(ticks: i64, resolution: Resolution) -> Self {
        Self { resolution, ticks }
    }

    /// The raw tick count, as stored in an 8-byte cell
    pub fn to_ticks(&self) -> i64 {
        self.ticks
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Parse calendar text, truncating to `resolution`
    pub fn parse(text: &str, resolution: Resolution) -> TemporalResult<Self> {
        Self::parse_with(text, resolution, TruncationPolicy::Truncate)
    }

    /// Parse calendar text with an explicit truncation policy
    pub fn parse_with(
        text: &str,
        resolution: Resolution,
        policy: TruncationPolicy,
    ) -> TemporalResult<Self> {
        let parts = parse_calendar(text)?;
        Self::from_parts(text, &parts, resolution, policy)
    }

    /// Quantize parsed calendar fields
    pub fn from_parts(
        text: &str,
        parts: &CalendarParts,
        resolution: Resolution,
        policy: TruncationPolicy,
    ) -> TemporalResult<Self> {
        let instant = parts.instant();
        match policy {
            TruncationPolicy::Truncate => Ok(Self {
                resolution,
                ticks: instant.wrapping_ticks(resolution),
            }),
            TruncationPolicy::Reject => {
                let ticks = instant
                    .checked_ticks(resolution)
                    .ok_or_else(|| TemporalError::OutOfRange {
                        text: text.to_string(),
                        resolution,
                    })?;
                let (_, excess) = parts.attoseconds();
                if excess || Instant::from_ticks(resolution, ticks) != instant {
                    return Err(TemporalError::ResolutionMismatch {
                        text: text.to_string(),
                        resolution,
                    });
                }
                Ok(Self { resolution, ticks })
            }
        }
    }

    /// Quantize a chrono datetime (nanosecond precision at most)
    pub fn from_naive_datetime(datetime: &NaiveDateTime, resolution: Resolution) -> Self {
        let seconds = datetime.and_utc().timestamp() as i128;
        let attos = datetime.nanosecond() as u64 * 1_000_000_000;
        // chrono encodes leap seconds as nanosecond >= 1e9
        let (seconds, attos) = if attos >= calendar::ATTOS_PER_SECOND {
            (seconds + 1, attos - calendar::ATTOS_PER_SECOND)
        } else {
            (seconds, attos)
        };
        Self::from_instant(Instant::new(seconds, attos), resolution)
    }

    /// The current UTC time at a resolution
    pub fn now(resolution: Resolution) -> Self {
        Self::from_naive_datetime(&Utc::now().naive_utc(), resolution)
    }

    fn from_instant(instant: Instant, resolution: Resolution) -> Self {
        Self {
            resolution,
            ticks: instant.wrapping_ticks(resolution),
        }
    }

    /// The exact instant these ticks denote
    pub fn instant(&self) -> Instant {
        Instant::from_ticks(self.resolution, self.ticks)
    }

    /// Re-quantize to another resolution, flooring
    ///
    /// `cast(Resolution::Week)` on a timestamp yields the Monday of its week.
    pub fn cast(&self, resolution: Resolution) -> Self {
        Self::from_instant(self.instant(), resolution)
    }

    /// Shift by a number of ticks of this value's resolution
    pub fn checked_add(&self, delta: i64) -> Option<Self> {
        Some(Self {
            resolution: self.resolution,
            ticks: self.ticks.checked_add(delta)?,
        })
    }

    /// Convert to a chrono datetime, truncating below nanoseconds
    ///
    /// Returns `None` outside chrono's supported range.
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        let civil = self.instant().to_civil();
        let date = NaiveDate::from_ymd_opt(i32::try_from(civil.year).ok()?, civil.month, civil.day)?;
        let time = NaiveTime::from_hms_nano_opt(
            civil.hour,
            civil.minute,
            civil.second,
            (civil.attos / 1_000_000_000) as u32,
        )?;
        Some(date.and_time(time))
    }
}

impl std::fmt::Display for TemporalValue {
    /// ISO-like rendering cut off at the value's resolution
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let civil = self.instant().to_civil();
        if civil.year < 0 {
            write!(f, "-{:04}", -civil.year)?;
        } else {
            write!(f, "{:04}", civil.year)?;
        }
        if self.resolution == Resolution::Year {
            return Ok(());
        }
        write!(f, "-{:02}", civil.month)?;
        if self.resolution == Resolution::Month {
            return Ok(());
        }
        write!(f, "-{:02}", civil.day)?;
        if matches!(self.resolution, Resolution::Week | Resolution::Day) {
            return Ok(());
        }
        write!(f, "T{:02}", civil.hour)?;
        if self.resolution == Resolution::Hour {
            return Ok(());
        }
        write!(f, ":{:02}", civil.minute)?;
        if self.resolution == Resolution::Minute {
            return Ok(());
        }
        write!(f, ":{:02}", civil.second)?;
        if let Some(digits) = self.resolution.fraction_digits() {
            let fraction = civil.attos / 10u64.pow(18 - digits);
            write!(f, ".{:0width$}", fraction, width = digits as usize)?;
        }
        Ok(())
    }
}
