//! Proleptic Gregorian calendar arithmetic
//!
//! Temporal values are converted through an [`Instant`]: whole seconds since
//! 1970-01-01T00:00:00 plus attoseconds. Wide integers keep every conversion
//! exact; narrowing to `i64` happens only at the tick boundary.

use crate::temporal::Resolution;

/// Attoseconds in one second
pub const ATTOS_PER_SECOND: u64 = 1_000_000_000_000_000_000;

const SECONDS_PER_DAY: i128 = 86_400;

/// Days from 1970-01-01 to the Monday that starts week 0 is -3
const WEEK_EPOCH_OFFSET: i128 = 3;

/// An exact point on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant {
    /// Whole seconds since the epoch (floored)
    pub seconds: i128,
    /// Fraction of the second, in `[0, 10^18)`
    pub attos: u64,
}

/// Broken-down calendar fields of an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilDateTime {
    pub year: i128,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub attos: u64,
}

impl Instant {
    pub fn new(seconds: i128, attos: u64) -> Self {
        debug_assert!(attos < ATTOS_PER_SECOND);
        Self { seconds, attos }
    }

    /// Instant for a calendar date and time of day
    pub fn from_civil(year: i128, month: u32, day: u32, hour: u32, minute: u32, second: u32, attos: u64) -> Self {
        let days = days_from_civil(year, month, day);
        let seconds = days * SECONDS_PER_DAY
            + hour as i128 * 3600
            + minute as i128 * 60
            + second as i128;
        Self::new(seconds, attos)
    }

    /// The instant a tick count denotes at a resolution
    pub fn from_ticks(resolution: Resolution, ticks: i64) -> Self {
        let ticks = ticks as i128;
        match resolution {
            Resolution::Year => Self::from_civil(1970 + ticks, 1, 1, 0, 0, 0, 0),
            Resolution::Month => {
                let year = 1970 + ticks.div_euclid(12);
                let month = ticks.rem_euclid(12) as u32 + 1;
                Self::from_civil(year, month, 1, 0, 0, 0, 0)
            }
            Resolution::Week => Self::new((ticks * 7 - WEEK_EPOCH_OFFSET) * SECONDS_PER_DAY, 0),
            Resolution::Day => Self::new(ticks * SECONDS_PER_DAY, 0),
            Resolution::Hour | Resolution::Minute | Resolution::Second => {
                let unit = resolution.whole_seconds().unwrap_or(1);
                Self::new(ticks * unit, 0)
            }
            _ => {
                let digits = resolution.fraction_digits().unwrap_or(0);
                let per_second = 10i128.pow(digits);
                let attos_per_tick = 10u64.pow(18 - digits);
                let seconds = ticks.div_euclid(per_second);
                let fraction = ticks.rem_euclid(per_second) as u64;
                Self::new(seconds, fraction * attos_per_tick)
            }
        }
    }

    /// Days since the epoch (floored)
    pub fn days(&self) -> i128 {
        self.seconds.div_euclid(SECONDS_PER_DAY)
    }

    /// Tick count at a resolution, floored, with no width limit
    ///
    /// Returns `None` only if the count does not fit in 128 bits.
    pub fn wide_ticks(&self, resolution: Resolution) -> Option<i128> {
        let days = self.days();
        match resolution {
            Resolution::Year => {
                let (year, _, _) = civil_from_days(days);
                Some(year - 1970)
            }
            Resolution::Month => {
                let (year, month, _) = civil_from_days(days);
                Some((year - 1970) * 12 + (month as i128 - 1))
            }
            Resolution::Week => Some((days + WEEK_EPOCH_OFFSET).div_euclid(7)),
            Resolution::Day => Some(days),
            Resolution::Hour | Resolution::Minute | Resolution::Second => {
                let unit = resolution.whole_seconds().unwrap_or(1);
                Some(self.seconds.div_euclid(unit))
            }
            _ => {
                let digits = resolution.fraction_digits().unwrap_or(0);
                let fraction = (self.attos / 10u64.pow(18 - digits)) as i128;
                self.seconds
                    .checked_mul(10i128.pow(digits))?
                    .checked_add(fraction)
            }
        }
    }

    /// Tick count at a resolution, wrapped to 64 bits
    pub fn wrapping_ticks(&self, resolution: Resolution) -> i64 {
        match self.wide_ticks(resolution) {
            Some(ticks) => ticks as i64,
            None => {
                // Only sub-second units can exceed 128 bits; wrap the product
                let digits = resolution.fraction_digits().unwrap_or(0);
                let fraction = (self.attos / 10u64.pow(18 - digits)) as i128;
                self.seconds
                    .wrapping_mul(10i128.pow(digits))
                    .wrapping_add(fraction) as i64
            }
        }
    }

    /// Tick count at a resolution if it fits in 64 bits
    pub fn checked_ticks(&self, resolution: Resolution) -> Option<i64> {
        self.wide_ticks(resolution)
            .and_then(|ticks| i64::try_from(ticks).ok())
    }

    /// Calendar fields of this instant
    pub fn to_civil(&self) -> CivilDateTime {
        let (year, month, day) = civil_from_days(self.days());
        let second_of_day = self.seconds.rem_euclid(SECONDS_PER_DAY) as u32;
        CivilDateTime {
            year,
            month,
            day,
            hour: second_of_day / 3600,
            minute: second_of_day % 3600 / 60,
            second: second_of_day % 60,
            attos: self.attos,
        }
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date
pub fn days_from_civil(year: i128, month: u32, day: u32) -> i128 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let month = month as i128;
    let shifted_month = if month > 2 { month - 3 } else { month + 9 };
    let day_of_year = (153 * shifted_month + 2) / 5 + day as i128 - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Proleptic Gregorian `(year, month, day)` for days since 1970-01-01
pub fn civil_from_days(days: i128) -> (i128, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let day_of_era = z - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let shifted_month = (5 * day_of_year + 2) / 153;
    let day = (day_of_year - (153 * shifted_month + 2) / 5 + 1) as u32;
    let month = (if shifted_month < 10 {
        shifted_month + 3
    } else {
        shifted_month - 9
    }) as u32;
    let year = year_of_era + era * 400;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(civil_from_days(0), (1970, 1, 1));
    }

    #[test]
    fn test_known_dates() {
        assert_eq!(days_from_civil(2020, 1, 1), 18_262);
        assert_eq!(days_from_civil(2020, 7, 26), 18_469);
        assert_eq!(days_from_civil(1969, 12, 29), -3);
        assert_eq!(civil_from_days(18_469), (2020, 7, 26));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
        assert_eq!(civil_from_days(days_from_civil(2000, 2, 29)), (2000, 2, 29));
    }

    #[test]
    fn test_civil_round_trip_across_centuries() {
        for days in (-800_000i128..800_000).step_by(997) {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m, d), days);
        }
    }

    #[test]
    fn test_week_ticks_start_on_monday() {
        // 1969-12-29 is a Monday and starts week 0
        let monday = Instant::from_civil(1969, 12, 29, 0, 0, 0, 0);
        assert_eq!(monday.wide_ticks(Resolution::Week), Some(0));
        let sunday = Instant::from_civil(1970, 1, 4, 23, 59, 59, 0);
        assert_eq!(sunday.wide_ticks(Resolution::Week), Some(0));
        let next_monday = Instant::from_civil(1970, 1, 5, 0, 0, 0, 0);
        assert_eq!(next_monday.wide_ticks(Resolution::Week), Some(1));
        let before = Instant::from_civil(1969, 12, 28, 12, 0, 0, 0);
        assert_eq!(before.wide_ticks(Resolution::Week), Some(-1));
    }

    #[test]
    fn test_sub_second_floor_before_epoch() {
        // 1969-12-31T23:59:59.5
        let instant = Instant::new(-1, ATTOS_PER_SECOND / 2);
        assert_eq!(instant.wide_ticks(Resolution::Second), Some(-1));
        assert_eq!(instant.wide_ticks(Resolution::Millisecond), Some(-500));
        assert_eq!(Instant::from_ticks(Resolution::Millisecond, -500), instant);
    }

    #[test]
    fn test_checked_ticks_overflow() {
        let instant = Instant::from_civil(2020, 7, 26, 13, 45, 55, 0);
        assert!(instant.checked_ticks(Resolution::Nanosecond).is_some());
        assert!(instant.checked_ticks(Resolution::Picosecond).is_none());
        let wide = instant.wide_ticks(Resolution::Picosecond).unwrap();
        assert_eq!(instant.wrapping_ticks(Resolution::Picosecond), wide as i64);
    }
}
