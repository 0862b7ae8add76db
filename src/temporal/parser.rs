//! Calendar string parser
//!
//! Splits datetime text into calendar fields and records how precise the
//! text was. Quantizing to a resolution is left to [`TemporalValue`].
//!
//! # Supported Syntax
//!
//! ```text
//! YYYY[-MM[-DD[( |T)hh[:mm[:ss[.fffffffff...]]]]]][Z]
//! ```
//!
//! The year may carry a leading `-` and four to six digits. Any number of
//! fraction digits is accepted; digits past the eighteenth (attoseconds)
//! are below every supported resolution.
//!
//! [`TemporalValue`]: crate::temporal::TemporalValue

use nom::{
    branch::alt,
    bytes::complete::take_while_m_n,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::{pair, preceded},
    IResult,
};

use crate::temporal::calendar::Instant;
use crate::temporal::error::{TemporalError, TemporalResult};
use crate::temporal::Resolution;
use chrono::NaiveDate;

/// Calendar fields parsed from text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Fraction-of-second digits exactly as written
    pub subsecond_digits: String,
    /// Finest unit the text spelled out
    pub precision: Resolution,
}

impl CalendarParts {
    fn new(year: i32) -> Self {
        Self {
            year,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            subsecond_digits: String::new(),
            precision: Resolution::Year,
        }
    }

    /// Fraction of the second in attoseconds, and whether any digit beyond
    /// attosecond precision was non-zero
    pub fn attoseconds(&self) -> (u64, bool) {
        let (kept, dropped) = if self.subsecond_digits.len() > 18 {
            self.subsecond_digits.split_at(18)
        } else {
            (self.subsecond_digits.as_str(), "")
        };
        let attos = kept
            .bytes()
            .chain(std::iter::repeat(b'0'))
            .take(18)
            .fold(0u64, |acc, digit| acc * 10 + (digit - b'0') as u64);
        (attos, dropped.bytes().any(|d| d != b'0'))
    }

    /// The exact instant these fields describe
    pub fn instant(&self) -> Instant {
        let (attos, _) = self.attoseconds();
        Instant::from_civil(
            self.year as i128,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            attos,
        )
    }

    fn validate(&self, text: &str) -> TemporalResult<()> {
        if NaiveDate::from_ymd_opt(self.year, self.month, self.day).is_none() {
            return Err(TemporalError::invalid(
                text,
                format!(
                    "no such date {:04}-{:02}-{:02}",
                    self.year, self.month, self.day
                ),
            ));
        }
        if self.hour > 23 || self.minute > 59 || self.second > 59 {
            return Err(TemporalError::invalid(
                text,
                format!(
                    "no such time {:02}:{:02}:{:02}",
                    self.hour, self.minute, self.second
                ),
            ));
        }
        Ok(())
    }
}

/// Parse calendar text into its fields
pub fn parse_calendar(text: &str) -> TemporalResult<CalendarParts> {
    let trimmed = text.trim();
    let body = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    if body.is_empty() {
        return Err(TemporalError::invalid(text, "empty input"));
    }

    let (_, parts) = all_consuming(calendar)(body).map_err(|e| {
        let reason = match e {
            nom::Err::Error(err) | nom::Err::Failure(err) => {
                format!("unexpected input at '{}'", err.input)
            }
            nom::Err::Incomplete(_) => "incomplete input".to_string(),
        };
        TemporalError::invalid(text, reason)
    })?;

    parts.validate(text)?;
    Ok(parts)
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn year(input: &str) -> IResult<&str, i32> {
    map_res(
        recognize(pair(opt(char('-')), take_while_m_n(4, 6, is_digit))),
        |s: &str| s.parse::<i32>(),
    )(input)
}

fn two_digits(input: &str) -> IResult<&str, u32> {
    map_res(take_while_m_n(2, 2, is_digit), |s: &str| s.parse::<u32>())(input)
}

fn date_time_separator(input: &str) -> IResult<&str, char> {
    alt((char('T'), char(' ')))(input)
}

fn calendar(input: &str) -> IResult<&str, CalendarParts> {
    let (input, year) = year(input)?;
    let mut parts = CalendarParts::new(year);

    let (input, month) = opt(preceded(char('-'), two_digits))(input)?;
    let Some(month) = month else {
        return Ok((input, parts));
    };
    parts.month = month;
    parts.precision = Resolution::Month;

    let (input, day) = opt(preceded(char('-'), two_digits))(input)?;
    let Some(day) = day else {
        return Ok((input, parts));
    };
    parts.day = day;
    parts.precision = Resolution::Day;

    let (input, hour) = opt(preceded(date_time_separator, two_digits))(input)?;
    let Some(hour) = hour else {
        return Ok((input, parts));
    };
    parts.hour = hour;
    parts.precision = Resolution::Hour;

    let (input, minute) = opt(preceded(char(':'), two_digits))(input)?;
    let Some(minute) = minute else {
        return Ok((input, parts));
    };
    parts.minute = minute;
    parts.precision = Resolution::Minute;

    let (input, second) = opt(preceded(char(':'), two_digits))(input)?;
    let Some(second) = second else {
        return Ok((input, parts));
    };
    parts.second = second;
    parts.precision = Resolution::Second;

    let (input, fraction) = opt(preceded(char('.'), digit1))(input)?;
    if let Some(fraction) = fraction {
        parts.subsecond_digits = fraction.to_string();
        parts.precision = Resolution::from_fraction_digits(fraction.len());
    }

    Ok((input, parts))
}
