//! Fixed-width timestamp strings and their time-zone conversion.
//!
//! Item timestamps and `create:`/`modify:` filters share one encoding: 17
//! digits laid out as `YYYYMMDDHHMMSSmmm`. Because every component is
//! zero-padded, comparing two encoded strings lexicographically gives the
//! same answer as comparing the instants they name, which is what lets the
//! matcher test ranges with plain string comparisons.
//!
//! Components that overflow (month `13`, hour `99`) roll forward into the
//! next unit, and a zero month or day is read as `01`, so a partially typed
//! prefix padded with zeros still names a real instant.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, Months, NaiveDate, NaiveDateTime, Offset,
    TimeZone, Timelike, Utc,
};
use std::fmt;
use std::str::FromStr;

/// Width of an encoded timestamp.
pub const TIMESTAMP_WIDTH: usize = 17;

/// Lower bound used for a range without a start.
pub const MIN_TIMESTAMP: &str = "00000000000000000";

/// Upper bound used for a range without an end.
pub const MAX_TIMESTAMP: &str = "99999999999999999";

/// The time zone that stored timestamps are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateNormalizer {
    /// The system's local time zone
    #[default]
    Local,

    /// A fixed offset from UTC
    Fixed(FixedOffset),
}

impl DateNormalizer {
    /// Normalizer for UTC itself; conversion is the identity apart from
    /// overflow and clamping.
    pub fn utc() -> Self {
        DateNormalizer::Fixed(Utc.fix())
    }

    /// Convert a UTC-encoded timestamp into the local encoding.
    ///
    /// Returns `None` if `digits` is not exactly 17 ASCII digits.
    pub fn utc_to_local(&self, digits: &str) -> Option<String> {
        let utc = Utc.from_utc_datetime(&decode(digits)?);
        let local = match self {
            DateNormalizer::Local => utc.with_timezone(&Local).naive_local(),
            DateNormalizer::Fixed(offset) => utc.with_timezone(offset).naive_local(),
        };
        Some(encode(&local))
    }

    /// Convert a locally encoded timestamp back into the UTC encoding.
    ///
    /// Returns `None` for malformed input and for local times that do not
    /// exist (skipped by a daylight-saving transition).
    pub fn local_to_utc(&self, digits: &str) -> Option<String> {
        let naive = decode(digits)?;
        let utc: DateTime<Utc> = match self {
            DateNormalizer::Local => Local
                .from_local_datetime(&naive)
                .earliest()?
                .with_timezone(&Utc),
            DateNormalizer::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()?
                .with_timezone(&Utc),
        };
        Some(encode(&utc.naive_utc()))
    }
}

impl fmt::Display for DateNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateNormalizer::Local => write!(f, "local"),
            DateNormalizer::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl FromStr for DateNormalizer {
    type Err = String;

    /// Accepts `local`, `utc`, or an offset such as `+08:00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(DateNormalizer::Local),
            "utc" | "z" => Ok(DateNormalizer::utc()),
            other => other
                .parse::<FixedOffset>()
                .map(DateNormalizer::Fixed)
                .map_err(|e| format!("invalid time zone {:?}: {}", s, e)),
        }
    }
}

/// Right-pad a digit prefix with `fill` up to the timestamp width.
pub fn pad_digits(digits: &str, fill: char) -> String {
    let mut padded = String::with_capacity(TIMESTAMP_WIDTH);
    padded.push_str(digits);
    while padded.len() < TIMESTAMP_WIDTH {
        padded.push(fill);
    }
    padded
}

/// Decode a 17-digit timestamp, rolling overflowing components forward.
fn decode(digits: &str) -> Option<NaiveDateTime> {
    if digits.len() != TIMESTAMP_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let num = |range: std::ops::Range<usize>| digits[range].parse::<u32>().ok();

    let year = num(0..4)? as i32;
    let month = num(4..6)?.max(1);
    let day = num(6..8)?.max(1);
    let hour = num(8..10)?;
    let minute = num(10..12)?;
    let second = num(12..14)?;
    let millis = num(14..17)?;

    let date = NaiveDate::from_ymd_opt(year, 1, 1)?
        .checked_add_months(Months::new(month - 1))?
        .checked_add_signed(Duration::days(i64::from(day - 1)))?;

    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::hours(i64::from(hour)))?
        .checked_add_signed(Duration::minutes(i64::from(minute)))?
        .checked_add_signed(Duration::seconds(i64::from(second)))?
        .checked_add_signed(Duration::milliseconds(i64::from(millis)))
}

fn encode(dt: &NaiveDateTime) -> String {
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}{:03}",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.nanosecond() / 1_000_000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(hours: i32) -> DateNormalizer {
        DateNormalizer::Fixed(FixedOffset::east_opt(hours * 3600).unwrap())
    }

    #[test]
    fn test_utc_identity() {
        let n = DateNormalizer::utc();
        assert_eq!(
            n.utc_to_local("20200102030405678").as_deref(),
            Some("20200102030405678")
        );
    }

    #[test]
    fn test_positive_offset() {
        let n = offset(8);
        assert_eq!(
            n.utc_to_local("20201231200000000").as_deref(),
            Some("20210101040000000")
        );
    }

    #[test]
    fn test_negative_offset() {
        let n = offset(-5);
        assert_eq!(
            n.utc_to_local("20200101010000000").as_deref(),
            Some("20191231200000000")
        );
    }

    #[test]
    fn test_round_trip() {
        for n in [offset(9), offset(-3), DateNormalizer::utc()] {
            for digits in ["20200615123456789", "19991231235959999", "20240229000000000"] {
                let local = n.utc_to_local(digits).unwrap();
                assert_eq!(n.local_to_utc(&local).as_deref(), Some(digits));
            }
        }
    }

    #[test]
    fn test_zero_month_and_day_clamped() {
        let n = DateNormalizer::utc();
        assert_eq!(
            n.utc_to_local("20200000000000000").as_deref(),
            Some("20200101000000000")
        );
        // Clamping is the only lossy step of a round trip.
        let local = n.utc_to_local("20200000000000000").unwrap();
        assert_eq!(n.local_to_utc(&local).as_deref(), Some("20200101000000000"));
    }

    #[test]
    fn test_overflow_rolls_forward() {
        let n = DateNormalizer::utc();
        // Month 13 is January of the next year.
        assert_eq!(
            n.utc_to_local("20201301000000000").as_deref(),
            Some("20210101000000000")
        );
        // Hour 24 is midnight of the next day.
        assert_eq!(
            n.utc_to_local("20200131240000000").as_deref(),
            Some("20200201000000000")
        );
        // Day 30 of February spills into March.
        assert_eq!(
            n.utc_to_local("20210230000000000").as_deref(),
            Some("20210302000000000")
        );
    }

    #[test]
    fn test_rejects_malformed() {
        let n = DateNormalizer::utc();
        assert_eq!(n.utc_to_local("2020"), None);
        assert_eq!(n.utc_to_local("2020010100000000x"), None);
        assert_eq!(n.utc_to_local("202001010000000000"), None);
    }

    #[test]
    fn test_lexicographic_order_is_chronological() {
        let n = offset(2);
        let a = n.utc_to_local("20200101235959999").unwrap();
        let b = n.utc_to_local("20200102000000000").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_pad_digits() {
        assert_eq!(pad_digits("2020", '0'), "20200000000000000");
        assert_eq!(pad_digits("", '9'), MAX_TIMESTAMP);
        assert_eq!(pad_digits("", '0'), MIN_TIMESTAMP);
        assert_eq!(pad_digits("20200101000000000", '0'), "20200101000000000");
    }

    #[test]
    fn test_parse_normalizer() {
        assert_eq!("local".parse::<DateNormalizer>(), Ok(DateNormalizer::Local));
        assert_eq!("UTC".parse::<DateNormalizer>(), Ok(DateNormalizer::utc()));
        assert_eq!("+08:00".parse::<DateNormalizer>(), Ok(offset(8)));
        assert_eq!("-05:00".parse::<DateNormalizer>(), Ok(offset(-5)));
        assert!("mars".parse::<DateNormalizer>().is_err());
    }
}
