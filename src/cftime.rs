//! CF time decoding (`<unit> since <reference>` with a calendar attribute).
//!
//! UKCP18 uses the 360-day calendar, whose dates (30 February, ...) cannot
//! be represented by chrono, so decoded instants are kept as plain
//! calendar fields and rendered as ISO 8601 strings.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::CfTimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// standard, gregorian and proleptic_gregorian (decoded proleptically)
    Gregorian,
    NoLeap,
    AllLeap,
    Day360,
}

impl Calendar {
    pub fn parse(s: &str) -> Result<Self, CfTimeError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => Ok(Self::Gregorian),
            "noleap" | "no_leap" | "365_day" => Ok(Self::NoLeap),
            "all_leap" | "366_day" => Ok(Self::AllLeap),
            "360_day" => Ok(Self::Day360),
            _ => Err(CfTimeError::Calendar(s.to_string())),
        }
    }

    fn cumulative_days(self) -> Option<[i64; 13]> {
        match self {
            Self::NoLeap => Some([0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365]),
            Self::AllLeap => Some([0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366]),
            Self::Day360 => Some([0, 30, 60, 90, 120, 150, 180, 210, 240, 270, 300, 330, 360]),
            Self::Gregorian => None,
        }
    }
}

/// Calendar fields of a decoded instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CfDateTime {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl fmt::Display for CfDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeUnits {
    seconds_per_unit: i64,
    reference: CfDateTime,
    calendar: Calendar,
}

impl TimeUnits {
    /// Parse `units` (e.g. `hours since 1970-01-01 00:00:00`) with an optional
    /// `calendar` attribute, which defaults to `standard`.
    pub fn parse(units: &str, calendar: Option<&str>) -> Result<Self, CfTimeError> {
        let bad = || CfTimeError::Units(units.to_string());
        let (unit, reference) = units.split_once(" since ").ok_or_else(bad)?;

        let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "second" | "seconds" | "sec" | "secs" | "s" => 1,
            "minute" | "minutes" | "min" | "mins" => 60,
            "hour" | "hours" | "hr" | "hrs" | "h" => 3_600,
            "day" | "days" | "d" => 86_400,
            _ => return Err(bad()),
        };
        let calendar = Calendar::parse(calendar.unwrap_or("standard"))?;
        let reference = parse_reference(reference.trim()).ok_or_else(bad)?;

        Ok(Self {
            seconds_per_unit,
            reference,
            calendar,
        })
    }

    pub fn decode(&self, value: f64) -> Result<CfDateTime, CfTimeError> {
        let offset = value * self.seconds_per_unit as f64;
        if !offset.is_finite() || offset.abs() > 1e15 {
            return Err(CfTimeError::Range(value));
        }
        let offset = offset.round() as i64;

        match self.calendar.cumulative_days() {
            Some(table) => Ok(self.decode_fixed(offset, &table)),
            None => self.decode_gregorian(offset).ok_or(CfTimeError::Range(value)),
        }
    }

    fn decode_fixed(&self, offset: i64, table: &[i64; 13]) -> CfDateTime {
        let r = &self.reference;
        let year_len = table[12];
        let start_day =
            r.year * year_len + table[(r.month - 1) as usize] + i64::from(r.day) - 1;
        let start = start_day * 86_400
            + i64::from(r.hour) * 3_600
            + i64::from(r.minute) * 60
            + i64::from(r.second);

        let total = start + offset;
        let day = total.div_euclid(86_400);
        let secs = total.rem_euclid(86_400);
        let year = day.div_euclid(year_len);
        let doy = day.rem_euclid(year_len);
        let month = (1..=12).find(|&m| table[m] > doy).unwrap_or(12);

        CfDateTime {
            year,
            month: month as u32,
            day: (doy - table[month - 1] + 1) as u32,
            hour: (secs / 3_600) as u32,
            minute: (secs % 3_600 / 60) as u32,
            second: (secs % 60) as u32,
        }
    }

    fn decode_gregorian(&self, offset: i64) -> Option<CfDateTime> {
        let r = &self.reference;
        let date = NaiveDate::from_ymd_opt(i32::try_from(r.year).ok()?, r.month, r.day)?;
        let start: NaiveDateTime = date.and_hms_opt(r.hour, r.minute, r.second)?;
        let t = start.checked_add_signed(Duration::seconds(offset))?;
        Some(CfDateTime {
            year: i64::from(t.year()),
            month: t.month(),
            day: t.day(),
            hour: t.hour(),
            minute: t.minute(),
            second: t.second(),
        })
    }
}

/// `YYYY-MM-DD`, optionally followed by `HH:MM[:SS[.fff]]` (space or `T`
/// separated) and a `Z`/`UTC` suffix.
fn parse_reference(s: &str) -> Option<CfDateTime> {
    let s = s.trim_end_matches(" UTC").trim_end_matches('Z');
    let (date, time) = match s.split_once(|c: char| c == ' ' || c == 'T') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s, None),
    };

    let mut ymd = date.splitn(3, '-');
    let year: i64 = ymd.next()?.parse().ok()?;
    let month: u32 = ymd.next()?.parse().ok()?;
    let day: u32 = ymd.next()?.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    let (mut hour, mut minute, mut second) = (0, 0, 0);
    if let Some(time) = time.filter(|t| !t.is_empty()) {
        let mut hms = time.split(':');
        hour = hms.next()?.parse().ok()?;
        minute = hms.next().map_or(Some(0), |m| m.parse().ok())?;
        second = hms
            .next()
            .map_or(Some(0.0), |s| s.parse::<f64>().ok())?
            .floor() as u32;
    }

    Some(CfDateTime {
        year,
        month,
        day,
        hour,
        minute,
        second,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(units: &TimeUnits, v: f64) -> String {
        units.decode(v).unwrap().to_string()
    }

    #[test]
    fn decodes_360_day_hours() {
        let units =
            TimeUnits::parse("hours since 1970-01-01 00:00:00", Some("360_day")).unwrap();
        assert_eq!(iso(&units, 0.0), "1970-01-01T00:00:00Z");
        assert_eq!(iso(&units, -605_508.0), "1899-12-01T12:00:00Z");
        // 2100-12-30 is a valid 360-day date
        let end = ((2100 - 1970) * 360 + 11 * 30 + 29) as f64 * 24.0;
        assert_eq!(iso(&units, end), "2100-12-30T00:00:00Z");
    }

    #[test]
    fn represents_dates_chrono_cannot() {
        let units = TimeUnits::parse("days since 2000-02-29", Some("360_day")).unwrap();
        assert_eq!(iso(&units, 1.0), "2000-02-30T00:00:00Z");
    }

    #[test]
    fn decodes_gregorian_days() {
        let units = TimeUnits::parse("days since 1970-01-01", None).unwrap();
        assert_eq!(iso(&units, 365.0), "1971-01-01T00:00:00Z");
        assert_eq!(iso(&units, -0.5), "1969-12-31T12:00:00Z");

        let units = TimeUnits::parse("seconds since 2020-02-28T00:00:00Z", Some("gregorian"))
            .unwrap();
        assert_eq!(iso(&units, 86_400.0), "2020-02-29T00:00:00Z");
    }

    #[test]
    fn decodes_noleap() {
        let units = TimeUnits::parse("days since 2020-02-28", Some("noleap")).unwrap();
        assert_eq!(iso(&units, 1.0), "2020-03-01T00:00:00Z");
        assert_eq!(iso(&units, -59.0), "2019-12-31T00:00:00Z");
    }

    #[test]
    fn rejects_bad_units_and_calendars() {
        assert!(matches!(
            TimeUnits::parse("hours after 1970-01-01", None),
            Err(CfTimeError::Units(_))
        ));
        assert!(matches!(
            TimeUnits::parse("fortnights since 1970-01-01", None),
            Err(CfTimeError::Units(_))
        ));
        assert!(matches!(
            TimeUnits::parse("days since 1970-01-01", Some("julian")),
            Err(CfTimeError::Calendar(_))
        ));
    }

    #[test]
    fn ordering_follows_time() {
        let units = TimeUnits::parse("hours since 1970-01-01", Some("360_day")).unwrap();
        assert!(units.decode(-10.0).unwrap() < units.decode(10.0).unwrap());
    }
}
