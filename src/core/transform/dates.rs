//! Medium-style date and time rendering
//!
//! Raw XForm values are ISO 8601 (`2019-01-01`, `13:02:03.000+01:00`,
//! `2019-01-01T13:02:03.000+01:00`). They are exported as `Jan 1, 2019`,
//! `1:02:03 PM` and `Jan 1, 2019 1:02:03 PM`. Anything that does not parse is
//! exported as an empty string.

use crate::domain::submission::parse_submission_date;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

const DATE_FORMAT: &str = "%b %-d, %Y";
const TIME_FORMAT: &str = "%-I:%M:%S %p";
const DATE_TIME_FORMAT: &str = "%b %-d, %Y %-I:%M:%S %p";

pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    // dateTime values are sometimes stored in date fields
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Renders the wall-clock part of a time, ignoring any offset
pub fn format_time(raw: &str) -> String {
    let raw = raw.trim();
    let clock = raw
        .find(|c: char| c == '+' || c == 'Z' || (c == '-' && raw.len() > 8))
        .map_or(raw, |end| &raw[..end]);
    NaiveTime::parse_from_str(clock, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(clock, "%H:%M"))
        .map(|time| time.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Renders a dateTime in its own offset
pub fn format_date_time(raw: &str) -> String {
    parse_submission_date(raw)
        .map(|value| format_timestamp(&value))
        .unwrap_or_default()
}

pub fn format_timestamp(value: &DateTime<FixedOffset>) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("2019-01-01", "Jan 1, 2019")]
    #[test_case("2020-12-25T10:00:00.000Z", "Dec 25, 2020")]
    #[test_case("not a date", "")]
    #[test_case("", "")]
    fn test_format_date(raw: &str, expected: &str) {
        assert_eq!(format_date(raw), expected);
    }

    #[test_case("13:02:03.000+01:00", "1:02:03 PM")]
    #[test_case("00:15:00.000-05:00", "12:15:00 AM")]
    #[test_case("09:30:00Z", "9:30:00 AM")]
    #[test_case("09:30", "9:30:00 AM")]
    #[test_case("half past nine", "")]
    fn test_format_time(raw: &str, expected: &str) {
        assert_eq!(format_time(raw), expected);
    }

    #[test_case("2019-01-01T13:02:03.000+01:00", "Jan 1, 2019 1:02:03 PM")]
    #[test_case("2019-07-04T08:00:00.000Z", "Jul 4, 2019 8:00:00 AM")]
    #[test_case("garbage", "")]
    fn test_format_date_time(raw: &str, expected: &str) {
        assert_eq!(format_date_time(raw), expected);
    }
}
