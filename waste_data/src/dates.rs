//! Date parsing and month arithmetic

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};

/// Days between 0001-01-01 (CE) and the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Parse a date written in one of the layouts found in cleaned exports.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM-DD HH:MM:SS`, RFC 3339,
/// `YYYY-MM` and a bare `YYYY` (mapped to January 1).
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(text, format) {
            return Some(stamp.date());
        }
    }

    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.date_naive());
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d") {
        return Some(date);
    }

    text.parse::<i32>().ok().and_then(year_start)
}

/// January 1 of `year`
pub fn year_start(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

/// Convert a polars `Date` physical value (days since the Unix epoch)
pub fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Days since the Unix epoch, the physical value of a polars `Date`
pub fn to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Convert a Unix timestamp expressed in `units_per_second` ticks
pub fn from_epoch_ticks(ticks: i64, units_per_second: i64) -> Option<NaiveDate> {
    let secs = ticks.div_euclid(units_per_second);
    let sub = ticks.rem_euclid(units_per_second);
    let nanos = sub.checked_mul(1_000_000_000 / units_per_second)?;
    DateTime::from_timestamp(secs, nanos as u32).map(|stamp| stamp.date_naive())
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Month start `months` after the month containing `date`
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    month_start(date).checked_add_months(Months::new(months))
}

/// Number of whole months from the month of `from` to the month of `to`
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + (to.month() as i64 - from.month() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_common_layouts() {
        assert_eq!(parse_date("2019-03-15"), Some(ymd(2019, 3, 15)));
        assert_eq!(parse_date("2019/03/15"), Some(ymd(2019, 3, 15)));
        assert_eq!(parse_date("2019-03-15 10:20:30"), Some(ymd(2019, 3, 15)));
        assert_eq!(parse_date("2019-03-15T10:20:30Z"), Some(ymd(2019, 3, 15)));
        assert_eq!(parse_date("2019-03"), Some(ymd(2019, 3, 1)));
        assert_eq!(parse_date("2021"), Some(ymd(2021, 1, 1)));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("  "), None);
    }

    #[test]
    fn test_epoch_conversions() {
        assert_eq!(from_epoch_days(0), Some(ymd(1970, 1, 1)));
        assert_eq!(from_epoch_days(365), Some(ymd(1971, 1, 1)));
        assert_eq!(from_epoch_ticks(86_400_000, 1_000), Some(ymd(1970, 1, 2)));
        assert_eq!(from_epoch_ticks(-1, 1_000_000), Some(ymd(1969, 12, 31)));
    }

    #[test]
    fn test_month_arithmetic() {
        assert_eq!(month_start(ymd(2020, 2, 29)), ymd(2020, 2, 1));
        assert_eq!(add_months(ymd(2020, 11, 17), 3), Some(ymd(2021, 2, 1)));
        assert_eq!(months_between(ymd(2019, 1, 1), ymd(2021, 3, 1)), 26);
        assert_eq!(months_between(ymd(2021, 3, 1), ymd(2019, 1, 1)), -26);
    }
}
