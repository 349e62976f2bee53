//! Shared date helpers for request building and range planning

use chrono::{Datelike, NaiveDate};

use crate::fetch_error::FetchError;

/// Parse a `M/D/YYYY` date as accepted on the command line
///
/// Month and day may be zero-padded or not. Surrounding whitespace is ignored.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use weather_history::utils::parse_date;
///
/// assert_eq!(parse_date("1/1/2014").unwrap(), NaiveDate::from_ymd_opt(2014, 1, 1).unwrap());
/// assert_eq!(parse_date(" 03/09/2018 ").unwrap(), NaiveDate::from_ymd_opt(2018, 3, 9).unwrap());
/// assert!(parse_date("2014-01-01").is_err());
/// ```
pub fn parse_date(value: &str) -> Result<NaiveDate, FetchError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%m/%d/%Y").map_err(|e| {
        FetchError::Configuration(format!(
            "invalid date '{trimmed}' (expected M/D/YYYY): {e}"
        ))
    })
}

/// First day of the month following `date`
pub fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

/// Number of calendar months touched by `[start, end]`, inclusive of both ends
pub fn months_touched(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    let span = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    span as u32 + 1
}
