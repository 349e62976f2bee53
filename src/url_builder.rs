use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::fetch_error::FetchError;

/// Time resolution of a history page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Hourly readings for a single day
    Hourly,
    /// Daily summaries for the calendar month containing the start date
    Monthly,
    /// Daily summaries for an explicit start/end range
    Custom,
}

impl Granularity {
    /// Map a single-character code (`h`, `d`, `c`) to a granularity
    pub fn from_code(code: char) -> Result<Self, FetchError> {
        match code.to_ascii_lowercase() {
            'h' => Ok(Granularity::Hourly),
            'd' => Ok(Granularity::Monthly),
            'c' => Ok(Granularity::Custom),
            other => Err(FetchError::Configuration(format!(
                "unknown granularity code '{other}' (expected h, d or c)"
            ))),
        }
    }

    pub fn code(self) -> char {
        match self {
            Granularity::Hourly => 'h',
            Granularity::Monthly => 'd',
            Granularity::Custom => 'c',
        }
    }

    /// Page label used by the history service, e.g. `DailyHistory.html`
    pub fn label(self) -> &'static str {
        // The service's "Daily" page is the hourly view of one day
        match self {
            Granularity::Hourly => "Daily",
            Granularity::Monthly => "Monthly",
            Granularity::Custom => "Custom",
        }
    }
}

impl FromStr for Granularity {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(code), None) => Granularity::from_code(code),
            _ => Err(FetchError::Configuration(format!(
                "granularity must be a single character, got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Build the history page URL for `station` starting at `start`
///
/// Hourly and Monthly pages infer their window from the start date alone, so
/// `end` is ignored for them. Custom pages require `end`, which must not be
/// earlier than `start`.
pub fn build_history_url(
    base_url: &str,
    station: &str,
    granularity: Granularity,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<String, FetchError> {
    let base = format!(
        "{}/history/airport/{}/{}/{}/{}/{}History.html?",
        base_url.trim_end_matches('/'),
        station,
        start.year(),
        start.month(),
        start.day(),
        granularity.label()
    );

    match granularity {
        Granularity::Custom => {
            let end = end.ok_or_else(|| {
                FetchError::Configuration("custom granularity requires an end date".to_string())
            })?;
            if end < start {
                return Err(FetchError::Configuration(format!(
                    "end date {end} is before start date {start}"
                )));
            }
            Ok(format!(
                "{base}dayend={}&monthend={}&yearend={}&HideSpecis=1",
                end.day(),
                end.month(),
                end.year()
            ))
        }
        Granularity::Hourly | Granularity::Monthly => Ok(format!("{base}HideSpecis=1")),
    }
}
