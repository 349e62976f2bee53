use chrono::NaiveDate;
use indicatif::ProgressBar;
use tracing::{debug, error, info, info_span, instrument, Instrument};

use crate::fetch_error::FetchError;
use crate::history_client::{FetchSummary, HistoryClient};
use crate::station_resolver::Station;
use crate::url_builder::Granularity;
use crate::utils;

/// Ranges longer than this are fetched month by month instead of as one custom page
pub const MAX_CUSTOM_SPAN_DAYS: i64 = 365;

/// A single page request produced by range planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchUnit {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    /// Written to a date-named file instead of the shared output file
    pub bulk: bool,
}

impl FetchUnit {
    fn bulk(granularity: Granularity, start: NaiveDate) -> Self {
        Self {
            granularity,
            start,
            end: None,
            bulk: true,
        }
    }

    fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            granularity: Granularity::Custom,
            start,
            end: Some(end),
            bulk: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RangeSummary {
    pub station: Station,
    pub fetches: Vec<FetchSummary>,
}

impl RangeSummary {
    pub fn total_rows(&self) -> usize {
        self.fetches.iter().map(|f| f.outcome.rows_written).sum()
    }
}

/// Decompose `[start, end]` into page requests
///
/// - Hourly: one bulk unit per calendar day, at most `hourly_limit` of them.
/// - Monthly: one custom unit when the span fits in a year, otherwise one bulk
///   unit per calendar month touched.
/// - Custom: one custom unit.
pub fn plan_range(
    granularity: Granularity,
    start: NaiveDate,
    end: NaiveDate,
    hourly_limit: usize,
) -> Result<Vec<FetchUnit>, FetchError> {
    if end < start {
        return Err(FetchError::Configuration(format!(
            "end date {end} is before start date {start}"
        )));
    }
    let span_days = (end - start).num_days();

    let units = match granularity {
        Granularity::Hourly => {
            let requested = span_days as usize + 1;
            if requested > hourly_limit {
                error!(
                    "Refusing hourly range of {} days (limit {})",
                    requested, hourly_limit
                );
                return Err(FetchError::QuotaExceeded {
                    requested,
                    limit: hourly_limit,
                });
            }
            start
                .iter_days()
                .take(requested)
                .map(|day| FetchUnit::bulk(Granularity::Hourly, day))
                .collect()
        }
        Granularity::Monthly if span_days > MAX_CUSTOM_SPAN_DAYS => {
            let mut units = Vec::with_capacity(utils::months_touched(start, end) as usize);
            units.push(FetchUnit::bulk(Granularity::Monthly, start));
            let mut cursor = utils::first_of_next_month(start);
            while let Some(month) = cursor.filter(|month| *month <= end) {
                units.push(FetchUnit::bulk(Granularity::Monthly, month));
                cursor = utils::first_of_next_month(month);
            }
            units
        }
        Granularity::Monthly | Granularity::Custom => vec![FetchUnit::custom(start, end)],
    };

    debug!(
        "Planned {} {} requests for {} to {}",
        units.len(),
        granularity.label(),
        start,
        end
    );
    Ok(units)
}

/// Run planned units in order, resolving the station once up front
///
/// The first failure aborts the remaining units.
#[instrument(skip(client, units, progress), fields(units = units.len()))]
pub async fn run_plan(
    client: &mut HistoryClient,
    location: &str,
    units: &[FetchUnit],
    progress: &ProgressBar,
) -> Result<RangeSummary, FetchError> {
    let station = client.resolve_station(location).await?;
    progress.set_length(units.len() as u64);

    let mut fetches = Vec::with_capacity(units.len());
    for (index, unit) in units.iter().enumerate() {
        progress.set_message(unit.start.to_string());
        let span = info_span!("fetch_unit", index = index + 1, total = units.len());
        let summary = client
            .fetch_unit(&station, unit, None)
            .instrument(span)
            .await
            .map_err(|e| {
                error!(
                    "Aborting range at unit {} of {} ({}): {}",
                    index + 1,
                    units.len(),
                    unit.start,
                    e
                );
                e
            })?;
        fetches.push(summary);
        progress.inc(1);
    }
    progress.finish_and_clear();

    let summary = RangeSummary { station, fetches };
    info!(
        "Fetched {} pages with {} rows in total",
        summary.fetches.len(),
        summary.total_rows()
    );
    Ok(summary)
}
