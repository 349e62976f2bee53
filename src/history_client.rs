use std::path::PathBuf;

use chrono::NaiveDate;
use indicatif::ProgressBar;
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::csv_writer::{self, WriteOutcome};
use crate::fetch_error::FetchError;
use crate::scheduler::{self, FetchUnit, RangeSummary};
use crate::station_resolver::{Station, StationResolver};
use crate::table_extractor::{self, ExtractMode};
use crate::url_builder::{build_history_url, Granularity};
use crate::utils::parse_date;

#[derive(Debug, Clone)]
pub struct FetchSummary {
    pub url: String,
    pub station: Station,
    pub outcome: WriteOutcome,
}

/// Fetches history pages and writes their observations to CSV
pub struct HistoryClient {
    client: reqwest::Client,
    resolver: StationResolver,
    history_url: String,
    output_dir: PathBuf,
    output_filename: String,
    extract_mode: ExtractMode,
    hourly_request_limit: usize,
}

impl HistoryClient {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::new();
        let resolver = StationResolver::with_client(
            client.clone(),
            config.geolookup_url.clone(),
            config.geolookup_api_key.clone(),
        );
        Self {
            client,
            resolver,
            history_url: config.history_url.clone(),
            output_dir: config.output_dir.clone(),
            output_filename: config.output_filename.clone(),
            extract_mode: config.extract_mode,
            hourly_request_limit: config.hourly_request_limit,
        }
    }

    pub fn resolver_mut(&mut self) -> &mut StationResolver {
        &mut self.resolver
    }

    pub async fn resolve_station(&mut self, location: &str) -> Result<Station, FetchError> {
        self.resolver.resolve(location).await
    }

    /// Fetch one page (a day, a month, or a custom range) and write it out
    ///
    /// `filename` defaults to the configured output name; in bulk mode the
    /// file is named after `start` instead.
    #[instrument(skip(self))]
    pub async fn fetch_one(
        &mut self,
        location: &str,
        granularity: Granularity,
        start: NaiveDate,
        end: Option<NaiveDate>,
        filename: Option<&str>,
        bulk: bool,
    ) -> Result<FetchSummary, FetchError> {
        let station = self.resolve_station(location).await?;
        let unit = FetchUnit {
            granularity,
            start,
            end,
            bulk,
        };
        self.fetch_unit(&station, &unit, filename).await
    }

    /// Like [`HistoryClient::fetch_one`], with a granularity code and `M/D/YYYY` dates
    pub async fn fetch_one_str(
        &mut self,
        location: &str,
        granularity_code: &str,
        start: &str,
        end: Option<&str>,
        filename: Option<&str>,
        bulk: bool,
    ) -> Result<FetchSummary, FetchError> {
        let granularity: Granularity = granularity_code.parse()?;
        let start = parse_date(start)?;
        let end = end.map(parse_date).transpose()?;
        self.fetch_one(location, granularity, start, end, filename, bulk)
            .await
    }

    pub async fn fetch_range(
        &mut self,
        location: &str,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RangeSummary, FetchError> {
        self.fetch_range_with_progress(location, granularity, start, end, &ProgressBar::hidden())
            .await
    }

    /// Fetch `[start, end]` as a sequence of single-page requests
    ///
    /// The quota check happens before any network access.
    #[instrument(skip(self, progress))]
    pub async fn fetch_range_with_progress(
        &mut self,
        location: &str,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
        progress: &ProgressBar,
    ) -> Result<RangeSummary, FetchError> {
        let units = scheduler::plan_range(granularity, start, end, self.hourly_request_limit)?;
        info!("Fetching {} pages for {} to {}", units.len(), start, end);
        scheduler::run_plan(self, location, &units, progress).await
    }

    /// Like [`HistoryClient::fetch_range`], with a granularity code and `M/D/YYYY` dates
    pub async fn fetch_range_str(
        &mut self,
        location: &str,
        granularity_code: &str,
        start: &str,
        end: &str,
    ) -> Result<RangeSummary, FetchError> {
        let granularity: Granularity = granularity_code.parse()?;
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        self.fetch_range(location, granularity, start, end).await
    }

    pub(crate) async fn fetch_unit(
        &self,
        station: &Station,
        unit: &FetchUnit,
        filename: Option<&str>,
    ) -> Result<FetchSummary, FetchError> {
        let url = build_history_url(
            &self.history_url,
            station.as_str(),
            unit.granularity,
            unit.start,
            unit.end,
        )?;

        info!("retrieving {}", url);
        let html = self.fetch_page(&url).await?;

        let table = table_extractor::extract(&html, self.extract_mode)?;
        info!("found {} rows", table.row_count());

        let path = csv_writer::output_path(
            &self.output_dir,
            filename.unwrap_or(&self.output_filename),
            unit.bulk,
            unit.start,
        );
        let outcome = csv_writer::write_table(&table, &path)?;
        info!("done");

        Ok(FetchSummary {
            url,
            station: station.clone(),
            outcome,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        debug!("Sending HTTP request to history service");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if !status.is_success() {
            error!("History page returned status {}", status);
            return Err(FetchError::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        let html = response.text().await?;
        debug!("Retrieved HTML content, size: {} bytes", html.len());
        Ok(html)
    }
}
