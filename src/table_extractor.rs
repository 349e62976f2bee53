use std::fmt;
use std::str::FromStr;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, instrument, warn};

use crate::fetch_error::FetchError;

/// Number of fields in every observation row
pub const OBSERVATION_COLUMNS: usize = 13;

/// The service never returns more than this many rows per page
pub const MAX_ROWS_PER_PAGE: usize = 72;

/// Header written above structured observation rows
pub const OBSERVATION_HEADER: [&str; OBSERVATION_COLUMNS] = [
    "Time",
    "Temp.",
    "Windchill",
    "Dew Point",
    "Humidity",
    "Pressure",
    "Visibility",
    "Wind Dir",
    "Wind Speed",
    "Gust Speed",
    "Precip",
    "Events",
    "Conditions",
];

/// Recorded explicitly as "no data" by the service
pub const NO_DATA: &str = "-";

const NO_DATA_GLYPH: &str = "\n - \n";
const DATA_ROW_SELECTOR: &str = "tr.no-metars";
const TABLE_SELECTOR: &str = "table#obsTable";
const VALUE_SELECTOR: &str = "span.wx-value";

/// One observation: timestamp, temperature, windchill, dew point, humidity,
/// pressure, visibility, wind direction, wind speed, gust speed,
/// precipitation, events, conditions.
///
/// `Some("-")` is the no-data sentinel, `None` is an absent value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservationRow {
    pub fields: [Option<String>; OBSERVATION_COLUMNS],
}

impl ObservationRow {
    pub fn timestamp(&self) -> Option<&str> {
        self.fields[0].as_deref()
    }

    pub fn conditions(&self) -> Option<&str> {
        self.fields[OBSERVATION_COLUMNS - 1].as_deref()
    }

    /// Fields as CSV cells, absent values become empty strings
    pub fn to_record(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|field| field.as_deref().unwrap_or(""))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservationTable {
    pub rows: Vec<ObservationRow>,
}

/// Table read from a pre-delimited text block; columns are whatever the block contained
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DelimitedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedTable {
    Observations(ObservationTable),
    Delimited(DelimitedTable),
}

impl ExtractedTable {
    pub fn row_count(&self) -> usize {
        match self {
            ExtractedTable::Observations(table) => table.rows.len(),
            ExtractedTable::Delimited(table) => table.rows.len(),
        }
    }

    pub fn header(&self) -> Vec<&str> {
        match self {
            ExtractedTable::Observations(_) => OBSERVATION_HEADER.to_vec(),
            ExtractedTable::Delimited(table) => table.header.iter().map(String::as_str).collect(),
        }
    }
}

/// Which page layout to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Structured when observation rows are present, otherwise legacy
    #[default]
    Auto,
    /// `tr.no-metars` rows of the observation table
    Structured,
    /// A comma-delimited text block inside `<pre>` or `<p>`
    Legacy,
}

impl FromStr for ExtractMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ExtractMode::Auto),
            "structured" => Ok(ExtractMode::Structured),
            "legacy" => Ok(ExtractMode::Legacy),
            other => Err(format!(
                "unknown extract mode '{other}' (expected auto, structured or legacy)"
            )),
        }
    }
}

impl fmt::Display for ExtractMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractMode::Auto => "auto",
            ExtractMode::Structured => "structured",
            ExtractMode::Legacy => "legacy",
        };
        f.write_str(name)
    }
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::Parse(format!("bad selector '{css}': {e}")))
}

#[instrument(skip(html), fields(html_size = html.len()))]
pub fn extract(html: &str, mode: ExtractMode) -> Result<ExtractedTable, FetchError> {
    debug!("Parsing HTML document");
    let document = Html::parse_document(html);

    let resolved = match mode {
        ExtractMode::Auto => {
            if has_observation_table(&document)? {
                ExtractMode::Structured
            } else {
                ExtractMode::Legacy
            }
        }
        explicit => explicit,
    };
    debug!("Using {} extraction", resolved);

    let result = match resolved {
        ExtractMode::Legacy => extract_delimited(&document).map(ExtractedTable::Delimited),
        _ => extract_observations(&document).map(ExtractedTable::Observations),
    };

    if result.is_err() {
        debug!(
            "HTML preview (first 500 chars): {}",
            &html.chars().take(500).collect::<String>()
        );
    }
    result
}

fn has_observation_table(document: &Html) -> Result<bool, FetchError> {
    let rows = selector(DATA_ROW_SELECTOR)?;
    let table = selector(TABLE_SELECTOR)?;
    Ok(document.select(&rows).next().is_some() || document.select(&table).next().is_some())
}

fn extract_observations(document: &Html) -> Result<ObservationTable, FetchError> {
    if !has_observation_table(document)? {
        error!("No observation table found in HTML");
        return Err(FetchError::Parse(
            "no observation table or data rows in document".to_string(),
        ));
    }

    let row_selector = selector(DATA_ROW_SELECTOR)?;
    let cell_selector = selector("td")?;
    let value_selector = selector(VALUE_SELECTOR)?;

    let mut rows = Vec::new();
    let mut dropped = 0;

    for tr in document.select(&row_selector) {
        let cells: Vec<ElementRef> = tr.select(&cell_selector).collect();
        if cells.is_empty() {
            continue;
        }
        if rows.len() == MAX_ROWS_PER_PAGE {
            dropped += 1;
            continue;
        }
        if cells.len() != OBSERVATION_COLUMNS {
            debug!(
                "Row {} has {} cells, fitting to {} columns",
                rows.len() + 1,
                cells.len(),
                OBSERVATION_COLUMNS
            );
        }

        let mut row = ObservationRow::default();
        for (slot, cell) in row.fields.iter_mut().zip(cells.iter()) {
            *slot = cell_value(cell, &value_selector);
        }
        rows.push(row);
    }

    if dropped > 0 {
        warn!(
            "Dropped {} rows beyond the {} row page limit",
            dropped, MAX_ROWS_PER_PAGE
        );
    }
    debug!("Successfully parsed {} observation rows", rows.len());

    Ok(ObservationTable { rows })
}

fn cell_value(cell: &ElementRef, value_selector: &Selector) -> Option<String> {
    if let Some(span) = cell.select(value_selector).next() {
        return normalize(span.text().collect::<String>(), false);
    }
    normalize(cell.text().collect::<String>(), true)
}

fn normalize(raw: String, collapse: bool) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{a0}');
    if raw == NO_DATA_GLYPH || trimmed == NO_DATA {
        return Some(NO_DATA.to_string());
    }
    if trimmed.is_empty() {
        return None;
    }
    if collapse {
        Some(trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
    } else {
        Some(raw)
    }
}

fn extract_delimited(document: &Html) -> Result<DelimitedTable, FetchError> {
    let pre_selector = selector("pre")?;
    let p_selector = selector("p")?;

    // Prose containing commas is not a table; only blocks with data rows count
    let table = document
        .select(&pre_selector)
        .chain(document.select(&p_selector))
        .map(|element| element.text().collect::<String>())
        .filter(|text| text.contains(','))
        .find_map(|block| match parse_delimited(&block) {
            Ok(table) => {
                debug!("Found delimited block, size: {} bytes", block.len());
                Some(table)
            }
            Err(e) => {
                debug!("Skipping text block: {}", e);
                None
            }
        })
        .ok_or_else(|| {
            error!("No delimited table found in HTML");
            FetchError::Parse("no delimited table in document".to_string())
        })?;

    Ok(table)
}

/// Parse comma-delimited text whose first non-empty line is the header
///
/// A block without at least one data row below the header is rejected.
pub fn parse_delimited(text: &str) -> Result<DelimitedTable, FetchError> {
    let cleaned = text
        .lines()
        .map(|line| line.trim().trim_end_matches("<br />").trim_end())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(cleaned.as_bytes());

    let header = reader
        .headers()
        .map_err(|e| FetchError::Parse(format!("unreadable delimited header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| FetchError::Parse(format!("unreadable delimited row: {e}")))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    if rows.is_empty() {
        return Err(FetchError::Parse(
            "delimited block has a header but no data rows".to_string(),
        ));
    }
    debug!("Successfully parsed {} delimited rows", rows.len());

    Ok(DelimitedTable { header, rows })
}
