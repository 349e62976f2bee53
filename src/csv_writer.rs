use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, instrument};

use crate::fetch_error::FetchError;
use crate::table_extractor::ExtractedTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub rows_written: usize,
    /// True when the file did not exist and a header was written
    pub created: bool,
}

/// File name for one bulk unit, e.g. `2014-1-5.csv`
pub fn bulk_filename(date: NaiveDate) -> String {
    format!("{}-{}-{}.csv", date.year(), date.month(), date.day())
}

/// Resolve where a fetch should be written
///
/// In bulk mode the name is derived from `date` and `filename` is ignored.
pub fn output_path(dir: &Path, filename: &str, bulk: bool, date: NaiveDate) -> PathBuf {
    if bulk {
        dir.join(bulk_filename(date))
    } else {
        dir.join(filename)
    }
}

/// Append `table` to `path`, creating it with a header if it does not exist yet
#[instrument(skip(table), fields(rows = table.row_count()))]
pub fn write_table(table: &ExtractedTable, path: &Path) -> Result<WriteOutcome, FetchError> {
    let created = !path.exists();
    info!(
        "{} {}",
        if created { "creating" } else { "updating" },
        path.display()
    );
    if created {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(file);

    if created {
        debug!("Writing header to new file {}", path.display());
        writer.write_record(table.header())?;
    }

    match table {
        ExtractedTable::Observations(observations) => {
            for row in &observations.rows {
                writer.write_record(row.to_record())?;
            }
        }
        ExtractedTable::Delimited(delimited) => {
            for row in &delimited.rows {
                writer.write_record(row)?;
            }
        }
    }
    writer.flush()?;

    let rows_written = table.row_count();
    if created {
        info!("Created {} with {} rows", path.display(), rows_written);
    } else {
        info!("Appended {} rows to {}", rows_written, path.display());
    }

    Ok(WriteOutcome {
        path: path.to_path_buf(),
        rows_written,
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table_extractor::{
        DelimitedTable, ObservationRow, ObservationTable, NO_DATA, OBSERVATION_HEADER,
    };

    fn sample_table(times: &[&str]) -> ExtractedTable {
        let rows = times
            .iter()
            .map(|time| {
                let mut row = ObservationRow::default();
                row.fields[0] = Some(time.to_string());
                row.fields[1] = Some("57.0".to_string());
                row.fields[2] = Some(NO_DATA.to_string());
                row.fields[12] = Some("Clear, calm".to_string());
                row
            })
            .collect();
        ExtractedTable::Observations(ObservationTable { rows })
    }

    #[test]
    fn test_bulk_filename_is_unpadded() {
        let date = NaiveDate::from_ymd_opt(2014, 1, 5).unwrap();
        assert_eq!(bulk_filename(date), "2014-1-5.csv");
    }

    #[test]
    fn test_output_path_bulk_ignores_filename() {
        let date = NaiveDate::from_ymd_opt(2015, 12, 31).unwrap();
        let dir = Path::new("out");
        assert_eq!(
            output_path(dir, "mine.csv", true, date),
            PathBuf::from("out/2015-12-31.csv")
        );
        assert_eq!(
            output_path(dir, "mine.csv", false, date),
            PathBuf::from("out/mine.csv")
        );
    }

    #[test]
    fn test_create_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.csv");

        let first = write_table(&sample_table(&["1:00 AM", "2:00 AM"]), &path).unwrap();
        assert!(first.created);
        assert_eq!(first.rows_written, 2);

        let second = write_table(&sample_table(&["3:00 AM", "4:00 AM"]), &path).unwrap();
        assert!(!second.created);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], OBSERVATION_HEADER.join(","));
        assert_eq!(
            contents.matches("Windchill").count(),
            1,
            "header must not be repeated"
        );
        assert_eq!(lines[1], "1:00 AM,57.0,-,,,,,,,,,,\"Clear, calm\"");
        assert!(lines[4].starts_with("4:00 AM,"));
    }

    #[test]
    fn test_delimited_table_uses_own_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("legacy.csv");
        let table = ExtractedTable::Delimited(DelimitedTable {
            header: vec!["Date".to_string(), "Max".to_string()],
            rows: vec![
                vec!["2014-1-1".to_string(), "70".to_string()],
                vec!["2014-1-2".to_string(), "71".to_string(), "extra".to_string()],
            ],
        });

        let outcome = write_table(&table, &path).unwrap();
        assert!(outcome.created);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Date,Max\n2014-1-1,70\n2014-1-2,71,extra\n");
    }

    #[test]
    fn test_empty_table_still_creates_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        let outcome = write_table(&sample_table(&[]), &path).unwrap();
        assert_eq!(outcome.rows_written, 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
