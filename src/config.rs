use std::env;
use std::path::PathBuf;

use crate::table_extractor::ExtractMode;

pub const DEFAULT_GEOLOOKUP_URL: &str = "http://api.wunderground.com/api";
pub const DEFAULT_HISTORY_URL: &str = "http://www.wunderground.com";
pub const DEFAULT_OUTPUT_FILENAME: &str = "weather.csv";
/// Upper bound on per-day requests for one hourly bulk fetch
pub const DEFAULT_HOURLY_REQUEST_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub geolookup_api_key: String,
    pub geolookup_url: String,
    pub history_url: String,
    pub output_dir: PathBuf,
    pub output_filename: String,
    pub extract_mode: ExtractMode,
    pub hourly_request_limit: usize,
}

impl Config {
    pub fn new(geolookup_api_key: impl Into<String>) -> Self {
        Config {
            geolookup_api_key: geolookup_api_key.into(),
            geolookup_url: DEFAULT_GEOLOOKUP_URL.to_string(),
            history_url: DEFAULT_HISTORY_URL.to_string(),
            output_dir: PathBuf::from("."),
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            extract_mode: ExtractMode::Auto,
            hourly_request_limit: DEFAULT_HOURLY_REQUEST_LIMIT,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            env::var("GEOLOOKUP_API_KEY").map_err(|_| ConfigError::Missing("GEOLOOKUP_API_KEY"))?;

        let extract_mode = match env::var("EXTRACT_MODE") {
            Ok(value) => value.parse::<ExtractMode>().map_err(|message| ConfigError::Invalid {
                key: "EXTRACT_MODE",
                message,
            })?,
            Err(_) => ExtractMode::Auto,
        };

        let hourly_request_limit = match env::var("HOURLY_REQUEST_LIMIT") {
            Ok(value) => value
                .parse::<usize>()
                .map_err(|e| ConfigError::Invalid {
                    key: "HOURLY_REQUEST_LIMIT",
                    message: e.to_string(),
                })?,
            Err(_) => DEFAULT_HOURLY_REQUEST_LIMIT,
        };

        Ok(Config {
            geolookup_api_key: api_key,
            geolookup_url: env::var("GEOLOOKUP_URL")
                .unwrap_or_else(|_| DEFAULT_GEOLOOKUP_URL.to_string()),
            history_url: env::var("HISTORY_URL")
                .unwrap_or_else(|_| DEFAULT_HISTORY_URL.to_string()),
            output_dir: env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            output_filename: env::var("OUTPUT_FILENAME")
                .unwrap_or_else(|_| DEFAULT_OUTPUT_FILENAME.to_string()),
            extract_mode,
            hourly_request_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = Config::new("abc123");
        assert_eq!(config.geolookup_api_key, "abc123");
        assert_eq!(config.output_filename, "weather.csv");
        assert_eq!(config.hourly_request_limit, 500);
        assert_eq!(config.extract_mode, ExtractMode::Auto);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }
}
