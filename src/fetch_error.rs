#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP status {status} while fetching {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("Station lookup failed: {0}")]
    Lookup(String),
    #[error("Invalid request configuration: {0}")]
    Configuration(String),
    #[error("Failed to parse HTML data: {0}")]
    Parse(String),
    #[error("Too many requests: {requested} days requested, limit is {limit} for hourly data")]
    QuotaExceeded { requested: usize, limit: usize },
    #[error("File I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
