use chrono::NaiveDate;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A date string is not of the form `YYYY-MM-DD`.
    #[error("invalid date format: {0:?}")]
    InvalidFormat(String),

    #[error("invalid date range: {end} is before {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// A count field is not a non-negative integer.
    #[error("invalid count: {0:?}")]
    InvalidCount(String),

    #[error("invalid region code: {0:?}")]
    InvalidCode(String),

    /// Natural log requested for a value that is zero or negative.
    #[error("logarithm of non-positive value {0}")]
    InvalidDomain(f64),

    #[error("count total overflows on {0}")]
    CountOverflow(NaiveDate),

    #[error("malformed population table: {0}")]
    InvalidTable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("region {0} not found")]
    MissingRegion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u32, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] curl::Error),
}
