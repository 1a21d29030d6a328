/// Error types for the fetch, decode, classify and persist stages
use thiserror::Error;

/// Failures talking to the Sofar API. Any of these aborts the enclosing
/// multi-chunk fetch.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response body is not valid JSON: {0}")]
    Body(#[from] serde_json::Error),

    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

// The request URL carries the API token in its query string
impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Request(e.without_url())
    }
}

/// Hex payload decoding errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid hex data")]
    InvalidHex,
}

/// Why a sensor record produced no decoded output. These are diagnostics,
/// never propagated past the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("unrecognized data_type_name '{0}'")]
    UnrecognizedDataType(String),

    #[error("unmanaged payload with unrecognized value: {0}")]
    UnrecognizedPayload(String),

    #[error("no printable prefix in decoded value for node {node_id}: {decoded:?}")]
    NoPrintablePrefix { node_id: String, decoded: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid time range: start {start} is not before end {end}")]
    EmptyRange { start: String, end: String },

    #[error("No spotters configured. Please set SPOTTERS or SPOTTER_ID/START_DATE environment variables")]
    NoSpotters,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Top-level error for one spotter run.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
