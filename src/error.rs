use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unsupported encoding: none of [{}] could decode the input", tried.join(", "))]
    EncodingUnsupported { tried: Vec<String> },

    #[error("Missing required column: {column}")]
    MissingRequiredColumn { column: String },

    #[error("Unknown grouping field: {0}")]
    UnknownField(String),

    #[error("Unknown encoding label: {0}")]
    UnknownEncoding(String),

    #[error("Empty input for year {0}: no header row")]
    EmptyInput(i32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for ReportError {
    fn from(err: polars::error::PolarsError) -> Self {
        ReportError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
