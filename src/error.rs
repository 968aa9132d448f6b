use thiserror::Error;

#[derive(Error, Debug)]
pub enum BorReportError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid number at {path}: '{value}'")]
    InvalidNumber { path: String, value: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BorReportError>;
