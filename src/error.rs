use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("File '{file}' has no '{column}' column")]
    MissingColumn { file: String, column: String },

    #[error("Could not read file '{file}': {details}")]
    UnreadableFile { file: String, details: String },

    #[error("Invalid year-month key '{0}': expected YYYY-MM")]
    InvalidYearMonth(String),

    #[error("Invalid loader configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
