use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HedgingError {
    #[error("Missing column: {column}")]
    MissingColumn { column: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Empty range: no observations between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for HedgingError {
    fn from(e: serde_json::Error) -> Self {
        HedgingError::SerializationError(e.to_string())
    }
}
