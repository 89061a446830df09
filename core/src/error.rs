use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input not sorted by timestamp at record {index} ('{id}')")]
    NotSorted { index: usize, id: String },

    #[error("Duplicate transaction id '{id}' at record {index}")]
    DuplicateId { index: usize, id: String },

    #[error("Missing required column '{column}' in header")]
    MissingColumn { column: &'static str },

    #[error("Cannot open '{path}' as CSV: path contains a single quote")]
    UnsupportedPath { path: String },

    #[error("Missing required field '{field}' at record {index}")]
    MissingField { index: usize, field: &'static str },

    #[error("Unparsable timestamp '{value}' at record {index}")]
    InvalidTimestamp { index: usize, value: String },

    #[error("Invalid value '{value}' for field '{field}' at record {index}")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("Flag vector for '{signal}' has {actual} entries, expected {expected}")]
    FlagLengthMismatch {
        signal:   &'static str,
        expected: usize,
        actual:   usize,
    },

    #[error("Evaluator '{signal}' failed before producing flags")]
    EvaluatorFailed { signal: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ScoreResult<T> = Result<T, ScoreError>;
