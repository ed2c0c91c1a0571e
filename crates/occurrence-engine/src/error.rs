//! Error types for occurrence-engine operations.
//!
//! Errors are only produced at the boundary (ingestion, window construction,
//! persistence). Occurrence resolution, materialization and filtering are
//! infallible once their inputs are validated.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid record '{id}': {source}")]
    InvalidRecord {
        id: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
