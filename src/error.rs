//! Error taxonomy for the fire clustering and trend pipeline.
//!
//! Unresolved region names are deliberately absent here: a boundary lookup
//! that finds nothing returns `Ok(None)` and the aggregation layer turns it
//! into an empty result.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FireError>;

#[derive(Error, Debug)]
pub enum FireError {
    /// Invalid coordinate range or a non-positive derived fire radius.
    #[error("validation error: {0}")]
    Validation(String),

    /// The external fire data source (or boundary lookup) failed.
    #[error("data source error: {0}")]
    DataSource(String),

    /// Reference date parse failure or another fault while orchestrating.
    #[error("orchestration error: {0}")]
    Orchestration(String),
}

impl From<reqwest::Error> for FireError {
    fn from(e: reqwest::Error) -> Self {
        FireError::DataSource(e.to_string())
    }
}

impl From<csv::Error> for FireError {
    fn from(e: csv::Error) -> Self {
        FireError::DataSource(format!("malformed hotspot CSV: {e}"))
    }
}

impl From<chrono::ParseError> for FireError {
    fn from(e: chrono::ParseError) -> Self {
        FireError::Orchestration(format!("unparseable date: {e}"))
    }
}

pub fn validation(msg: impl ToString) -> FireError {
    FireError::Validation(msg.to_string())
}

pub fn data_source(msg: impl ToString) -> FireError {
    FireError::DataSource(msg.to_string())
}

pub fn orchestration(msg: impl ToString) -> FireError {
    FireError::Orchestration(msg.to_string())
}
