use scylla::transport::errors::{NewSessionError, QueryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to establish session: {0}")]
    Connection(#[source] NewSessionError),

    #[error("Query failed: {0}")]
    Query(#[from] QueryError),

    #[error("Result decoding failed: {0}")]
    Decode(String),

    #[error("Unknown record field '{0}'")]
    UnknownField(String),

    #[error("Session holder count is negative: {0}")]
    Invariant(i64),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
