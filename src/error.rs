use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Timed out waiting for a pooled connection after {0:?}")]
    PoolTimeout(std::time::Duration),

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Invalid task type: {0}")]
    InvalidTaskType(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite_migration::Error> for Error {
    fn from(e: rusqlite_migration::Error) -> Self {
        Error::Migration(e.to_string())
    }
}

impl<E: fmt::Display> From<tokio_rusqlite::Error<E>> for Error {
    fn from(e: tokio_rusqlite::Error<E>) -> Self {
        Error::Database(e.to_string())
    }
}

/// Unwrap an error raised inside a connection closure so the caller sees the
/// original value instead of a stringified copy.
pub(crate) fn unwrap_call_error(e: tokio_rusqlite::Error<Error>) -> Error {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => Error::Database(other.to_string()),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
