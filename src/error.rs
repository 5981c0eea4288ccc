use rusqlite::Error as RusqliteError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LivePulseError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error), // Converts io::Error into LivePulseError automatically

    #[error("Database error: {0}")]
    DatabaseError(#[from] RusqliteError), // Converts rusqlite::Error automatically

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Error: {0}")]
    Error(String), // Allows custom application errors
}

impl LivePulseError {
    /// Short, stable label for the error kind.
    ///
    /// Used when logging failures from the polling loop, where the raw error
    /// payload may carry connection strings or paths we don't want in the log.
    pub fn category(&self) -> &'static str {
        match self {
            LivePulseError::IoError(_) => "io",
            LivePulseError::DatabaseError(_) => "database",
            LivePulseError::PoolError(_) => "connection pool",
            LivePulseError::Error(_) => "other",
        }
    }
}
