use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Errors that can occur in the log sink
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration value is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A setter rejected the new value; the configuration is unchanged.
    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),
    /// The log directory could not be created.
    #[error("Failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The log file could not be opened for appending.
    #[error("Failed to open log file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing queued lines to the log file failed.
    #[error("Failed to write log file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An old log file could not be removed during retention.
    #[error("Failed to delete log file {}: {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Initialization failed.
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
