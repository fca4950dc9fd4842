//! # Logkeeper
//!
//! A thread-safe, append-only log sink with bounded file retention.
//!
//! ## Features
//!
//! - Severity-tagged lines with optional `[time]` and `[SEVERITY]` prefixes
//! - A shared pending queue: concurrent writers never lose or interleave lines
//! - Inline or background flushing to a single log file
//! - Retention that keeps the log directory within a fixed file count
//! - An optional environment banner at startup
//!
//! ## Example
//!
//! ```rust,no_run
//! use logkeeper::{LogManager, Severity, SinkConfig};
//!
//! let config = SinkConfig::new()
//!     .with_path("/var/log/myapp/session.log")
//!     .with_time_format("[hour]:[minute]:[second]")
//!     .with_max_stored_files(5);
//! let log = LogManager::new(config);
//!
//! log.write("disk full", Severity::Error);
//! ```

pub mod banner;
pub mod builder;
pub mod config;
pub mod error;
pub mod format;
pub mod manager;
pub mod queue;
pub mod retention;
pub mod severity;
pub mod tracing_init;
pub mod writer;

pub use banner::{BannerSource, EnvironmentSnapshot};
pub use builder::LogBuilder;
pub use config::{
    Config, DEFAULT_MAX_STORED_FILES, DEFAULT_TIME_FORMAT, DiagnosticsConfig, SinkConfig,
};
pub use error::{Error, Result};
pub use format::{Formatter, LogEntry};
pub use manager::{FlushMode, LogManager};
pub use queue::PendingQueue;
pub use retention::{RetentionPolicy, RetentionReport};
pub use severity::Severity;
pub use tracing_init::init_diagnostics;
pub use writer::{ErrorObserver, FileSink};

/// Start configuring a [`LogManager`].
pub fn builder() -> LogBuilder {
    LogBuilder::new()
}
