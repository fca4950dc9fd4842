//! Builder pattern for creating a log manager.
//!
//! This module provides a convenient builder API for configuring a
//! [`LogManager`] in a single chain of method calls.
//!
//! # Example
//!
//! ```rust,no_run
//! use logkeeper::{RetentionPolicy, Severity};
//!
//! let log = logkeeper::builder()
//!     .with_path("/var/log/myapp/session.log")
//!     .with_max_stored_files(10)
//!     .with_retention(RetentionPolicy::EveryFlush)
//!     .build();
//!
//! log.write("service started", Severity::Info);
//! ```

use std::fmt;
use std::path::PathBuf;

use crate::banner::BannerSource;
use crate::writer::ErrorObserver;
use crate::{FlushMode, LogManager, RetentionPolicy, SinkConfig};

/// A builder for configuring and creating a [`LogManager`].
#[derive(Clone, Default)]
pub struct LogBuilder {
    config: SinkConfig,
    observer: Option<ErrorObserver>,
}

impl LogBuilder {
    /// Create a new LogBuilder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a LogBuilder from an existing configuration.
    pub fn from_config(config: SinkConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Set the log file path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = self.config.with_path(path);
        self
    }

    /// Enable or disable the `[time]` prefix.
    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.config = self.config.with_timestamp(enabled);
        self
    }

    /// Enable or disable the `[SEVERITY]` prefix.
    pub fn with_severity(mut self, enabled: bool) -> Self {
        self.config = self.config.with_severity(enabled);
        self
    }

    /// Enable or disable the startup banner.
    pub fn with_initial_banner(mut self, enabled: bool) -> Self {
        self.config = self.config.with_initial_banner(enabled);
        self
    }

    /// Set the timestamp format description (e.g., "[hour]:[minute]:[second]").
    pub fn with_time_format(mut self, pattern: impl Into<String>) -> Self {
        self.config = self.config.with_time_format(pattern);
        self
    }

    /// Set the maximum number of retained log files.
    pub fn with_max_stored_files(mut self, max: u32) -> Self {
        self.config = self.config.with_max_stored_files(max);
        self
    }

    /// Set when retention runs.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.config = self.config.with_retention(retention);
        self
    }

    /// Set where flushes run.
    pub fn with_flush_mode(mut self, flush: FlushMode) -> Self {
        self.config = self.config.with_flush_mode(flush);
        self
    }

    /// Set the application name used by the default path.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.config = self.config.with_app_name(app_name);
        self
    }

    /// Hand every reported failure to `observer` as well as `tracing`.
    pub fn with_observer(mut self, observer: ErrorObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get the current configuration without building.
    pub fn config(self) -> SinkConfig {
        self.config
    }

    /// Build the manager, writing the environment banner if enabled.
    pub fn build(self) -> LogManager {
        match self.observer {
            Some(observer) => LogManager::with_observer(self.config, observer),
            None => LogManager::new(self.config),
        }
    }

    /// Build the manager with a custom banner source.
    pub fn build_with_banner(self, banner: &dyn BannerSource) -> LogManager {
        LogManager::build(self.config.resolve(), self.observer, banner)
    }
}

impl fmt::Debug for LogBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBuilder")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
