use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::{self, OwnedFormatItem};
use time::macros::format_description;

use crate::{Error, FlushMode, Result, RetentionPolicy};

/// Time pattern used when none is given or the given one cannot be rendered
/// (hours:minutes:seconds:centiseconds).
pub const DEFAULT_TIME_FORMAT: &str = "[hour]:[minute]:[second]:[subsecond digits:2]";
/// Retained file count used when the configured one is below [`MIN_STORED_FILES`].
pub const DEFAULT_MAX_STORED_FILES: u32 = 15;
/// Smallest accepted `max_stored_files`.
pub const MIN_STORED_FILES: u32 = 3;
/// Application directory name used for the default log path.
pub const DEFAULT_APP_NAME: &str = "logkeeper";

/// Moment the process first touched the configuration layer. Default log
/// file names are derived from it so every sink of a run shares one stamp.
static PROCESS_START: Lazy<OffsetDateTime> = Lazy::new(local_now);

/// Current time in the local offset, falling back to UTC when the offset
/// cannot be determined.
pub(crate) fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Unvalidated sink configuration, as supplied by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Absolute path of the log file. `None` selects the default location.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Prefix each line with `[time]`
    #[serde(default = "default_true")]
    pub write_timestamp: bool,
    /// Prefix each line with `[SEVERITY]`
    #[serde(default = "default_true")]
    pub write_severity: bool,
    /// Write the environment banner when the manager is created
    #[serde(default = "default_true")]
    pub write_initial_banner: bool,
    /// `time` format description for the timestamp prefix
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// Maximum number of log files kept in the log directory
    #[serde(default = "default_max_stored_files")]
    pub max_stored_files: u32,
    /// When retention is enforced
    #[serde(default)]
    pub retention: RetentionPolicy,
    /// Where flushes run
    #[serde(default)]
    pub flush: FlushMode,
    /// Directory name used under the data directory for the default path
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl SinkConfig {
    /// Create a new SinkConfig with defaults
    pub fn new() -> Self {
        Self {
            path: None,
            write_timestamp: true,
            write_severity: true,
            write_initial_banner: true,
            time_format: default_time_format(),
            max_stored_files: DEFAULT_MAX_STORED_FILES,
            retention: RetentionPolicy::default(),
            flush: FlushMode::default(),
            app_name: default_app_name(),
        }
    }

    /// Set the log file path
    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Enable or disable the timestamp prefix
    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.write_timestamp = enabled;
        self
    }

    /// Enable or disable the severity prefix
    pub fn with_severity(mut self, enabled: bool) -> Self {
        self.write_severity = enabled;
        self
    }

    /// Enable or disable the startup banner
    pub fn with_initial_banner(mut self, enabled: bool) -> Self {
        self.write_initial_banner = enabled;
        self
    }

    /// Set the timestamp format description
    pub fn with_time_format(mut self, pattern: impl Into<String>) -> Self {
        self.time_format = pattern.into();
        self
    }

    /// Set the maximum number of retained log files
    pub fn with_max_stored_files(mut self, max: u32) -> Self {
        self.max_stored_files = max;
        self
    }

    /// Set the retention policy
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Set the flush mode
    pub fn with_flush_mode(mut self, flush: FlushMode) -> Self {
        self.flush = flush;
        self
    }

    /// Set the application name used by the default path
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Validate every field, replacing invalid values with defaults.
    ///
    /// This never fails. Each replaced value is reported with a warning on
    /// the host's `tracing` subscriber.
    pub fn resolve(self) -> Config {
        let started_at = *PROCESS_START;

        let path = match self.path {
            Some(path) => match validate_path(&path) {
                Ok(()) => path,
                Err(e) => {
                    let fallback = default_log_path(&self.app_name, started_at);
                    tracing::warn!(
                        error = %e,
                        fallback = %fallback.display(),
                        "log path rejected, using default"
                    );
                    fallback
                }
            },
            None => default_log_path(&self.app_name, started_at),
        };

        let (time_format, time_items) = match parse_time_format(&self.time_format) {
            Ok(items) => (self.time_format, items),
            Err(e) => {
                tracing::warn!(error = %e, "time format rejected, using default");
                (DEFAULT_TIME_FORMAT.to_string(), default_time_items())
            }
        };

        let max_stored_files = if self.max_stored_files < MIN_STORED_FILES {
            tracing::warn!(
                requested = self.max_stored_files,
                fallback = DEFAULT_MAX_STORED_FILES,
                "max_stored_files below minimum, using default"
            );
            DEFAULT_MAX_STORED_FILES
        } else {
            self.max_stored_files
        };

        Config {
            path,
            write_timestamp: self.write_timestamp,
            write_severity: self.write_severity,
            write_initial_banner: self.write_initial_banner,
            time_format,
            time_items,
            max_stored_files,
            retention: self.retention,
            flush: self.flush,
            started_at,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_true() -> bool {
    true
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

fn default_max_stored_files() -> u32 {
    DEFAULT_MAX_STORED_FILES
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_time_items() -> OwnedFormatItem {
    OwnedFormatItem::from(format_description!(
        "[hour]:[minute]:[second]:[subsecond digits:2]"
    ))
}

/// Validated sink configuration.
///
/// Produced by [`SinkConfig::resolve`]; every field holds a usable value.
/// Once handed to a [`LogManager`](crate::LogManager) it is no longer
/// mutable.
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    write_timestamp: bool,
    write_severity: bool,
    write_initial_banner: bool,
    time_format: String,
    time_items: OwnedFormatItem,
    max_stored_files: u32,
    retention: RetentionPolicy,
    flush: FlushMode,
    started_at: OffsetDateTime,
}

impl Config {
    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the log file.
    pub fn directory(&self) -> &Path {
        // validated paths always have a parent
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    pub fn write_timestamp(&self) -> bool {
        self.write_timestamp
    }

    pub fn write_severity(&self) -> bool {
        self.write_severity
    }

    pub fn write_initial_banner(&self) -> bool {
        self.write_initial_banner
    }

    /// The time format description source text.
    pub fn time_format(&self) -> &str {
        &self.time_format
    }

    pub(crate) fn time_items(&self) -> &OwnedFormatItem {
        &self.time_items
    }

    pub fn max_stored_files(&self) -> u32 {
        self.max_stored_files
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    pub fn flush_mode(&self) -> FlushMode {
        self.flush
    }

    /// Process start stamp the default path was derived from.
    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    /// Replace the log file path.
    ///
    /// Returns [`Error::InvalidMutation`] and leaves the path untouched when
    /// the new path is not absolute or its directory cannot be created.
    pub fn set_path<P: Into<PathBuf>>(&mut self, path: P) -> Result<()> {
        let path = path.into();
        validate_path(&path).map_err(|e| Error::InvalidMutation(e.to_string()))?;
        self.path = path;
        Ok(())
    }

    /// Replace the timestamp format description.
    ///
    /// Returns [`Error::InvalidMutation`] and leaves the format untouched when
    /// the pattern cannot be rendered.
    pub fn set_time_format(&mut self, pattern: &str) -> Result<()> {
        let items = parse_time_format(pattern).map_err(|e| Error::InvalidMutation(e.to_string()))?;
        self.time_format = pattern.to_string();
        self.time_items = items;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        SinkConfig::default().resolve()
    }
}

/// Check that `path` is absolute, names a file, and that its directory
/// either exists or can be created.
fn validate_path(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(Error::Config(format!(
            "log path {} is not absolute",
            path.display()
        )));
    }
    if path.file_name().is_none() || path.is_dir() {
        return Err(Error::Config(format!(
            "log path {} does not name a file",
            path.display()
        )));
    }
    let parent = path
        .parent()
        .ok_or_else(|| Error::Config(format!("log path {} has no parent", path.display())))?;

    // The nearest existing ancestor must be a directory, otherwise
    // create_dir_all can never succeed.
    match parent.ancestors().find(|p| p.exists()) {
        Some(existing) if existing.is_dir() => Ok(()),
        Some(existing) => Err(Error::Config(format!(
            "{} is not a directory",
            existing.display()
        ))),
        None => Err(Error::Config(format!(
            "no existing ancestor for {}",
            parent.display()
        ))),
    }
}

/// Parse a time format description and make sure it actually renders a time.
fn parse_time_format(pattern: &str) -> Result<OwnedFormatItem> {
    let items = format_description::parse_owned::<1>(pattern)
        .map_err(|e| Error::Config(format!("invalid time format {:?}: {}", pattern, e)))?;

    if !has_component(&items) {
        return Err(Error::Config(format!(
            "time format {:?} contains no time components",
            pattern
        )));
    }

    local_now()
        .format(&items)
        .map_err(|e| Error::Config(format!("time format {:?} cannot render: {}", pattern, e)))?;

    Ok(items)
}

fn has_component(item: &OwnedFormatItem) -> bool {
    match item {
        OwnedFormatItem::Component(_) => true,
        OwnedFormatItem::Compound(items) | OwnedFormatItem::First(items) => {
            items.iter().any(has_component)
        }
        OwnedFormatItem::Optional(item) => has_component(item),
        // literals render the same text at every instant
        _ => false,
    }
}

/// Default log file: `<data dir>/<app>/logs/<start stamp>.log`.
fn default_log_path(app_name: &str, started_at: OffsetDateTime) -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    let app_name = if app_name.is_empty() {
        DEFAULT_APP_NAME
    } else {
        app_name
    };
    let stamp = started_at
        .format(format_description!(
            "[year]-[month]-[day]-[hour]-[minute]-[second]"
        ))
        .unwrap_or_else(|_| started_at.unix_timestamp().to_string());

    base.join(app_name)
        .join("logs")
        .join(format!("{}.log", stamp))
}

/// Configuration for the diagnostics subscriber the sink reports through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Level filter (e.g., "info", "debug")
    #[serde(default = "default_diagnostics_level")]
    pub level: String,
    /// Output format ("text" or "json")
    #[serde(default = "default_diagnostics_format")]
    pub format: String,
}

impl DiagnosticsConfig {
    /// Create a new DiagnosticsConfig with defaults
    pub fn new() -> Self {
        Self {
            level: default_diagnostics_level(),
            format: default_diagnostics_format(),
        }
    }

    /// Set level filter
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set output format
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_diagnostics_level() -> String {
    "warn".to_string()
}

fn default_diagnostics_format() -> String {
    "text".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_config_new() {
        let config = SinkConfig::new();
        assert!(config.path.is_none());
        assert!(config.write_timestamp);
        assert!(config.write_severity);
        assert!(config.write_initial_banner);
        assert_eq!(config.time_format, DEFAULT_TIME_FORMAT);
        assert_eq!(config.max_stored_files, 15);
        assert_eq!(config.retention, RetentionPolicy::OnDirectoryCreation);
        assert_eq!(config.flush, FlushMode::Inline);
    }

    #[test]
    fn test_resolve_keeps_valid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let config = SinkConfig::new()
            .with_path(&path)
            .with_timestamp(false)
            .with_severity(false)
            .with_time_format("[hour]:[minute]:[second]")
            .with_max_stored_files(3)
            .resolve();

        assert_eq!(config.path(), path.as_path());
        assert_eq!(config.directory(), dir.path());
        assert!(!config.write_timestamp());
        assert!(!config.write_severity());
        assert_eq!(config.time_format(), "[hour]:[minute]:[second]");
        assert_eq!(config.max_stored_files(), 3);
    }

    #[test]
    fn test_resolve_accepts_missing_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c/app.log");
        let config = SinkConfig::new().with_path(&path).resolve();
        assert_eq!(config.path(), path.as_path());
    }

    #[test]
    fn test_resolve_rejects_relative_path() {
        let config = SinkConfig::new().with_path("logs/app.log").resolve();
        assert!(config.path().is_absolute());
        assert_ne!(config.path(), Path::new("logs/app.log"));
        assert_eq!(
            config.path().extension().and_then(|e| e.to_str()),
            Some("log")
        );
    }

    #[test]
    fn test_resolve_rejects_path_under_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().join("app.log");
        let config = SinkConfig::new().with_path(&path).resolve();
        assert_ne!(config.path(), path.as_path());
    }

    #[test]
    fn test_default_path_layout() {
        let config = SinkConfig::new().with_app_name("demo-app").resolve();
        let logs_dir = config.directory();
        assert_eq!(logs_dir.file_name().unwrap(), "logs");
        assert_eq!(logs_dir.parent().unwrap().file_name().unwrap(), "demo-app");

        let stem = config.path().file_stem().unwrap().to_str().unwrap();
        // YYYY-MM-DD-HH-MM-SS
        assert_eq!(stem.len(), 19);
        assert_eq!(stem.matches('-').count(), 5);
    }

    #[test]
    fn test_default_path_shares_process_stamp() {
        let a = SinkConfig::new().resolve();
        let b = SinkConfig::new().resolve();
        assert_eq!(a.path(), b.path());
        assert_eq!(a.started_at(), b.started_at());
    }

    #[test]
    fn test_resolve_rejects_literal_only_time_format() {
        let config = SinkConfig::new()
            .with_time_format("not-a-format-!@#")
            .resolve();
        assert_eq!(config.time_format(), DEFAULT_TIME_FORMAT);
    }

    #[test]
    fn test_has_component_ignores_literals() {
        let literal = format_description::parse_owned::<1>("plain text").unwrap();
        assert!(!has_component(&literal));

        let mixed = format_description::parse_owned::<1>("at [hour] sharp").unwrap();
        assert!(has_component(&mixed));
    }

    #[test]
    fn test_resolve_rejects_unparsable_time_format() {
        let config = SinkConfig::new().with_time_format("[hour").resolve();
        assert_eq!(config.time_format(), DEFAULT_TIME_FORMAT);

        let config = SinkConfig::new().with_time_format("[bogus]").resolve();
        assert_eq!(config.time_format(), DEFAULT_TIME_FORMAT);
    }

    #[test]
    fn test_resolve_replaces_small_max_stored_files() {
        for requested in [0, 1, 2] {
            let config = SinkConfig::new()
                .with_max_stored_files(requested)
                .resolve();
            assert_eq!(config.max_stored_files(), DEFAULT_MAX_STORED_FILES);
        }
        let config = SinkConfig::new().with_max_stored_files(3).resolve();
        assert_eq!(config.max_stored_files(), 3);
    }

    #[test]
    fn test_set_time_format() {
        let mut config = Config::default();
        config.set_time_format("[hour]h[minute]").unwrap();
        assert_eq!(config.time_format(), "[hour]h[minute]");

        let err = config.set_time_format("plain text").unwrap_err();
        assert!(matches!(err, Error::InvalidMutation(_)));
        assert_eq!(config.time_format(), "[hour]h[minute]");
    }

    #[test]
    fn test_set_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();

        let path = dir.path().join("other.log");
        config.set_path(&path).unwrap();
        assert_eq!(config.path(), path.as_path());

        let err = config.set_path("relative.log").unwrap_err();
        assert!(matches!(err, Error::InvalidMutation(_)));
        assert_eq!(config.path(), path.as_path());

        let err = config.set_path(dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidMutation(_)));
    }

    #[test]
    fn test_sink_config_deserialize_yaml() {
        let yaml = r#"
path: /var/log/demo/app.log
write_severity: false
time_format: "[hour]:[minute]"
max_stored_files: 5
retention: every_flush
flush: background
"#;
        let config: SinkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/var/log/demo/app.log")));
        assert!(config.write_timestamp);
        assert!(!config.write_severity);
        assert_eq!(config.time_format, "[hour]:[minute]");
        assert_eq!(config.max_stored_files, 5);
        assert_eq!(config.retention, RetentionPolicy::EveryFlush);
        assert_eq!(config.flush, FlushMode::Background);
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
    }

    #[test]
    fn test_sink_config_deserialize_toml_defaults() {
        let config: SinkConfig = toml::from_str("write_initial_banner = false").unwrap();
        assert!(config.path.is_none());
        assert!(!config.write_initial_banner);
        assert_eq!(config.max_stored_files, DEFAULT_MAX_STORED_FILES);
        assert_eq!(config.retention, RetentionPolicy::OnDirectoryCreation);
    }

    #[test]
    fn test_diagnostics_config() {
        let config = DiagnosticsConfig::new();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, "text");

        let config = config.with_level("debug").with_format("json");
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, "json");
    }
}
