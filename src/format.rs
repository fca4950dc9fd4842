use time::OffsetDateTime;
use time::format_description::OwnedFormatItem;

use crate::{Config, Severity};

/// One call to the sink before it is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity tag.
    pub severity: Severity,
    /// Raw message; embedded newlines are kept as-is.
    pub message: String,
    /// `true` follows the configured timestamp setting, `false` inverts it.
    pub obey_timestamp_default: bool,
    /// `true` follows the configured severity setting, `false` inverts it.
    pub obey_severity_default: bool,
}

impl LogEntry {
    /// Create an entry that follows the configured prefixes.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            obey_timestamp_default: true,
            obey_severity_default: true,
        }
    }

    /// Set whether this entry obeys the configured timestamp setting.
    pub fn with_timestamp_default(mut self, obey: bool) -> Self {
        self.obey_timestamp_default = obey;
        self
    }

    /// Set whether this entry obeys the configured severity setting.
    pub fn with_severity_default(mut self, obey: bool) -> Self {
        self.obey_severity_default = obey;
        self
    }
}

/// Renders entries into lines: `[time][SEVERITY] message`.
#[derive(Debug, Clone)]
pub struct Formatter {
    write_timestamp: bool,
    write_severity: bool,
    time_items: OwnedFormatItem,
}

impl Formatter {
    /// Build a formatter from the prefix settings of a validated config.
    pub fn new(config: &Config) -> Self {
        Self {
            write_timestamp: config.write_timestamp(),
            write_severity: config.write_severity(),
            time_items: config.time_items().clone(),
        }
    }

    /// Render `entry` as it would be written at `at`. No trailing newline.
    pub fn format(&self, entry: &LogEntry, at: OffsetDateTime) -> String {
        let mut line = String::with_capacity(entry.message.len() + 32);

        if self.write_timestamp == entry.obey_timestamp_default {
            line.push('[');
            // validated formats always render; an empty stamp is the fallback
            line.push_str(&at.format(&self.time_items).unwrap_or_default());
            line.push(']');
        }
        if self.write_severity == entry.obey_severity_default {
            line.push('[');
            line.push_str(entry.severity.as_str());
            line.push(']');
        }

        line.push(' ');
        line.push_str(&entry.message);
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SinkConfig;
    use time::macros::datetime;

    fn formatter(timestamp: bool, severity: bool, pattern: &str) -> Formatter {
        let config = SinkConfig::new()
            .with_timestamp(timestamp)
            .with_severity(severity)
            .with_time_format(pattern)
            .resolve();
        Formatter::new(&config)
    }

    #[test]
    fn test_format_full_prefix() {
        let f = formatter(true, true, "[hour]:[minute]:[second]");
        let line = f.format(
            &LogEntry::new(Severity::Error, "disk full"),
            datetime!(2026-10-16 14:03:01 UTC),
        );
        assert_eq!(line, "[14:03:01][ERROR] disk full");
    }

    #[test]
    fn test_format_default_pattern_centiseconds() {
        let f = formatter(true, false, "not-a-format-!@#");
        let line = f.format(
            &LogEntry::new(Severity::Info, "ready"),
            datetime!(2026-10-16 09:05:07.123 UTC),
        );
        assert_eq!(line, "[09:05:07:12] ready");
    }

    #[test]
    fn test_format_without_prefixes() {
        let f = formatter(false, false, "[hour]");
        let line = f.format(
            &LogEntry::new(Severity::Warning, "plain"),
            datetime!(2026-10-16 14:03:01 UTC),
        );
        assert_eq!(line, " plain");
    }

    #[test]
    fn test_override_inverts_defaults() {
        let at = datetime!(2026-10-16 14:03:01 UTC);

        // defaults on, overrides suppress
        let f = formatter(true, true, "[hour]:[minute]");
        let entry = LogEntry::new(Severity::Fatal, "boom").with_timestamp_default(false);
        assert_eq!(f.format(&entry, at), "[FATAL] boom");
        let entry = LogEntry::new(Severity::Fatal, "boom").with_severity_default(false);
        assert_eq!(f.format(&entry, at), "[14:03] boom");

        // defaults off, overrides force
        let f = formatter(false, false, "[hour]:[minute]");
        let entry = LogEntry::new(Severity::Info, "forced")
            .with_timestamp_default(false)
            .with_severity_default(false);
        assert_eq!(f.format(&entry, at), "[14:03][INFO] forced");
    }

    #[test]
    fn test_multiline_message_is_not_escaped() {
        let f = formatter(false, true, "[hour]");
        let line = f.format(
            &LogEntry::new(Severity::Info, "first\nsecond"),
            datetime!(2026-10-16 14:03:01 UTC),
        );
        assert_eq!(line, "[INFO] first\nsecond");
    }

    #[test]
    fn test_format_is_pure() {
        let f = formatter(true, true, "[year]-[month]-[day] [hour]:[minute]");
        let entry = LogEntry::new(Severity::Warning, "same");
        let at = datetime!(2026-10-16 14:03:01 UTC);
        assert_eq!(f.format(&entry, at), f.format(&entry, at));
        assert_eq!(f.format(&entry, at), "[2026-10-16 14:03][WARNING] same");
    }
}
