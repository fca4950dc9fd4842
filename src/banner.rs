//! Startup banner describing the host environment.
//!
//! The sink treats a banner as an opaque multi-line message; it is written
//! once as an INFO entry when a manager is created with
//! `write_initial_banner` enabled.

use std::fmt::Write as _;

use time::OffsetDateTime;
use time::macros::format_description;

use crate::config::local_now;

/// Source of the text written at startup.
pub trait BannerSource {
    /// Render the banner. May span several lines.
    fn banner(&self) -> String;
}

impl<F> BannerSource for F
where
    F: Fn() -> String,
{
    fn banner(&self) -> String {
        self()
    }
}

/// Snapshot of the process and host, taken once.
#[derive(Debug, Clone)]
pub struct EnvironmentSnapshot {
    pub created_at: OffsetDateTime,
    pub crate_version: &'static str,
    pub os: &'static str,
    pub os_family: &'static str,
    pub arch: &'static str,
    pub processors: Option<usize>,
    pub host_name: Option<String>,
    pub process_id: u32,
    pub executable: Option<String>,
}

impl EnvironmentSnapshot {
    /// Capture the current environment.
    pub fn capture() -> Self {
        Self {
            created_at: local_now(),
            crate_version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            os_family: std::env::consts::FAMILY,
            arch: std::env::consts::ARCH,
            processors: std::thread::available_parallelism().ok().map(|n| n.get()),
            host_name: host_name(),
            process_id: std::process::id(),
            executable: std::env::current_exe()
                .ok()
                .map(|p| p.display().to_string()),
        }
    }
}

impl BannerSource for EnvironmentSnapshot {
    fn banner(&self) -> String {
        fn or_unknown(value: Option<String>) -> String {
            value.unwrap_or_else(|| "unknown".to_string())
        }

        let created = self
            .created_at
            .format(format_description!(
                "[year]-[month]-[day]-[hour]:[minute]:[second]"
            ))
            .unwrap_or_default();

        let mut text = String::new();
        let _ = writeln!(text, "Log file created at {}", created);
        let _ = writeln!(text);
        let _ = writeln!(text, "=============== SYSTEM INFO ===============");
        let _ = writeln!(text);
        let _ = writeln!(text, "logkeeper version: {}", self.crate_version);
        let _ = writeln!(text, "OS: {}", self.os);
        let _ = writeln!(text, "Operating system family: {}", self.os_family);
        let _ = writeln!(text, "Architecture: {}", self.arch);
        let _ = writeln!(
            text,
            "Processor count: {}",
            or_unknown(self.processors.map(|n| n.to_string()))
        );
        let _ = writeln!(text, "Host name: {}", or_unknown(self.host_name.clone()));
        let _ = writeln!(text, "Process id: {}", self.process_id);
        let _ = writeln!(text, "Executable: {}", or_unknown(self.executable.clone()));
        let _ = writeln!(text);
        let _ = write!(text, "===========================================");
        text
    }
}

fn host_name() -> Option<String> {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .filter(|name| !name.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|name| !name.is_empty())
        })
}
