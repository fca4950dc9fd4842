//! Bounded retention of log files in the log directory.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Extension of the files retention is allowed to delete.
pub const LOG_EXTENSION: &str = "log";

/// When the sink enforces the retained file limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Enforce once when the sink prepares its directory: on the first flush
    /// of a sink, and again whenever the directory has disappeared. While the
    /// directory exists the file count can grow past the limit.
    #[default]
    OnDirectoryCreation,
    /// Enforce before every flush.
    EveryFlush,
}

/// A log file considered for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// Full path of the file.
    pub path: PathBuf,
    /// Creation time, or modification time where the platform does not
    /// record creation.
    pub created: SystemTime,
}

/// Outcome of one retention pass.
#[derive(Debug, Default)]
pub struct RetentionReport {
    /// Files that were removed, oldest first.
    pub deleted: Vec<PathBuf>,
    /// Files that could not be removed.
    pub failures: Vec<Error>,
}

impl RetentionReport {
    /// True if every selected file was removed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// List the log files in `dir` that share `extension`, skipping `exclude`.
///
/// Subdirectories and unreadable entries are ignored.
pub fn list_log_files(
    dir: &Path,
    extension: &str,
    exclude: Option<&Path>,
) -> Result<Vec<LogFile>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if exclude.is_some_and(|ex| ex == path.as_path()) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        files.push(LogFile { path, created });
    }

    Ok(files)
}

/// Sort newest first. Equal timestamps fall back to descending file name so
/// the order is stable.
pub fn order_newest_first(files: &mut [LogFile]) {
    files.sort_by(|a, b| match b.created.cmp(&a.created) {
        Ordering::Equal => b.path.cmp(&a.path),
        other => other,
    });
}

/// Delete the oldest files until fewer than `max_files` remain, leaving room
/// for the sink's own file.
///
/// Deletion failures are collected in the report and do not stop the pass;
/// a failed file still counts as handled so the loop always terminates.
pub fn prune(mut files: Vec<LogFile>, max_files: usize) -> RetentionReport {
    let mut report = RetentionReport::default();
    order_newest_first(&mut files);

    while files.len() >= max_files {
        let Some(oldest) = files.pop() else { break };
        match fs::remove_file(&oldest.path) {
            Ok(()) => {
                tracing::debug!(file = %oldest.path.display(), "removed old log file");
                report.deleted.push(oldest.path);
            }
            Err(source) => {
                tracing::warn!(
                    file = %oldest.path.display(),
                    error = %source,
                    "failed to remove old log file"
                );
                report.failures.push(Error::Delete {
                    path: oldest.path,
                    source,
                });
            }
        }
    }

    report
}

/// Enforce the retained file limit for the log file at `target`.
///
/// Every `.log` file in the target's directory is a candidate, whoever
/// wrote it, except `target` itself. Other extensions are never touched,
/// whatever the target's own extension is.
pub fn enforce(target: &Path, max_files: usize) -> Result<RetentionReport> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let files = list_log_files(dir, LOG_EXTENSION, Some(target))?;
    Ok(prune(files, max_files))
}
