use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use crate::queue::PendingQueue;
use crate::{Config, Error, Result, RetentionPolicy, retention};

/// Callback receiving every failure the sink reports.
pub type ErrorObserver = Arc<dyn Fn(&Error) + Send + Sync>;

/// State owned by whichever thread holds the flush path.
#[derive(Debug, Default)]
struct FlushState {
    /// The directory has been prepared (created if needed, retention run).
    dir_ready: bool,
}

/// Appends queued lines to the log file.
///
/// Producers only touch the queue. File I/O happens under the flush lock, so
/// at most one thread writes to the file at a time.
pub struct FileSink {
    /// Path of the log file.
    path: PathBuf,
    /// Retained file limit, including the sink's own file.
    max_files: usize,
    /// When retention runs.
    retention: RetentionPolicy,
    /// Lines waiting for the next flush.
    queue: PendingQueue,
    /// Serializes flushes.
    flush_lock: Mutex<FlushState>,
    observer: Option<ErrorObserver>,
}

impl FileSink {
    /// Create a sink for the file described by `config`. Nothing touches the
    /// filesystem until the first flush.
    pub fn new(config: &Config) -> Self {
        Self {
            path: config.path().to_path_buf(),
            max_files: config.max_stored_files() as usize,
            retention: config.retention(),
            queue: PendingQueue::new(),
            flush_lock: Mutex::new(FlushState::default()),
            observer: None,
        }
    }

    /// Route reported failures to `observer` in addition to `tracing`.
    pub fn with_observer(mut self, observer: ErrorObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Queue a formatted line.
    pub fn enqueue(&self, line: String) {
        self.queue.enqueue(line);
    }

    /// Number of lines not yet written.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Flush unless another thread is already flushing.
    ///
    /// A thread that finds the flush lock taken returns at once; the holder
    /// re-checks the queue after releasing the lock and flushes again if
    /// lines arrived in the meantime.
    pub fn try_flush(&self) -> Result<()> {
        loop {
            let mut state = match self.flush_lock.try_lock() {
                Ok(state) => state,
                Err(TryLockError::WouldBlock) => return Ok(()),
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            };
            self.flush_locked(&mut state)?;
            drop(state);

            if self.queue.is_empty() {
                return Ok(());
            }
        }
    }

    /// Flush, waiting for any flush in progress to finish first.
    pub fn flush(&self) -> Result<()> {
        let mut state = self
            .flush_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.flush_locked(&mut state)
    }

    fn flush_locked(&self, state: &mut FlushState) -> Result<()> {
        // nothing queued: leave the filesystem alone
        if self.queue.is_empty() {
            return Ok(());
        }

        self.prepare_directory(state)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| Error::Open {
                path: self.path.clone(),
                source,
            })?;

        let lines = self.queue.drain_all();
        let mut writer = BufWriter::new(file);
        let written = lines
            .iter()
            .try_for_each(|line| write_line(&mut writer, line))
            .and_then(|()| writer.flush());

        if let Err(source) = written {
            // the buffer may have reached the file in part; keep the whole batch
            self.queue.requeue(lines);
            return Err(Error::Write {
                path: self.path.clone(),
                source,
            });
        }

        writer.get_ref().sync_data().map_err(|source| Error::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Create the directory if needed and run retention when the policy
    /// asks for it.
    fn prepare_directory(&self, state: &mut FlushState) -> Result<()> {
        let dir = self.directory();
        let missing = !dir.is_dir();

        if missing {
            fs::create_dir_all(dir).map_err(|source| Error::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
            tracing::debug!(dir = %dir.display(), "created log directory");
        }

        let enforce = match self.retention {
            RetentionPolicy::OnDirectoryCreation => missing || !state.dir_ready,
            RetentionPolicy::EveryFlush => true,
        };
        state.dir_ready = true;

        if enforce {
            self.enforce_retention();
        }
        Ok(())
    }

    fn enforce_retention(&self) {
        match retention::enforce(&self.path, self.max_files) {
            Ok(report) => {
                for failure in &report.failures {
                    self.notify(failure);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to scan log directory for retention");
                self.notify(&e);
            }
        }
    }

    /// Report a failure on the host's channels. Never writes into the sink.
    pub fn report(&self, error: &Error) {
        tracing::error!(file = %self.path.display(), error = %error, "log sink failure");
        self.notify(error);
    }

    fn notify(&self, error: &Error) {
        if let Some(observer) = &self.observer {
            observer(error);
        }
    }
}

impl fmt::Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("max_files", &self.max_files)
            .field("retention", &self.retention)
            .field("pending", &self.queue.len())
            .finish()
    }
}

fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")
}
