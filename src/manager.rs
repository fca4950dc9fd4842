use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use crate::banner::{BannerSource, EnvironmentSnapshot};
use crate::config::local_now;
use crate::writer::{ErrorObserver, FileSink};
use crate::{Config, Formatter, LogEntry, Result, Severity, SinkConfig};

/// Where flushes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// The writing thread flushes before `write` returns, unless another
    /// thread is already flushing.
    #[default]
    Inline,
    /// A dedicated worker thread flushes; `write` only queues.
    Background,
}

#[derive(Debug, Default)]
struct Signal {
    pending: bool,
    shutdown: bool,
}

struct Shared {
    sink: FileSink,
    signal: Mutex<Signal>,
    wake: Condvar,
}

impl Shared {
    fn signal(&self) -> MutexGuard<'_, Signal> {
        self.signal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush_and_report(&self) {
        if let Err(e) = self.sink.flush() {
            self.sink.report(&e);
        }
    }
}

/// Thread-safe entry point of the sink.
///
/// Formats each entry, queues it and hands it to the file sink. `write`
/// never fails: I/O problems are reported through `tracing` and the
/// optional error observer, and undelivered lines stay queued until the
/// next flush.
pub struct LogManager {
    config: Config,
    formatter: Formatter,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl LogManager {
    /// Create a manager, writing the environment banner if enabled.
    pub fn new(config: SinkConfig) -> Self {
        Self::with_banner(config, &EnvironmentSnapshot::capture())
    }

    /// Create a manager with a custom banner source.
    pub fn with_banner(config: SinkConfig, banner: &dyn BannerSource) -> Self {
        Self::build(config.resolve(), None, banner)
    }

    /// Create a manager that also hands every reported failure to
    /// `observer`.
    pub fn with_observer(config: SinkConfig, observer: ErrorObserver) -> Self {
        Self::build(
            config.resolve(),
            Some(observer),
            &EnvironmentSnapshot::capture(),
        )
    }

    /// Create a manager from an already validated configuration.
    pub fn from_config(config: Config) -> Self {
        Self::build(config, None, &EnvironmentSnapshot::capture())
    }

    pub(crate) fn build(
        config: Config,
        observer: Option<ErrorObserver>,
        banner: &dyn BannerSource,
    ) -> Self {
        let mut sink = FileSink::new(&config);
        if let Some(observer) = observer {
            sink = sink.with_observer(observer);
        }

        let shared = Arc::new(Shared {
            sink,
            signal: Mutex::new(Signal::default()),
            wake: Condvar::new(),
        });

        let worker = match config.flush_mode() {
            FlushMode::Inline => None,
            FlushMode::Background => spawn_worker(&shared),
        };

        let manager = Self {
            formatter: Formatter::new(&config),
            config,
            shared,
            worker,
        };

        if manager.config.write_initial_banner() {
            manager.write(banner.banner(), Severity::Info);
        }

        manager
    }

    /// The validated configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write `message` with the configured prefixes.
    pub fn write(&self, message: impl Into<String>, severity: Severity) {
        self.write_entry(LogEntry::new(severity, message));
    }

    /// Write an entry, honouring its per-call prefix overrides.
    pub fn write_entry(&self, entry: LogEntry) {
        let line = self.formatter.format(&entry, local_now());
        self.shared.sink.enqueue(line);

        if self.worker.is_some() {
            let mut signal = self.shared.signal();
            signal.pending = true;
            self.shared.wake.notify_one();
        } else if let Err(e) = self.shared.sink.try_flush() {
            self.shared.sink.report(&e);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.write(message, Severity::Info);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.write(message, Severity::Warning);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.write(message, Severity::Error);
    }

    pub fn fatal(&self, message: impl Into<String>) {
        self.write(message, Severity::Fatal);
    }

    /// Flush now and return the failure instead of reporting it.
    ///
    /// Waits for a flush already in progress on another thread.
    pub fn flush(&self) -> Result<()> {
        self.shared.sink.flush()
    }

    /// Number of lines queued but not yet written.
    pub fn pending(&self) -> usize {
        self.shared.sink.pending()
    }

    /// Stop the background worker (if any) after a final flush.
    ///
    /// Dropping the manager does the same.
    pub fn shutdown(self) {
        drop(self);
    }

    fn stop(&mut self) {
        match self.worker.take() {
            Some(worker) => {
                {
                    let mut signal = self.shared.signal();
                    signal.shutdown = true;
                    self.shared.wake.notify_one();
                }
                if worker.join().is_err() {
                    tracing::error!("log flush worker panicked");
                    self.shared.flush_and_report();
                }
            }
            None => {
                if self.shared.sink.pending() > 0 {
                    self.shared.flush_and_report();
                }
            }
        }
    }
}

impl Drop for LogManager {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new(SinkConfig::default())
    }
}

fn spawn_worker(shared: &Arc<Shared>) -> Option<JoinHandle<()>> {
    let shared_for_worker = Arc::clone(shared);
    match std::thread::Builder::new()
        .name("logkeeper-flush".to_string())
        .spawn(move || run_worker(shared_for_worker))
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            // inline flushing still delivers everything
            tracing::warn!(error = %e, "failed to start flush worker, flushing inline");
            None
        }
    }
}

fn run_worker(shared: Arc<Shared>) {
    loop {
        let shutdown = {
            let mut signal = shared.signal();
            while !signal.pending && !signal.shutdown {
                signal = shared
                    .wake
                    .wait(signal)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            signal.pending = false;
            signal.shutdown
        };

        shared.flush_and_report();

        if shutdown {
            break;
        }
    }
}
