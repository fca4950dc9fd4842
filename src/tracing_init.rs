//! Optional setup of the `tracing` subscriber the sink reports through.
//!
//! The sink never logs about itself into its own file. Its warnings and
//! errors go to whatever subscriber the host installed; hosts without one
//! can call [`init_diagnostics`].

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{DiagnosticsConfig, Error, Result};

/// Install a stderr subscriber for the sink's diagnostics.
///
/// `RUST_LOG` takes precedence over the configured level; `cli_verbose`
/// raises the crate's own level.
pub fn init_diagnostics(config: &DiagnosticsConfig, cli_verbose: Option<u8>) -> Result<()> {
    let spec = effective_filter_spec(config, cli_verbose);
    let env_filter = EnvFilter::try_new(&spec).map_err(|e| Error::Init(e.to_string()))?;

    let fmt_layer_builder = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true);

    let fmt_layer = if config.format == "json" {
        fmt_layer_builder.json().boxed()
    } else {
        fmt_layer_builder.boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Init(e.to_string()))?;

    Ok(())
}

/// Determine the effective filter, considering config and CLI overrides.
fn effective_filter_spec(config: &DiagnosticsConfig, cli_verbose: Option<u8>) -> String {
    if let Ok(rust_log) = std::env::var("RUST_LOG")
        && !rust_log.is_empty()
    {
        return rust_log;
    }

    if let Some(verbose) = cli_verbose {
        return match verbose {
            0 => config.level.clone(),
            1 => format!("{},logkeeper=debug", config.level),
            2 => format!("{},logkeeper=trace", config.level),
            _ => "trace".to_string(),
        };
    }

    if config.level.is_empty() {
        "warn,logkeeper=warn".to_string()
    } else {
        format!("{},logkeeper={}", config.level, config.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // RUST_LOG is process-wide
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_rust_log<T>(value: Option<&str>, f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let prev = std::env::var_os("RUST_LOG");
        unsafe {
            match value {
                Some(v) => std::env::set_var("RUST_LOG", v),
                None => std::env::remove_var("RUST_LOG"),
            }
        }
        let out = f();
        unsafe {
            match prev {
                Some(v) => std::env::set_var("RUST_LOG", v),
                None => std::env::remove_var("RUST_LOG"),
            }
        }
        out
    }

    #[test]
    fn rust_log_overrides_config_level() {
        let cfg = DiagnosticsConfig::new().with_level("info");
        let spec = with_rust_log(Some("trace"), || effective_filter_spec(&cfg, Some(1)));
        assert_eq!(spec, "trace");
    }

    #[test]
    fn cfg_level_used_when_no_rust_log() {
        let cfg = DiagnosticsConfig::new().with_level("warn");
        with_rust_log(Some(""), || {
            assert_eq!(effective_filter_spec(&cfg, None), "warn,logkeeper=warn");
            assert_eq!(effective_filter_spec(&cfg, Some(0)), "warn");
            assert_eq!(effective_filter_spec(&cfg, Some(1)), "warn,logkeeper=debug");
            assert_eq!(effective_filter_spec(&cfg, Some(2)), "warn,logkeeper=trace");
            assert_eq!(effective_filter_spec(&cfg, Some(5)), "trace");
        });
    }

    #[test]
    fn empty_level_falls_back_to_warn() {
        let cfg = DiagnosticsConfig::new().with_level("");
        let spec = with_rust_log(None, || effective_filter_spec(&cfg, None));
        assert_eq!(spec, "warn,logkeeper=warn");
    }

    #[test]
    fn init_diagnostics_does_not_panic() {
        let cfg = DiagnosticsConfig::new().with_format("json");
        // may fail if a subscriber is already installed, but must not panic
        let result = with_rust_log(None, || init_diagnostics(&cfg, None));
        assert!(result.is_ok() || matches!(result, Err(Error::Init(_))));
    }
}
