use crate::env::{env_or, DIAGNOSTICS_FILTER_ENV, FORCE_COLOR_ENV, NO_COLOR_ENV};
use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Configuration of the subscriber that prints this crate's diagnostics.
///
/// **Fields**
/// - `filter`: `tracing` filter directive, e.g. `"info"` or
///   `"trace_log_dispatch=warn"`. Invalid directives fall back to `info`.
/// - `ansi`: colorize level prefixes.
/// - `with_target`: include the event target in each line.
#[derive(Clone, Debug)]
pub struct DiagnosticsConfig {
    pub filter: String,
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: std::io::stderr().is_terminal(),
            with_target: true,
        }
    }
}

impl DiagnosticsConfig {
    /// Honors `TRACE_LOG_DIAGNOSTICS` for the filter, and the usual
    /// `NO_COLOR` / `FORCE_COLOR` switches for colors (`NO_COLOR` wins).
    pub fn from_env() -> Self {
        let ansi = if std::env::var_os(NO_COLOR_ENV).is_some() {
            false
        } else if std::env::var_os(FORCE_COLOR_ENV).is_some() {
            true
        } else {
            std::io::stderr().is_terminal()
        };

        Self {
            filter: env_or(DIAGNOSTICS_FILTER_ENV, "info"),
            ansi,
            with_target: true,
        }
    }
}

/// Error returned when a global subscriber is already installed.
#[derive(thiserror::Error, Debug)]
#[error("failed to install diagnostics subscriber: {0}")]
pub struct InitError(#[from] tracing::subscriber::SetGlobalDefaultError);

/// Install a global `fmt` subscriber writing diagnostics to stderr.
///
/// Stdout is left to the console driver so trace records and diagnostics
/// never interleave on the same stream.
pub fn try_init_diagnostics(config: DiagnosticsConfig) -> Result<(), InitError> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(config.with_target);
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Like [`try_init_diagnostics`], but leaves an already-installed
/// subscriber in place.
pub fn init_diagnostics(config: DiagnosticsConfig) {
    let _ = try_init_diagnostics(config);
}
