//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Tracing subscriber initialisation."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::str::FromStr;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "NETPULSE_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Flush guards for the non-blocking writers; held for the process lifetime.
static WRITER_GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Available stdout log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" | "structured-json" => Ok(LogFormat::StructuredJson),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Resolve the filter directive: `NETPULSE_LOG`, then `RUST_LOG`, then `info`.
fn build_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

/// Initialise the global subscriber: a stdout layer in the configured format
/// plus a daily rolling JSON file under `config.directory`.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!("unable to create log directory {}", config.directory.display())
    })?;
    let file_name = format!(
        "{}.log",
        config.file_prefix.as_deref().unwrap_or(service_name)
    );
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, file_name));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout = fmt::layer().with_timer(UtcTime::rfc_3339());
    let stdout = match config.format {
        LogFormat::StructuredJson => stdout
            .json()
            .with_target(false)
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => stdout.with_writer(stdout_writer).boxed(),
    };
    let file = fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(file_writer)
        .boxed();

    let installed = tracing_subscriber::registry()
        .with(build_filter())
        .with(stdout)
        .with(file)
        .try_init()
        .is_ok();
    if installed {
        let _ = WRITER_GUARDS.set([file_guard, stdout_guard]);
        info!(
            service = service_name,
            log_dir = %config.directory.display(),
            format = ?config.format,
            "tracing initialised"
        );
    }
    Ok(())
}
