//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "binary"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Binary entrypoint for the NetPulse daemon."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use netpulse_common::time::format_duration;
use netpulse_common::{init_tracing, AppConfig, LoadedAppConfig, LogFormat, VersionInfo};
use netpulse_core::Pipeline;
use netpulse_metrics::{new_registry, spawn_http_server, DaemonMetrics, PipelineMetrics};
use netpulse_net::{InfluxSettings, InfluxStore, MetricsStore};
use tracing::{error, info};

const DEFAULT_CONFIG: &str = "configs/netpulse.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    version = concat!("NetPulse ", env!("CARGO_PKG_VERSION"), " (", env!("VERGEN_GIT_SHA"), ")"),
    about = "NetPulse telemetry daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "FORMAT", help = "Stdout log format: json or pretty")]
    log_format: Option<LogFormat>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Commands {
    #[command(about = "Start the pipeline and run until SIGINT/SIGTERM")]
    Run,
    #[command(about = "Validate the configuration and list the populations it enables")]
    Check,
    #[command(about = "Print build information")]
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    let command = cli.command.unwrap_or(Commands::Run);
    if cli.version || matches!(command, Commands::Version) {
        println!("{}", version.extended());
        return Ok(());
    }

    let load_started = Instant::now();
    let loaded = load_config(cli.config.as_ref())?;
    let load_duration = load_started.elapsed();

    if let Commands::Check = command {
        print!("{}", render_check(&loaded));
        return Ok(());
    }

    let LoadedAppConfig {
        mut config,
        source,
        digest,
    } = loaded;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_tracing("netpulsed", &config.logging)?;
    info!(
        version = %version.banner(),
        config_path = %source.display(),
        config_digest = %digest,
        populations = ?config.population_names(),
        "configuration loaded"
    );

    let registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(registry.clone())?;
    daemon_metrics.observe_config_load(load_duration.as_secs_f64());
    daemon_metrics.inc_start();
    daemon_metrics.set_build_info(version.semver, version.git_sha);

    let result = run_daemon(config, PipelineMetrics::new(registry.clone())?, registry).await;
    if let Err(err) = &result {
        error!(error = %format!("{err:#}"), "daemon stopped with error");
    }
    result
}

fn load_config(explicit: Option<&PathBuf>) -> Result<LoadedAppConfig> {
    match explicit {
        Some(path) => AppConfig::load_path(path.clone()),
        None => AppConfig::load_with_source(&[PathBuf::from(DEFAULT_CONFIG)]),
    }
}

async fn run_daemon(
    config: AppConfig,
    pipeline_metrics: PipelineMetrics,
    registry: netpulse_metrics::SharedRegistry,
) -> Result<()> {
    let metrics_server = if config.metrics.enabled {
        let server = spawn_http_server(registry, config.metrics.listen).await?;
        info!(address = %server.addr(), "metrics exporter enabled");
        Some(server)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let endpoint = config.store.endpoint()?;
    let store = InfluxStore::new(InfluxSettings {
        url: endpoint.url,
        org: endpoint.org,
        bucket: endpoint.bucket,
        token: endpoint.token.expose().to_owned(),
        timeout: config.writer.request_timeout,
    })
    .context("building metrics store client")?;
    info!(store = %store.describe(), "metrics store configured");

    let handle = Pipeline::from_config(&config, Arc::new(store), None)?
        .with_metrics(pipeline_metrics)
        .start()
        .await?;
    info!(populations = ?handle.populations(), "daemon running; waiting for termination signal");

    let result = handle.run_until(shutdown_signal()).await;

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    result
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("waiting for ctrl-c")?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    Ok("ctrl-c")
}

fn render_check(loaded: &LoadedAppConfig) -> String {
    let config = &loaded.config;
    let mut out = format!(
        "configuration OK: {} (sha256 {})\n",
        loaded.source.display(),
        loaded.digest
    );
    if let Some(url) = &config.store.url {
        out.push_str(&format!(
            "store: {url} org={} bucket={}\n",
            config.store.org.as_deref().unwrap_or_default(),
            config.store.bucket.as_deref().unwrap_or_default()
        ));
    }
    if let Some(aps) = &config.access_points {
        out.push_str(&format!(
            "access_points: {} APs every {} across {} locations ({} high-density)\n",
            aps.count,
            format_duration(aps.interval),
            aps.locations.len(),
            aps.high_density_locations.len()
        ));
    }
    if let Some(switches) = &config.switches {
        out.push_str(&format!(
            "switches: {} every {}, {} ports each\n",
            switches.names.join(", "),
            format_duration(switches.interval),
            switches.layout.port_count
        ));
    }
    if let Some(sensor) = &config.sensor {
        out.push_str(&format!(
            "sensor: {} unit {} every {} at {}\n",
            sensor.address(),
            sensor.unit_id,
            format_duration(sensor.interval),
            sensor.location
        ));
    }
    out
}
