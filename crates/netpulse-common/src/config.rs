//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Pipeline configuration loading and validation."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use netpulse_model::{ApProfile, ChassisProfile, PortProfile, SwitchLayout};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds, DurationSecondsWithFrac};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

/// Largest register block a single Modbus holding-register read may request.
const MAX_REGISTER_COUNT: u16 = 125;

fn default_max_attempts() -> usize {
    4
}

fn default_base_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_millis(8_000)
}

fn default_jitter() -> Duration {
    Duration::from_millis(100)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_ap_count() -> usize {
    10
}

fn default_ap_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_ap_locations() -> Vec<String> {
    [
        "Lobby",
        "Cafeteria",
        "Conf-Room-A",
        "Conf-Room-B",
        "Warehouse",
        "Office-Wing-1",
        "Office-Wing-2",
        "Hallway",
        "Executive-Suite",
        "Break-Room",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

fn default_high_density_locations() -> Vec<String> {
    ["Lobby", "Cafeteria", "Conf-Room-A"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_switch_names() -> Vec<String> {
    vec!["icx8100".to_owned(), "icx8200".to_owned()]
}

fn default_switch_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_sensor_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_sensor_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_sensor_location() -> String {
    "server_room".to_owned()
}

fn default_register_count() -> u16 {
    2
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_io_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9898))
}

/// Primary configuration object for the NetPulse pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub access_points: Option<AccessPointsConfig>,
    #[serde(default)]
    pub switches: Option<SwitchesConfig>,
    #[serde(default)]
    pub sensor: Option<SensorConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
    /// SHA-256 of the file contents, hex encoded.
    pub digest: String,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "NETPULSE_CONFIG";
    pub const ENV_STORE_URL: &'static str = "NETPULSE_STORE_URL";
    pub const ENV_STORE_ORG: &'static str = "NETPULSE_STORE_ORG";
    pub const ENV_STORE_BUCKET: &'static str = "NETPULSE_STORE_BUCKET";
    pub const ENV_STORE_TOKEN: &'static str = "NETPULSE_STORE_TOKEN";

    /// Load configuration from disk, respecting the `NETPULSE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Resolve the file (explicit env path first, then `candidates` in order),
    /// parse it, apply store overrides from the environment and validate.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Self::load_path(PathBuf::from(env_path));
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                return Self::load_path(candidate.as_ref().to_path_buf());
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Load one specific file, bypassing discovery.
    pub fn load_path(path: PathBuf) -> Result<LoadedAppConfig> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let mut config = Self::parse(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(LoadedAppConfig {
            config,
            source: path,
            digest: digest_hex(contents.as_bytes()),
        })
    }

    /// Parse TOML without applying overrides or validating.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str::<AppConfig>(content).context("failed to parse configuration")
    }

    /// Replace store connection settings with values supplied by `lookup`.
    ///
    /// Blank values are ignored so an exported-but-empty variable does not
    /// erase a file setting.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = fetch(Self::ENV_STORE_URL) {
            self.store.url = Some(url);
        }
        if let Some(org) = fetch(Self::ENV_STORE_ORG) {
            self.store.org = Some(org);
        }
        if let Some(bucket) = fetch(Self::ENV_STORE_BUCKET) {
            self.store.bucket = Some(bucket);
        }
        if let Some(token) = fetch(Self::ENV_STORE_TOKEN) {
            self.store.token = Some(Secret::new(token));
        }
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.store.endpoint()?;
        self.writer.validate()?;
        if self.access_points.is_none() && self.switches.is_none() && self.sensor.is_none() {
            bail!("configuration must enable at least one of [access_points], [switches] or [sensor]");
        }
        if let Some(access_points) = &self.access_points {
            access_points.validate()?;
        }
        if let Some(switches) = &self.switches {
            switches.validate()?;
        }
        if let Some(sensor) = &self.sensor {
            sensor.validate()?;
        }
        Ok(())
    }

    /// Names of the populations this configuration enables, in start order.
    pub fn population_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.access_points.is_some() {
            names.push("access_points");
        }
        if self.switches.is_some() {
            names.push("switches");
        }
        if self.sensor.is_some() {
            names.push("sensor");
        }
        names
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// String whose value never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// InfluxDB connection settings as written in the file. None have defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub token: Option<Secret>,
}

/// Fully resolved store connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEndpoint {
    pub url: Url,
    pub org: String,
    pub bucket: String,
    pub token: Secret,
}

impl StoreConfig {
    /// Resolve into an endpoint, failing when any parameter is missing or blank.
    pub fn endpoint(&self) -> Result<StoreEndpoint> {
        fn required<'a>(value: Option<&'a str>, key: &str, env: &str) -> Result<&'a str> {
            match value.map(str::trim) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(anyhow!("store.{key} is required (set it in [store] or {env})")),
            }
        }

        let url = required(self.url.as_deref(), "url", AppConfig::ENV_STORE_URL)?;
        let url = Url::parse(url).with_context(|| format!("store.url '{url}' is not a valid URL"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("store.url must use http or https, got '{}'", url.scheme());
        }
        let org = required(self.org.as_deref(), "org", AppConfig::ENV_STORE_ORG)?;
        let bucket = required(self.bucket.as_deref(), "bucket", AppConfig::ENV_STORE_BUCKET)?;
        let token = required(
            self.token.as_ref().map(Secret::expose),
            "token",
            AppConfig::ENV_STORE_TOKEN,
        )?;
        Ok(StoreEndpoint {
            url,
            org: org.to_owned(),
            bucket: bucket.to_owned(),
            token: Secret::new(token),
        })
    }
}

/// Retry and request settings for the batch writer.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(rename = "base_delay_ms", default = "default_base_delay")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", default = "default_max_delay")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_delay: Duration,
    #[serde(rename = "jitter_ms", default = "default_jitter")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub jitter: Duration,
    #[serde(default = "default_request_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            jitter: default_jitter(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl WriterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("writer.max_attempts must be at least 1");
        }
        if self.base_delay > self.max_delay {
            bail!(
                "writer.base_delay_ms ({}) exceeds writer.max_delay_ms ({})",
                self.base_delay.as_millis(),
                self.max_delay.as_millis()
            );
        }
        if self.request_timeout.is_zero() {
            bail!("writer.request_timeout must be non-zero");
        }
        Ok(())
    }
}

/// Simulated wireless access point population.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPointsConfig {
    #[serde(default = "default_ap_count")]
    pub count: usize,
    #[serde(default = "default_ap_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub interval: Duration,
    #[serde(default = "default_ap_locations")]
    pub locations: Vec<String>,
    #[serde(default = "default_high_density_locations")]
    pub high_density_locations: Vec<String>,
    #[serde(default)]
    pub profile: ApProfile,
}

impl Default for AccessPointsConfig {
    fn default() -> Self {
        Self {
            count: default_ap_count(),
            interval: default_ap_interval(),
            locations: default_ap_locations(),
            high_density_locations: default_high_density_locations(),
            profile: ApProfile::default(),
        }
    }
}

impl AccessPointsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            bail!("access_points.count must be at least 1");
        }
        if self.interval.is_zero() {
            bail!("access_points.interval must be non-zero");
        }
        if self.locations.iter().all(|l| l.trim().is_empty()) {
            bail!("access_points.locations must name at least one location");
        }
        if let Some(blank) = self.locations.iter().position(|l| l.trim().is_empty()) {
            bail!("access_points.locations[{blank}] is empty");
        }
        for location in &self.high_density_locations {
            if !self.locations.contains(location) {
                bail!("access_points.high_density_locations entry '{location}' is not in locations");
            }
        }
        self.profile.validate()?;
        Ok(())
    }

    pub fn is_high_density(&self, location: &str) -> bool {
        self.high_density_locations.iter().any(|l| l == location)
    }
}

/// Simulated switch population.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchesConfig {
    #[serde(default = "default_switch_names")]
    pub names: Vec<String>,
    #[serde(default = "default_switch_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub interval: Duration,
    #[serde(default)]
    pub layout: SwitchLayout,
    #[serde(default)]
    pub chassis: ChassisProfile,
    #[serde(default)]
    pub ports: PortProfile,
}

impl Default for SwitchesConfig {
    fn default() -> Self {
        Self {
            names: default_switch_names(),
            interval: default_switch_interval(),
            layout: SwitchLayout::default(),
            chassis: ChassisProfile::default(),
            ports: PortProfile::default(),
        }
    }
}

impl SwitchesConfig {
    pub fn validate(&self) -> Result<()> {
        if self.names.is_empty() {
            bail!("switches.names must list at least one switch");
        }
        let mut seen = HashSet::new();
        for name in &self.names {
            if name.trim().is_empty() {
                bail!("switches.names contains an empty name");
            }
            if !seen.insert(name.as_str()) {
                bail!("switches.names contains '{name}' twice");
            }
        }
        if self.interval.as_secs() == 0 {
            bail!("switches.interval must be at least one second");
        }
        self.layout.validate()?;
        self.chassis.validate()?;
        self.ports.validate()?;
        Ok(())
    }
}

/// Real environmental sensor reached over Modbus/TCP.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub host: String,
    #[serde(default = "default_sensor_port")]
    pub port: u16,
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    #[serde(default = "default_sensor_interval")]
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub interval: Duration,
    #[serde(default = "default_sensor_location")]
    pub location: String,
    #[serde(default)]
    pub start_register: u16,
    #[serde(default = "default_register_count")]
    pub register_count: u16,
    #[serde(default = "default_connect_timeout")]
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub connect_timeout: Duration,
    #[serde(default = "default_io_timeout")]
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub io_timeout: Duration,
    /// Stop the sensor population after this many consecutive skipped ticks.
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,
}

impl SensorConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_sensor_port(),
            unit_id: default_unit_id(),
            interval: default_sensor_interval(),
            location: default_sensor_location(),
            start_register: 0,
            register_count: default_register_count(),
            connect_timeout: default_connect_timeout(),
            io_timeout: default_io_timeout(),
            max_consecutive_failures: None,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("sensor.host is required");
        }
        if self.location.trim().is_empty() {
            bail!("sensor.location must not be empty");
        }
        if self.interval.is_zero() {
            bail!("sensor.interval must be non-zero");
        }
        if !(2..=MAX_REGISTER_COUNT).contains(&self.register_count) {
            bail!(
                "sensor.register_count must be between 2 and {MAX_REGISTER_COUNT}, got {}",
                self.register_count
            );
        }
        if self.io_timeout.is_zero() || self.connect_timeout.is_zero() {
            bail!("sensor timeouts must be non-zero");
        }
        if self.max_consecutive_failures == Some(0) {
            bail!("sensor.max_consecutive_failures must be at least 1 when set");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the per-population RNGs; entropy when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const MINIMAL: &str = r#"
        [store]
        url = "http://localhost:8086"
        org = "my-org"
        bucket = "my-bucket"
        token = "secret-token"

        [access_points]
    "#;

    #[test]
    fn minimal_file_uses_defaults() {
        let config: AppConfig = MINIMAL.parse().unwrap();
        let aps = config.access_points.as_ref().unwrap();
        assert_eq!(aps.count, 10);
        assert_eq!(aps.interval, Duration::from_secs(30));
        assert_eq!(aps.locations.len(), 10);
        assert!(aps.is_high_density("Lobby"));
        assert!(!aps.is_high_density("Warehouse"));
        assert_eq!(config.writer, WriterConfig::default());
        assert_eq!(config.writer.max_attempts, 4);
        assert!(config.switches.is_none());
        assert_eq!(config.population_names(), ["access_points"]);
    }

    #[test]
    fn missing_store_parameter_is_fatal() {
        let err = r#"
            [store]
            url = "http://localhost:8086"
            org = "my-org"
            bucket = "my-bucket"
            [switches]
        "#
        .parse::<AppConfig>()
        .unwrap_err();
        assert!(format!("{err:#}").contains("store.token"));
    }

    #[test]
    fn at_least_one_population_is_required() {
        let content = MINIMAL.replace("[access_points]", "");
        let err = content.parse::<AppConfig>().unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn env_overrides_replace_store_settings() {
        let mut config = AppConfig::parse("[switches]").unwrap();
        assert!(config.validate().is_err());
        let env: HashMap<&str, &str> = [
            (AppConfig::ENV_STORE_URL, "https://influx.example:8086"),
            (AppConfig::ENV_STORE_ORG, "netops"),
            (AppConfig::ENV_STORE_BUCKET, "telemetry"),
            (AppConfig::ENV_STORE_TOKEN, "abc"),
        ]
        .into_iter()
        .collect();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        config.validate().unwrap();
        let endpoint = config.store.endpoint().unwrap();
        assert_eq!(endpoint.org, "netops");
        assert_eq!(endpoint.token.expose(), "abc");
        assert!(!format!("{endpoint:?}").contains("abc"));
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let mut config = AppConfig::parse(MINIMAL).unwrap();
        config.apply_overrides(|_| Some("   ".to_owned()));
        assert_eq!(config.store.org.as_deref(), Some("my-org"));
    }

    #[test]
    fn writer_durations_are_milliseconds() {
        let content = format!(
            "{MINIMAL}\n[writer]\nmax_attempts = 6\nbase_delay_ms = 50\nmax_delay_ms = 400\njitter_ms = 0\n"
        );
        let config: AppConfig = content.parse().unwrap();
        assert_eq!(config.writer.max_attempts, 6);
        assert_eq!(config.writer.base_delay, Duration::from_millis(50));
        assert_eq!(config.writer.max_delay, Duration::from_millis(400));
        assert!(config.writer.jitter.is_zero());
    }

    #[test]
    fn invalid_writer_settings_are_rejected() {
        let content = format!("{MINIMAL}\n[writer]\nbase_delay_ms = 9000\nmax_delay_ms = 10\n");
        assert!(content.parse::<AppConfig>().is_err());
        let content = format!("{MINIMAL}\n[writer]\nmax_attempts = 0\n");
        assert!(content.parse::<AppConfig>().is_err());
    }

    #[test]
    fn sensor_section_requires_host_and_sane_registers() {
        let content = format!("{MINIMAL}\n[sensor]\nhost = \"192.168.0.160\"\ninterval = 0.5\n");
        let config: AppConfig = content.parse().unwrap();
        let sensor = config.sensor.unwrap();
        assert_eq!(sensor.address(), "192.168.0.160:502");
        assert_eq!(sensor.interval, Duration::from_millis(500));
        assert_eq!(sensor.unit_id, 1);
        assert_eq!(sensor.location, "server_room");
        assert_eq!(sensor.max_consecutive_failures, None);

        let content = format!("{MINIMAL}\n[sensor]\nhost = \"10.0.0.5\"\nregister_count = 1\n");
        assert!(content.parse::<AppConfig>().is_err());
        let content = format!("{MINIMAL}\n[sensor]\nport = 502\n");
        assert!(content.parse::<AppConfig>().is_err());
    }

    #[test]
    fn switch_profiles_can_be_overridden() {
        let content = format!(
            r#"{MINIMAL}
            [switches]
            names = ["core-1"]
            [switches.layout]
            port_count = 48
            uplink_ports = [47, 48]
            [switches.chassis.fan_failure]
            kind = "bernoulli"
            p = 0.5
            "#
        );
        let config: AppConfig = content.parse().unwrap();
        let switches = config.switches.unwrap();
        assert_eq!(switches.layout.port_count, 48);
        assert_eq!(switches.layout.poe_ports.len(), 12);
        assert_eq!(
            switches.chassis.fan_failure,
            netpulse_model::Distribution::bernoulli(0.5)
        );
    }

    #[test]
    fn duplicate_switch_names_are_rejected() {
        let content = format!("{MINIMAL}\n[switches]\nnames = [\"a\", \"a\"]\n");
        assert!(content.parse::<AppConfig>().is_err());
    }

    #[test]
    fn unknown_high_density_location_is_rejected() {
        let content = MINIMAL.replace(
            "[access_points]",
            "[access_points]\nhigh_density_locations = [\"Roof\"]",
        );
        assert!(content.parse::<AppConfig>().is_err());
    }

    #[test]
    fn digest_is_stable_hex() {
        let digest = digest_hex(b"netpulse");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, digest_hex(b"netpulse"));
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
