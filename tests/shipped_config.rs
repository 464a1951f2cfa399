//! ---
//! np_section: "15-testing-qa-runbook"
//! np_subsection: "integration-tests"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Checks on the configuration shipped with the repository."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;
use std::time::Duration;

use netpulse_common::AppConfig;

fn read(path: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let full = Path::new(manifest_dir).join("..").join(path);
    fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", full.display(), err))
}

#[test]
fn shipped_config_enables_all_populations_with_stock_cadences() {
    let mut config = AppConfig::parse(&read("configs/netpulse.toml")).unwrap();
    assert!(config.validate().is_err(), "store token must come from the environment");
    config.apply_overrides(|key| {
        (key == AppConfig::ENV_STORE_TOKEN).then(|| "from-env".to_owned())
    });
    config.validate().unwrap();
    assert_eq!(
        config.population_names(),
        ["access_points", "switches", "sensor"]
    );
    let aps = config.access_points.as_ref().unwrap();
    assert_eq!(aps.count, 10);
    assert_eq!(aps.interval, Duration::from_secs(30));
    let switches = config.switches.as_ref().unwrap();
    assert_eq!(switches.names, ["icx8100", "icx8200"]);
    assert_eq!(switches.interval, Duration::from_secs(60));
    let sensor = config.sensor.as_ref().unwrap();
    assert_eq!(sensor.port, 502);
    assert_eq!(sensor.location, "server_room");
}

#[test]
fn shipped_config_carries_no_real_token() {
    let raw = read("configs/netpulse.toml");
    assert!(
        !raw.lines().any(|line| line.trim_start().starts_with("token")),
        "the token belongs in NETPULSE_STORE_TOKEN, not the shipped file"
    );
}
