//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "tests"
//! np_type: "test"
//! np_scope: "code"
//! np_description: "Pipeline scheduling, retry and shutdown behaviour on paused time."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use netpulse_common::{AccessPointsConfig, AppConfig, SensorConfig, SwitchesConfig};
use netpulse_core::Pipeline;
use netpulse_metrics::{new_registry, BatchResult, PipelineMetrics};
use netpulse_testharness::{FaultInjectingStore, ScriptedRead, ScriptedRegisterSource};

fn simulated_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.access_points = Some(AccessPointsConfig::default());
    config.switches = Some(SwitchesConfig::default());
    config.simulation.random_seed = Some(42);
    config
}

fn count(store: &FaultInjectingStore, measurement: &str) -> usize {
    store
        .delivered()
        .iter()
        .filter(|batch| batch.measurement(measurement).next().is_some())
        .count()
}

#[tokio::test(start_paused = true)]
async fn populations_tick_on_their_own_cadence() {
    let store = FaultInjectingStore::accepting();
    let metrics = PipelineMetrics::new(new_registry()).unwrap();
    let pipeline = Pipeline::from_config(&simulated_config(), Arc::new(store.clone()), None)
        .unwrap()
        .with_metrics(metrics.clone());
    assert_eq!(pipeline.population_names(), ["access_points", "switches"]);

    let handle = pipeline.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(95)).await;
    handle.shutdown().await.unwrap();

    assert_eq!(count(&store, "ruckus_ap_metrics"), 3);
    assert_eq!(count(&store, "switch_chassis_metrics"), 1);
    assert_eq!(metrics.ticks("access_points"), 3);
    assert_eq!(metrics.ticks("switches"), 1);
    assert_eq!(metrics.points_written("access_points"), 30);
    assert_eq!(metrics.points_written("switches"), 50);
}

#[tokio::test(start_paused = true)]
async fn transient_store_failures_are_retried_within_the_tick() {
    let store = FaultInjectingStore::flaky(2);
    let metrics = PipelineMetrics::new(new_registry()).unwrap();
    let mut config = simulated_config();
    config.switches = None;
    let handle = Pipeline::from_config(&config, Arc::new(store.clone()), None)
        .unwrap()
        .with_metrics(metrics.clone())
        .start()
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(35)).await;
    handle.shutdown().await.unwrap();

    assert_eq!(store.attempts(), 3);
    assert_eq!(store.delivered_batches(), 1);
    assert_eq!(
        metrics.batches("access_points", BatchResult::DeliveredWithRetry),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn an_unreachable_store_drops_batches_without_stopping_the_loop() {
    let store = FaultInjectingStore::unreachable();
    let metrics = PipelineMetrics::new(new_registry()).unwrap();
    let mut config = simulated_config();
    config.switches = None;
    let handle = Pipeline::from_config(&config, Arc::new(store.clone()), None)
        .unwrap()
        .with_metrics(metrics.clone())
        .start()
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(95)).await;
    handle.shutdown().await.unwrap();

    assert_eq!(store.attempts(), 3 * 4);
    assert_eq!(metrics.batches("access_points", BatchResult::Exhausted), 3);
    assert_eq!(metrics.points_dropped("access_points"), 30);
}

#[tokio::test(start_paused = true)]
async fn shutdown_abandons_a_batch_waiting_out_its_backoff() {
    let store = FaultInjectingStore::unreachable();
    let mut config = simulated_config();
    config.switches = None;
    config.writer.base_delay = Duration::from_secs(20);
    config.writer.max_delay = Duration::from_secs(20);
    let handle = Pipeline::from_config(&config, Arc::new(store.clone()), None)
        .unwrap()
        .start()
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(31)).await;
    let started = tokio::time::Instant::now();
    handle.shutdown().await.unwrap();

    assert_eq!(store.attempts(), 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn sensor_connect_failure_aborts_startup() {
    let mut config = AppConfig::default();
    config.sensor = Some(SensorConfig::new("10.0.0.9"));
    let result = Pipeline::from_config(
        &config,
        Arc::new(FaultInjectingStore::accepting()),
        Some(Box::new(ScriptedRegisterSource::unreachable())),
    )
    .unwrap()
    .start()
    .await;
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("preparing population 'sensor'"));
}

#[tokio::test(start_paused = true)]
async fn sensor_read_errors_skip_ticks_until_escalation() {
    netpulse_logging::init();
    let store = FaultInjectingStore::accepting();
    let metrics = PipelineMetrics::new(new_registry()).unwrap();
    let mut sensor = SensorConfig::new("10.0.0.9");
    sensor.interval = Duration::from_secs(1);
    sensor.max_consecutive_failures = Some(3);
    let source = ScriptedRegisterSource::new([ScriptedRead::Values(vec![250, 455])])
        .with_fallback(ScriptedRead::Timeout);
    let mut config = AppConfig::default();
    config.sensor = Some(sensor);

    let store_handle = Arc::new(store.clone());
    let mut handle = Pipeline::from_config(&config, store_handle, Some(Box::new(source)))
        .unwrap()
        .with_metrics(metrics.clone())
        .start()
        .await
        .unwrap();
    let failed = tokio::time::timeout(Duration::from_secs(10), handle.population_failed())
        .await
        .unwrap();
    assert_eq!(failed, "sensor");
    assert!(handle.shutdown().await.is_err());

    assert_eq!(store.delivered_points(), 1);
    assert_eq!(metrics.skipped_reads("sensor"), 2);
}

#[tokio::test(start_paused = true)]
async fn a_failed_sensor_leaves_other_populations_sampling() {
    let store = FaultInjectingStore::accepting();
    let mut config = simulated_config();
    config.switches = None;
    let mut sensor = SensorConfig::new("10.0.0.9");
    sensor.interval = Duration::from_secs(1);
    sensor.max_consecutive_failures = Some(3);
    config.sensor = Some(sensor);
    let source = ScriptedRegisterSource::new(std::iter::empty());

    let handle = Pipeline::from_config(&config, Arc::new(store.clone()), Some(Box::new(source)))
        .unwrap()
        .start()
        .await
        .unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(handle.run_until(async move {
        let _ = stop_rx.await;
        Ok("SIGTERM")
    }));

    // The sensor has escalated by now; access points have not ticked yet.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!running.is_finished());
    assert_eq!(count(&store, "ruckus_ap_metrics"), 0);

    tokio::time::sleep(Duration::from_secs(85)).await;
    assert!(!running.is_finished());
    assert_eq!(count(&store, "ruckus_ap_metrics"), 3);
    assert_eq!(count(&store, "environment"), 0);

    stop_tx.send(()).unwrap();
    let err = running.await.unwrap().unwrap_err();
    assert!(
        format!("{err:#}").contains("population(s) sensor stopped with errors"),
        "{err:#}"
    );
}

#[tokio::test(start_paused = true)]
async fn run_until_returns_when_every_population_has_failed() {
    let mut sensor = SensorConfig::new("10.0.0.9");
    sensor.interval = Duration::from_secs(1);
    sensor.max_consecutive_failures = Some(2);
    let mut config = AppConfig::default();
    config.sensor = Some(sensor);

    let handle = Pipeline::from_config(
        &config,
        Arc::new(FaultInjectingStore::accepting()),
        Some(Box::new(ScriptedRegisterSource::new(std::iter::empty()))),
    )
    .unwrap()
    .start()
    .await
    .unwrap();

    let stop = std::future::pending::<anyhow::Result<&'static str>>();
    let result = tokio::time::timeout(Duration::from_secs(30), handle.run_until(stop))
        .await
        .unwrap();
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("sensor"), "{err:#}");
}

#[tokio::test(start_paused = true)]
async fn run_until_stops_cleanly_on_request() {
    let store = FaultInjectingStore::accepting();
    let handle = Pipeline::from_config(&simulated_config(), Arc::new(store.clone()), None)
        .unwrap()
        .start()
        .await
        .unwrap();

    let stop = async {
        tokio::time::sleep(Duration::from_secs(65)).await;
        Ok("SIGINT")
    };
    handle.run_until(stop).await.unwrap();
    assert_eq!(count(&store, "ruckus_ap_metrics"), 2);
    assert_eq!(count(&store, "switch_chassis_metrics"), 1);
}
