//! Tests for configuration validation

use episim_kernel::config::simulation::{
    ENV_DURATION, ENV_ID, ENV_MAX_PENDING_EVENTS, ENV_START,
};
use episim_kernel::config::SimulationConfig;
use episim_kernel::util::{Duration, Instant};

fn valid() -> SimulationConfig {
    SimulationConfig::new(Instant::of(5.0), Some(Duration::of(5.0))).with_id("run-1")
}

#[test]
fn test_simulation_config_validation() {
    assert!(valid().validate().is_ok());
    assert!(SimulationConfig::default().validate().is_ok());
}

#[test]
fn test_simulation_config_invalid_id() {
    assert!(valid().with_id("  ").validate().is_err());
}

#[test]
fn test_simulation_config_invalid_duration() {
    let mut negative = valid();
    negative.duration = Some(Duration::of(-1.0));
    assert!(negative.validate().is_err());

    let mut infinite = valid();
    infinite.duration = Some(Duration::of(f64::INFINITY));
    assert!(infinite.validate().is_err());
}

#[test]
fn test_simulation_config_invalid_start() {
    let mut cfg = valid();
    cfg.start = Instant::of(f64::NAN);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_simulation_config_invalid_capacity() {
    assert!(valid().with_max_pending_events(0).validate().is_err());
}

#[test]
fn test_default_ids_are_unique() {
    assert_ne!(SimulationConfig::default().id, SimulationConfig::default().id);
}

#[test]
fn test_from_json_str() {
    let json = r#"{
        "id": "measles-1",
        "start": 0.0,
        "duration": 100.0,
        "max_pending_events": 64
    }"#;
    let cfg = SimulationConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.id, "measles-1");
    assert_eq!(cfg.duration, Some(Duration::of(100.0)));
    assert_eq!(cfg.max_pending_events, 64);
    assert_eq!(cfg.end(), Some(Instant::of(100.0)));
}

#[test]
fn test_from_json_str_rejects_invalid() {
    let err = SimulationConfig::from_json_str(r#"{"max_pending_events": 0}"#).unwrap_err();
    assert!(err.contains("max_pending_events"));

    let err = SimulationConfig::from_json_str("{not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_json_round_trip_keeps_values() {
    let cfg = valid();
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(SimulationConfig::from_json_str(&json).unwrap(), cfg);
}

// the only test touching the process environment
#[test]
fn test_from_env() {
    std::env::set_var(ENV_ID, "env-run");
    std::env::set_var(ENV_START, "10");
    std::env::set_var(ENV_DURATION, "2.5");
    std::env::set_var(ENV_MAX_PENDING_EVENTS, "128");
    let cfg = SimulationConfig::from_env().unwrap();
    assert_eq!(cfg.id, "env-run");
    assert_eq!(cfg.start, Instant::of(10.0));
    assert_eq!(cfg.end(), Some(Instant::of(12.5)));
    assert_eq!(cfg.max_pending_events, 128);

    std::env::set_var(ENV_DURATION, "soon");
    let err = SimulationConfig::from_env().unwrap_err();
    assert!(err.contains(ENV_DURATION));

    for name in [ENV_ID, ENV_START, ENV_DURATION, ENV_MAX_PENDING_EVENTS] {
        std::env::remove_var(name);
    }
}
