//! Config Validation Tests
//!
//! Typo detection, range checks and file round-trips for `PlantConfig`,
//! exercised independently from the rest of the pipeline.

use beltwatch::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use beltwatch::config::{ConfigError, PlantConfig};
use beltwatch::types::MachineKind;
use std::io::Write;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_alarm_section_warns_with_suggestion() {
    let toml_str = r#"
[alarms]
cooldwn_secs = 10
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("cooldwn_secs"));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("alarms.cooldown_secs"));
}

#[test]
fn typo_in_channel_override_warns() {
    let toml_str = r#"
[machines.line_3]
kind = "conveyor_belt"

[machines.line_3.channels.temperature_c]
alarm_treshold = 60.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    let suggestion = warnings[0].suggestion.as_deref().unwrap_or_default();
    assert!(suggestion.ends_with("alarm_threshold"), "got {suggestion:?}");
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[plant]
name = "Grain Terminal 2"
site = "North Quay"

[simulation]
tick_interval_ms = 500
seed = 42

[machines.elevator_a]
kind = "bucket_elevator"

[machines.elevator_a.channels.temperature_c]
alarm_threshold = 65.0
critical_threshold = 72.0

[machines.belt_b]
kind = "conveyor_belt"
enabled = false
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

#[test]
fn distant_typo_has_no_suggestion() {
    let known = known_config_keys();
    assert_eq!(suggest_correction("alarms.zzzzzzzzzzzz", &known), None);
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn default_config_passes_range_checks() {
    let (errors, warnings) = validate_physical_ranges(&PlantConfig::default());
    assert!(errors.is_empty());
    assert!(warnings.is_empty());
}

#[test]
fn zero_cooldown_warns() {
    let mut config = PlantConfig::default();
    config.alarms.cooldown_secs = 0;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "alarms.cooldown_secs"));
}

#[test]
fn enabled_transmitter_needs_http_url() {
    let mut config = PlantConfig::default();
    config.transmitter.enabled = true;
    config.transmitter.base_url = "ftp://collector".to_string();
    match config.validate() {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("transmitter.base_url")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn inverted_channel_thresholds_fail() {
    let toml_str = r#"
[machines.belt]
kind = "conveyor_belt"

[machines.belt.channels.temperature_c]
alarm_threshold = 78.0
critical_threshold = 72.0
"#;
    let err = PlantConfig::from_toml_str(toml_str).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("Config validation failed"));
    assert!(text.contains("machines.belt"));
}

#[test]
fn short_trend_minimum_fails() {
    let toml_str = r#"
[simulation]
trend_window = 3
trend_min_points = 3
"#;
    let err = PlantConfig::from_toml_str(toml_str).unwrap_err();
    assert!(err.to_string().contains("trend_min_points must be >= 10"));

    let mut config = PlantConfig::default();
    config.simulation.trend_min_points = 3;
    assert!(config.validate().is_err());
}

#[test]
fn unknown_channel_fails() {
    let toml_str = r#"
[machines.belt]
kind = "conveyor_belt"

[machines.belt.channels.humidity]
alarm_threshold = 60.0
"#;
    let err = PlantConfig::from_toml_str(toml_str).unwrap_err();
    assert!(err.to_string().contains("unknown channel 'humidity'"));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn save_and_reload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beltwatch.toml");

    let mut config = PlantConfig::default();
    config.plant.name = "Round Trip".to_string();
    config.simulation.seed = Some(99);
    config
        .machines
        .get_mut("conveyor_belt")
        .unwrap()
        .channels
        .entry("temperature_c".to_string())
        .or_default()
        .alarm_threshold = Some(62.0);
    config.save_to_file(&path).unwrap();

    let loaded = PlantConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.plant.name, "Round Trip");
    assert_eq!(loaded.simulation.seed, Some(99));
    let specs = loaded.machines["conveyor_belt"].resolve_channels().unwrap();
    let temp = specs.iter().find(|s| s.name == "temperature_c").unwrap();
    assert_eq!(temp.alarm_threshold, 62.0);
}

#[test]
fn malformed_file_reports_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[simulation\ntick_interval_ms = ").unwrap();
    let err = PlantConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == file.path()));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PlantConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}

#[test]
fn partial_file_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[simulation]\ntick_interval_ms = 250").unwrap();
    let config = PlantConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.simulation.tick_interval_ms, 250);
    assert_eq!(config.alarms.cooldown_secs, 30);
    assert_eq!(config.machines["bucket_elevator"].kind, MachineKind::BucketElevator);
}
