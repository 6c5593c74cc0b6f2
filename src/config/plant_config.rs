//! Plant Configuration - machines, thresholds and tunables as TOML values
//!
//! Every tunable lives in this module. Each struct implements `Default` with
//! the values in `defaults.rs`, so a missing file behaves exactly like the
//! built-in configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::sensors::catalog::default_channels;
use crate::types::{ChannelSpec, MachineKind};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "BELTWATCH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "beltwatch.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one plant.
///
/// Load with `PlantConfig::load()` which searches:
/// 1. `$BELTWATCH_CONFIG` env var
/// 2. `./beltwatch.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantConfig {
    /// Plant identification
    #[serde(default)]
    pub plant: PlantInfo,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Tick loop and history
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Alarm cooldowns and trend alarm tuning
    #[serde(default)]
    pub alarms: AlarmConfig,

    /// Health score penalties
    #[serde(default)]
    pub health: HealthConfig,

    /// Recommendation thresholds
    #[serde(default)]
    pub recommendations: RecommendationConfig,

    /// Backend transmitter
    #[serde(default)]
    pub transmitter: TransmitterConfig,

    /// Simulated machines keyed by id
    #[serde(default = "default_machines")]
    pub machines: BTreeMap<String, MachineConfig>,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            plant: PlantInfo::default(),
            server: ServerConfig::default(),
            simulation: SimulationConfig::default(),
            alarms: AlarmConfig::default(),
            health: HealthConfig::default(),
            recommendations: RecommendationConfig::default(),
            transmitter: TransmitterConfig::default(),
            machines: default_machines(),
        }
    }
}

fn default_machines() -> BTreeMap<String, MachineConfig> {
    [MachineKind::BucketElevator, MachineKind::ConveyorBelt]
        .into_iter()
        .map(|kind| (kind.to_string(), MachineConfig::new(kind)))
        .collect()
}

impl PlantConfig {
    /// Load configuration using the standard search order:
    /// 1. `$BELTWATCH_CONFIG` environment variable
    /// 2. `./beltwatch.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), plant = %config.plant.name, "Loaded plant config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(plant = %config.plant.name, "Loaded plant config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys only produce warnings; parse and validation failures are
    /// returned as errors.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides (`BELTWATCH_SERVER_ADDR`).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("BELTWATCH_SERVER_ADDR") {
            if !addr.trim().is_empty() {
                self.server.addr = addr;
            }
        }
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Plant config saved");
        Ok(())
    }

    /// Validate every section, collecting all violations.
    ///
    /// Rules:
    /// - every machine's resolved channels satisfy the ordering invariants
    /// - intervals, capacities and windows are positive
    /// - escalation thresholds are ordered
    /// - all values are finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let sim = &self.simulation;
        if sim.tick_interval_ms == 0 {
            errors.push("simulation.tick_interval_ms must be > 0".to_string());
        }
        if !(sim.time_scale.is_finite() && sim.time_scale > 0.0) {
            errors.push(format!(
                "simulation.time_scale must be a positive number (got {})",
                sim.time_scale
            ));
        }
        if sim.history_capacity == 0 {
            errors.push("simulation.history_capacity must be > 0".to_string());
        }
        if sim.trend_min_points < defaults::TREND_MIN_POINTS {
            errors.push(format!(
                "simulation.trend_min_points must be >= {} (got {})",
                defaults::TREND_MIN_POINTS,
                sim.trend_min_points
            ));
        }
        if sim.trend_window < sim.trend_min_points {
            errors.push(format!(
                "simulation.trend_window ({}) must be >= trend_min_points ({})",
                sim.trend_window, sim.trend_min_points
            ));
        }

        let a = &self.alarms;
        if !(0.0..=1.0).contains(&a.trend_r_squared_min) {
            errors.push(format!(
                "alarms.trend_r_squared_min must be within [0, 1] (got {})",
                a.trend_r_squared_min
            ));
        }
        if !(a.trend_projection_ticks.is_finite() && a.trend_projection_ticks > 0.0) {
            errors.push("alarms.trend_projection_ticks must be > 0".to_string());
        }
        if a.log_capacity == 0 {
            errors.push("alarms.log_capacity must be > 0".to_string());
        }

        let h = &self.health;
        for (name, value) in [
            ("channel_penalty_cap", h.channel_penalty_cap),
            ("deviation_weight", h.deviation_weight),
            ("age_penalty_per_year", h.age_penalty_per_year),
            ("age_penalty_cap", h.age_penalty_cap),
            ("alarm_penalty_per", h.alarm_penalty_per),
            ("alarm_penalty_cap", h.alarm_penalty_cap),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(format!("health.{name} must be >= 0 (got {value})"));
            }
        }
        if !(h.belt_life_hours.is_finite() && h.belt_life_hours > 0.0) {
            errors.push("health.belt_life_hours must be > 0".to_string());
        }

        let r = &self.recommendations;
        Self::check_descending(
            &[
                ("general_inspection_below", r.general_inspection_below),
                ("high_priority_below", r.high_priority_below),
                ("urgent_below", r.urgent_below),
                ("shutdown_below", r.shutdown_below),
            ],
            "recommendations",
            &mut errors,
        );
        if r.scheduled_window_hours < 0.0 || r.scheduled_window_hours > r.scheduled_interval_hours {
            errors.push(format!(
                "recommendations.scheduled_window_hours ({}) must be within [0, scheduled_interval_hours]",
                r.scheduled_window_hours
            ));
        }

        let t = &self.transmitter;
        if t.enabled && t.base_url.trim().is_empty() {
            errors.push("transmitter.base_url must be set when the transmitter is enabled".to_string());
        }
        if t.timeout_secs == 0 {
            errors.push("transmitter.timeout_secs must be > 0".to_string());
        }
        if t.outbox_capacity == 0 {
            errors.push("transmitter.outbox_capacity must be > 0".to_string());
        }
        if t.report_every_ticks == 0 {
            errors.push("transmitter.report_every_ticks must be > 0".to_string());
        }

        if self.machines.values().all(|m| !m.enabled) {
            errors.push("at least one machine must be enabled".to_string());
        }
        for (id, machine) in &self.machines {
            if id.is_empty()
                || !id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                errors.push(format!(
                    "machines.{id}: ids may only contain letters, digits, '_' and '-'"
                ));
            }
            if let Err(e) = machine.resolve_channels() {
                errors.extend(e.into_iter().map(|msg| format!("machines.{id}: {msg}")));
            }
            if let Some(drive) = &machine.drive {
                if ![drive.drive_speed, drive.load_proxy, drive.speed_swing, drive.load_swing]
                    .iter()
                    .all(|v| v.is_finite() && *v >= 0.0)
                {
                    errors.push(format!("machines.{id}.drive: values must be finite and >= 0"));
                }
            }
        }

        // Physical range validation
        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_descending(values: &[(&str, f64)], section: &str, errors: &mut Vec<String>) {
        if let Some((name, v)) = values.iter().find(|(_, v)| !v.is_finite()) {
            errors.push(format!("{section}.{name} must be finite (got {v})"));
            return;
        }
        for pair in values.windows(2) {
            let ((upper_name, upper), (lower_name, lower)) = (pair[0], pair[1]);
            if lower > upper {
                errors.push(format!(
                    "{section}.{lower_name} ({lower:.1}) must be <= {upper_name} ({upper:.1})"
                ));
            }
        }
    }

    /// Enabled machines in id order.
    pub fn enabled_machines(&self) -> impl Iterator<Item = (&String, &MachineConfig)> {
        self.machines.iter().filter(|(_, m)| m.enabled)
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "Config parse error ({}): {}", path.display(), e),
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Plant Info & Server
// ============================================================================

/// Identification metadata. Appears in logs and exports only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantInfo {
    #[serde(default = "default_plant_name")]
    pub name: String,

    #[serde(default)]
    pub site: String,
}

fn default_plant_name() -> String {
    "DEFAULT".to_string()
}

impl Default for PlantInfo {
    fn default() -> Self {
        Self {
            name: default_plant_name(),
            site: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Wall-clock tick period (ms)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Operating seconds simulated per wall-clock second
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    #[serde(default = "default_trend_min_points")]
    pub trend_min_points: usize,

    /// Noise seed; unset means a fresh seed per run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Health score below which machine status becomes `Maintenance`
    #[serde(default = "default_maintenance_status_below")]
    pub maintenance_status_below: f64,
}

fn default_tick_interval_ms() -> u64 { defaults::TICK_INTERVAL_MS }
fn default_time_scale() -> f64 { 1.0 }
fn default_history_capacity() -> usize { defaults::HISTORY_CAPACITY }
fn default_trend_window() -> usize { defaults::TREND_WINDOW }
fn default_trend_min_points() -> usize { defaults::TREND_MIN_POINTS }
fn default_maintenance_status_below() -> f64 { defaults::MAINTENANCE_STATUS_BELOW }

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            time_scale: default_time_scale(),
            history_capacity: default_history_capacity(),
            trend_window: default_trend_window(),
            trend_min_points: default_trend_min_points(),
            seed: None,
            maintenance_status_below: default_maintenance_status_below(),
        }
    }
}

// ============================================================================
// Alarms
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Cooldown per (channel, severity) threshold key (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Cooldown per channel trend key (seconds)
    #[serde(default = "default_trend_cooldown_secs")]
    pub trend_cooldown_secs: u64,

    #[serde(default = "default_trend_r_squared_min")]
    pub trend_r_squared_min: f64,

    #[serde(default = "default_trend_projection_ticks")]
    pub trend_projection_ticks: f64,

    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_cooldown_secs() -> u64 { defaults::ALARM_COOLDOWN_SECS }
fn default_trend_cooldown_secs() -> u64 { defaults::TREND_ALARM_COOLDOWN_SECS }
fn default_trend_r_squared_min() -> f64 { defaults::TREND_R_SQUARED_MIN }
fn default_trend_projection_ticks() -> f64 { defaults::TREND_PROJECTION_TICKS }
fn default_log_capacity() -> usize { defaults::ALARM_LOG_CAPACITY }

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            trend_cooldown_secs: default_trend_cooldown_secs(),
            trend_r_squared_min: default_trend_r_squared_min(),
            trend_projection_ticks: default_trend_projection_ticks(),
            log_capacity: default_log_capacity(),
        }
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_channel_penalty_cap")]
    pub channel_penalty_cap: f64,

    #[serde(default = "default_deviation_weight")]
    pub deviation_weight: f64,

    #[serde(default = "default_age_penalty_per_year")]
    pub age_penalty_per_year: f64,

    #[serde(default = "default_age_penalty_cap")]
    pub age_penalty_cap: f64,

    #[serde(default = "default_alarm_penalty_per")]
    pub alarm_penalty_per: f64,

    #[serde(default = "default_alarm_penalty_cap")]
    pub alarm_penalty_cap: f64,

    #[serde(default = "default_alarm_window")]
    pub alarm_window: usize,

    #[serde(default = "default_belt_life_hours")]
    pub belt_life_hours: f64,
}

fn default_channel_penalty_cap() -> f64 { defaults::CHANNEL_PENALTY_CAP }
fn default_deviation_weight() -> f64 { defaults::DEVIATION_WEIGHT }
fn default_age_penalty_per_year() -> f64 { defaults::AGE_PENALTY_PER_YEAR }
fn default_age_penalty_cap() -> f64 { defaults::AGE_PENALTY_CAP }
fn default_alarm_penalty_per() -> f64 { defaults::ALARM_PENALTY_PER }
fn default_alarm_penalty_cap() -> f64 { defaults::ALARM_PENALTY_CAP }
fn default_alarm_window() -> usize { defaults::ALARM_PENALTY_WINDOW }
fn default_belt_life_hours() -> f64 { defaults::BELT_LIFE_HOURS }

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            channel_penalty_cap: default_channel_penalty_cap(),
            deviation_weight: default_deviation_weight(),
            age_penalty_per_year: default_age_penalty_per_year(),
            age_penalty_cap: default_age_penalty_cap(),
            alarm_penalty_per: default_alarm_penalty_per(),
            alarm_penalty_cap: default_alarm_penalty_cap(),
            alarm_window: default_alarm_window(),
            belt_life_hours: default_belt_life_hours(),
        }
    }
}

// ============================================================================
// Recommendations
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_general_inspection_below")]
    pub general_inspection_below: f64,

    /// Below this the general inspection becomes high priority
    #[serde(default = "default_high_priority_below")]
    pub high_priority_below: f64,

    #[serde(default = "default_urgent_below")]
    pub urgent_below: f64,

    #[serde(default = "default_shutdown_below")]
    pub shutdown_below: f64,

    #[serde(default = "default_bearing_wear_above")]
    pub bearing_wear_above: f64,

    #[serde(default = "default_belt_degradation_above")]
    pub belt_degradation_above: f64,

    #[serde(default = "default_motor_degradation_above")]
    pub motor_degradation_above: f64,

    #[serde(default = "default_overheating_above")]
    pub overheating_above: f64,

    /// Routine service interval (operating hours)
    #[serde(default = "default_scheduled_interval_hours")]
    pub scheduled_interval_hours: f64,

    /// How long after each interval boundary the routine service is shown
    #[serde(default = "default_scheduled_window_hours")]
    pub scheduled_window_hours: f64,
}

fn default_general_inspection_below() -> f64 { 85.0 }
fn default_high_priority_below() -> f64 { 70.0 }
fn default_urgent_below() -> f64 { 60.0 }
fn default_shutdown_below() -> f64 { 50.0 }
fn default_bearing_wear_above() -> f64 { 0.7 }
fn default_belt_degradation_above() -> f64 { 0.6 }
fn default_motor_degradation_above() -> f64 { 0.2 }
fn default_overheating_above() -> f64 { 0.5 }
fn default_scheduled_interval_hours() -> f64 { 500.0 }
fn default_scheduled_window_hours() -> f64 { 1.0 }

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            general_inspection_below: default_general_inspection_below(),
            high_priority_below: default_high_priority_below(),
            urgent_below: default_urgent_below(),
            shutdown_below: default_shutdown_below(),
            bearing_wear_above: default_bearing_wear_above(),
            belt_degradation_above: default_belt_degradation_above(),
            motor_degradation_above: default_motor_degradation_above(),
            overheating_above: default_overheating_above(),
            scheduled_interval_hours: default_scheduled_interval_hours(),
            scheduled_window_hours: default_scheduled_window_hours(),
        }
    }
}

// ============================================================================
// Transmitter
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmitterConfig {
    /// Disabled means offline mode from startup
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,

    #[serde(default = "default_offline_cooldown_secs")]
    pub offline_cooldown_secs: u64,

    #[serde(default = "default_report_every_ticks")]
    pub report_every_ticks: u64,
}

fn default_base_url() -> String { "http://localhost:3000/api".to_string() }
fn default_timeout_secs() -> u64 { defaults::TRANSMIT_TIMEOUT_SECS }
fn default_max_retries() -> u32 { defaults::TRANSMIT_MAX_RETRIES }
fn default_backoff_ms() -> u64 { defaults::TRANSMIT_BACKOFF_MS }
fn default_outbox_capacity() -> usize { defaults::OUTBOX_CAPACITY }
fn default_offline_cooldown_secs() -> u64 { defaults::OFFLINE_COOLDOWN_SECS }
fn default_report_every_ticks() -> u64 { defaults::REPORT_EVERY_TICKS }

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            outbox_capacity: default_outbox_capacity(),
            offline_cooldown_secs: default_offline_cooldown_secs(),
            report_every_ticks: default_report_every_ticks(),
        }
    }
}

// ============================================================================
// Machines
// ============================================================================

/// One simulated machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    pub kind: MachineKind,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Drive profile; kind-specific defaults when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive: Option<DriveConfig>,

    /// Per-channel overrides of the kind's default channel table
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub channels: BTreeMap<String, ChannelOverride>,
}

fn default_enabled() -> bool {
    true
}

impl MachineConfig {
    pub fn new(kind: MachineKind) -> Self {
        Self {
            kind,
            enabled: true,
            drive: None,
            channels: BTreeMap::new(),
        }
    }

    /// The kind's default channels with overrides applied, each validated.
    pub fn resolve_channels(&self) -> Result<Vec<ChannelSpec>, Vec<String>> {
        let mut specs = default_channels(self.kind);
        let mut errors = Vec::new();

        for (name, patch) in &self.channels {
            match specs.iter_mut().find(|s| &s.name == name) {
                Some(spec) => patch.apply(spec),
                None => errors.push(format!(
                    "unknown channel '{name}' for {} (expected one of: {})",
                    self.kind,
                    specs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
                )),
            }
        }
        for spec in &specs {
            if let Err(e) = spec.validate() {
                errors.extend(e);
            }
        }

        if errors.is_empty() {
            Ok(specs)
        } else {
            Err(errors)
        }
    }

    pub fn drive(&self) -> DriveConfig {
        self.drive.clone().unwrap_or_else(|| DriveConfig::for_kind(self.kind))
    }
}

/// Operating profile feeding the tick loop.
///
/// Speed and material load oscillate slowly around their base values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveConfig {
    /// Base belt speed (m/s)
    pub drive_speed: f64,
    /// Base material on the belt (units)
    pub load_proxy: f64,
    #[serde(default)]
    pub speed_swing: f64,
    #[serde(default)]
    pub load_swing: f64,
}

impl DriveConfig {
    pub fn for_kind(kind: MachineKind) -> Self {
        match kind {
            MachineKind::BucketElevator => Self {
                drive_speed: 2.8,
                load_proxy: 160.0,
                speed_swing: 0.1,
                load_swing: 20.0,
            },
            MachineKind::ConveyorBelt => Self {
                drive_speed: 1.5,
                load_proxy: 25.0,
                speed_swing: 0.05,
                load_swing: 8.0,
            },
        }
    }
}

/// Optional replacement for any field of a default channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_range: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_std: Option<f64>,
}

impl ChannelOverride {
    pub fn apply(&self, spec: &mut ChannelSpec) {
        if let Some(unit) = &self.unit {
            spec.unit.clone_from(unit);
        }
        if let Some(v) = self.min {
            spec.min = v;
        }
        if let Some(v) = self.max {
            spec.max = v;
        }
        if let Some([low, high]) = self.optimal_range {
            spec.optimal_range = (low, high);
        }
        if let Some(v) = self.alarm_threshold {
            spec.alarm_threshold = v;
        }
        if let Some(v) = self.critical_threshold {
            spec.critical_threshold = v;
        }
        if let Some(v) = self.calibration_factor {
            spec.calibration_factor = v;
        }
        if let Some(v) = self.noise_std {
            spec.noise_std = v;
        }
    }
}
