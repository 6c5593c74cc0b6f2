//! Health Scoring Module
//!
//! Deterministic, rule-based health score for conveyor and elevator drives.
//!
//! # Scoring Algorithm
//!
//! Starting from 100, three penalties are subtracted:
//! - **Deviation**: each channel outside its optimal range costs
//!   `min(cap, deviation * weight)` where deviation is the fractional distance
//!   past the violated optimal bound
//! - **Age**: grows linearly with operating hours, capped at 1.5 points
//! - **Alarms**: a fixed cost per HIGH or CRITICAL alarm in the recent log
//!
//! The result is clamped to [0, 100] and mapped to a severity band.
//!
//! Failure indicators are channel-specific risk estimates in [0, 1] combining
//! the current reading with its trend slope. Remaining useful life is
//! `(1 - max(indicators)) * 100`.

use std::collections::{BTreeMap, VecDeque};

use super::trend::Trend;
use crate::config::HealthConfig;
use crate::types::{
    indicators, AlarmRecord, ChannelRole, HealthSeverity, HealthState, Observation, Severity,
};

/// Tunables for [`HealthScorer`].
#[derive(Debug, Clone)]
pub struct HealthSettings {
    pub channel_penalty_cap: f64,
    pub deviation_weight: f64,
    /// Penalty points per 8760 operating hours
    pub age_penalty_per_year: f64,
    pub age_penalty_cap: f64,
    pub alarm_penalty_per: f64,
    pub alarm_penalty_cap: f64,
    /// How many log entries are inspected for the alarm penalty
    pub alarm_window: usize,
    /// Operating hours at which belt wear alone reaches full risk
    pub belt_life_hours: f64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self::from(&HealthConfig::default())
    }
}

impl From<&HealthConfig> for HealthSettings {
    fn from(cfg: &HealthConfig) -> Self {
        Self {
            channel_penalty_cap: cfg.channel_penalty_cap,
            deviation_weight: cfg.deviation_weight,
            age_penalty_per_year: cfg.age_penalty_per_year,
            age_penalty_cap: cfg.age_penalty_cap,
            alarm_penalty_per: cfg.alarm_penalty_per,
            alarm_penalty_cap: cfg.alarm_penalty_cap,
            alarm_window: cfg.alarm_window,
            belt_life_hours: cfg.belt_life_hours,
        }
    }
}

const HOURS_PER_YEAR: f64 = 8760.0;

/// Vibration trend slope weight in the bearing-wear indicator.
const BEARING_SLOPE_WEIGHT: f64 = 0.1;

/// Current trend slope weight in the motor-degradation indicator.
const MOTOR_SLOPE_WEIGHT: f64 = 0.05;

#[derive(Debug, Clone, Default)]
pub struct HealthScorer {
    settings: HealthSettings,
}

impl HealthScorer {
    pub fn new(settings: HealthSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HealthSettings {
        &self.settings
    }

    /// Score the machine from its latest observations.
    pub fn score(
        &self,
        observations: &[Observation<'_>],
        trends: &BTreeMap<String, Trend>,
        operating_hours: f64,
        alarm_log: &VecDeque<AlarmRecord>,
    ) -> HealthState {
        let health_score = self.health_score(observations, operating_hours, alarm_log);
        let failure_indicators = self.failure_indicators(observations, trends, operating_hours);
        let worst = failure_indicators.values().copied().fold(0.0_f64, f64::max);
        let remaining_useful_life = ((1.0 - worst) * 100.0).clamp(0.0, 100.0);

        HealthState {
            health_score,
            severity: HealthSeverity::from_score(health_score),
            failure_indicators,
            remaining_useful_life,
        }
    }

    /// Bounded health score in [0, 100].
    pub fn health_score(
        &self,
        observations: &[Observation<'_>],
        operating_hours: f64,
        alarm_log: &VecDeque<AlarmRecord>,
    ) -> f64 {
        let s = &self.settings;
        let mut score = 100.0;

        for obs in observations {
            let deviation = obs.spec.optimal_deviation(obs.value);
            if deviation > 0.0 {
                score -= (deviation * s.deviation_weight).min(s.channel_penalty_cap);
            }
        }

        let age = (operating_hours.max(0.0) / HOURS_PER_YEAR * s.age_penalty_per_year)
            .min(s.age_penalty_cap);
        score -= age;

        #[allow(clippy::cast_precision_loss)]
        let recent_serious = alarm_log
            .iter()
            .rev()
            .take(s.alarm_window)
            .filter(|a| a.severity >= Severity::High)
            .count() as f64;
        score -= (recent_serious * s.alarm_penalty_per).min(s.alarm_penalty_cap);

        if score.is_finite() {
            score.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Risk indicators in [0, 1] for the channels this machine has.
    pub fn failure_indicators(
        &self,
        observations: &[Observation<'_>],
        trends: &BTreeMap<String, Trend>,
        operating_hours: f64,
    ) -> BTreeMap<String, f64> {
        let find = |role: ChannelRole| observations.iter().find(|o| o.spec.role == role);
        let slope = |obs: &Observation<'_>| trends.get(&obs.spec.name).map_or(0.0, |t| t.slope);
        let mut out = BTreeMap::new();

        if let Some(vib) = find(ChannelRole::Vibration) {
            let reference = vib.spec.nominal();
            let span = (vib.spec.max - reference).max(f64::EPSILON);
            let excess = ((vib.value - reference) / span).max(0.0);
            out.insert(
                indicators::BEARING_WEAR.to_string(),
                unit(excess + BEARING_SLOPE_WEIGHT * slope(vib)),
            );
        }

        if let Some(speed) = find(ChannelRole::Speed) {
            let nominal = speed.spec.nominal().max(f64::EPSILON);
            let mut risk = (speed.value - nominal).abs() / nominal
                + operating_hours.max(0.0) / self.settings.belt_life_hours;
            if let Some(slip) = find(ChannelRole::Slippage) {
                let high = slip.spec.optimal_range.1;
                let span = (slip.spec.max - high).max(f64::EPSILON);
                risk += ((slip.value - high) / span).max(0.0);
            }
            out.insert(indicators::BELT_DEGRADATION.to_string(), unit(risk));
        }

        if let Some(current) = find(ChannelRole::Current) {
            let nominal = current.spec.nominal().max(f64::EPSILON);
            let risk = (current.value - nominal).abs() / nominal + MOTOR_SLOPE_WEIGHT * slope(current);
            out.insert(indicators::MOTOR_DEGRADATION.to_string(), unit(risk));
        }

        if let Some(temp) = find(ChannelRole::Temperature) {
            let high = temp.spec.optimal_range.1;
            let span = (temp.spec.critical_threshold - high).max(f64::EPSILON);
            out.insert(
                indicators::OVERHEATING.to_string(),
                unit((temp.value - high) / span),
            );
        }

        out
    }
}

/// Clamp to [0, 1], mapping NaN to 0.
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
