//! Threshold and trend alarm evaluation with cooldown suppression
//!
//! The engine is evaluated at an explicit instant so that cooldown behaviour
//! is deterministic and testable without a clock.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::warn;

use super::trend::Trend;
use crate::config::AlarmConfig;
use crate::types::{AlarmKind, AlarmRecord, CooldownKey, Observation, Severity};

/// Tunables for [`AlarmEngine`].
#[derive(Debug, Clone)]
pub struct AlarmSettings {
    pub cooldown: Duration,
    pub trend_cooldown: Duration,
    /// Minimum r² before a rising trend is trusted
    pub trend_r_squared_min: f64,
    /// How many samples ahead the trend is projected
    pub trend_projection_ticks: f64,
    pub log_capacity: usize,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self::from(&AlarmConfig::default())
    }
}

impl From<&AlarmConfig> for AlarmSettings {
    fn from(cfg: &AlarmConfig) -> Self {
        Self {
            cooldown: Duration::seconds(i64::try_from(cfg.cooldown_secs).unwrap_or(i64::MAX)),
            trend_cooldown: Duration::seconds(
                i64::try_from(cfg.trend_cooldown_secs).unwrap_or(i64::MAX),
            ),
            trend_r_squared_min: cfg.trend_r_squared_min,
            trend_projection_ticks: cfg.trend_projection_ticks,
            log_capacity: cfg.log_capacity,
        }
    }
}

/// Stateful alarm evaluator for one machine.
///
/// Holds the cooldown table (last emission per key) and a bounded,
/// append-only alarm log.
#[derive(Debug, Clone)]
pub struct AlarmEngine {
    settings: AlarmSettings,
    cooldowns: HashMap<CooldownKey, DateTime<Utc>>,
    log: VecDeque<AlarmRecord>,
}

impl Default for AlarmEngine {
    fn default() -> Self {
        Self::new(AlarmSettings::default())
    }
}

impl AlarmEngine {
    pub fn new(settings: AlarmSettings) -> Self {
        Self {
            log: VecDeque::with_capacity(settings.log_capacity),
            settings,
            cooldowns: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &AlarmSettings {
        &self.settings
    }

    /// Evaluate all channels at `now`, returning only newly emitted alarms.
    ///
    /// Threshold alarms come first (CRITICAL above the critical threshold,
    /// otherwise HIGH above the alarm threshold), then MEDIUM trend alarms for
    /// channels whose well-fitted rising trend projects past the alarm
    /// threshold. An alarm whose key fired within its cooldown is suppressed.
    pub fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        observations: &[Observation<'_>],
        trends: &BTreeMap<String, Trend>,
    ) -> Vec<AlarmRecord> {
        let mut emitted = Vec::new();

        for obs in observations {
            let spec = obs.spec;
            let (severity, threshold) = if obs.value > spec.critical_threshold {
                (Severity::Critical, spec.critical_threshold)
            } else if obs.value > spec.alarm_threshold {
                (Severity::High, spec.alarm_threshold)
            } else {
                continue;
            };
            let message = format!(
                "{} {} {:.2} {} exceeds {} threshold {:.2}",
                severity,
                spec.name,
                obs.value,
                spec.unit,
                if severity == Severity::Critical { "critical" } else { "alarm" },
                threshold
            );
            let record = AlarmRecord {
                timestamp: now,
                channel: spec.name.clone(),
                severity,
                kind: AlarmKind::Threshold,
                priority: severity.priority(),
                value: obs.value,
                threshold,
                message,
            };
            if self.try_emit(record.clone(), self.settings.cooldown) {
                emitted.push(record);
            }
        }

        for obs in observations {
            let spec = obs.spec;
            let Some(trend) = trends.get(&spec.name) else {
                continue;
            };
            if !trend.is_rising(self.settings.trend_r_squared_min) {
                continue;
            }
            let projected = obs.value + trend.slope * self.settings.trend_projection_ticks;
            if projected <= spec.alarm_threshold {
                continue;
            }
            let record = AlarmRecord {
                timestamp: now,
                channel: spec.name.clone(),
                severity: Severity::Medium,
                kind: AlarmKind::Trend,
                priority: Severity::Medium.priority(),
                value: projected,
                threshold: spec.alarm_threshold,
                message: format!(
                    "{} trending upward: projected {:.2} {} within {} samples (r²={:.2})",
                    spec.name,
                    projected,
                    spec.unit,
                    self.settings.trend_projection_ticks,
                    trend.r_squared
                ),
            };
            if self.try_emit(record.clone(), self.settings.trend_cooldown) {
                emitted.push(record);
            }
        }

        emitted
    }

    fn try_emit(&mut self, record: AlarmRecord, cooldown: Duration) -> bool {
        let key = record.cooldown_key();
        if let Some(last) = self.cooldowns.get(&key) {
            if record.timestamp - *last < cooldown {
                return false;
            }
        }
        warn!(
            channel = %record.channel,
            severity = %record.severity,
            value = record.value,
            threshold = record.threshold,
            "Alarm: {}",
            record.message
        );
        self.cooldowns.insert(key, record.timestamp);
        if self.log.len() >= self.settings.log_capacity {
            self.log.pop_front();
        }
        if self.settings.log_capacity > 0 {
            self.log.push_back(record);
        }
        true
    }

    /// Full alarm log, oldest first.
    pub fn log(&self) -> &VecDeque<AlarmRecord> {
        &self.log
    }

    /// The most recent `n` alarms, oldest first.
    pub fn recent(&self, n: usize) -> Vec<AlarmRecord> {
        let skip = self.log.len().saturating_sub(n);
        self.log.iter().skip(skip).cloned().collect()
    }

    /// Count alarms of at least `min_severity` among the last `window` entries.
    pub fn count_recent(&self, window: usize, min_severity: Severity) -> usize {
        self.log
            .iter()
            .rev()
            .take(window)
            .filter(|a| a.severity >= min_severity)
            .count()
    }

    /// Alarms whose cooldown has not yet expired at `now`.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<&AlarmRecord> {
        self.log
            .iter()
            .filter(|a| {
                let cooldown = match a.kind {
                    AlarmKind::Threshold => self.settings.cooldown,
                    AlarmKind::Trend => self.settings.trend_cooldown,
                };
                now - a.timestamp < cooldown
            })
            .collect()
    }

    /// Clear the log and cooldown table.
    pub fn reset(&mut self) {
        self.log.clear();
        self.cooldowns.clear();
    }
}
