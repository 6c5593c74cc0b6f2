//! Sensor channel definitions, readings and snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Channel Role
// ============================================================================

/// Physical quantity a channel measures.
///
/// The role selects the update function in the sensor model. Variants are
/// declared in evaluation order: later channels read the fresh values of
/// earlier ones within the same tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    Speed,
    Load,
    Temperature,
    Vibration,
    Current,
    Slippage,
}

impl std::fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Speed => "speed",
            Self::Load => "load",
            Self::Temperature => "temperature",
            Self::Vibration => "vibration",
            Self::Current => "current",
            Self::Slippage => "slippage",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Channel Spec
// ============================================================================

/// Static metadata and tunable thresholds for one sensor channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelSpec {
    pub name: String,
    pub unit: String,
    pub role: ChannelRole,
    pub min: f64,
    pub max: f64,
    /// Inclusive `(low, high)` band considered healthy
    pub optimal_range: (f64, f64),
    pub alarm_threshold: f64,
    pub critical_threshold: f64,
    pub calibration_factor: f64,
    /// Standard deviation of the gaussian noise added each tick
    pub noise_std: f64,
}

impl ChannelSpec {
    /// Check the ordering invariants, returning every violation found.
    ///
    /// - all numeric fields finite
    /// - `min < alarm_threshold < critical_threshold < max`
    /// - `min <= optimal_low < optimal_high <= max`
    /// - `calibration_factor > 0`, `noise_std >= 0`
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let name = &self.name;
        let (low, high) = self.optimal_range;

        let fields = [
            ("min", self.min),
            ("max", self.max),
            ("optimal_low", low),
            ("optimal_high", high),
            ("alarm_threshold", self.alarm_threshold),
            ("critical_threshold", self.critical_threshold),
            ("calibration_factor", self.calibration_factor),
            ("noise_std", self.noise_std),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                errors.push(format!("{name}.{field} must be finite (got {value})"));
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        if !(self.min < self.alarm_threshold
            && self.alarm_threshold < self.critical_threshold
            && self.critical_threshold < self.max)
        {
            errors.push(format!(
                "{name}: thresholds must satisfy min ({}) < alarm ({}) < critical ({}) < max ({})",
                self.min, self.alarm_threshold, self.critical_threshold, self.max
            ));
        }
        if !(self.min <= low && low < high && high <= self.max) {
            errors.push(format!(
                "{name}: optimal_range ({low}, {high}) must be an increasing range within [{}, {}]",
                self.min, self.max
            ));
        }
        if self.calibration_factor <= 0.0 {
            errors.push(format!(
                "{name}.calibration_factor must be > 0 (got {})",
                self.calibration_factor
            ));
        }
        if self.noise_std < 0.0 {
            errors.push(format!("{name}.noise_std must be >= 0 (got {})", self.noise_std));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Status of a reading. Threshold comparisons are strict.
    pub fn status_for(&self, value: f64) -> ChannelStatus {
        if value > self.critical_threshold {
            ChannelStatus::Critical
        } else if value > self.alarm_threshold {
            ChannelStatus::Alarm
        } else {
            ChannelStatus::Normal
        }
    }

    /// Fractional distance of `value` outside the optimal range, 0.0 inside it.
    ///
    /// The distance is relative to the violated bound. A bound of zero would
    /// make that meaningless, so the optimal span is used instead.
    pub fn optimal_deviation(&self, value: f64) -> f64 {
        let (low, high) = self.optimal_range;
        let span = high - low;
        let relative = |distance: f64, bound: f64| {
            if bound.abs() > f64::EPSILON {
                distance / bound.abs()
            } else {
                distance / span
            }
        };
        if value < low {
            relative(low - value, low)
        } else if value > high {
            relative(value - high, high)
        } else {
            0.0
        }
    }

    /// Midpoint of the optimal range, used as the nominal operating value.
    pub fn nominal(&self) -> f64 {
        (self.optimal_range.0 + self.optimal_range.1) / 2.0
    }
}

// ============================================================================
// Readings & Snapshots
// ============================================================================

/// Classification of a single reading against its thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    Normal,
    Alarm,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelReading {
    pub value: f64,
    pub unit: String,
    pub status: ChannelStatus,
}

/// All channel readings of one machine at one tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub channels: BTreeMap<String, ChannelReading>,
}

impl SensorSnapshot {
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.channels.get(channel).map(|r| r.value)
    }
}

/// One timestamped sample kept in a channel history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Latest value of a channel together with its spec.
///
/// This is the view the alarm, health and performance stages consume.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub spec: &'a ChannelSpec,
    pub value: f64,
}
