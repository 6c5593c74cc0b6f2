//! Health, maintenance and performance result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity band derived from the health score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum HealthSeverity {
    #[default]
    Healthy,
    Watch,
    Warning,
    Critical,
}

impl HealthSeverity {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Healthy
        } else if score >= 60.0 {
            Self::Watch
        } else if score >= 40.0 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

impl std::fmt::Display for HealthSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Output of one health evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthState {
    /// 0-100, 100 = perfect health
    pub health_score: f64,
    /// Indicator name to risk in [0, 1]
    pub failure_indicators: BTreeMap<String, f64>,
    /// `(1 - max(indicators)) * 100`, in [0, 100]
    pub remaining_useful_life: f64,
    pub severity: HealthSeverity,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            health_score: 100.0,
            failure_indicators: BTreeMap::new(),
            remaining_useful_life: 100.0,
            severity: HealthSeverity::Healthy,
        }
    }
}

impl HealthState {
    pub fn indicator(&self, name: &str) -> f64 {
        self.failure_indicators.get(name).copied().unwrap_or(0.0)
    }
}

/// Failure indicator names.
pub mod indicators {
    pub const BEARING_WEAR: &str = "bearing_wear";
    pub const BELT_DEGRADATION: &str = "belt_degradation";
    pub const MOTOR_DEGRADATION: &str = "motor_degradation";
    pub const OVERHEATING: &str = "overheating";
}

/// Urgency of a maintenance recommendation. `High` sorts last.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaintenanceRecommendation {
    /// Short action name, e.g. "Bearing Replacement"
    pub kind: String,
    pub priority: Priority,
    pub description: String,
    /// Suggested lead time before the action is due
    pub estimated_days: u32,
}

/// Operational efficiency estimates for one tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    /// 0-1
    pub efficiency: f64,
    /// 0.5-1, reduced by recent critical alarms
    pub uptime: f64,
    /// Relative throughput, 0-0.95
    pub throughput: f64,
    /// Electrical power draw (kW)
    pub energy_consumption: f64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            efficiency: 1.0,
            uptime: 1.0,
            throughput: 0.0,
            energy_consumption: 0.0,
        }
    }
}

/// Coarse machine status reported to the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    #[default]
    Running,
    Maintenance,
    Error,
}
