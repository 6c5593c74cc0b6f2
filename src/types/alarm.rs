//! Alarm records, severities and cooldown keys

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alarm severity. Ordered so that `Critical` is the most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Operator priority: 1 is the most urgent.
    pub fn priority(self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::High => 2,
            Self::Medium => 3,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Medium => f.write_str("MEDIUM"),
            Self::High => f.write_str("HIGH"),
            Self::Critical => f.write_str("CRITICAL"),
        }
    }
}

/// What triggered an alarm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlarmKind {
    /// Current value crossed the alarm or critical threshold
    Threshold,
    /// Regression projection will cross the alarm threshold
    Trend,
}

/// Key under which alarm cooldowns are tracked.
///
/// Threshold alarms are keyed per severity so that an escalation from HIGH to
/// CRITICAL is never suppressed by the earlier HIGH alarm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    pub channel: String,
    pub kind: AlarmKind,
    pub severity: Severity,
}

impl std::fmt::Display for CooldownKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            AlarmKind::Threshold => write!(f, "{}_{}", self.channel, self.severity),
            AlarmKind::Trend => write!(f, "{}_trend", self.channel),
        }
    }
}

/// Immutable record of an emitted alarm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlarmRecord {
    pub timestamp: DateTime<Utc>,
    pub channel: String,
    pub severity: Severity,
    pub kind: AlarmKind,
    pub priority: u8,
    /// Reading (or projected reading for trend alarms) that raised the alarm
    pub value: f64,
    /// Threshold that was crossed
    pub threshold: f64,
    pub message: String,
}

impl AlarmRecord {
    pub fn cooldown_key(&self) -> CooldownKey {
        CooldownKey {
            channel: self.channel.clone(),
            kind: self.kind,
            severity: self.severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_and_priority() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert_eq!(Severity::Critical.priority(), 1);
        assert_eq!(Severity::Medium.priority(), 3);
    }

    #[test]
    fn test_cooldown_key_display() {
        let key = CooldownKey {
            channel: "speed_rpm".to_string(),
            kind: AlarmKind::Threshold,
            severity: Severity::High,
        };
        assert_eq!(key.to_string(), "speed_rpm_HIGH");

        let trend = CooldownKey {
            kind: AlarmKind::Trend,
            severity: Severity::Medium,
            ..key
        };
        assert_eq!(trend.to_string(), "speed_rpm_trend");
    }
}
