//! Efficiency, uptime, throughput and energy estimates

use std::collections::VecDeque;

use crate::types::{
    AlarmRecord, ChannelRole, HealthState, MachineStatus, Observation, PerformanceMetrics, Severity,
};

/// Supply voltage factor converting motor current (A) to power (kW).
const KW_PER_AMP: f64 = 0.4;

/// Rated power draw (kW) at which efficiency starts to fall below 1.
const RATED_POWER_KW: f64 = 30.0;

/// Uptime lost per CRITICAL alarm among the last ten.
const UPTIME_LOSS_PER_CRITICAL: f64 = 0.1;

const UPTIME_ALARM_WINDOW: usize = 10;

/// Compute performance metrics from the latest observations and alarm log.
pub fn compute(observations: &[Observation<'_>], alarm_log: &VecDeque<AlarmRecord>) -> PerformanceMetrics {
    let find = |role: ChannelRole| observations.iter().find(|o| o.spec.role == role);

    let power_kw = find(ChannelRole::Current).map_or(0.0, |c| c.value * KW_PER_AMP);
    let efficiency = (RATED_POWER_KW / power_kw.max(1.0)).min(1.0);

    #[allow(clippy::cast_precision_loss)]
    let recent_critical = alarm_log
        .iter()
        .rev()
        .take(UPTIME_ALARM_WINDOW)
        .filter(|a| a.severity == Severity::Critical)
        .count() as f64;
    let uptime = (1.0 - recent_critical * UPTIME_LOSS_PER_CRITICAL).max(0.5);

    let throughput = match (find(ChannelRole::Speed), find(ChannelRole::Load)) {
        (Some(speed), Some(load)) => {
            let speed_ratio = speed.value / speed.spec.optimal_range.1.max(f64::EPSILON);
            let fill_ratio = (load.value / load.spec.optimal_range.1.max(f64::EPSILON)).min(1.0);
            (speed_ratio * fill_ratio * 0.95).clamp(0.0, 0.95)
        }
        _ => 0.0,
    };

    PerformanceMetrics {
        efficiency,
        uptime,
        throughput,
        energy_consumption: power_kw,
    }
}

/// Coarse status: `Maintenance` when health is below `maintenance_below`,
/// otherwise `Error` when a CRITICAL alarm fired this tick, else `Running`.
pub fn machine_status(
    health: &HealthState,
    new_alarms: &[AlarmRecord],
    maintenance_below: f64,
) -> MachineStatus {
    if health.health_score < maintenance_below {
        MachineStatus::Maintenance
    } else if new_alarms.iter().any(|a| a.severity == Severity::Critical) {
        MachineStatus::Error
    } else {
        MachineStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::catalog::default_channels;
    use crate::types::{AlarmKind, MachineKind};
    use chrono::Utc;

    fn alarm(severity: Severity) -> AlarmRecord {
        AlarmRecord {
            timestamp: Utc::now(),
            channel: "current_a".to_string(),
            severity,
            kind: AlarmKind::Threshold,
            priority: severity.priority(),
            value: 0.0,
            threshold: 0.0,
            message: String::new(),
        }
    }

    #[test]
    fn test_nominal_elevator_metrics() {
        let specs = default_channels(MachineKind::BucketElevator);
        let obs: Vec<_> = specs
            .iter()
            .map(|spec| Observation { spec, value: spec.nominal() })
            .collect();
        let m = compute(&obs, &VecDeque::new());
        // 25 A -> 10 kW, well under rated power
        assert_eq!(m.efficiency, 1.0);
        assert!((m.energy_consumption - 10.0).abs() < 1e-9);
        assert_eq!(m.uptime, 1.0);
        assert!(m.throughput > 0.0 && m.throughput <= 0.95);
    }

    #[test]
    fn test_uptime_floor() {
        let log: VecDeque<_> = (0..10).map(|_| alarm(Severity::Critical)).collect();
        let m = compute(&[], &log);
        assert_eq!(m.uptime, 0.5);
        assert_eq!(m.throughput, 0.0);
    }

    #[test]
    fn test_status_precedence() {
        let healthy = HealthState::default();
        assert_eq!(machine_status(&healthy, &[], 70.0), MachineStatus::Running);
        assert_eq!(
            machine_status(&healthy, &[alarm(Severity::Critical)], 70.0),
            MachineStatus::Error
        );
        let worn = HealthState {
            health_score: 65.0,
            ..HealthState::default()
        };
        assert_eq!(machine_status(&worn, &[alarm(Severity::High)], 70.0), MachineStatus::Maintenance);
        // Low health wins over a critical alarm
        assert_eq!(
            machine_status(&worn, &[alarm(Severity::Critical)], 70.0),
            MachineStatus::Maintenance
        );
    }
}
