//! Default channel tables per machine kind.
//!
//! Every table satisfies `min < alarm < critical < max` and keeps the optimal
//! range inside `[min, max]`. Operators override individual fields through
//! `[machines.<id>.channels.<name>]` in the plant config.

use crate::types::{ChannelRole, ChannelSpec, MachineKind};

fn channel(
    name: &str,
    unit: &str,
    role: ChannelRole,
    (min, max): (f64, f64),
    optimal_range: (f64, f64),
    (alarm_threshold, critical_threshold): (f64, f64),
    noise_std: f64,
) -> ChannelSpec {
    ChannelSpec {
        name: name.to_string(),
        unit: unit.to_string(),
        role,
        min,
        max,
        optimal_range,
        alarm_threshold,
        critical_threshold,
        calibration_factor: 1.0,
        noise_std,
    }
}

/// Channel table for a machine kind, in evaluation order.
pub fn default_channels(kind: MachineKind) -> Vec<ChannelSpec> {
    use ChannelRole as R;
    match kind {
        MachineKind::BucketElevator => vec![
            channel("speed_rpm", "rpm", R::Speed, (0.0, 100.0), (40.0, 60.0), (90.0, 95.0), 0.5),
            channel("load_kg", "kg", R::Load, (0.0, 1000.0), (400.0, 700.0), (900.0, 950.0), 2.0),
            channel("temperature_c", "°C", R::Temperature, (20.0, 80.0), (25.0, 45.0), (70.0, 75.0), 0.3),
            channel("vibration_ms2", "m/s²", R::Vibration, (0.0, 20.0), (2.0, 8.0), (15.0, 18.0), 0.2),
            channel("current_a", "A", R::Current, (0.0, 50.0), (15.0, 35.0), (45.0, 48.0), 0.1),
        ],
        MachineKind::ConveyorBelt => vec![
            channel("speed_ms", "m/s", R::Speed, (0.0, 4.0), (1.0, 2.5), (3.2, 3.6), 0.03),
            channel("load_pct", "%", R::Load, (0.0, 100.0), (30.0, 80.0), (85.0, 95.0), 0.5),
            channel("temperature_c", "°C", R::Temperature, (20.0, 80.0), (25.0, 45.0), (70.0, 75.0), 0.3),
            channel("vibration_ms2", "m/s²", R::Vibration, (0.0, 20.0), (2.0, 8.0), (15.0, 18.0), 0.2),
            channel("current_a", "A", R::Current, (0.0, 50.0), (10.0, 35.0), (45.0, 48.0), 0.1),
            channel("slippage_pct", "%", R::Slippage, (0.0, 10.0), (0.0, 4.0), (8.0, 9.0), 0.1),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_are_valid() {
        for kind in [MachineKind::BucketElevator, MachineKind::ConveyorBelt] {
            for spec in default_channels(kind) {
                assert!(spec.validate().is_ok(), "{kind}: {} invalid", spec.name);
            }
        }
    }

    #[test]
    fn test_tables_are_in_role_order() {
        for kind in [MachineKind::BucketElevator, MachineKind::ConveyorBelt] {
            let roles: Vec<_> = default_channels(kind).iter().map(|c| c.role).collect();
            let mut sorted = roles.clone();
            sorted.sort();
            assert_eq!(roles, sorted);
        }
    }

    #[test]
    fn test_only_conveyor_has_slippage() {
        let has_slip = |kind| {
            default_channels(kind)
                .iter()
                .any(|c| c.role == ChannelRole::Slippage)
        };
        assert!(has_slip(MachineKind::ConveyorBelt));
        assert!(!has_slip(MachineKind::BucketElevator));
    }
}
