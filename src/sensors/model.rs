//! Physically-flavoured update functions for each channel role.
//!
//! All time-varying terms use the machine's operating time `t` (seconds) and
//! operating hours `h`, so a run is reproducible from its inputs and seed.

use rand::Rng;
use std::f64::consts::PI;

use crate::types::{ChannelRole, MachineKind, OperatingParams};

// ============================================================================
// Machine Profile
// ============================================================================

/// Scale constants that adapt the shared physics to one machine kind.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineProfile {
    /// Drive pulley radius (m). When set, speed is reported in rpm;
    /// otherwise the belt surface speed (m/s) is reported directly.
    pub pulley_radius_m: Option<f64>,
    /// Amplitude of the mechanical speed ripple
    pub speed_ripple: f64,
    /// Speed lost at reference load
    pub speed_drag: f64,
    /// Speed giving a full speed-dependent heat, vibration and current term
    pub speed_ref: f64,
    /// Load reading of the empty machine
    pub base_load: f64,
    /// Load added per material unit
    pub load_per_unit: f64,
    /// Amplitude of the cyclical loading term
    pub load_cycle: f64,
    /// Amplitude of the material-settling term
    pub load_settle: f64,
    /// Wear load coefficient, scaled by `min(h / 1000, 0.2)`
    pub load_wear: f64,
    /// Load giving a full load-dependent term
    pub load_ref: f64,
    /// Load at which the load-imbalance vibration is zero
    pub load_nominal: f64,
    pub current_ref: f64,
    pub ambient_c: f64,
    /// Centre of the resonant speed band (rpm), if the machine has one
    pub resonance_centre: Option<f64>,
}

impl MachineProfile {
    pub fn bucket_elevator() -> Self {
        Self {
            pulley_radius_m: Some(0.6),
            speed_ripple: 2.0,
            speed_drag: 5.0,
            speed_ref: 100.0,
            base_load: 100.0,
            load_per_unit: 2.5,
            load_cycle: 50.0,
            load_settle: 20.0,
            load_wear: 30.0,
            load_ref: 1000.0,
            load_nominal: 500.0,
            current_ref: 50.0,
            ambient_c: 25.0,
            resonance_centre: Some(50.0),
        }
    }

    pub fn conveyor_belt() -> Self {
        Self {
            pulley_radius_m: None,
            speed_ripple: 0.05,
            speed_drag: 0.1,
            speed_ref: 4.0,
            base_load: 0.0,
            load_per_unit: 2.0,
            load_cycle: 5.0,
            load_settle: 2.0,
            load_wear: 3.0,
            load_ref: 100.0,
            load_nominal: 50.0,
            current_ref: 50.0,
            ambient_c: 25.0,
            resonance_centre: None,
        }
    }

    pub fn for_kind(kind: MachineKind) -> Self {
        match kind {
            MachineKind::BucketElevator => Self::bucket_elevator(),
            MachineKind::ConveyorBelt => Self::conveyor_belt(),
        }
    }
}

// ============================================================================
// Role Values
// ============================================================================

/// Most recent reported value of each role.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoleValues {
    pub speed: f64,
    pub load: f64,
    pub temperature: f64,
    pub vibration: f64,
    pub current: f64,
    pub slippage: f64,
}

impl RoleValues {
    pub fn get(&self, role: ChannelRole) -> f64 {
        match role {
            ChannelRole::Speed => self.speed,
            ChannelRole::Load => self.load,
            ChannelRole::Temperature => self.temperature,
            ChannelRole::Vibration => self.vibration,
            ChannelRole::Current => self.current,
            ChannelRole::Slippage => self.slippage,
        }
    }

    pub fn set(&mut self, role: ChannelRole, value: f64) {
        match role {
            ChannelRole::Speed => self.speed = value,
            ChannelRole::Load => self.load = value,
            ChannelRole::Temperature => self.temperature = value,
            ChannelRole::Vibration => self.vibration = value,
            ChannelRole::Current => self.current = value,
            ChannelRole::Slippage => self.slippage = value,
        }
    }
}

// ============================================================================
// Sensor Model
// ============================================================================

/// Stateless physics for one machine. The only carried state (the thermal
/// lag) is passed in and returned by the caller.
#[derive(Debug, Clone)]
pub struct SensorModel {
    profile: MachineProfile,
}

/// Thermal response per tick of the first-order temperature lag.
const THERMAL_RESPONSE: f64 = 0.1;

/// Motor start surge period (s).
const START_SURGE_PERIOD_S: f64 = 300.0;

impl SensorModel {
    pub fn new(profile: MachineProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &MachineProfile {
        &self.profile
    }

    /// Initial reported values before the first tick.
    pub fn initial_values(&self) -> RoleValues {
        RoleValues {
            temperature: self.profile.ambient_c,
            ..RoleValues::default()
        }
    }

    /// Raw (uncalibrated, noiseless) value of `role` for this tick.
    ///
    /// `latest` holds the values already produced this tick for roles that
    /// precede `role`, and last tick's values for the rest. `thermal` is the
    /// previous raw temperature and is advanced when `role` is temperature.
    pub fn raw_value<R: Rng + ?Sized>(
        &self,
        role: ChannelRole,
        params: &OperatingParams,
        latest: &RoleValues,
        thermal: &mut f64,
        rng: &mut R,
    ) -> f64 {
        let t = params.operating_seconds();
        let h = params.operating_hours;
        match role {
            ChannelRole::Speed => self.speed(params.drive_speed, latest.load, t),
            ChannelRole::Load => self.load(params.load_proxy, t, h),
            ChannelRole::Temperature => {
                let target = self.temperature_target(latest, t, h);
                *thermal += (target - *thermal) * THERMAL_RESPONSE;
                *thermal
            }
            ChannelRole::Vibration => self.vibration(latest, t, h) + rng.gen_range(-1.0..1.0),
            ChannelRole::Current => self.current(latest, t, h),
            ChannelRole::Slippage => self.slippage(latest.load, t),
        }
    }

    fn speed(&self, drive_speed: f64, load: f64, t: f64) -> f64 {
        let p = &self.profile;
        let base = match p.pulley_radius_m {
            Some(radius) => drive_speed / (2.0 * PI * radius) * 60.0,
            None => drive_speed,
        };
        let ripple = (t * 2.0).sin() * p.speed_ripple;
        let drag = load / p.load_ref * p.speed_drag;
        (base + ripple - drag).max(0.0)
    }

    fn load(&self, load_proxy: f64, t: f64, h: f64) -> f64 {
        let p = &self.profile;
        p.base_load
            + load_proxy * p.load_per_unit
            + (t * 0.1).sin() * p.load_cycle
            + (t * 0.05).cos() * p.load_settle
            + (h / 1000.0).min(0.2) * p.load_wear
    }

    fn temperature_target(&self, latest: &RoleValues, t: f64, h: f64) -> f64 {
        let p = &self.profile;
        let motor_heat = latest.current / p.current_ref * 25.0;
        let friction_heat = latest.load / p.load_ref * 15.0;
        let speed_heat = latest.speed / p.speed_ref * 10.0;
        let buildup = (h / 4.0).min(1.0) * 20.0;
        let daily_cycle = (t / 86_400.0 * 2.0 * PI).sin() * 5.0;
        p.ambient_c + motor_heat + friction_heat + speed_heat + buildup + daily_cycle
    }

    fn vibration(&self, latest: &RoleValues, t: f64, h: f64) -> f64 {
        let p = &self.profile;
        let speed_term = latest.speed / p.speed_ref * 6.0;
        let imbalance = (latest.load - p.load_nominal).abs() / p.load_nominal * 4.0;
        let bearing_wear = (h / 1000.0).min(1.0) * 8.0;
        let misalignment = (t * 0.3).sin() * 2.0;
        let resonance = match p.resonance_centre {
            Some(centre) if (latest.speed - centre).abs() <= 5.0 => {
                3.0 * ((latest.speed - centre) * PI / 5.0).sin()
            }
            _ => 0.0,
        };
        2.0 + speed_term + imbalance + bearing_wear + misalignment + resonance
    }

    fn current(&self, latest: &RoleValues, t: f64, h: f64) -> f64 {
        let p = &self.profile;
        let phase = t.rem_euclid(START_SURGE_PERIOD_S);
        let surge = if phase < 2.0 { 10.0 * (-phase).exp() } else { 0.0 };
        let draw = 5.0 + latest.load / p.load_ref * 25.0 + latest.speed / p.speed_ref * 8.0 + surge;
        let thermal_factor = 1.0 + (latest.temperature - 40.0).max(0.0) * 0.01;
        let wear_factor = 1.0 + (h / 2000.0).min(0.15);
        let power_factor = 1.0 + (t * 0.7).sin() * 0.1;
        draw * thermal_factor * wear_factor * power_factor
    }

    fn slippage(&self, load: f64, t: f64) -> f64 {
        0.5 + load / self.profile.load_ref * 5.0 + (t / 10_000.0).min(1.0) * 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(drive_speed: f64, load_proxy: f64, operating_hours: f64) -> OperatingParams {
        OperatingParams {
            drive_speed,
            load_proxy,
            operating_hours,
        }
    }

    #[test]
    fn test_elevator_speed_converts_to_rpm() {
        let model = SensorModel::new(MachineProfile::bucket_elevator());
        let mut rng = StdRng::seed_from_u64(1);
        let mut thermal = 25.0;
        let rpm = model.raw_value(
            ChannelRole::Speed,
            &params(2.0 * PI * 0.6, 0.0, 0.0),
            &RoleValues::default(),
            &mut thermal,
            &mut rng,
        );
        // One pulley revolution per second at t = 0, no ripple, no load
        assert!((rpm - 60.0).abs() < 1e-9, "rpm: {rpm}");
    }

    #[test]
    fn test_speed_never_negative() {
        let model = SensorModel::new(MachineProfile::conveyor_belt());
        let latest = RoleValues {
            load: 100.0,
            ..RoleValues::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut thermal = 25.0;
        let v = model.raw_value(ChannelRole::Speed, &params(0.0, 0.0, 0.0), &latest, &mut thermal, &mut rng);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn test_temperature_lags_toward_target() {
        let model = SensorModel::new(MachineProfile::bucket_elevator());
        let latest = RoleValues {
            current: 50.0,
            load: 1000.0,
            speed: 100.0,
            ..RoleValues::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut thermal = 25.0;
        let p = params(0.0, 0.0, 0.0);
        let first = model.raw_value(ChannelRole::Temperature, &p, &latest, &mut thermal, &mut rng);
        // Target is 25 + 25 + 15 + 10 = 75, so one step moves 10% of the gap
        assert!((first - 30.0).abs() < 1e-9, "first: {first}");
        let second = model.raw_value(ChannelRole::Temperature, &p, &latest, &mut thermal, &mut rng);
        assert!(second > first && second < 75.0);
    }

    #[test]
    fn test_current_start_surge() {
        let model = SensorModel::new(MachineProfile::bucket_elevator());
        let latest = RoleValues::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut thermal = 25.0;
        let at_start = model.raw_value(ChannelRole::Current, &params(0.0, 0.0, 0.0), &latest, &mut thermal, &mut rng);
        assert!((at_start - 15.0).abs() < 1e-9, "surge: {at_start}");

        let later = params(0.0, 0.0, 150.0 / 3600.0);
        let quiet = model.raw_value(ChannelRole::Current, &later, &latest, &mut thermal, &mut rng);
        assert!(quiet < 6.0, "no surge mid-period: {quiet}");
    }

    #[test]
    fn test_resonance_only_near_centre() {
        let model = SensorModel::new(MachineProfile::bucket_elevator());
        let at = |speed: f64| RoleValues {
            speed,
            load: 500.0,
            ..RoleValues::default()
        };
        // Outside the band resonance contributes nothing
        let far = model.vibration(&at(70.0), 0.0, 0.0);
        assert!((far - (2.0 + 70.0 / 100.0 * 6.0)).abs() < 1e-9);
        // Inside the band the bump is added
        let near = model.vibration(&at(52.5), 0.0, 0.0);
        let expected = 2.0 + 52.5 / 100.0 * 6.0 + 3.0;
        assert!((near - expected).abs() < 1e-9, "near: {near}");
    }
}
