use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::history::HistoryBuffer;
use super::model::{MachineProfile, RoleValues, SensorModel};
use super::SensorError;
use crate::types::{
    ChannelReading, ChannelSpec, Fault, HistoryPoint, Observation, OperatingParams, SensorSnapshot,
};

/// One live channel: spec, latest value, history and noise source.
#[derive(Debug, Clone)]
struct Channel {
    spec: ChannelSpec,
    value: f64,
    history: HistoryBuffer,
    noise: Normal<f64>,
    /// Forced reading that bypasses the model (still clamped)
    pinned: Option<f64>,
}

/// The named channels of one machine, advanced together once per tick.
///
/// Channels are evaluated in role order so that dependent quantities
/// (temperature from current, current from temperature) see a consistent
/// mix of this tick's and last tick's values.
#[derive(Debug, Clone)]
pub struct SensorBank {
    channels: Vec<Channel>,
    model: SensorModel,
    latest: RoleValues,
    /// Raw temperature carried between ticks by the thermal lag
    thermal: f64,
    rng: StdRng,
    last_update: Option<DateTime<Utc>>,
}

fn noise_source(spec: &ChannelSpec) -> Result<Normal<f64>, SensorError> {
    Normal::new(0.0, spec.noise_std).map_err(|e| {
        SensorError::configuration(format!("{}.noise_std: {e}", spec.name))
    })
}

impl SensorBank {
    /// Build a bank, failing fast on any malformed channel.
    ///
    /// Channel names and roles must be unique; every spec must pass
    /// [`ChannelSpec::validate`]. `seed` makes the noise reproducible.
    pub fn new(
        profile: MachineProfile,
        mut specs: Vec<ChannelSpec>,
        history_capacity: usize,
        seed: Option<u64>,
    ) -> Result<Self, SensorError> {
        let mut errors = Vec::new();
        if specs.is_empty() {
            errors.push("a sensor bank needs at least one channel".to_string());
        }
        if history_capacity == 0 {
            errors.push("history capacity must be > 0".to_string());
        }

        let mut names = HashSet::new();
        let mut roles = HashSet::new();
        for spec in &specs {
            if let Err(e) = spec.validate() {
                errors.extend(e);
            }
            if !names.insert(spec.name.clone()) {
                errors.push(format!("duplicate channel name '{}'", spec.name));
            }
            if !roles.insert(spec.role) {
                errors.push(format!("duplicate channel role '{}' on '{}'", spec.role, spec.name));
            }
        }
        if !errors.is_empty() {
            return Err(SensorError::Configuration(errors));
        }

        specs.sort_by_key(|s| s.role);
        let model = SensorModel::new(profile);
        let latest = model.initial_values();

        let channels = specs
            .into_iter()
            .map(|spec| {
                Ok(Channel {
                    value: spec.clamp(latest.get(spec.role)),
                    history: HistoryBuffer::new(history_capacity),
                    noise: noise_source(&spec)?,
                    pinned: None,
                    spec,
                })
            })
            .collect::<Result<Vec<_>, SensorError>>()?;

        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            thermal: latest.temperature,
            channels,
            model,
            latest,
            rng,
            last_update: None,
        })
    }

    /// Advance every channel by one tick.
    ///
    /// Per channel: physics, calibration, active fault, gaussian noise, a
    /// finiteness check and finally clamping to `[min, max]`. A non-finite
    /// value aborts the tick with [`SensorError::NumericAnomaly`] and leaves
    /// the bank exactly as it was.
    pub fn update(
        &mut self,
        params: &OperatingParams,
        fault: Option<Fault>,
        now: DateTime<Utc>,
    ) -> Result<SensorSnapshot, SensorError> {
        let inputs = [
            ("drive_speed", params.drive_speed),
            ("load_proxy", params.load_proxy),
            ("operating_hours", params.operating_hours),
        ];
        if let Some((name, value)) = inputs.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SensorError::NumericAnomaly {
                channel: (*name).to_string(),
                value: *value,
            });
        }

        let mut latest = self.latest;
        let mut thermal = self.thermal;
        let mut rng = self.rng.clone();
        let mut values = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let spec = &channel.spec;
            let value = match channel.pinned {
                Some(pinned) => pinned,
                None => {
                    let raw = self
                        .model
                        .raw_value(spec.role, params, &latest, &mut thermal, &mut rng);
                    let mut v = raw * spec.calibration_factor;
                    if let Some(fault) = fault {
                        v *= fault.multiplier(spec.role);
                    }
                    v + channel.noise.sample(&mut rng)
                }
            };

            if !value.is_finite() {
                return Err(SensorError::NumericAnomaly {
                    channel: spec.name.clone(),
                    value,
                });
            }

            let clamped = spec.clamp(value);
            latest.set(spec.role, clamped);
            values.push(clamped);
        }

        // Commit
        for (channel, value) in self.channels.iter_mut().zip(values) {
            channel.value = value;
            channel.history.push(HistoryPoint {
                timestamp: now,
                value,
            });
        }
        self.latest = latest;
        self.thermal = thermal;
        self.rng = rng;
        self.last_update = Some(now);

        debug!(channels = self.channels.len(), fault = ?fault, "Sensor bank updated");
        Ok(self.snapshot())
    }

    /// Current readings with their units and threshold status.
    pub fn snapshot(&self) -> SensorSnapshot {
        let channels: BTreeMap<String, ChannelReading> = self
            .channels
            .iter()
            .map(|c| {
                (
                    c.spec.name.clone(),
                    ChannelReading {
                        value: c.value,
                        unit: c.spec.unit.clone(),
                        status: c.spec.status_for(c.value),
                    },
                )
            })
            .collect();
        SensorSnapshot {
            timestamp: self.last_update.unwrap_or_default(),
            channels,
        }
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Latest value of every channel paired with its spec, in role order.
    pub fn observations(&self) -> Vec<Observation<'_>> {
        self.channels
            .iter()
            .map(|c| Observation {
                spec: &c.spec,
                value: c.value,
            })
            .collect()
    }

    pub fn specs(&self) -> impl Iterator<Item = &ChannelSpec> {
        self.channels.iter().map(|c| &c.spec)
    }

    /// Every channel's spec with its history, in role order.
    pub fn histories(&self) -> impl Iterator<Item = (&ChannelSpec, &HistoryBuffer)> {
        self.channels.iter().map(|c| (&c.spec, &c.history))
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.spec.name.clone()).collect()
    }

    fn find(&self, name: &str) -> Result<&Channel, SensorError> {
        self.channels
            .iter()
            .find(|c| c.spec.name == name)
            .ok_or_else(|| SensorError::UnknownChannel(name.to_string()))
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut Channel, SensorError> {
        self.channels
            .iter_mut()
            .find(|c| c.spec.name == name)
            .ok_or_else(|| SensorError::UnknownChannel(name.to_string()))
    }

    /// Configuration of one channel.
    pub fn channel(&self, name: &str) -> Result<&ChannelSpec, SensorError> {
        self.find(name).map(|c| &c.spec)
    }

    pub fn history(&self, name: &str) -> Result<&HistoryBuffer, SensorError> {
        self.find(name).map(|c| &c.history)
    }

    /// Override alarm and/or critical thresholds.
    ///
    /// The candidate spec is validated before it replaces the current one; on
    /// violation the channel keeps its previous thresholds.
    pub fn set_thresholds(
        &mut self,
        name: &str,
        alarm: Option<f64>,
        critical: Option<f64>,
    ) -> Result<ChannelSpec, SensorError> {
        let channel = self.find_mut(name)?;
        let mut candidate = channel.spec.clone();
        if let Some(alarm) = alarm {
            candidate.alarm_threshold = alarm;
        }
        if let Some(critical) = critical {
            candidate.critical_threshold = critical;
        }
        candidate.validate().map_err(SensorError::Configuration)?;
        channel.spec = candidate;
        Ok(channel.spec.clone())
    }

    /// Set the multiplicative calibration factor (must be finite and > 0).
    pub fn calibrate(&mut self, name: &str, factor: f64) -> Result<ChannelSpec, SensorError> {
        let channel = self.find_mut(name)?;
        let mut candidate = channel.spec.clone();
        candidate.calibration_factor = factor;
        candidate.validate().map_err(SensorError::Configuration)?;
        channel.spec = candidate;
        Ok(channel.spec.clone())
    }

    /// Force a channel to report `value` (clamped) until unpinned with `None`.
    pub fn pin(&mut self, name: &str, value: Option<f64>) -> Result<(), SensorError> {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(SensorError::configuration(format!(
                    "{name}: pinned value must be finite (got {v})"
                )));
            }
        }
        self.find_mut(name)?.pinned = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::catalog::default_channels;
    use crate::types::{ChannelStatus, MachineKind};
    use chrono::Duration;

    fn bank(kind: MachineKind) -> SensorBank {
        SensorBank::new(MachineProfile::for_kind(kind), default_channels(kind), 1000, Some(42)).unwrap()
    }

    fn params(hours: f64) -> OperatingParams {
        OperatingParams {
            drive_speed: 2.8,
            load_proxy: 160.0,
            operating_hours: hours,
        }
    }

    #[test]
    fn test_rejects_malformed_channel() {
        let mut specs = default_channels(MachineKind::BucketElevator);
        specs[0].alarm_threshold = 120.0;
        let err = SensorBank::new(MachineProfile::bucket_elevator(), specs, 100, None).unwrap_err();
        assert!(matches!(err, SensorError::Configuration(_)));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut specs = default_channels(MachineKind::BucketElevator);
        specs[1].name = specs[0].name.clone();
        let err = SensorBank::new(MachineProfile::bucket_elevator(), specs, 100, None).unwrap_err();
        assert!(err.to_string().contains("duplicate channel name"));
    }

    #[test]
    fn test_values_stay_within_bounds_under_every_fault() {
        for kind in [MachineKind::BucketElevator, MachineKind::ConveyorBelt] {
            for fault in Fault::ALL {
                let mut b = bank(kind);
                let start = Utc::now();
                for tick in 0..500 {
                    let now = start + Duration::seconds(tick);
                    let p = params(2000.0 + tick as f64 / 3600.0);
                    b.update(&p, Some(fault), now).unwrap();
                    for obs in b.observations() {
                        assert!(
                            obs.value >= obs.spec.min && obs.value <= obs.spec.max,
                            "{kind}/{fault}: {} = {} outside [{}, {}]",
                            obs.spec.name,
                            obs.value,
                            obs.spec.min,
                            obs.spec.max
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_non_finite_input_is_a_numeric_anomaly() {
        let mut b = bank(MachineKind::BucketElevator);
        let before = b.snapshot();
        let p = OperatingParams {
            drive_speed: f64::NAN,
            ..params(0.0)
        };
        let err = b.update(&p, None, Utc::now()).unwrap_err();
        assert!(matches!(err, SensorError::NumericAnomaly { .. }));
        assert_eq!(b.snapshot(), before);
    }

    #[test]
    fn test_same_seed_same_readings() {
        let mut a = bank(MachineKind::ConveyorBelt);
        let mut b = bank(MachineKind::ConveyorBelt);
        let now = Utc::now();
        for tick in 0..20 {
            let t = now + Duration::seconds(tick);
            let sa = a.update(&params(tick as f64 / 3600.0), None, t).unwrap();
            let sb = b.update(&params(tick as f64 / 3600.0), None, t).unwrap();
            assert_eq!(sa, sb);
        }
    }

    #[test]
    fn test_set_thresholds_round_trip() {
        let mut b = bank(MachineKind::BucketElevator);
        b.set_thresholds("speed_rpm", Some(80.0), Some(92.0)).unwrap();
        let spec = b.channel("speed_rpm").unwrap();
        assert_eq!(spec.alarm_threshold, 80.0);
        assert_eq!(spec.critical_threshold, 92.0);
    }

    #[test]
    fn test_invalid_thresholds_leave_channel_untouched() {
        let mut b = bank(MachineKind::BucketElevator);
        let err = b.set_thresholds("speed_rpm", None, Some(85.0)).unwrap_err();
        assert!(matches!(err, SensorError::Configuration(_)));
        let spec = b.channel("speed_rpm").unwrap();
        assert_eq!(spec.alarm_threshold, 90.0);
        assert_eq!(spec.critical_threshold, 95.0);
    }

    #[test]
    fn test_unknown_channel() {
        let mut b = bank(MachineKind::BucketElevator);
        assert!(matches!(
            b.calibrate("slippage_pct", 1.1),
            Err(SensorError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_calibration_rejects_non_positive() {
        let mut b = bank(MachineKind::BucketElevator);
        assert!(b.calibrate("load_kg", 0.0).is_err());
        assert_eq!(b.calibrate("load_kg", 1.05).unwrap().calibration_factor, 1.05);
    }

    #[test]
    fn test_pinned_channel_reports_pinned_value() {
        let mut b = bank(MachineKind::BucketElevator);
        b.pin("temperature_c", Some(72.0)).unwrap();
        let snap = b.update(&params(0.0), None, Utc::now()).unwrap();
        let reading = &snap.channels["temperature_c"];
        assert_eq!(reading.value, 72.0);
        assert_eq!(reading.status, ChannelStatus::Alarm);
    }

    #[test]
    fn test_history_grows_per_tick() {
        let mut b = bank(MachineKind::BucketElevator);
        let now = Utc::now();
        for tick in 0..15 {
            b.update(&params(0.0), None, now + Duration::seconds(tick)).unwrap();
        }
        assert_eq!(b.history("vibration_ms2").unwrap().len(), 15);
    }
}
