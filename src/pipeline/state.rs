//! Shared plant state
//!
//! Each machine sits behind a `std::sync::Mutex` that is held only for the
//! synchronous duration of a tick or a configuration change, never across
//! an `.await`. After every mutation an immutable [`MachineView`] is
//! published through `ArcSwap`, so API readers never take the lock for
//! ordinary reads and never observe a half-finished tick.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

use super::drive::DriveProfile;
use super::machine::Machine;
use crate::config::PlantConfig;
use crate::processing::Trend;
use crate::sensors::SensorError;
use crate::types::{
    AlarmRecord, ChannelSpec, Fault, HealthState, MachineKind, MachineStatus,
    MaintenanceRecommendation, PerformanceMetrics, SensorSnapshot,
};

// ============================================================================
// Published views
// ============================================================================

/// Everything readers see of one machine, as of its last completed tick.
#[derive(Debug, Clone, Serialize)]
pub struct MachineView {
    pub id: String,
    pub kind: MachineKind,
    pub tick: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub operating_hours: f64,
    pub status: MachineStatus,
    pub fault: Option<Fault>,
    pub snapshot: SensorSnapshot,
    pub trends: BTreeMap<String, Trend>,
    pub health: HealthState,
    pub performance: PerformanceMetrics,
    pub recommendations: Vec<MaintenanceRecommendation>,
    /// Alarm log, oldest first
    pub alarms: Vec<AlarmRecord>,
    /// Alarms still inside their cooldown when the view was published
    pub active_alarms: usize,
    pub channels: Vec<ChannelSpec>,
}

impl MachineView {
    /// The most recent `n` alarms, oldest first.
    pub fn recent_alarms(&self, n: usize) -> &[AlarmRecord] {
        &self.alarms[self.alarms.len().saturating_sub(n)..]
    }

    pub fn export(&self, alarm_count: usize) -> ExportDocument {
        ExportDocument {
            machine_id: self.id.clone(),
            kind: self.kind,
            exported_at: Utc::now(),
            operating_hours: self.operating_hours,
            status: self.status,
            fault: self.fault,
            readings: self.snapshot.clone(),
            trends: self.trends.clone(),
            failure_indicators: self.health.failure_indicators.clone(),
            health: self.health.clone(),
            performance: self.performance,
            recommendations: self.recommendations.clone(),
            alarms: self.recent_alarms(alarm_count).to_vec(),
            channels: self.channels.clone(),
        }
    }
}

/// Full export of one machine's state.
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub machine_id: String,
    pub kind: MachineKind,
    pub exported_at: DateTime<Utc>,
    pub operating_hours: f64,
    pub status: MachineStatus,
    pub fault: Option<Fault>,
    pub readings: SensorSnapshot,
    pub trends: BTreeMap<String, Trend>,
    pub failure_indicators: BTreeMap<String, f64>,
    pub health: HealthState,
    pub performance: PerformanceMetrics,
    pub recommendations: Vec<MaintenanceRecommendation>,
    pub alarms: Vec<AlarmRecord>,
    pub channels: Vec<ChannelSpec>,
}

// ============================================================================
// Machine handle
// ============================================================================

/// Shared access to one machine: locked mutation plus a lock-free view.
#[derive(Debug, Clone)]
pub struct MachineHandle {
    id: String,
    kind: MachineKind,
    drive: DriveProfile,
    machine: Arc<Mutex<Machine>>,
    view: Arc<ArcSwap<MachineView>>,
}

impl MachineHandle {
    pub fn new(machine: Machine, drive: DriveProfile) -> Self {
        let view = Arc::new(ArcSwap::from_pointee(machine.view()));
        Self {
            id: machine.id().to_string(),
            kind: machine.kind(),
            drive,
            machine: Arc::new(Mutex::new(machine)),
            view,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MachineKind {
        self.kind
    }

    pub fn drive(&self) -> &DriveProfile {
        &self.drive
    }

    /// Latest published view.
    pub fn view(&self) -> Arc<MachineView> {
        self.view.load_full()
    }

    /// Read the machine under its lock without republishing.
    ///
    /// A panic in an earlier holder does not leave the machine unusable:
    /// every mutation either completes or rolls back before it can panic.
    pub fn read<R>(&self, f: impl FnOnce(&Machine) -> R) -> R {
        let machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        f(&machine)
    }

    /// Mutate the machine under its lock, then publish a fresh view.
    pub fn update<R>(&self, f: impl FnOnce(&mut Machine) -> R) -> R {
        let mut machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut machine);
        self.view.store(Arc::new(machine.view()));
        result
    }
}

// ============================================================================
// Plant
// ============================================================================

/// All simulated machines, in id order.
#[derive(Debug, Clone, Default)]
pub struct Plant {
    machines: Vec<MachineHandle>,
}

impl Plant {
    /// Build every enabled machine. Any malformed channel table fails the
    /// whole plant.
    ///
    /// With a configured seed, machine `i` (in id order) uses `seed + i`.
    pub fn from_config(config: &PlantConfig) -> Result<Self, SensorError> {
        let mut machines = Vec::new();
        for (index, (id, machine_cfg)) in config.enabled_machines().enumerate() {
            let seed = config
                .simulation
                .seed
                .map(|s| s.wrapping_add(index as u64));
            let machine = Machine::from_config(id, machine_cfg, config, seed)?;
            info!(machine = %id, kind = %machine_cfg.kind, "Machine initialized");
            machines.push(MachineHandle::new(
                machine,
                DriveProfile::new(machine_cfg.drive()),
            ));
        }
        Ok(Self { machines })
    }

    pub fn from_handles(machines: Vec<MachineHandle>) -> Self {
        Self { machines }
    }

    pub fn machines(&self) -> &[MachineHandle] {
        &self.machines
    }

    pub fn get(&self, id: &str) -> Option<&MachineHandle> {
        self.machines.iter().find(|m| m.id() == id)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriveConfig;
    use crate::types::OperatingParams;

    fn handle() -> MachineHandle {
        let machine = Machine::with_defaults("elevator", MachineKind::BucketElevator, Some(3)).unwrap();
        MachineHandle::new(
            machine,
            DriveProfile::new(DriveConfig::for_kind(MachineKind::BucketElevator)),
        )
    }

    #[test]
    fn test_view_published_after_update() {
        let h = handle();
        assert_eq!(h.view().tick, 0);
        let params = h.drive().params_at(0.0);
        h.update(|m| m.tick(&params, Utc::now())).unwrap();
        let view = h.view();
        assert_eq!(view.tick, 1);
        assert!(view.updated_at.is_some());
        assert_eq!(view.snapshot.channels.len(), 5);
    }

    #[test]
    fn test_old_view_is_unaffected_by_later_ticks() {
        let h = handle();
        let params = h.drive().params_at(0.0);
        h.update(|m| m.tick(&params, Utc::now())).unwrap();
        let before = h.view();
        let later = OperatingParams {
            operating_hours: 1.0,
            ..params
        };
        h.update(|m| m.tick(&later, Utc::now())).unwrap();
        assert_eq!(before.tick, 1);
        assert_eq!(h.view().tick, 2);
    }

    #[test]
    fn test_plant_from_default_config() {
        let plant = Plant::from_config(&PlantConfig::default()).unwrap();
        assert_eq!(plant.len(), 2);
        assert!(plant.get("bucket_elevator").is_some());
        assert_eq!(plant.get("conveyor_belt").unwrap().kind(), MachineKind::ConveyorBelt);
        assert!(plant.get("missing").is_none());
    }

    #[test]
    fn test_disabled_machines_skipped() {
        let mut config = PlantConfig::default();
        config.machines.get_mut("conveyor_belt").unwrap().enabled = false;
        let plant = Plant::from_config(&config).unwrap();
        assert_eq!(plant.len(), 1);
    }

    #[test]
    fn test_recent_alarms_slice() {
        let h = handle();
        h.update(|m| m.pin("temperature_c", Some(79.0))).unwrap();
        let params = h.drive().params_at(0.0);
        h.update(|m| m.tick(&params, Utc::now())).unwrap();
        let view = h.view();
        assert_eq!(view.recent_alarms(20).len(), view.alarms.len());
        assert!(view.recent_alarms(0).is_empty());
    }
}
