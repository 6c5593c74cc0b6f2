//! One simulated machine and its per-tick evaluation.
//!
//! A [`Machine`] owns everything that evolves for a single bucket elevator or
//! conveyor belt: the sensor bank, the alarm engine with its cooldown table
//! and log, the latest trends, health, performance and recommendations, the
//! active fault and the operating time. Nothing here is shared; concurrency
//! is layered on top by [`super::MachineHandle`].

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::state::{ExportDocument, MachineView};
use crate::config::{defaults, MachineConfig, PlantConfig};
use crate::processing::{
    performance, AlarmEngine, AlarmSettings, HealthScorer, HealthSettings, RecommendationEngine,
    Trend, TrendAnalyzer,
};
use crate::sensors::{MachineProfile, SensorBank, SensorError};
use crate::types::{
    AlarmRecord, ChannelSpec, Fault, HealthState, HistoryPoint, MachineKind, MachineStatus,
    MaintenanceRecommendation, OperatingParams, PerformanceMetrics, SensorSnapshot,
};

/// Everything a tick produced that the scheduler forwards outward.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub snapshot: SensorSnapshot,
    /// Alarms emitted this tick (cooldown-suppressed ones excluded)
    pub new_alarms: Vec<AlarmRecord>,
    pub health: HealthState,
    pub recommendations: Vec<MaintenanceRecommendation>,
}

#[derive(Debug, Clone)]
pub struct Machine {
    id: String,
    kind: MachineKind,
    bank: SensorBank,
    alarms: AlarmEngine,
    trend_analyzer: TrendAnalyzer,
    scorer: HealthScorer,
    recommender: RecommendationEngine,
    trends: BTreeMap<String, Trend>,
    health: HealthState,
    recommendations: Vec<MaintenanceRecommendation>,
    performance: PerformanceMetrics,
    status: MachineStatus,
    maintenance_below: f64,
    operating_hours: f64,
    fault: Option<Fault>,
    tick_count: u64,
}

impl Machine {
    /// Build a machine from its config section and the plant-wide tunables.
    pub fn from_config(
        id: &str,
        machine: &MachineConfig,
        plant: &PlantConfig,
        seed: Option<u64>,
    ) -> Result<Self, SensorError> {
        let specs = machine.resolve_channels().map_err(SensorError::Configuration)?;
        let sim = &plant.simulation;
        let bank = SensorBank::new(
            MachineProfile::for_kind(machine.kind),
            specs,
            sim.history_capacity,
            seed,
        )?;

        Ok(Self {
            id: id.to_string(),
            kind: machine.kind,
            bank,
            alarms: AlarmEngine::new(AlarmSettings::from(&plant.alarms)),
            trend_analyzer: TrendAnalyzer::new(sim.trend_window, sim.trend_min_points),
            scorer: HealthScorer::new(HealthSettings::from(&plant.health)),
            recommender: RecommendationEngine::new(plant.recommendations.clone()),
            trends: BTreeMap::new(),
            health: HealthState::default(),
            recommendations: Vec::new(),
            performance: PerformanceMetrics::default(),
            status: MachineStatus::Running,
            maintenance_below: sim.maintenance_status_below,
            operating_hours: 0.0,
            fault: None,
            tick_count: 0,
        })
    }

    /// A machine with the kind's default channels and default tunables.
    pub fn with_defaults(id: &str, kind: MachineKind, seed: Option<u64>) -> Result<Self, SensorError> {
        Self::from_config(id, &MachineConfig::new(kind), &PlantConfig::default(), seed)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MachineKind {
        self.kind
    }

    pub fn operating_hours(&self) -> f64 {
        self.operating_hours
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    pub fn trends(&self) -> &BTreeMap<String, Trend> {
        &self.trends
    }

    pub fn recommendations(&self) -> &[MaintenanceRecommendation] {
        &self.recommendations
    }

    pub fn performance(&self) -> PerformanceMetrics {
        self.performance
    }

    pub fn alarm_log(&self) -> Vec<AlarmRecord> {
        self.alarms.log().iter().cloned().collect()
    }

    /// Run one full evaluation at `now`.
    ///
    /// Order: sensor update, trend per channel, alarms, health, performance,
    /// recommendations. A sensor error aborts the tick before any state
    /// beyond the bank is touched, and the bank itself rolls back.
    pub fn tick(&mut self, params: &OperatingParams, now: DateTime<Utc>) -> Result<TickReport, SensorError> {
        let snapshot = self.bank.update(params, self.fault, now)?;
        self.operating_hours = params.operating_hours;

        let window = self.trend_analyzer.window();
        self.trends = self
            .bank
            .histories()
            .map(|(spec, history)| {
                (
                    spec.name.clone(),
                    self.trend_analyzer.analyze(&history.recent_values(window)),
                )
            })
            .collect();

        let observations = self.bank.observations();
        let new_alarms = self.alarms.evaluate(now, &observations, &self.trends);
        self.health = self.scorer.score(
            &observations,
            &self.trends,
            self.operating_hours,
            self.alarms.log(),
        );
        self.performance = performance::compute(&observations, self.alarms.log());
        self.status = performance::machine_status(&self.health, &new_alarms, self.maintenance_below);
        self.recommendations = self.recommender.recommend(&self.health, self.operating_hours);
        self.tick_count += 1;

        debug!(
            machine = %self.id,
            tick = self.tick_count,
            health = self.health.health_score,
            alarms = new_alarms.len(),
            "Tick evaluated"
        );

        Ok(TickReport {
            tick: self.tick_count,
            snapshot,
            new_alarms,
            health: self.health.clone(),
            recommendations: self.recommendations.clone(),
        })
    }

    /// Latest reading of every channel with unit and threshold status.
    pub fn get_snapshot(&self) -> SensorSnapshot {
        self.bank.snapshot()
    }

    /// Override one channel's alarm and/or critical threshold.
    ///
    /// Rejected updates leave the channel as it was.
    pub fn set_thresholds(
        &mut self,
        channel: &str,
        alarm: Option<f64>,
        critical: Option<f64>,
    ) -> Result<ChannelSpec, SensorError> {
        let spec = self.bank.set_thresholds(channel, alarm, critical)?;
        info!(
            machine = %self.id,
            channel,
            alarm = spec.alarm_threshold,
            critical = spec.critical_threshold,
            "Thresholds updated"
        );
        Ok(spec)
    }

    pub fn calibrate(&mut self, channel: &str, factor: f64) -> Result<ChannelSpec, SensorError> {
        let spec = self.bank.calibrate(channel, factor)?;
        info!(machine = %self.id, channel, factor, "Calibration updated");
        Ok(spec)
    }

    /// Activate a fault, or clear it with `None`.
    pub fn set_fault(&mut self, fault: Option<Fault>) {
        if self.fault != fault {
            match fault {
                Some(f) => info!(machine = %self.id, fault = %f, "Fault injected"),
                None => info!(machine = %self.id, "Fault cleared"),
            }
        }
        self.fault = fault;
    }

    /// Force a channel reading, or release it with `None`.
    pub fn pin(&mut self, channel: &str, value: Option<f64>) -> Result<(), SensorError> {
        self.bank.pin(channel, value)
    }

    /// Clear the alarm log and cooldown table.
    pub fn reset_alarms(&mut self) {
        self.alarms.reset();
        info!(machine = %self.id, "Alarm log cleared");
    }

    pub fn channel(&self, channel: &str) -> Result<ChannelSpec, SensorError> {
        self.bank.channel(channel).cloned()
    }

    pub fn channels(&self) -> Vec<ChannelSpec> {
        self.bank.specs().cloned().collect()
    }

    /// The most recent `limit` history points of a channel, oldest first.
    pub fn history(&self, channel: &str, limit: usize) -> Result<Vec<HistoryPoint>, SensorError> {
        Ok(self.bank.history(channel)?.tail(limit))
    }

    /// Immutable copy of everything readers need.
    pub fn view(&self) -> MachineView {
        MachineView {
            id: self.id.clone(),
            kind: self.kind,
            tick: self.tick_count,
            updated_at: self.bank.last_update(),
            operating_hours: self.operating_hours,
            status: self.status,
            fault: self.fault,
            snapshot: self.bank.snapshot(),
            trends: self.trends.clone(),
            health: self.health.clone(),
            performance: self.performance,
            recommendations: self.recommendations.clone(),
            alarms: self.alarm_log(),
            active_alarms: self.alarms.active(Utc::now()).len(),
            channels: self.channels(),
        }
    }

    /// Full export: readings, trends, indicators, recommendations, the
    /// most recent alarms and channel configuration.
    pub fn export(&self) -> ExportDocument {
        self.view().export(defaults::EXPORT_ALARM_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn machine(kind: MachineKind) -> Machine {
        Machine::with_defaults("m1", kind, Some(11)).unwrap()
    }

    fn params(hours: f64) -> OperatingParams {
        OperatingParams {
            drive_speed: 1.5,
            load_proxy: 25.0,
            operating_hours: hours,
        }
    }

    #[test]
    fn test_tick_updates_everything() {
        let mut m = machine(MachineKind::ConveyorBelt);
        let start = Utc::now();
        for i in 0..30_i32 {
            m.tick(&params(f64::from(i) / 3600.0), start + Duration::seconds(i.into()))
                .unwrap();
        }
        assert_eq!(m.tick_count(), 30);
        assert_eq!(m.trends().len(), 6);
        assert_eq!(m.get_snapshot().channels.len(), 6);
        assert!((0.0..=100.0).contains(&m.health().health_score));
        assert_eq!(m.history("slippage_pct", 10).unwrap().len(), 10);
    }

    #[test]
    fn test_numeric_anomaly_leaves_machine_untouched() {
        let mut m = machine(MachineKind::BucketElevator);
        m.tick(&params(0.0), Utc::now()).unwrap();
        let before = m.get_snapshot();
        let bad = OperatingParams {
            load_proxy: f64::INFINITY,
            ..params(0.1)
        };
        assert!(matches!(
            m.tick(&bad, Utc::now()),
            Err(SensorError::NumericAnomaly { .. })
        ));
        assert_eq!(m.tick_count(), 1);
        assert_eq!(m.operating_hours(), 0.0);
        assert_eq!(m.get_snapshot(), before);
    }

    #[test]
    fn test_critical_alarm_sets_error_status() {
        let mut m = machine(MachineKind::BucketElevator);
        m.pin("temperature_c", Some(78.0)).unwrap();
        let report = m.tick(&params(0.0), Utc::now()).unwrap();
        assert!(report.new_alarms.iter().any(|a| a.channel == "temperature_c"));
        assert_eq!(m.status(), MachineStatus::Error);
    }

    #[test]
    fn test_fault_and_reset() {
        let mut m = machine(MachineKind::BucketElevator);
        m.set_fault(Some(Fault::Overheating));
        assert_eq!(m.view().fault, Some(Fault::Overheating));
        m.pin("current_a", Some(49.0)).unwrap();
        m.tick(&params(0.0), Utc::now()).unwrap();
        assert!(!m.alarm_log().is_empty());
        m.reset_alarms();
        assert!(m.alarm_log().is_empty());
        m.set_fault(None);
        assert_eq!(m.fault(), None);
    }

    #[test]
    fn test_export_contains_channels_and_alarms() {
        let mut m = machine(MachineKind::ConveyorBelt);
        m.pin("speed_ms", Some(3.9)).unwrap();
        m.tick(&params(0.0), Utc::now()).unwrap();
        let doc = m.export();
        assert_eq!(doc.machine_id, "m1");
        assert_eq!(doc.channels.len(), 6);
        assert_eq!(doc.alarms.len(), 1);
        assert!(doc.readings.channels.contains_key("speed_ms"));
    }
}
