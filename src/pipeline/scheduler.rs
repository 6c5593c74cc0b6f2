//! Single interval-driven tick loop over every machine.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::machine::TickReport;
use super::state::{MachineHandle, Plant};
use crate::config::PlantConfig;
use crate::sensors::SensorError;
use crate::transmit::{OutboundMessage, Outbox};

/// Drives all machines of a plant from one tokio task.
///
/// Machines are ticked one after another inside the same interval tick,
/// so the loop only suspends between ticks.
#[derive(Debug, Clone)]
pub struct Scheduler {
    plant: Arc<Plant>,
    period: Duration,
    /// Operating hours added per tick
    hours_per_tick: f64,
    report_every_ticks: u64,
    outbox: Option<Outbox>,
}

impl Scheduler {
    pub fn new(plant: Arc<Plant>, config: &PlantConfig, outbox: Option<Outbox>) -> Self {
        let sim = &config.simulation;
        #[allow(clippy::cast_precision_loss)]
        let hours_per_tick = sim.tick_interval_ms as f64 / 1000.0 * sim.time_scale / 3600.0;
        Self {
            plant,
            period: Duration::from_millis(sim.tick_interval_ms.max(1)),
            hours_per_tick,
            report_every_ticks: config.transmitter.report_every_ticks.max(1),
            outbox,
        }
    }

    pub fn plant(&self) -> &Arc<Plant> {
        &self.plant
    }

    /// Advance every machine by one tick at `now` and queue its messages.
    ///
    /// Stops at the first machine whose sensors produce a numeric anomaly.
    pub fn tick_once(&self, now: DateTime<Utc>) -> Result<Vec<TickReport>, SensorError> {
        let mut reports = Vec::with_capacity(self.plant.len());
        for handle in self.plant.machines() {
            let report = self.tick_machine(handle, now)?;
            self.enqueue(handle, now, &report);
            reports.push(report);
        }
        Ok(reports)
    }

    fn tick_machine(&self, handle: &MachineHandle, now: DateTime<Utc>) -> Result<TickReport, SensorError> {
        let hours_per_tick = self.hours_per_tick;
        let drive = handle.drive().clone();
        handle
            .update(|machine| {
                let params = drive.params_at(machine.operating_hours() + hours_per_tick);
                machine.tick(&params, now)
            })
            .inspect_err(|e| {
                error!(machine = %handle.id(), error = %e, "Tick aborted");
            })
    }

    fn enqueue(&self, handle: &MachineHandle, now: DateTime<Utc>, report: &TickReport) {
        let Some(outbox) = &self.outbox else {
            return;
        };
        let machine_id = handle.id();

        outbox.push(OutboundMessage::SensorData {
            machine_id: machine_id.to_string(),
            snapshot: report.snapshot.clone(),
        });
        if !report.new_alarms.is_empty() {
            outbox.push(OutboundMessage::Alarms {
                machine_id: machine_id.to_string(),
                alarms: report.new_alarms.clone(),
            });
        }
        if report.tick % self.report_every_ticks == 0 {
            outbox.push(OutboundMessage::Health {
                machine_id: machine_id.to_string(),
                timestamp: now,
                health: report.health.clone(),
                performance: handle.view().performance,
            });
            if !report.recommendations.is_empty() {
                outbox.push(OutboundMessage::Recommendations {
                    machine_id: machine_id.to_string(),
                    timestamp: now,
                    recommendations: report.recommendations.clone(),
                });
            }
        }
    }

    /// Tick until cancelled.
    ///
    /// A numeric anomaly is fatal: it is returned so the supervisor can shut
    /// the service down.
    pub async fn run(self, cancel_token: CancellationToken) -> Result<u64, SensorError> {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = 0_u64;

        info!(
            machines = self.plant.len(),
            period_ms = u64::try_from(self.period.as_millis()).unwrap_or(u64::MAX),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                _ = interval.tick() => {}
            }
            self.tick_once(Utc::now())?;
            ticks += 1;
        }

        info!(ticks, "Scheduler stopped");
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmit::SharedStats;

    fn scheduler(outbox: Option<Outbox>) -> Scheduler {
        let mut config = PlantConfig::default();
        config.simulation.seed = Some(5);
        config.transmitter.report_every_ticks = 2;
        let plant = Arc::new(Plant::from_config(&config).unwrap());
        Scheduler::new(plant, &config, outbox)
    }

    #[test]
    fn test_tick_once_advances_every_machine() {
        let s = scheduler(None);
        let reports = s.tick_once(Utc::now()).unwrap();
        assert_eq!(reports.len(), 2);
        for handle in s.plant().machines() {
            let view = handle.view();
            assert_eq!(view.tick, 1);
            assert!((view.operating_hours - 1.0 / 3600.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_messages_queued_per_tick() {
        let (outbox, mut rx) = Outbox::channel(64, SharedStats::new(true));
        let s = scheduler(Some(outbox));
        let now = Utc::now();
        s.tick_once(now).unwrap();
        s.tick_once(now + chrono::Duration::seconds(1)).unwrap();

        let mut kinds = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            kinds.push(msg.kind());
        }
        assert_eq!(kinds.iter().filter(|k| **k == "sensor_data").count(), 4);
        assert_eq!(kinds.iter().filter(|k| **k == "health").count(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let s = scheduler(None);
        let token = CancellationToken::new();
        let plant = s.plant().clone();
        let handle = tokio::spawn(s.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        let ticks = handle.await.unwrap().unwrap();
        // The first interval tick completes immediately
        assert!(ticks >= 1);
        assert!(plant.machines().iter().all(|m| m.view().tick >= 1));
    }
}
