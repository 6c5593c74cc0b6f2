//! Bounded outbound queue and transmission statistics

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::client::{TransmitError, Transmitter};
use crate::types::{
    AlarmRecord, HealthState, MaintenanceRecommendation, PerformanceMetrics, SensorSnapshot,
};

/// One queued transmission.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    SensorData {
        machine_id: String,
        snapshot: SensorSnapshot,
    },
    Alarms {
        machine_id: String,
        alarms: Vec<AlarmRecord>,
    },
    Health {
        machine_id: String,
        timestamp: DateTime<Utc>,
        health: HealthState,
        performance: PerformanceMetrics,
    },
    Recommendations {
        machine_id: String,
        timestamp: DateTime<Utc>,
        recommendations: Vec<MaintenanceRecommendation>,
    },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SensorData { .. } => "sensor_data",
            Self::Alarms { .. } => "alarms",
            Self::Health { .. } => "health",
            Self::Recommendations { .. } => "recommendations",
        }
    }

    pub fn machine_id(&self) -> &str {
        match self {
            Self::SensorData { machine_id, .. }
            | Self::Alarms { machine_id, .. }
            | Self::Health { machine_id, .. }
            | Self::Recommendations { machine_id, .. } => machine_id,
        }
    }

    /// Send through the matching transmitter method.
    pub async fn dispatch(&self, transmitter: &dyn Transmitter) -> Result<(), TransmitError> {
        match self {
            Self::SensorData { machine_id, snapshot } => {
                transmitter.send_sensor_data(machine_id, snapshot).await
            }
            Self::Alarms { machine_id, alarms } => transmitter.send_alarms(machine_id, alarms).await,
            Self::Health {
                machine_id,
                timestamp,
                health,
                performance,
            } => {
                transmitter
                    .send_health(machine_id, *timestamp, health, performance)
                    .await
            }
            Self::Recommendations {
                machine_id,
                timestamp,
                recommendations,
            } => {
                transmitter
                    .send_recommendations(machine_id, *timestamp, recommendations)
                    .await
            }
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Connection statistics served by `GET /api/v1/transmitter`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TransmitterStats {
    pub enabled: bool,
    /// False while in the offline period after a message exhausted its retries
    pub online: bool,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Messages never delivered (full outbox, exhausted retries, offline)
    pub dropped_messages: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// `successful / total`, 0 before the first request
    pub success_rate: f64,
}

/// Statistics shared between the outbox, the uploader and the API.
#[derive(Debug, Clone, Default)]
pub struct SharedStats(Arc<Mutex<TransmitterStats>>);

impl SharedStats {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(Mutex::new(TransmitterStats {
            enabled,
            online: enabled,
            ..TransmitterStats::default()
        })))
    }

    fn update(&self, f: impl FnOnce(&mut TransmitterStats)) {
        let mut stats = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats);
    }

    pub fn record_success(&self) {
        self.update(|s| {
            s.total_requests += 1;
            s.successful_requests += 1;
            s.last_success = Some(Utc::now());
        });
    }

    pub fn record_failure(&self, error: &TransmitError) {
        let message = error.to_string();
        self.update(|s| {
            s.total_requests += 1;
            s.failed_requests += 1;
            s.last_failure = Some(Utc::now());
            s.last_error = Some(message);
        });
    }

    pub fn record_drop(&self) {
        self.update(|s| s.dropped_messages += 1);
    }

    pub fn set_online(&self, online: bool) {
        self.update(|s| s.online = online);
    }

    /// Point-in-time copy with the success rate filled in.
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self) -> TransmitterStats {
        let mut stats = self.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if stats.total_requests > 0 {
            stats.success_rate = stats.successful_requests as f64 / stats.total_requests as f64;
        }
        stats
    }
}

// ============================================================================
// Outbox
// ============================================================================

/// Sending half of the bounded outbound queue.
///
/// [`Outbox::push`] never waits: the tick loop must not stall on a slow
/// or unreachable backend.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<OutboundMessage>,
    stats: SharedStats,
}

impl Outbox {
    pub fn channel(capacity: usize, stats: SharedStats) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, stats }, rx)
    }

    /// Queue a message, dropping it when the queue is full or closed.
    pub fn push(&self, message: OutboundMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(m)) => {
                warn!(kind = m.kind(), machine = m.machine_id(), "Outbox full, dropping message");
                self.stats.record_drop();
                false
            }
            Err(TrySendError::Closed(m)) => {
                debug!(kind = m.kind(), "Outbox closed, dropping message");
                self.stats.record_drop();
                false
            }
        }
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutboundMessage {
        OutboundMessage::Alarms {
            machine_id: "m1".to_string(),
            alarms: Vec::new(),
        }
    }

    #[test]
    fn test_full_outbox_drops_without_blocking() {
        let stats = SharedStats::new(true);
        let (outbox, _rx) = Outbox::channel(2, stats.clone());
        assert!(outbox.push(message()));
        assert!(outbox.push(message()));
        assert!(!outbox.push(message()));
        assert_eq!(stats.snapshot().dropped_messages, 1);
    }

    #[test]
    fn test_closed_outbox_counts_drop() {
        let stats = SharedStats::new(true);
        let (outbox, rx) = Outbox::channel(4, stats.clone());
        drop(rx);
        assert!(!outbox.push(message()));
        assert_eq!(stats.snapshot().dropped_messages, 1);
    }

    #[test]
    fn test_success_rate() {
        let stats = SharedStats::new(true);
        assert_eq!(stats.snapshot().success_rate, 0.0);
        stats.record_success();
        stats.record_success();
        stats.record_success();
        stats.record_failure(&TransmitError::ServerError(reqwest::StatusCode::BAD_GATEWAY));
        let snap = stats.snapshot();
        assert_eq!(snap.total_requests, 4);
        assert!((snap.success_rate - 0.75).abs() < 1e-12);
        assert!(snap.last_error.unwrap().contains("502"));
    }
}
