//! Upload background task: drains the outbox and sends each message

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::Transmitter;
use super::outbox::{OutboundMessage, SharedStats};
use crate::config::TransmitterConfig;

/// Retry and offline tunables for [`run_uploader`].
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Attempt `n` (0-based) waits `backoff * 2^n` before retrying
    pub backoff: Duration,
    /// How long messages are dropped after one exhausts its retries
    pub offline_cooldown: Duration,
}

impl From<&TransmitterConfig> for UploadSettings {
    fn from(cfg: &TransmitterConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            backoff: Duration::from_millis(cfg.backoff_ms),
            offline_cooldown: Duration::from_secs(cfg.offline_cooldown_secs),
        }
    }
}

impl UploadSettings {
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Outcome of delivering one message.
enum Delivery {
    Sent,
    Exhausted,
    Cancelled,
}

async fn deliver(
    message: &OutboundMessage,
    transmitter: &dyn Transmitter,
    settings: &UploadSettings,
    stats: &SharedStats,
    cancel_token: &CancellationToken,
) -> Delivery {
    let mut attempt = 0;
    loop {
        match message.dispatch(transmitter).await {
            Ok(()) => {
                stats.record_success();
                debug!(kind = message.kind(), machine = message.machine_id(), "Transmitted");
                return Delivery::Sent;
            }
            Err(e) => {
                stats.record_failure(&e);
                if attempt >= settings.max_retries {
                    warn!(
                        kind = message.kind(),
                        machine = message.machine_id(),
                        attempts = attempt + 1,
                        error = %e,
                        "Transmission failed, dropping message"
                    );
                    return Delivery::Exhausted;
                }
                let wait = settings.backoff_for(attempt);
                debug!(
                    kind = message.kind(),
                    attempt = attempt + 1,
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Transmission failed, retrying"
                );
                tokio::select! {
                    () = cancel_token.cancelled() => return Delivery::Cancelled,
                    () = tokio::time::sleep(wait) => {}
                }
                attempt += 1;
            }
        }
    }
}

/// Run the upload task until cancelled or the outbox closes.
///
/// Messages are sent one at a time in queue order. A message that still
/// fails after `max_retries` retries is dropped and the uploader goes
/// offline: everything received during `offline_cooldown` is dropped
/// unsent, after which transmission resumes.
pub async fn run_uploader(
    mut rx: mpsc::Receiver<OutboundMessage>,
    transmitter: Arc<dyn Transmitter>,
    settings: UploadSettings,
    stats: SharedStats,
    cancel_token: CancellationToken,
) {
    let mut offline_until: Option<Instant> = None;

    loop {
        let message = tokio::select! {
            () = cancel_token.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(m) => m,
                None => break,
            },
        };

        if let Some(until) = offline_until {
            if Instant::now() < until {
                stats.record_drop();
                continue;
            }
            offline_until = None;
            stats.set_online(true);
            info!("Transmitter back online");
        }

        match deliver(&message, transmitter.as_ref(), &settings, &stats, &cancel_token).await {
            Delivery::Sent => {}
            Delivery::Exhausted => {
                stats.record_drop();
                stats.set_online(false);
                offline_until = Some(Instant::now() + settings.offline_cooldown);
                warn!(
                    cooldown_secs = settings.offline_cooldown.as_secs(),
                    "Transmitter offline, simulation continues"
                );
            }
            Delivery::Cancelled => break,
        }
    }

    info!("Uploader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmit::client::TransmitError;
    use crate::transmit::outbox::Outbox;
    use crate::types::{
        AlarmRecord, HealthState, MaintenanceRecommendation, PerformanceMetrics, SensorSnapshot,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyTransmitter {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyTransmitter {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn attempt(&self) -> Result<(), TransmitError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(TransmitError::ServerError(reqwest::StatusCode::SERVICE_UNAVAILABLE))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Transmitter for FlakyTransmitter {
        async fn send_sensor_data(&self, _: &str, _: &SensorSnapshot) -> Result<(), TransmitError> {
            self.attempt()
        }
        async fn send_alarms(&self, _: &str, _: &[AlarmRecord]) -> Result<(), TransmitError> {
            self.attempt()
        }
        async fn send_health(
            &self,
            _: &str,
            _: DateTime<Utc>,
            _: &HealthState,
            _: &PerformanceMetrics,
        ) -> Result<(), TransmitError> {
            self.attempt()
        }
        async fn send_recommendations(
            &self,
            _: &str,
            _: DateTime<Utc>,
            _: &[MaintenanceRecommendation],
        ) -> Result<(), TransmitError> {
            self.attempt()
        }
    }

    fn settings(max_retries: u32, offline_ms: u64) -> UploadSettings {
        UploadSettings {
            max_retries,
            backoff: Duration::from_millis(1),
            offline_cooldown: Duration::from_millis(offline_ms),
        }
    }

    fn message() -> OutboundMessage {
        OutboundMessage::Alarms {
            machine_id: "m1".to_string(),
            alarms: Vec::new(),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let s = UploadSettings {
            max_retries: 3,
            backoff: Duration::from_millis(1000),
            offline_cooldown: Duration::ZERO,
        };
        assert_eq!(s.backoff_for(0), Duration::from_millis(1000));
        assert_eq!(s.backoff_for(1), Duration::from_millis(2000));
        assert_eq!(s.backoff_for(3), Duration::from_millis(8000));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let transmitter = Arc::new(FlakyTransmitter::new(2));
        let stats = SharedStats::new(true);
        let (outbox, rx) = Outbox::channel(8, stats.clone());
        outbox.push(message());
        drop(outbox);

        run_uploader(rx, transmitter.clone(), settings(3, 0), stats.clone(), CancellationToken::new()).await;

        assert_eq!(transmitter.calls.load(Ordering::SeqCst), 3);
        let snap = stats.snapshot();
        assert_eq!(snap.successful_requests, 1);
        assert_eq!(snap.failed_requests, 2);
        assert_eq!(snap.dropped_messages, 0);
        assert!(snap.online);
    }

    #[tokio::test]
    async fn test_exhausted_retries_go_offline_and_drop() {
        let transmitter = Arc::new(FlakyTransmitter::new(u32::MAX));
        let stats = SharedStats::new(true);
        let (outbox, rx) = Outbox::channel(8, stats.clone());
        outbox.push(message());
        outbox.push(message());
        outbox.push(message());
        drop(outbox);

        run_uploader(rx, transmitter.clone(), settings(2, 60_000), stats.clone(), CancellationToken::new()).await;

        // First message: 1 attempt + 2 retries; the rest are dropped while offline
        assert_eq!(transmitter.calls.load(Ordering::SeqCst), 3);
        let snap = stats.snapshot();
        assert_eq!(snap.failed_requests, 3);
        assert_eq!(snap.dropped_messages, 3);
        assert!(!snap.online);
    }

    #[tokio::test]
    async fn test_cancel_stops_uploader() {
        let transmitter = Arc::new(FlakyTransmitter::new(0));
        let stats = SharedStats::new(true);
        let (_outbox, rx) = Outbox::channel(8, stats.clone());
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_uploader(rx, transmitter, settings(0, 0), stats, token.clone()));
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("uploader should stop after cancel")
            .unwrap();
    }
}
