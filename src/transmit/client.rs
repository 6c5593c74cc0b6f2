//! Transmitter trait and its HTTP implementation

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::types::{
    AlarmRecord, HealthState, MaintenanceRecommendation, PerformanceMetrics, SensorSnapshot,
};

/// Transmitter errors
#[derive(Debug, thiserror::Error)]
pub enum TransmitError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    ServerError(reqwest::StatusCode),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outward push of machine data.
///
/// Implementations must be cheap to call concurrently; the uploader holds a
/// single shared instance.
#[async_trait]
pub trait Transmitter: Send + Sync {
    async fn send_sensor_data(
        &self,
        machine_id: &str,
        snapshot: &SensorSnapshot,
    ) -> Result<(), TransmitError>;

    async fn send_alarms(&self, machine_id: &str, alarms: &[AlarmRecord]) -> Result<(), TransmitError>;

    async fn send_health(
        &self,
        machine_id: &str,
        timestamp: DateTime<Utc>,
        health: &HealthState,
        performance: &PerformanceMetrics,
    ) -> Result<(), TransmitError>;

    async fn send_recommendations(
        &self,
        machine_id: &str,
        timestamp: DateTime<Utc>,
        recommendations: &[MaintenanceRecommendation],
    ) -> Result<(), TransmitError>;
}

// ============================================================================
// Wire payloads
// ============================================================================

#[derive(Serialize)]
struct SensorDataPayload<'a> {
    machine_id: &'a str,
    #[serde(flatten)]
    snapshot: &'a SensorSnapshot,
}

#[derive(Serialize)]
struct AlarmsPayload<'a> {
    machine_id: &'a str,
    alarms: &'a [AlarmRecord],
}

#[derive(Serialize)]
struct HealthPayload<'a> {
    machine_id: &'a str,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    health: &'a HealthState,
    performance: &'a PerformanceMetrics,
}

#[derive(Serialize)]
struct RecommendationEntry<'a> {
    #[serde(flatten)]
    recommendation: &'a MaintenanceRecommendation,
    predicted_date: DateTime<Utc>,
}

#[derive(Serialize)]
struct RecommendationsPayload<'a> {
    machine_id: &'a str,
    timestamp: DateTime<Utc>,
    recommendations: Vec<RecommendationEntry<'a>>,
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Posts JSON to `{base_url}/sensor-data`, `/alarms`, `/health` and
/// `/recommendations`. 200 and 201 count as success.
#[derive(Debug, Clone)]
pub struct HttpTransmitter {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransmitter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransmitError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), TransmitError> {
        let json = serde_json::to_vec(body)?;
        let resp = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .body(json)
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::OK | reqwest::StatusCode::CREATED => Ok(()),
            status => Err(TransmitError::ServerError(status)),
        }
    }
}

#[async_trait]
impl Transmitter for HttpTransmitter {
    async fn send_sensor_data(
        &self,
        machine_id: &str,
        snapshot: &SensorSnapshot,
    ) -> Result<(), TransmitError> {
        self.post("sensor-data", &SensorDataPayload { machine_id, snapshot })
            .await
    }

    async fn send_alarms(&self, machine_id: &str, alarms: &[AlarmRecord]) -> Result<(), TransmitError> {
        self.post("alarms", &AlarmsPayload { machine_id, alarms }).await
    }

    async fn send_health(
        &self,
        machine_id: &str,
        timestamp: DateTime<Utc>,
        health: &HealthState,
        performance: &PerformanceMetrics,
    ) -> Result<(), TransmitError> {
        self.post(
            "health",
            &HealthPayload {
                machine_id,
                timestamp,
                health,
                performance,
            },
        )
        .await
    }

    async fn send_recommendations(
        &self,
        machine_id: &str,
        timestamp: DateTime<Utc>,
        recommendations: &[MaintenanceRecommendation],
    ) -> Result<(), TransmitError> {
        self.post(
            "recommendations",
            &RecommendationsPayload {
                machine_id,
                timestamp,
                recommendations: with_predicted_dates(timestamp, recommendations),
            },
        )
        .await
    }
}

/// Pair each recommendation with `timestamp + estimated_days`.
fn with_predicted_dates(
    timestamp: DateTime<Utc>,
    recommendations: &[MaintenanceRecommendation],
) -> Vec<RecommendationEntry<'_>> {
    recommendations
        .iter()
        .map(|recommendation| RecommendationEntry {
            recommendation,
            predicted_date: timestamp + ChronoDuration::days(i64::from(recommendation.estimated_days)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;

    #[test]
    fn test_predicted_date_offsets_by_estimated_days() {
        let now = Utc::now();
        let recs = vec![MaintenanceRecommendation {
            kind: "Bearing Replacement".to_string(),
            priority: Priority::High,
            description: String::new(),
            estimated_days: 7,
        }];
        let entries = with_predicted_dates(now, &recs);
        assert_eq!(entries[0].predicted_date - now, ChronoDuration::days(7));
    }

    #[test]
    fn test_recommendations_payload_shape() {
        let now = Utc::now();
        let recs = vec![MaintenanceRecommendation {
            kind: "Motor Service".to_string(),
            priority: Priority::Medium,
            description: "service drive motor".to_string(),
            estimated_days: 21,
        }];
        let payload = RecommendationsPayload {
            machine_id: "conveyor_belt",
            timestamp: now,
            recommendations: with_predicted_dates(now, &recs),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["machine_id"], "conveyor_belt");
        assert_eq!(json["recommendations"][0]["kind"], "Motor Service");
        assert!(json["recommendations"][0]["predicted_date"].is_string());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let t = HttpTransmitter::new("http://localhost:3000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(t.base_url(), "http://localhost:3000/api");
    }
}
