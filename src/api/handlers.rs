//! API handlers
//!
//! Reads come from the machine's published [`MachineView`] and never take
//! the machine lock, except history which is read under the lock. Writes
//! lock the machine, apply the change and republish the view.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::envelope::{ApiError, ApiResponse};
use crate::config::defaults::EXPORT_ALARM_COUNT;
use crate::pipeline::{MachineHandle, MachineView, Plant};
use crate::processing::Trend;
use crate::sensors::SensorError;
use crate::transmit::SharedStats;
use crate::types::{
    AlarmRecord, Fault, HealthSeverity, HealthState, MachineKind, MachineStatus, PerformanceMetrics,
};

const DEFAULT_ALARM_LIMIT: usize = 20;
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// State shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    pub plant: Arc<Plant>,
    pub transmitter: SharedStats,
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(plant: Arc<Plant>, transmitter: SharedStats) -> Self {
        Self {
            plant,
            transmitter,
            started_at: Utc::now(),
        }
    }

    fn machine(&self, id: &str) -> Result<&MachineHandle, Response> {
        self.plant
            .get(id)
            .ok_or_else(|| ApiError::NotFound(format!("machine '{id}' not found")).into_response())
    }
}

fn sensor_error(e: &SensorError) -> Response {
    ApiError::from(e).into_response()
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdsRequest {
    pub alarm: Option<f64>,
    pub critical: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CalibrationRequest {
    pub factor: f64,
}

#[derive(Debug, Deserialize)]
pub struct FaultRequest {
    /// Fault name, or null to clear
    pub fault: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    /// Forced reading, or null to release
    pub value: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MachineSummary {
    pub id: String,
    pub kind: MachineKind,
    pub status: MachineStatus,
    pub health_score: f64,
    pub severity: HealthSeverity,
    pub fault: Option<Fault>,
    pub tick: u64,
    pub operating_hours: f64,
}

impl From<&MachineView> for MachineSummary {
    fn from(view: &MachineView) -> Self {
        Self {
            id: view.id.clone(),
            kind: view.kind,
            status: view.status,
            health_score: view.health.health_score,
            severity: view.health.severity,
            fault: view.fault,
            tick: view.tick,
            operating_hours: view.operating_hours,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub health: HealthState,
    pub performance: PerformanceMetrics,
    pub status: MachineStatus,
    pub active_alarms: usize,
    pub operating_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct AlarmsResponse {
    pub total: usize,
    pub alarms: Vec<AlarmRecord>,
}

// ============================================================================
// Machine reads
// ============================================================================

/// GET /api/v1/machines
pub async fn list_machines(State(state): State<ApiState>) -> Response {
    let machines: Vec<MachineSummary> = state
        .plant
        .machines()
        .iter()
        .map(|m| MachineSummary::from(m.view().as_ref()))
        .collect();
    ApiResponse::ok(machines)
}

/// GET /api/v1/machines/:id/snapshot
///
/// `data` is the bare `{channel: {value, unit, status}}` map. The export
/// route carries the same readings with their tick timestamp.
pub async fn get_snapshot(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.machine(&id) {
        Ok(m) => ApiResponse::ok(m.view().snapshot.channels.clone()),
        Err(resp) => resp,
    }
}

/// GET /api/v1/machines/:id/health
pub async fn get_health(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let view = match state.machine(&id) {
        Ok(m) => m.view(),
        Err(resp) => return resp,
    };
    ApiResponse::ok(HealthResponse {
        health: view.health.clone(),
        performance: view.performance,
        status: view.status,
        active_alarms: view.active_alarms,
        operating_hours: view.operating_hours,
    })
}

/// GET /api/v1/machines/:id/alarms?limit=N
pub async fn get_alarms(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let view = match state.machine(&id) {
        Ok(m) => m.view(),
        Err(resp) => return resp,
    };
    let limit = query.limit.unwrap_or(DEFAULT_ALARM_LIMIT);
    ApiResponse::ok(AlarmsResponse {
        total: view.alarms.len(),
        alarms: view.recent_alarms(limit).to_vec(),
    })
}

/// GET /api/v1/machines/:id/recommendations
pub async fn get_recommendations(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.machine(&id) {
        Ok(m) => ApiResponse::ok(m.view().recommendations.clone()),
        Err(resp) => resp,
    }
}

/// GET /api/v1/machines/:id/trends
pub async fn get_trends(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.machine(&id) {
        Ok(m) => ApiResponse::ok::<BTreeMap<String, Trend>>(m.view().trends.clone()),
        Err(resp) => resp,
    }
}

/// GET /api/v1/machines/:id/history/:channel?limit=N
pub async fn get_history(
    State(state): State<ApiState>,
    Path((id, channel)): Path<(String, String)>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let machine = match state.machine(&id) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match machine.read(|m| m.history(&channel, limit)) {
        Ok(points) => ApiResponse::ok(serde_json::json!({
            "channel": channel,
            "points": points,
        })),
        Err(e) => sensor_error(&e),
    }
}

/// GET /api/v1/machines/:id/channels/:channel
pub async fn get_channel(
    State(state): State<ApiState>,
    Path((id, channel)): Path<(String, String)>,
) -> Response {
    let view = match state.machine(&id) {
        Ok(m) => m.view(),
        Err(resp) => return resp,
    };
    match view.channels.iter().find(|c| c.name == channel) {
        Some(spec) => ApiResponse::ok(spec.clone()),
        None => sensor_error(&SensorError::UnknownChannel(channel)),
    }
}

/// GET /api/v1/machines/:id/export
pub async fn export(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.machine(&id) {
        Ok(m) => ApiResponse::ok(m.view().export(EXPORT_ALARM_COUNT)),
        Err(resp) => resp,
    }
}

// ============================================================================
// Machine writes
// ============================================================================

/// POST /api/v1/machines/:id/channels/:channel/thresholds
pub async fn set_thresholds(
    State(state): State<ApiState>,
    Path((id, channel)): Path<(String, String)>,
    axum::Json(request): axum::Json<ThresholdsRequest>,
) -> Response {
    let machine = match state.machine(&id) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    if request.alarm.is_none() && request.critical.is_none() {
        return ApiError::BadRequest("provide 'alarm' and/or 'critical'".into()).into_response();
    }
    match machine.update(|m| m.set_thresholds(&channel, request.alarm, request.critical)) {
        Ok(spec) => ApiResponse::ok(spec),
        Err(e) => sensor_error(&e),
    }
}

/// POST /api/v1/machines/:id/channels/:channel/calibration
pub async fn set_calibration(
    State(state): State<ApiState>,
    Path((id, channel)): Path<(String, String)>,
    axum::Json(request): axum::Json<CalibrationRequest>,
) -> Response {
    let machine = match state.machine(&id) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    match machine.update(|m| m.calibrate(&channel, request.factor)) {
        Ok(spec) => ApiResponse::ok(spec),
        Err(e) => sensor_error(&e),
    }
}

/// POST /api/v1/machines/:id/channels/:channel/pin
pub async fn pin_channel(
    State(state): State<ApiState>,
    Path((id, channel)): Path<(String, String)>,
    axum::Json(request): axum::Json<PinRequest>,
) -> Response {
    let machine = match state.machine(&id) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    match machine.update(|m| m.pin(&channel, request.value)) {
        Ok(()) => ApiResponse::ok(serde_json::json!({
            "channel": channel,
            "pinned": request.value,
        })),
        Err(e) => sensor_error(&e),
    }
}

/// POST /api/v1/machines/:id/fault
pub async fn set_fault(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<FaultRequest>,
) -> Response {
    let machine = match state.machine(&id) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let fault = match request.fault.as_deref().map(str::parse::<Fault>).transpose() {
        Ok(f) => f,
        Err(e) => return ApiError::BadRequest(e).into_response(),
    };
    machine.update(|m| m.set_fault(fault));
    ApiResponse::ok(serde_json::json!({ "fault": fault }))
}

/// POST /api/v1/machines/:id/alarms/reset
pub async fn reset_alarms(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.machine(&id) {
        Ok(m) => {
            m.update(crate::pipeline::Machine::reset_alarms);
            ApiResponse::ok(serde_json::json!({ "reset": true }))
        }
        Err(resp) => resp,
    }
}

// ============================================================================
// Service
// ============================================================================

/// GET /api/v1/transmitter
pub async fn transmitter_stats(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.transmitter.snapshot())
}

/// GET /health and GET /api/v1/health
pub async fn health_check(State(state): State<ApiState>) -> Response {
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0);
    ApiResponse::ok(serde_json::json!({
        "status": "ok",
        "machines": state.plant.len(),
        "uptime_secs": uptime,
    }))
}
