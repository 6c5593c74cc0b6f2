//! API route definitions
//!
//! Everything below is nested under `/api/v1`:
//! - /machines, /machines/:id/{snapshot,health,trends,recommendations,export}
//! - /machines/:id/alarms, /machines/:id/alarms/reset
//! - /machines/:id/history/:channel
//! - /machines/:id/channels/:channel and its thresholds, calibration, pin
//! - /machines/:id/fault
//! - /transmitter, /health

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};

/// Create all versioned API routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/machines", get(handlers::list_machines))
        .route("/machines/:id/snapshot", get(handlers::get_snapshot))
        .route("/machines/:id/health", get(handlers::get_health))
        .route("/machines/:id/alarms", get(handlers::get_alarms))
        .route("/machines/:id/alarms/reset", post(handlers::reset_alarms))
        .route("/machines/:id/recommendations", get(handlers::get_recommendations))
        .route("/machines/:id/trends", get(handlers::get_trends))
        .route("/machines/:id/history/:channel", get(handlers::get_history))
        .route("/machines/:id/export", get(handlers::export))
        .route("/machines/:id/fault", post(handlers::set_fault))
        // Channel configuration
        .route("/machines/:id/channels/:channel", get(handlers::get_channel))
        .route(
            "/machines/:id/channels/:channel/thresholds",
            post(handlers::set_thresholds),
        )
        .route(
            "/machines/:id/channels/:channel/calibration",
            post(handlers::set_calibration),
        )
        .route("/machines/:id/channels/:channel/pin", post(handlers::pin_channel))
        .route("/transmitter", get(handlers::transmitter_stats))
        .with_state(state)
}

/// Liveness endpoint at root level
pub fn legacy_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
