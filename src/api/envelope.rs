//! JSON envelope for `/api/v1`
//!
//! Success: `{ "data": T, "meta": { timestamp, version } }`.
//! Failure: `{ "error": { code, message }, "meta": { timestamp, version } }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sensors::SensorError;

pub const API_VERSION: &str = "1";

#[derive(Debug, Serialize)]
struct Meta {
    timestamp: DateTime<Utc>,
    version: &'static str,
}

impl Meta {
    fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            version: API_VERSION,
        }
    }
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    data: T,
    meta: Meta,
}

/// 200 with `data` wrapped in the envelope.
pub struct ApiResponse;

impl ApiResponse {
    pub fn ok<T: Serialize>(data: T) -> Response {
        Json(Envelope { data, meta: Meta::now() }).into_response()
    }
}

/// Every failure a handler can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Unknown machine or channel
    NotFound(String),
    /// Request body is well-formed JSON but asks for nothing valid
    BadRequest(String),
    /// Threshold or calibration change rejected by the channel invariants
    InvalidConfiguration(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidConfiguration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::NotFound(m) | Self::BadRequest(m) | Self::InvalidConfiguration(m) | Self::Internal(m) => m,
        }
    }
}

impl From<&SensorError> for ApiError {
    fn from(e: &SensorError) -> Self {
        match e {
            SensorError::UnknownChannel(_) => Self::NotFound(e.to_string()),
            SensorError::Configuration(_) => Self::InvalidConfiguration(e.to_string()),
            SensorError::NumericAnomaly { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": { "code": self.code(), "message": self.message() },
            "meta": Meta::now(),
        });
        (self.status(), Json(body)).into_response()
    }
}
