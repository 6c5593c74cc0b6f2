//! Synthetic sensor generation
//!
//! A [`SensorBank`] owns the named channels of one machine and advances all of
//! them once per tick through the [`SensorModel`] physics, then applies
//! calibration, the active fault, gaussian noise and clamping.

mod bank;
pub mod catalog;
mod history;
mod model;

pub use bank::SensorBank;
pub use history::HistoryBuffer;
pub use model::{MachineProfile, RoleValues, SensorModel};

/// Errors raised by the sensor layer.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// Malformed channel definition or rejected threshold update
    #[error("invalid channel configuration: {}", .0.join("; "))]
    Configuration(Vec<String>),

    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    /// The update function produced NaN or infinity
    #[error("numeric anomaly on channel '{channel}': produced {value}")]
    NumericAnomaly { channel: String, value: f64 },
}

impl SensorError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(vec![message.into()])
    }
}
