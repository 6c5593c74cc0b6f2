//! Operating profile fed to each tick.

use crate::config::DriveConfig;
use crate::types::OperatingParams;

/// Period of the drive speed oscillation (operating seconds).
const SPEED_PERIOD_SECS: f64 = 240.0;

/// Period of the material load oscillation (operating seconds).
const LOAD_PERIOD_SECS: f64 = 600.0;

/// Deterministic drive speed and load over operating time.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveProfile {
    config: DriveConfig,
}

impl DriveProfile {
    pub fn new(config: DriveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Inputs for the tick at `operating_hours`.
    ///
    /// Both values stay non-negative whatever the configured swing.
    pub fn params_at(&self, operating_hours: f64) -> OperatingParams {
        let t = operating_hours * 3600.0;
        let c = &self.config;
        let speed_phase = std::f64::consts::TAU * t / SPEED_PERIOD_SECS;
        let load_phase = std::f64::consts::TAU * t / LOAD_PERIOD_SECS + 1.0;

        OperatingParams {
            drive_speed: c.speed_swing.mul_add(speed_phase.sin(), c.drive_speed).max(0.0),
            load_proxy: c.load_swing.mul_add(load_phase.sin(), c.load_proxy).max(0.0),
            operating_hours,
        }
    }
}
