//! beltwatch: predictive maintenance for bucket elevators and conveyor belts
//!
//! ## Architecture
//!
//! - **Sensors**: per-machine channel banks with physics models, noise and faults
//! - **Processing**: trend analysis, alarms, health scoring, recommendations
//! - **Pipeline**: machines, shared plant state and the tick scheduler
//! - **Transmit**: outbox and retrying uploader to a remote collector
//! - **API**: axum routes over the published machine views

pub mod api;
pub mod config;
pub mod pipeline;
pub mod processing;
pub mod sensors;
pub mod transmit;
pub mod types;

pub use config::PlantConfig;
pub use pipeline::{Machine, Plant, Scheduler};
pub use types::{Fault, MachineKind};
