//! Plant Configuration Module
//!
//! Per-plant settings loaded from TOML: machine list, channel overrides,
//! alarm and health tuning, transmitter endpoint.
//!
//! ## Loading Order
//!
//! 1. `BELTWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `beltwatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded [`PlantConfig`] is passed by value to whatever needs it;
//! there is no process-wide instance.

mod plant_config;
pub mod defaults;
pub mod validation;

pub use plant_config::*;
