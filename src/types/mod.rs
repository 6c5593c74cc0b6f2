//! Shared data structures for the predictive-maintenance pipeline
//!
//! - `channel`: channel metadata, readings and snapshots
//! - `alarm`: alarm severities, records and cooldown keys
//! - `health`: health state, maintenance recommendations, performance metrics
//! - `machine`: machine kinds, per-tick operating inputs and injectable faults

mod alarm;
mod channel;
mod health;
mod machine;

pub use alarm::*;
pub use channel::*;
pub use health::*;
pub use machine::*;
