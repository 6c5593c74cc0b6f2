//! Signal processing and evaluation stages
//!
//! Each tick runs, in order: trend fitting per channel, alarm evaluation,
//! health scoring, performance estimation and maintenance recommendations.

pub mod alarms;
pub mod health_scoring;
pub mod performance;
pub mod recommendations;
pub mod trend;

pub use alarms::{AlarmEngine, AlarmSettings};
pub use health_scoring::{HealthScorer, HealthSettings};
pub use recommendations::RecommendationEngine;
pub use trend::{Trend, TrendAnalyzer};
