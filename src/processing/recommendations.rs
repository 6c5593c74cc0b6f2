//! Maintenance recommendations derived from health state
//!
//! The list is rebuilt from scratch on every call; nothing accumulates
//! between ticks.

use crate::config::RecommendationConfig;
use crate::types::{indicators, HealthState, MaintenanceRecommendation, Priority};

#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: RecommendationConfig,
}

fn recommendation(
    kind: &str,
    priority: Priority,
    days: u32,
    description: impl Into<String>,
) -> MaintenanceRecommendation {
    MaintenanceRecommendation {
        kind: kind.to_string(),
        priority,
        description: description.into(),
        estimated_days: days,
    }
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    /// Ordered recommendations: highest priority first, then soonest due.
    pub fn recommend(&self, health: &HealthState, operating_hours: f64) -> Vec<MaintenanceRecommendation> {
        let c = &self.config;
        let score = health.health_score;
        let mut out = Vec::new();

        if score < c.general_inspection_below {
            let priority = if score < c.high_priority_below {
                Priority::High
            } else {
                Priority::Medium
            };
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let days = ((score - c.urgent_below) / 5.0).max(1.0) as u32;
            out.push(recommendation(
                "General Inspection",
                priority,
                days,
                format!("Health score {score:.1}: inspect all components"),
            ));
        }
        if score < c.urgent_below {
            out.push(recommendation(
                "Urgent Component Replacement",
                Priority::High,
                3,
                "Replace worn components before the next shift",
            ));
        }
        if score < c.shutdown_below {
            out.push(recommendation(
                "Shutdown For Major Maintenance",
                Priority::High,
                1,
                "Schedule a controlled shutdown for major maintenance",
            ));
        }

        let bearing = health.indicator(indicators::BEARING_WEAR);
        if bearing > c.bearing_wear_above {
            out.push(recommendation(
                "Bearing Replacement",
                Priority::High,
                7,
                format!("Bearing wear risk {:.0}%: replace drive bearings", bearing * 100.0),
            ));
        }
        let belt = health.indicator(indicators::BELT_DEGRADATION);
        if belt > c.belt_degradation_above {
            out.push(recommendation(
                "Belt Inspection",
                Priority::Medium,
                14,
                format!("Belt degradation risk {:.0}%: check tension and tracking", belt * 100.0),
            ));
        }
        let motor = health.indicator(indicators::MOTOR_DEGRADATION);
        if motor > c.motor_degradation_above {
            out.push(recommendation(
                "Motor Service",
                Priority::Medium,
                21,
                format!("Motor efficiency down {:.0}%: service drive motor", motor * 100.0),
            ));
        }
        let heat = health.indicator(indicators::OVERHEATING);
        if heat > c.overheating_above {
            out.push(recommendation(
                "Cooling System Check",
                Priority::Medium,
                10,
                format!("Overheating risk {:.0}%: check ventilation and lubrication", heat * 100.0),
            ));
        }

        if c.scheduled_interval_hours > 0.0
            && operating_hours >= c.scheduled_interval_hours
            && operating_hours % c.scheduled_interval_hours < c.scheduled_window_hours
        {
            out.push(recommendation(
                "Scheduled Maintenance",
                Priority::Low,
                30,
                format!(
                    "Routine service due every {:.0} operating hours",
                    c.scheduled_interval_hours
                ),
            ));
        }

        out.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.estimated_days.cmp(&b.estimated_days))
        });
        out
    }
}
