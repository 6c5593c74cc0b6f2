//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! The raw TOML is first walked as a `toml::Value` tree and every dotted
//! key is compared against the known field names. Machine ids and channel
//! names are user-chosen, so those path segments are matched as wildcards.
//! Unknown keys only warn; serde deserialization runs afterwards.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Valid dotted key paths for `PlantConfig`, with `*` standing for a
/// machine id or channel name.
///
/// Maintained by hand alongside the structs in `plant_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [plant]
        "plant",
        "plant.name",
        "plant.site",
        // [server]
        "server",
        "server.addr",
        // [simulation]
        "simulation",
        "simulation.tick_interval_ms",
        "simulation.time_scale",
        "simulation.history_capacity",
        "simulation.trend_window",
        "simulation.trend_min_points",
        "simulation.seed",
        "simulation.maintenance_status_below",
        // [alarms]
        "alarms",
        "alarms.cooldown_secs",
        "alarms.trend_cooldown_secs",
        "alarms.trend_r_squared_min",
        "alarms.trend_projection_ticks",
        "alarms.log_capacity",
        // [health]
        "health",
        "health.channel_penalty_cap",
        "health.deviation_weight",
        "health.age_penalty_per_year",
        "health.age_penalty_cap",
        "health.alarm_penalty_per",
        "health.alarm_penalty_cap",
        "health.alarm_window",
        "health.belt_life_hours",
        // [recommendations]
        "recommendations",
        "recommendations.general_inspection_below",
        "recommendations.high_priority_below",
        "recommendations.urgent_below",
        "recommendations.shutdown_below",
        "recommendations.bearing_wear_above",
        "recommendations.belt_degradation_above",
        "recommendations.motor_degradation_above",
        "recommendations.overheating_above",
        "recommendations.scheduled_interval_hours",
        "recommendations.scheduled_window_hours",
        // [transmitter]
        "transmitter",
        "transmitter.enabled",
        "transmitter.base_url",
        "transmitter.timeout_secs",
        "transmitter.max_retries",
        "transmitter.backoff_ms",
        "transmitter.outbox_capacity",
        "transmitter.offline_cooldown_secs",
        "transmitter.report_every_ticks",
        // [machines.<id>]
        "machines",
        "machines.*",
        "machines.*.kind",
        "machines.*.enabled",
        "machines.*.drive",
        "machines.*.drive.drive_speed",
        "machines.*.drive.load_proxy",
        "machines.*.drive.speed_swing",
        "machines.*.drive.load_swing",
        // [machines.<id>.channels.<name>]
        "machines.*.channels",
        "machines.*.channels.*",
        "machines.*.channels.*.unit",
        "machines.*.channels.*.min",
        "machines.*.channels.*.max",
        "machines.*.channels.*.optimal_range",
        "machines.*.channels.*.alarm_threshold",
        "machines.*.channels.*.critical_threshold",
        "machines.*.channels.*.calibration_factor",
        "machines.*.channels.*.noise_std",
    ];
    keys.iter().copied().collect()
}

/// Replace user-chosen segments (machine id, channel name) with `*`.
fn normalize_key(key: &str) -> String {
    let mut parts: Vec<&str> = key.split('.').collect();
    if parts.first() == Some(&"machines") {
        if parts.len() > 1 {
            parts[1] = "*";
        }
        if parts.len() > 3 && parts[2] == "channels" {
            parts[3] = "*";
        }
    }
    parts.join(".")
}

/// Put the original segments back in place of the wildcards of a suggestion.
fn denormalize_key(suggestion: &str, original: &str) -> String {
    let original: Vec<&str> = original.split('.').collect();
    suggestion
        .split('.')
        .enumerate()
        .map(|(i, part)| match (part, original.get(i)) {
            ("*", Some(orig)) => *orig,
            _ => part,
        })
        .collect::<Vec<_>>()
        .join(".")
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Parse errors yield no warnings; serde reports them afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter_map(|key| {
            let normalized = normalize_key(&key);
            if known.contains(normalized.as_str()) {
                return None;
            }
            let suggestion =
                suggest_correction(&normalized, &known).map(|s| denormalize_key(&s, &key));
            Some(ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            })
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Range checks on a parsed `PlantConfig`.
///
/// Returns (errors, warnings). Errors are values the runtime cannot work
/// with; warnings are legal but unusual.
pub fn validate_physical_ranges(
    config: &super::PlantConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let t = &config.transmitter;
    if t.enabled && !(t.base_url.starts_with("http://") || t.base_url.starts_with("https://")) {
        errors.push(format!(
            "transmitter.base_url = '{}' must start with http:// or https://",
            t.base_url
        ));
    }
    if t.timeout_secs > 120 {
        warnings.push(ValidationWarning {
            field: "transmitter.timeout_secs".to_string(),
            message: format!(
                "transmitter.timeout_secs = {} is unusually long (> 120 s)",
                t.timeout_secs
            ),
            suggestion: None,
        });
    }

    let sim = &config.simulation;
    if sim.tick_interval_ms > 0 && sim.tick_interval_ms < 50 {
        warnings.push(ValidationWarning {
            field: "simulation.tick_interval_ms".to_string(),
            message: format!(
                "simulation.tick_interval_ms = {} is below 50 ms; ticks may be skipped",
                sim.tick_interval_ms
            ),
            suggestion: None,
        });
    }

    if config.alarms.cooldown_secs == 0 {
        warnings.push(ValidationWarning {
            field: "alarms.cooldown_secs".to_string(),
            message: "alarms.cooldown_secs = 0 re-raises threshold alarms on every tick".to_string(),
            suggestion: None,
        });
    }

    if config.health.alarm_penalty_cap > 100.0 || config.health.channel_penalty_cap > 100.0 {
        warnings.push(ValidationWarning {
            field: "health".to_string(),
            message: "health penalty caps above 100 points have no additional effect".to_string(),
            suggestion: None,
        });
    }

    for (id, machine) in &config.machines {
        for (name, patch) in &machine.channels {
            if let Some(factor) = patch.calibration_factor {
                if factor.is_finite() && !(0.5..=2.0).contains(&factor) {
                    warnings.push(ValidationWarning {
                        field: format!("machines.{id}.channels.{name}.calibration_factor"),
                        message: format!(
                            "machines.{id}.channels.{name}.calibration_factor = {factor} is outside typical range (0.5-2.0)"
                        ),
                        suggestion: None,
                    });
                }
            }
        }
    }

    (errors, warnings)
}
