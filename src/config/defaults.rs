//! System-wide default constants.
//!
//! Grouped by subsystem. Config structs use these as their serde defaults.

// ============================================================================
// Simulation
// ============================================================================

/// Scheduler tick period (ms).
pub const TICK_INTERVAL_MS: u64 = 1_000;

/// Per-channel history capacity (samples).
///
/// 1 000 samples at 1 Hz = ~17 minutes of history.
pub const HISTORY_CAPACITY: usize = 1_000;

/// Trend regression window (most recent samples).
pub const TREND_WINDOW: usize = 20;

/// Minimum samples before a trend is fitted; fewer yields a neutral trend.
pub const TREND_MIN_POINTS: usize = 10;

/// Health score below which a machine reports `Maintenance` status.
pub const MAINTENANCE_STATUS_BELOW: f64 = 70.0;

// ============================================================================
// Alarms
// ============================================================================

/// Cooldown per (channel, severity) threshold alarm key (seconds).
pub const ALARM_COOLDOWN_SECS: u64 = 30;

/// Cooldown per channel trend alarm (seconds). 300 = 5 minutes.
pub const TREND_ALARM_COOLDOWN_SECS: u64 = 300;

/// Minimum r² for a rising trend to raise an alarm.
pub const TREND_R_SQUARED_MIN: f64 = 0.7;

/// Samples ahead the trend is projected.
pub const TREND_PROJECTION_TICKS: f64 = 10.0;

/// Alarm log capacity (records). Oldest are evicted first.
pub const ALARM_LOG_CAPACITY: usize = 100;

/// Alarms included in exports.
pub const EXPORT_ALARM_COUNT: usize = 20;

// ============================================================================
// Health
// ============================================================================

/// Maximum penalty a single out-of-range channel can cost (points).
pub const CHANNEL_PENALTY_CAP: f64 = 10.0;

/// Penalty points per unit of fractional deviation.
pub const DEVIATION_WEIGHT: f64 = 20.0;

/// Age penalty points per 8 760 operating hours.
pub const AGE_PENALTY_PER_YEAR: f64 = 15.0;

/// Maximum age penalty (points).
pub const AGE_PENALTY_CAP: f64 = 1.5;

/// Penalty per HIGH/CRITICAL alarm in the recent window (points).
pub const ALARM_PENALTY_PER: f64 = 2.0;

/// Maximum alarm penalty (points).
pub const ALARM_PENALTY_CAP: f64 = 20.0;

/// Alarm log entries inspected for the alarm penalty.
pub const ALARM_PENALTY_WINDOW: usize = 20;

/// Operating hours at which belt wear alone reaches full degradation risk.
pub const BELT_LIFE_HOURS: f64 = 5_000.0;

// ============================================================================
// Transmitter
// ============================================================================

/// HTTP timeout for backend requests (seconds).
pub const TRANSMIT_TIMEOUT_SECS: u64 = 10;

/// Retries after the first failed attempt.
pub const TRANSMIT_MAX_RETRIES: u32 = 3;

/// Base backoff; attempt `n` waits `base * 2^n` (ms).
pub const TRANSMIT_BACKOFF_MS: u64 = 1_000;

/// Outbound message queue capacity. A full queue drops new messages.
pub const OUTBOX_CAPACITY: usize = 256;

/// Time spent offline after a message exhausts its retries (seconds).
pub const OFFLINE_COOLDOWN_SECS: u64 = 30;

/// Health and recommendation reports are sent every N ticks.
pub const REPORT_EVERY_TICKS: u64 = 10;

// ============================================================================
// Server
// ============================================================================

pub const SERVER_ADDR: &str = "0.0.0.0:8080";

/// Maximum accepted request body (bytes).
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
