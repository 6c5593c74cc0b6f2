//! Machine kinds, per-tick operating inputs and injectable faults

use serde::{Deserialize, Serialize};

use super::ChannelRole;

/// The two supported mechanical systems.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MachineKind {
    BucketElevator,
    ConveyorBelt,
}

impl std::fmt::Display for MachineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BucketElevator => f.write_str("bucket_elevator"),
            Self::ConveyorBelt => f.write_str("conveyor_belt"),
        }
    }
}

impl std::str::FromStr for MachineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bucket_elevator" | "elevator" => Ok(Self::BucketElevator),
            "conveyor_belt" | "conveyor" => Ok(Self::ConveyorBelt),
            other => Err(format!(
                "unknown machine kind '{other}' (expected bucket_elevator or conveyor_belt)"
            )),
        }
    }
}

/// Inputs supplied to every tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OperatingParams {
    /// Belt / drive surface speed (m/s)
    pub drive_speed: f64,
    /// Amount of material on the belt, in material units
    pub load_proxy: f64,
    /// Accumulated running time
    pub operating_hours: f64,
}

impl OperatingParams {
    pub fn operating_seconds(&self) -> f64 {
        self.operating_hours * 3600.0
    }
}

// ============================================================================
// Faults
// ============================================================================

/// A named fault injected into a running machine.
///
/// While active, each affected channel's raw value is multiplied by a
/// fixed factor before noise and clamping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    BearingFailure,
    Overheating,
    MotorOverload,
    BeltSlip,
    Overload,
}

impl Fault {
    pub const ALL: [Self; 5] = [
        Self::BearingFailure,
        Self::Overheating,
        Self::MotorOverload,
        Self::BeltSlip,
        Self::Overload,
    ];

    /// Multiplicative perturbation for a channel role; 1.0 when unaffected.
    pub fn multiplier(self, role: ChannelRole) -> f64 {
        use ChannelRole as R;
        match (self, role) {
            (Self::BearingFailure, R::Vibration) => 2.2,
            (Self::BearingFailure, R::Temperature) => 1.15,
            (Self::Overheating, R::Temperature) => 1.45,
            (Self::Overheating, R::Current) => 1.1,
            (Self::MotorOverload, R::Current) => 1.6,
            (Self::MotorOverload, R::Temperature) => 1.2,
            (Self::MotorOverload, R::Speed) => 0.9,
            (Self::BeltSlip, R::Speed) => 0.75,
            (Self::BeltSlip, R::Slippage) => 2.5,
            (Self::BeltSlip, R::Vibration) => 1.3,
            (Self::Overload, R::Load) => 1.6,
            (Self::Overload, R::Current) => 1.3,
            _ => 1.0,
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BearingFailure => "bearing_failure",
            Self::Overheating => "overheating",
            Self::MotorOverload => "motor_overload",
            Self::BeltSlip => "belt_slip",
            Self::Overload => "overload",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Fault {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|fault| fault.to_string() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown fault '{s}'"))
    }
}
