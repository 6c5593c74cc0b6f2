//! Simulation pipeline
//!
//! ```text
//! Scheduler (one tokio interval)
//!   └─ for each MachineHandle, under its lock:
//!        DriveProfile -> OperatingParams
//!        Machine::tick: SensorBank -> trends -> alarms -> health
//!                       -> performance -> recommendations
//!      publish MachineView (ArcSwap) -> queue OutboundMessages (Outbox)
//! ```

mod drive;
mod machine;
mod scheduler;
mod state;

pub use drive::DriveProfile;
pub use machine::{Machine, TickReport};
pub use scheduler::Scheduler;
pub use state::{ExportDocument, MachineHandle, MachineView, Plant};
