//! Backend transmitter - pushes readings, alarms, health and
//! recommendations to an external collector
//!
//! ## Architecture
//!
//! - **Transmitter**: async trait with one method per payload kind
//! - **HttpTransmitter**: reqwest implementation posting JSON to `{base_url}/...`
//! - **Outbox**: bounded queue filled by the tick loop with `try_send`; a full
//!   queue drops the message instead of stalling the simulation
//! - **run_uploader**: background task draining the outbox with bounded
//!   retries, exponential backoff and an offline period after repeated failure
//!
//! The simulation never waits on the network. Every transmission failure is
//! logged and counted in [`TransmitterStats`], never propagated.

pub mod client;
pub mod outbox;
pub mod uploader;

pub use client::{HttpTransmitter, TransmitError, Transmitter};
pub use outbox::{OutboundMessage, Outbox, SharedStats, TransmitterStats};
pub use uploader::{run_uploader, UploadSettings};
