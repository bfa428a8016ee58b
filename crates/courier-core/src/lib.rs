//! Core types and contracts for courier.
//!
//! This crate holds the pieces every bulk operation shares: the progress
//! accumulator read by the watchdog, the cancellation predicate, the work
//! list an operation targets, and the collaborator traits for the progress
//! surface and the power lock. Nothing here spawns threads or touches the
//! filesystem; see `courier-ops` for the engine itself.

mod cancel;
mod config;
mod context;
mod error;
mod power;
mod progress;
mod surface;
mod worklist;

pub use cancel::CancellationGate;
pub use config::{EngineConfig, EngineConfigBuilder};
pub use context::{Flow, TransferContext};
pub use error::{OperationError, PrimitiveError};
pub use power::{NoPowerLock, PowerGuard, PowerLock};
pub use progress::{ProgressSink, ProgressState, Throughput, ThroughputSample, percentage};
pub use surface::{ExportMessage, Notice, NullSurface, ProgressSurface, display_name};
pub use worklist::{WorkItem, WorkList};
