//! Bulk operation engine for courier.
//!
//! [`Engine`] drives delete, copy, move, extract, export, hash and download
//! operations to completion. Each driver estimates the work up front, runs it
//! on the calling thread while a watchdog thread renders progress to a
//! [`ProgressSurface`](courier_core::ProgressSurface), and polls a
//! [`CancellationGate`](courier_core::CancellationGate) between work items and
//! between chunks. [`OperationExecutor`] wraps the engine for async callers,
//! delivering progress through channels.

mod checksum;
mod copy;
mod delete;
mod download;
mod engine;
mod executor;
mod export;
pub mod media;
pub mod preflight;
pub mod primitives;
mod watchdog;

pub use copy::{CopyMode, CopyRequest};
pub use engine::{CompletionStep, Engine, ExportSummary, Finished, OperationResult};
pub use executor::{OperationEvent, OperationExecutor, OperationHandle};
pub use media::{LibraryExporter, MediaExporter, MediaKind};
pub use primitives::{HashAlgorithm, HashDigest};
pub use watchdog::run_watched;

/// Default channel buffer size for operation progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
