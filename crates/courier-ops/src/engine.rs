//! The operation engine and the plumbing every driver shares.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use courier_core::{
    CancellationGate, EngineConfig, ExportMessage, Notice, NoPowerLock, OperationError, PowerGuard,
    PowerLock, PrimitiveError, ProgressSink, ProgressState, ProgressSurface, TransferContext,
    display_name,
};

use crate::media::{LibraryExporter, MediaExporter};
use crate::primitives::{
    ArchivePrimitives, HashDigest, HttpTransport, LocalFs, LocalVolumes, PathPrimitives, Transport,
    VolumeInfo, ZipArchives,
};
use crate::watchdog::run_watched;

/// Counters of a finished export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub songs: u32,
    pub videos: u32,
    pub pictures: u32,
    /// Bytes of media exported.
    pub bytes: u64,
}

impl ExportSummary {
    /// The summary message, if anything was exported.
    pub fn message(&self) -> Option<ExportMessage> {
        ExportMessage::from_counts(self.songs, self.videos, self.pictures)
    }
}

/// What a completed operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStep {
    Deleted,
    Copied,
    Moved,
    Extracted,
    Exported(ExportSummary),
    Hashed(HashDigest),
    Downloaded { path: PathBuf, bytes: u64 },
}

impl CompletionStep {
    /// Message shown to the user once the surface closes.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::Exported(summary) => summary.message().map(Notice::Exported),
            Self::Hashed(digest) => Some(Notice::Digest(digest.render())),
            _ => None,
        }
    }
}

/// Payload of a completed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub step: CompletionStep,
    /// Final state of the progress accumulator.
    pub progress: ProgressState,
}

/// Terminal outcome of one operation, reported exactly once.
#[derive(Debug, Clone)]
pub enum OperationResult {
    Completed(Finished),
    /// The user canceled; whatever was done stays done.
    Canceled,
    /// Export found no media. Neither a success nor an error.
    NoEligibleWork,
    Failed(OperationError),
}

impl OperationResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// The completion step, if the operation completed.
    pub fn step(&self) -> Option<&CompletionStep> {
        match self {
            Self::Completed(finished) => Some(&finished.step),
            _ => None,
        }
    }

    /// The error, if the operation failed.
    pub fn error(&self) -> Option<&OperationError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Why a driver stopped before completing.
#[derive(Debug)]
pub(crate) enum Halt {
    Canceled,
    NoEligibleWork,
    Failed(OperationError),
}

impl From<PrimitiveError> for Halt {
    fn from(error: PrimitiveError) -> Self {
        Self::Failed(error.into())
    }
}

impl From<OperationError> for Halt {
    fn from(error: OperationError) -> Self {
        Self::Failed(error)
    }
}

/// Runs bulk operations against a set of collaborators.
///
/// Every driver takes the progress surface to report to and the gate to poll
/// for cancellation, and blocks until the operation reaches a terminal state.
/// Drivers are not meant to run concurrently; [`crate::OperationExecutor`]
/// serializes them.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) paths: Arc<dyn PathPrimitives>,
    pub(crate) archives: Arc<dyn ArchivePrimitives>,
    pub(crate) exporter: Arc<dyn MediaExporter>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) volumes: Arc<dyn VolumeInfo>,
    pub(crate) power: Arc<dyn PowerLock>,
}

impl Engine {
    /// An engine over the local filesystem, zip archives and HTTP.
    pub fn local(config: EngineConfig) -> Self {
        let chunk = config.transfer_chunk_size;
        let overhead = config.directory_overhead;
        Self {
            paths: Arc::new(LocalFs::new(chunk, overhead)),
            archives: Arc::new(ZipArchives::new(chunk, overhead)),
            exporter: Arc::new(LibraryExporter::new(config.media_library.clone(), chunk)),
            transport: Arc::new(HttpTransport::new(
                config.user_agent.clone(),
                config.connect_timeout,
                chunk,
            )),
            volumes: Arc::new(LocalVolumes),
            power: Arc::new(NoPowerLock),
            config,
        }
    }

    pub fn with_paths(mut self, paths: Arc<dyn PathPrimitives>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_archives(mut self, archives: Arc<dyn ArchivePrimitives>) -> Self {
        self.archives = archives;
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn MediaExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_volumes(mut self, volumes: Arc<dyn VolumeInfo>) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn with_power_lock(mut self, power: Arc<dyn PowerLock>) -> Self {
        self.power = power;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start one operation: take the power lock and show 0%.
    pub(crate) fn session<'e>(
        &'e self,
        operation: &'static str,
        surface: &'e dyn ProgressSurface,
        gate: &'e CancellationGate,
    ) -> Session<'e> {
        let power = PowerGuard::acquire(self.power.as_ref());
        surface.set_percentage(0);
        tracing::debug!(operation, "operation started");

        Session {
            config: &self.config,
            operation,
            surface,
            gate,
            sink: ProgressSink::new(0),
            _power: power,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::local(EngineConfig::default())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish_non_exhaustive()
    }
}

/// State of one running operation. Dropping it releases the power lock.
pub(crate) struct Session<'e> {
    config: &'e EngineConfig,
    operation: &'static str,
    surface: &'e dyn ProgressSurface,
    gate: &'e CancellationGate,
    sink: ProgressSink,
    _power: PowerGuard<'e>,
}

impl Session<'_> {
    /// Set the total-work estimate. Must happen before [`Self::watched`].
    pub fn estimate(&self, total: u64) {
        tracing::debug!(operation = self.operation, total, "work estimated");
        self.sink.reset(total);
    }

    /// Run `body` with a watchdog reporting on this session's progress.
    pub fn watched<R>(&self, show_throughput: bool, body: impl FnOnce(&TransferContext<'_>) -> R) -> R {
        let ctx = TransferContext::new(&self.sink, self.gate);
        run_watched(self.config, &self.sink, self.surface, show_throughput, || body(&ctx))
    }

    /// Fail with [`Halt::Canceled`] once the gate reports cancellation.
    pub fn checkpoint(&self) -> Result<(), Halt> {
        if self.gate.is_canceled() {
            return Err(Halt::Canceled);
        }
        Ok(())
    }

    /// Publish the entry being worked on.
    pub fn show(&self, path: &str) {
        self.surface.set_current_file(&display_name(path));
    }

    pub fn gate(&self) -> &CancellationGate {
        self.gate
    }

    /// Render the terminal state and tear the session down.
    pub fn finish(self, outcome: Result<CompletionStep, Halt>) -> OperationResult {
        let operation = self.operation;
        match outcome {
            Ok(step) => {
                self.surface.set_percentage(100);
                self.surface.close();
                if let Some(notice) = step.notice() {
                    self.surface.report_info(&notice);
                }
                tracing::info!(operation, ?step, "operation completed");
                OperationResult::Completed(Finished {
                    step,
                    progress: self.sink.snapshot(),
                })
            }
            Err(Halt::Canceled) => {
                self.surface.close();
                tracing::info!(operation, completed = self.sink.completed(), "operation canceled");
                OperationResult::Canceled
            }
            Err(Halt::NoEligibleWork) => {
                self.surface.close();
                self.surface.report_info(&Notice::NoMedia);
                tracing::info!(operation, "nothing to do");
                OperationResult::NoEligibleWork
            }
            Err(Halt::Failed(error)) => {
                self.surface.close();
                match &error {
                    OperationError::InsufficientSpace {
                        required,
                        available,
                        ..
                    } => self.surface.report_info(&Notice::InsufficientSpace {
                        required: *required,
                        available: *available,
                    }),
                    other => self.surface.report_error(other.code()),
                }
                tracing::warn!(operation, code = error.code(), "operation failed: {error}");
                OperationResult::Failed(error)
            }
        }
    }
}
