//! Copy, move and extract driver.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use courier_core::{CancellationGate, PrimitiveError, ProgressSurface, TransferContext, WorkList};

use crate::engine::{CompletionStep, Engine, Halt, OperationResult, Session};
use crate::preflight::{ensure_free_space, ensure_outside_source, same_partition};
use crate::primitives::{ArchiveSession, PathInfo};

/// How the sources reach the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyMode {
    Copy,
    /// Rename when source and destination share a partition, otherwise copy
    /// then delete the sources.
    Move,
    /// Sources are entries inside `archive`, named relative to the archive
    /// root by the work list's base.
    Extract { archive: PathBuf },
}

/// A copy-family operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRequest {
    pub sources: WorkList,
    /// Directory the sources are placed in.
    pub destination: PathBuf,
    pub mode: CopyMode,
}

impl CopyRequest {
    pub fn copy(sources: WorkList, destination: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            destination: destination.into(),
            mode: CopyMode::Copy,
        }
    }

    pub fn move_to(sources: WorkList, destination: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            destination: destination.into(),
            mode: CopyMode::Move,
        }
    }

    pub fn extract(archive: impl Into<PathBuf>, sources: WorkList, destination: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            destination: destination.into(),
            mode: CopyMode::Extract {
                archive: archive.into(),
            },
        }
    }
}

impl Engine {
    /// Copy, move or extract `request.sources` into `request.destination`.
    ///
    /// Nothing already copied is rolled back when a later item fails or the
    /// user cancels.
    pub fn copy(
        &self,
        request: &CopyRequest,
        surface: &dyn ProgressSurface,
        gate: &CancellationGate,
    ) -> OperationResult {
        let operation = match request.mode {
            CopyMode::Copy => "copy",
            CopyMode::Move => "move",
            CopyMode::Extract { .. } => "extract",
        };
        let session = self.session(operation, surface, gate);
        let outcome = match &request.mode {
            CopyMode::Copy => self.run_byte_copy(&session, request, false),
            CopyMode::Move => {
                let destination = request.destination.to_string_lossy();
                if same_partition(request.sources.base(), &destination, self.volumes.as_ref()) {
                    self.run_rename(&session, request)
                } else {
                    self.run_byte_copy(&session, request, true)
                }
            }
            CopyMode::Extract { archive } => self.run_extract(&session, request, archive),
        };
        session.finish(outcome)
    }

    /// Same-partition move: one rename per item, one unit per item.
    fn run_rename(&self, session: &Session<'_>, request: &CopyRequest) -> Result<CompletionStep, Halt> {
        let list = &request.sources;
        check_nesting(request)?;
        tracing::debug!("moving {} item(s) by rename", list.len());
        session.estimate(list.len() as u64);
        create_destination(&request.destination)?;

        session.watched(false, |ctx| -> Result<(), Halt> {
            for item in list.items() {
                session.checkpoint()?;
                session.show(&list.path_string(item));
                self.paths
                    .move_path(&list.path_of(item), &list.target_of(item, &request.destination))?;
                ctx.advance(1);
            }
            Ok(())
        })?;
        Ok(CompletionStep::Moved)
    }

    /// Copy, or cross-partition move as copy then delete.
    fn run_byte_copy(
        &self,
        session: &Session<'_>,
        request: &CopyRequest,
        then_delete: bool,
    ) -> Result<CompletionStep, Halt> {
        let list = &request.sources;
        check_nesting(request)?;
        let info = self.stat_all(list)?;

        let mut total = self.copy_estimate(info);
        if then_delete {
            total += info.entries();
        }
        session.estimate(total);
        self.check_capacity(&request.destination, info.size)?;
        create_destination(&request.destination)?;

        session.watched(true, |ctx| -> Result<(), Halt> {
            for item in list.items() {
                session.checkpoint()?;
                session.show(&list.path_string(item));
                let target = list.target_of(item, &request.destination);
                if self.paths.copy_path(&list.path_of(item), &target, ctx)?.is_stopped() {
                    return Err(Halt::Canceled);
                }
            }
            if then_delete {
                self.remove_items(session, list, ctx)?;
            }
            Ok(())
        })?;

        Ok(if then_delete {
            CompletionStep::Moved
        } else {
            CompletionStep::Copied
        })
    }

    /// Extract archive entries. The archive stays open for the whole
    /// operation and is closed on every exit path.
    fn run_extract(
        &self,
        session: &Session<'_>,
        request: &CopyRequest,
        archive: &Path,
    ) -> Result<CompletionStep, Halt> {
        let list = &request.sources;
        let mut opened = self.archives.open(archive)?;

        let mut info = PathInfo::default();
        for item in list.items() {
            info.add(opened.path_info(&list.path_string(item))?);
        }
        session.estimate(self.copy_estimate(info));
        self.check_capacity(&request.destination, info.size)?;
        create_destination(&request.destination)?;

        session.watched(true, |ctx| extract_items(session, opened.as_mut(), request, ctx))?;
        Ok(CompletionStep::Extracted)
    }

    /// Bytes plus the per-directory overhead.
    fn copy_estimate(&self, info: PathInfo) -> u64 {
        info.size
            .saturating_add(info.folders.saturating_mul(self.config.directory_overhead))
    }

    fn check_capacity(&self, destination: &Path, required: u64) -> Result<(), Halt> {
        let destination = destination.to_string_lossy();
        ensure_free_space(&self.config, self.volumes.as_ref(), &destination, required)?;
        Ok(())
    }
}

fn extract_items(
    session: &Session<'_>,
    archive: &mut dyn ArchiveSession,
    request: &CopyRequest,
    ctx: &TransferContext<'_>,
) -> Result<(), Halt> {
    let list = &request.sources;
    for item in list.items() {
        session.checkpoint()?;
        let path = list.path_string(item);
        session.show(&path);
        let target = list.target_of(item, &request.destination);
        if archive.extract_path(&path, &target, ctx)?.is_stopped() {
            return Err(Halt::Canceled);
        }
    }
    Ok(())
}

/// Every item must land outside itself.
fn check_nesting(request: &CopyRequest) -> Result<(), Halt> {
    let list = &request.sources;
    for item in list.items() {
        ensure_outside_source(&list.path_of(item), &list.target_of(item, &request.destination))?;
    }
    Ok(())
}

fn create_destination(destination: &Path) -> Result<(), PrimitiveError> {
    fs::create_dir_all(destination).map_err(|e| PrimitiveError::io(destination, e))
}
