//! Media export driver.

use std::fs;
use std::path::Path;

use courier_core::{CancellationGate, Flow, PrimitiveError, ProgressSurface, TransferContext, WorkList};

use crate::engine::{CompletionStep, Engine, ExportSummary, Halt, OperationResult, Session};
use crate::media::{AudioProgress, MediaKind, classify, is_under_library};
use crate::preflight::ensure_free_space;
use crate::primitives::sorted_entries;

impl Engine {
    /// Export every classified media file at or below the items of `list`
    /// into the media library.
    ///
    /// Files that are not media, or that already live in the library, are
    /// skipped without being counted. Finding no media at all ends the
    /// operation with [`OperationResult::NoEligibleWork`].
    pub fn export(
        &self,
        list: &WorkList,
        surface: &dyn ProgressSurface,
        gate: &CancellationGate,
    ) -> OperationResult {
        let session = self.session("export", surface, gate);
        let outcome = self.run_export(&session, list);
        session.finish(outcome)
    }

    fn run_export(&self, session: &Session<'_>, list: &WorkList) -> Result<CompletionStep, Halt> {
        let roots = self.exporter.library_roots();
        let skip = |path: &Path| is_under_library(path, &roots) || classify(path).is_none();

        let mut size = 0u64;
        for path in list.paths() {
            size += self.paths.path_info(&path, Some(&skip))?.size;
        }
        if size == 0 {
            return Err(Halt::NoEligibleWork);
        }
        session.estimate(size);
        ensure_free_space(&self.config, self.volumes.as_ref(), &self.exporter.library_volume(), size)?;

        let mut summary = ExportSummary::default();
        session.watched(false, |ctx| -> Result<(), Halt> {
            let mut walk = ExportWalk {
                engine: self,
                session,
                ctx,
                roots: &roots,
                summary: &mut summary,
            };
            for item in list.items() {
                session.checkpoint()?;
                walk.visit(&list.path_of(item))?;
            }
            Ok(())
        })?;

        tracing::debug!(?summary, "export finished");
        Ok(CompletionStep::Exported(summary))
    }
}

/// Recursive export over one operation's work list.
struct ExportWalk<'w, 'c> {
    engine: &'w Engine,
    session: &'w Session<'w>,
    ctx: &'w TransferContext<'c>,
    roots: &'w [String],
    summary: &'w mut ExportSummary,
}

impl ExportWalk<'_, '_> {
    fn visit(&mut self, path: &Path) -> Result<(), Halt> {
        if is_under_library(path, self.roots) {
            return Ok(());
        }

        let metadata = fs::symlink_metadata(path).map_err(|e| PrimitiveError::io(path, e))?;
        if metadata.is_dir() {
            for entry in sorted_entries(path)? {
                self.session.checkpoint()?;
                self.visit(&entry.path())?;
            }
            return Ok(());
        }

        let Some(kind) = classify(path) else {
            return Ok(());
        };
        self.session.show(&path.to_string_lossy());
        self.export_file(kind, path, metadata.len())
    }

    fn export_file(&mut self, kind: MediaKind, path: &Path, size: u64) -> Result<(), Halt> {
        let exporter = self.engine.exporter.as_ref();
        let gate = self.session.gate();

        let flow = match kind {
            MediaKind::Image | MediaKind::Video => {
                let flow = if kind == MediaKind::Image {
                    exporter.export_image(path, gate)?
                } else {
                    exporter.export_video(path, gate)?
                };
                if flow == Flow::Done {
                    self.ctx.advance(size);
                }
                flow
            }
            MediaKind::Audio => {
                let mut progress = AudioProgress::new(self.ctx, size);
                let flow = exporter.export_audio(path, gate, &mut |percent: u8| progress.on_percent(percent))?;
                if flow == Flow::Done {
                    progress.finish();
                }
                flow
            }
        };

        if flow.is_stopped() {
            return Err(Halt::Canceled);
        }

        match kind {
            MediaKind::Image => self.summary.pictures += 1,
            MediaKind::Audio => self.summary.songs += 1,
            MediaKind::Video => self.summary.videos += 1,
        }
        self.summary.bytes += size;
        Ok(())
    }
}
