//! Download driver.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use courier_core::{CancellationGate, OperationError, PrimitiveError, ProgressSurface};

use crate::engine::{CompletionStep, Engine, Halt, OperationResult, Session};
use crate::primitives::{ChunkControl, ProbeInfo};

/// File name used when neither the headers nor the URL name the resource.
const FALLBACK_FILENAME: &str = "download";

const HTTP_OK: u16 = 200;

impl Engine {
    /// Download `url` to `destination`.
    ///
    /// When `destination` is an existing directory the file is placed inside
    /// it, named after `Content-Disposition` or the URL. The server must
    /// answer 200 with a known length before anything is written, and again
    /// 200 once the body is in; any failure after the file was created
    /// removes it. A canceled download leaves the partial file in place.
    pub fn download(
        &self,
        url: &str,
        destination: &Path,
        surface: &dyn ProgressSurface,
        gate: &CancellationGate,
    ) -> OperationResult {
        let session = self.session("download", surface, gate);
        let outcome = self.run_download(&session, url, destination);
        session.finish(outcome)
    }

    fn run_download(&self, session: &Session<'_>, url: &str, destination: &Path) -> Result<CompletionStep, Halt> {
        let probe = self.transport.probe(url)?;
        tracing::debug!(?probe, "probed {url}");
        if probe.status != HTTP_OK {
            return Err(OperationError::HttpStatus { status: probe.status }.into());
        }
        let length = probe.content_length.ok_or(OperationError::UnknownLength)?;

        let path = target_path(destination, &probe);
        session.estimate(length);
        session.show(&path.to_string_lossy());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PrimitiveError::io(parent, e))?;
        }
        let mut file = File::create(&path).map_err(|e| PrimitiveError::io(&path, e))?;

        let mut written = 0u64;
        let mut write_error = None;
        let fetched = session.watched(true, |ctx| {
            self.transport.fetch(url, &mut |chunk: &[u8]| {
                if let Err(e) = file.write_all(chunk) {
                    write_error = Some(PrimitiveError::io(&path, e));
                    return ChunkControl::Abort;
                }
                written += chunk.len() as u64;
                ctx.advance(chunk.len() as u64);
                if ctx.is_canceled() {
                    ChunkControl::Abort
                } else {
                    ChunkControl::Continue
                }
            })
        });
        let flushed = file.flush().map_err(|e| PrimitiveError::io(&path, e));
        drop(file);

        let failure = match (fetched, write_error) {
            (_, Some(error)) => Some(Halt::from(error)),
            (Err(error), None) => Some(Halt::from(error)),
            (Ok(outcome), None) if outcome.aborted => return Err(Halt::Canceled),
            (Ok(outcome), None) if outcome.status != HTTP_OK => {
                Some(OperationError::HttpStatus { status: outcome.status }.into())
            }
            (Ok(_), None) => flushed.err().map(Halt::from),
        };

        if let Some(halt) = failure {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("could not remove partial download {}: {e}", path.display());
            }
            return Err(halt);
        }

        Ok(CompletionStep::Downloaded { path, bytes: written })
    }
}

fn target_path(destination: &Path, probe: &ProbeInfo) -> PathBuf {
    if !destination.is_dir() {
        return destination.to_path_buf();
    }
    let name = probe
        .filename
        .as_deref()
        .filter(|name| !matches!(*name, "." | ".."))
        .unwrap_or(FALLBACK_FILENAME);
    destination.join(name)
}
