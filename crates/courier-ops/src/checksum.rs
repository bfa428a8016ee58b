//! Hash driver.

use std::path::Path;

use courier_core::{CancellationGate, ProgressSurface};

use crate::engine::{CompletionStep, Engine, Halt, OperationResult, Session};
use crate::primitives::{HashAlgorithm, hash_file};

impl Engine {
    /// Digest a single file. Progress counts chunks, not bytes.
    pub fn hash(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        surface: &dyn ProgressSurface,
        gate: &CancellationGate,
    ) -> OperationResult {
        let session = self.session("hash", surface, gate);
        let outcome = self.run_hash(&session, path, algorithm);
        session.finish(outcome)
    }

    fn run_hash(&self, session: &Session<'_>, path: &Path, algorithm: HashAlgorithm) -> Result<CompletionStep, Halt> {
        let chunk_size = self.config.transfer_chunk_size;
        let size = self.paths.path_info(path, None)?.size;
        session.estimate(size.div_ceil(chunk_size as u64));
        session.show(&path.to_string_lossy());

        let digest = session
            .watched(false, |ctx| hash_file(path, algorithm, chunk_size, ctx))?
            .ok_or(Halt::Canceled)?;

        tracing::debug!("{algorithm} of {}: {}", path.display(), digest.to_hex());
        Ok(CompletionStep::Hashed(digest))
    }
}
