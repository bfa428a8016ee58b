//! Collaborators the drivers call into, each behind a trait with one local
//! implementation.

mod archive;
mod fs;
mod hash;
mod transport;
mod volume;

use std::path::Path;

use courier_core::{Flow, PrimitiveError, TransferContext};

pub use archive::{ArchivePrimitives, ArchiveSession, ZipArchives};
pub use fs::LocalFs;
pub(crate) use fs::{pump, sorted_entries};
pub use hash::{HashAlgorithm, HashDigest, hash_file};
pub use transport::{
    ChunkControl, FetchOutcome, HttpTransport, ProbeInfo, Transport, filename_from_content_disposition,
    filename_from_url,
};
pub use volume::{LocalVolumes, VolumeInfo};

/// Result of a stat-walk over one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathInfo {
    /// Bytes across all counted files.
    pub size: u64,
    /// Directories, including the root when it is one.
    pub folders: u64,
    /// Counted files.
    pub files: u64,
}

impl PathInfo {
    /// Fold another walk into this one.
    pub fn add(&mut self, other: PathInfo) {
        self.size += other.size;
        self.folders += other.folders;
        self.files += other.files;
    }

    /// Entries a remove pass will touch.
    pub fn entries(&self) -> u64 {
        self.folders + self.files
    }
}

/// Files a stat-walk should leave out of its counts.
pub type SkipFilter<'a> = &'a dyn Fn(&Path) -> bool;

/// Filesystem primitives.
///
/// Every long-running call advances the context as it goes and returns
/// [`Flow::Stopped`] once it sees cancellation.
pub trait PathPrimitives: Send + Sync {
    /// Count bytes, folders and files under `path`.
    fn path_info(&self, path: &Path, skip: Option<SkipFilter<'_>>) -> Result<PathInfo, PrimitiveError>;

    /// Copy a file or tree, advancing by bytes plus a per-directory overhead.
    fn copy_path(&self, src: &Path, dst: &Path, ctx: &TransferContext<'_>) -> Result<Flow, PrimitiveError>;

    /// Rename `src` onto `dst`, merging into existing directories and
    /// replacing existing files.
    fn move_path(&self, src: &Path, dst: &Path) -> Result<(), PrimitiveError>;

    /// Remove a file or tree, advancing by one per removed entry.
    fn remove_path(&self, path: &Path, ctx: &TransferContext<'_>) -> Result<Flow, PrimitiveError>;
}
