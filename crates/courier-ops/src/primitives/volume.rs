//! Volume capacity and identity.

use std::io;
use std::path::Path;

/// Answers questions about the volumes paths live on.
pub trait VolumeInfo: Send + Sync {
    /// Bytes available to this process on the volume holding `path`.
    fn available_space(&self, path: &Path) -> io::Result<u64>;

    /// Whether two paths share a device, if the platform can tell.
    fn same_device(&self, a: &Path, b: &Path) -> Option<bool>;
}

/// [`VolumeInfo`] for locally mounted filesystems.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalVolumes;

impl VolumeInfo for LocalVolumes {
    fn available_space(&self, path: &Path) -> io::Result<u64> {
        fs2::available_space(existing_ancestor(path)?)
    }

    #[cfg(unix)]
    fn same_device(&self, a: &Path, b: &Path) -> Option<bool> {
        use std::os::unix::fs::MetadataExt;

        let dev = |p: &Path| -> Option<u64> {
            let p = existing_ancestor(p).ok()?;
            std::fs::metadata(p).ok().map(|m| m.dev())
        };
        Some(dev(a)? == dev(b)?)
    }

    #[cfg(not(unix))]
    fn same_device(&self, _a: &Path, _b: &Path) -> Option<bool> {
        None
    }
}

/// Closest ancestor of `path` (itself included) that exists. Relative paths
/// fall back to the working directory.
fn existing_ancestor(path: &Path) -> io::Result<&Path> {
    path.ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .or_else(|| path.is_relative().then(|| Path::new(".")))
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{}: no such volume", path.display())))
}
