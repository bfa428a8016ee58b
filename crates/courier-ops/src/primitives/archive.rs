//! Archive primitives backed by the zip crate.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use courier_core::{Flow, PrimitiveError, TransferContext};

use super::PathInfo;
use super::fs::pump;

/// Opens archives for reading.
pub trait ArchivePrimitives: Send + Sync {
    /// Open `archive`; the returned session closes it when dropped.
    fn open(&self, archive: &Path) -> Result<Box<dyn ArchiveSession>, PrimitiveError>;
}

/// An open archive. Paths are archive-internal, `/`-separated.
pub trait ArchiveSession: Send {
    /// Count bytes, folders and files at or below `path`.
    fn path_info(&mut self, path: &str) -> Result<PathInfo, PrimitiveError>;

    /// Extract everything at or below `path` into `dst`, advancing like a copy.
    fn extract_path(&mut self, path: &str, dst: &Path, ctx: &TransferContext<'_>) -> Result<Flow, PrimitiveError>;
}

/// [`ArchivePrimitives`] for zip files.
#[derive(Debug, Clone)]
pub struct ZipArchives {
    chunk_size: usize,
    directory_overhead: u64,
}

impl ZipArchives {
    pub fn new(chunk_size: usize, directory_overhead: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            directory_overhead,
        }
    }
}

impl ArchivePrimitives for ZipArchives {
    fn open(&self, archive: &Path) -> Result<Box<dyn ArchiveSession>, PrimitiveError> {
        let file = File::open(archive).map_err(|e| PrimitiveError::io(archive, e))?;
        let zip = ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(archive, e))?;
        tracing::debug!("opened archive {} ({} entries)", archive.display(), zip.len());

        Ok(Box::new(ZipSession {
            path: archive.to_path_buf(),
            zip,
            chunk_size: self.chunk_size,
            directory_overhead: self.directory_overhead,
        }))
    }
}

struct ZipSession {
    path: PathBuf,
    zip: ZipArchive<BufReader<File>>,
    chunk_size: usize,
    directory_overhead: u64,
}

fn zip_error(archive: &Path, err: zip::result::ZipError) -> PrimitiveError {
    PrimitiveError::other(format!("{}: {err}", archive.display()))
}

impl ZipSession {
    /// Indices of entries at or below `prefix`, with the remainder of their name.
    fn matching(&self, prefix: &str) -> Vec<(usize, String)> {
        let prefix = prefix.trim_matches('/');
        (0..self.zip.len())
            .filter_map(|index| {
                let name = self.zip.name_for_index(index)?;
                relative_to(name, prefix).map(|rest| (index, rest.to_string()))
            })
            .collect()
    }
}

/// The part of `name` below `prefix`, or `None` if `name` is elsewhere.
fn relative_to<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let name = name.trim_end_matches('/');
    if prefix.is_empty() {
        return Some(name);
    }
    match name.strip_prefix(prefix) {
        Some("") => Some(""),
        Some(rest) => rest.strip_prefix('/'),
        None => None,
    }
}

impl ArchiveSession for ZipSession {
    fn path_info(&mut self, path: &str) -> Result<PathInfo, PrimitiveError> {
        let mut info = PathInfo::default();
        for (index, _) in self.matching(path) {
            let entry = self
                .zip
                .by_index(index)
                .map_err(|e| zip_error(&self.path, e))?;
            if entry.is_dir() {
                info.folders += 1;
            } else {
                info.files += 1;
                info.size += entry.size();
            }
        }
        Ok(info)
    }

    fn extract_path(&mut self, path: &str, dst: &Path, ctx: &TransferContext<'_>) -> Result<Flow, PrimitiveError> {
        let mut entries = self.matching(path);
        entries.sort_by(|a, b| a.1.cmp(&b.1));

        for (index, rest) in entries {
            if ctx.is_canceled() {
                return Ok(Flow::Stopped);
            }

            let chunk_size = self.chunk_size;
            let directory_overhead = self.directory_overhead;
            let archive_path = self.path.clone();
            let mut entry = self
                .zip
                .by_index(index)
                .map_err(|e| zip_error(&archive_path, e))?;

            // Refuse names that would escape the destination.
            if entry.enclosed_name().is_none() {
                return Err(PrimitiveError::other(format!(
                    "{}: unsafe entry name {}",
                    archive_path.display(),
                    entry.name()
                )));
            }
            let target = if rest.is_empty() {
                dst.to_path_buf()
            } else {
                dst.join(&rest)
            };

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| PrimitiveError::io(&target, e))?;
                ctx.advance(directory_overhead);
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| PrimitiveError::io(parent, e))?;
            }
            let mut writer = File::create(&target).map_err(|e| PrimitiveError::io(&target, e))?;
            let flow = pump(
                &mut entry,
                &mut writer,
                chunk_size,
                &|| ctx.is_canceled(),
                &mut |n: u64| ctx.advance(n),
                &archive_path,
                &target,
            )?;
            if flow.is_stopped() {
                return Ok(Flow::Stopped);
            }
        }

        Ok(Flow::Done)
    }
}

impl Drop for ZipSession {
    fn drop(&mut self) {
        tracing::debug!("closed archive {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use courier_core::{CancellationGate, ProgressSink};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_zip(path: &Path) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        writer.add_directory("docs/", options).unwrap();
        writer.start_file("docs/readme.txt", options).unwrap();
        writer.write_all(b"read me").unwrap();
        writer.start_file("docs/deep/note.txt", options).unwrap();
        writer.write_all(b"note").unwrap();
        writer.start_file("top.txt", options).unwrap();
        writer.write_all(b"top level").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("docs/readme.txt", "docs"), Some("readme.txt"));
        assert_eq!(relative_to("docs/", "docs"), Some(""));
        assert_eq!(relative_to("docsx/a", "docs"), None);
        assert_eq!(relative_to("top.txt", ""), Some("top.txt"));
    }

    #[test]
    fn test_zip_path_info_and_extract() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("a.zip");
        build_zip(&archive);

        let archives = ZipArchives::new(4, 100);
        let mut session = archives.open(&archive).unwrap();

        let info = session.path_info("docs").unwrap();
        assert_eq!(info, PathInfo { size: 11, folders: 1, files: 2 });

        let sink = ProgressSink::new(info.size + info.folders * 100);
        let gate = CancellationGate::never();
        let ctx = TransferContext::new(&sink, &gate);

        let out = temp.path().join("out/docs");
        let flow = session.extract_path("docs", &out, &ctx).unwrap();

        assert_eq!(flow, Flow::Done);
        assert_eq!(sink.completed(), 111);
        assert_eq!(fs::read(out.join("readme.txt")).unwrap(), b"read me");
        assert_eq!(fs::read(out.join("deep/note.txt")).unwrap(), b"note");
        assert!(!temp.path().join("out/top.txt").exists());
    }

    #[test]
    fn test_open_rejects_non_archive() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.zip");
        fs::write(&bogus, b"not a zip").unwrap();

        assert!(ZipArchives::new(4, 0).open(&bogus).is_err());
    }
}
