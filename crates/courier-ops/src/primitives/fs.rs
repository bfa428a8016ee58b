//! Local filesystem primitives.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use jwalk::WalkDir;

use courier_core::{Flow, PrimitiveError, TransferContext};

use super::{PathInfo, PathPrimitives, SkipFilter};

/// Code for a request that can never succeed as given.
const EINVAL: i32 = -22;

/// [`PathPrimitives`] over `std::fs`, copying in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct LocalFs {
    chunk_size: usize,
    directory_overhead: u64,
}

impl LocalFs {
    pub fn new(chunk_size: usize, directory_overhead: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            directory_overhead,
        }
    }

    fn copy_file(&self, src: &Path, dst: &Path, ctx: &TransferContext<'_>) -> Result<Flow, PrimitiveError> {
        let mut reader = File::open(src).map_err(|e| PrimitiveError::io(src, e))?;
        let permissions = reader
            .metadata()
            .map_err(|e| PrimitiveError::io(src, e))?
            .permissions();
        let mut writer = File::create(dst).map_err(|e| PrimitiveError::io(dst, e))?;

        let flow = pump(
            &mut reader,
            &mut writer,
            self.chunk_size,
            &|| ctx.is_canceled(),
            &mut |n: u64| ctx.advance(n),
            src,
            dst,
        )?;

        if flow == Flow::Done {
            fs::set_permissions(dst, permissions).map_err(|e| PrimitiveError::io(dst, e))?;
        }
        Ok(flow)
    }
}

impl PathPrimitives for LocalFs {
    fn path_info(&self, path: &Path, skip: Option<SkipFilter<'_>>) -> Result<PathInfo, PrimitiveError> {
        let root = fs::symlink_metadata(path).map_err(|e| PrimitiveError::io(path, e))?;
        let counts = |p: &Path| skip.is_none_or(|skip| !skip(p));

        let mut info = PathInfo::default();
        if !root.is_dir() {
            if counts(path) {
                info.files = 1;
                info.size = root.len();
            }
            return Ok(info);
        }

        let walker = WalkDir::new(path).skip_hidden(false).follow_links(false);
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("skipping unreadable entry under {}: {err}", path.display());
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                info.folders += 1;
                continue;
            }

            let entry_path = entry.path();
            if !counts(&entry_path) {
                continue;
            }
            info.files += 1;
            if let Ok(metadata) = entry.metadata() {
                info.size += metadata.len();
            }
        }

        Ok(info)
    }

    fn copy_path(&self, src: &Path, dst: &Path, ctx: &TransferContext<'_>) -> Result<Flow, PrimitiveError> {
        reject_nested(src, dst)?;
        let metadata = fs::symlink_metadata(src).map_err(|e| PrimitiveError::io(src, e))?;
        if !metadata.is_dir() {
            return self.copy_file(src, dst, ctx);
        }

        fs::create_dir_all(dst).map_err(|e| PrimitiveError::io(dst, e))?;
        ctx.advance(self.directory_overhead);

        for entry in sorted_entries(src)? {
            if ctx.is_canceled() {
                return Ok(Flow::Stopped);
            }
            let child = entry.path();
            if self.copy_path(&child, &dst.join(entry.file_name()), ctx)?.is_stopped() {
                return Ok(Flow::Stopped);
            }
        }

        Ok(Flow::Done)
    }

    fn move_path(&self, src: &Path, dst: &Path) -> Result<(), PrimitiveError> {
        reject_nested(src, dst)?;
        let src_meta = fs::symlink_metadata(src).map_err(|e| PrimitiveError::io(src, e))?;

        match fs::symlink_metadata(dst) {
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(PrimitiveError::io(dst, e)),
            Ok(dst_meta) if src_meta.is_dir() && dst_meta.is_dir() => {
                // Integrate: merge children, then drop the emptied source.
                for entry in sorted_entries(src)? {
                    self.move_path(&entry.path(), &dst.join(entry.file_name()))?;
                }
                return fs::remove_dir(src).map_err(|e| PrimitiveError::io(src, e));
            }
            Ok(dst_meta) if dst_meta.is_dir() => {
                fs::remove_dir_all(dst).map_err(|e| PrimitiveError::io(dst, e))?;
            }
            Ok(_) => {
                fs::remove_file(dst).map_err(|e| PrimitiveError::io(dst, e))?;
            }
        }

        fs::rename(src, dst).map_err(|e| PrimitiveError::io(src, e))
    }

    fn remove_path(&self, path: &Path, ctx: &TransferContext<'_>) -> Result<Flow, PrimitiveError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| PrimitiveError::io(path, e))?;

        if metadata.is_dir() {
            for entry in sorted_entries(path)? {
                if ctx.is_canceled() {
                    return Ok(Flow::Stopped);
                }
                if self.remove_path(&entry.path(), ctx)?.is_stopped() {
                    return Ok(Flow::Stopped);
                }
            }
            fs::remove_dir(path).map_err(|e| PrimitiveError::io(path, e))?;
        } else {
            fs::remove_file(path).map_err(|e| PrimitiveError::io(path, e))?;
        }

        ctx.advance(1);
        Ok(Flow::Done)
    }
}

/// Refuse a `dst` that is `src` or lies below it.
fn reject_nested(src: &Path, dst: &Path) -> Result<(), PrimitiveError> {
    if dst.starts_with(src) {
        return Err(PrimitiveError::new(
            EINVAL,
            format!("{}: cannot place inside itself", src.display()),
        ));
    }
    Ok(())
}

pub(crate) fn sorted_entries(dir: &Path) -> Result<Vec<fs::DirEntry>, PrimitiveError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| PrimitiveError::io(dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PrimitiveError::io(dir, e))?;
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}

/// Copy `reader` into `writer` one chunk at a time.
///
/// Cancellation is checked before every chunk and `on_chunk` gets the byte
/// count of every chunk written.
pub(crate) fn pump(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    chunk_size: usize,
    is_canceled: &dyn Fn() -> bool,
    on_chunk: &mut dyn FnMut(u64),
    src: &Path,
    dst: &Path,
) -> Result<Flow, PrimitiveError> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        if is_canceled() {
            return Ok(Flow::Stopped);
        }
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(PrimitiveError::io(src, e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|e| PrimitiveError::io(dst, e))?;
        on_chunk(n as u64);
    }
    writer.flush().map_err(|e| PrimitiveError::io(dst, e))?;
    Ok(Flow::Done)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use courier_core::{CancellationGate, ProgressSink};
    use tempfile::TempDir;

    use super::*;

    fn tree(root: &Path) {
        fs::create_dir_all(root.join("src/sub")).unwrap();
        fs::write(root.join("src/a.txt"), b"hello").unwrap();
        fs::write(root.join("src/sub/b.bin"), vec![7u8; 1000]).unwrap();
    }

    #[test]
    fn test_path_info_counts_root_directory() {
        let temp = TempDir::new().unwrap();
        tree(temp.path());

        let info = LocalFs::new(64, 10).path_info(&temp.path().join("src"), None).unwrap();
        assert_eq!(info, PathInfo { size: 1005, folders: 2, files: 2 });

        let file = LocalFs::new(64, 10)
            .path_info(&temp.path().join("src/a.txt"), None)
            .unwrap();
        assert_eq!(file, PathInfo { size: 5, folders: 0, files: 1 });
    }

    #[test]
    fn test_path_info_skip_filter() {
        let temp = TempDir::new().unwrap();
        tree(temp.path());

        let skip = |p: &Path| p.extension().is_some_and(|e| e == "bin");
        let info = LocalFs::new(64, 10)
            .path_info(&temp.path().join("src"), Some(&skip))
            .unwrap();
        assert_eq!(info.files, 1);
        assert_eq!(info.size, 5);
    }

    #[test]
    fn test_copy_path_advances_bytes_and_overhead() {
        let temp = TempDir::new().unwrap();
        tree(temp.path());

        let sink = ProgressSink::new(0);
        let gate = CancellationGate::never();
        let ctx = TransferContext::new(&sink, &gate);

        let fs_ops = LocalFs::new(64, 10);
        let flow = fs_ops
            .copy_path(&temp.path().join("src"), &temp.path().join("dst"), &ctx)
            .unwrap();

        assert_eq!(flow, Flow::Done);
        assert_eq!(sink.completed(), 1005 + 2 * 10);
        assert_eq!(fs::read(temp.path().join("dst/sub/b.bin")).unwrap(), vec![7u8; 1000]);
    }

    #[test]
    fn test_copy_stops_between_chunks() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("big"), vec![1u8; 4096]).unwrap();

        let flag = Arc::new(AtomicBool::new(false));
        let sink = ProgressSink::new(4096);
        let gate = CancellationGate::from_flag(Arc::clone(&flag));
        let report = |completed: u64, _total: u64| {
            if completed >= 1024 {
                flag.store(true, Ordering::Relaxed);
            }
        };
        let ctx = TransferContext::new(&sink, &gate).with_report(&report);

        let flow = LocalFs::new(512, 0)
            .copy_path(&temp.path().join("big"), &temp.path().join("copy"), &ctx)
            .unwrap();

        assert_eq!(flow, Flow::Stopped);
        assert_eq!(sink.completed(), 1024);
    }

    #[test]
    fn test_move_path_integrates_directories() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("from/d")).unwrap();
        fs::create_dir_all(temp.path().join("to/d")).unwrap();
        fs::write(temp.path().join("from/d/new.txt"), b"new").unwrap();
        fs::write(temp.path().join("from/d/same.txt"), b"from").unwrap();
        fs::write(temp.path().join("to/d/same.txt"), b"old").unwrap();
        fs::write(temp.path().join("to/d/keep.txt"), b"keep").unwrap();

        LocalFs::new(64, 0)
            .move_path(&temp.path().join("from/d"), &temp.path().join("to/d"))
            .unwrap();

        assert!(!temp.path().join("from/d").exists());
        assert_eq!(fs::read(temp.path().join("to/d/same.txt")).unwrap(), b"from");
        assert_eq!(fs::read(temp.path().join("to/d/new.txt")).unwrap(), b"new");
        assert_eq!(fs::read(temp.path().join("to/d/keep.txt")).unwrap(), b"keep");
    }

    #[test]
    fn test_nested_targets_are_refused() {
        let temp = TempDir::new().unwrap();
        tree(temp.path());
        let src = temp.path().join("src");
        let fs_ops = LocalFs::new(64, 0);

        let err = fs_ops.move_path(&src.join("a.txt"), &src.join("a.txt")).unwrap_err();
        assert_eq!(err.code, EINVAL);
        assert_eq!(fs::read(src.join("a.txt")).unwrap(), b"hello");

        let sink = ProgressSink::new(0);
        let gate = CancellationGate::never();
        let ctx = TransferContext::new(&sink, &gate);
        assert!(fs_ops.copy_path(&src.join("a.txt"), &src.join("a.txt"), &ctx).is_err());
        assert!(fs_ops.copy_path(&src, &src.join("sub/src"), &ctx).is_err());
        assert_eq!(fs::read(src.join("a.txt")).unwrap(), b"hello");
        assert!(!src.join("sub/src").exists());
    }

    #[test]
    fn test_remove_path_counts_entries() {
        let temp = TempDir::new().unwrap();
        tree(temp.path());

        let sink = ProgressSink::new(4);
        let gate = CancellationGate::never();
        let ctx = TransferContext::new(&sink, &gate);

        let flow = LocalFs::new(64, 0).remove_path(&temp.path().join("src"), &ctx).unwrap();
        assert_eq!(flow, Flow::Done);
        assert_eq!(sink.completed(), 4);
        assert!(!temp.path().join("src").exists());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = LocalFs::new(64, 0)
            .path_info(&temp.path().join("nope"), None)
            .unwrap_err();
        assert!(err.code < 0);
    }
}
