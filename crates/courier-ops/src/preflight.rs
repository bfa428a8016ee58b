//! Checks that decide whether and how an operation may start.

use std::path::{Path, PathBuf};

use courier_core::{EngineConfig, OperationError, PrimitiveError};

use crate::primitives::VolumeInfo;

/// The volume prefix of a path: everything before the first `:`.
///
/// Only counts when the `:` comes before any separator, so `ux0:data/x`
/// and `C:\dir` have one and `/tmp/a:b` does not.
pub fn volume_prefix(path: &str) -> Option<&str> {
    let colon = path.find(':')?;
    let separator = path.find(['/', '\\']).unwrap_or(usize::MAX);
    (colon < separator).then(|| &path[..colon])
}

/// Whether a move from `src` to `dst` can be a rename.
///
/// Paths that both carry a volume prefix are compared by prefix,
/// case-insensitively. Otherwise the volumes collaborator is asked to
/// compare devices; when it cannot tell, the paths are assumed to share one.
pub fn same_partition(src: &str, dst: &str, volumes: &dyn VolumeInfo) -> bool {
    match (volume_prefix(src), volume_prefix(dst)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => volumes
            .same_device(Path::new(src), Path::new(dst))
            .unwrap_or(true),
    }
}

/// Reject the operation when `destination` cannot hold `required` bytes.
///
/// The configured always-available volume is never checked.
pub fn ensure_free_space(
    config: &EngineConfig,
    volumes: &dyn VolumeInfo,
    destination: &str,
    required: u64,
) -> Result<(), OperationError> {
    if config.skips_capacity_check(destination) {
        return Ok(());
    }

    let available = volumes
        .available_space(Path::new(destination))
        .map_err(|e| PrimitiveError::io(destination, e))?;

    if available < required {
        tracing::warn!(
            "not enough space on {destination}: {required} bytes required, {available} available"
        );
        return Err(OperationError::InsufficientSpace {
            volume: destination.into(),
            required,
            available,
        });
    }
    Ok(())
}

/// Reject placing `source` at `target` when the target is the source itself
/// or lies below it.
///
/// Both paths are compared with their parent directories resolved, so `..`
/// and symlinked parents cannot hide the nesting. The last component is
/// left alone: a symlink is moved or copied as a link.
pub fn ensure_outside_source(source: &Path, target: &Path) -> Result<(), OperationError> {
    let resolved_source = resolve_parent(source);
    if resolve_parent(target).starts_with(&resolved_source) {
        tracing::warn!("refusing to place {} inside itself", source.display());
        return Err(OperationError::SourceIsAncestor {
            source_path: source.to_path_buf(),
            target: target.to_path_buf(),
        });
    }
    Ok(())
}

/// Canonicalize the deepest existing ancestor of `path`'s parent and
/// append the rest.
fn resolve_parent(path: &Path) -> PathBuf {
    let mut tail = Vec::new();
    let mut current = path;
    loop {
        let (parent, name) = match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => return path.to_path_buf(),
        };
        tail.push(name);
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(real) = parent.canonicalize() {
            return tail.iter().rev().fold(real, |acc, name| acc.join(name));
        }
        current = parent;
    }
}
