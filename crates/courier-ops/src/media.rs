//! Media classification and the exporter collaborator.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use courier_core::{CancellationGate, Flow, PrimitiveError, TransferContext, percentage};

use crate::primitives::pump;

/// Bytes of header [`classify`] reads.
const SNIFF_LEN: usize = 12;

/// Kinds of media the export operation handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    /// BMP, JPEG or PNG.
    Image,
    /// MP3.
    Audio,
    /// MP4.
    Video,
}

impl MediaKind {
    /// Subdirectory of the library this kind is exported into.
    pub fn library_dir(self) -> &'static str {
        match self {
            Self::Image => "picture",
            Self::Audio => "music",
            Self::Video => "video",
        }
    }
}

/// Classify a file header by its signature.
pub fn sniff(header: &[u8]) -> Option<MediaKind> {
    match header {
        [b'B', b'M', ..] => Some(MediaKind::Image),
        [0xFF, 0xD8, 0xFF, ..] => Some(MediaKind::Image),
        [0x89, b'P', b'N', b'G', ..] => Some(MediaKind::Image),
        [b'I', b'D', b'3', ..] => Some(MediaKind::Audio),
        [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some(MediaKind::Audio),
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => Some(MediaKind::Video),
        _ => None,
    }
}

/// Classify the file at `path`; unreadable files are not media.
pub fn classify(path: &Path) -> Option<MediaKind> {
    let mut file = File::open(path).ok()?;
    let mut header = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < header.len() {
        match file.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(_) => return None,
        }
    }
    sniff(&header[..filled])
}

/// Exports classified media into a user-visible library.
///
/// Image and video exports report nothing while they run; the driver
/// accounts for the whole file on success. Audio exports report a 0-100
/// percentage that may not be monotonic.
pub trait MediaExporter: Send + Sync {
    /// Directories owned by the library. Nothing under them is exported.
    fn library_roots(&self) -> Vec<String>;

    /// Volume the capacity check runs against.
    fn library_volume(&self) -> String;

    fn export_image(&self, src: &Path, gate: &CancellationGate) -> Result<Flow, PrimitiveError>;

    fn export_audio(
        &self,
        src: &Path,
        gate: &CancellationGate,
        on_percent: &mut dyn FnMut(u8),
    ) -> Result<Flow, PrimitiveError>;

    fn export_video(&self, src: &Path, gate: &CancellationGate) -> Result<Flow, PrimitiveError>;
}

/// Check whether `path` is inside one of `roots`, ignoring ASCII case.
pub fn is_under_library(path: &Path, roots: &[String]) -> bool {
    let path = path.to_string_lossy().to_ascii_lowercase();
    roots.iter().any(|root| {
        let root = root.to_ascii_lowercase();
        path.starts_with(&root) || path == root.trim_end_matches(['/', '\\'])
    })
}

/// [`MediaExporter`] that copies files into `music/`, `video/` and
/// `picture/` under a root, renaming on clash.
#[derive(Debug, Clone)]
pub struct LibraryExporter {
    root: String,
    chunk_size: usize,
}

impl LibraryExporter {
    pub fn new(root: impl Into<String>, chunk_size: usize) -> Self {
        let mut root = root.into();
        if !root.is_empty() && !root.ends_with(['/', '\\', ':']) {
            root.push('/');
        }
        Self {
            root,
            chunk_size: chunk_size.max(1),
        }
    }

    fn target_for(&self, kind: MediaKind, src: &Path) -> Result<PathBuf, PrimitiveError> {
        let dir = PathBuf::from(format!("{}{}", self.root, kind.library_dir()));
        fs::create_dir_all(&dir).map_err(|e| PrimitiveError::io(&dir, e))?;

        let name = src
            .file_name()
            .ok_or_else(|| PrimitiveError::other(format!("{}: not a file", src.display())))?;
        let target = dir.join(name);
        Ok(if target.exists() {
            auto_rename_path(&target)
        } else {
            target
        })
    }

    fn export(
        &self,
        kind: MediaKind,
        src: &Path,
        gate: &CancellationGate,
        on_chunk: &mut dyn FnMut(u64),
    ) -> Result<Flow, PrimitiveError> {
        let target = self.target_for(kind, src)?;
        let mut reader = File::open(src).map_err(|e| PrimitiveError::io(src, e))?;
        let mut writer = File::create(&target).map_err(|e| PrimitiveError::io(&target, e))?;

        let flow = pump(
            &mut reader,
            &mut writer,
            self.chunk_size,
            &|| gate.is_canceled(),
            on_chunk,
            src,
            &target,
        )?;

        if flow.is_stopped() {
            drop(writer);
            if let Err(e) = fs::remove_file(&target) {
                tracing::warn!("could not remove partial library entry {}: {e}", target.display());
            }
        } else {
            tracing::debug!("exported {} to {}", src.display(), target.display());
        }
        Ok(flow)
    }
}

impl MediaExporter for LibraryExporter {
    fn library_roots(&self) -> Vec<String> {
        [MediaKind::Audio, MediaKind::Video, MediaKind::Image]
            .into_iter()
            .map(|kind| format!("{}{}/", self.root, kind.library_dir()))
            .collect()
    }

    fn library_volume(&self) -> String {
        self.root.clone()
    }

    fn export_image(&self, src: &Path, gate: &CancellationGate) -> Result<Flow, PrimitiveError> {
        self.export(MediaKind::Image, src, gate, &mut |_: u64| {})
    }

    fn export_audio(
        &self,
        src: &Path,
        gate: &CancellationGate,
        on_percent: &mut dyn FnMut(u8),
    ) -> Result<Flow, PrimitiveError> {
        let size = fs::metadata(src).map_err(|e| PrimitiveError::io(src, e))?.len();
        let mut written = 0u64;
        self.export(MediaKind::Audio, src, gate, &mut |n: u64| {
            written += n;
            on_percent(percentage(written, size));
        })
    }

    fn export_video(&self, src: &Path, gate: &CancellationGate) -> Result<Flow, PrimitiveError> {
        self.export(MediaKind::Video, src, gate, &mut |_: u64| {})
    }
}

/// Turns an audio export's percentage callback into byte-equivalent progress.
///
/// The advance is clamped so progress for one file never goes backwards,
/// even if the exporter's percentage does.
pub struct AudioProgress<'a, 'c> {
    ctx: &'a TransferContext<'c>,
    size: u64,
    reported: u64,
}

impl<'a, 'c> AudioProgress<'a, 'c> {
    pub fn new(ctx: &'a TransferContext<'c>, size: u64) -> Self {
        Self {
            ctx,
            size,
            reported: 0,
        }
    }

    /// Account for the exporter reaching `percent`.
    pub fn on_percent(&mut self, percent: u8) {
        let fraction = f64::from(percent.min(100)) / 100.0;
        let target = ((fraction * self.size as f64).round() as u64).min(self.size);
        if target > self.reported {
            self.ctx.advance(target - self.reported);
            self.reported = target;
        }
    }

    /// Account for whatever the exporter did not report once it succeeded.
    pub fn finish(&mut self) {
        if self.size > self.reported {
            self.ctx.advance(self.size - self.reported);
            self.reported = self.size;
        }
    }

    /// Units this file has added so far.
    pub fn reported(&self) -> u64 {
        self.reported
    }
}

/// Generate an auto-renamed path to avoid clobbering a library entry.
///
/// For "song.mp3", tries "song (1).mp3", "song (2).mp3", etc.
pub fn auto_rename_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let extension = path.extension().and_then(|e| e.to_str());

    let name_for = |suffix: &str| match extension {
        Some(ext) => format!("{stem} {suffix}.{ext}"),
        None => format!("{stem} {suffix}"),
    };

    for i in 1..1000 {
        let candidate = parent.join(name_for(&format!("({i})")));
        if !candidate.exists() {
            return candidate;
        }
    }

    // Fallback: use timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    parent.join(name_for(&format!("[{timestamp}]")))
}
