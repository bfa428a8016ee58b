//! The progress surface an operation reports to.

use std::fmt;

use humansize::{BINARY, format_size};
use serde::{Deserialize, Serialize};

/// Longest current-file name shown before truncation.
const DISPLAY_NAME_MAX: usize = 50;

/// Presentation-side collaborator: a progress dialog or anything like it.
///
/// Called from both the driver thread and the watchdog thread.
pub trait ProgressSurface: Send + Sync {
    fn set_percentage(&self, percent: u8);

    fn set_throughput_label(&self, label: &str);

    /// Show which entry is being processed.
    fn set_current_file(&self, _name: &str) {}

    fn close(&self);

    fn report_error(&self, code: i32);

    fn report_info(&self, notice: &Notice);

    /// False once the user dismissed the surface or it stopped running.
    fn is_alive(&self) -> bool;
}

/// A surface that shows nothing and never goes away.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl ProgressSurface for NullSurface {
    fn set_percentage(&self, _percent: u8) {}
    fn set_throughput_label(&self, _label: &str) {}
    fn close(&self) {}
    fn report_error(&self, _code: i32) {}
    fn report_info(&self, _notice: &Notice) {}
    fn is_alive(&self) -> bool {
        true
    }
}

/// Informational messages an operation may end with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// Export found nothing it could export.
    NoMedia,
    /// Export finished.
    Exported(ExportMessage),
    /// Rendered digest of a hash operation.
    Digest(String),
    /// Capacity preflight rejected the operation.
    InsufficientSpace { required: u64, available: u64 },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMedia => write!(f, "There are no media files to export."),
            Self::Exported(message) => message.fmt(f),
            Self::Digest(digest) => f.write_str(digest),
            Self::InsufficientSpace {
                required,
                available,
            } => write!(
                f,
                "Not enough free space. {} required, {} available.",
                format_size(*required, BINARY),
                format_size(*available, BINARY)
            ),
        }
    }
}

/// Export summary, one variant per non-empty combination of counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportMessage {
    SongsVideosPictures {
        songs: u32,
        videos: u32,
        pictures: u32,
    },
    SongsVideos {
        songs: u32,
        videos: u32,
    },
    SongsPictures {
        songs: u32,
        pictures: u32,
    },
    VideosPictures {
        videos: u32,
        pictures: u32,
    },
    Songs {
        songs: u32,
    },
    Videos {
        videos: u32,
    },
    Pictures {
        pictures: u32,
    },
}

impl ExportMessage {
    /// Pick the variant for these counts; `None` when all are zero.
    pub fn from_counts(songs: u32, videos: u32, pictures: u32) -> Option<Self> {
        let message = match (songs > 0, videos > 0, pictures > 0) {
            (true, true, true) => Self::SongsVideosPictures {
                songs,
                videos,
                pictures,
            },
            (true, true, false) => Self::SongsVideos { songs, videos },
            (true, false, true) => Self::SongsPictures { songs, pictures },
            (false, true, true) => Self::VideosPictures { videos, pictures },
            (true, false, false) => Self::Songs { songs },
            (false, true, false) => Self::Videos { videos },
            (false, false, true) => Self::Pictures { pictures },
            (false, false, false) => return None,
        };
        Some(message)
    }
}

impl fmt::Display for ExportMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SongsVideosPictures {
                songs,
                videos,
                pictures,
            } => write!(
                f,
                "Exported {songs} song(s), {videos} video(s) and {pictures} picture(s)."
            ),
            Self::SongsVideos { songs, videos } => {
                write!(f, "Exported {songs} song(s) and {videos} video(s).")
            }
            Self::SongsPictures { songs, pictures } => {
                write!(f, "Exported {songs} song(s) and {pictures} picture(s).")
            }
            Self::VideosPictures { videos, pictures } => {
                write!(f, "Exported {videos} video(s) and {pictures} picture(s).")
            }
            Self::Songs { songs } => write!(f, "Exported {songs} song(s)."),
            Self::Videos { videos } => write!(f, "Exported {videos} video(s)."),
            Self::Pictures { pictures } => write!(f, "Exported {pictures} picture(s)."),
        }
    }
}

/// Basename of `path` shortened for display, ending in `...` when cut.
pub fn display_name(path: &str) -> String {
    let base = path
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path);

    if base.chars().count() < DISPLAY_NAME_MAX {
        return base.to_string();
    }
    let mut name: String = base.chars().take(DISPLAY_NAME_MAX - 4).collect();
    name.push_str("...");
    name
}
