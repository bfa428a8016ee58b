//! Error types for bulk operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Code used when a collaborator fails without a more specific one.
const GENERIC_FAILURE: i32 = -1;

/// A failure reported by a low-level collaborator.
///
/// The code is negative and is handed to the error reporter unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct PrimitiveError {
    pub code: i32,
    pub message: String,
}

impl PrimitiveError {
    /// Create an error with an explicit code.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: if code < 0 { code } else { GENERIC_FAILURE },
            message: message.into(),
        }
    }

    /// Create an error with the generic failure code.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(GENERIC_FAILURE, message)
    }

    /// Create an I/O error with path context; the code is the negated errno.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let code = source
            .raw_os_error()
            .filter(|errno| *errno > 0)
            .map(|errno| -errno)
            .unwrap_or(GENERIC_FAILURE);
        Self {
            code,
            message: format!("{}: {source}", path.as_ref().display()),
        }
    }
}

/// Why an operation failed.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    /// A collaborator failed.
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),

    /// The destination volume cannot hold the data; nothing was started.
    #[error("Not enough free space on {volume}: {required} bytes required, {available} available")]
    InsufficientSpace {
        volume: PathBuf,
        required: u64,
        available: u64,
    },

    /// The server answered with something other than 200.
    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    /// The server did not report a usable content length.
    #[error("Download size is unknown")]
    UnknownLength,

    /// The target lies at or below its own source.
    #[error("Cannot place {} inside itself ({})", source_path.display(), target.display())]
    SourceIsAncestor { source_path: PathBuf, target: PathBuf },

    /// A work list with no items.
    #[error("Nothing selected")]
    EmptyWorkList,

    /// The worker running the operation died.
    #[error("Worker failed: {message}")]
    Worker { message: String },
}

impl OperationError {
    /// The integer handed to the surface's error reporter.
    pub fn code(&self) -> i32 {
        match self {
            Self::Primitive(e) => e.code,
            Self::HttpStatus { status } => i32::from(*status),
            _ => GENERIC_FAILURE,
        }
    }
}
