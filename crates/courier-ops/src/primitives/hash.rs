//! Streaming file digests.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use courier_core::{PrimitiveError, TransferContext};

/// Digest algorithms a hash operation can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha256 => write!(f, "SHA256"),
        }
    }
}

/// A finished digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    pub algorithm: HashAlgorithm,
    pub bytes: Vec<u8>,
}

impl HashDigest {
    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Uppercase hex split over two lines at the midpoint of the digest.
    pub fn render(&self) -> String {
        let per_line = (self.bytes.len() / 2).max(1);
        self.bytes
            .chunks(per_line)
            .map(hex::encode_upper)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Hash `path` with `algorithm`, advancing the context by one per chunk.
///
/// Returns `Ok(None)` when cancellation was observed.
pub fn hash_file(
    path: &Path,
    algorithm: HashAlgorithm,
    chunk_size: usize,
    ctx: &TransferContext<'_>,
) -> Result<Option<HashDigest>, PrimitiveError> {
    let file = File::open(path).map_err(|e| PrimitiveError::io(path, e))?;
    let bytes = match algorithm {
        HashAlgorithm::Md5 => stream::<Md5>(file, path, chunk_size, ctx)?,
        HashAlgorithm::Sha1 => stream::<Sha1>(file, path, chunk_size, ctx)?,
        HashAlgorithm::Sha256 => stream::<Sha256>(file, path, chunk_size, ctx)?,
    };
    Ok(bytes.map(|bytes| HashDigest { algorithm, bytes }))
}

fn stream<D: Digest>(
    mut file: File,
    path: &Path,
    chunk_size: usize,
    ctx: &TransferContext<'_>,
) -> Result<Option<Vec<u8>>, PrimitiveError> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        if ctx.is_canceled() {
            return Ok(None);
        }
        let n = match read_full(&mut file, &mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => return Err(PrimitiveError::io(path, e)),
        };
        hasher.update(&buf[..n]);
        ctx.advance(1);
        if n < buf.len() {
            break;
        }
    }

    Ok(Some(hasher.finalize().to_vec()))
}

/// Fill `buf` as far as the reader allows, so progress units line up with
/// whole chunks.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
