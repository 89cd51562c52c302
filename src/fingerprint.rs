//! Content fingerprint of a local media file
//!
//! This module computes the OpenSubtitles hash of a file: the file size plus
//! the sum of the little-endian 64-bit words in its first and last 64 KiB,
//! wrapping on overflow. Files shorter than 64 KiB contribute their whole
//! content twice. At most 128 KiB of the file are ever read, so hashing is
//! cheap regardless of the file size.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Size of each hashed chunk at the start and the end of the file
const CHUNK_SIZE: u64 = 64 * 1024;

/// Errors that can occur while fingerprinting a file
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Failed to open or read the file
    #[error("Failed to read {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    /// The file has no content to hash
    #[error("File is empty: {path}")]
    EmptyFile { path: PathBuf },
}

/// Fingerprint of a media file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFingerprint {
    /// Hex-encoded OpenSubtitles hash (16 lowercase digits)
    pub hash: String,
    /// File size in bytes
    pub size_bytes: u64,
}

/// Computes the OpenSubtitles hash and size of a media file
///
/// # Arguments
///
/// * `path` - Path to the media file
///
/// # Returns
///
/// The fingerprint, or an error if the file cannot be read or is empty.
pub fn fingerprint_file(path: &Path) -> Result<MediaFingerprint, FingerprintError> {
    let read_failed = |source| FingerprintError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_failed)?;
    let size = file.metadata().map_err(read_failed)?.len();

    if size == 0 {
        return Err(FingerprintError::EmptyFile {
            path: path.to_path_buf(),
        });
    }

    // Head and tail overlap for files under two chunks
    let chunk = size.min(CHUNK_SIZE);
    let mut hash = size;
    let mut buffer = vec![0u8; chunk as usize];

    file.read_exact(&mut buffer).map_err(read_failed)?;
    hash = hash.wrapping_add(sum_words(&buffer));

    file.seek(SeekFrom::Start(size - chunk))
        .map_err(read_failed)?;
    file.read_exact(&mut buffer).map_err(read_failed)?;
    hash = hash.wrapping_add(sum_words(&buffer));

    Ok(MediaFingerprint {
        hash: format!("{:016x}", hash),
        size_bytes: size,
    })
}

/// Wrapping sum of the little-endian u64 words of a chunk; trailing bytes
/// short of a word are ignored
fn sum_words(chunk: &[u8]) -> u64 {
    chunk
        .chunks_exact(8)
        .map(|word| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(word);
            u64::from_le_bytes(bytes)
        })
        .fold(0u64, u64::wrapping_add)
}
