//! xxHash-based content hashing
//!
//! Used as a cheap identity check before falling back to perceptual
//! comparison: two files with the same length and the same xxh3 digest are
//! treated as the same image without decoding either of them.

use crate::error::Result;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::trace;
use xxhash_rust::xxh3::Xxh3;

/// Read buffer size for streaming hashes (256KB)
const CHUNK_SIZE: usize = 256 * 1024;

/// Compute the xxh3 digest of a file's full contents
pub fn compute_file_hash(path: &Path) -> Result<u64> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.digest();
    trace!(?path, hash, "Computed file hash");
    Ok(hash)
}

/// Check whether two files have byte-identical contents
///
/// Lengths are compared first so differing files are usually rejected
/// without reading them.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    let len_a = fs::metadata(a)?.len();
    let len_b = fs::metadata(b)?.len();
    if len_a != len_b {
        return Ok(false);
    }

    Ok(compute_file_hash(a)? == compute_file_hash(b)?)
}
