//! Streaming SHA-256 content digests for disposition provenance.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::core::errors::{Result, SentryError};

/// Read buffer size. Digesting streams; a multi-gigabyte file never lands in
/// memory at once.
const BUF_SIZE: usize = 64 * 1024;

/// Compute the SHA-256 hex digest of a file by streaming its bytes.
///
/// Any open or read failure surfaces as `SentryError::Hash`; callers holding
/// a pending disposition must abort the move when this fails.
pub fn digest_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| SentryError::Hash {
        path: path.to_path_buf(),
        details: format!("open failed: {e}"),
    })?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| SentryError::Hash {
            path: path.to_path_buf(),
            details: format!("read failed: {e}"),
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}
