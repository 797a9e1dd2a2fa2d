//! Shred engine: destructive multi-pass random overwrite followed by unlink.
//!
//! Best-effort only: overwrite-then-unlink assumes conventional in-place
//! storage semantics. Flash wear-leveling and copy-on-write snapshots can
//! retain stale copies; that caveat travels in every report instead of being
//! silently assumed solved.

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::RngCore;

use crate::core::errors::{Result, SentryError};

/// Number of full-size random overwrite passes.
const PASSES: u32 = 3;

/// Overwrite chunk size; bounds memory for large files while still covering
/// every byte each pass.
const CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Caveat surfaced to callers with every successful shred.
pub const WEAR_LEVELING_CAVEAT: &str =
    "overwrite-then-unlink does not defeat flash wear-leveling or copy-on-write snapshots";

/// Outcome of a completed shred.
#[derive(Debug, Clone)]
pub struct ShredReport {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub passes: u32,
    pub duration: Duration,
    /// Storage-semantics caveat; callers must surface this, not swallow it.
    pub caveat: &'static str,
}

/// Destroy a file: three full random overwrite passes, then unlink.
///
/// A zero-byte file skips the overwrite loop and unlinks directly. If the
/// unlink fails after a successful overwrite, the content is already
/// destroyed — the error is `Unlink` and the overwrite is never retried.
/// Synchronous and non-interruptible once started.
pub fn shred(path: &Path) -> Result<ShredReport> {
    let start = Instant::now();
    let meta = fs::metadata(path).map_err(|e| SentryError::io(path, e))?;
    if !meta.is_file() {
        return Err(SentryError::Runtime {
            details: format!("shred target is not a regular file: {}", path.display()),
        });
    }
    let size = meta.len();

    let passes_done = if size == 0 {
        0
    } else {
        let mut file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| SentryError::io(path, e))?;
        for _ in 0..PASSES {
            overwrite_pass(&mut file, size, path)?;
        }
        PASSES
    };

    fs::remove_file(path).map_err(|e| SentryError::Unlink {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    Ok(ShredReport {
        path: path.to_path_buf(),
        size_bytes: size,
        passes: passes_done,
        duration: start.elapsed(),
        caveat: WEAR_LEVELING_CAVEAT,
    })
}

/// One overwrite pass: rewind, fill every byte with fresh random data, sync.
fn overwrite_pass(file: &mut fs::File, size: u64, path: &Path) -> Result<()> {
    file.seek(SeekFrom::Start(0))
        .map_err(|e| SentryError::io(path, e))?;

    let mut rng = rand::rng();
    let mut chunk = vec![0u8; CHUNK_SIZE.min(usize::try_from(size).unwrap_or(CHUNK_SIZE))];
    let mut written: u64 = 0;

    while written < size {
        let remaining = size - written;
        let to_write = if remaining > chunk.len() as u64 {
            chunk.len()
        } else {
            usize::try_from(remaining).unwrap_or(chunk.len())
        };
        rng.fill_bytes(&mut chunk[..to_write]);
        file.write_all(&chunk[..to_write])
            .map_err(|e| SentryError::io(path, e))?;
        written += to_write as u64;
    }

    file.sync_all().map_err(|e| SentryError::io(path, e))?;
    Ok(())
}
