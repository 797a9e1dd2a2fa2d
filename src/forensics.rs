//! Forensic scanner: bounded byte-level inspection for entropy anomalies,
//! trailing embedded data, and suspicious text markers.
//!
//! Unlike the streaming hasher, a deep scan loads the whole file: trailer
//! detection needs the *last* marker occurrence and the text pass needs the
//! full buffer, so random access is genuinely required. The size cap keeps
//! that bounded by policy.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use memchr::memmem;
use serde::{Deserialize, Serialize};

use crate::classify::record::ThreatLevel;
use crate::core::errors::{Result, SentryError};
use crate::core::paths::normalized_extension;

/// Entropy above this is abnormal for anything but compressed/encrypted data.
const HIGH_ENTROPY_THRESHOLD: f64 = 7.5;

/// JPEG end-of-image marker.
const JPEG_EOI: &[u8] = &[0xFF, 0xD9];

/// PNG IEND chunk tag. The tag is followed by a 4-byte CRC, plus small
/// allowance for padding — more than 8 trailing bytes means embedded data.
const PNG_IEND: &[u8] = b"IEND";
const PNG_TRAILER_ALLOWANCE: usize = 8;

/// Text markers that have no business inside media or document files.
const SUSPICIOUS_MARKERS: &[&str] = &[
    "/bin/sh",
    "/bin/bash",
    "powershell",
    "cmd.exe",
    "http://",
    "https://",
    "ftp://",
    "/tmp/",
    "%temp%",
    "eval(",
    "exec(",
    "system(",
    "shellexecute",
    "base64,",
    "frombase64string",
];

/// Result of one deep scan. Created per invocation; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForensicReport {
    pub path: PathBuf,
    /// Ordered findings, in detection order.
    pub findings: Vec<String>,
    pub threat_level: ThreatLevel,
    /// Shannon entropy over the byte histogram, rounded to 2 decimals.
    pub entropy: f64,
    pub timestamp: DateTime<Utc>,
}

/// Inspect a file's bytes for signs of embedded or disguised content.
///
/// Rejects files over `max_bytes` with `TooLarge`. The threat level only
/// ever escalates within one scan (`malicious > suspicious > safe`).
pub fn deep_scan(path: &Path, max_bytes: u64) -> Result<ForensicReport> {
    let meta = fs::metadata(path).map_err(|e| SentryError::io(path, e))?;
    if meta.len() > max_bytes {
        return Err(SentryError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            cap: max_bytes,
        });
    }

    let bytes = fs::read(path).map_err(|e| SentryError::io(path, e))?;
    let extension = normalized_extension(path);

    let mut findings = Vec::new();
    let mut level = ThreatLevel::Safe;

    // 1. Entropy.
    let entropy = shannon_entropy(&bytes);
    if entropy > HIGH_ENTROPY_THRESHOLD {
        findings.push(format!("Abnormal High Entropy ({entropy:.2} bits/byte)"));
        level = level.max(ThreatLevel::Suspicious);
    }

    // 2. JPEG trailer.
    if extension == "jpg" || extension == "jpeg" {
        if let Some(pos) = memmem::rfind(&bytes, JPEG_EOI) {
            let trailing = bytes.len() - (pos + JPEG_EOI.len());
            if trailing > 0 {
                findings.push(format!(
                    "Embedded data after JPEG end-of-image marker: {trailing} trailing bytes"
                ));
                level = level.max(ThreatLevel::Malicious);
            }
        }
    }

    // 3. PNG trailer.
    if extension == "png" {
        if let Some(pos) = memmem::rfind(&bytes, PNG_IEND) {
            let trailing = bytes.len() - (pos + PNG_IEND.len());
            if trailing > PNG_TRAILER_ALLOWANCE {
                findings.push(format!(
                    "Embedded data after PNG IEND chunk: {trailing} trailing bytes"
                ));
                level = level.max(ThreatLevel::Malicious);
            }
        }
    }

    // 4. Suspicious text markers.
    let text = String::from_utf8_lossy(&bytes).to_ascii_lowercase();
    for marker in SUSPICIOUS_MARKERS {
        if text.contains(marker) {
            findings.push(format!("Suspicious marker in content: {marker}"));
            level = level.max(ThreatLevel::Malicious);
        }
    }

    Ok(ForensicReport {
        path: path.to_path_buf(),
        findings,
        threat_level: level,
        entropy: round2(entropy),
        timestamp: Utc::now(),
    })
}

/// Shannon entropy over the byte-value histogram, in bits per byte.
///
/// 0 for an empty or single-valued buffer; approaches 8 when all 256 values
/// are equally represented.
#[must_use]
pub fn shannon_entropy(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }

    let mut histogram = [0u64; 256];
    for b in bytes {
        histogram[usize::from(*b)] += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = bytes.len() as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
