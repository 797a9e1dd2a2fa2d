//! File descriptors and risk levels produced by scanning and classification.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::paths::normalized_extension;

/// Heuristic threat level. Ordering is escalation order: a level, once raised,
/// is never lowered within one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Safe,
    Suspicious,
    Malicious,
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Suspicious => write!(f, "suspicious"),
            Self::Malicious => write!(f, "malicious"),
        }
    }
}

/// Heuristic privacy sensitivity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    Public,
    Sensitive,
    Critical,
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Sensitive => write!(f, "sensitive"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Coarse file type bucket derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Code,
    Archive,
    Executable,
    Application,
    Other,
}

impl FileCategory {
    /// Map a lowercased, dot-free extension to a category.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "svg" | "heic" | "tiff" => {
                Self::Image
            }
            "mp4" | "mkv" | "avi" | "mov" | "webm" | "wmv" | "flv" => Self::Video,
            "mp3" | "wav" | "flac" | "ogg" | "aac" | "m4a" => Self::Audio,
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "odt" | "ods" | "txt"
            | "md" | "rtf" | "csv" => Self::Document,
            "rs" | "py" | "js" | "ts" | "c" | "cpp" | "h" | "go" | "java" | "rb" | "sh" | "php"
            | "html" | "css" | "json" | "toml" | "yaml" | "yml" | "sql" => Self::Code,
            "zip" | "tar" | "gz" | "bz2" | "xz" | "7z" | "rar" | "zst" => Self::Archive,
            "exe" | "msi" | "bat" | "cmd" | "com" | "scr" | "pif" | "ps1" | "vbs" | "jar" => {
                Self::Executable
            }
            "app" | "dmg" | "deb" | "rpm" | "appimage" | "apk" | "pkg" => Self::Application,
            _ => Self::Other,
        }
    }
}

/// A classified descriptor of one filesystem entry.
///
/// Records live in the caller's in-memory working set; the core never
/// persists them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable identity derived from the absolute path (FNV-1a).
    pub id: u64,
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lowercased extension without the dot; empty when absent.
    pub extension: String,
    pub category: FileCategory,
    pub modified: DateTime<Utc>,
    /// Label of the monitored sector this record belongs to.
    pub sector: String,
    pub threat_level: ThreatLevel,
    pub privacy_level: PrivacyLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_type: Option<String>,
    pub tags: BTreeSet<String>,
}

impl FileRecord {
    /// Build an unclassified record for a path. `modified` defaults to the
    /// epoch when metadata is unavailable; scanners that already hold
    /// metadata should set it directly.
    #[must_use]
    pub fn new(path: &Path, size_bytes: u64, modified: DateTime<Utc>, sector: &str) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = normalized_extension(path);
        let category = FileCategory::from_extension(&extension);
        Self {
            id: stable_path_id(path),
            name,
            path: path.to_path_buf(),
            size_bytes,
            extension,
            category,
            modified,
            sector: sector.to_string(),
            threat_level: ThreatLevel::Safe,
            privacy_level: PrivacyLevel::Public,
            threat_type: None,
            tags: BTreeSet::new(),
        }
    }
}

/// Stable identity for a path: FNV-1a over the lossy UTF-8 path bytes.
///
/// Cross-process stable (no `DefaultHasher` whose seed may vary across Rust
/// releases).
#[must_use]
pub fn stable_path_id(path: &Path) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in path.to_string_lossy().as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_level_ordering_is_escalation_order() {
        assert!(ThreatLevel::Safe < ThreatLevel::Suspicious);
        assert!(ThreatLevel::Suspicious < ThreatLevel::Malicious);
    }

    #[test]
    fn privacy_level_ordering() {
        assert!(PrivacyLevel::Public < PrivacyLevel::Sensitive);
        assert!(PrivacyLevel::Sensitive < PrivacyLevel::Critical);
    }

    #[test]
    fn category_from_extension() {
        assert_eq!(FileCategory::from_extension("jpg"), FileCategory::Image);
        assert_eq!(FileCategory::from_extension("exe"), FileCategory::Executable);
        assert_eq!(FileCategory::from_extension("zip"), FileCategory::Archive);
        assert_eq!(FileCategory::from_extension("rs"), FileCategory::Code);
        assert_eq!(FileCategory::from_extension(""), FileCategory::Other);
        assert_eq!(FileCategory::from_extension("xyz"), FileCategory::Other);
    }

    #[test]
    fn record_derives_name_extension_category() {
        let rec = FileRecord::new(
            Path::new("/home/user/Downloads/Setup.EXE"),
            1024,
            Utc::now(),
            "downloads",
        );
        assert_eq!(rec.name, "Setup.EXE");
        assert_eq!(rec.extension, "exe");
        assert_eq!(rec.category, FileCategory::Executable);
        assert_eq!(rec.sector, "downloads");
        assert_eq!(rec.threat_level, ThreatLevel::Safe);
        assert_eq!(rec.privacy_level, PrivacyLevel::Public);
    }

    #[test]
    fn path_id_is_stable_and_distinct() {
        let a1 = stable_path_id(Path::new("/a/b/c.txt"));
        let a2 = stable_path_id(Path::new("/a/b/c.txt"));
        let b = stable_path_id(Path::new("/a/b/d.txt"));
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }
}
