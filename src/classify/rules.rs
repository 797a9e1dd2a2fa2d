//! Ordered classification rule tables.
//!
//! Each cascade is a data table evaluated top-to-bottom with first-match-wins
//! semantics; adding a rule never touches control flow. Threat rules carry
//! both the resulting level and the canonical threat-type label so a single
//! table drives `classify_threat` and `threat_type` with identical ordering.

#![allow(missing_docs)]

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::classify::record::{FileCategory, FileRecord, PrivacyLevel, ThreatLevel};
use crate::core::paths::any_segment_contains;

// ──────────────────── matchers ────────────────────

/// How one rule inspects a record.
#[derive(Debug)]
pub enum RuleMatcher {
    /// Regex against the lowercased file name.
    Name(Regex),
    /// Extension in a fixed set AND the lowercased full path matches a regex.
    ExtInLocation {
        exts: &'static [&'static str],
        location: Regex,
    },
    /// Extension in a fixed set AND some path component contains the needle.
    ExtAndSegment {
        exts: &'static [&'static str],
        segment: &'static str,
    },
    /// Extension in a fixed set, unconditionally.
    ExtSet(&'static [&'static str]),
    /// Extension in a fixed set AND the name matches a regex.
    ExtAndName {
        exts: &'static [&'static str],
        name: Regex,
    },
}

impl RuleMatcher {
    #[must_use]
    pub fn matches(&self, name: &str, extension: &str, path: &Path) -> bool {
        match self {
            Self::Name(re) => re.is_match(name),
            Self::ExtInLocation { exts, location } => {
                exts.contains(&extension)
                    && location.is_match(&path.to_string_lossy().to_ascii_lowercase())
            }
            Self::ExtAndSegment { exts, segment } => {
                exts.contains(&extension) && any_segment_contains(path, segment)
            }
            Self::ExtSet(exts) => exts.contains(&extension),
            Self::ExtAndName { exts, name: re } => exts.contains(&extension) && re.is_match(name),
        }
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in rule pattern must compile")
}

// ──────────────────── threat rules ────────────────────

/// One row of the threat cascade.
#[derive(Debug)]
pub struct ThreatRule {
    pub name: &'static str,
    pub level: ThreatLevel,
    pub threat_type: &'static str,
    pub matcher: RuleMatcher,
}

/// Extensions considered risky when fetched into a download location.
pub const RISKY_EXECUTABLE_EXTS: &[&str] = &[
    "exe", "scr", "bat", "cmd", "com", "pif", "vbs", "js", "jar", "msi", "ps1",
];

/// Threat cascade, strict priority order: malicious family names, then
/// location-suspicious executables, then suspicious name shapes, then risky
/// executables under download paths.
pub static THREAT_RULES: LazyLock<Vec<ThreatRule>> = LazyLock::new(|| {
    vec![
        ThreatRule {
            name: "malicious-family",
            level: ThreatLevel::Malicious,
            threat_type: "Malware:Generic/Suspicious",
            matcher: RuleMatcher::Name(re(
                r"wannacry|petya|locky|cryptolocker|ransom|keylog|spyware|trojan|botnet|mimikatz|emotet|stealer|rootkit",
            )),
        },
        ThreatRule {
            name: "exe-suspicious-location",
            level: ThreatLevel::Suspicious,
            threat_type: "Suspicious:Location/Executable",
            matcher: RuleMatcher::ExtInLocation {
                exts: &["exe"],
                location: re(r"[/\\]te?mp[/\\]|programdata|appdata[/\\]local[/\\]temp|[/\\]public[/\\]"),
            },
        },
        ThreatRule {
            name: "piracy-tool",
            level: ThreatLevel::Suspicious,
            threat_type: "PUP:Win32/Keygen",
            matcher: RuleMatcher::Name(re(r"crack|keygen|activator|patcher|hacktool|warez")),
        },
        ThreatRule {
            name: "double-extension",
            level: ThreatLevel::Suspicious,
            threat_type: "Trojan:Generic/DoubleExt",
            matcher: RuleMatcher::Name(re(
                r"\.(pdf|docx?|xlsx?|jpe?g|png|txt)\.(exe|scr|bat|cmd|com)$",
            )),
        },
        ThreatRule {
            name: "dangerous-extension",
            level: ThreatLevel::Suspicious,
            threat_type: "Suspicious:Ext/Dangerous",
            matcher: RuleMatcher::Name(re(r"\.(scr|pif|vbs)$")),
        },
        ThreatRule {
            name: "temp-executable",
            level: ThreatLevel::Suspicious,
            threat_type: "Suspicious:Temp/Executable",
            matcher: RuleMatcher::Name(re(r"^(~|tmp|temp).*\.(exe|scr|bat|com)$")),
        },
        ThreatRule {
            name: "risky-download",
            level: ThreatLevel::Suspicious,
            threat_type: "Suspicious:Download/Executable",
            matcher: RuleMatcher::ExtAndSegment {
                exts: RISKY_EXECUTABLE_EXTS,
                segment: "download",
            },
        },
    ]
});

// ──────────────────── privacy rules ────────────────────

#[derive(Debug)]
pub struct PrivacyRule {
    pub name: &'static str,
    pub level: PrivacyLevel,
    pub matcher: RuleMatcher,
}

/// Key and certificate material is critical regardless of name.
pub const KEY_MATERIAL_EXTS: &[&str] = &[
    "pem", "key", "p12", "pfx", "ppk", "der", "crt", "csr", "kdbx", "jks", "asc", "gpg",
];

const OFFICE_DOC_EXTS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "csv", "odt", "ods", "txt",
];

/// Privacy cascade: credential/key/financial-identifier names, key material
/// extensions, then broader personal-document signals.
pub static PRIVACY_RULES: LazyLock<Vec<PrivacyRule>> = LazyLock::new(|| {
    vec![
        PrivacyRule {
            name: "credential-name",
            level: PrivacyLevel::Critical,
            matcher: RuleMatcher::Name(re(
                r"password|passwd|credential|secret|token|api[_-]?key|private[_-]?key|id_rsa|id_ed25519|id_ecdsa|wallet|seed[_-]?phrase|mnemonic|recovery[_-]?codes?|ssn|social[_-]?security",
            )),
        },
        PrivacyRule {
            name: "key-material-ext",
            level: PrivacyLevel::Critical,
            matcher: RuleMatcher::ExtSet(KEY_MATERIAL_EXTS),
        },
        PrivacyRule {
            name: "sensitive-name",
            level: PrivacyLevel::Sensitive,
            matcher: RuleMatcher::Name(re(
                r"medical|diagnosis|prescription|legal|contract|lawsuit|payroll|salary|resume|passport|licen[cs]e|insurance|backup|\bbank",
            )),
        },
        PrivacyRule {
            name: "financial-document",
            level: PrivacyLevel::Sensitive,
            matcher: RuleMatcher::ExtAndName {
                exts: OFFICE_DOC_EXTS,
                name: re(r"tax|invoice|statement|financ|w-?2\b|1099|receipt|budget"),
            },
        },
    ]
});

// ──────────────────── tag rules ────────────────────

/// How one tag rule inspects a record.
#[derive(Debug)]
pub enum TagMatcher {
    MinSizeBytes(u64),
    Name(Regex),
    Category(FileCategory),
}

#[derive(Debug)]
pub struct TagRule {
    pub tag: &'static str,
    pub matcher: TagMatcher,
}

/// Additive tag table. Order-independent; each rule contributes one distinct
/// literal, so duplicates are impossible.
pub static TAG_RULES: LazyLock<Vec<TagRule>> = LazyLock::new(|| {
    vec![
        TagRule {
            tag: "large-file",
            matcher: TagMatcher::MinSizeBytes(100 * 1024 * 1024),
        },
        TagRule {
            tag: "huge-file",
            matcher: TagMatcher::MinSizeBytes(1000 * 1024 * 1024),
        },
        TagRule {
            tag: "credentials",
            matcher: TagMatcher::Name(re(r"password|credential|token|secret|keyring")),
        },
        TagRule {
            tag: "financial",
            matcher: TagMatcher::Name(re(r"tax|invoice|\bbank|financ|statement")),
        },
        TagRule {
            tag: "screenshot",
            matcher: TagMatcher::Name(re(r"screen[ _-]?shot|screencap")),
        },
        TagRule {
            tag: "backup",
            matcher: TagMatcher::Name(re(r"backup|\.bak$|\.old$")),
        },
        TagRule {
            tag: "executable",
            matcher: TagMatcher::Category(FileCategory::Executable),
        },
        TagRule {
            tag: "archive",
            matcher: TagMatcher::Category(FileCategory::Archive),
        },
        TagRule {
            tag: "piracy-tool",
            matcher: TagMatcher::Name(re(r"crack|keygen|activator|patcher")),
        },
        TagRule {
            tag: "double-extension",
            matcher: TagMatcher::Name(re(
                r"\.(pdf|docx?|xlsx?|jpe?g|png|txt)\.(exe|scr|bat|cmd|com)$",
            )),
        },
    ]
});

impl TagRule {
    #[must_use]
    pub fn matches(&self, record: &FileRecord, lowercase_name: &str) -> bool {
        match &self.matcher {
            TagMatcher::MinSizeBytes(min) => record.size_bytes > *min,
            TagMatcher::Name(re) => re.is_match(lowercase_name),
            TagMatcher::Category(cat) => record.category == *cat,
        }
    }
}
