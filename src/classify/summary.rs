//! Working-set aggregation into an integrity score and status.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::classify::record::{FileRecord, PrivacyLevel, ThreatLevel};

/// Overall posture derived from the worst classifications present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Protected,
    Warning,
    Alert,
}

/// Aggregate health report over a classified working set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegritySummary {
    pub total_files: usize,
    pub malicious_count: usize,
    pub suspicious_count: usize,
    pub critical_privacy_count: usize,
    pub sensitive_privacy_count: usize,
    /// 0–100 health metric; penalties weighted by severity.
    pub integrity_score: u8,
    pub status: SummaryStatus,
}

const MALICIOUS_PENALTY: i64 = 25;
const SUSPICIOUS_PENALTY: i64 = 5;
const CRITICAL_PRIVACY_PENALTY: i64 = 10;
const SENSITIVE_PRIVACY_PENALTY: i64 = 2;

/// Summarize a classified file set.
#[must_use]
pub fn summarize(files: &[FileRecord]) -> IntegritySummary {
    let malicious_count = files
        .iter()
        .filter(|f| f.threat_level == ThreatLevel::Malicious)
        .count();
    let suspicious_count = files
        .iter()
        .filter(|f| f.threat_level == ThreatLevel::Suspicious)
        .count();
    let critical_privacy_count = files
        .iter()
        .filter(|f| f.privacy_level == PrivacyLevel::Critical)
        .count();
    let sensitive_privacy_count = files
        .iter()
        .filter(|f| f.privacy_level == PrivacyLevel::Sensitive)
        .count();

    let raw = 100
        - MALICIOUS_PENALTY * malicious_count as i64
        - SUSPICIOUS_PENALTY * suspicious_count as i64
        - CRITICAL_PRIVACY_PENALTY * critical_privacy_count as i64
        - SENSITIVE_PRIVACY_PENALTY * sensitive_privacy_count as i64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let integrity_score = raw.clamp(0, 100) as u8;

    let status = if malicious_count > 0 {
        SummaryStatus::Alert
    } else if suspicious_count > 0 {
        SummaryStatus::Warning
    } else {
        SummaryStatus::Protected
    };

    IntegritySummary {
        total_files: files.len(),
        malicious_count,
        suspicious_count,
        critical_privacy_count,
        sensitive_privacy_count,
        integrity_score,
        status,
    }
}
