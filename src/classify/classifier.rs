//! First-match-wins classification cascades over the rule tables.

use std::collections::BTreeSet;

use crate::classify::record::{FileRecord, PrivacyLevel, ThreatLevel};
use crate::classify::rules::{PRIVACY_RULES, TAG_RULES, THREAT_RULES};

/// Evaluate the threat cascade. First matching rule wins; no two levels are
/// ever merged.
#[must_use]
pub fn classify_threat(record: &FileRecord) -> ThreatLevel {
    let name = record.name.to_ascii_lowercase();
    THREAT_RULES
        .iter()
        .find(|rule| rule.matcher.matches(&name, &record.extension, &record.path))
        .map_or(ThreatLevel::Safe, |rule| rule.level)
}

/// Evaluate the privacy cascade.
#[must_use]
pub fn classify_privacy(record: &FileRecord) -> PrivacyLevel {
    let name = record.name.to_ascii_lowercase();
    PRIVACY_RULES
        .iter()
        .find(|rule| rule.matcher.matches(&name, &record.extension, &record.path))
        .map_or(PrivacyLevel::Public, |rule| rule.level)
}

/// Canonical threat-type label for human-facing reporting.
///
/// Walks the same ordered table as [`classify_threat`], so the label always
/// names the rule that decided the level. Never used for control flow.
#[must_use]
pub fn threat_type(record: &FileRecord) -> Option<String> {
    let name = record.name.to_ascii_lowercase();
    THREAT_RULES
        .iter()
        .find(|rule| rule.matcher.matches(&name, &record.extension, &record.path))
        .map(|rule| rule.threat_type.to_string())
}

/// Additive tag set. Order-independent; each rule contributes one distinct
/// literal.
#[must_use]
pub fn tags(record: &FileRecord) -> BTreeSet<String> {
    let name = record.name.to_ascii_lowercase();
    TAG_RULES
        .iter()
        .filter(|rule| rule.matches(record, &name))
        .map(|rule| rule.tag.to_string())
        .collect()
}

/// Run all cascades and write the results back into the record.
pub fn classify(record: &mut FileRecord) {
    record.threat_level = classify_threat(record);
    record.privacy_level = classify_privacy(record);
    record.threat_type = threat_type(record);
    record.tags = tags(record);
}
