//! Forensic scanner scenarios driven through the engine facade.

use std::fs;

use disk_sentry::core::config::Config;
use disk_sentry::prelude::*;
use tempfile::TempDir;

fn engine_in(tmp: &TempDir) -> TriageEngine {
    let mut config = Config::default();
    config.holding.quarantine_dir = tmp.path().join("q");
    config.holding.vault_dir = tmp.path().join("v");
    config.paths.jsonl_log = tmp.path().join("activity.jsonl");
    config.paths.snooze_file = tmp.path().join("snooze.json");
    TriageEngine::new(config).unwrap()
}

#[test]
fn jpeg_with_trailing_payload_is_flagged_malicious() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_in(&tmp);

    let path = tmp.path().join("vacation.jpg");
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&[0x33; 128]);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes.extend_from_slice(b"smuggled-archive-goes-here!!!!!!!"); // 33 bytes
    fs::write(&path, &bytes).unwrap();

    let report = engine.deep_scan(&path).unwrap();
    assert_eq!(report.threat_level, ThreatLevel::Malicious);
    assert!(
        report
            .findings
            .iter()
            .any(|f| f.contains("33 trailing bytes")),
        "findings: {:?}",
        report.findings
    );
}

#[test]
fn random_looking_blob_is_suspicious_by_entropy() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_in(&tmp);

    // A full uniform byte spread pushes entropy to 8.0.
    let path = tmp.path().join("blob.bin");
    let bytes: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    fs::write(&path, &bytes).unwrap();

    let report = engine.deep_scan(&path).unwrap();
    assert_eq!(report.threat_level, ThreatLevel::Suspicious);
    assert!((report.entropy - 8.0).abs() < 0.01);
    assert!(report.findings.iter().any(|f| f.contains("Entropy")));
}

#[test]
fn oversized_file_is_refused() {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.holding.quarantine_dir = tmp.path().join("q");
    config.holding.vault_dir = tmp.path().join("v");
    config.paths.jsonl_log = tmp.path().join("activity.jsonl");
    config.paths.snooze_file = tmp.path().join("snooze.json");
    config.forensics.max_scan_bytes = 1024;
    let engine = TriageEngine::new(config).unwrap();

    let path = tmp.path().join("too-big.bin");
    fs::write(&path, vec![0u8; 2048]).unwrap();

    let err = engine.deep_scan(&path).unwrap_err();
    assert_eq!(err.code(), "DS-4101");
    assert!(err.to_string().contains("2048"));
}

#[test]
fn report_is_per_invocation_not_persisted() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_in(&tmp);

    let path = tmp.path().join("doc.txt");
    fs::write(&path, b"plain words only").unwrap();

    let first = engine.deep_scan(&path).unwrap();
    assert_eq!(first.threat_level, ThreatLevel::Safe);

    // Mutate the file; a fresh scan sees the new content.
    fs::write(&path, b"run powershell -enc AAAA").unwrap();
    let second = engine.deep_scan(&path).unwrap();
    assert_eq!(second.threat_level, ThreatLevel::Malicious);
}
