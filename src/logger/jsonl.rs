//! JSONL activity logger: append-only line-delimited JSON audit trail.
//!
//! Each line is a self-contained JSON object, assembled in memory and written
//! with a single `write_all` so tailing processes never observe partial
//! lines.
//!
//! Three-level fallback chain:
//! 1. Primary file path
//! 2. stderr with `[DS-LOG]` prefix
//! 3. Silent discard (the engine must never fail because logging did)

#![allow(missing_docs)]

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Severity attached to each activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Activity events covering every externally-visible engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ActivityEvent {
    ScanCompleted {
        files: usize,
        sectors: usize,
        duration_ms: u64,
    },
    FileQuarantined {
        path: String,
        digest: String,
        reason: String,
    },
    FileVaulted {
        path: String,
        digest: String,
        reason: String,
    },
    FileRestored {
        path: String,
        kind: String,
    },
    FileShredded {
        path: String,
        size_bytes: u64,
        passes: u32,
    },
    DeepScanCompleted {
        path: String,
        threat_level: String,
        findings: usize,
    },
    FilesOrganized {
        moved: usize,
        skipped: usize,
    },
    NotificationEmitted {
        id: u64,
        notification_type: String,
    },
    NotificationDropped {
        id: u64,
        notification_type: String,
    },
    SentryTick {
        files: usize,
        screenshots: usize,
        unorganized_downloads: usize,
    },
    EngineError {
        code: String,
        message: String,
    },
}

impl ActivityEvent {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ScanCompleted { .. }
            | Self::FileVaulted { .. }
            | Self::FileRestored { .. }
            | Self::DeepScanCompleted { .. }
            | Self::FilesOrganized { .. }
            | Self::SentryTick { .. } => Severity::Info,
            Self::FileQuarantined { .. }
            | Self::NotificationEmitted { .. }
            | Self::NotificationDropped { .. } => Severity::Warning,
            Self::FileShredded { .. } | Self::EngineError { .. } => Severity::Critical,
        }
    }
}

/// One serialized log line.
#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    ts: String,
    severity: Severity,
    #[serde(flatten)]
    event: ActivityEvent,
}

/// Append-only JSONL writer with graceful degradation.
pub struct JsonlLogger {
    path: PathBuf,
}

impl JsonlLogger {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one event. Never fails: on write failure the line goes to
    /// stderr, and if even serialization fails the event is discarded.
    pub fn log(&self, event: &ActivityEvent) {
        let entry = LogEntry {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            severity: event.severity(),
            event: event.clone(),
        };
        let Ok(line) = serde_json::to_string(&entry) else {
            return;
        };

        if self.append_line(&line).is_err() {
            eprintln!("[DS-LOG] {line}");
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn log_appends_valid_json_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("activity.jsonl");
        let logger = JsonlLogger::new(path.clone());

        logger.log(&ActivityEvent::ScanCompleted {
            files: 10,
            sectors: 2,
            duration_ms: 42,
        });
        logger.log(&ActivityEvent::FileShredded {
            path: "/tmp/x".to_string(),
            size_bytes: 100,
            passes: 3,
        });

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("ts").is_some());
            assert!(parsed.get("severity").is_some());
            assert!(parsed.get("event").is_some());
        }
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "file_shredded");
        assert_eq!(second["severity"], "critical");
    }

    #[test]
    fn log_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("dir").join("activity.jsonl");
        let logger = JsonlLogger::new(path.clone());
        logger.log(&ActivityEvent::EngineError {
            code: "DS-TEST".to_string(),
            message: "test".to_string(),
        });
        assert!(path.exists());
    }

    #[test]
    fn severities_match_event_weight() {
        assert_eq!(
            ActivityEvent::SentryTick {
                files: 0,
                screenshots: 0,
                unorganized_downloads: 0
            }
            .severity(),
            Severity::Info
        );
        assert_eq!(
            ActivityEvent::NotificationDropped {
                id: 1,
                notification_type: "storage".to_string()
            }
            .severity(),
            Severity::Warning
        );
        assert_eq!(
            ActivityEvent::FileShredded {
                path: String::new(),
                size_bytes: 0,
                passes: 3
            }
            .severity(),
            Severity::Critical
        );
    }

    #[test]
    fn unwritable_path_degrades_without_panicking() {
        // Root-owned location: append fails, line falls back to stderr.
        let logger = JsonlLogger::new(PathBuf::from("/proc/disk-sentry-test/activity.jsonl"));
        logger.log(&ActivityEvent::ScanCompleted {
            files: 1,
            sectors: 1,
            duration_ms: 1,
        });
    }
}
