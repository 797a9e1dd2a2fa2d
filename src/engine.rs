//! Triage engine facade: the operations the external command layer drives.
//!
//! Every disposition operation (quarantine, vault, restore, shred, organize)
//! runs under a per-path lock, giving single-writer-per-path discipline: a
//! user command and a sentry rescan can overlap freely, but two mutations of
//! the same path cannot.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::bounded;
use parking_lot::Mutex;

use crate::classify::classifier;
use crate::classify::record::{FileCategory, FileRecord};
use crate::classify::summary::{IntegritySummary, summarize};
use crate::core::config::Config;
use crate::core::errors::{Result, SentryError};
use crate::core::paths::resolve_absolute_path;
use crate::disposition::shred::{ShredReport, shred};
use crate::disposition::store::{DispositionKind, DispositionRecord, DispositionStore, move_file};
use crate::forensics::{ForensicReport, deep_scan};
use crate::logger::jsonl::{ActivityEvent, JsonlLogger};
use crate::scan::walker::{SectorWalker, WalkerConfig, system_time_to_utc};
use crate::sentry::alerts::{AlertSink, spawn_alert_thread};
use crate::sentry::outbox::{Notification, NotificationAction, Outbox};
use crate::sentry::scheduler::{SentryContext, SentryHandle, SentryScheduler};
use crate::sentry::snooze::{FileSnoozeStore, SharedSnooze, SnoozeStore};

/// Capacity of the channel between the scheduler and the alert thread.
const ALERT_CHANNEL_CAP: usize = 16;

// ──────────────────── path locks ────────────────────

/// Per-path mutex registry serializing disposition operations.
struct PathLockRegistry {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLockRegistry {
    fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Lock handle for a normalized path. Handles are never evicted during a
    /// session; the registry is bounded by the number of distinct paths the
    /// engine ever mutates.
    fn handle(&self, path: &Path) -> Arc<Mutex<()>> {
        let normalized = resolve_absolute_path(path);
        Arc::clone(
            self.locks
                .lock()
                .entry(normalized)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

// ──────────────────── organize ────────────────────

/// Outcome of an `organize` pass.
#[derive(Debug, Clone, Default)]
pub struct OrganizeReport {
    pub moved: Vec<(PathBuf, PathBuf)>,
    /// Files that vanished or could not be moved; skipped, not fatal.
    pub skipped: usize,
}

const fn category_dir_name(category: FileCategory) -> &'static str {
    match category {
        FileCategory::Image => "Images",
        FileCategory::Video => "Videos",
        FileCategory::Audio => "Audio",
        FileCategory::Document => "Documents",
        FileCategory::Code => "Code",
        FileCategory::Archive => "Archives",
        FileCategory::Executable => "Executables",
        FileCategory::Application => "Applications",
        FileCategory::Other => "Other",
    }
}

// ──────────────────── engine ────────────────────

/// The triage engine. Owns the disposition store, the activity log, the
/// notification outbox, and the shared snooze state.
pub struct TriageEngine {
    config: Config,
    store: DispositionStore,
    locks: PathLockRegistry,
    logger: Arc<JsonlLogger>,
    outbox: Arc<Mutex<Outbox>>,
    snooze: SharedSnooze,
}

impl TriageEngine {
    /// Build an engine from configuration.
    ///
    /// Fatal when a holding directory cannot be created or written — this is
    /// the one startup check that aborts instead of degrading.
    pub fn new(config: Config) -> Result<Self> {
        config.ensure_holding_dirs()?;
        let store = DispositionStore::new(
            config.holding.quarantine_dir.clone(),
            config.holding.vault_dir.clone(),
        )?;
        let logger = Arc::new(JsonlLogger::new(config.paths.jsonl_log.clone()));
        let snooze = SharedSnooze::new(Box::new(FileSnoozeStore::new(
            config.paths.snooze_file.clone(),
        )));
        Ok(Self {
            config,
            store,
            locks: PathLockRegistry::new(),
            logger,
            outbox: Arc::new(Mutex::new(Outbox::default())),
            snooze,
        })
    }

    /// Replace the snooze store (e.g. with an in-memory one for embedding).
    #[must_use]
    pub fn with_snooze_store(mut self, store: Box<dyn SnoozeStore>) -> Self {
        self.snooze = SharedSnooze::new(store);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ──────────────────── scanning ────────────────────

    /// Walk every monitored sector and classify the results.
    pub fn scan_all(&self) -> Result<Vec<FileRecord>> {
        let start = Instant::now();
        let walker = SectorWalker::new(WalkerConfig::from_scanner(&self.config.scanner));
        let mut records = walker.walk()?;
        for record in &mut records {
            classifier::classify(record);
        }
        #[allow(clippy::cast_possible_truncation)]
        self.logger.log(&ActivityEvent::ScanCompleted {
            files: records.len(),
            sectors: self.config.scanner.sectors.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        });
        Ok(records)
    }

    /// Build and classify a record for a single path.
    ///
    /// The sector label is the containing monitored sector when there is
    /// one, otherwise `"unmanaged"`.
    pub fn scan_one(&self, path: &Path) -> Result<FileRecord> {
        let meta = fs::metadata(path).map_err(|e| SentryError::io(path, e))?;
        if !meta.is_file() {
            return Err(SentryError::Scan {
                path: path.to_path_buf(),
                details: "not a regular file".to_string(),
            });
        }
        let resolved = resolve_absolute_path(path);
        let sector = self
            .config
            .scanner
            .sectors
            .iter()
            .find(|s| resolved.starts_with(resolve_absolute_path(&s.path)))
            .map_or("unmanaged", |s| s.label.as_str());

        let modified = system_time_to_utc(meta.modified().unwrap_or(std::time::UNIX_EPOCH));
        let mut record = FileRecord::new(&resolved, meta.len(), modified, sector);
        classifier::classify(&mut record);
        Ok(record)
    }

    /// Classify a caller-held record in place.
    pub fn classify(&self, record: &mut FileRecord) {
        classifier::classify(record);
    }

    /// Aggregate a classified working set.
    #[must_use]
    pub fn summarize(&self, files: &[FileRecord]) -> IntegritySummary {
        summarize(files)
    }

    // ──────────────────── dispositions ────────────────────

    /// Quarantine a file (reversible isolation of suspected-malicious content).
    pub fn quarantine(&self, path: &Path, reason: &str) -> Result<DispositionRecord> {
        self.place(path, reason, DispositionKind::Quarantine)
    }

    /// Vault a file (reversible isolation of sensitive content).
    pub fn vault(&self, path: &Path, reason: &str) -> Result<DispositionRecord> {
        self.place(path, reason, DispositionKind::Vault)
    }

    fn place(&self, path: &Path, reason: &str, kind: DispositionKind) -> Result<DispositionRecord> {
        let lock = self.locks.handle(path);
        let _guard = lock.lock();

        let record = self.store.place(path, reason, kind)?;
        let event = match kind {
            DispositionKind::Quarantine => ActivityEvent::FileQuarantined {
                path: path.display().to_string(),
                digest: record.digest.clone(),
                reason: reason.to_string(),
            },
            DispositionKind::Vault => ActivityEvent::FileVaulted {
                path: path.display().to_string(),
                digest: record.digest.clone(),
                reason: reason.to_string(),
            },
        };
        self.logger.log(&event);
        Ok(record)
    }

    /// Restore a quarantined file to its original path.
    pub fn restore_quarantine(&self, id: u64) -> Result<PathBuf> {
        self.restore(id, DispositionKind::Quarantine)
    }

    /// Restore a vaulted file to its original path.
    pub fn restore_vault(&self, id: u64) -> Result<PathBuf> {
        self.restore(id, DispositionKind::Vault)
    }

    fn restore(&self, id: u64, kind: DispositionKind) -> Result<PathBuf> {
        let restored = self.store.restore(id, kind)?;
        self.logger.log(&ActivityEvent::FileRestored {
            path: restored.display().to_string(),
            kind: kind.suffix().to_string(),
        });
        Ok(restored)
    }

    /// List quarantine entries.
    pub fn list_quarantine(&self) -> Result<Vec<DispositionRecord>> {
        self.store.list(DispositionKind::Quarantine)
    }

    /// List vault entries.
    pub fn list_vault(&self) -> Result<Vec<DispositionRecord>> {
        self.store.list(DispositionKind::Vault)
    }

    /// Destroy a file irreversibly. No disposition record is created — there
    /// is nothing to restore.
    pub fn shred(&self, path: &Path) -> Result<ShredReport> {
        let lock = self.locks.handle(path);
        let _guard = lock.lock();

        let report = shred(path)?;
        self.logger.log(&ActivityEvent::FileShredded {
            path: report.path.display().to_string(),
            size_bytes: report.size_bytes,
            passes: report.passes,
        });
        Ok(report)
    }

    /// Byte-level forensic inspection, bounded by the configured size cap.
    pub fn deep_scan(&self, path: &Path) -> Result<ForensicReport> {
        let report = deep_scan(path, self.config.forensics.max_scan_bytes)?;
        self.logger.log(&ActivityEvent::DeepScanCompleted {
            path: report.path.display().to_string(),
            threat_level: report.threat_level.to_string(),
            findings: report.findings.len(),
        });
        Ok(report)
    }

    // ──────────────────── organize ────────────────────

    /// Move files into per-category subdirectories of their parent.
    ///
    /// `category` forces one bucket for all paths; otherwise each file's
    /// extension decides. Vanished files are skipped, never fatal.
    pub fn organize(
        &self,
        paths: &[PathBuf],
        category: Option<FileCategory>,
    ) -> Result<OrganizeReport> {
        let mut report = OrganizeReport::default();

        for path in paths {
            let lock = self.locks.handle(path);
            let _guard = lock.lock();

            if !path.is_file() {
                report.skipped += 1;
                continue;
            }
            let Some(parent) = path.parent() else {
                report.skipped += 1;
                continue;
            };
            let Some(name) = path.file_name() else {
                report.skipped += 1;
                continue;
            };

            let bucket = category.unwrap_or_else(|| {
                FileCategory::from_extension(&crate::core::paths::normalized_extension(path))
            });
            let dest_dir = parent.join(category_dir_name(bucket));
            if let Err(err) = fs::create_dir_all(&dest_dir) {
                self.logger.log(&ActivityEvent::EngineError {
                    code: "DS-3002".to_string(),
                    message: format!("organize mkdir failed: {err}"),
                });
                report.skipped += 1;
                continue;
            }

            let dest = dest_dir.join(name);
            if dest.exists() {
                // Never clobber an already-organized file.
                report.skipped += 1;
                continue;
            }
            match move_file(path, &dest) {
                Ok(()) => report.moved.push((path.clone(), dest)),
                Err(_) => report.skipped += 1,
            }
        }

        self.logger.log(&ActivityEvent::FilesOrganized {
            moved: report.moved.len(),
            skipped: report.skipped,
        });
        Ok(report)
    }

    // ──────────────────── sentry integration ────────────────────

    /// Start the background sentry scheduler.
    ///
    /// When native alerting is enabled and a sink is provided, notifications
    /// flow through a bounded channel to a dedicated alert thread.
    #[must_use]
    pub fn start_sentry(&self, sink: Option<Box<dyn AlertSink>>) -> SentryHandle {
        let alert_tx = if self.config.alerts.native_alerts {
            sink.map(|sink| {
                let (tx, rx) = bounded::<Notification>(ALERT_CHANNEL_CAP);
                let _ = spawn_alert_thread(rx, sink);
                tx
            })
        } else {
            None
        };

        let ctx = SentryContext {
            config: self.config.sentry.clone(),
            walker: WalkerConfig::from_scanner(&self.config.scanner),
            snooze: self.snooze.clone(),
            outbox: Arc::clone(&self.outbox),
            logger: Arc::clone(&self.logger),
            alert_tx,
        };
        SentryScheduler::spawn(ctx)
    }

    /// Current outbox contents, oldest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.outbox.lock().entries().to_vec()
    }

    /// Dismiss a notification. Snoozes its type (explicit snooze).
    pub fn dismiss_notification(&self, id: u64) -> Result<()> {
        let removed = self.outbox.lock().remove(id);
        match removed {
            Some(notification) => self.snooze.mark(notification.notification_type),
            None => Err(SentryError::Runtime {
                details: format!("no notification with id {id}"),
            }),
        }
    }

    /// Take a notification's action for execution by the caller. Snoozes its
    /// type (implicit snooze via acting on the suggestion).
    pub fn take_notification_action(&self, id: u64) -> Result<Option<NotificationAction>> {
        let removed = self.outbox.lock().remove(id);
        match removed {
            Some(notification) => {
                self.snooze.mark(notification.notification_type)?;
                Ok(notification.action)
            }
            None => Err(SentryError::Runtime {
                details: format!("no notification with id {id}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::record::{PrivacyLevel, ThreatLevel};
    use crate::core::config::{SectorConfig, SectorRole};
    use crate::sentry::snooze::MemorySnoozeStore;
    use tempfile::TempDir;

    fn engine(tmp: &TempDir) -> TriageEngine {
        let sector_path = tmp.path().join("watched");
        fs::create_dir_all(&sector_path).unwrap();

        let mut config = Config::default();
        config.scanner.sectors = vec![SectorConfig {
            label: "watched".to_string(),
            path: sector_path,
            role: SectorRole::General,
        }];
        config.holding.quarantine_dir = tmp.path().join("holding").join("quarantine");
        config.holding.vault_dir = tmp.path().join("holding").join("vault");
        config.paths.jsonl_log = tmp.path().join("activity.jsonl");
        config.paths.snooze_file = tmp.path().join("snooze.json");

        TriageEngine::new(config)
            .unwrap()
            .with_snooze_store(Box::new(MemorySnoozeStore::default()))
    }

    #[test]
    fn scan_all_classifies_sector_contents() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let watched = tmp.path().join("watched");
        fs::write(watched.join("notes.txt"), b"hello").unwrap();
        fs::write(watched.join("trojan_dropper.exe"), b"mal").unwrap();

        let records = engine.scan_all().unwrap();
        assert_eq!(records.len(), 2);
        let trojan = records.iter().find(|r| r.name.contains("trojan")).unwrap();
        assert_eq!(trojan.threat_level, ThreatLevel::Malicious);

        let summary = engine.summarize(&records);
        assert_eq!(summary.malicious_count, 1);
        assert_eq!(summary.integrity_score, 75);
    }

    #[test]
    fn scan_one_labels_sector_membership() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let inside = tmp.path().join("watched").join("id_rsa");
        fs::write(&inside, b"key").unwrap();
        let outside = tmp.path().join("elsewhere.txt");
        fs::write(&outside, b"x").unwrap();

        let rec = engine.scan_one(&inside).unwrap();
        assert_eq!(rec.sector, "watched");
        assert_eq!(rec.privacy_level, PrivacyLevel::Critical);

        let rec = engine.scan_one(&outside).unwrap();
        assert_eq!(rec.sector, "unmanaged");
    }

    #[test]
    fn quarantine_restore_round_trip_preserves_digest() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let victim = tmp.path().join("watched").join("suspect.bin");
        fs::write(&victim, b"suspicious bytes").unwrap();

        let record = engine.quarantine(&victim, "flagged by operator").unwrap();
        assert!(!victim.exists());

        let restored = engine.restore_quarantine(record.id).unwrap();
        assert_eq!(restored, victim);
        assert_eq!(
            crate::disposition::hasher::digest_file(&victim).unwrap(),
            record.digest
        );
    }

    #[test]
    fn shred_leaves_no_disposition_record() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let victim = tmp.path().join("watched").join("burn.txt");
        fs::write(&victim, b"destroy me").unwrap();

        engine.shred(&victim).unwrap();
        assert!(!victim.exists());
        assert!(engine.list_quarantine().unwrap().is_empty());
        assert!(engine.list_vault().unwrap().is_empty());

        // Re-creating a file at the same path recovers nothing.
        fs::write(&victim, b"new content").unwrap();
        assert!(engine.list_quarantine().unwrap().is_empty());
    }

    #[test]
    fn organize_buckets_by_extension() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let watched = tmp.path().join("watched");
        let photo = watched.join("holiday.jpg");
        let doc = watched.join("report.pdf");
        fs::write(&photo, b"jpg").unwrap();
        fs::write(&doc, b"pdf").unwrap();

        let report = engine
            .organize(&[photo.clone(), doc.clone(), watched.join("ghost.txt")], None)
            .unwrap();

        assert_eq!(report.moved.len(), 2);
        assert_eq!(report.skipped, 1);
        assert!(watched.join("Images").join("holiday.jpg").exists());
        assert!(watched.join("Documents").join("report.pdf").exists());
        assert!(!photo.exists());
    }

    #[test]
    fn organize_with_forced_category() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let watched = tmp.path().join("watched");
        let file = watched.join("whatever.xyz");
        fs::write(&file, b"x").unwrap();

        let report = engine
            .organize(&[file], Some(FileCategory::Archive))
            .unwrap();
        assert_eq!(report.moved.len(), 1);
        assert!(watched.join("Archives").join("whatever.xyz").exists());
    }

    #[test]
    fn organize_never_clobbers_existing_destination() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let watched = tmp.path().join("watched");
        let file = watched.join("dup.jpg");
        fs::write(&file, b"new").unwrap();
        fs::create_dir_all(watched.join("Images")).unwrap();
        fs::write(watched.join("Images").join("dup.jpg"), b"old").unwrap();

        let report = engine.organize(&[file.clone()], None).unwrap();
        assert_eq!(report.skipped, 1);
        assert!(file.exists(), "source must remain when destination occupied");
        assert_eq!(
            fs::read(watched.join("Images").join("dup.jpg")).unwrap(),
            b"old"
        );
    }

    #[test]
    fn dismissing_notification_snoozes_its_type() {
        use crate::sentry::outbox::{Notification, NotificationType};

        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        {
            let mut outbox = engine.outbox.lock();
            let id = outbox.next_id();
            outbox.push(Notification {
                id,
                title: "t".to_string(),
                message: "m".to_string(),
                notification_type: NotificationType::Storage,
                action: None,
            });
        }

        let before = engine.notifications();
        assert_eq!(before.len(), 1);
        engine.dismiss_notification(before[0].id).unwrap();
        assert!(engine.notifications().is_empty());
        assert!(
            engine
                .snooze
                .is_snoozed(NotificationType::Storage, std::time::Duration::from_secs(1800))
        );
    }

    #[test]
    fn taking_action_returns_payload_and_snoozes() {
        use crate::sentry::outbox::{Notification, NotificationAction, NotificationType};

        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let id = {
            let mut outbox = engine.outbox.lock();
            let id = outbox.next_id();
            outbox.push(Notification {
                id,
                title: "t".to_string(),
                message: "m".to_string(),
                notification_type: NotificationType::Screenshots,
                action: Some(NotificationAction::OrganizeScreenshots {
                    sector: "screenshots".to_string(),
                }),
            });
            id
        };

        let action = engine.take_notification_action(id).unwrap();
        assert!(matches!(
            action,
            Some(NotificationAction::OrganizeScreenshots { .. })
        ));
        assert!(
            engine
                .snooze
                .is_snoozed(NotificationType::Screenshots, std::time::Duration::from_secs(1800))
        );
    }

    #[test]
    fn unknown_notification_id_errors() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        assert!(engine.dismiss_notification(999).is_err());
        assert!(engine.take_notification_action(999).is_err());
    }
}
