//! Quarantine/vault store: reversible isolation with durable sidecar metadata.
//!
//! Each holding directory contains pairs of `{stored-content-file,
//! sidecar-metadata-file}`. The sidecar is written to a temporary name and
//! renamed into place only after the content move succeeded, so the
//! record-exists-iff-content-exists invariant has no orphan window on the
//! commit path. Entries missing either half of the pair are orphans and are
//! never surfaced by `list`.
//!
//! Access to a holding directory is serialized via `flock()` on a lockfile so
//! concurrent engine + CLI operations don't race.

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::record::stable_path_id;
use crate::core::errors::{Result, SentryError};
use crate::disposition::hasher::digest_file;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

// ──────────────────── kinds ────────────────────

/// Which holding area a disposition targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispositionKind {
    Quarantine,
    Vault,
}

impl DispositionKind {
    /// Filename suffix for stored content files of this kind.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Quarantine => "quarantined",
            Self::Vault => "vaulted",
        }
    }
}

/// Sidecar filename suffix appended to the stored content name.
const SIDECAR_SUFFIX: &str = ".meta.json";
const SIDECAR_TMP_SUFFIX: &str = ".meta.json.tmp";

// ──────────────────── record ────────────────────

/// Durable metadata for one quarantined or vaulted file.
///
/// Exists iff the matching stored content file and this sidecar both exist.
/// Created on `place`, destroyed on successful `restore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispositionRecord {
    /// Stable id derived from the stored path.
    pub id: u64,
    pub original_path: PathBuf,
    pub original_name: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    /// SHA-256 hex digest of the content, captured before the move.
    pub digest: String,
    pub stored_path: PathBuf,
    pub kind: DispositionKind,
}

// ──────────────────── store ────────────────────

/// Manages both holding directories and their sidecar records.
pub struct DispositionStore {
    quarantine_dir: PathBuf,
    vault_dir: PathBuf,
}

impl DispositionStore {
    /// Create a store over two existing holding directories.
    ///
    /// The directories are created if missing; failure here is fatal to
    /// engine startup (unwritable holding area).
    pub fn new(quarantine_dir: PathBuf, vault_dir: PathBuf) -> Result<Self> {
        for dir in [&quarantine_dir, &vault_dir] {
            fs::create_dir_all(dir).map_err(|e| SentryError::io(dir, e))?;
        }
        Ok(Self {
            quarantine_dir,
            vault_dir,
        })
    }

    fn dir_for(&self, kind: DispositionKind) -> &Path {
        match kind {
            DispositionKind::Quarantine => &self.quarantine_dir,
            DispositionKind::Vault => &self.vault_dir,
        }
    }

    // ──────────────────── locking ────────────────────

    #[cfg(unix)]
    fn acquire_lock(&self, kind: DispositionKind) -> Result<nix::fcntl::Flock<fs::File>> {
        let lock_path = self.dir_for(kind).join(".lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o600)
            .open(&lock_path)
            .map_err(|e| SentryError::io(&lock_path, e))?;

        #[allow(deprecated)]
        nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusive).map_err(
            |(_file, e)| SentryError::Runtime {
                details: format!("failed to lock holding dir: {e}"),
            },
        )
    }

    #[cfg(not(unix))]
    #[allow(clippy::unnecessary_wraps, clippy::unused_self)]
    fn acquire_lock(&self, _kind: DispositionKind) -> Result<()> {
        Ok(())
    }

    // ──────────────────── place ────────────────────

    /// Move a file into the holding area and commit its sidecar record.
    ///
    /// Ordering guarantee: the digest is computed strictly before the move
    /// and before the metadata write, so a provenance record can never
    /// outlive the file movement it describes. A digest failure aborts with
    /// no filesystem change; a move failure leaves nothing persisted.
    pub fn place(&self, path: &Path, reason: &str, kind: DispositionKind) -> Result<DispositionRecord> {
        let _lock = self.acquire_lock(kind)?;

        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| SentryError::Runtime {
                details: format!("path has no file name: {}", path.display()),
            })?;

        // (a) Digest first. Failure → abort, nothing moved.
        let digest = digest_file(path)?;

        // (b) Pick a destination name; uniquify on millisecond collisions.
        let now = Utc::now();
        let stored_path = self.unique_destination(kind, now, &original_name);

        // (c) Atomic move. Failure → nothing persists.
        move_file(path, &stored_path)?;

        let record = DispositionRecord {
            id: stable_path_id(&stored_path),
            original_path: path.to_path_buf(),
            original_name,
            timestamp: now,
            reason: reason.to_string(),
            digest,
            stored_path: stored_path.clone(),
            kind,
        };

        // (d) Rename-commit the sidecar. If this fails the content would be
        // an orphan, so the move is rolled back best-effort before erroring.
        if let Err(err) = self.commit_sidecar(&record) {
            let _ = move_file(&stored_path, path);
            return Err(err);
        }

        Ok(record)
    }

    fn unique_destination(
        &self,
        kind: DispositionKind,
        now: DateTime<Utc>,
        original_name: &str,
    ) -> PathBuf {
        let dir = self.dir_for(kind);
        let base = format!("{}_{}.{}", now.timestamp_millis(), original_name, kind.suffix());
        let mut candidate = dir.join(&base);
        let mut n = 1u32;
        while candidate.exists() || sidecar_path(&candidate).exists() {
            candidate = dir.join(format!(
                "{}_{n}_{}.{}",
                now.timestamp_millis(),
                original_name,
                kind.suffix()
            ));
            n += 1;
        }
        candidate
    }

    fn commit_sidecar(&self, record: &DispositionRecord) -> Result<()> {
        let final_path = sidecar_path(&record.stored_path);
        let tmp_path = PathBuf::from(format!(
            "{}{SIDECAR_TMP_SUFFIX}",
            record.stored_path.display()
        ));

        let json = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp_path, &json).map_err(|e| SentryError::Move {
            from: record.original_path.clone(),
            to: record.stored_path.clone(),
            details: format!("sidecar write failed: {e}"),
        })?;
        fs::rename(&tmp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            SentryError::Move {
                from: record.original_path.clone(),
                to: record.stored_path.clone(),
                details: format!("sidecar commit failed: {e}"),
            }
        })
    }

    // ──────────────────── restore ────────────────────

    /// Move stored content back to its original path and delete the sidecar.
    ///
    /// Fails with `Conflict` when the original path is already occupied; the
    /// store never overwrites. Returns the restored path.
    pub fn restore(&self, id: u64, kind: DispositionKind) -> Result<PathBuf> {
        let _lock = self.acquire_lock(kind)?;

        let record = self
            .list(kind)?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| SentryError::Runtime {
                details: format!("no {} entry with id {id:016x}", kind.suffix()),
            })?;

        if record.original_path.exists() {
            return Err(SentryError::Conflict {
                path: record.original_path,
            });
        }

        if let Some(parent) = record.original_path.parent() {
            fs::create_dir_all(parent).map_err(|e| SentryError::io(parent, e))?;
        }
        move_file(&record.stored_path, &record.original_path)?;

        // Content is back; the sidecar must not outlive it.
        let sidecar = sidecar_path(&record.stored_path);
        fs::remove_file(&sidecar).map_err(|e| SentryError::io(&sidecar, e))?;

        Ok(record.original_path)
    }

    // ──────────────────── list ────────────────────

    /// Enumerate holding entries of one kind, pairing content files with
    /// sidecars. Orphans (either half missing or unparseable) are skipped,
    /// never surfaced.
    pub fn list(&self, kind: DispositionKind) -> Result<Vec<DispositionRecord>> {
        let dir = self.dir_for(kind);
        let entries = fs::read_dir(dir).map_err(|e| SentryError::io(dir, e))?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(kind.suffix()) {
                continue;
            }

            let sidecar = sidecar_path(&path);
            let Ok(raw) = fs::read_to_string(&sidecar) else {
                continue; // Orphaned content: no sidecar.
            };
            let Ok(record) = serde_json::from_str::<DispositionRecord>(&raw) else {
                continue; // Corrupt sidecar: treat as orphan.
            };
            records.push(record);
        }

        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

fn sidecar_path(stored: &Path) -> PathBuf {
    PathBuf::from(format!("{}{SIDECAR_SUFFIX}", stored.display()))
}

/// Rename with a copy+remove fallback for cross-device moves.
pub(crate) fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            // Cross-device (or transient) rename failure: copy then remove.
            fs::copy(from, to).map_err(|e| SentryError::Move {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                details: format!("copy fallback failed: {e}"),
            })?;
            fs::remove_file(from).map_err(|e| {
                let _ = fs::remove_file(to);
                SentryError::Move {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    details: format!("source removal failed after copy: {e}"),
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(tmp: &tempfile::TempDir) -> DispositionStore {
        DispositionStore::new(tmp.path().join("quarantine"), tmp.path().join("vault")).unwrap()
    }

    #[test]
    fn place_moves_content_and_writes_sidecar() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let victim = tmp.path().join("evil.exe");
        fs::write(&victim, b"malware bytes").unwrap();

        let record = store
            .place(&victim, "matched malicious pattern", DispositionKind::Quarantine)
            .unwrap();

        assert!(!victim.exists(), "source must be moved away");
        assert!(record.stored_path.exists(), "stored content must exist");
        assert!(sidecar_path(&record.stored_path).exists());
        assert_eq!(record.original_name, "evil.exe");
        assert_eq!(record.kind, DispositionKind::Quarantine);
        assert_eq!(record.reason, "matched malicious pattern");
        assert!(
            record
                .stored_path
                .to_string_lossy()
                .ends_with(".quarantined")
        );
    }

    #[test]
    fn place_missing_file_changes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let err = store
            .place(
                &tmp.path().join("ghost.bin"),
                "r",
                DispositionKind::Quarantine,
            )
            .unwrap_err();
        assert_eq!(err.code(), "DS-4001");
        // Holding dir holds only the lockfile at most.
        let count = fs::read_dir(tmp.path().join("quarantine"))
            .unwrap()
            .flatten()
            .filter(|e| e.file_name() != ".lock")
            .count();
        assert_eq!(count, 0);
    }

    #[test]
    fn restore_round_trips_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let victim = tmp.path().join("secrets.kdbx");
        fs::write(&victim, b"vault me").unwrap();

        let record = store
            .place(&victim, "sensitive", DispositionKind::Vault)
            .unwrap();
        let placed_digest = record.digest.clone();
        assert!(!victim.exists());

        let restored = store.restore(record.id, DispositionKind::Vault).unwrap();
        assert_eq!(restored, victim);
        assert!(victim.exists());
        assert_eq!(digest_file(&victim).unwrap(), placed_digest);
        // Record destroyed on restore.
        assert!(store.list(DispositionKind::Vault).unwrap().is_empty());
    }

    #[test]
    fn restore_fails_on_occupied_original_path() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let victim = tmp.path().join("report.pdf");
        fs::write(&victim, b"original").unwrap();

        let record = store
            .place(&victim, "test", DispositionKind::Quarantine)
            .unwrap();

        // Someone recreates a different file at the original path.
        fs::write(&victim, b"newer file").unwrap();

        let err = store
            .restore(record.id, DispositionKind::Quarantine)
            .unwrap_err();
        assert_eq!(err.code(), "DS-4003");
        // The newer file is untouched and the holding entry survives.
        assert_eq!(fs::read(&victim).unwrap(), b"newer file");
        assert_eq!(store.list(DispositionKind::Quarantine).unwrap().len(), 1);
    }

    #[test]
    fn restore_unknown_id_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let err = store.restore(42, DispositionKind::Quarantine).unwrap_err();
        assert!(err.to_string().contains("no quarantined entry"));
    }

    #[test]
    fn list_skips_orphaned_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let victim = tmp.path().join("a.txt");
        fs::write(&victim, b"a").unwrap();
        store.place(&victim, "r", DispositionKind::Quarantine).unwrap();

        // Drop an orphan content file with no sidecar.
        fs::write(
            tmp.path().join("quarantine").join("999_orphan.txt.quarantined"),
            b"orphan",
        )
        .unwrap();
        // And an unpaired sidecar.
        fs::write(
            tmp.path()
                .join("quarantine")
                .join("998_gone.txt.quarantined.meta.json"),
            b"{not json",
        )
        .unwrap();

        let records = store.list(DispositionKind::Quarantine).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original_name, "a.txt");
    }

    #[test]
    fn quarantine_and_vault_are_separate_namespaces() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let a = tmp.path().join("a.bin");
        let b = tmp.path().join("b.bin");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        store.place(&a, "q", DispositionKind::Quarantine).unwrap();
        store.place(&b, "v", DispositionKind::Vault).unwrap();

        assert_eq!(store.list(DispositionKind::Quarantine).unwrap().len(), 1);
        assert_eq!(store.list(DispositionKind::Vault).unwrap().len(), 1);
    }

    #[test]
    fn same_name_placed_twice_gets_distinct_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let victim = tmp.path().join("dup.txt");

        fs::write(&victim, b"one").unwrap();
        let r1 = store.place(&victim, "r", DispositionKind::Quarantine).unwrap();
        fs::write(&victim, b"two").unwrap();
        let r2 = store.place(&victim, "r", DispositionKind::Quarantine).unwrap();

        assert_ne!(r1.stored_path, r2.stored_path);
        assert_ne!(r1.id, r2.id);
        assert_eq!(store.list(DispositionKind::Quarantine).unwrap().len(), 2);
    }

    #[test]
    fn digest_captured_before_move_matches_stored_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp);
        let victim = tmp.path().join("data.bin");
        fs::write(&victim, b"provenance").unwrap();
        let expected = digest_file(&victim).unwrap();

        let record = store.place(&victim, "r", DispositionKind::Vault).unwrap();
        assert_eq!(record.digest, expected);
        assert_eq!(digest_file(&record.stored_path).unwrap(), expected);
    }
}
