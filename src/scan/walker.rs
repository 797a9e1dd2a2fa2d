//! Parallel sector walker: bounded-depth file enumeration feeding the classifier.
//!
//! The walker is the "eyes" of the triage engine: it enumerates files under
//! each monitored sector down to a configured depth and emits one
//! [`FileRecord`] per regular file. Unreadable subtrees are skipped, never
//! fatal — a permission error inside one directory must not abort the walk.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use crossbeam_channel as channel;

use crate::classify::record::FileRecord;
use crate::core::config::{ScannerConfig, SectorConfig};
use crate::core::errors::Result;

/// Walker configuration derived from `ScannerConfig`.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub sectors: Vec<SectorConfig>,
    pub max_depth: usize,
    pub follow_symlinks: bool,
    pub parallelism: usize,
    pub excluded_paths: HashSet<PathBuf>,
}

impl WalkerConfig {
    #[must_use]
    pub fn from_scanner(config: &ScannerConfig) -> Self {
        Self {
            sectors: config.sectors.clone(),
            max_depth: config.max_depth,
            follow_symlinks: config.follow_symlinks,
            parallelism: config.parallelism.max(1),
            excluded_paths: config.excluded_paths.iter().cloned().collect(),
        }
    }
}

/// Item in the internal work queue: (directory, depth, sector label).
type WorkItem = (PathBuf, usize, Arc<str>);

/// Bounded-depth parallel walker over monitored sectors.
///
/// Safety invariants:
/// - Honors `follow_symlinks` during traversal
/// - Skips excluded paths
/// - Bounded by `max_depth` to keep worst-case walk latency finite
/// - Unreadable directories are skipped without failing the walk
pub struct SectorWalker {
    config: WalkerConfig,
}

impl SectorWalker {
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Perform a full parallel walk of all sectors.
    ///
    /// Returns unclassified records; the caller runs the classifier over them.
    pub fn walk(&self) -> Result<Vec<FileRecord>> {
        Ok(self.stream()?.into_iter().collect())
    }

    /// Stream records as they are discovered. The walk runs in background
    /// threads; the receiver yields until all workers finish.
    pub fn stream(&self) -> Result<channel::Receiver<FileRecord>> {
        let parallelism = self.config.parallelism;

        let (work_tx, work_rx) = channel::bounded::<WorkItem>(4096);
        let (result_tx, result_rx) = channel::unbounded::<FileRecord>();

        // Track in-flight work items so workers know when to stop.
        let in_flight = Arc::new(AtomicUsize::new(0));

        // Seed work queue with sector roots. Missing or unreadable sectors
        // are skipped: a monitored directory may simply not exist yet.
        for sector in &self.config.sectors {
            let meta = match metadata_for_path(&sector.path, self.config.follow_symlinks) {
                Ok(m) => m,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::NotFound | ErrorKind::PermissionDenied
                    ) =>
                {
                    continue;
                }
                Err(_) => continue,
            };
            if !meta.is_dir() {
                continue;
            }
            let label: Arc<str> = Arc::from(sector.label.as_str());
            in_flight.fetch_add(1, Ordering::Release);
            let _ = work_tx.send((sector.path.clone(), 0, label));
        }

        for _ in 0..parallelism {
            let work_rx = work_rx.clone();
            let work_tx = work_tx.clone();
            let result_tx = result_tx.clone();
            let in_flight = Arc::clone(&in_flight);
            let config = self.config.clone();

            thread::spawn(move || {
                walker_thread(&work_rx, &work_tx, &result_tx, &in_flight, &config);
            });
        }

        Ok(result_rx)
    }
}

/// Worker thread: pulls directories from the work channel, emits file records,
/// enqueues subdirectories.
fn walker_thread(
    work_rx: &channel::Receiver<WorkItem>,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<FileRecord>,
    in_flight: &AtomicUsize,
    config: &WalkerConfig,
) {
    loop {
        match work_rx.recv_timeout(Duration::from_millis(50)) {
            Ok((dir_path, depth, sector)) => {
                process_directory(&dir_path, depth, &sector, work_tx, result_tx, in_flight, config);
                in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            Err(channel::RecvTimeoutError::Timeout) => {
                if in_flight.load(Ordering::Acquire) == 0 {
                    return;
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Process one directory: emit records for regular files, enqueue child
/// directories up to the depth bound.
fn process_directory(
    dir_path: &Path,
    depth: usize,
    sector: &Arc<str>,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<FileRecord>,
    in_flight: &AtomicUsize,
    config: &WalkerConfig,
) {
    if config.excluded_paths.contains(dir_path) {
        return;
    }

    // Unreadable directory: skip gracefully, walk continues elsewhere.
    let entries = match fs::read_dir(dir_path) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry_result in entries {
        let Ok(entry) = entry_result else {
            continue;
        };
        let child_path = entry.path();

        let Ok(ft) = entry.file_type() else {
            continue;
        };

        // Skip symlinks entirely unless following is explicitly enabled.
        if !config.follow_symlinks && ft.is_symlink() {
            continue;
        }

        let is_dir = if config.follow_symlinks && ft.is_symlink() {
            metadata_for_path(&child_path, true)
                .map(|m| m.is_dir())
                .unwrap_or(false)
        } else {
            ft.is_dir()
        };

        if is_dir {
            if depth < config.max_depth && !config.excluded_paths.contains(&child_path) {
                in_flight.fetch_add(1, Ordering::Release);
                if work_tx
                    .try_send((child_path, depth + 1, Arc::clone(sector)))
                    .is_err()
                {
                    in_flight.fetch_sub(1, Ordering::Release);
                }
            }
            continue;
        }

        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }

        let modified = system_time_to_utc(meta.modified().unwrap_or(SystemTime::UNIX_EPOCH));
        let record = FileRecord::new(&child_path, meta.len(), modified, sector);
        let _ = result_tx.send(record);
    }
}

fn metadata_for_path(path: &Path, follow_symlinks: bool) -> std::io::Result<fs::Metadata> {
    if follow_symlinks {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    }
}

/// Convert a `SystemTime` to a UTC timestamp, clamping pre-epoch times.
#[must_use]
pub fn system_time_to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SectorRole;
    use std::fs;
    use tempfile::TempDir;

    fn sector(label: &str, path: &Path) -> SectorConfig {
        SectorConfig {
            label: label.to_string(),
            path: path.to_path_buf(),
            role: SectorRole::General,
        }
    }

    fn test_config(root: &Path) -> WalkerConfig {
        WalkerConfig {
            sectors: vec![sector("test", root)],
            max_depth: 6,
            follow_symlinks: false,
            parallelism: 2,
            excluded_paths: HashSet::new(),
        }
    }

    #[test]
    fn walks_files_in_nested_tree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a").join("b")).unwrap();
        fs::write(tmp.path().join("top.txt"), b"top").unwrap();
        fs::write(tmp.path().join("a").join("mid.txt"), b"mid").unwrap();
        fs::write(tmp.path().join("a").join("b").join("deep.txt"), b"deep").unwrap();

        let walker = SectorWalker::new(test_config(tmp.path()));
        let records = walker.walk().unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(records.len(), 3);
        assert!(names.contains(&"top.txt"));
        assert!(names.contains(&"mid.txt"));
        assert!(names.contains(&"deep.txt"));
        assert!(records.iter().all(|r| r.sector == "test"));
    }

    #[test]
    fn respects_max_depth() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a").join("b").join("c")).unwrap();
        fs::write(tmp.path().join("a").join("shallow.txt"), b"x").unwrap();
        fs::write(
            tmp.path().join("a").join("b").join("c").join("deep.txt"),
            b"x",
        )
        .unwrap();

        let mut config = test_config(tmp.path());
        // Depth 0 = root; children of root at depth 1. Depth cap 1 means
        // directories at depth 1 are entered but nothing below.
        config.max_depth = 1;
        let walker = SectorWalker::new(config);
        let records = walker.walk().unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"shallow.txt"));
        assert!(!names.contains(&"deep.txt"));
    }

    #[test]
    fn skips_excluded_paths() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("keep")).unwrap();
        fs::create_dir_all(tmp.path().join("skip")).unwrap();
        fs::write(tmp.path().join("keep").join("k.txt"), b"x").unwrap();
        fs::write(tmp.path().join("skip").join("s.txt"), b"x").unwrap();

        let mut config = test_config(tmp.path());
        config.excluded_paths.insert(tmp.path().join("skip"));
        let walker = SectorWalker::new(config);
        let records = walker.walk().unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"k.txt"));
        assert!(!names.contains(&"s.txt"));
    }

    #[test]
    fn does_not_follow_symlinks_by_default() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real");
        fs::create_dir_all(&real).unwrap();
        fs::write(real.join("inside.txt"), b"x").unwrap();

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&real, tmp.path().join("link")).unwrap();

            let walker = SectorWalker::new(test_config(tmp.path()));
            let records = walker.walk().unwrap();
            // inside.txt is reachable once (via "real"), not twice.
            let count = records.iter().filter(|r| r.name == "inside.txt").count();
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn nonexistent_sector_is_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("present.txt"), b"x").unwrap();

        let mut config = test_config(tmp.path());
        config
            .sectors
            .push(sector("ghost", Path::new("/definitely/does/not/exist")));
        let walker = SectorWalker::new(config);
        let records = walker.walk().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn multiple_sectors_carry_their_labels() {
        let tmp = TempDir::new().unwrap();
        let downloads = tmp.path().join("Downloads");
        let desktop = tmp.path().join("Desktop");
        fs::create_dir_all(&downloads).unwrap();
        fs::create_dir_all(&desktop).unwrap();
        fs::write(downloads.join("d.bin"), b"x").unwrap();
        fs::write(desktop.join("e.txt"), b"x").unwrap();

        let config = WalkerConfig {
            sectors: vec![sector("downloads", &downloads), sector("desktop", &desktop)],
            max_depth: 3,
            follow_symlinks: false,
            parallelism: 2,
            excluded_paths: HashSet::new(),
        };
        let walker = SectorWalker::new(config);
        let records = walker.walk().unwrap();

        let d = records.iter().find(|r| r.name == "d.bin").unwrap();
        let e = records.iter().find(|r| r.name == "e.txt").unwrap();
        assert_eq!(d.sector, "downloads");
        assert_eq!(e.sector, "desktop");
    }
}
