//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SentryError};

/// Full disk_sentry configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub holding: HoldingConfig,
    pub forensics: ForensicsConfig,
    pub sentry: SentryConfig,
    pub alerts: AlertConfig,
    pub paths: PathsConfig,
}

/// Role of a monitored sector, used by sentry threshold rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SectorRole {
    #[default]
    General,
    Downloads,
    Screenshots,
}

/// One monitored directory with a stable label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectorConfig {
    pub label: String,
    pub path: PathBuf,
    #[serde(default)]
    pub role: SectorRole,
}

/// Scanner behavior and safety constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    pub sectors: Vec<SectorConfig>,
    pub excluded_paths: Vec<PathBuf>,
    pub max_depth: usize,
    pub parallelism: usize,
    pub follow_symlinks: bool,
}

/// Holding directories for reversible dispositions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HoldingConfig {
    pub quarantine_dir: PathBuf,
    pub vault_dir: PathBuf,
}

/// Forensic scan bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ForensicsConfig {
    /// Hard cap on bytes loaded for a deep scan.
    pub max_scan_bytes: u64,
}

/// Sentry scheduler knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SentryConfig {
    /// Master switch — when false, sentry ticks are no-ops.
    pub proactive_monitoring: bool,
    pub interval_minutes: u64,
    pub screenshot_threshold: usize,
    pub download_threshold: usize,
    pub snooze_window_minutes: u64,
}

/// Native alert forwarding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlertConfig {
    pub native_alerts: bool,
}

/// Filesystem paths used by disk_sentry itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// Snooze map persistence (JSON).
    pub snooze_file: PathBuf,
    pub jsonl_log: PathBuf,
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[DS-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("dsentry")
}

impl Default for ScannerConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            sectors: vec![
                SectorConfig {
                    label: "downloads".to_string(),
                    path: home.join("Downloads"),
                    role: SectorRole::Downloads,
                },
                SectorConfig {
                    label: "screenshots".to_string(),
                    path: home.join("Pictures").join("Screenshots"),
                    role: SectorRole::Screenshots,
                },
                SectorConfig {
                    label: "desktop".to_string(),
                    path: home.join("Desktop"),
                    role: SectorRole::General,
                },
                SectorConfig {
                    label: "documents".to_string(),
                    path: home.join("Documents"),
                    role: SectorRole::General,
                },
            ],
            excluded_paths: vec![
                PathBuf::from("/proc"),
                PathBuf::from("/sys"),
                PathBuf::from("/dev"),
            ],
            max_depth: 6,
            parallelism: std::thread::available_parallelism()
                .map_or(2, |n| n.get().saturating_div(2).max(1)),
            follow_symlinks: false,
        }
    }
}

impl Default for HoldingConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            quarantine_dir: data.join("quarantine"),
            vault_dir: data.join("vault"),
        }
    }
}

impl Default for ForensicsConfig {
    fn default() -> Self {
        Self {
            max_scan_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            proactive_monitoring: true,
            interval_minutes: 30,
            screenshot_threshold: 15,
            download_threshold: 10,
            snooze_window_minutes: 30,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            native_alerts: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let cfg = home_dir().join(".config").join("dsentry").join("config.toml");
        let data = data_dir();
        Self {
            config_file: cfg,
            snooze_file: data.join("snooze.json"),
            jsonl_log: data.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default path;
    /// defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SentryError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(SentryError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // scanner
        set_env_usize("DS_SCANNER_MAX_DEPTH", &mut self.scanner.max_depth)?;
        set_env_usize("DS_SCANNER_PARALLELISM", &mut self.scanner.parallelism)?;
        set_env_bool(
            "DS_SCANNER_FOLLOW_SYMLINKS",
            &mut self.scanner.follow_symlinks,
        )?;

        // forensics
        set_env_u64("DS_FORENSICS_MAX_SCAN_BYTES", &mut self.forensics.max_scan_bytes)?;

        // sentry
        set_env_bool(
            "DS_SENTRY_PROACTIVE_MONITORING",
            &mut self.sentry.proactive_monitoring,
        )?;
        set_env_u64("DS_SENTRY_INTERVAL_MINUTES", &mut self.sentry.interval_minutes)?;
        set_env_usize(
            "DS_SENTRY_SCREENSHOT_THRESHOLD",
            &mut self.sentry.screenshot_threshold,
        )?;
        set_env_usize(
            "DS_SENTRY_DOWNLOAD_THRESHOLD",
            &mut self.sentry.download_threshold,
        )?;
        set_env_u64(
            "DS_SENTRY_SNOOZE_WINDOW_MINUTES",
            &mut self.sentry.snooze_window_minutes,
        )?;

        // alerts
        set_env_bool("DS_ALERTS_NATIVE", &mut self.alerts.native_alerts)?;

        // paths
        if let Some(raw) = env_var("DS_QUARANTINE_DIR") {
            self.holding.quarantine_dir = PathBuf::from(raw);
        }
        if let Some(raw) = env_var("DS_VAULT_DIR") {
            self.holding.vault_dir = PathBuf::from(raw);
        }
        if let Some(raw) = env_var("DS_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }
        if let Some(raw) = env_var("DS_SNOOZE_FILE") {
            self.paths.snooze_file = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Normalize paths for consistent comparison.
    fn normalize_paths(&mut self) {
        for sector in &mut self.scanner.sectors {
            strip_trailing_slash(&mut sector.path);
        }
        for path in &mut self.scanner.excluded_paths {
            strip_trailing_slash(path);
        }
        strip_trailing_slash(&mut self.holding.quarantine_dir);
        strip_trailing_slash(&mut self.holding.vault_dir);
    }

    fn validate(&self) -> Result<()> {
        if self.scanner.parallelism == 0 {
            return Err(SentryError::InvalidConfig {
                details: "scanner.parallelism must be >= 1".to_string(),
            });
        }
        if self.scanner.max_depth == 0 {
            return Err(SentryError::InvalidConfig {
                details: "scanner.max_depth must be >= 1".to_string(),
            });
        }
        if self.scanner.sectors.is_empty() {
            return Err(SentryError::InvalidConfig {
                details: "scanner.sectors must name at least one monitored sector".to_string(),
            });
        }
        {
            let mut labels: Vec<&str> =
                self.scanner.sectors.iter().map(|s| s.label.as_str()).collect();
            labels.sort_unstable();
            labels.dedup();
            if labels.len() != self.scanner.sectors.len() {
                return Err(SentryError::InvalidConfig {
                    details: "scanner.sectors labels must be unique".to_string(),
                });
            }
        }

        if self.holding.quarantine_dir == self.holding.vault_dir {
            return Err(SentryError::InvalidConfig {
                details: "holding.quarantine_dir and holding.vault_dir must differ".to_string(),
            });
        }

        if self.forensics.max_scan_bytes == 0 {
            return Err(SentryError::InvalidConfig {
                details: "forensics.max_scan_bytes must be > 0".to_string(),
            });
        }

        if self.sentry.interval_minutes == 0 {
            return Err(SentryError::InvalidConfig {
                details: "sentry.interval_minutes must be >= 1".to_string(),
            });
        }
        if self.sentry.snooze_window_minutes == 0 {
            return Err(SentryError::InvalidConfig {
                details: "sentry.snooze_window_minutes must be >= 1".to_string(),
            });
        }

        Ok(())
    }

    /// Ensure both holding directories exist and are writable.
    ///
    /// This is the one fatal startup check: a triage engine that cannot write
    /// its holding area must not start.
    pub fn ensure_holding_dirs(&self) -> Result<()> {
        for dir in [&self.holding.quarantine_dir, &self.holding.vault_dir] {
            fs::create_dir_all(dir).map_err(|e| SentryError::io(dir, e))?;
            let probe = dir.join(".write-probe");
            fs::write(&probe, b"probe").map_err(|_| SentryError::InvalidConfig {
                details: format!("holding directory is not writable: {}", dir.display()),
            })?;
            let _ = fs::remove_file(&probe);
        }
        Ok(())
    }
}

fn strip_trailing_slash(path: &mut PathBuf) {
    let s = path.to_string_lossy();
    if s.len() > 1
        && let Some(stripped) = s.strip_suffix('/')
    {
        *path = PathBuf::from(stripped);
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_env_u64(name: &str, slot: &mut u64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<u64>().map_err(|error| SentryError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_usize(name: &str, slot: &mut usize) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw
            .parse::<usize>()
            .map_err(|error| SentryError::ConfigParse {
                context: "env",
                details: format!("{name}={raw:?}: {error}"),
            })?;
    }
    Ok(())
}

fn set_env_bool(name: &str, slot: &mut bool) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<bool>().map_err(|error| SentryError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_depth_rejected() {
        let mut cfg = Config::default();
        cfg.scanner.max_depth = 0;
        let err = cfg.validate().expect_err("expected invalid depth");
        assert!(err.to_string().contains("max_depth"));
    }

    #[test]
    fn empty_sectors_rejected() {
        let mut cfg = Config::default();
        cfg.scanner.sectors.clear();
        let err = cfg.validate().expect_err("expected empty sector error");
        assert!(err.to_string().contains("sectors"));
    }

    #[test]
    fn duplicate_sector_labels_rejected() {
        let mut cfg = Config::default();
        let dup = cfg.scanner.sectors[0].clone();
        cfg.scanner.sectors.push(dup);
        let err = cfg.validate().expect_err("expected duplicate label error");
        assert!(err.to_string().contains("unique"));
    }

    #[test]
    fn identical_holding_dirs_rejected() {
        let mut cfg = Config::default();
        cfg.holding.vault_dir = cfg.holding.quarantine_dir.clone();
        let err = cfg.validate().expect_err("expected holding dir error");
        assert!(err.to_string().contains("differ"));
    }

    #[test]
    fn zero_sentry_interval_rejected() {
        let mut cfg = Config::default();
        cfg.sentry.interval_minutes = 0;
        let err = cfg.validate().expect_err("expected interval error");
        assert!(err.to_string().contains("interval_minutes"));
    }

    #[test]
    fn explicit_missing_config_path_errors() {
        let err = Config::load(Some(Path::new("/definitely/does/not/exist.toml")))
            .expect_err("expected missing config error");
        assert_eq!(err.code(), "DS-1002");
    }

    #[test]
    fn config_roundtrip_toml() {
        let cfg = Config::default();
        let raw = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn ensure_holding_dirs_creates_both() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.holding.quarantine_dir = tmp.path().join("q");
        cfg.holding.vault_dir = tmp.path().join("v");
        cfg.ensure_holding_dirs().unwrap();
        assert!(cfg.holding.quarantine_dir.is_dir());
        assert!(cfg.holding.vault_dir.is_dir());
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let mut cfg = Config::default();
        cfg.holding.quarantine_dir = PathBuf::from("/tmp/dsq/");
        cfg.normalize_paths();
        assert_eq!(cfg.holding.quarantine_dir, PathBuf::from("/tmp/dsq"));
    }
}
