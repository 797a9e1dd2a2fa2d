//! DS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SentryError>;

/// Top-level error type for disk_sentry.
#[derive(Debug, Error)]
pub enum SentryError {
    #[error("[DS-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DS-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DS-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DS-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DS-3001] permission denied for {path}")]
    PermissionDenied { path: PathBuf },

    #[error("[DS-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DS-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[DS-3900] runtime failure: {details}")]
    Runtime { details: String },

    #[error("[DS-4001] digest failure for {path}: {details}")]
    Hash { path: PathBuf, details: String },

    #[error("[DS-4002] move failure from {from} to {to}: {details}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        details: String,
    },

    #[error("[DS-4003] restore conflict: {path} is already occupied")]
    Conflict { path: PathBuf },

    #[error("[DS-4004] unlink failure for {path} (content already destroyed): {details}")]
    Unlink { path: PathBuf, details: String },

    #[error("[DS-4101] file too large for forensic scan: {path} is {size} bytes (cap {cap})")]
    TooLarge { path: PathBuf, size: u64, cap: u64 },

    #[error("[DS-4201] scan failure under {path}: {details}")]
    Scan { path: PathBuf, details: String },
}

impl SentryError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DS-1001",
            Self::MissingConfig { .. } => "DS-1002",
            Self::ConfigParse { .. } => "DS-1003",
            Self::Serialization { .. } => "DS-2101",
            Self::PermissionDenied { .. } => "DS-3001",
            Self::Io { .. } => "DS-3002",
            Self::ChannelClosed { .. } => "DS-3003",
            Self::Runtime { .. } => "DS-3900",
            Self::Hash { .. } => "DS-4001",
            Self::Move { .. } => "DS-4002",
            Self::Conflict { .. } => "DS-4003",
            Self::Unlink { .. } => "DS-4004",
            Self::TooLarge { .. } => "DS-4101",
            Self::Scan { .. } => "DS-4201",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// `Unlink` is retryable on its own: the overwrite already succeeded, so
    /// only the removal needs another attempt. `Conflict` requires the caller
    /// to clear the target first, so it is not retryable as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Hash { .. }
                | Self::Move { .. }
                | Self::Unlink { .. }
                | Self::Scan { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SentryError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SentryError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
