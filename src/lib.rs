#![forbid(unsafe_code)]

//! disk_sentry — local endpoint triage engine.
//!
//! Three-pronged defense for a user's monitored directories:
//! 1. **Classification** — ordered heuristic rule tables rate every file's
//!    threat and privacy risk
//! 2. **Disposition** — reversible quarantine/vault moves with provenance
//!    digests, plus irreversible shredding
//! 3. **Sentry** — a background scheduler re-evaluates state and raises
//!    rate-limited, snooze-gated alerts
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use disk_sentry::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use disk_sentry::core::config::Config;
//! use disk_sentry::engine::TriageEngine;
//! ```

pub mod prelude;

pub mod classify;
#[cfg(feature = "cli")]
pub mod cli_app;
pub mod core;
pub mod disposition;
pub mod engine;
pub mod forensics;
pub mod logger;
pub mod scan;
pub mod sentry;
