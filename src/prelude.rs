//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use disk_sentry::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SentryError};

// Classification
pub use crate::classify::classifier::{classify, classify_privacy, classify_threat, tags, threat_type};
pub use crate::classify::record::{FileCategory, FileRecord, PrivacyLevel, ThreatLevel};
pub use crate::classify::summary::{IntegritySummary, SummaryStatus, summarize};

// Dispositions
pub use crate::disposition::hasher::digest_file;
pub use crate::disposition::shred::{ShredReport, shred};
pub use crate::disposition::store::{DispositionKind, DispositionRecord, DispositionStore};

// Forensics
pub use crate::forensics::{ForensicReport, deep_scan, shannon_entropy};

// Engine
pub use crate::engine::{OrganizeReport, TriageEngine};

// Sentry
pub use crate::sentry::outbox::{Notification, NotificationAction, NotificationType, Outbox};
pub use crate::sentry::scheduler::{SentryHandle, SentryScheduler};
pub use crate::sentry::snooze::{SnoozeMap, SnoozeStore};
