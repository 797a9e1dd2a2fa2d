//! Snooze map: per-type last-trigger times gating notification emission.
//!
//! The map records when each notification type last fired (or was acted on);
//! a type is suppressed while `now − last_trigger < window`. Persistence goes
//! through the injected [`SnoozeStore`] boundary — there is no module-level
//! mutable state.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SentryError};
use crate::sentry::outbox::NotificationType;

/// Mapping from notification type to last-trigger time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnoozeMap {
    entries: HashMap<NotificationType, DateTime<Utc>>,
}

impl SnoozeMap {
    /// Whether `ty` is suppressed at `now` for the given window.
    #[must_use]
    pub fn is_snoozed(&self, ty: NotificationType, now: DateTime<Utc>, window: Duration) -> bool {
        self.entries.get(&ty).is_some_and(|last| {
            let elapsed = now.signed_duration_since(*last);
            elapsed >= chrono::TimeDelta::zero()
                && elapsed < chrono::TimeDelta::from_std(window).unwrap_or(chrono::TimeDelta::MAX)
        })
    }

    /// Record a trigger for `ty` at `now`.
    pub fn mark(&mut self, ty: NotificationType, now: DateTime<Utc>) {
        self.entries.insert(ty, now);
    }

    /// Last trigger time for `ty`, if any.
    #[must_use]
    pub fn last_trigger(&self, ty: NotificationType) -> Option<DateTime<Utc>> {
        self.entries.get(&ty).copied()
    }
}

/// Persistence boundary for the snooze map. Injected, never owned by the
/// scheduler itself.
pub trait SnoozeStore: Send {
    /// Load the persisted map; a missing backing store yields the default.
    fn load(&self) -> SnoozeMap;
    /// Persist the map.
    fn persist(&mut self, map: &SnoozeMap) -> Result<()>;
}

/// File-backed store: JSON document, committed via temp-file rename.
pub struct FileSnoozeStore {
    path: PathBuf,
}

impl FileSnoozeStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SnoozeStore for FileSnoozeStore {
    fn load(&self) -> SnoozeMap {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn persist(&mut self, map: &SnoozeMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SentryError::io(parent, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(map)?;
        std::fs::write(&tmp, &json).map_err(|e| SentryError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| SentryError::io(&self.path, e))
    }
}

/// In-memory store for tests and embedded use.
#[derive(Default)]
pub struct MemorySnoozeStore {
    map: SnoozeMap,
}

impl SnoozeStore for MemorySnoozeStore {
    fn load(&self) -> SnoozeMap {
        self.map.clone()
    }

    fn persist(&mut self, map: &SnoozeMap) -> Result<()> {
        self.map = map.clone();
        Ok(())
    }
}

/// Shared snooze state: the live map plus its persistence store, safe to
/// clone across the scheduler and the engine facade.
#[derive(Clone)]
pub struct SharedSnooze {
    inner: Arc<Mutex<SnoozeState>>,
}

struct SnoozeState {
    map: SnoozeMap,
    store: Box<dyn SnoozeStore>,
}

impl SharedSnooze {
    /// Load the map from the store and wrap both.
    #[must_use]
    pub fn new(store: Box<dyn SnoozeStore>) -> Self {
        let map = store.load();
        Self {
            inner: Arc::new(Mutex::new(SnoozeState { map, store })),
        }
    }

    #[must_use]
    pub fn is_snoozed(&self, ty: NotificationType, window: Duration) -> bool {
        self.inner.lock().map.is_snoozed(ty, Utc::now(), window)
    }

    /// Record a trigger and persist. Persistence failures are returned but
    /// the in-memory mark sticks either way.
    pub fn mark(&self, ty: NotificationType) -> Result<()> {
        let mut state = self.inner.lock();
        state.map.mark(ty, Utc::now());
        let map = state.map.clone();
        state.store.persist(&map)
    }

    /// Snapshot of the current map.
    #[must_use]
    pub fn snapshot(&self) -> SnoozeMap {
        self.inner.lock().map.clone()
    }
}
