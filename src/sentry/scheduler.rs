//! Sentry scheduler: periodic background re-scan, threshold evaluation, and
//! rate-limited notification emission.
//!
//! The scheduler thread owns nothing global: every tick works from an
//! explicit [`SentryContext`] carrying the config snapshot, the shared snooze
//! state, the shared outbox, and an optional bounded alert channel. The
//! timer is cancellable as a whole via [`SentryHandle::stop`]; an in-flight
//! tick runs to completion (the bounded-depth walk keeps that finite).

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;

use crate::classify::classifier;
use crate::classify::record::{FileCategory, FileRecord, ThreatLevel};
use crate::core::config::{SectorRole, SentryConfig};
use crate::logger::jsonl::{ActivityEvent, JsonlLogger};
use crate::scan::walker::{SectorWalker, WalkerConfig};
use crate::sentry::outbox::{Notification, NotificationAction, NotificationType, Outbox};
use crate::sentry::snooze::SharedSnooze;

/// Everything one tick needs, passed explicitly — no module-level state.
pub struct SentryContext {
    pub config: SentryConfig,
    pub walker: WalkerConfig,
    pub snooze: SharedSnooze,
    pub outbox: Arc<Mutex<Outbox>>,
    pub logger: Arc<JsonlLogger>,
    /// Bounded channel to the alert thread; `None` when native alerting is
    /// disabled.
    pub alert_tx: Option<Sender<Notification>>,
}

/// What one tick observed and emitted.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub monitoring_enabled: bool,
    pub files: usize,
    pub screenshots: usize,
    pub unorganized_downloads: usize,
    pub malicious: usize,
    pub emitted: Vec<Notification>,
}

impl TickReport {
    const fn disabled() -> Self {
        Self {
            monitoring_enabled: false,
            files: 0,
            screenshots: 0,
            unorganized_downloads: 0,
            malicious: 0,
            emitted: Vec::new(),
        }
    }
}

/// Run one sentry evaluation pass.
pub fn run_tick(ctx: &SentryContext) -> TickReport {
    if !ctx.config.proactive_monitoring {
        return TickReport::disabled();
    }

    let records = match SectorWalker::new(ctx.walker.clone()).walk() {
        Ok(mut records) => {
            for record in &mut records {
                classifier::classify(record);
            }
            records
        }
        Err(err) => {
            ctx.logger.log(&ActivityEvent::EngineError {
                code: err.code().to_string(),
                message: err.to_string(),
            });
            Vec::new()
        }
    };

    let screenshots = count_screenshots(ctx, &records);
    let unorganized_downloads = count_unorganized_downloads(ctx, &records);
    let malicious = records
        .iter()
        .filter(|r| r.threat_level == ThreatLevel::Malicious)
        .count();

    let mut emitted = Vec::new();
    let window = Duration::from_secs(ctx.config.snooze_window_minutes * 60);

    if screenshots > ctx.config.screenshot_threshold
        && !ctx.snooze.is_snoozed(NotificationType::Screenshots, window)
    {
        let sector = sector_label_for_role(ctx, SectorRole::Screenshots);
        emit(
            ctx,
            &mut emitted,
            NotificationType::Screenshots,
            "Screenshot pile-up".to_string(),
            format!("{screenshots} screenshots are cluttering {sector}."),
            NotificationAction::OrganizeScreenshots { sector },
        );
    }

    if unorganized_downloads > ctx.config.download_threshold
        && !ctx.snooze.is_snoozed(NotificationType::Storage, window)
    {
        let sector = sector_label_for_role(ctx, SectorRole::Downloads);
        emit(
            ctx,
            &mut emitted,
            NotificationType::Storage,
            "Downloads need attention".to_string(),
            format!("{unorganized_downloads} unsorted files are sitting in {sector}."),
            NotificationAction::OrganizeDownloads { sector },
        );
    }

    if malicious > 0 && !ctx.snooze.is_snoozed(NotificationType::Security, window) {
        emit(
            ctx,
            &mut emitted,
            NotificationType::Security,
            "Threats detected".to_string(),
            format!("{malicious} files match malicious patterns."),
            NotificationAction::ReviewThreats {
                malicious_count: malicious,
            },
        );
    }

    ctx.logger.log(&ActivityEvent::SentryTick {
        files: records.len(),
        screenshots,
        unorganized_downloads,
    });

    TickReport {
        monitoring_enabled: true,
        files: records.len(),
        screenshots,
        unorganized_downloads,
        malicious,
        emitted,
    }
}

/// Build, record, and distribute one notification. Emission itself marks the
/// snooze map (last-trigger semantics), so a type fires at most once per
/// window even if never acted on.
fn emit(
    ctx: &SentryContext,
    emitted: &mut Vec<Notification>,
    ty: NotificationType,
    title: String,
    message: String,
    action: NotificationAction,
) {
    let notification = {
        let mut outbox = ctx.outbox.lock();
        let notification = Notification {
            id: outbox.next_id(),
            title,
            message,
            notification_type: ty,
            action: Some(action),
        };
        for dropped in outbox.push(notification.clone()) {
            ctx.logger.log(&ActivityEvent::NotificationDropped {
                id: dropped.id,
                notification_type: type_label(dropped.notification_type).to_string(),
            });
        }
        notification
    };

    if let Err(err) = ctx.snooze.mark(ty) {
        ctx.logger.log(&ActivityEvent::EngineError {
            code: err.code().to_string(),
            message: format!("snooze persist failed: {err}"),
        });
    }

    ctx.logger.log(&ActivityEvent::NotificationEmitted {
        id: notification.id,
        notification_type: type_label(ty).to_string(),
    });

    if let Some(tx) = &ctx.alert_tx {
        // Bounded channel: a stalled alert thread drops alerts rather than
        // stalling the tick.
        if tx.try_send(notification.clone()).is_err() {
            ctx.logger.log(&ActivityEvent::NotificationDropped {
                id: notification.id,
                notification_type: type_label(ty).to_string(),
            });
        }
    }

    emitted.push(notification);
}

const fn type_label(ty: NotificationType) -> &'static str {
    match ty {
        NotificationType::Screenshots => "screenshots",
        NotificationType::Storage => "storage",
        NotificationType::Security => "security",
    }
}

fn count_screenshots(ctx: &SentryContext, records: &[FileRecord]) -> usize {
    records
        .iter()
        .filter(|r| {
            r.tags.contains("screenshot")
                || (sector_role(ctx, &r.sector) == Some(SectorRole::Screenshots)
                    && r.category == FileCategory::Image)
        })
        .count()
}

/// Unorganized means sitting directly in a downloads sector root, not yet
/// sorted into any subdirectory.
fn count_unorganized_downloads(ctx: &SentryContext, records: &[FileRecord]) -> usize {
    ctx.walker
        .sectors
        .iter()
        .filter(|s| s.role == SectorRole::Downloads)
        .map(|sector| {
            records
                .iter()
                .filter(|r| r.path.parent() == Some(sector.path.as_path()))
                .count()
        })
        .sum()
}

fn sector_role(ctx: &SentryContext, label: &str) -> Option<SectorRole> {
    ctx.walker
        .sectors
        .iter()
        .find(|s| s.label == label)
        .map(|s| s.role)
}

fn sector_label_for_role(ctx: &SentryContext, role: SectorRole) -> String {
    ctx.walker
        .sectors
        .iter()
        .find(|s| s.role == role)
        .map_or_else(|| "unknown".to_string(), |s| s.label.clone())
}

// ──────────────────── scheduler thread ────────────────────

/// Cancellation handle for the background sentry task.
pub struct SentryHandle {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl SentryHandle {
    /// Stop scheduling and wait for the thread to exit. An in-flight tick
    /// finishes first.
    pub fn stop(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawns the periodic tick thread.
pub struct SentryScheduler;

impl SentryScheduler {
    /// Start ticking every `config.interval_minutes`. The first tick runs
    /// after one full interval, not immediately.
    #[must_use]
    pub fn spawn(ctx: SentryContext) -> SentryHandle {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = Duration::from_secs(ctx.config.interval_minutes.saturating_mul(60));

        let thread = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    Err(RecvTimeoutError::Timeout) => {
                        let _ = run_tick(&ctx);
                    }
                }
            }
        });

        SentryHandle {
            stop_tx,
            thread: Some(thread),
        }
    }
}
