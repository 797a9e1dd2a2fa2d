//! Native alert delivery: a sink trait drained from a bounded channel.
//!
//! The scheduler never calls a sink inline from timer code — notifications
//! cross a bounded crossbeam channel to a dedicated alert thread, so a slow
//! or blocking sink can't stall a tick.

#![allow(missing_docs)]

use std::process::Command;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use crate::sentry::outbox::Notification;

/// Destination for native alerts. Implementations must not panic; delivery
/// failures are swallowed (alerting is best-effort).
pub trait AlertSink: Send {
    fn alert(&self, notification: &Notification);
}

/// Desktop notifications via notify-send (Linux) or osascript (macOS).
pub struct DesktopAlertSink;

impl AlertSink for DesktopAlertSink {
    fn alert(&self, notification: &Notification) {
        let body = match &notification.action {
            Some(action) => format!("{} {}", notification.message, action.prompt()),
            None => notification.message.clone(),
        };

        #[cfg(target_os = "linux")]
        {
            let _ = Command::new("notify-send")
                .arg("--app-name=dsentry")
                .arg(&notification.title)
                .arg(&body)
                .spawn();
        }

        #[cfg(target_os = "macos")]
        {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                body.replace('"', "\\\""),
                notification.title.replace('"', "\\\"")
            );
            let _ = Command::new("osascript").arg("-e").arg(&script).spawn();
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let _ = body;
        }
    }
}

/// Collecting sink for tests.
#[derive(Default)]
pub struct MemoryAlertSink {
    pub delivered: parking_lot::Mutex<Vec<Notification>>,
}

impl AlertSink for MemoryAlertSink {
    fn alert(&self, notification: &Notification) {
        self.delivered.lock().push(notification.clone());
    }
}

/// Drain notifications from `rx` into `sink` until the channel closes.
pub fn spawn_alert_thread(
    rx: Receiver<Notification>,
    sink: Box<dyn AlertSink>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for notification in rx {
            sink.alert(&notification);
        }
    })
}
