//! Notifications and the bounded outbox the external layer consumes from.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// Category of a sentry notification. Doubles as the snooze-map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Screenshots,
    Storage,
    Security,
}

/// Suggested action attached to a notification. One variant per action kind,
/// each carrying its own typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationAction {
    OrganizeScreenshots { sector: String },
    OrganizeDownloads { sector: String },
    ReviewThreats { malicious_count: usize },
}

impl NotificationAction {
    /// Short prompt shown alongside the notification body.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self {
            Self::OrganizeScreenshots { .. } => "Organize screenshots now?".to_string(),
            Self::OrganizeDownloads { .. } => "Sort downloads into folders?".to_string(),
            Self::ReviewThreats { malicious_count } => {
                format!("Review {malicious_count} flagged files?")
            }
        }
    }
}

/// A sentry-generated notification. Consumed or dismissed by the external
/// layer; either path snoozes its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<NotificationAction>,
}

/// Outbox keeps only the most recent notifications.
pub const OUTBOX_CAPACITY: usize = 3;

/// Bounded notification outbox. Older entries beyond capacity are dropped;
/// the scheduler logs every drop so unacknowledged alerts stay observable.
#[derive(Debug, Default)]
pub struct Outbox {
    entries: Vec<Notification>,
    next_id: u64,
}

impl Outbox {
    /// Allocate the next notification id.
    pub fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Append a notification, truncating to the most recent
    /// [`OUTBOX_CAPACITY`]. Returns the entries that were dropped.
    pub fn push(&mut self, notification: Notification) -> Vec<Notification> {
        self.entries.push(notification);
        if self.entries.len() > OUTBOX_CAPACITY {
            let overflow = self.entries.len() - OUTBOX_CAPACITY;
            self.entries.drain(..overflow).collect()
        } else {
            Vec::new()
        }
    }

    /// Current entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    /// Remove and return the notification with `id`.
    pub fn remove(&mut self, id: u64) -> Option<Notification> {
        let idx = self.entries.iter().position(|n| n.id == id)?;
        Some(self.entries.remove(idx))
    }
}
