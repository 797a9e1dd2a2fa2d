//! Sentry subsystem: snooze-gated periodic re-evaluation, bounded
//! notification outbox, and channel-fed native alerting.

pub mod alerts;
pub mod outbox;
pub mod scheduler;
pub mod snooze;
