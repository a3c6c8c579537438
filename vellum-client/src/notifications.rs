//! User-visible notifications.
//!
//! The coordinator reports through a [`NotificationSink`] only when the caller
//! did not supply an error handler of its own.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Fire-and-forget surface for user-visible messages.
pub trait NotificationSink: Send + Sync {
    fn report_failure(&self, message: &str);

    fn report_success(&self, _message: &str) {}
}

/// Render the fallback failure message shown when no `on_error` is supplied.
pub fn failure_message(prefix: &str, message: &str) -> String {
    format!("{}: {}", prefix, message)
}

/// In-memory notification list the UI drains on each frame.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    items: Mutex<Vec<Notification>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: Notification) {
        match self.items.lock() {
            Ok(mut items) => items.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }

    /// Take every pending notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        match self.items.lock() {
            Ok(mut items) => std::mem::take(&mut *items),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        match self.items.lock() {
            Ok(items) => items.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for NotificationQueue {
    fn report_failure(&self, message: &str) {
        self.push(Notification::new(NotificationLevel::Error, message));
    }

    fn report_success(&self, message: &str) {
        self.push(Notification::new(NotificationLevel::Success, message));
    }
}

/// Sink for headless use: notifications become log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn report_failure(&self, message: &str) {
        tracing::error!(target: "vellum_client::notify", "{}", message);
    }

    fn report_success(&self, message: &str) {
        tracing::info!(target: "vellum_client::notify", "{}", message);
    }
}
