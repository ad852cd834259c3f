//! User-facing notifications
//!
//! The library never prints. Anything the user should see (export finished,
//! session expired, connection dropped) goes through a [`Notifier`], which
//! the front end renders however it likes.

use parking_lot::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Sink for user-facing messages
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.notify(Notification::new(Level::Success, message));
    }

    fn info(&self, message: &str) {
        self.notify(Notification::new(Level::Info, message));
    }

    fn warning(&self, message: &str) {
        self.notify(Notification::new(Level::Warning, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::new(Level::Error, message));
    }
}

/// Writes notifications to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success | Level::Info => info!(target: "ragchat::notify", "{}", notification.message),
            Level::Warning => warn!(target: "ragchat::notify", "{}", notification.message),
            Level::Error => error!(target: "ragchat::notify", "{}", notification.message),
        }
    }
}

/// Keeps every notification in memory, in order
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(|n| n.level == Level::Error)
            .map(|n| n.message)
            .collect()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_notifier_keeps_order() {
        let notifier = CollectingNotifier::new();
        notifier.success("exported");
        notifier.error("boom");
        notifier.warning("careful");

        let seen = notifier.notifications();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], Notification::new(Level::Success, "exported"));
        assert_eq!(notifier.errors(), vec!["boom".to_string()]);
    }
}
