//! User-visible notification side-channel.
//!
//! Every failed request is reported through a [`NotificationSink`] once,
//! independent of whether the caller also handles the error. The sink is
//! best-effort: implementations must not block and must never fail the
//! request that triggered them.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

/// Default on-screen duration for error notifications.
pub const DEFAULT_ERROR_DURATION: Duration = Duration::from_millis(6000);

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "success",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// A toast/flash message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub duration: Duration,
}

impl Notification {
    /// Creates an error notification with the default duration.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
            duration: DEFAULT_ERROR_DURATION,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Receiver of user-visible notifications.
pub trait NotificationSink: Send + Sync {
    /// Delivers a notification. Must not block.
    fn notify(&self, notification: Notification);
}

/// Sink that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _notification: Notification) {}
}

/// Sink that writes notifications to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                tracing::error!(error = %notification.message, "request failed")
            }
            NotificationLevel::Warning => {
                tracing::warn!(text = %notification.message, "notification")
            }
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(text = %notification.message, level = %notification.level, "notification")
            }
        }
    }
}

/// Sink that forwards notifications to a channel, e.g. a UI toast queue.
///
/// A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        let _ = self.sender.send(notification);
    }
}
