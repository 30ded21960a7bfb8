//! User-facing notices.
//!
//! Components that need to tell the user something (a rolled-back reorder,
//! an expired session, a realtime outage) publish a [`Notice`] here. The UI
//! layer subscribes and renders them as toasts. Publishing never blocks and
//! never fails: with no subscribers the notice is dropped.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Cloneable handle to the notice bus.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn publish(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
        };
        tracing::debug!(level = ?notice.level, message = %notice.message, "Notice published");
        let _ = self.tx.send(notice);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message);
    }
}
