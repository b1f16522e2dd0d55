//! Transient user notifications.
//!
//! Every call to [`Notifier::notify`] posts a message that retires itself after
//! a fixed time-to-live, independent of any later notifications. Several can be
//! visible at once. There is no deduplication and, unless `max_visible` is set,
//! no upper bound on how many accumulate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Danger,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Danger => write!(f, "danger"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    pub posted_at: DateTime<Utc>,
}

/// Shared handle; clones post into the same queue.
#[derive(Debug, Clone)]
pub struct Notifier {
    visible: Arc<Mutex<VecDeque<Notification>>>,
    ttl: Duration,
    max_visible: Option<usize>,
    events: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, None)
    }
}

impl Notifier {
    pub fn new(ttl: Duration, max_visible: Option<usize>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            visible: Arc::new(Mutex::new(VecDeque::new())),
            ttl,
            max_visible: max_visible.filter(|max| *max > 0),
            events,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Post a message and schedule its retirement. Must be called from within
    /// a tokio runtime.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            severity,
            posted_at: Utc::now(),
        };
        let id = notification.id;
        debug!(%id, %severity, message = %notification.message, "notification posted");

        {
            let mut visible = self.lock();
            if let Some(max) = self.max_visible {
                while visible.len() >= max {
                    visible.pop_front();
                }
            }
            visible.push_back(notification.clone());
        }

        // No subscribers is fine.
        let _ = self.events.send(notification);

        let visible = Arc::clone(&self.visible);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut visible = visible.lock().unwrap_or_else(|e| e.into_inner());
            visible.retain(|n| n.id != id);
        });

        id
    }

    /// Messages currently on screen, oldest first.
    pub fn visible(&self) -> Vec<Notification> {
        self.lock().iter().cloned().collect()
    }

    /// Stream of every notification posted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.visible.lock().unwrap_or_else(|e| e.into_inner())
    }
}
