use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::domain::{ToastId, ToastKind, ToastNotification};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::{Clock, ControllerEvent};

/// Self-expiring toasts. Each toast gets its own expiry task, so toasts never
/// wait on each other or on the caller.
pub struct NotificationQueue {
    toasts: Arc<Mutex<Vec<ToastNotification>>>,
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<ControllerEvent>,
    display_for: Duration,
    transition: Duration,
}

impl NotificationQueue {
    pub fn new(
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<ControllerEvent>,
        display_for: Duration,
        transition: Duration,
    ) -> Self {
        Self {
            toasts: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
            clock,
            events,
            display_for,
            transition,
        }
    }

    pub async fn push(&self, text: impl Into<String>, kind: ToastKind) -> ToastId {
        let toast = ToastNotification {
            id: ToastId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            text: text.into(),
            kind,
            created_at: self.clock.now(),
        };
        let id = toast.id;
        debug!(toast_id = id.0, kind = ?kind, text = %toast.text, "toast shown");

        self.toasts.lock().await.push(toast.clone());
        let _ = self.events.send(ControllerEvent::ToastShown(toast));

        let toasts = Arc::clone(&self.toasts);
        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();
        let (display_for, transition) = (self.display_for, self.transition);
        tokio::spawn(async move {
            clock.sleep(display_for).await;
            let _ = events.send(ControllerEvent::ToastExpiring(id));
            clock.sleep(transition).await;
            toasts.lock().await.retain(|toast| toast.id != id);
            let _ = events.send(ControllerEvent::ToastRemoved(id));
        });

        id
    }

    /// Toasts currently on screen, oldest first.
    pub async fn active(&self) -> Vec<ToastNotification> {
        self.toasts.lock().await.clone()
    }
}

#[cfg(test)]
#[path = "tests/notifications_tests.rs"]
mod tests;
