use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, PoisonError, RwLock as StdRwLock,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::{Message, MessageId, SystemState, SystemStatus, ToastId, ToastKind, ToastNotification},
    protocol::AuditReport,
};
use tokio::{
    sync::{broadcast, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::debug;

pub mod actions;
mod audit;
pub mod backend;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod format;
pub mod notifications;
pub mod readiness;
pub mod view;

pub use actions::{advisory_upload_check, ActionOutcome, UploadSelection, ACCEPTED_EXTENSIONS};
pub use audit::DEFAULT_AUDIT_PAGE_SIZE;
pub use backend::{DocQaBackend, HttpBackend, UploadFile};
pub use catalog::CatalogSnapshot;
pub use chat::{RejectReason, TurnOutcome};
pub use config::{load_settings, BackendUnavailablePolicy, Settings};
pub use notifications::NotificationQueue;

use chat::ChatState;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Time source for the controller. Injected so readiness retries and toast
/// expiry can be driven deterministically in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Everything a front end needs to render the session. Subscribers receive
/// these in emission order.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    StatusChanged(SystemStatus),
    SubmissionChanged(bool),
    CatalogReplaced { snapshot: CatalogSnapshot, html: String },
    MessageAppended { message: Message, html: String },
    InputCleared,
    TypingStarted(Message),
    TypingStopped(MessageId),
    LoadingStarted(String),
    LoadingFinished,
    ToastShown(ToastNotification),
    ToastExpiring(ToastId),
    ToastRemoved(ToastId),
    AuditReportLoaded(AuditReport),
}

/// Single-slot flag that is released when the guard drops.
pub(crate) struct SlotGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SlotGuard<'a> {
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct DocQaController {
    backend: Arc<dyn DocQaBackend>,
    clock: Arc<dyn Clock>,
    settings: Settings,
    events: broadcast::Sender<ControllerEvent>,
    notifications: NotificationQueue,
    status: StdRwLock<SystemStatus>,
    monitor_running: AtomicBool,
    catalog: RwLock<CatalogSnapshot>,
    catalog_gate: Mutex<()>,
    chat: std::sync::Mutex<ChatState>,
    turn_in_flight: AtomicBool,
    next_message_id: AtomicU64,
}

impl DocQaController {
    pub fn new(
        backend: Arc<dyn DocQaBackend>,
        clock: Arc<dyn Clock>,
        settings: Settings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let notifications = NotificationQueue::new(
            Arc::clone(&clock),
            events.clone(),
            settings.toast_duration,
            settings.toast_transition,
        );
        Arc::new(Self {
            backend,
            clock,
            settings,
            events,
            notifications,
            status: StdRwLock::new(SystemStatus::default()),
            monitor_running: AtomicBool::new(false),
            catalog: RwLock::new(CatalogSnapshot::default()),
            catalog_gate: Mutex::new(()),
            chat: std::sync::Mutex::new(ChatState::default()),
            turn_in_flight: AtomicBool::new(false),
            next_message_id: AtomicU64::new(1),
        })
    }

    /// Kicks off readiness polling and the first catalog load. Both run on
    /// their own tasks and do not wait for each other.
    pub fn start(self: &Arc<Self>) -> (JoinHandle<SystemState>, JoinHandle<ActionOutcome>) {
        let readiness = self.spawn_readiness_monitor();
        let controller = Arc::clone(self);
        let catalog = tokio::spawn(async move { controller.load_documents().await });
        (readiness, catalog)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn status(&self) -> SystemStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a chat submission would currently be accepted.
    pub fn can_submit(&self) -> bool {
        self.status().is_ready() && !self.turn_in_flight.load(Ordering::Acquire)
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub async fn notify(&self, text: impl Into<String>, kind: ToastKind) -> ToastId {
        self.notifications.push(text, kind).await
    }

    pub(crate) fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn publish_submission_state(&self) {
        let enabled = self.can_submit();
        debug!(enabled, "submission state changed");
        self.emit(ControllerEvent::SubmissionChanged(enabled));
    }

    pub(crate) fn allocate_message_id(&self) -> MessageId {
        MessageId(self.next_message_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::SlotGuard;

    #[test]
    fn slot_guard_is_exclusive_until_dropped() {
        let flag = AtomicBool::new(false);
        let first = SlotGuard::try_acquire(&flag).expect("first acquire");
        assert!(SlotGuard::try_acquire(&flag).is_none());
        drop(first);
        assert!(SlotGuard::try_acquire(&flag).is_some());
    }
}
