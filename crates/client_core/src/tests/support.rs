use std::{
    collections::VecDeque,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shared::{
    domain::{Document, DocumentKind, PageRef, Source},
    error::BackendError,
    protocol::{Answer, AuditReport, DocumentsResponse, StatsPayload, StatusResponse},
};
use tokio::sync::{broadcast, Notify};

use crate::{
    backend::{DocQaBackend, UploadFile},
    config::Settings,
    Clock, ControllerEvent, DocQaController,
};

type Script<T> = StdMutex<VecDeque<Result<T, BackendError>>>;

/// In-memory backend answering from per-endpoint scripts. An exhausted
/// script answers with a transport failure.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    pub statuses: Script<StatusResponse>,
    pub documents: Script<DocumentsResponse>,
    pub mutations: Script<Option<String>>,
    pub answers: Script<Answer>,
    pub audit_reports: Script<AuditReport>,
    pub master_imports: Script<u64>,
    pub calls: StdMutex<Vec<&'static str>>,
    pub queries: StdMutex<Vec<String>>,
    pub uploaded: StdMutex<Vec<Vec<String>>>,
    pub audit_requests: StdMutex<Vec<(u32, u32)>>,
    /// When set, queries and mutations wait for a permit before answering.
    pub hold: Option<Arc<Notify>>,
}

fn next<T>(script: &Script<T>) -> Result<T, BackendError> {
    script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(BackendError::Transport("no scripted response".into())))
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(hold: Arc<Notify>) -> Self {
        Self {
            hold: Some(hold),
            ..Self::default()
        }
    }

    pub fn with_status(self, status: &str) -> Self {
        self.statuses.lock().unwrap().push_back(Ok(StatusResponse {
            status: status.to_string(),
            message: None,
            msg: None,
        }));
        self
    }

    pub fn with_status_error(self, err: BackendError) -> Self {
        self.statuses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_documents(self, documents: Vec<Document>, chunks: Option<u64>, embeddings: Option<u64>) -> Self {
        self.documents.lock().unwrap().push_back(Ok(DocumentsResponse {
            documents,
            stats: StatsPayload { chunks, embeddings },
        }));
        self
    }

    pub fn with_documents_error(self, err: BackendError) -> Self {
        self.documents.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_mutation(self, result: Result<Option<String>, BackendError>) -> Self {
        self.mutations.lock().unwrap().push_back(result);
        self
    }

    pub fn with_answer(self, result: Result<Answer, BackendError>) -> Self {
        self.answers.lock().unwrap().push_back(result);
        self
    }

    pub fn with_audit_report(self, result: Result<AuditReport, BackendError>) -> Self {
        self.audit_reports.lock().unwrap().push_back(result);
        self
    }

    pub fn with_master_import(self, result: Result<u64, BackendError>) -> Self {
        self.master_imports.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| **call == name).count()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_for_permit(&self) {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
    }
}

#[async_trait]
impl DocQaBackend for ScriptedBackend {
    async fn status(&self) -> Result<StatusResponse, BackendError> {
        self.record("status");
        next(&self.statuses)
    }

    async fn documents(&self) -> Result<DocumentsResponse, BackendError> {
        self.record("documents");
        next(&self.documents)
    }

    async fn upload(&self, files: Vec<UploadFile>) -> Result<Option<String>, BackendError> {
        self.record("upload");
        self.uploaded
            .lock()
            .unwrap()
            .push(files.into_iter().map(|f| f.file_name).collect());
        self.wait_for_permit().await;
        next(&self.mutations)
    }

    async fn refresh(&self) -> Result<Option<String>, BackendError> {
        self.record("refresh");
        self.wait_for_permit().await;
        next(&self.mutations)
    }

    async fn clear(&self) -> Result<Option<String>, BackendError> {
        self.record("clear");
        self.wait_for_permit().await;
        next(&self.mutations)
    }

    async fn query(&self, query: &str) -> Result<Answer, BackendError> {
        self.record("query");
        self.queries.lock().unwrap().push(query.to_string());
        self.wait_for_permit().await;
        next(&self.answers)
    }

    async fn audit_report(&self, page: u32, limit: u32) -> Result<AuditReport, BackendError> {
        self.record("audit_report");
        self.audit_requests.lock().unwrap().push((page, limit));
        next(&self.audit_reports)
    }

    async fn upload_master_list(&self, _file: UploadFile) -> Result<u64, BackendError> {
        self.record("upload_master_list");
        next(&self.master_imports)
    }
}

/// Fixed wall clock; sleeps are recorded and return after a yield.
pub(crate) struct ManualClock {
    now: DateTime<Utc>,
    sleeps: StdMutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            sleeps: StdMutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

pub(crate) struct Harness {
    pub controller: Arc<DocQaController>,
    pub backend: Arc<ScriptedBackend>,
    pub clock: Arc<ManualClock>,
    pub events: broadcast::Receiver<ControllerEvent>,
}

pub(crate) fn harness(backend: ScriptedBackend) -> Harness {
    harness_with_settings(backend, Settings::default())
}

pub(crate) fn harness_with_settings(backend: ScriptedBackend, settings: Settings) -> Harness {
    let backend = Arc::new(backend);
    let clock = Arc::new(ManualClock::new());
    let controller = DocQaController::new(backend.clone(), clock.clone(), settings);
    let events = controller.subscribe_events();
    Harness {
        controller,
        backend,
        clock,
        events,
    }
}

/// Harness whose first scripted status is already consumed as `ready`.
pub(crate) async fn ready_harness(backend: ScriptedBackend) -> Harness {
    ready_harness_with_settings(backend, Settings::default()).await
}

pub(crate) async fn ready_harness_with_settings(
    backend: ScriptedBackend,
    settings: Settings,
) -> Harness {
    let mut h = harness_with_settings(backend, settings);
    h.backend.statuses.lock().unwrap().push_front(Ok(StatusResponse {
        status: "ready".into(),
        message: None,
        msg: None,
    }));
    h.controller.check_status().await;
    drain(&mut h.events);
    h
}

/// Everything emitted so far.
pub(crate) fn drain(rx: &mut broadcast::Receiver<ControllerEvent>) -> Vec<ControllerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Waits (bounded) until an event matching `pred` arrives.
pub(crate) async fn wait_for(
    rx: &mut broadcast::Receiver<ControllerEvent>,
    pred: impl Fn(&ControllerEvent) -> bool,
) -> ControllerEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(err) => panic!("event stream closed: {err}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

pub(crate) fn document(id: &str, name: &str, kind: DocumentKind, size_bytes: u64) -> Document {
    Document {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        size_bytes,
        chunk_count: None,
    }
}

pub(crate) fn answer(text: &str) -> Answer {
    Answer {
        text: text.to_string(),
        sources: vec![Source {
            document_name: "manual.pdf".into(),
            page: Some(PageRef::Number(3)),
            upload_date: Some("2024-03-01 10:22:00".into()),
            cross_reference_links: None,
        }],
    }
}
