//! Plain-text rendering of controller events on stdout.

use client_core::{
    format::format_file_size,
    view::{upload_date_display, EMPTY_CATALOG_TEXT},
    CatalogSnapshot, ControllerEvent,
};
use shared::{
    domain::{Message, Role, SystemState, ToastKind},
    protocol::AuditReport,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

pub async fn run(mut events: broadcast::Receiver<ControllerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                for line in describe(&event) {
                    println!("{line}");
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "renderer fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

pub fn describe(event: &ControllerEvent) -> Vec<String> {
    match event {
        ControllerEvent::StatusChanged(status) => {
            let state = match status.state {
                SystemState::Initializing => "initializing",
                SystemState::Ready => "ready",
                SystemState::Error => "error",
            };
            vec![format!("[{state}] {}", status.message)]
        }
        ControllerEvent::CatalogReplaced { snapshot, .. } => describe_catalog(snapshot),
        ControllerEvent::MessageAppended { message, .. } => describe_message(message),
        ControllerEvent::TypingStarted(placeholder) => {
            vec![format!("assistant> {}", placeholder.text)]
        }
        ControllerEvent::LoadingStarted(label) => vec![format!("... {label}")],
        ControllerEvent::ToastShown(toast) => {
            let kind = match toast.kind {
                ToastKind::Success => "ok",
                ToastKind::Error => "error",
                ToastKind::Info => "info",
            };
            vec![format!("({kind}) {}", toast.text)]
        }
        ControllerEvent::AuditReportLoaded(report) => describe_audit(report),
        ControllerEvent::SubmissionChanged(_)
        | ControllerEvent::InputCleared
        | ControllerEvent::TypingStopped(_)
        | ControllerEvent::LoadingFinished
        | ControllerEvent::ToastExpiring(_)
        | ControllerEvent::ToastRemoved(_) => Vec::new(),
    }
}

fn describe_catalog(snapshot: &CatalogSnapshot) -> Vec<String> {
    let mut header = snapshot.count_label();
    if snapshot.stale {
        header.push_str(" (last known)");
    }
    let mut lines = vec![header];
    if snapshot.is_empty() {
        lines.push(format!("  {EMPTY_CATALOG_TEXT}"));
    }
    for document in &snapshot.documents {
        let mut line = format!(
            "  [{}] {} {}",
            document.kind.icon(),
            document.name,
            format_file_size(document.size_bytes)
        );
        if let Some(chunks) = document.chunk_count {
            line.push_str(&format!(", {chunks} chunks"));
        }
        lines.push(line);
    }
    lines.push(format!(
        "  chunks: {}  embeddings: {}",
        snapshot.stats.chunk_total, snapshot.stats.embedding_total
    ));
    lines
}

fn describe_message(message: &Message) -> Vec<String> {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let mut lines = vec![format!("{speaker}> {}", message.text)];
    for source in &message.sources {
        let mut line = format!("  - {}", source.document_name);
        if let Some(page) = &source.page {
            line.push_str(&format!(", page {page}"));
        }
        if let Some(date) = &source.upload_date {
            line.push_str(&format!(", uploaded {}", upload_date_display(date)));
        }
        if let Some(links) = &source.cross_reference_links {
            line.push_str(&format!(", links: {links}"));
        }
        lines.push(line);
    }
    lines
}

fn describe_audit(report: &AuditReport) -> Vec<String> {
    let meta = &report.meta;
    let mut lines = vec![format!(
        "Traceability {:.1}% of {} requirements (page {}/{})",
        meta.traceability_score, meta.total_master, meta.page, meta.total_pages
    )];
    for gap in &report.gaps {
        lines.push(format!("  gap {}: {} [{}]", gap.req_id, gap.description, gap.status));
    }
    for orphan in &report.orphans {
        lines.push(format!("  orphan {} in {}", orphan.req_id, orphan.found_in));
    }
    lines
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shared::domain::{CatalogStats, Document, DocumentKind, MessageId, PageRef, Source};

    use super::*;

    #[test]
    fn catalog_lists_documents_with_sizes() {
        let snapshot = CatalogSnapshot {
            documents: vec![Document {
                id: "1".into(),
                name: "manual.pdf".into(),
                kind: DocumentKind::Pdf,
                size_bytes: 1536,
                chunk_count: Some(4),
            }],
            stats: CatalogStats {
                chunk_total: 4,
                embedding_total: 4,
            },
            stale: true,
        };
        assert_eq!(
            describe(&ControllerEvent::CatalogReplaced {
                snapshot,
                html: String::new(),
            }),
            vec![
                "1 Document (last known)".to_string(),
                "  [file-pdf] manual.pdf 1.5 KB, 4 chunks".to_string(),
                "  chunks: 4  embeddings: 4".to_string(),
            ]
        );
    }

    #[test]
    fn answer_lists_its_sources() {
        let message = Message {
            id: MessageId(2),
            role: Role::Assistant,
            text: "12 V".into(),
            sources: vec![Source {
                document_name: "manual.pdf".into(),
                page: Some(PageRef::Number(4)),
                upload_date: Some("2024-03-01 10:22:00".into()),
                cross_reference_links: None,
            }],
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        };
        let lines = describe(&ControllerEvent::MessageAppended {
            message,
            html: String::new(),
        });
        assert_eq!(
            lines,
            vec![
                "assistant> 12 V".to_string(),
                "  - manual.pdf, page 4, uploaded 2024-03-01".to_string(),
            ]
        );
    }

    #[test]
    fn empty_catalog_prints_the_shared_placeholder() {
        let lines = describe(&ControllerEvent::CatalogReplaced {
            snapshot: CatalogSnapshot::default(),
            html: String::new(),
        });
        assert_eq!(lines[0], "0 Documents");
        assert_eq!(lines[1], format!("  {EMPTY_CATALOG_TEXT}"));
    }

    #[test]
    fn bookkeeping_events_print_nothing() {
        assert!(describe(&ControllerEvent::InputCleared).is_empty());
        assert!(describe(&ControllerEvent::LoadingFinished).is_empty());
    }
}
