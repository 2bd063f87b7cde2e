use shared::{
    domain::ToastKind,
    error::BackendError,
    protocol::{AuditMeta, RequirementGap},
};

use super::*;
use crate::test_support::{drain, harness, ScriptedBackend};

fn report() -> AuditReport {
    AuditReport {
        meta: AuditMeta {
            page: 1,
            total_pages: 3,
            traceability_score: 87.5,
            total_master: 120,
        },
        gaps: vec![RequirementGap {
            req_id: "R-7".into(),
            description: "Brake light timing".into(),
            status: "missing".into(),
        }],
        orphans: Vec::new(),
        coverage: Vec::new(),
    }
}

#[tokio::test]
async fn report_is_published_and_returned() {
    let mut h = harness(ScriptedBackend::new().with_audit_report(Ok(report())));

    let loaded = h.controller.load_audit_report(1, 25).await;
    assert_eq!(loaded, Some(report()));
    assert_eq!(h.backend.audit_requests.lock().unwrap().clone(), vec![(1, 25)]);

    let events = drain(&mut h.events);
    assert!(events
        .iter()
        .any(|event| matches!(event, ControllerEvent::AuditReportLoaded(r) if r.gaps.len() == 1)));
}

#[tokio::test]
async fn page_and_limit_are_normalized() {
    let h = harness(ScriptedBackend::new().with_audit_report(Ok(report())));

    h.controller.load_audit_report(0, 0).await;
    assert_eq!(
        h.backend.audit_requests.lock().unwrap().clone(),
        vec![(1, DEFAULT_AUDIT_PAGE_SIZE)]
    );
}

#[tokio::test]
async fn failure_raises_error_toast() {
    let mut h = harness(
        ScriptedBackend::new().with_audit_report(Err(BackendError::Malformed("html".into()))),
    );

    assert_eq!(h.controller.load_audit_report(2, 50).await, None);
    let toast = drain(&mut h.events)
        .into_iter()
        .find_map(|event| match event {
            ControllerEvent::ToastShown(toast) => Some(toast),
            _ => None,
        })
        .expect("toast");
    assert_eq!(toast.kind, ToastKind::Error);
    assert_eq!(
        toast.text,
        "Loading the audit report failed: unexpected response from backend"
    );
}
