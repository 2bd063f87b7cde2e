use shared::{domain::ToastKind, protocol::AuditReport};
use tracing::{info, warn};

use crate::{ControllerEvent, DocQaController};

pub const DEFAULT_AUDIT_PAGE_SIZE: u32 = 50;

impl DocQaController {
    /// Fetches one page of the requirement traceability gap report.
    pub async fn load_audit_report(&self, page: u32, limit: u32) -> Option<AuditReport> {
        let page = page.max(1);
        let limit = if limit == 0 { DEFAULT_AUDIT_PAGE_SIZE } else { limit };

        match self.backend.audit_report(page, limit).await {
            Ok(report) => {
                info!(
                    page = report.meta.page,
                    total_pages = report.meta.total_pages,
                    score = report.meta.traceability_score,
                    "audit report loaded"
                );
                self.emit(ControllerEvent::AuditReportLoaded(report.clone()));
                Some(report)
            }
            Err(err) => {
                warn!(page, error = %err, code = ?err.code(), "audit report failed");
                self.notifications
                    .push(err.user_message("Loading the audit report"), ToastKind::Error)
                    .await;
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/audit_tests.rs"]
mod tests;
