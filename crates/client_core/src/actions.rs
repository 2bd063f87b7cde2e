//! Catalog-mutating actions: upload, refresh, clear and the requirement list
//! import. All of them run behind the catalog gate, one at a time.

use std::{path::Path, sync::Arc};

use shared::{domain::ToastKind, error::BackendError};
use tracing::{error, info};

use crate::{backend::UploadFile, ControllerEvent, DocQaController};

/// Extensions the backend accepts. Used only to warn at selection time; the
/// backend validates uploads itself.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    "pdf", "txt", "csv", "xlsx", "png", "jpg", "jpeg", "docx", "pptx",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Failed,
    /// Nothing to do, no request was issued.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSelection {
    pub accepted: Vec<String>,
    pub unexpected: Vec<String>,
}

pub fn advisory_upload_check<'a>(names: impl IntoIterator<Item = &'a str>) -> UploadSelection {
    let mut selection = UploadSelection::default();
    for name in names {
        let accepted = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                ACCEPTED_EXTENSIONS
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false);
        if accepted {
            selection.accepted.push(name.to_string());
        } else {
            selection.unexpected.push(name.to_string());
        }
    }
    selection
}

enum Mutation {
    Upload(Vec<UploadFile>),
    Refresh,
    Clear,
}

impl Mutation {
    fn name(&self) -> &'static str {
        match self {
            Mutation::Upload(_) => "Upload",
            Mutation::Refresh => "Refresh",
            Mutation::Clear => "Clear",
        }
    }

    fn loading_label(&self) -> String {
        match self {
            Mutation::Upload(files) if files.len() == 1 => "Uploading 1 file...".to_string(),
            Mutation::Upload(files) => format!("Uploading {} files...", files.len()),
            Mutation::Refresh => "Rebuilding the document index. This may take a while...".to_string(),
            Mutation::Clear => "Removing all documents...".to_string(),
        }
    }

    fn success_text(&self) -> &'static str {
        match self {
            Mutation::Upload(_) => "Files uploaded",
            Mutation::Refresh => "Document index rebuilt",
            Mutation::Clear => "All documents removed",
        }
    }
}

/// Blocking loading indicator; dismissed when dropped.
struct LoadingGuard<'a> {
    controller: &'a DocQaController,
}

impl<'a> LoadingGuard<'a> {
    fn show(controller: &'a DocQaController, label: String) -> Self {
        controller.emit(ControllerEvent::LoadingStarted(label));
        Self { controller }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.controller.emit(ControllerEvent::LoadingFinished);
    }
}

impl DocQaController {
    pub async fn upload_documents(&self, files: Vec<UploadFile>) -> ActionOutcome {
        if files.is_empty() {
            return ActionOutcome::Skipped;
        }
        self.run_mutation(Mutation::Upload(files)).await
    }

    /// Rebuilds the backend index. The backend turns ready once this
    /// succeeds, so a stopped readiness monitor is started again.
    pub async fn refresh_index(self: &Arc<Self>) -> ActionOutcome {
        let outcome = self.run_mutation(Mutation::Refresh).await;
        if outcome == ActionOutcome::Completed {
            let _ = self.recheck_status();
        }
        outcome
    }

    pub async fn clear_documents(&self) -> ActionOutcome {
        self.run_mutation(Mutation::Clear).await
    }

    /// Imports the master requirement list (CSV) used by the audit report.
    pub async fn import_master_list(&self, file: UploadFile) -> ActionOutcome {
        let _gate = self.catalog_gate.lock().await;
        let file_name = file.file_name.clone();
        let result = {
            let _loading = LoadingGuard::show(self, format!("Importing requirements from {file_name}..."));
            self.backend.upload_master_list(file).await
        };
        match result {
            Ok(count) => {
                info!(file = %file_name, count, "master requirement list imported");
                self.notifications
                    .push(format!("Imported {count} requirements"), ToastKind::Success)
                    .await;
                ActionOutcome::Completed
            }
            Err(err) => {
                error!(
                    file = %file_name,
                    error = %err,
                    code = ?err.code(),
                    "master requirement import failed"
                );
                self.notifications
                    .push(err.user_message("Requirement import"), ToastKind::Error)
                    .await;
                ActionOutcome::Failed
            }
        }
    }

    async fn run_mutation(&self, mutation: Mutation) -> ActionOutcome {
        let _gate = self.catalog_gate.lock().await;
        let name = mutation.name();
        let success_text = mutation.success_text();

        let result = {
            let _loading = LoadingGuard::show(self, mutation.loading_label());
            self.perform(mutation).await
        };

        match result {
            Ok(message) => {
                info!(action = name, message = ?message, "mutation succeeded");
                let text = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| success_text.to_string());
                self.notifications.push(text, ToastKind::Success).await;
                self.load_documents_locked().await;
                ActionOutcome::Completed
            }
            Err(err) => {
                error!(action = name, error = %err, code = ?err.code(), "mutation failed");
                self.notifications
                    .push(err.user_message(name), ToastKind::Error)
                    .await;
                ActionOutcome::Failed
            }
        }
    }

    async fn perform(&self, mutation: Mutation) -> Result<Option<String>, BackendError> {
        match mutation {
            Mutation::Upload(files) => self.backend.upload(files).await,
            Mutation::Refresh => self.backend.refresh().await,
            Mutation::Clear => self.backend.clear().await,
        }
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
