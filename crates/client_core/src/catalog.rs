use shared::domain::{CatalogStats, Document, ToastKind};
use tracing::{info, warn};

use crate::{
    actions::ActionOutcome,
    config::BackendUnavailablePolicy,
    view::{self, document_count_label},
    ControllerEvent, DocQaController,
};

/// Local mirror of the remote catalog. Always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub documents: Vec<Document>,
    pub stats: CatalogStats,
    /// Set when a reload failed and the previous snapshot was kept.
    pub stale: bool,
}

impl CatalogSnapshot {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn count_label(&self) -> String {
        document_count_label(self.documents.len())
    }
}

impl DocQaController {
    pub async fn catalog(&self) -> CatalogSnapshot {
        self.catalog.read().await.clone()
    }

    /// Fetches the catalog and replaces the local copy. Waits for any running
    /// mutation so a reload never interleaves with one.
    pub async fn load_documents(&self) -> ActionOutcome {
        let _gate = self.catalog_gate.lock().await;
        self.load_documents_locked().await
    }

    /// Caller must hold `catalog_gate`.
    pub(crate) async fn load_documents_locked(&self) -> ActionOutcome {
        match self.backend.documents().await {
            Ok(response) => {
                let snapshot = CatalogSnapshot {
                    documents: response.documents,
                    stats: response.stats.into(),
                    stale: false,
                };
                info!(
                    documents = snapshot.documents.len(),
                    chunks = snapshot.stats.chunk_total,
                    embeddings = snapshot.stats.embedding_total,
                    "catalog replaced"
                );
                self.replace_catalog(snapshot).await;
                ActionOutcome::Completed
            }
            Err(err) => {
                warn!(error = %err, code = ?err.code(), "catalog load failed");
                match self.settings.on_backend_unavailable {
                    BackendUnavailablePolicy::SurfaceError => {
                        self.replace_catalog(CatalogSnapshot::default()).await;
                        self.notifications
                            .push(err.user_message("Loading documents"), ToastKind::Error)
                            .await;
                    }
                    BackendUnavailablePolicy::Degrade => {
                        let snapshot = {
                            let mut guard = self.catalog.write().await;
                            guard.stale = true;
                            guard.clone()
                        };
                        self.publish_catalog(snapshot);
                        self.notifications
                            .push(
                                "Document service unreachable; showing the last known catalog",
                                ToastKind::Info,
                            )
                            .await;
                    }
                }
                ActionOutcome::Failed
            }
        }
    }

    async fn replace_catalog(&self, snapshot: CatalogSnapshot) {
        *self.catalog.write().await = snapshot.clone();
        self.publish_catalog(snapshot);
    }

    fn publish_catalog(&self, snapshot: CatalogSnapshot) {
        let html = view::render_catalog(&snapshot);
        self.emit(ControllerEvent::CatalogReplaced { snapshot, html });
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
