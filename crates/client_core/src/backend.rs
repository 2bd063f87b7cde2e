//! The HTTP contract of the document Q&A backend, and its reqwest client.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder,
};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    error::BackendError,
    protocol::{
        Answer, AuditReport, DocumentsResponse, MasterUploadResponse, MutationResponse,
        QueryRequest, QueryResponse, StatusResponse,
    },
};
use tracing::{debug, warn};

use crate::config::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub async fn read(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("'{}' has no file name", path.display()))?;
        Ok(Self::new(file_name, bytes))
    }
}

#[async_trait]
pub trait DocQaBackend: Send + Sync {
    async fn status(&self) -> Result<StatusResponse, BackendError>;
    async fn documents(&self) -> Result<DocumentsResponse, BackendError>;
    async fn upload(&self, files: Vec<UploadFile>) -> Result<Option<String>, BackendError>;
    async fn refresh(&self) -> Result<Option<String>, BackendError>;
    async fn clear(&self) -> Result<Option<String>, BackendError>;
    async fn query(&self, query: &str) -> Result<Answer, BackendError>;
    async fn audit_report(&self, page: u32, limit: u32) -> Result<AuditReport, BackendError>;
    async fn upload_master_list(&self, file: UploadFile) -> Result<u64, BackendError>;
}

/// Error bodies come from the app (`msg`/`message`) or from the framework
/// itself (`detail`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        let non_blank = |m: &String| !m.trim().is_empty();
        self.message
            .filter(non_blank)
            .or_else(|| self.msg.filter(non_blank))
            .or_else(|| match self.detail {
                Some(serde_json::Value::String(detail)) => Some(detail),
                Some(serde_json::Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            })
    }
}

pub struct HttpBackend {
    http: Client,
    api_root: String,
}

impl HttpBackend {
    pub fn new(api_root: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_root)
    }

    pub fn with_client(http: Client, api_root: impl Into<String>) -> Self {
        let api_root = api_root.into();
        Self {
            http,
            api_root: api_root.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(http, settings.api_root.clone()))
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path.trim_start_matches('/'))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        debug!(status = status.as_u16(), bytes = body.len(), "backend response");

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_message);
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|err| BackendError::Malformed(err.to_string()))
    }
}

/// The MIME type is only a hint; an unparsable one is left off the part.
fn file_part(file: UploadFile) -> Result<Part, BackendError> {
    let mime = file.mime_type.filter(|mime| match mime.parse::<mime_guess::Mime>() {
        Ok(_) => true,
        Err(err) => {
            warn!(file = %file.file_name, mime = %mime, error = %err, "dropping invalid mime type");
            false
        }
    });
    let part = Part::bytes(file.bytes).file_name(file.file_name);
    match mime {
        Some(mime) => part
            .mime_str(&mime)
            .map_err(|err| BackendError::Malformed(format!("invalid mime type {mime}: {err}"))),
        None => Ok(part),
    }
}

#[async_trait]
impl DocQaBackend for HttpBackend {
    async fn status(&self) -> Result<StatusResponse, BackendError> {
        self.send_json(self.http.get(self.url("status"))).await
    }

    async fn documents(&self) -> Result<DocumentsResponse, BackendError> {
        self.send_json(self.http.get(self.url("documents"))).await
    }

    async fn upload(&self, files: Vec<UploadFile>) -> Result<Option<String>, BackendError> {
        let mut form = Form::new();
        for file in files {
            form = form.part("files", file_part(file)?);
        }
        let response: MutationResponse = self
            .send_json(self.http.post(self.url("upload")).multipart(form))
            .await?;
        response.into_result()
    }

    async fn refresh(&self) -> Result<Option<String>, BackendError> {
        let response: MutationResponse = self.send_json(self.http.post(self.url("refresh"))).await?;
        response.into_result()
    }

    async fn clear(&self) -> Result<Option<String>, BackendError> {
        let response: MutationResponse = self.send_json(self.http.post(self.url("clear"))).await?;
        response.into_result()
    }

    async fn query(&self, query: &str) -> Result<Answer, BackendError> {
        let response: QueryResponse = self
            .send_json(self.http.post(self.url("query")).json(&QueryRequest {
                query: query.to_string(),
            }))
            .await?;
        response.into_answer()
    }

    async fn audit_report(&self, page: u32, limit: u32) -> Result<AuditReport, BackendError> {
        self.send_json(
            self.http
                .get(self.url("traceability/audit-report"))
                .query(&[("page", page), ("limit", limit)]),
        )
        .await
    }

    async fn upload_master_list(&self, file: UploadFile) -> Result<u64, BackendError> {
        let form = Form::new().part("file", file_part(file)?);
        let response: MasterUploadResponse = self
            .send_json(
                self.http
                    .post(self.url("traceability/master-upload"))
                    .multipart(form),
            )
            .await?;
        response.into_result()
    }
}
