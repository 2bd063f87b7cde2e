use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{
    domain::{CatalogStats, Document, PageRef, Source},
    error::BackendError,
};

pub const STATUS_READY: &str = "ready";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl StatusResponse {
    pub fn is_ready(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_READY)
    }

    pub fn reason(&self) -> Option<&str> {
        pick_reason(self.message.as_deref(), self.msg.as_deref())
    }
}

/// The backend names its reason `message` or `msg`, sometimes both. A
/// non-blank `message` wins.
fn pick_reason<'a>(message: Option<&'a str>, msg: Option<&'a str>) -> Option<&'a str> {
    message
        .filter(|m| !m.trim().is_empty())
        .or_else(|| msg.filter(|m| !m.trim().is_empty()))
}

fn merge_reason(message: Option<String>, msg: Option<String>) -> Option<String> {
    pick_reason(message.as_deref(), msg.as_deref()).map(str::to_string)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<u64>,
}

impl From<StatsPayload> for CatalogStats {
    fn from(value: StatsPayload) -> Self {
        Self {
            chunk_total: value.chunks.unwrap_or(0),
            embedding_total: value.embeddings.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub stats: StatsPayload,
}

/// Envelope shared by upload/refresh/clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl MutationResponse {
    pub fn into_result(self) -> Result<Option<String>, BackendError> {
        let reason = merge_reason(self.message, self.msg);
        if self.success {
            Ok(reason)
        } else {
            Err(BackendError::Rejected(reason))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceabilityPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSource {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceability: Option<TraceabilityPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<String>,
}

impl From<WireSource> for Source {
    fn from(value: WireSource) -> Self {
        Self {
            document_name: value.source,
            page: value.page,
            upload_date: value
                .traceability
                .and_then(|t| t.upload_date)
                .filter(|d| !d.trim().is_empty()),
            cross_reference_links: value.links.filter(|l| !l.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default)]
    pub sources: Vec<WireSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Source>,
}

impl QueryResponse {
    pub fn into_answer(self) -> Result<Answer, BackendError> {
        if !self.success {
            return Err(BackendError::Rejected(merge_reason(self.message, self.msg)));
        }
        let text = self
            .answer
            .ok_or_else(|| BackendError::Malformed("query succeeded without an answer".into()))?;
        Ok(Answer {
            text,
            sources: self.sources.into_iter().map(Source::from).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditMeta {
    pub page: u32,
    pub total_pages: u32,
    pub traceability_score: f64,
    pub total_master: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementGap {
    pub req_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanLink {
    pub req_id: String,
    pub found_in: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementCoverage {
    pub req_id: String,
    #[serde(default)]
    pub found_in: Vec<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub meta: AuditMeta,
    #[serde(default)]
    pub gaps: Vec<RequirementGap>,
    #[serde(default)]
    pub orphans: Vec<OrphanLink>,
    #[serde(default)]
    pub coverage: Vec<RequirementCoverage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterUploadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl MasterUploadResponse {
    pub fn into_result(self) -> Result<u64, BackendError> {
        if self.success {
            Ok(self.count.unwrap_or(0))
        } else {
            Err(BackendError::Rejected(merge_reason(self.message, self.msg)))
        }
    }
}

/// Accepts document ids emitted either as JSON strings or as integers.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(text) => Ok(text),
        Raw::Int(n) => Ok(n.to_string()),
        Raw::Float(n) if n.is_finite() => Ok(n.to_string()),
        Raw::Float(_) => Err(de::Error::custom("document id must be finite")),
    }
}
