use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

id_newtype!(MessageId);
id_newtype!(ToastId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Initializing,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub state: SystemState,
    pub message: String,
}

impl SystemStatus {
    pub fn initializing(message: impl Into<String>) -> Self {
        Self {
            state: SystemState::Initializing,
            message: message.into(),
        }
    }

    pub fn ready(message: impl Into<String>) -> Self {
        Self {
            state: SystemState::Ready,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: SystemState::Error,
            message: message.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == SystemState::Ready
    }
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self::initializing("Connecting to backend...")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    #[serde(alias = "txt")]
    Text,
    #[default]
    #[serde(other)]
    Other,
}

impl DocumentKind {
    /// Icon identifier used by front ends when listing the catalog.
    pub fn icon(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "file-pdf",
            DocumentKind::Text => "file-lines",
            DocumentKind::Other => "file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(deserialize_with = "crate::protocol::string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: DocumentKind,
    #[serde(rename = "size", alias = "size_bytes", default)]
    pub size_bytes: u64,
    #[serde(
        rename = "chunks",
        alias = "chunk_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub chunk_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub chunk_total: u64,
    pub embedding_total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Page locator as the backend reports it: loaders emit either a page number
/// or a free-form label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    Number(i64),
    Label(String),
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Number(n) => write!(f, "{n}"),
            PageRef::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub document_name: String,
    pub page: Option<PageRef>,
    pub upload_date: Option<String>,
    pub cross_reference_links: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub sources: Vec<Source>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastNotification {
    pub id: ToastId,
    pub text: String,
    pub kind: ToastKind,
    pub created_at: DateTime<Utc>,
}
