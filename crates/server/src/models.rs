//! Data models for the sealdesk API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signing::SignaturePlacement;
use sqlx::FromRow;

/// Document status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    Pending,
    Signed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "PENDING",
            DocumentStatus::Signed => "SIGNED",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document row without the stored file contents
#[derive(Debug, Clone, FromRow)]
pub struct DbDocument {
    pub id: String,
    pub name: String,
    pub original_url: String,
    pub signed_url: Option<String>,
    pub status: String,
    pub deletion_requested: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Document as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub original_url: String,
    pub signed_url: Option<String>,
    pub status: DocumentStatus,
    pub deletion_requested: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbDocument> for Document {
    fn from(row: DbDocument) -> Self {
        let status = match row.status.as_str() {
            "SIGNED" => DocumentStatus::Signed,
            _ => DocumentStatus::Pending,
        };

        Self {
            id: row.id,
            name: row.name,
            original_url: row.original_url,
            signed_url: row.signed_url,
            status,
            deletion_requested: row.deletion_requested,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Upload request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Original file name, as chosen by the uploader
    pub name: String,
    pub pdf_base64: String,
}

/// Document update request
#[derive(Debug, Clone, Deserialize)]
pub struct SignRequest {
    pub placements: Vec<SignaturePlacement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Base64Response {
    pub base64: String,
}

/// Settings visible without logging in
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    pub client_welcome_message: String,
    pub viewer_worker_url: String,
}
