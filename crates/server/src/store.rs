//! Document store: PDF files on disk with database copies
//!
//! Every file is written under the upload directory and also kept as a blob
//! in the `documents` row, so reads survive a wiped or ephemeral disk.

use chrono::Utc;
use signing::{CompositorConfig, Placement};
use sqlx::sqlite::SqlitePool;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{DbDocument, Document, DocumentStatus};

/// Public URL prefix of stored files
pub const UPLOAD_URL_PREFIX: &str = "/uploads/";

const DOCUMENT_COLUMNS: &str = "id, name, original_url, signed_url, status, \
     deletion_requested, is_deleted, created_at, updated_at";

/// Turn a user-supplied file name into a safe, URL-friendly one
///
/// Turkish letters are transliterated, whitespace becomes `-`, and anything
/// outside `[a-z0-9.-]` is dropped.
pub fn sanitize_filename(name: &str) -> String {
    let transliterated: String = name
        .chars()
        .map(|c| match c {
            'ğ' => 'g',
            'Ğ' => 'G',
            'ü' => 'u',
            'Ü' => 'U',
            'ş' => 's',
            'Ş' => 'S',
            'ı' => 'i',
            'İ' => 'I',
            'ö' => 'o',
            'Ö' => 'O',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect();

    let mut sanitized = String::with_capacity(transliterated.len());
    let mut in_whitespace = false;
    for c in transliterated.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                sanitized.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-' {
            sanitized.push(c);
        }
    }

    let mut collapsed = String::with_capacity(sanitized.len());
    for c in sanitized.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

/// Stored file name behind a `/uploads/...` URL
fn file_name_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(UPLOAD_URL_PREFIX).filter(|n| !n.is_empty())
}

pub struct DocumentStore {
    db: SqlitePool,
    upload_dir: PathBuf,
}

impl DocumentStore {
    pub fn new(db: SqlitePool, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Resolve a relative file name inside the upload directory
    fn resolve(&self, file_name: &str) -> Result<PathBuf, ApiError> {
        let mut path = self.upload_dir.clone();
        for segment in file_name.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(ApiError::InvalidRequest(format!(
                    "Invalid file path: {}",
                    file_name
                )));
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// Non-deleted documents, newest first
    pub async fn list(&self) -> Result<Vec<Document>, ApiError> {
        let rows: Vec<DbDocument> = sqlx::query_as(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE is_deleted = 0 \
             ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Document, ApiError> {
        let row: Option<DbDocument> = sqlx::query_as(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Document::from)
            .ok_or_else(|| ApiError::NotFound(format!("Document not found: {}", id)))
    }

    /// Store a new PDF and create its `PENDING` record
    pub async fn upload(&self, name: &str, pdf: Vec<u8>) -> Result<Document, ApiError> {
        if !pdf.starts_with(b"%PDF-") {
            return Err(ApiError::InvalidRequest("File is not a PDF".to_string()));
        }

        let mut sanitized = sanitize_filename(name);
        if sanitized.trim_matches(&['-', '.'][..]).is_empty() {
            sanitized = "document.pdf".to_string();
        }
        let file_name = format!("{}-{}", Utc::now().timestamp_millis(), sanitized);

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.resolve(&file_name)?, &pdf).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO documents (id, name, original_url, original_content, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(format!("{UPLOAD_URL_PREFIX}{file_name}"))
        .bind(&pdf)
        .bind(DocumentStatus::Pending.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        tracing::info!(document_id = %id, file = %file_name, bytes = pdf.len(), "document uploaded");
        self.get(&id).await
    }

    /// Read a stored file: disk first, then the database copy
    pub async fn read_file(&self, file_name: &str) -> Result<Vec<u8>, ApiError> {
        let path = self.resolve(file_name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                tracing::debug!(file = %file_name, error = %e, "file not on disk, checking database")
            }
        }

        let url = format!("{UPLOAD_URL_PREFIX}{file_name}");
        let row: Option<(String, Option<Vec<u8>>, Option<Vec<u8>>)> = sqlx::query_as(
            r#"
            SELECT original_url, original_content, signed_content
            FROM documents
            WHERE original_url = ? OR signed_url = ?
            LIMIT 1
            "#,
        )
        .bind(&url)
        .bind(&url)
        .fetch_optional(&self.db)
        .await?;

        let (original_url, original, signed) =
            row.ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;
        let content = if original_url == url { original } else { signed };
        content.ok_or_else(|| ApiError::NotFound("File content is missing".to_string()))
    }

    /// Bytes of a document's original upload
    pub async fn original_bytes(&self, document: &Document) -> Result<Vec<u8>, ApiError> {
        let file_name = file_name_from_url(&document.original_url).ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "Invalid original url for {}: {}",
                document.id,
                document.original_url
            ))
        })?;
        self.read_file(file_name).await
    }

    /// Composite signatures onto the original and mark the document signed
    ///
    /// A document is signed at most once; later attempts are a conflict.
    pub async fn sign(
        &self,
        id: &str,
        placements: Vec<Placement>,
        config: CompositorConfig,
    ) -> Result<Document, ApiError> {
        let document = self.get(id).await?;
        if document.is_deleted {
            return Err(ApiError::NotFound(format!("Document not found: {}", id)));
        }
        if document.status == DocumentStatus::Signed {
            return Err(ApiError::Conflict(format!("Document already signed: {}", id)));
        }

        let original = self.original_bytes(&document).await?;
        let signed = tokio::task::spawn_blocking(move || {
            signing::compose_with(&original, &placements, &config)
        })
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

        let file_name = format!("signed-{}-{}.pdf", id, Utc::now().timestamp_millis());
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.resolve(&file_name)?, &signed).await?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET signed_url = ?, signed_content = ?, status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(format!("{UPLOAD_URL_PREFIX}{file_name}"))
        .bind(&signed)
        .bind(DocumentStatus::Signed.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .bind(DocumentStatus::Pending.as_str())
        .execute(&self.db)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                self.discard(&file_name).await;
                return Err(e.into());
            }
        };
        if result.rows_affected() == 0 {
            // Lost a race with another signer
            self.discard(&file_name).await;
            return Err(ApiError::Conflict(format!("Document already signed: {}", id)));
        }

        tracing::info!(document_id = %id, file = %file_name, bytes = signed.len(), "document signed");
        self.get(id).await
    }

    /// Remove a signed file that no record points at
    async fn discard(&self, file_name: &str) {
        let removed = match self.resolve(file_name) {
            Ok(path) => tokio::fs::remove_file(path).await.map_err(ApiError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            tracing::warn!(file = %file_name, error = %e, "failed to remove unused signed file");
        }
    }

    /// Hide a document from listings
    pub async fn soft_delete(&self, id: &str) -> Result<(), ApiError> {
        self.update_flag(id, "is_deleted", true).await?;
        tracing::info!(document_id = %id, "document deleted");
        Ok(())
    }

    /// Flag a document for deletion review
    pub async fn request_deletion(&self, id: &str) -> Result<Document, ApiError> {
        self.update_flag(id, "deletion_requested", true).await?;
        self.get(id).await
    }

    /// Clear a pending deletion request
    pub async fn reject_deletion(&self, id: &str) -> Result<Document, ApiError> {
        self.update_flag(id, "deletion_requested", false).await?;
        self.get(id).await
    }

    async fn update_flag(&self, id: &str, column: &'static str, value: bool) -> Result<(), ApiError> {
        let result = sqlx::query(&format!(
            "UPDATE documents SET {column} = ?, updated_at = ? WHERE id = ? AND is_deleted = 0"
        ))
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Document not found: {}", id)));
        }
        Ok(())
    }
}
