//! HTTP handlers for the sealdesk API

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use signing::{SignaturePlacement, SignatureZone};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// List documents that are not deleted
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

/// Upload a new PDF
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidRequest("File name is required".to_string()));
    }

    // Accept a bare payload or a data URL
    let payload = match req.pdf_base64.trim() {
        url if url.starts_with("data:") => url.split_once(',').map(|(_, p)| p).unwrap_or(""),
        bare => bare,
    };
    let pdf = BASE64
        .decode(payload)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid PDF base64: {}", e)))?;

    let document = state.store.upload(name, pdf).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Get document by ID
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.store.get(&id).await?))
}

/// Soft-delete a document
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.soft_delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ask an administrator to delete a document
pub async fn request_deletion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.store.request_deletion(&id).await?))
}

/// Withdraw a deletion request
pub async fn reject_deletion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.store.reject_deletion(&id).await?))
}

/// Detect signature zones in the original upload
///
/// A document that cannot be scanned has no zones; only a missing document
/// or file is an error.
pub async fn document_zones(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SignatureZone>>, ApiError> {
    let document = state.store.get(&id).await?;
    let pdf = state.store.original_bytes(&document).await?;

    let config = state.config.scan.clone();
    let zones = tokio::task::spawn_blocking(move || signing::scan_or_empty(&pdf, &config))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    tracing::info!(document_id = %id, zones = zones.len(), "zones detected");
    Ok(Json(zones))
}

/// Apply signatures and persist the signed copy
pub async fn sign_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SignRequest>,
) -> Result<Json<Document>, ApiError> {
    if req.placements.is_empty() {
        return Err(ApiError::InvalidRequest(
            "No signatures to apply".to_string(),
        ));
    }

    let placements = req
        .placements
        .iter()
        .map(SignaturePlacement::decode)
        .collect::<Result<Vec<_>, _>>()?;

    let document = state
        .store
        .sign(&id, placements, state.config.compositor.clone())
        .await?;
    Ok(Json(document))
}

/// Serve a stored PDF inline, never cached
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.store.read_file(&path).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", urlencoding::encode(&path)),
        ),
        (header::CONTENT_LENGTH, bytes.len().to_string()),
        (header::ACCEPT_RANGES, "bytes".to_string()),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        (
            header::CACHE_CONTROL,
            "no-cache, no-store, must-revalidate".to_string(),
        ),
        (header::PRAGMA, "no-cache".to_string()),
        (header::EXPIRES, "0".to_string()),
    ];

    Ok((StatusCode::OK, headers, bytes).into_response())
}

/// A stored PDF as base64, for viewers that cannot fetch binary
pub async fn pdf_base64(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<Base64Response>, ApiError> {
    let bytes = state.store.read_file(&path).await?;
    Ok(Json(Base64Response {
        base64: BASE64.encode(bytes),
    }))
}

/// Settings shown on the public signing screens
pub async fn public_settings(State(state): State<Arc<AppState>>) -> Json<PublicSettings> {
    Json(PublicSettings {
        client_welcome_message: state.config.welcome_message.clone(),
        viewer_worker_url: state.config.viewer_worker_url.clone(),
    })
}
