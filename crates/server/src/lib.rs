//! Sealdesk API - upload, sign and serve PDF documents
//!
//! Provides REST endpoints for:
//! - Document upload, listing and soft deletion
//! - Signature zone detection
//! - Applying signatures and persisting the signed copy
//! - Serving stored files

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use error::ApiError;
pub use state::AppState;

/// Largest accepted request body (base64 PDFs and signature batches)
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Build the application router
pub fn app(state: Arc<AppState>) -> Router {
    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Documents
        .route(
            "/api/documents",
            get(handlers::list_documents).post(handlers::upload_document),
        )
        .route(
            "/api/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route(
            "/api/documents/:id/deletion-request",
            post(handlers::request_deletion).delete(handlers::reject_deletion),
        )
        // Signing
        .route("/api/documents/:id/zones", get(handlers::document_zones))
        .route("/api/documents/:id/sign", post(handlers::sign_document))
        // File delivery
        .route("/api/files/*path", get(handlers::serve_file))
        .route("/api/pdf-base64/*path", get(handlers::pdf_base64))
        // Settings
        .route("/api/settings/public", get(handlers::public_settings))
        // Add middleware
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
