//! Signing Engine - signature zone detection and placement
//!
//! This crate provides:
//! - Tag scanning: find `$SIGN` markers in a PDF's text layer
//! - Coordinate mapping between PDF points and on-screen percentages
//! - Compositing signature images onto pages in a single save
//! - A signing session tracking zones from detection to commit
//!
//! # Example
//!
//! ```ignore
//! use signing::{scan, SignatureImage, SigningSession, Side};
//!
//! let zones = scan(&pdf_bytes)?;
//! let mut session = SigningSession::new("doc-1");
//! session.load_zones(zones)?;
//! session.fill_side(Side::Left, SignatureImage::from_data_url(&capture)?)?;
//! let record = session.finalize(&mut gateway)?;
//! ```

pub mod compositor;
pub mod coords;
pub mod scanner;
pub mod session;
pub mod zone;

pub use compositor::{compose, compose_with, CompositorConfig, Placement, SignaturePlacement};
pub use coords::{to_pdf, to_ui, PdfPoint, UiPoint};
pub use scanner::{scan, scan_or_empty, scan_with, ScanConfig};
pub use session::{DocumentGateway, SessionState, Side, SigningSession};
pub use zone::{SignatureImage, SignatureZone, ZoneId, ZoneSize};

use thiserror::Error;

/// Errors raised by the scanning and compositing engine
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Scan failed: {0}")]
    ScanError(String),

    #[error("Compose failed: {0}")]
    ComposeError(String),

    #[error("Invalid signature image: {0}")]
    ImageError(String),

    #[error("PDF error: {0}")]
    PdfError(#[from] pdf_core::PdfError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SigningError>;

/// Error type returned by [`DocumentGateway`] implementations
pub type GatewayError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by [`SigningSession`]
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Operation not allowed while session is {0:?}")]
    InvalidState(SessionState),

    #[error("Unknown signature zone: {0}")]
    UnknownZone(ZoneId),

    #[error("No filled signature zones to submit")]
    NothingToSign,

    #[error("Failed to fetch document: {0}")]
    FetchFailed(GatewayError),

    #[error("Failed to commit signatures: {0}")]
    CommitFailed(GatewayError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}
