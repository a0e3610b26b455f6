//! PDF Core - Low-level PDF manipulation
//!
//! This crate provides functionality for:
//! - Opening and saving PDF documents
//! - Reading page geometry (inherited MediaBox/CropBox)
//! - Extracting positioned text fragments from page content streams
//! - Inserting PNG images (alpha kept as a soft mask) at PDF coordinates
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::PdfDocument;
//!
//! let mut doc = PdfDocument::open_from_bytes(&pdf_bytes)?;
//! let size = doc.page_size(1)?;
//! doc.insert_image(&png_bytes, 1, 72.0, size.height - 122.0, 150.0, 50.0)?;
//! let signed = doc.to_bytes()?;
//! ```

mod document;
mod image;
mod text;

pub use document::{PageSize, PdfDocument};
pub use image::{generate_image_operators, is_png, ImageXObject};
pub use text::{decode_pdf_string, Matrix, TextFragment};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// A4 portrait, used when a page carries no MediaBox anywhere in its parent chain
pub const A4_WIDTH: f64 = 595.28;
pub const A4_HEIGHT: f64 = 841.89;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_page_message() {
        let err = PdfError::InvalidPage(4, 2);
        assert_eq!(
            err.to_string(),
            "Invalid page number: 4 (document has 2 pages)"
        );
    }

    #[test]
    fn test_a4_constants() {
        assert!(A4_HEIGHT > A4_WIDTH);
    }
}
