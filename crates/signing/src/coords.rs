//! Coordinate mapping between PDF space and UI space
//!
//! PDF space: points, origin at the bottom-left of the page.
//! UI space: percent of page width/height, origin at the top-left.

use serde::{Deserialize, Serialize};

/// A point in UI space (percent, top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UiPoint {
    pub x: f64,
    pub y: f64,
}

/// A point in PDF space (points, bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfPoint {
    pub x: f64,
    pub y: f64,
}

/// Map a PDF point to UI percentages
pub fn to_ui(x: f64, y: f64, page_width: f64, page_height: f64) -> UiPoint {
    UiPoint {
        x: x / page_width * 100.0,
        y: (page_height - y) / page_height * 100.0,
    }
}

/// Map a UI position to the lower-left corner of a box in PDF space
///
/// `(x_pct, y_pct)` is the box's top-left corner, so the box height is
/// subtracted to get the corner PDF drawing operators expect.
pub fn to_pdf(
    x_pct: f64,
    y_pct: f64,
    page_width: f64,
    page_height: f64,
    signature_height: f64,
) -> PdfPoint {
    PdfPoint {
        x: x_pct / 100.0 * page_width,
        y: page_height - (y_pct / 100.0 * page_height) - signature_height,
    }
}
