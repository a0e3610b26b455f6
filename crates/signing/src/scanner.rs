//! Tag scanner: find signature markers in a PDF's text layer
//!
//! Text fragments are regrouped into visual lines (PDF producers often split
//! a line into many show operators), so a marker split across fragments is
//! still found. Each marker becomes one empty [`SignatureZone`] anchored at
//! the origin of the fragment where the marker starts.

use crate::coords::to_ui;
use crate::zone::SignatureZone;
use crate::{Result, SigningError};
use pdf_core::{PdfDocument, TextFragment};
use serde::{Deserialize, Serialize};

/// Scanner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    /// Marker text to search for
    pub sentinel: String,
    /// Maximum vertical distance (points) between fragments on the same line
    pub line_tolerance: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sentinel: "$SIGN".to_string(),
            line_tolerance: 5.0,
        }
    }
}

/// Fragments sharing one baseline, ordered left to right
#[derive(Debug)]
struct Line<'a> {
    /// Rounded y of the fragment that opened the line
    y: f64,
    fragments: Vec<&'a TextFragment>,
}

impl Line<'_> {
    fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

/// Group fragments into lines, sorted top to bottom
fn group_lines(fragments: &[TextFragment], tolerance: f64) -> Vec<Line<'_>> {
    let mut lines: Vec<Line<'_>> = Vec::new();

    for fragment in fragments {
        let y = fragment.y.round();
        match lines.iter_mut().find(|line| (line.y - y).abs() < tolerance) {
            Some(line) => line.fragments.push(fragment),
            None => lines.push(Line {
                y,
                fragments: vec![fragment],
            }),
        }
    }

    for line in &mut lines {
        line.fragments.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines.sort_by(|a, b| b.y.total_cmp(&a.y));

    lines
}

/// Fragments in which each non-overlapping marker occurrence starts
fn find_tags<'a>(line: &Line<'a>, sentinel: &str) -> Vec<&'a TextFragment> {
    let text = line.text();
    let mut tags = Vec::new();

    for (match_start, _) in text.match_indices(sentinel) {
        let mut offset = 0;
        for fragment in &line.fragments {
            let end = offset + fragment.text.len();
            if match_start < end {
                tags.push(*fragment);
                break;
            }
            offset = end;
        }
    }

    tags
}

/// Scan with the default `$SIGN` marker
pub fn scan(pdf: &[u8]) -> Result<Vec<SignatureZone>> {
    scan_with(pdf, &ScanConfig::default())
}

/// Scan every page for markers
///
/// Zones are returned page by page, each page's lines top to bottom and each
/// line's markers left to right. All zones are empty.
pub fn scan_with(pdf: &[u8], config: &ScanConfig) -> Result<Vec<SignatureZone>> {
    if config.sentinel.is_empty() {
        return Err(SigningError::ScanError("empty marker".to_string()));
    }

    let doc = PdfDocument::open_from_bytes(pdf)?;
    let mut zones = Vec::new();

    for page in 1..=doc.page_count() {
        let size = doc.page_size(page)?;
        if size.width <= 0.0 || size.height <= 0.0 {
            tracing::debug!(page, "skipping page with empty media box");
            continue;
        }

        let fragments = doc.text_fragments(page)?;
        let before = zones.len();
        for line in group_lines(&fragments, config.line_tolerance) {
            for fragment in find_tags(&line, &config.sentinel) {
                let position = to_ui(fragment.x, fragment.y, size.width, size.height);
                zones.push(SignatureZone::new(page - 1, position));
            }
        }
        tracing::debug!(page, found = zones.len() - before, "scanned page");
    }

    tracing::info!(zones = zones.len(), "scan complete");
    Ok(zones)
}

/// Scan, degrading any failure to an empty list
pub fn scan_or_empty(pdf: &[u8], config: &ScanConfig) -> Vec<SignatureZone> {
    match scan_with(pdf, config) {
        Ok(zones) => zones,
        Err(e) => {
            tracing::warn!(error = %e, "signature tag scan failed, continuing without zones");
            Vec::new()
        }
    }
}
