//! WASM bindings for the sealdesk signing engine
//!
//! This crate provides a JavaScript-friendly API for:
//! - Detecting `$SIGN` zones in a PDF
//! - Filling zones with captured signatures (one at a time or per side)
//! - Building the update request payload, or compositing in the browser
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { SigningSession, compose } from 'signing-wasm';
//!
//! await init();
//!
//! const session = new SigningSession(documentId);
//! session.scan(pdfBytes);
//! for (const zone of session.zones()) {
//!     // zone.position.x / zone.position.y are percentages from the top-left
//! }
//!
//! session.fillSide('left', signaturePad.toDataURL('image/png'));
//! const placements = session.beginFinalize();
//! try {
//!     await fetch(`/api/documents/${documentId}/sign`, {
//!         method: 'POST',
//!         headers: { 'Content-Type': 'application/json' },
//!         body: JSON.stringify({ placements }),
//!     });
//!     session.completeFinalize();
//! } catch (e) {
//!     session.failFinalize();
//! }
//! ```

use signing::{ScanConfig, Side, SignatureImage, SignaturePlacement, UiPoint, ZoneId};
use wasm_bindgen::prelude::*;

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn parse_side(side: &str) -> Option<Side> {
    match side.to_ascii_lowercase().as_str() {
        "left" => Some(Side::Left),
        "right" => Some(Side::Right),
        _ => None,
    }
}

/// Zone bookkeeping for one document
#[wasm_bindgen]
pub struct SigningSession {
    inner: signing::SigningSession,
    scan_config: ScanConfig,
}

#[wasm_bindgen]
impl SigningSession {
    /// @param documentId - Document being signed
    #[wasm_bindgen(constructor)]
    pub fn new(document_id: &str) -> SigningSession {
        SigningSession {
            inner: signing::SigningSession::new(document_id),
            scan_config: ScanConfig::default(),
        }
    }

    /// Change the marker searched for by `scan` (default `$SIGN`)
    #[wasm_bindgen(js_name = setSentinel)]
    pub fn set_sentinel(&mut self, sentinel: &str) {
        self.scan_config.sentinel = sentinel.to_string();
    }

    /// Detect zones in the document
    ///
    /// A PDF that cannot be read yields no zones rather than an error, so
    /// the signer can still place zones by hand.
    ///
    /// @param pdf - PDF file bytes (Uint8Array)
    /// @returns Number of zones found
    pub fn scan(&mut self, pdf: &[u8]) -> Result<usize, JsValue> {
        let zones = signing::scan_or_empty(pdf, &self.scan_config);
        let count = zones.len();
        self.inner.load_zones(zones).map_err(js_error)?;
        Ok(count)
    }

    /// Current state: "Detecting", "Ready", "Committing", "Committed" or "Failed"
    pub fn state(&self) -> String {
        format!("{:?}", self.inner.state())
    }

    /// @returns Array of `{ id, pageIndex, position: {x, y}, size, content }`
    pub fn zones(&self) -> Result<JsValue, JsValue> {
        let zones: Vec<_> = self.inner.zones().collect();
        Ok(serde_wasm_bindgen::to_value(&zones)?)
    }

    /// @param zoneId - Zone id from `zones()`
    /// @param dataUrl - `data:image/png;base64,...` from the signature pad
    #[wasm_bindgen(js_name = fillZone)]
    pub fn fill_zone(&mut self, zone_id: u32, data_url: &str) -> Result<(), JsValue> {
        let image = SignatureImage::from_data_url(data_url).map_err(js_error)?;
        self.inner
            .fill_zone(ZoneId::from(u64::from(zone_id)), image)
            .map_err(js_error)
    }

    /// Fill every empty zone on one half of the page
    ///
    /// @param side - "left" or "right"
    /// @param dataUrl - Signature image
    /// @returns Number of zones filled
    #[wasm_bindgen(js_name = fillSide)]
    pub fn fill_side(&mut self, side: &str, data_url: &str) -> Result<usize, JsValue> {
        let side = parse_side(side)
            .ok_or_else(|| js_error(format!("Unknown side '{side}', expected left or right")))?;
        let image = SignatureImage::from_data_url(data_url).map_err(js_error)?;
        self.inner.fill_side(side, image).map_err(js_error)
    }

    /// Add a zone at a position chosen by the signer
    ///
    /// @param pageIndex - Zero-based page
    /// @param x - Percent from the left edge
    /// @param y - Percent from the top edge
    /// @param dataUrl - Optional signature image
    /// @returns The new zone id
    #[wasm_bindgen(js_name = placeZone)]
    pub fn place_zone(
        &mut self,
        page_index: usize,
        x: f64,
        y: f64,
        data_url: Option<String>,
    ) -> Result<u32, JsValue> {
        let image = data_url
            .as_deref()
            .map(SignatureImage::from_data_url)
            .transpose()
            .map_err(js_error)?;
        let id = self
            .inner
            .place_zone(page_index, UiPoint { x, y }, image)
            .map_err(js_error)?;
        u32::try_from(id.get()).map_err(js_error)
    }

    /// Validate and lock the session for submission
    ///
    /// @returns Array of `{ imageDataUrl, xPct, yPct, pageIndex }`
    #[wasm_bindgen(js_name = beginFinalize)]
    pub fn begin_finalize(&mut self) -> Result<JsValue, JsValue> {
        let placements = self.inner.begin_finalize().map_err(js_error)?;
        Ok(serde_wasm_bindgen::to_value(&placements)?)
    }

    /// Mark the submission as persisted
    #[wasm_bindgen(js_name = completeFinalize)]
    pub fn complete_finalize(&mut self) -> Result<(), JsValue> {
        self.inner.complete_finalize().map_err(js_error)
    }

    /// Mark the submission as failed; zones are kept
    #[wasm_bindgen(js_name = failFinalize)]
    pub fn fail_finalize(&mut self) -> Result<(), JsValue> {
        self.inner.fail_finalize().map_err(js_error)
    }
}

/// Draw signatures onto a PDF
///
/// @param pdf - PDF file bytes (Uint8Array)
/// @param placements - Array of `{ imageDataUrl, xPct, yPct, pageIndex }`
/// @returns Signed PDF bytes (Uint8Array)
#[wasm_bindgen]
pub fn compose(pdf: &[u8], placements: JsValue) -> Result<Vec<u8>, JsValue> {
    let placements: Vec<SignaturePlacement> = serde_wasm_bindgen::from_value(placements)?;
    let placements = placements
        .iter()
        .map(SignaturePlacement::decode)
        .collect::<Result<Vec<_>, _>>()
        .map_err(js_error)?;

    signing::compose(pdf, &placements).map_err(js_error)
}
