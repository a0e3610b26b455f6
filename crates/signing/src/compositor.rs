//! Compositor: draw signature images onto a PDF

use crate::coords::{to_pdf, UiPoint};
use crate::zone::{SignatureImage, SignatureZone};
use crate::Result;
use pdf_core::PdfDocument;
use serde::{Deserialize, Serialize};

/// Size of the drawn signature box, in points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompositorConfig {
    pub signature_width: f64,
    pub signature_height: f64,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            signature_width: 150.0,
            signature_height: 50.0,
        }
    }
}

/// One image to draw
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Zero-based page number
    pub page_index: usize,
    /// Top-left corner of the box in UI percentages
    pub position: UiPoint,
    pub image: SignatureImage,
}

impl Placement {
    /// Placement for a filled zone, `None` for an empty one
    pub fn from_zone(zone: &SignatureZone) -> Option<Self> {
        zone.content.as_ref().map(|image| Self {
            page_index: zone.page_index,
            position: zone.position,
            image: image.clone(),
        })
    }
}

/// Wire form of a placement, as sent with a document update request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePlacement {
    pub image_data_url: String,
    pub x_pct: f64,
    pub y_pct: f64,
    pub page_index: usize,
}

impl SignaturePlacement {
    /// Decode the image payload
    pub fn decode(&self) -> Result<Placement> {
        Ok(Placement {
            page_index: self.page_index,
            position: UiPoint {
                x: self.x_pct,
                y: self.y_pct,
            },
            image: SignatureImage::from_data_url(&self.image_data_url)?,
        })
    }
}

impl From<&Placement> for SignaturePlacement {
    fn from(placement: &Placement) -> Self {
        Self {
            image_data_url: placement.image.to_data_url(),
            x_pct: placement.position.x,
            y_pct: placement.position.y,
            page_index: placement.page_index,
        }
    }
}

/// Composite with the default 150x50 pt signature box
pub fn compose(pdf: &[u8], placements: &[Placement]) -> Result<Vec<u8>> {
    compose_with(pdf, placements, &CompositorConfig::default())
}

/// Draw every placement and save once
///
/// Placements on pages that do not exist are skipped. Any other failure
/// (unreadable PDF, undecodable image) aborts the whole batch.
pub fn compose_with(
    pdf: &[u8],
    placements: &[Placement],
    config: &CompositorConfig,
) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::open_from_bytes(pdf)?;
    let page_count = doc.page_count();
    let mut skipped = 0;

    for placement in placements {
        if placement.page_index >= page_count {
            tracing::debug!(
                page_index = placement.page_index,
                page_count,
                "skipping signature on missing page"
            );
            skipped += 1;
            continue;
        }

        let page = placement.page_index + 1;
        let size = doc.page_size(page)?;
        let corner = to_pdf(
            placement.position.x,
            placement.position.y,
            size.width,
            size.height,
            config.signature_height,
        );

        doc.insert_image(
            placement.image.as_bytes(),
            page,
            corner.x,
            corner.y,
            config.signature_width,
            config.signature_height,
        )?;
    }

    let output = doc.to_bytes()?;
    tracing::info!(
        placed = placements.len() - skipped,
        skipped,
        bytes = output.len(),
        "composited signatures"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png;
    use crate::SigningError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_zone() {
        let mut zone = SignatureZone::new(1, UiPoint { x: 20.0, y: 30.0 });
        assert!(Placement::from_zone(&zone).is_none());

        let image = SignatureImage::from_png(png(0)).unwrap();
        zone.content = Some(image.clone());
        let placement = Placement::from_zone(&zone).unwrap();
        assert_eq!(placement.page_index, 1);
        assert_eq!(placement.position, UiPoint { x: 20.0, y: 30.0 });
        assert_eq!(placement.image, image);
    }

    #[test]
    fn test_wire_placement_roundtrip() {
        let placement = Placement {
            page_index: 0,
            position: UiPoint { x: 58.5, y: 75.0 },
            image: SignatureImage::from_png(png(0)).unwrap(),
        };
        let wire = SignaturePlacement::from(&placement);

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["xPct"], 58.5);
        assert_eq!(json["yPct"], 75.0);
        assert_eq!(json["pageIndex"], 0);
        assert!(json["imageDataUrl"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));

        assert_eq!(wire.decode().unwrap(), placement);
    }

    #[test]
    fn test_wire_placement_bad_image() {
        let wire = SignaturePlacement {
            image_data_url: "data:image/png;base64,".to_string(),
            x_pct: 0.0,
            y_pct: 0.0,
            page_index: 0,
        };
        assert!(matches!(wire.decode(), Err(SigningError::ImageError(_))));
    }

    #[test]
    fn test_compose_rejects_garbage_pdf() {
        let result = compose(b"not a pdf", &[]);
        assert!(matches!(result, Err(SigningError::PdfError(_))));
    }
}
