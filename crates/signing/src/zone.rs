//! Signature zones and captured signature images

use crate::coords::UiPoint;
use crate::{Result, SigningError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pdf_core::is_png;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ZONE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque zone identifier, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(u64);

impl ZoneId {
    /// Allocate a fresh identifier
    pub fn next() -> Self {
        ZoneId(NEXT_ZONE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ZoneId {
    fn from(value: u64) -> Self {
        ZoneId(value)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-screen hit-test box in layout pixels
///
/// Never embedded in the PDF; the compositor uses its own fixed box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ZoneSize {
    fn default() -> Self {
        Self {
            width: 150.0,
            height: 50.0,
        }
    }
}

/// A captured signature: PNG bytes
///
/// Serialized as a `data:image/png;base64,...` URL, which is how capture
/// surfaces hand signatures over.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureImage(Vec<u8>);

const DATA_URL_PREFIX: &str = "data:";

impl SignatureImage {
    /// Wrap raw PNG bytes
    pub fn from_png(data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(SigningError::ImageError("empty image".to_string()));
        }
        if !is_png(&data) {
            return Err(SigningError::ImageError("expected PNG data".to_string()));
        }
        Ok(Self(data))
    }

    /// Decode a base64 data URL (or a bare base64 payload)
    pub fn from_data_url(url: &str) -> Result<Self> {
        let url = url.trim();
        let payload = match url.strip_prefix(DATA_URL_PREFIX) {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or_else(|| {
                    SigningError::ImageError("data URL has no payload".to_string())
                })?;
                if !header.ends_with(";base64") {
                    return Err(SigningError::ImageError(
                        "data URL is not base64 encoded".to_string(),
                    ));
                }
                payload
            }
            None => url,
        };

        if payload.is_empty() {
            return Err(SigningError::ImageError("empty image".to_string()));
        }

        let data = STANDARD
            .decode(payload)
            .map_err(|e| SigningError::ImageError(format!("invalid base64: {e}")))?;
        Self::from_png(data)
    }

    /// Encode as a `data:image/png;base64,` URL
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.0))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SignatureImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureImage({} bytes)", self.0.len())
    }
}

impl Serialize for SignatureImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl<'de> Deserialize<'de> for SignatureImage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        SignatureImage::from_data_url(&url).map_err(serde::de::Error::custom)
    }
}

/// A rectangle on a page where a signature goes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureZone {
    pub id: ZoneId,
    /// Zero-based page number
    pub page_index: usize,
    /// Top-left corner, percent of page width/height from the top-left
    pub position: UiPoint,
    #[serde(default)]
    pub size: ZoneSize,
    /// Captured signature, `None` while the zone is empty
    #[serde(default)]
    pub content: Option<SignatureImage>,
}

impl SignatureZone {
    /// Create an empty zone with a fresh id
    pub fn new(page_index: usize, position: UiPoint) -> Self {
        Self {
            id: ZoneId::next(),
            page_index,
            position,
            size: ZoneSize::default(),
            content: None,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.content.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zone_ids_are_unique() {
        let a = SignatureZone::new(0, UiPoint { x: 10.0, y: 10.0 });
        let b = SignatureZone::new(0, UiPoint { x: 10.0, y: 10.0 });
        assert_ne!(a.id, b.id);
        assert!(!a.is_filled());
        assert_eq!(a.size, ZoneSize { width: 150.0, height: 50.0 });
    }

    #[test]
    fn test_data_url_roundtrip() {
        let image = SignatureImage::from_png(png(0)).unwrap();
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
        assert_eq!(SignatureImage::from_data_url(&url).unwrap(), image);
    }

    #[test]
    fn test_bare_base64_is_accepted() {
        let encoded = STANDARD.encode(png(0));
        let image = SignatureImage::from_data_url(&encoded).unwrap();
        assert_eq!(image.as_bytes(), png(0).as_slice());
    }

    #[test]
    fn test_rejects_bad_payloads() {
        for url in [
            "",
            "data:image/png;base64,",
            "data:image/png;base64",
            "data:image/png,abc",
            "data:image/png;base64,!!!notbase64!!!",
        ] {
            assert!(
                matches!(
                    SignatureImage::from_data_url(url),
                    Err(SigningError::ImageError(_))
                ),
                "accepted {url:?}"
            );
        }
    }

    #[test]
    fn test_rejects_non_png() {
        let jpeg = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46]);
        let err = SignatureImage::from_data_url(&format!("data:image/jpeg;base64,{jpeg}"))
            .unwrap_err();
        assert!(err.to_string().contains("expected PNG"));
    }

    #[test]
    fn test_zone_serializes_camel_case() {
        let mut zone = SignatureZone::new(2, UiPoint { x: 8.5, y: 75.0 });
        zone.content = Some(SignatureImage::from_png(png(0)).unwrap());

        let json = serde_json::to_value(&zone).unwrap();
        assert_eq!(json["pageIndex"], 2);
        assert_eq!(json["position"]["x"], 8.5);
        assert!(json["content"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));

        let back: SignatureZone = serde_json::from_value(json).unwrap();
        assert_eq!(back, zone);
    }
}
