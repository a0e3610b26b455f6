//! Image XObjects for signature overlays

use crate::{PdfError, Result};
use image::{ColorType, DynamicImage, ImageDecoder, ImageReader};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Whether the bytes start with the PNG signature
pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(&PNG_MAGIC)
}

/// Image XObject for PDF embedding
///
/// Samples and the optional alpha channel are stored FlateDecode-compressed.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Color space ("DeviceRGB", "DeviceGray")
    pub color_space: &'static str,
    /// Compressed color samples
    pub data: Vec<u8>,
    /// Compressed 8-bit alpha, embedded as a DeviceGray `/SMask`
    pub alpha: Option<Vec<u8>>,
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

fn image_dict(width: u32, height: u32, color_space: &str, length: usize) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", width as i64);
    dict.set("Height", height as i64);
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", 8i64);
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    dict.set("Length", length as i64);
    dict
}

impl ImageXObject {
    /// Decode a PNG and re-encode its samples with FlateDecode.
    ///
    /// Signature captures are transparent PNGs; their alpha channel is kept
    /// as a separate soft mask so only the ink covers the page.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        if !is_png(data) {
            return Err(PdfError::ImageError("Not a PNG image".to_string()));
        }

        let decoder = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .into_decoder()?;
        let (width, height) = decoder.dimensions();
        let color_type = decoder.color_type();
        let image = DynamicImage::from_decoder(decoder)?;

        let pixels = (width * height) as usize;
        let (raw, alpha, color_space) = match color_type {
            ColorType::L8 | ColorType::L16 => (image.to_luma8().into_raw(), None, "DeviceGray"),
            ColorType::La8 | ColorType::La16 => {
                let mut gray = Vec::with_capacity(pixels);
                let mut alpha = Vec::with_capacity(pixels);
                for p in image.to_luma_alpha8().pixels() {
                    gray.push(p[0]);
                    alpha.push(p[1]);
                }
                (gray, Some(alpha), "DeviceGray")
            }
            ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => {
                let mut rgb = Vec::with_capacity(pixels * 3);
                let mut alpha = Vec::with_capacity(pixels);
                for p in image.to_rgba8().pixels() {
                    rgb.extend_from_slice(&[p[0], p[1], p[2]]);
                    alpha.push(p[3]);
                }
                (rgb, Some(alpha), "DeviceRGB")
            }
            _ => (image.to_rgb8().into_raw(), None, "DeviceRGB"),
        };

        Ok(Self {
            width,
            height,
            color_space,
            data: deflate(&raw)?,
            alpha: alpha.as_deref().map(deflate).transpose()?,
        })
    }

    /// The soft mask stream, for images with an alpha channel
    pub fn smask_stream(&self) -> Option<Stream> {
        self.alpha.as_ref().map(|alpha| {
            Stream::new(
                image_dict(self.width, self.height, "DeviceGray", alpha.len()),
                alpha.clone(),
            )
        })
    }

    /// Convert to a lopdf Stream object, pointing at `smask` if given
    pub fn to_pdf_stream(&self, smask: Option<ObjectId>) -> Stream {
        let mut dict = image_dict(self.width, self.height, self.color_space, self.data.len());
        if let Some(smask_id) = smask {
            dict.set("SMask", Object::Reference(smask_id));
        }
        Stream::new(dict, self.data.clone())
    }

    /// Add the image and its soft mask to `doc`, returning the image's id
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let smask = self.smask_stream().map(|stream| doc.add_object(stream));
        doc.add_object(self.to_pdf_stream(smask))
    }
}

/// Generate operators to draw an image XObject
///
/// `x`/`y` locate the image's lower-left corner in PDF coordinates.
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Vec<u8> {
    format!("q\n{width} 0 0 {height} {x} {y} cm\n/{image_name} Do\nQ\n").into_bytes()
}
