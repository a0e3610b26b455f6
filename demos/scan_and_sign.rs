//! Scan a PDF for signature tags, sign every zone and write the result
//!
//! Usage: scan_and_sign <input.pdf> [signature.png]

use signing::{
    compose, DocumentGateway, GatewayError, ScanConfig, Side, SignatureImage,
    SignaturePlacement, SigningSession,
};
use std::fs;
use std::path::PathBuf;

/// Documents are files in one directory; signed copies go next to them
struct DirectoryGateway {
    root: PathBuf,
}

impl DocumentGateway for DirectoryGateway {
    type Record = PathBuf;

    fn fetch(&mut self, document_id: &str) -> Result<Vec<u8>, GatewayError> {
        Ok(fs::read(self.root.join(document_id))?)
    }

    fn submit(
        &mut self,
        document_id: &str,
        placements: &[SignaturePlacement],
    ) -> Result<PathBuf, GatewayError> {
        let original = self.fetch(document_id)?;
        let placements = placements
            .iter()
            .map(SignaturePlacement::decode)
            .collect::<Result<Vec<_>, _>>()?;
        let signed = compose(&original, &placements)?;

        let path = self.root.join(format!("signed-{document_id}"));
        fs::write(&path, signed)?;
        Ok(path)
    }
}

/// A black scribble on a transparent background
fn scribble() -> Result<SignatureImage, Box<dyn std::error::Error>> {
    use image::{ImageBuffer, Rgba};

    let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(300, 100, |x, y| {
        let wave = 50.0 + 30.0 * (x as f64 / 20.0).sin();
        if (y as f64 - wave).abs() < 3.0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 0])
        }
    });
    let mut buffer = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut buffer),
        image::ImageFormat::Png,
    )?;
    Ok(SignatureImage::from_png(buffer)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signing=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().ok_or("usage: scan_and_sign <input.pdf> [signature.png]")?);
    let signature = match args.next() {
        Some(path) => SignatureImage::from_png(fs::read(path)?)?,
        None => scribble()?,
    };

    let root = input
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let document_id = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("input must be a file")?
        .to_string();

    let mut gateway = DirectoryGateway { root };
    let mut session = SigningSession::open(&document_id, &mut gateway, &ScanConfig::default())?;
    println!("Found {} signature zones", session.zones().count());

    let left = session.fill_side(Side::Left, signature.clone())?;
    let right = session.fill_side(Side::Right, signature)?;
    println!("Signed {left} left and {right} right zones");

    let output = session.finalize(&mut gateway)?;
    println!("Output: {}", output.display());

    Ok(())
}
