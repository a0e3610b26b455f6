//! Generate a sample PDF with two `$SIGNATURE$` tags on one line

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "output/tag-sample.pdf".to_string());

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 20.into()]),
        Operation::new("Td", vec![50.into(), 100.into()]),
        Operation::new("Tj", vec![Object::string_literal("Please sign here: $SIGNATURE$")]),
        Operation::new("ET", vec![]),
    ];
    operations.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 20.into()]),
        Operation::new("Td", vec![350.into(), 100.into()]),
        Operation::new("Tj", vec![Object::string_literal("And secondary sign: $SIGNATURE$")]),
        Operation::new("ET", vec![]),
    ]);
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 600.into(), 400.into()],
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(parent) = std::path::Path::new(&output).parent() {
        fs::create_dir_all(parent)?;
    }
    doc.save(&output)?;
    println!("Wrote {output}");

    let zones = signing::scan(&fs::read(&output)?)?;
    println!("Detected {} signature zones", zones.len());
    for zone in &zones {
        println!(
            "  page {} at ({:.2}%, {:.2}%)",
            zone.page_index, zone.position.x, zone.position.y
        );
    }

    Ok(())
}
