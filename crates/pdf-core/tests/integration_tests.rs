//! Integration tests for pdf-core
//!
//! These tests verify end-to-end functionality with real PDF operations.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use pdf_core::{PageSize, PdfDocument, PdfError};

/// Create a PDF whose pages each draw the given `(x, y, text)` runs in Helvetica
fn create_test_pdf_with_text(width: f64, height: f64, pages: &[Vec<(f64, f64, &str)>]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut page_ids = Vec::new();
    for runs in pages {
        let mut operations = Vec::new();
        for (x, y, text) in runs {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 20.into()]));
            operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let contents_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "Contents" => contents_id,
        });
        page_ids.push(page_id);
    }

    let count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.into_iter().map(Object::from).collect::<Vec<_>>(),
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Create a minimal valid PDF with blank pages
fn create_test_pdf_with_pages(page_count: usize) -> Vec<u8> {
    let pages = vec![Vec::new(); page_count];
    create_test_pdf_with_text(595.28, 841.89, &pages)
}

/// Create a 16x16 PNG with a transparent background and one ink stroke
fn create_test_png(ink: u8) -> Vec<u8> {
    use image::{ImageBuffer, Rgba};

    let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(16, 16, |x, y| {
        if x == y {
            Rgba([ink, ink, ink, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    let mut buffer = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut buffer),
        image::ImageFormat::Png,
    )
    .expect("Failed to create PNG");
    buffer
}

/// Collect the XObject names registered on a page
fn page_xobject_names(doc: &PdfDocument, page: u32) -> Vec<Vec<u8>> {
    let inner = doc.inner();
    let page_id = inner.get_pages()[&page];
    let page_dict = inner.get_object(page_id).unwrap().as_dict().unwrap();
    let resources = page_dict.get(b"Resources").unwrap().as_dict().unwrap();
    match resources.get(b"XObject") {
        Ok(xobjects) => xobjects
            .as_dict()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn test_open_save_roundtrip() {
    let pdf_data = create_test_pdf_with_pages(1);

    let mut doc = PdfDocument::open_from_bytes(&pdf_data).expect("Failed to open PDF");
    assert_eq!(doc.page_count(), 1);

    let saved_data = doc.to_bytes().expect("Failed to save PDF");

    let doc2 = PdfDocument::open_from_bytes(&saved_data).expect("Failed to re-open PDF");
    assert_eq!(doc2.page_count(), 1);
}

#[test]
fn test_open_garbage_fails() {
    let result = PdfDocument::open_from_bytes(b"this is not a pdf");
    assert!(matches!(result, Err(PdfError::OpenError(_))));
}

#[test]
fn test_page_size() {
    let pdf_data = create_test_pdf_with_text(600.0, 400.0, &[vec![]]);
    let doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();

    let size = doc.page_size(1).unwrap();
    assert!((size.width - 600.0).abs() < 0.01);
    assert!((size.height - 400.0).abs() < 0.01);
}

#[test]
fn test_page_size_invalid_page() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(2)).unwrap();
    assert!(matches!(doc.page_size(3), Err(PdfError::InvalidPage(3, 2))));
    assert!(matches!(doc.page_size(0), Err(PdfError::InvalidPage(0, 2))));
}

#[test]
fn test_page_size_defaults_to_a4_without_media_box() {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();

    let doc = PdfDocument::open_from_bytes(&buffer).unwrap();
    assert_eq!(doc.page_size(1).unwrap(), PageSize::a4());
}

#[test]
fn test_text_fragments() {
    let pdf_data = create_test_pdf_with_text(
        600.0,
        400.0,
        &[vec![
            (50.0, 100.0, "Please sign here: $SIGNATURE$"),
            (350.0, 100.0, "And secondary sign: $SIGNATURE$"),
        ]],
    );
    let doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();

    let fragments = doc.text_fragments(1).unwrap();
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].text, "Please sign here: $SIGNATURE$");
    assert!((fragments[0].x - 50.0).abs() < 0.01);
    assert!((fragments[0].y - 100.0).abs() < 0.01);
    assert!((fragments[1].x - 350.0).abs() < 0.01);
    assert_eq!(fragments[1].font_size, 20.0);
}

#[test]
fn test_text_fragments_blank_page() {
    let doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(1)).unwrap();
    assert!(doc.text_fragments(1).unwrap().is_empty());
}

#[test]
fn test_insert_image_png() {
    let pdf_data = create_test_pdf_with_pages(1);
    let png_data = create_test_png(0);

    let mut doc = PdfDocument::open_from_bytes(&pdf_data).expect("Failed to open PDF");
    doc.insert_image(&png_data, 1, 72.0, 500.0, 150.0, 50.0)
        .expect("Failed to insert PNG image");

    let saved_data = doc.to_bytes().expect("Failed to save PDF");
    let reopened = PdfDocument::open_from_bytes(&saved_data).unwrap();
    assert_eq!(page_xobject_names(&reopened, 1), vec![b"SigIm1".to_vec()]);

    let page_id = reopened.inner().get_pages()[&1];
    let content = reopened.inner().get_page_content(page_id).unwrap();
    let content = String::from_utf8_lossy(&content);
    assert!(content.contains("150 0 0 50 72 500 cm"));
    assert!(content.contains("/SigIm1 Do"));
}

#[test]
fn test_insert_image_keeps_existing_fonts() {
    let pdf_data = create_test_pdf_with_text(600.0, 400.0, &[vec![(50.0, 100.0, "Hello")]]);
    let mut doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();
    doc.insert_image(&create_test_png(0), 1, 50.0, 50.0, 150.0, 50.0)
        .unwrap();
    let saved = doc.to_bytes().unwrap();

    let reopened = PdfDocument::open_from_bytes(&saved).unwrap();
    let fragments = reopened.text_fragments(1).unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "Hello");
}

#[test]
fn test_invalid_page_number() {
    let pdf_data = create_test_pdf_with_pages(1);
    let png_data = create_test_png(0);
    let mut doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();

    let result = doc.insert_image(&png_data, 2, 0.0, 0.0, 10.0, 10.0);
    assert!(matches!(result, Err(PdfError::InvalidPage(2, 1))));

    let result = doc.insert_image(&png_data, 0, 0.0, 0.0, 10.0, 10.0);
    assert!(matches!(result, Err(PdfError::InvalidPage(0, 1))));
}

#[test]
fn test_invalid_image_data() {
    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(1)).unwrap();
    let result = doc.insert_image(b"definitely not an image", 1, 0.0, 0.0, 10.0, 10.0);
    assert!(matches!(result, Err(PdfError::ImageError(_))));
}

#[test]
fn test_image_deduplication() {
    let pdf_data = create_test_pdf_with_pages(3);
    let png_data = create_test_png(0);
    let mut doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();

    doc.insert_image(&png_data, 1, 10.0, 10.0, 150.0, 50.0).unwrap();
    doc.insert_image(&png_data, 1, 300.0, 10.0, 150.0, 50.0).unwrap();
    doc.insert_image(&png_data, 3, 10.0, 10.0, 150.0, 50.0).unwrap();
    assert_eq!(doc.embedded_image_count(), 1);

    doc.insert_image(&create_test_png(40), 2, 10.0, 10.0, 150.0, 50.0)
        .unwrap();
    assert_eq!(doc.embedded_image_count(), 2);

    let saved = doc.to_bytes().unwrap();
    let reopened = PdfDocument::open_from_bytes(&saved).unwrap();
    assert_eq!(page_xobject_names(&reopened, 1).len(), 1);
    assert_eq!(page_xobject_names(&reopened, 2).len(), 1);
    assert_eq!(page_xobject_names(&reopened, 3).len(), 1);
}

#[test]
fn test_images_on_one_page_share_one_new_stream() {
    let pdf_data = create_test_pdf_with_pages(1);
    let mut doc = PdfDocument::open_from_bytes(&pdf_data).unwrap();
    let objects_before = doc.inner().objects.len();

    doc.insert_image(&create_test_png(0), 1, 10.0, 10.0, 150.0, 50.0)
        .unwrap();
    doc.insert_image(&create_test_png(0), 1, 200.0, 10.0, 150.0, 50.0)
        .unwrap();
    doc.to_bytes().unwrap();

    // One image, its soft mask and one content stream
    assert_eq!(doc.inner().objects.len(), objects_before + 3);
}

#[test]
fn test_transparent_pixels_are_masked() {
    use image::{ImageBuffer, Rgba};

    // One opaque ink column, three transparent ones
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(4, 4, |x, _| {
        if x == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    let mut png = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let mut doc = PdfDocument::open_from_bytes(&create_test_pdf_with_pages(1)).unwrap();
    doc.insert_image(&png, 1, 72.0, 500.0, 150.0, 50.0).unwrap();
    let saved = doc.to_bytes().unwrap();

    let reopened = lopdf::Document::load_mem(&saved).unwrap();
    let page_id = reopened.get_pages()[&1];
    let resources = reopened
        .get_dictionary(page_id)
        .unwrap()
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap();
    let image_id = resources
        .get(b"XObject")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"SigIm1")
        .unwrap()
        .as_reference()
        .unwrap();
    let image = reopened.get_object(image_id).unwrap().as_stream().unwrap();

    let smask_id = image.dict.get(b"SMask").unwrap().as_reference().unwrap();
    let smask = reopened.get_object(smask_id).unwrap().as_stream().unwrap();
    let alpha = smask.decompressed_content().unwrap();
    assert_eq!(alpha.len(), 16);
    for row in alpha.chunks(4) {
        assert_eq!(row, &[255, 0, 0, 0]);
    }

    // Color samples are not flattened onto white
    let rgb = image.decompressed_content().unwrap();
    assert_eq!(&rgb[3..6], &[0, 0, 0]);
}

const IDENTITY_UCS_CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo
<< /Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0020> <007E> <0020>
endbfrange
1 beginbfchar
<0130> <0130>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

/// Type0 font with `Identity-H` codes, a `/ToUnicode` map and `$` 700 wide
fn add_identity_font(doc: &mut lopdf::Document) -> lopdf::ObjectId {
    let to_unicode = doc.add_object(Stream::new(dictionary! {}, IDENTITY_UCS_CMAP.to_vec()));
    let descendant = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "NotoSans",
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "DW" => 500,
        "W" => vec![Object::Integer(36), Object::Array(vec![Object::Integer(700)])],
    });
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "NotoSans",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(descendant)],
        "ToUnicode" => to_unicode,
    })
}

/// Two-byte `Identity-H` codes for text whose CIDs equal its code points
fn identity_string(text: &str) -> Object {
    let bytes = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
    Object::String(bytes, lopdf::StringFormat::Hexadecimal)
}

/// One 600x400 page; `build` adds its objects and returns content and resources
fn create_single_page_pdf(
    build: impl FnOnce(&mut lopdf::Document) -> (Vec<Operation>, lopdf::Dictionary),
) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let (operations, resources) = build(&mut doc);

    let content = Content { operations };
    let contents_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 600.into(), 400.into()],
        "Resources" => resources,
        "Contents" => contents_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A form XObject drawing `text` at (50, 100) in its own Helvetica
fn add_text_form(doc: &mut lopdf::Document, text: &str, matrix: [i64; 6]) -> lopdf::ObjectId {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F9".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 100.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 600.into(), 400.into()],
            "Matrix" => matrix.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F9" => font_id },
            },
        },
        content.encode().unwrap(),
    ))
}

#[test]
fn test_type0_text_decodes_through_to_unicode() {
    let pdf = create_single_page_pdf(|doc| {
        let font_id = add_identity_font(doc);
        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F0".into(), 10.into()]),
            Operation::new("Td", vec![50.into(), 100.into()]),
            Operation::new("Tj", vec![identity_string("İmza: $SIGNATURE$")]),
            Operation::new("ET", vec![]),
        ];
        let resources = dictionary! { "Font" => dictionary! { "F0" => font_id } };
        (operations, resources)
    });

    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let fragments = doc.text_fragments(1).unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "İmza: $SIGNATURE$");
    assert_eq!((fragments[0].x, fragments[0].y), (50.0, 100.0));
}

#[test]
fn test_type0_text_advances_by_cid_widths() {
    let pdf = create_single_page_pdf(|doc| {
        let font_id = add_identity_font(doc);
        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F0".into(), 10.into()]),
            Operation::new("Td", vec![50.into(), 100.into()]),
            Operation::new("Tj", vec![identity_string("$$")]),
            Operation::new("Tj", vec![identity_string("ab")]),
            Operation::new("Tj", vec![identity_string("c")]),
            Operation::new("ET", vec![]),
        ];
        let resources = dictionary! { "Font" => dictionary! { "F0" => font_id } };
        (operations, resources)
    });

    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let fragments = doc.text_fragments(1).unwrap();
    // "$" uses its /W entry (7pt), the rest the /DW default (5pt)
    assert!((fragments[1].x - 64.0).abs() < 0.01);
    assert!((fragments[2].x - 74.0).abs() < 0.01);
    assert_eq!(fragments[1].text, "ab");
}

#[test]
fn test_form_xobject_text_is_extracted() {
    let pdf = create_single_page_pdf(|doc| {
        let form_id = add_text_form(doc, "Sign: $SIGNATURE$", [1, 0, 0, 1, 10, 20]);
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("cm", vec![1.into(), 0.into(), 0.into(), 1.into(), 5.into(), 5.into()]),
            Operation::new("Do", vec!["Fm1".into()]),
            Operation::new("Q", vec![]),
        ];
        let resources = dictionary! { "XObject" => dictionary! { "Fm1" => form_id } };
        (operations, resources)
    });

    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let fragments = doc.text_fragments(1).unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "Sign: $SIGNATURE$");
    // Form matrix then page CTM: 50 + 10 + 5, 100 + 20 + 5
    assert!((fragments[0].x - 65.0).abs() < 0.01);
    assert!((fragments[0].y - 125.0).abs() < 0.01);
    assert_eq!(fragments[0].font_size, 12.0);
}

#[test]
fn test_self_referencing_form_terminates() {
    let pdf = create_single_page_pdf(|doc| {
        let form_id = doc.new_object_id();
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Td", vec![0.into(), 10.into()]),
                Operation::new("Tj", vec![Object::string_literal("loop")]),
                Operation::new("ET", vec![]),
                Operation::new("Do", vec!["Fm1".into()]),
            ],
        };
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 600.into(), 400.into()],
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Fm1" => form_id },
                },
            },
            content.encode().unwrap(),
        );
        doc.objects.insert(form_id, Object::Stream(form));

        let operations = vec![Operation::new("Do", vec!["Fm1".into()])];
        let resources = dictionary! { "XObject" => dictionary! { "Fm1" => form_id } };
        (operations, resources)
    });

    let doc = PdfDocument::open_from_bytes(&pdf).unwrap();
    let fragments = doc.text_fragments(1).unwrap();
    assert!(!fragments.is_empty());
    assert!(fragments.len() <= 16);
    assert!(fragments.iter().all(|f| f.text == "loop"));
}
