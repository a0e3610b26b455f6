//! PDF Document wrapper

use crate::image::{generate_image_operators, ImageXObject};
use crate::text::{extract_fragments, TextFragment};
use crate::{PdfError, Result, A4_HEIGHT, A4_WIDTH};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Native page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn a4() -> Self {
        Self {
            width: A4_WIDTH,
            height: A4_HEIGHT,
        }
    }
}

/// PDF Document wrapper providing high-level operations
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Embedded images (data hash -> PDF object ID)
    embedded_images: HashMap<u64, ObjectId>,
    /// Page image resources (page number -> object ID -> resource name)
    page_image_resources: HashMap<usize, HashMap<ObjectId, String>>,
    /// Next image resource number
    next_image_resource: u32,
    /// Buffered content operators per page (page number -> operators)
    page_content_buffer: HashMap<usize, Vec<u8>>,
}

impl PdfDocument {
    fn from_inner(inner: Document) -> Self {
        Self {
            inner,
            embedded_images: HashMap::new(),
            page_image_resources: HashMap::new(),
            next_image_resource: 1,
            page_content_buffer: HashMap::new(),
        }
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_inner(inner))
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        pages
            .get(&(page as u32))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))
    }

    /// Get the page size in points
    ///
    /// Reads the MediaBox (or CropBox), following the parent chain for
    /// inherited boxes. Pages with no box at all are treated as A4.
    ///
    /// # Arguments
    /// * `page` - Page number (1-indexed)
    pub fn page_size(&self, page: usize) -> Result<PageSize> {
        let page_id = self.page_id(page)?;

        match self.get_inherited_media_box(page_id)? {
            Some(media_box) => size_from_media_box(&media_box),
            None => Ok(PageSize::a4()),
        }
    }

    /// Extract positioned text fragments from a page
    ///
    /// # Arguments
    /// * `page` - Page number (1-indexed)
    pub fn text_fragments(&self, page: usize) -> Result<Vec<TextFragment>> {
        let page_id = self.page_id(page)?;
        extract_fragments(&self.inner, page_id)
    }

    /// Insert an image at a specific position
    ///
    /// # Arguments
    /// * `data` - PNG file bytes
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate of the lower-left corner in points
    /// * `y` - Y coordinate of the lower-left corner in points (from bottom)
    /// * `width` - Image width in points
    /// * `height` - Image height in points
    pub fn insert_image(
        &mut self,
        data: &[u8],
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }

        let resource_name = self.get_or_create_image_ref(data, page)?;
        let operators = generate_image_operators(&resource_name, x, y, width, height);

        // Flushed to the page once, at save time
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(&operators);

        Ok(())
    }

    /// Number of distinct image objects embedded so far
    pub fn embedded_image_count(&self) -> usize {
        self.embedded_images.len()
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush_content_buffers()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Get MediaBox, following parent inheritance chain if needed
    fn get_inherited_media_box(&self, page_id: ObjectId) -> Result<Option<Vec<Object>>> {
        let mut current_id = page_id;

        // Follow parent chain up to 10 levels (safety limit)
        for _ in 0..10 {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            if let Ok(media_box) = dict.get(b"MediaBox").or_else(|_| dict.get(b"CropBox")) {
                let media_box = match media_box {
                    Object::Array(arr) => arr.clone(),
                    Object::Reference(ref_id) => self
                        .inner
                        .get_object(*ref_id)?
                        .as_array()
                        .map_err(|_| {
                            PdfError::ParseError("MediaBox reference is not an array".to_string())
                        })?
                        .clone(),
                    _ => return Err(PdfError::ParseError("MediaBox is not an array".to_string())),
                };
                return Ok(Some(media_box));
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(None)
    }

    /// Resolve the Resources dictionary a page actually uses (own or inherited)
    fn effective_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        let mut current_id = page_id;

        for _ in 0..10 {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            match dict.get(b"Resources") {
                Ok(Object::Dictionary(resources)) => return Ok(resources.clone()),
                Ok(Object::Reference(ref_id)) => {
                    if let Ok(resources) = self.inner.get_object(*ref_id)?.as_dict() {
                        return Ok(resources.clone());
                    }
                    return Ok(Dictionary::new());
                }
                _ => {}
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(Dictionary::new())
    }

    /// Get or create an image resource for a specific page
    ///
    /// Returns the resource name used in content streams. Image objects are
    /// deduplicated by a hash of their source bytes, so one signature drawn
    /// into many zones is embedded once.
    fn get_or_create_image_ref(&mut self, data: &[u8], page: usize) -> Result<String> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let data_hash = hasher.finish();

        let object_id = match self.embedded_images.get(&data_hash) {
            Some(id) => *id,
            None => {
                let id = ImageXObject::from_png(data)?.embed(&mut self.inner);
                self.embedded_images.insert(data_hash, id);
                id
            }
        };

        if let Some(name) = self
            .page_image_resources
            .get(&page)
            .and_then(|resources| resources.get(&object_id))
        {
            return Ok(name.clone());
        }

        let resource_name = format!("SigIm{}", self.next_image_resource);
        self.next_image_resource += 1;

        self.add_image_to_page_resources(page, &resource_name, object_id)?;
        self.page_image_resources
            .entry(page)
            .or_default()
            .insert(object_id, resource_name.clone());

        Ok(resource_name)
    }

    /// Add image to a specific page's Resources dictionary
    ///
    /// Inherited or indirect Resources are copied onto the page so the new
    /// XObject entry does not leak into sibling pages.
    fn add_image_to_page_resources(
        &mut self,
        page: usize,
        resource_name: &str,
        object_id: ObjectId,
    ) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut resources = self.effective_resources(page_id)?;

        let mut xobjects = match resources.get(b"XObject") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(ref_id)) => self
                .inner
                .get_object(*ref_id)
                .and_then(|o| o.as_dict())
                .map(|d| d.clone())
                .unwrap_or_else(|_| Dictionary::new()),
            _ => Dictionary::new(),
        };
        xobjects.set(resource_name.as_bytes(), Object::Reference(object_id));
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::SaveError("Page object is not a dictionary".to_string()))?
            .clone();
        page_dict.set("Resources", Object::Dictionary(resources));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }

    /// Flush all buffered content to page streams
    ///
    /// Called once during save/to_bytes, so each page gains at most one new
    /// content stream no matter how many images were drawn on it.
    fn flush_content_buffers(&mut self) -> Result<()> {
        let buffers: Vec<(usize, Vec<u8>)> = self.page_content_buffer.drain().collect();

        for (page, content) in buffers {
            if !content.is_empty() {
                self.append_to_content_stream(page, &content)?;
            }
        }

        Ok(())
    }

    /// Append content to a page's content stream
    ///
    /// The existing content is wrapped in `q`/`Q` so any transform it leaves
    /// behind cannot displace the overlay.
    fn append_to_content_stream(&mut self, page: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page)?;

        let existing = self.inner.get_page_content(page_id).unwrap_or_default();

        let mut new_content = Vec::with_capacity(existing.len() + content.len() + 8);
        new_content.extend_from_slice(b"q\n");
        new_content.extend_from_slice(&existing);
        new_content.extend_from_slice(b"\nQ\n");
        new_content.extend_from_slice(content);

        let stream_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), new_content));

        let mut page_dict = self
            .inner
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?
            .clone();
        page_dict.set("Contents", Object::Reference(stream_id));
        self.inner.objects.insert(page_id, page_dict.into());

        Ok(())
    }
}

fn box_coordinate(obj: &Object, label: &str) -> Result<f64> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(r) => Ok(*r as f64),
        _ => Err(PdfError::ParseError(format!("Invalid MediaBox {label}"))),
    }
}

/// Extract width and height from a MediaBox array
fn size_from_media_box(media_box: &[Object]) -> Result<PageSize> {
    if media_box.len() < 4 {
        return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
    }

    let x1 = box_coordinate(&media_box[0], "x1")?;
    let y1 = box_coordinate(&media_box[1], "y1")?;
    let x2 = box_coordinate(&media_box[2], "x2")?;
    let y2 = box_coordinate(&media_box[3], "y2")?;

    Ok(PageSize {
        width: (x2 - x1).abs(),
        height: (y2 - y1).abs(),
    })
}
