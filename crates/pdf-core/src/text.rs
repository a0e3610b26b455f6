//! Positioned text extraction from page content streams
//!
//! Walks the text operators of a page and records one fragment per show
//! operator (`Tj`, `TJ`, `'`, `"`), positioned at the origin of the text
//! rendering matrix (text matrix × CTM). Coordinates are PDF user space:
//! points, bottom-left origin.
//!
//! Strings are decoded through the font's encoding (including `/ToUnicode`
//! maps on Type0 fonts) and form XObjects drawn with `Do` are interpreted
//! in place.

use crate::{PdfError, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Glyph advance used when a font carries no usable `/Widths`
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// CIDFont advance when the descendant has no `/DW`
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// Nesting limit for forms drawing forms
const MAX_FORM_DEPTH: usize = 8;

/// A run of text drawn by a single show operator
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Decoded text
    pub text: String,
    /// Origin X in points
    pub x: f64,
    /// Origin Y in points (from bottom)
    pub y: f64,
    /// Font size in text space units
    pub font_size: f64,
}

/// 2D affine transform `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f64; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`: apply `self` first, then `other`
    pub fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    /// Image of the origin under this transform
    pub fn origin(&self) -> (f64, f64) {
        (self.0[4], self.0[5])
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Decode a PDF string operand
///
/// UTF-16BE when the BOM is present, otherwise one byte per character
/// (Latin-1, which agrees with WinAnsi/Standard on ASCII).
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|&b| b as char).collect()
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f64; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(out)
}

/// Follow a reference, if any
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Glyph advances of one font (text space units × 1000)
#[derive(Debug, Clone)]
enum FontMetrics {
    /// One byte per code, widths indexed from `/FirstChar`
    Simple {
        first_char: i64,
        widths: Vec<f64>,
        missing_width: f64,
    },
    /// Type0: two bytes per code, widths by CID from the descendant's `/W`
    ///
    /// Codes are taken as CIDs, which holds for `Identity-H`/`Identity-V`.
    Composite {
        default_width: f64,
        widths: HashMap<u32, f64>,
    },
}

impl FontMetrics {
    fn fallback() -> Self {
        FontMetrics::Simple {
            first_char: 0,
            widths: Vec::new(),
            missing_width: DEFAULT_GLYPH_WIDTH,
        }
    }

    fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        if font.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Type0"[..]) {
            return Self::composite(doc, font);
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(number)
            .map(|v| v as i64)
            .unwrap_or(0);
        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|w| resolve(doc, w))
            .and_then(|w| w.as_array().ok())
            .map(|arr| arr.iter().map(|w| number(w).unwrap_or(0.0)).collect())
            .unwrap_or_default();
        let missing_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| resolve(doc, d))
            .and_then(|d| d.as_dict().ok())
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(number)
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_GLYPH_WIDTH);

        FontMetrics::Simple {
            first_char,
            widths,
            missing_width,
        }
    }

    fn composite(doc: &Document, font: &Dictionary) -> Self {
        let descendant = font
            .get(b"DescendantFonts")
            .ok()
            .and_then(|d| resolve(doc, d))
            .and_then(|d| d.as_array().ok())
            .and_then(|d| d.first())
            .and_then(|d| resolve(doc, d))
            .and_then(|d| d.as_dict().ok());

        let default_width = descendant
            .and_then(|d| d.get(b"DW").ok())
            .and_then(number)
            .unwrap_or(DEFAULT_CID_WIDTH);
        let widths = descendant
            .and_then(|d| d.get(b"W").ok())
            .and_then(|w| resolve(doc, w))
            .and_then(|w| w.as_array().ok())
            .map(|w| cid_widths(doc, w))
            .unwrap_or_default();

        FontMetrics::Composite {
            default_width,
            widths,
        }
    }

    /// Bytes per character code
    fn code_len(&self) -> usize {
        match self {
            FontMetrics::Simple { .. } => 1,
            FontMetrics::Composite { .. } => 2,
        }
    }

    fn width(&self, code: u32) -> f64 {
        match self {
            FontMetrics::Simple {
                first_char,
                widths,
                missing_width,
            } => {
                let index = code as i64 - first_char;
                if index >= 0 {
                    if let Some(w) = widths.get(index as usize) {
                        if *w > 0.0 {
                            return *w;
                        }
                    }
                }
                *missing_width
            }
            FontMetrics::Composite {
                default_width,
                widths,
            } => widths.get(&code).copied().unwrap_or(*default_width),
        }
    }
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` and `c_first c_last w` runs
fn cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;

    while i < w.len() {
        let Some(first) = number(&w[i]).map(|v| v as u32) else {
            break;
        };
        match w.get(i + 1).and_then(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    if let Some(width) = number(width) {
                        widths.insert(first + offset as u32, width);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(width)) = (number(last), w.get(i + 2).and_then(number)) else {
                    break;
                };
                let last = (last as u32).min(first.saturating_add(u16::MAX as u32));
                for cid in first..=last {
                    widths.insert(cid, width);
                }
                i += 3;
            }
            None => break,
        }
    }

    widths
}

/// A font as seen by the interpreter: advances plus lopdf's text decoding
struct PageFont<'a> {
    metrics: FontMetrics,
    encoding: Option<Encoding<'a>>,
}

/// Fonts and form XObjects of one resource dictionary
#[derive(Default)]
struct Resources<'a> {
    fonts: HashMap<Vec<u8>, PageFont<'a>>,
    forms: HashMap<Vec<u8>, &'a Stream>,
}

fn sub_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    dict.get(key)
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
}

impl<'a> Resources<'a> {
    fn load(doc: &'a Document, resources: &'a Dictionary) -> Self {
        let mut loaded = Self::default();

        if let Some(fonts) = sub_dict(doc, resources, b"Font") {
            for (name, font) in fonts.iter() {
                if let Some(font) = resolve(doc, font).and_then(|f| f.as_dict().ok()) {
                    let page_font = PageFont {
                        metrics: FontMetrics::from_dict(doc, font),
                        encoding: font.get_font_encoding(doc).ok(),
                    };
                    loaded.fonts.insert(name.clone(), page_font);
                }
            }
        }

        if let Some(xobjects) = sub_dict(doc, resources, b"XObject") {
            for (name, xobject) in xobjects.iter() {
                if let Some(stream) = resolve(doc, xobject).and_then(|x| x.as_stream().ok()) {
                    if stream.dict.get(b"Subtype").and_then(Object::as_name).ok()
                        == Some(&b"Form"[..])
                    {
                        loaded.forms.insert(name.clone(), stream);
                    }
                }
            }
        }

        loaded
    }
}

/// Find the page's `/Resources`, following inheritance
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = doc.get_object(page_id).ok();

    for _ in 0..10 {
        let dict = current.and_then(|o| o.as_dict().ok())?;
        if let Some(resources) = sub_dict(doc, dict, b"Resources") {
            return Some(resources);
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => doc.get_object(*parent).ok(),
            _ => None,
        };
    }

    None
}

/// Parameters saved by `q` and restored by `Q`
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    font: Option<Vec<u8>>,
    font_size: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            font: None,
            font_size: 0.0,
        }
    }
}

struct TextInterpreter<'a> {
    doc: &'a Document,
    resources: Resources<'a>,
    fallback: FontMetrics,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    /// `Q` never pops below this (the state saved around a form)
    stack_floor: usize,
    form_depth: usize,
    text_matrix: Matrix,
    line_matrix: Matrix,
    fragments: Vec<TextFragment>,
}

impl<'a> TextInterpreter<'a> {
    fn new(doc: &'a Document, resources: Resources<'a>) -> Self {
        Self {
            doc,
            resources,
            fallback: FontMetrics::fallback(),
            state: GraphicsState::default(),
            stack: Vec::new(),
            stack_floor: 0,
            form_depth: 0,
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            fragments: Vec::new(),
        }
    }

    fn current_font(&self) -> Option<&PageFont<'a>> {
        self.state
            .font
            .as_ref()
            .and_then(|name| self.resources.fonts.get(name))
    }

    fn metrics(&self) -> &FontMetrics {
        self.current_font()
            .map(|font| &font.metrics)
            .unwrap_or(&self.fallback)
    }

    /// Decode through the font's encoding, else as a plain PDF string
    fn decode(&self, bytes: &[u8]) -> String {
        self.current_font()
            .and_then(|font| font.encoding.as_ref())
            .and_then(|encoding| Document::decode_text(encoding, bytes).ok())
            .unwrap_or_else(|| decode_pdf_string(bytes))
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f64) {
        self.text_matrix = Matrix::translate(tx, 0.0).then(&self.text_matrix);
    }

    /// Horizontal displacement of a string in unscaled text space
    fn string_advance(&self, bytes: &[u8]) -> f64 {
        let metrics = self.metrics();
        let code_len = metrics.code_len();
        let size = self.state.font_size;
        bytes
            .chunks(code_len)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
                let mut w = metrics.width(code) / 1000.0 * size + self.state.char_spacing;
                if code_len == 1 && code == 32 {
                    w += self.state.word_spacing;
                }
                w
            })
            .sum::<f64>()
            * self.state.horizontal_scale
    }

    /// Record a fragment at the current origin, then advance past it
    fn show(&mut self, parts: &[&Object]) {
        let origin = self.text_matrix.then(&self.state.ctm).origin();
        let mut text = String::new();

        for part in parts {
            match part {
                Object::String(bytes, _) => {
                    text.push_str(&self.decode(bytes));
                    let tx = self.string_advance(bytes);
                    self.advance(tx);
                }
                other => {
                    if let Some(adjust) = number(other) {
                        let tx = -adjust / 1000.0
                            * self.state.font_size
                            * self.state.horizontal_scale;
                        self.advance(tx);
                    }
                }
            }
        }

        if !text.is_empty() {
            self.fragments.push(TextFragment {
                text,
                x: origin.0,
                y: origin.1,
                font_size: self.state.font_size,
            });
        }
    }

    /// Interpret a form XObject's content in place of its `Do`
    fn draw_form(&mut self, name: &[u8]) {
        if self.form_depth >= MAX_FORM_DEPTH {
            return;
        }
        let Some(&form) = self.resources.forms.get(name) else {
            return;
        };
        let Some(content) = form
            .get_plain_content()
            .ok()
            .and_then(|data| Content::decode(&data).ok())
        else {
            return;
        };

        let matrix = form
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| m.as_array().ok())
            .and_then(|m| numbers::<6>(m))
            .map(Matrix)
            .unwrap_or(Matrix::IDENTITY);
        // A form without its own resources uses the enclosing ones
        let inner = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(self.doc, r))
            .and_then(|r| r.as_dict().ok())
            .map(|r| Resources::load(self.doc, r));

        let saved_floor = self.stack_floor;
        let saved_text = (self.text_matrix, self.line_matrix);
        self.stack.push(self.state.clone());
        self.stack_floor = self.stack.len();
        self.state.ctm = matrix.then(&self.state.ctm);
        let outer = inner.map(|r| std::mem::replace(&mut self.resources, r));
        self.form_depth += 1;

        for op in &content.operations {
            self.apply(&op.operator, &op.operands);
        }

        self.form_depth -= 1;
        if let Some(outer) = outer {
            self.resources = outer;
        }
        self.stack.truncate(self.stack_floor);
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
        self.stack_floor = saved_floor;
        (self.text_matrix, self.line_matrix) = saved_text;
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if self.stack.len() > self.stack_floor {
                    if let Some(state) = self.stack.pop() {
                        self.state = state;
                    }
                }
            }
            "cm" => {
                if let Some(m) = numbers::<6>(operands) {
                    self.state.ctm = Matrix(m).then(&self.state.ctm);
                }
            }
            "Do" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    self.draw_form(name);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    self.state.font = Some(name.to_vec());
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    self.state.font_size = size;
                }
            }
            "Tc" => {
                if let Some([v]) = numbers::<1>(operands) {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some([v]) = numbers::<1>(operands) {
                    self.state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some([v]) = numbers::<1>(operands) {
                    self.state.horizontal_scale = v / 100.0;
                }
            }
            "TL" => {
                if let Some([v]) = numbers::<1>(operands) {
                    self.state.leading = v;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = numbers::<6>(operands) {
                    self.text_matrix = Matrix(m);
                    self.line_matrix = self.text_matrix;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(s) = operands.first() {
                    self.show(&[s]);
                }
            }
            "TJ" => {
                if let Some(Ok(array)) = operands.first().map(|o| o.as_array()) {
                    let parts: Vec<&Object> = array.iter().collect();
                    self.show(&parts);
                }
            }
            "'" => {
                self.next_line();
                if let Some(s) = operands.first() {
                    self.show(&[s]);
                }
            }
            "\"" => {
                if let Some([aw, ac]) = numbers::<2>(operands) {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                }
                self.next_line();
                if let Some(s) = operands.get(2) {
                    self.show(&[s]);
                }
            }
            _ => {}
        }
    }
}

/// Extract positioned text fragments from one page, in content-stream order
pub(crate) fn extract_fragments(doc: &Document, page_id: ObjectId) -> Result<Vec<TextFragment>> {
    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| PdfError::ParseError(format!("Failed to read page content: {e}")))?;
    let content = Content::decode(&content_data)
        .map_err(|e| PdfError::ParseError(format!("Failed to decode page content: {e}")))?;

    let resources = page_resources(doc, page_id)
        .map(|r| Resources::load(doc, r))
        .unwrap_or_default();
    let mut interpreter = TextInterpreter::new(doc, resources);
    for op in &content.operations {
        interpreter.apply(&op.operator, &op.operands);
    }

    Ok(interpreter.fragments)
}
