//! PDF extraction backed by lopdf.
//!
//! Text-showing operators are interpreted against a minimal text state
//! (font, size, text matrix, leading) to recover positioned runs, which
//! [`layout`](super::layout) then groups into blocks.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::layout::{build_blocks, RawSpan};
use super::BlockExtractor;
use crate::error::{Error, Result};
use crate::model::Page;

const PDF_MAGIC: &[u8] = b"%PDF-";
/// Length of the `%PDF-x.y` header.
const HEADER_LEN: usize = 8;
/// Letter size, used when a page has no usable media box.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];
/// `TJ` adjustments beyond this many thousandths of an em read as word gaps.
const TJ_SPACE_THRESHOLD: f64 = 200.0;

/// Whether `data` starts with a `%PDF-d.d` header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    if data.len() < HEADER_LEN || !data.starts_with(PDF_MAGIC) {
        return false;
    }
    let version = &data[PDF_MAGIC.len()..HEADER_LEN];
    version[0].is_ascii_digit() && version[1] == b'.' && version[2].is_ascii_digit()
}

/// Extractor for `.pdf` files.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn load(bytes: &[u8]) -> Result<LopdfDocument> {
        if !is_pdf_bytes(bytes) {
            return Err(Error::UnknownFormat("missing %PDF- header".into()));
        }
        let doc = LopdfDocument::load_mem(bytes)?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(doc)
    }
}

impl BlockExtractor for PdfExtractor {
    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn extract_bytes(&self, bytes: &[u8]) -> Result<Vec<Page>> {
        let doc = Self::load(bytes)?;
        let pages = doc.get_pages();
        let mut out = Vec::with_capacity(pages.len());

        for (index, (number, page_id)) in pages.iter().enumerate() {
            let [x0, y0, x1, y1] = media_box(&doc, *page_id);
            let mut page = Page::new(index as u32 + 1, x1 - x0, y1 - y0);

            match page_spans(&doc, *page_id) {
                Ok(spans) => {
                    for block in build_blocks(spans, (x0, y0), page.height) {
                        page.add_block(block);
                    }
                }
                Err(e) => log::warn!("Skipping text of page {}: {}", number, e),
            }

            log::debug!("Page {}: {} blocks", number, page.block_count());
            out.push(page);
        }

        Ok(out)
    }
}

fn media_box(doc: &LopdfDocument, page_id: ObjectId) -> [f64; 4] {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return DEFAULT_MEDIA_BOX;
    };
    let Some(array) = page.get(b"MediaBox").ok().and_then(|o| o.as_array().ok()) else {
        return DEFAULT_MEDIA_BOX;
    };
    if array.len() < 4 {
        return DEFAULT_MEDIA_BOX;
    }

    let mut rect = DEFAULT_MEDIA_BOX;
    for (slot, obj) in rect.iter_mut().zip(array) {
        if let Some(v) = number(obj) {
            *slot = v;
        }
    }
    if rect[2] <= rect[0] || rect[3] <= rect[1] {
        return DEFAULT_MEDIA_BOX;
    }
    rect
}

fn page_content(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()),
    };

    let refs: Vec<ObjectId> = match contents {
        Object::Reference(r) => vec![*r],
        Object::Array(arr) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => return Err(Error::PdfParse("invalid content stream".into())),
    };

    let mut content = Vec::new();
    for r in refs {
        if let Ok(Object::Stream(s)) = doc.get_object(r) {
            match s.decompressed_content() {
                Ok(data) => content.extend_from_slice(&data),
                Err(_) => content.extend_from_slice(&s.content),
            }
            content.push(b' ');
        }
    }
    Ok(content)
}

/// Font resources of a page, keyed by resource name.
type PageFonts<'a> = BTreeMap<Vec<u8>, &'a Dictionary>;

fn base_font(fonts: &PageFonts<'_>, font: &[u8]) -> String {
    fonts
        .get(font)
        .and_then(|f| f.get(b"BaseFont").ok())
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).to_string())
        .unwrap_or_default()
}

fn page_spans(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<RawSpan>> {
    let fonts = doc.get_page_fonts(page_id)?;
    let content = Content::decode(&page_content(doc, page_id)?)?;

    let mut state = TextState::default();
    let mut spans = Vec::new();

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => state.begin(),
            "ET" => state.in_text = false,
            "Tf" if operands.len() >= 2 => {
                if let Object::Name(name) = &operands[0] {
                    state.font = name.clone();
                }
                state.font_size = number(&operands[1]).unwrap_or(12.0);
            }
            "TL" => state.leading = operands.first().and_then(number).unwrap_or(0.0),
            "Td" | "TD" if operands.len() >= 2 => {
                let tx = number(&operands[0]).unwrap_or(0.0);
                let ty = number(&operands[1]).unwrap_or(0.0);
                if op.operator == "TD" {
                    state.leading = -ty;
                }
                state.matrix.translate(tx, ty);
            }
            "Tm" if operands.len() >= 6 => {
                let v: Vec<f64> = operands.iter().take(6).map(|o| number(o).unwrap_or(0.0)).collect();
                state.matrix = TextMatrix::new(v[0], v[1], v[2], v[3], v[4], v[5]);
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = decode(doc, &fonts, &state.font, bytes);
                    state.emit(text, &fonts, &mut spans);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let text = decode_array(doc, &fonts, &state.font, items);
                    state.emit(text, &fonts, &mut spans);
                }
            }
            "'" | "\"" => {
                state.next_line();
                let idx = if op.operator == "\"" { 2 } else { 0 };
                if let Some(Object::String(bytes, _)) = operands.get(idx) {
                    let text = decode(doc, &fonts, &state.font, bytes);
                    state.emit(text, &fonts, &mut spans);
                }
            }
            _ => {}
        }
    }

    Ok(spans)
}

fn decode(doc: &LopdfDocument, fonts: &PageFonts<'_>, font: &[u8], bytes: &[u8]) -> String {
    let encoding = fonts.get(font).and_then(|f| f.get_font_encoding(doc).ok());
    match encoding {
        Some(ref enc) => LopdfDocument::decode_text(enc, bytes).unwrap_or_default(),
        None => decode_text_simple(bytes),
    }
}

fn decode_array(
    doc: &LopdfDocument,
    fonts: &PageFonts<'_>,
    font: &[u8],
    items: &[Object],
) -> String {
    let mut combined = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decode(doc, fonts, font, bytes)),
            other => {
                let gap = number(other).map(|n| -n).unwrap_or(0.0);
                if gap > TJ_SPACE_THRESHOLD && !combined.is_empty() && !combined.ends_with(' ') {
                    combined.push(' ');
                }
            }
        }
    }
    combined
}

/// Fallback decoding without a font encoding: UTF-16BE with BOM, UTF-8, else Latin-1.
fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Text matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy)]
struct TextMatrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }
}

impl TextMatrix {
    fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn scale(&self) -> f64 {
        (self.b * self.b + self.d * self.d).sqrt()
    }
}

#[derive(Debug, Default)]
struct TextState {
    in_text: bool,
    font: Vec<u8>,
    font_size: f64,
    leading: f64,
    matrix: TextMatrix,
}

impl TextState {
    fn begin(&mut self) {
        self.in_text = true;
        self.matrix = TextMatrix::default();
    }

    fn next_line(&mut self) {
        let leading = if self.leading > 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.matrix.translate(0.0, -leading);
    }

    fn emit(&self, text: String, fonts: &PageFonts<'_>, spans: &mut Vec<RawSpan>) {
        if !self.in_text || text.trim().is_empty() {
            return;
        }
        let font_name = base_font(fonts, &self.font);
        let size = self.font_size * self.matrix.scale();
        spans.push(RawSpan::new(text, self.matrix.e, self.matrix.f, size, &font_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3"));
        assert!(is_pdf_bytes(b"%PDF-2.0\n"));
        assert!(!is_pdf_bytes(b"%PDF"));
        assert!(!is_pdf_bytes(b"<!DOCTYPE html>"));
        assert!(!is_pdf_bytes(b"%PDF-x.y\n"));
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = PdfExtractor::new().extract_bytes(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, Error::UnknownFormat(_)));
    }

    #[test]
    fn test_truncated_pdf_is_error() {
        let result = PdfExtractor::new().extract_bytes(b"%PDF-1.4\n1 0 obj\n<<");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42]), "AB");
        assert_eq!(decode_text_simple(&[0x43, 0xE9]), "C\u{e9}");
    }

    #[test]
    fn test_text_state_line_advance() {
        let mut state = TextState {
            font_size: 10.0,
            ..Default::default()
        };
        state.begin();
        state.matrix.translate(72.0, 700.0);
        state.next_line();
        assert!((state.matrix.f - 688.0).abs() < 1e-9);

        state.leading = 14.0;
        state.next_line();
        assert!((state.matrix.f - 674.0).abs() < 1e-9);
        assert_eq!(state.matrix.e, 72.0);
    }

    #[test]
    fn test_decode_array_inserts_word_gaps() {
        let doc = LopdfDocument::new();
        let fonts = PageFonts::new();
        let items = vec![
            Object::string_literal("Hello"),
            Object::Integer(-250),
            Object::string_literal("world"),
            Object::Integer(-30),
            Object::string_literal("!"),
        ];
        assert_eq!(decode_array(&doc, &fonts, b"F1", &items), "Hello world!");
    }
}
