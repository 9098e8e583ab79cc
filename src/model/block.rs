//! Block-level geometry types: spans, lines, blocks.

use serde::{Deserialize, Serialize};

/// Style flag bits carried by a [`Span`].
pub struct StyleFlags;

impl StyleFlags {
    /// Bit value marking a bold span.
    pub const BOLD: u32 = 2;
}

/// A run of text sharing one font size and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// The text content
    #[serde(default)]
    pub text: String,
    /// Font size in points
    pub size: f64,
    /// Style bit field; see [`StyleFlags`]
    #[serde(default)]
    pub flags: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(text: impl Into<String>, size: f64, flags: u32) -> Self {
        Self {
            text: text.into(),
            size,
            flags,
        }
    }

    /// Create a plain (non-bold) span.
    pub fn plain(text: impl Into<String>, size: f64) -> Self {
        Self::new(text, size, 0)
    }

    /// Create a bold span.
    pub fn bold(text: impl Into<String>, size: f64) -> Self {
        Self::new(text, size, StyleFlags::BOLD)
    }

    /// Whether the bold bit is set.
    pub fn is_bold(&self) -> bool {
        self.flags & StyleFlags::BOLD != 0
    }
}

/// A line of spans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Spans in reading order
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl Line {
    /// Create a line from spans.
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    /// Concatenated text of the line's spans (untrimmed).
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Axis-aligned bounding box in page coordinates (origin top-left, y grows down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    /// Largest coordinate magnitude accepted as page geometry.
    pub const MAX_COORDINATE: f64 = 1.0e9;

    /// Create a bounding box from its corners.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Midpoint of the box.
    pub fn centroid(&self) -> [f64; 2] {
        [(self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0]
    }

    /// Whether every corner is finite and within [`Self::MAX_COORDINATE`].
    pub fn is_valid(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite() && v.abs() <= Self::MAX_COORDINATE)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// A bounded text region on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Bounding box in page coordinates
    pub bbox: BBox,
    /// Lines in reading order
    #[serde(default)]
    pub lines: Vec<Line>,
    /// Width of the owning page, for normalization
    #[serde(default)]
    pub page_width: f64,
    /// Height of the owning page, for normalization
    #[serde(default)]
    pub page_height: f64,
}

impl Block {
    /// Create a block with no page dimensions set.
    pub fn new(bbox: BBox, lines: Vec<Line>) -> Self {
        Self {
            bbox,
            lines,
            page_width: 0.0,
            page_height: 0.0,
        }
    }

    /// Create a single-line block from spans.
    pub fn from_spans(bbox: BBox, spans: Vec<Span>) -> Self {
        Self::new(bbox, vec![Line::new(spans)])
    }

    /// Set the owning page's dimensions.
    pub fn with_page_size(mut self, width: f64, height: f64) -> Self {
        self.page_width = width;
        self.page_height = height;
        self
    }

    /// Iterate over all spans of all lines.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.lines.iter().flat_map(|l| l.spans.iter())
    }

    /// Whether the block holds at least one span.
    pub fn has_spans(&self) -> bool {
        self.spans().next().is_some()
    }

    /// Mean span font size, 0.0 without spans.
    pub fn mean_font_size(&self) -> f64 {
        let (sum, count) = self
            .spans()
            .fold((0.0_f64, 0usize), |(sum, count), s| (sum + s.size, count + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Whether any span carries the bold bit.
    pub fn is_bold(&self) -> bool {
        self.spans().any(Span::is_bold)
    }

    /// All span text concatenated without separators, trimmed.
    pub fn text(&self) -> String {
        let raw: String = self.spans().map(|s| s.text.as_str()).collect();
        raw.trim().to_string()
    }

    /// Text of the first line, untrimmed.
    pub fn first_line_text(&self) -> String {
        self.lines.first().map(Line::text).unwrap_or_default()
    }

    /// Centroid of the bounding box.
    pub fn centroid(&self) -> [f64; 2] {
        self.bbox.centroid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block::new(
            BBox::new(10.0, 20.0, 110.0, 40.0),
            vec![
                Line::new(vec![Span::bold("  Intro", 14.0), Span::plain("duction", 10.0)]),
                Line::new(vec![Span::plain(" text ", 12.0)]),
            ],
        )
    }

    #[test]
    fn test_block_derived_values() {
        let block = sample_block();
        assert!((block.mean_font_size() - 12.0).abs() < 1e-9);
        assert!(block.is_bold());
        assert_eq!(block.text(), "Introduction text");
        assert_eq!(block.centroid(), [60.0, 30.0]);
    }

    #[test]
    fn test_empty_block() {
        let block = Block::new(BBox::default(), vec![]);
        assert_eq!(block.mean_font_size(), 0.0);
        assert!(!block.is_bold());
        assert!(block.text().is_empty());
        assert!(!block.has_spans());
    }

    #[test]
    fn test_bold_bit() {
        assert!(Span::new("a", 10.0, 2).is_bold());
        assert!(Span::new("a", 10.0, 6).is_bold());
        assert!(!Span::new("a", 10.0, 16).is_bold());
    }

    #[test]
    fn test_block_deserialize_dict_shape() {
        let json = r#"{
            "bbox": [72.0, 90.5, 300.0, 110.0],
            "lines": [{"spans": [{"text": "Title", "size": 24.0, "flags": 20}]}]
        }"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.bbox.x0, 72.0);
        assert_eq!(block.bbox.y1, 110.0);
        assert_eq!(block.text(), "Title");
        assert_eq!(block.page_width, 0.0);
    }
}
