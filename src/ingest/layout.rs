//! Grouping of positioned PDF text runs into lines and blocks.
//!
//! Input coordinates are PDF user space (origin bottom-left, y grows up);
//! output blocks use top-left page coordinates.

use crate::model::{BBox, Block, Line, Span, StyleFlags};

/// Approximate ascender height as a share of the font size.
const ASCENT: f64 = 0.8;
/// Approximate descender depth as a share of the font size.
const DESCENT: f64 = 0.2;

/// A positioned text run from a content stream.
#[derive(Debug, Clone)]
pub(crate) struct RawSpan {
    pub text: String,
    /// Left edge
    pub x: f64,
    /// Baseline
    pub y: f64,
    /// Estimated advance width
    pub width: f64,
    /// Effective font size in points
    pub size: f64,
    pub bold: bool,
}

impl RawSpan {
    pub fn new(text: String, x: f64, y: f64, size: f64, font_name: &str) -> Self {
        let lower = font_name.to_lowercase();
        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        // Half an em per character
        let width = text.chars().count() as f64 * size * 0.5;

        Self {
            text,
            x,
            y,
            width,
            size,
            bold,
        }
    }

    fn right(&self) -> f64 {
        self.x + self.width
    }

    fn top(&self) -> f64 {
        self.y + self.size * ASCENT
    }

    fn bottom(&self) -> f64 {
        self.y - self.size * DESCENT
    }
}

/// Spans sharing a baseline, sorted left to right.
#[derive(Debug, Clone)]
pub(crate) struct RawLine {
    pub spans: Vec<RawSpan>,
    /// Baseline of the first span
    pub y: f64,
    /// Leftmost x
    pub x: f64,
    /// Character-weighted font size
    pub size: f64,
}

impl RawLine {
    fn from_spans(mut spans: Vec<RawSpan>) -> Self {
        spans.sort_by(|a, b| a.x.total_cmp(&b.x));

        let total_chars: usize = spans.iter().map(|s| s.text.chars().count()).sum();
        let weighted: f64 = spans
            .iter()
            .map(|s| s.size * s.text.chars().count() as f64)
            .sum();
        let size = if total_chars > 0 {
            weighted / total_chars as f64
        } else {
            spans.first().map(|s| s.size).unwrap_or(0.0)
        };

        let y = spans.first().map(|s| s.y).unwrap_or(0.0);
        let x = spans.first().map(|s| s.x).unwrap_or(0.0);
        Self { spans, y, x, size }
    }

    /// Model spans, with a space inserted where a visible gap separates runs.
    fn to_spans(&self) -> Vec<Span> {
        let mut out: Vec<Span> = Vec::with_capacity(self.spans.len());
        for (i, raw) in self.spans.iter().enumerate() {
            let mut text = raw.text.clone();
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = raw.x - prev.right();
                let needs_space = gap > raw.size * 0.1
                    && !prev.text.ends_with(char::is_whitespace)
                    && !text.starts_with(char::is_whitespace);
                if needs_space {
                    text.insert(0, ' ');
                }
            }
            let flags = if raw.bold { StyleFlags::BOLD } else { 0 };
            out.push(Span::new(text, raw.size, flags));
        }
        out
    }
}

/// Group spans into lines by baseline, top to bottom.
pub(crate) fn group_into_lines(mut spans: Vec<RawSpan>) -> Vec<RawLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines = Vec::new();
    let mut current: Vec<RawSpan> = Vec::new();
    let mut current_y: Option<f64> = None;

    for span in spans {
        let tolerance = span.size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(RawLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(RawLine::from_spans(current));
    }

    lines
}

fn average_line_spacing(lines: &[RawLine]) -> f64 {
    let spacings: Vec<f64> = lines
        .windows(2)
        .map(|w| (w[0].y - w[1].y).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        12.0
    } else {
        spacings.iter().sum::<f64>() / spacings.len() as f64
    }
}

fn should_break(prev: &RawLine, curr: &RawLine, avg_spacing: f64) -> bool {
    (prev.y - curr.y).abs() > avg_spacing * 1.5
        || (prev.size - curr.size).abs() > 1.0
        || (prev.x - curr.x).abs() > 20.0
}

/// Group consecutive lines into paragraphs on spacing, size or indent changes.
pub(crate) fn group_into_blocks(lines: Vec<RawLine>) -> Vec<Vec<RawLine>> {
    let avg_spacing = average_line_spacing(&lines);
    let mut blocks: Vec<Vec<RawLine>> = Vec::new();

    for line in lines {
        let continues = blocks
            .last()
            .and_then(|block| block.last())
            .is_some_and(|prev| !should_break(prev, &line, avg_spacing));
        match blocks.last_mut() {
            Some(block) if continues => block.push(line),
            _ => blocks.push(vec![line]),
        }
    }

    blocks
}

/// Convert grouped lines to a model block in top-left page coordinates.
///
/// `origin` is the media box's lower-left corner, `page_height` its height.
pub(crate) fn to_block(lines: &[RawLine], origin: (f64, f64), page_height: f64) -> Block {
    let spans = lines.iter().flat_map(|l| l.spans.iter());
    let (mut x0, mut x1) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut top, mut bottom) = (f64::NEG_INFINITY, f64::INFINITY);
    for s in spans {
        x0 = x0.min(s.x);
        x1 = x1.max(s.right());
        top = top.max(s.top());
        bottom = bottom.min(s.bottom());
    }

    let (ox, oy) = origin;
    let bbox = if x0.is_finite() {
        BBox::new(
            x0 - ox,
            page_height - (top - oy),
            x1 - ox,
            page_height - (bottom - oy),
        )
    } else {
        BBox::default()
    };

    let lines = lines.iter().map(|l| Line::new(l.to_spans())).collect();
    Block::new(bbox, lines)
}

/// Lay out one page's spans as blocks, top to bottom.
pub(crate) fn build_blocks(spans: Vec<RawSpan>, origin: (f64, f64), page_height: f64) -> Vec<Block> {
    let lines = group_into_lines(spans);
    group_into_blocks(lines)
        .iter()
        .map(|lines| to_block(lines, origin, page_height))
        .collect()
}
