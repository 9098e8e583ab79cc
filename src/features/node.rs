//! Node-level features: computed from a block alone.

use crate::model::Block;
use crate::numbering::NumberingPatterns;

/// Typographic, positional and textual features of one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeFeatures {
    pub font_size: f64,
    pub font_is_bold: bool,
    pub norm_x0: f64,
    pub norm_y0: f64,
    pub word_count: usize,
    pub char_count: usize,
    pub uppercase_ratio: f64,
    pub ends_with_punctuation: bool,
    pub numbering_pattern: bool,
}

impl NodeFeatures {
    /// Compute the features of `block`.
    pub fn compute(block: &Block, patterns: &NumberingPatterns) -> Self {
        let text = block.text();
        let char_count = text.chars().count();
        let uppercase = text.chars().filter(|c| c.is_uppercase()).count();

        Self {
            font_size: block.mean_font_size(),
            font_is_bold: block.is_bold(),
            norm_x0: normalize(block.bbox.x0, block.page_width),
            norm_y0: normalize(block.bbox.y0, block.page_height),
            word_count: text.split_whitespace().count(),
            char_count,
            uppercase_ratio: uppercase as f64 / char_count.max(1) as f64,
            ends_with_punctuation: text.ends_with(['.', '?', '!']),
            numbering_pattern: patterns.has_numbering(&text),
        }
    }
}

fn normalize(value: f64, extent: f64) -> f64 {
    if extent > 0.0 {
        value / extent
    } else {
        0.0
    }
}
