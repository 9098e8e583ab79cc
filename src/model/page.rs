//! Page-level types.

use super::Block;
use serde::{Deserialize, Serialize};

/// A single page: an ordered sequence of text blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f64,

    /// Page height in points
    pub height: f64,

    /// Text blocks in extraction order
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Page {
    /// Create a new empty page with the given dimensions.
    pub fn new(number: u32, width: f64, height: f64) -> Self {
        Self {
            number,
            width,
            height,
            blocks: Vec::new(),
        }
    }

    /// Create a new page with standard Letter size (8.5 x 11 inches).
    pub fn letter(number: u32) -> Self {
        Self::new(number, 612.0, 792.0)
    }

    /// Create a new page with standard A4 size (210 x 297 mm).
    pub fn a4(number: u32) -> Self {
        Self::new(number, 595.0, 842.0)
    }

    /// Add a block, stamping it with this page's dimensions.
    pub fn add_block(&mut self, block: Block) {
        self.blocks
            .push(block.with_page_size(self.width, self.height));
    }

    /// Builder variant of [`Page::add_block`].
    pub fn with_block(mut self, block: Block) -> Self {
        self.add_block(block);
        self
    }

    /// Number of blocks on the page.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the page has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Zero-based index of this page, as used in outline entries.
    pub fn zero_based_index(&self) -> u32 {
        self.number.saturating_sub(1)
    }
}
