//! Leading-numbering patterns shared by feature extraction and hierarchy
//! assignment.
//!
//! The patterns are compiled once per [`NumberingPatterns`] value and passed
//! explicitly into the pipeline.

use regex::Regex;

use crate::model::Level;

/// Compiled leading-numbering regexes.
#[derive(Debug, Clone)]
pub struct NumberingPatterns {
    /// Any leading numbering: `1 `, `1.2.3 `, `a) `, `B) `, `(iv) `
    any: Regex,
    /// `1.2.3 `, `1.2.3. `, `a) `, `(ii) `
    level3: Regex,
    /// `1.2 `, `1.2. `
    level2: Regex,
    /// `1 `, `1. `
    level1: Regex,
}

impl NumberingPatterns {
    /// Compile the patterns.
    pub fn new() -> Self {
        Self {
            any: Regex::new(r"^(\d+(\.\d+)*|[A-Za-z]\)|\([ivx]+\))\s").unwrap(),
            level3: Regex::new(r"^(?:\d+\.\d+\.\d+\.?\s|[a-z]\)\s|\([ivx]+\)\s)").unwrap(),
            level2: Regex::new(r"^\d+\.\d+\.?\s").unwrap(),
            level1: Regex::new(r"^\d+\.?\s").unwrap(),
        }
    }

    /// Whether the text starts with any recognized numbering scheme.
    pub fn has_numbering(&self, text: &str) -> bool {
        self.any.is_match(text)
    }

    /// Level implied by the text's numbering, tested deepest first.
    pub fn level_for(&self, text: &str) -> Option<Level> {
        if self.level3.is_match(text) {
            Some(Level::H3)
        } else if self.level2.is_match(text) {
            Some(Level::H2)
        } else if self.level1.is_match(text) {
            Some(Level::H1)
        } else {
            None
        }
    }
}

impl Default for NumberingPatterns {
    fn default() -> Self {
        Self::new()
    }
}
