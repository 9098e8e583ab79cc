//! Outline output types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Heading level in the recovered outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    H1,
    H2,
    H3,
}

impl Level {
    /// Level for a zero-based font-size tier rank. Ranks beyond 2 share H3.
    pub fn from_rank(rank: usize) -> Self {
        match rank {
            0 => Level::H1,
            1 => Level::H2,
            _ => Level::H3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::H1 => "H1",
            Level::H2 => "H2",
            Level::H3 => "H3",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the recovered outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Assigned heading level
    pub level: Level,
    /// Heading text
    pub text: String,
    /// Zero-based page index
    pub page: u32,
}

impl OutlineEntry {
    pub fn new(level: Level, text: impl Into<String>, page: u32) -> Self {
        Self {
            level,
            text: text.into(),
            page,
        }
    }
}

/// The recovered document title and heading outline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutline {
    /// Document title
    pub title: String,
    /// Headings in encounter order
    pub outline: Vec<OutlineEntry>,
}

impl DocumentOutline {
    pub fn new(title: impl Into<String>, outline: Vec<OutlineEntry>) -> Self {
        Self {
            title: title.into(),
            outline,
        }
    }

    /// Number of entries at the given level.
    pub fn count_level(&self, level: Level) -> usize {
        self.outline.iter().filter(|e| e.level == level).count()
    }
}
