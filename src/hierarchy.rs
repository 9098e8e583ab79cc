//! Heading level assignment and title selection.
//!
//! Levels come from two stages in strict priority order:
//!
//! 1. **Numbering override**: a leading `1.2.3`, `a)` or `(iv)` gives H3,
//!    `1.2` gives H2, `1` or `1.` gives H1.
//! 2. **Font-size tiering**: otherwise, the distinct font sizes of all heading
//!    candidates are ranked largest first; rank 0 is H1, rank 1 is H2 and
//!    every later rank is H3 (or dropped, see [`DeepLevelPolicy`]).
//!
//! Entries are emitted in candidate order, never re-sorted.

use crate::model::{Block, Level, OutlineEntry, Page};
use crate::numbering::NumberingPatterns;

/// A block classified as a heading, awaiting its level.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingCandidate {
    /// Block text, trimmed
    pub text: String,
    /// Zero-based page index
    pub page: u32,
    /// Mean span font size of the block
    pub font_size: f64,
    /// Left edge normalized by page width
    pub norm_x0: f64,
}

impl HeadingCandidate {
    pub fn new(text: impl Into<String>, page: u32, font_size: f64) -> Self {
        Self {
            text: text.into(),
            page,
            font_size,
            norm_x0: 0.0,
        }
    }

    /// Build a candidate from a block on the given zero-based page.
    pub fn from_block(block: &Block, page: u32, norm_x0: f64) -> Self {
        Self {
            text: block.text(),
            page,
            font_size: block.mean_font_size(),
            norm_x0,
        }
    }
}

/// What happens to unnumbered headings whose font tier is below H3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeepLevelPolicy {
    /// Every rank from 2 on becomes H3
    #[default]
    Collapse,
    /// Rank 2 becomes H3; ranks 3 and beyond are left out of the outline
    Drop,
}

/// Distinct candidate font sizes, largest first.
fn font_tiers(candidates: &[HeadingCandidate]) -> Vec<f64> {
    let mut sizes: Vec<f64> = candidates.iter().map(|c| c.font_size).collect();
    sizes.sort_by(|a, b| b.total_cmp(a));
    sizes.dedup_by(|a, b| a.total_cmp(b).is_eq());
    sizes
}

/// Assign outline levels to heading candidates.
pub fn assign_hierarchy(
    candidates: &[HeadingCandidate],
    patterns: &NumberingPatterns,
    policy: DeepLevelPolicy,
) -> Vec<OutlineEntry> {
    let tiers = font_tiers(candidates);

    candidates
        .iter()
        .filter_map(|c| {
            let level = match patterns.level_for(&c.text) {
                Some(level) => level,
                None => {
                    let rank = tiers
                        .iter()
                        .position(|s| s.total_cmp(&c.font_size).is_eq())
                        .unwrap_or(tiers.len());
                    if policy == DeepLevelPolicy::Drop && rank >= 3 {
                        log::debug!("Dropping heading below H3 tier: {:?}", c.text);
                        return None;
                    }
                    Level::from_rank(rank)
                }
            };
            Some(OutlineEntry::new(level, c.text.clone(), c.page))
        })
        .collect()
}

/// How the title was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    /// A row labelled as title
    Predicted,
    /// The largest-font block of the first page with blocks
    LargestFont,
    /// The document has no blocks at all
    Empty,
}

/// Title text plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleChoice {
    pub text: String,
    pub source: TitleSource,
}

/// Choose the document title.
///
/// `predicted` is the `(page position, node index)` of the first row labelled
/// as title, if any. Without one, the first page's block with the strictly
/// largest mean font size is used (lowest index wins ties). A first page
/// with no blocks defers to the first page that has some.
pub fn select_title(pages: &[Page], predicted: Option<(usize, usize)>) -> TitleChoice {
    if let Some(block) = predicted.and_then(|(p, n)| pages.get(p)?.blocks.get(n)) {
        return TitleChoice {
            text: block.text(),
            source: TitleSource::Predicted,
        };
    }

    let Some(page) = pages.iter().find(|p| !p.is_empty()) else {
        return TitleChoice {
            text: String::new(),
            source: TitleSource::Empty,
        };
    };

    let mut best = 0;
    let mut best_size = 0.0;
    for (i, block) in page.blocks.iter().enumerate() {
        let size = block.mean_font_size();
        if size > best_size {
            best = i;
            best_size = size;
        }
    }

    let text = page.blocks[best].text();
    log::warn!(
        "No title predicted; using largest-font block on page {}: {:?}",
        page.number,
        text
    );
    TitleChoice {
        text,
        source: TitleSource::LargestFont,
    }
}
