//! Block dumps: page/block/span geometry serialized as JSON.
//!
//! The layout matches the per-page dictionary text dump of common PDF
//! toolkits, wrapped in a `pages` array:
//!
//! ```json
//! {"pages": [{"width": 612, "height": 792, "blocks": [
//!     {"bbox": [72, 70, 540, 96], "lines": [{"spans": [
//!         {"text": "Annual Report", "size": 24.0, "flags": 2}]}]}]}]}
//! ```
//!
//! Unknown fields are ignored, so image blocks (which carry no `lines`) pass
//! through and are removed later by ingest filtering.

use serde::{Deserialize, Serialize};

use super::BlockExtractor;
use crate::error::Result;
use crate::model::{BBox, Block, Line, Page};

/// One page of a block dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageDump {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub blocks: Vec<BlockEntry>,
}

/// One block of a block dump; page dimensions come from the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEntry {
    pub bbox: BBox,
    #[serde(default)]
    pub lines: Vec<Line>,
}

/// A whole document's block dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockDump {
    pub pages: Vec<PageDump>,
}

impl BlockDump {
    /// Parse a dump from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Convert to pages numbered from 1, stamping page sizes onto blocks.
    pub fn into_pages(self) -> Vec<Page> {
        self.pages
            .into_iter()
            .enumerate()
            .map(|(i, dump)| {
                let mut page = Page::new(i as u32 + 1, dump.width, dump.height);
                for entry in dump.blocks {
                    page.add_block(Block::new(entry.bbox, entry.lines));
                }
                page
            })
            .collect()
    }

    /// Build a dump from pages.
    pub fn from_pages(pages: &[Page]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|p| PageDump {
                    width: p.width,
                    height: p.height,
                    blocks: p
                        .blocks
                        .iter()
                        .map(|b| BlockEntry {
                            bbox: b.bbox,
                            lines: b.lines.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Extractor for `.json` block dumps.
#[derive(Debug, Clone, Default)]
pub struct JsonDumpExtractor;

impl JsonDumpExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl BlockExtractor for JsonDumpExtractor {
    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn name(&self) -> &str {
        "json"
    }

    fn extract_bytes(&self, bytes: &[u8]) -> Result<Vec<Page>> {
        Ok(BlockDump::from_slice(bytes)?.into_pages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const DUMP: &str = r#"{
        "pages": [
            {
                "width": 612, "height": 792,
                "blocks": [
                    {"type": 0, "number": 0, "bbox": [72, 70, 540, 96],
                     "lines": [{"wmode": 0, "spans": [{"text": "Annual Report", "size": 24.0, "flags": 20, "font": "Helvetica-Bold"}]}]},
                    {"type": 1, "bbox": [72, 100, 300, 300], "image": null}
                ]
            },
            {"width": 612, "height": 792}
        ]
    }"#;

    #[test]
    fn test_parse_dump() {
        let pages = JsonDumpExtractor::new().extract_bytes(DUMP.as_bytes()).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[1].number, 2);
        assert_eq!(pages[0].block_count(), 2);
        assert!(pages[1].is_empty());

        let title = &pages[0].blocks[0];
        assert_eq!(title.text(), "Annual Report");
        assert_eq!(title.page_width, 612.0);
        assert_eq!(title.bbox.y1, 96.0);
        assert!(title.lines[0].spans[0].flags & 4 != 0);

        // Image block survives parsing; ingest filtering removes it.
        assert!(pages[0].blocks[1].lines.is_empty());
    }

    #[test]
    fn test_malformed_dump() {
        let err = JsonDumpExtractor::new().extract_bytes(b"{not json").unwrap_err();
        assert!(matches!(err, Error::BlockDump(_)));

        let err = JsonDumpExtractor::new().extract_bytes(b"[]").unwrap_err();
        assert!(matches!(err, Error::BlockDump(_)));
    }

    #[test]
    fn test_dump_from_pages() {
        let pages = JsonDumpExtractor::new().extract_bytes(DUMP.as_bytes()).unwrap();
        let json = serde_json::to_string(&BlockDump::from_pages(&pages)).unwrap();
        let again = JsonDumpExtractor::new().extract_bytes(json.as_bytes()).unwrap();
        assert_eq!(again, pages);
    }
}
