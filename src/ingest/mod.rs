//! Block ingestion: turning source documents into pages of text blocks.
//!
//! Extraction itself sits behind the [`BlockExtractor`] trait. The
//! [`ExtractorRegistry`] dispatches on file extension, then applies
//! [`IngestOptions`] filtering so every downstream stage sees the same
//! cleaned page list.
//!
//! # Example
//!
//! ```no_run
//! use outline_graph::ingest::{ExtractorRegistry, IngestOptions};
//! use std::path::Path;
//!
//! fn main() -> outline_graph::Result<()> {
//!     let registry = ExtractorRegistry::with_defaults();
//!     let pages = registry.extract(Path::new("document.json"), &IngestOptions::default())?;
//!     println!("{} pages", pages.len());
//!     Ok(())
//! }
//! ```

mod json;
#[cfg(feature = "pdf")]
mod layout;
#[cfg(feature = "pdf")]
mod pdf;

pub use json::{BlockDump, BlockEntry, JsonDumpExtractor, PageDump};
#[cfg(feature = "pdf")]
pub use pdf::{is_pdf_bytes, PdfExtractor};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::Page;

/// Fail with [`Error::InvalidGeometry`] on the first block whose bounding box
/// is not finite or lies beyond [`BBox::MAX_COORDINATE`].
///
/// [`BBox::MAX_COORDINATE`]: crate::model::BBox::MAX_COORDINATE
pub fn check_geometry(pages: &[Page]) -> Result<()> {
    for page in pages {
        if let Some(block) = page.blocks.iter().position(|b| !b.bbox.is_valid()) {
            return Err(Error::InvalidGeometry {
                page: page.number,
                block,
            });
        }
    }
    Ok(())
}

/// Options applied to extracted pages before analysis.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Blocks whose trimmed text has fewer characters are discarded
    pub min_text_length: usize,

    /// Fail with [`Error::NoText`] when no page keeps any block
    pub require_text: bool,
}

impl IngestOptions {
    /// Create new ingest options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum block text length.
    pub fn with_min_text_length(mut self, chars: usize) -> Self {
        self.min_text_length = chars;
        self
    }

    /// Accept documents that end up with no blocks at all.
    pub fn allow_empty(mut self) -> Self {
        self.require_text = false;
        self
    }

    /// Drop blocks without lines or with too little text, in place.
    ///
    /// Pages are kept even when they end up empty so page indices stay
    /// aligned with the source document. Invalid block geometry fails the
    /// whole document.
    pub fn filter(&self, pages: &mut [Page]) -> Result<()> {
        check_geometry(pages)?;

        let mut dropped = 0usize;
        for page in pages.iter_mut() {
            let before = page.blocks.len();
            page.blocks.retain(|b| {
                !b.lines.is_empty() && b.text().chars().count() >= self.min_text_length
            });
            dropped += before - page.blocks.len();
        }

        if dropped > 0 {
            log::debug!("Discarded {} blocks without usable text", dropped);
        }

        if self.require_text && pages.iter().all(Page::is_empty) {
            return Err(Error::NoText);
        }
        Ok(())
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            min_text_length: 1,
            require_text: true,
        }
    }
}

/// Source of page/block geometry for one document format.
///
/// Implement this trait to add support for a new input format.
pub trait BlockExtractor: Send + Sync {
    /// Supported file extensions, lowercase without the leading dot.
    fn supported_extensions(&self) -> &[&str];

    /// Get the name of this extractor.
    fn name(&self) -> &str;

    /// Extract pages from bytes.
    fn extract_bytes(&self, bytes: &[u8]) -> Result<Vec<Page>>;

    /// Extract pages from a file.
    fn extract(&self, path: &Path) -> Result<Vec<Page>> {
        let bytes = std::fs::read(path)?;
        self.extract_bytes(&bytes)
    }

    /// Check if this extractor supports the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Registry mapping file extensions to extractors.
#[derive(Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn BlockExtractor>>,
    by_name: HashMap<String, Arc<dyn BlockExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with the built-in extractors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonDumpExtractor::new()));
        #[cfg(feature = "pdf")]
        registry.register(Arc::new(PdfExtractor::new()));
        registry
    }

    /// Register an extractor for all its supported extensions.
    pub fn register(&mut self, extractor: Arc<dyn BlockExtractor>) {
        for ext in extractor.supported_extensions() {
            self.extractors
                .insert(ext.to_lowercase(), extractor.clone());
        }
        self.by_name
            .insert(extractor.name().to_lowercase(), extractor);
    }

    /// Get an extractor by file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn BlockExtractor>> {
        self.extractors.get(&ext.to_lowercase()).cloned()
    }

    /// Get an extractor by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn BlockExtractor>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.extractors.contains_key(&ext.to_lowercase())
    }

    /// Whether the file at `path` has a supported extension.
    pub fn supports_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.supports(ext))
    }

    /// Get all supported extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.extractors.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    /// Extract and filter the pages of the file at `path`.
    pub fn extract(&self, path: &Path, options: &IngestOptions) -> Result<Vec<Page>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedExtension(String::new()))?;

        let extractor = self
            .get_by_extension(ext)
            .ok_or_else(|| Error::UnsupportedExtension(ext.to_string()))?;

        log::debug!("Extracting {} with {}", path.display(), extractor.name());
        let mut pages = extractor.extract(path)?;
        options.filter(&mut pages)?;
        Ok(pages)
    }

    /// Extract and filter pages from bytes, choosing the extractor by extension.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        ext: &str,
        options: &IngestOptions,
    ) -> Result<Vec<Page>> {
        let extractor = self
            .get_by_extension(ext)
            .ok_or_else(|| Error::UnsupportedExtension(ext.to_string()))?;

        let mut pages = extractor.extract_bytes(bytes)?;
        options.filter(&mut pages)?;
        Ok(pages)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("extensions", &self.supported_extensions())
            .finish()
    }
}
