//! End-to-end outline recovery.
//!
//! A [`Pipeline`] runs, for one document: page graphs, feature rows,
//! manifest alignment, labeling, then title and hierarchy assignment.
//! Row order (page, then node) is preserved end to end; with
//! [`PipelineOptions::parallel`] set, pages are processed on the rayon pool
//! and collected back in order.
//!
//! # Example
//!
//! ```no_run
//! use outline_graph::pipeline::{Pipeline, PipelineOptions};
//!
//! fn main() -> outline_graph::Result<()> {
//!     let pipeline = Pipeline::from_model_dir("models", PipelineOptions::default())?;
//!     let report = pipeline.process_file("report.pdf")?;
//!     println!("{}", report.outline.title);
//!     Ok(())
//! }
//! ```

mod batch;

pub use batch::{list_inputs, BatchFailure, BatchReport, BatchSuccess};

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::classify::{align, AlignmentReport, Label, Labeler, ModelArtifact};
use crate::error::{Error, Result};
use crate::features::{FeatureExtractor, FeatureFrame, IndentationReference, NORM_X0};
use crate::graph::{GraphBuilder, PageGraph, DEFAULT_NEIGHBORS};
use crate::hierarchy::{assign_hierarchy, select_title, DeepLevelPolicy, HeadingCandidate, TitleSource};
use crate::ingest::{check_geometry, ExtractorRegistry, IngestOptions};
use crate::model::{DocumentOutline, Page};
use crate::numbering::NumberingPatterns;
use crate::render::JsonFormat;

/// Options for outline recovery.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Neighbours per node in page graphs
    pub neighbors: usize,

    /// Reference neighbour for `indentation_vs_below`
    pub indentation: IndentationReference,

    /// Handling of font tiers below H3
    pub deep_levels: DeepLevelPolicy,

    /// Whether to use parallel processing
    pub parallel: bool,

    /// Block filtering applied after extraction
    pub ingest: IngestOptions,

    /// Output format for written outlines
    pub json_format: JsonFormat,
}

impl PipelineOptions {
    /// Create new pipeline options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the neighbour count.
    pub fn with_neighbors(mut self, k: usize) -> Self {
        self.neighbors = k;
        self
    }

    /// Set the indentation reference.
    pub fn with_indentation(mut self, reference: IndentationReference) -> Self {
        self.indentation = reference;
        self
    }

    /// Set the deep-level policy.
    pub fn with_deep_levels(mut self, policy: DeepLevelPolicy) -> Self {
        self.deep_levels = policy;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set ingest options.
    pub fn with_ingest(mut self, ingest: IngestOptions) -> Self {
        self.ingest = ingest;
        self
    }

    /// Set output format.
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            neighbors: DEFAULT_NEIGHBORS,
            indentation: IndentationReference::default(),
            deep_levels: DeepLevelPolicy::default(),
            parallel: true,
            ingest: IngestOptions::default(),
            json_format: JsonFormat::default(),
        }
    }
}

/// Result of running the pipeline on one document.
#[derive(Debug, Clone)]
pub struct OutlineReport {
    /// Recovered title and outline
    pub outline: DocumentOutline,
    /// How the feature frame was reconciled with the manifest
    pub alignment: AlignmentReport,
    /// Where the title came from
    pub title_source: TitleSource,
    /// One label per block, in row order
    pub labels: Vec<Label>,
    /// Number of pages analysed
    pub page_count: usize,
}

impl OutlineReport {
    /// Number of blocks analysed.
    pub fn block_count(&self) -> usize {
        self.labels.len()
    }
}

/// Outline recovery with a fixed labeler and options.
///
/// A pipeline is immutable once built and can be shared across threads.
#[derive(Clone)]
pub struct Pipeline {
    options: PipelineOptions,
    labeler: Arc<dyn Labeler>,
    registry: ExtractorRegistry,
    patterns: NumberingPatterns,
}

impl Pipeline {
    /// Create a pipeline around a labeler.
    pub fn new(labeler: Arc<dyn Labeler>, options: PipelineOptions) -> Self {
        Self {
            options,
            labeler,
            registry: ExtractorRegistry::with_defaults(),
            patterns: NumberingPatterns::new(),
        }
    }

    /// Load the model artifact in `dir` and build a pipeline around it.
    pub fn from_model_dir(dir: impl AsRef<Path>, options: PipelineOptions) -> Result<Self> {
        let artifact = ModelArtifact::load(dir)?;
        Ok(Self::new(Arc::new(artifact), options))
    }

    /// Replace the extractor registry.
    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    pub fn labeler(&self) -> &dyn Labeler {
        self.labeler.as_ref()
    }

    /// Extract and filter the pages of a document.
    pub fn load_pages(&self, path: impl AsRef<Path>) -> Result<Vec<Page>> {
        self.registry.extract(path.as_ref(), &self.options.ingest)
    }

    /// One proximity graph per page, in page order.
    pub fn build_graphs<'a>(&self, pages: &'a [Page]) -> Vec<PageGraph<'a>> {
        let builder = GraphBuilder::new(self.options.neighbors);
        if self.options.parallel {
            pages.par_iter().map(|p| builder.build(&p.blocks)).collect()
        } else {
            pages.iter().map(|p| builder.build(&p.blocks)).collect()
        }
    }

    /// Feature rows for all blocks, page-then-node ordered.
    pub fn features(&self, pages: &[Page]) -> FeatureFrame {
        let graphs = self.build_graphs(pages);
        self.extractor().extract(&graphs, self.options.parallel)
    }

    fn extractor(&self) -> FeatureExtractor {
        FeatureExtractor::new(self.patterns.clone(), self.options.indentation)
    }

    /// Recover the title and outline of already-extracted pages.
    ///
    /// Entry `page` fields are positions in `pages`, counted from 0.
    pub fn run(&self, pages: &[Page]) -> Result<OutlineReport> {
        check_geometry(pages)?;
        let frame = self.features(pages);
        let (matrix, alignment) = align(&frame, self.labeler.manifest());

        let labels = self.labeler.predict(&matrix)?;
        if labels.len() != frame.len() {
            return Err(Error::LabelCount {
                expected: frame.len(),
                got: labels.len(),
            });
        }

        let mut title_row = None;
        let mut candidates = Vec::new();
        for (row, label) in frame.rows().iter().zip(&labels) {
            let page = row.zero_based_page();
            match label {
                Label::Title if title_row.is_none() => {
                    title_row = Some((page as usize, row.node_idx));
                }
                Label::Heading => {
                    let block = &pages[page as usize].blocks[row.node_idx];
                    let norm_x0 = row.get(NORM_X0).unwrap_or(0.0);
                    candidates.push(HeadingCandidate::from_block(block, page, norm_x0));
                }
                _ => {}
            }
        }

        let title = select_title(pages, title_row);
        let entries = assign_hierarchy(&candidates, &self.patterns, self.options.deep_levels);

        log::debug!(
            "{} blocks labelled by {}: {} headings, title from {:?}",
            labels.len(),
            self.labeler.name(),
            entries.len(),
            title.source
        );

        Ok(OutlineReport {
            outline: DocumentOutline::new(title.text, entries),
            alignment,
            title_source: title.source,
            labels,
            page_count: pages.len(),
        })
    }

    /// Extract a document and recover its outline.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<OutlineReport> {
        let pages = self.load_pages(path)?;
        self.run(&pages)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .field("labeler", &self.labeler.name())
            .field("registry", &self.registry)
            .finish()
    }
}
