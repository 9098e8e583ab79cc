//! # outline-graph
//!
//! Title and heading outline recovery from page text-block geometry.
//!
//! Documents are read as pages of positioned text blocks. Each page becomes a
//! k-nearest-neighbour proximity graph; every block gets typographic,
//! positional and graph-relational features; a trained classifier labels the
//! blocks; and headings are assigned H1/H2/H3 levels from their numbering or
//! font-size tier. Document-native bookmarks and tags are never consulted.
//!
//! ## Quick Start
//!
//! ```no_run
//! use outline_graph::{recover_outline, render};
//!
//! fn main() -> outline_graph::Result<()> {
//!     let outline = recover_outline("report.pdf", "models")?;
//!     println!("{}", render::to_json(&outline, render::JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Proximity graphs**: R-tree backed k-NN graphs per page
//! - **Feature export**: CSV feature tables for labelling
//! - **Tree ensembles**: LightGBM text models evaluated natively
//! - **Batch processing**: Rayon-parallel, with per-document isolation
//! - **Inputs**: PDF (via lopdf) and JSON block dumps

pub mod classify;
pub mod error;
pub mod features;
pub mod graph;
pub mod hierarchy;
pub mod ingest;
pub mod model;
pub mod numbering;
pub mod pipeline;
pub mod render;

// Re-export commonly used types
pub use classify::{
    align, AlignmentReport, FeatureManifest, FeatureMatrix, GbdtModel, Label, Labeler,
    ModelArtifact,
};
pub use error::{Error, Result};
pub use features::{FeatureExtractor, FeatureFrame, FeatureRow, IndentationReference};
pub use graph::{GraphBuilder, PageGraph};
pub use hierarchy::{assign_hierarchy, select_title, DeepLevelPolicy, HeadingCandidate};
pub use ingest::{BlockExtractor, ExtractorRegistry, IngestOptions};
pub use model::{BBox, Block, DocumentOutline, Level, Line, OutlineEntry, Page, Span};
pub use numbering::NumberingPatterns;
pub use pipeline::{BatchReport, OutlineReport, Pipeline, PipelineOptions};
pub use render::JsonFormat;

use std::path::Path;

/// Extract the pages of a document with default ingest options.
///
/// # Example
///
/// ```no_run
/// use outline_graph::extract_pages;
///
/// let pages = extract_pages("document.pdf").unwrap();
/// println!("Pages: {}", pages.len());
/// ```
pub fn extract_pages<P: AsRef<Path>>(path: P) -> Result<Vec<Page>> {
    ExtractorRegistry::with_defaults().extract(path.as_ref(), &IngestOptions::default())
}

/// Compute the feature table of a document. No model is needed.
///
/// # Arguments
///
/// * `path` - Path to the document
/// * `neighbors` - Neighbours per node in the page graphs
pub fn extract_features<P: AsRef<Path>>(path: P, neighbors: usize) -> Result<FeatureFrame> {
    let pages = extract_pages(path)?;
    let builder = GraphBuilder::new(neighbors);
    let graphs: Vec<PageGraph<'_>> = pages.iter().map(|p| builder.build(&p.blocks)).collect();
    Ok(FeatureExtractor::default().extract(&graphs, true))
}

/// Recover the title and outline of a document with the model in `model_dir`.
///
/// Loads the model on every call; use a [`Pipeline`] to process several
/// documents.
///
/// # Example
///
/// ```no_run
/// use outline_graph::recover_outline;
///
/// let outline = recover_outline("document.pdf", "models").unwrap();
/// for entry in &outline.outline {
///     println!("{} {} (page {})", entry.level, entry.text, entry.page);
/// }
/// ```
pub fn recover_outline<P: AsRef<Path>, M: AsRef<Path>>(path: P, model_dir: M) -> Result<DocumentOutline> {
    let pipeline = Pipeline::from_model_dir(model_dir, PipelineOptions::default())?;
    Ok(pipeline.process_file(path)?.outline)
}
