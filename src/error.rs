//! Error types for outline-graph.

use std::io;
use thiserror::Error;

/// Result type alias for outline-graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while recovering a document outline.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not in a format any extractor recognizes.
    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The document has no extractable text blocks on any page.
    #[error("No text blocks found in document")]
    NoText,

    /// A block dump could not be decoded.
    #[error("Block dump error: {0}")]
    BlockDump(#[from] serde_json::Error),

    /// The trained model could not be loaded or is inconsistent.
    #[error("Model error: {0}")]
    Model(String),

    /// The feature manifest could not be loaded or disagrees with the model.
    #[error("Feature manifest error: {0}")]
    Manifest(String),

    /// The labeler returned a label count different from the row count.
    #[error("Labeler returned {got} labels for {expected} rows")]
    LabelCount {
        /// Number of rows passed to the labeler.
        expected: usize,
        /// Number of labels returned.
        got: usize,
    },

    /// Error writing output (JSON, CSV).
    #[error("Rendering error: {0}")]
    Render(String),

    /// A block's bounding box is not usable page geometry.
    #[error("Block {block} on page {page} has invalid coordinates")]
    InvalidGeometry {
        /// 1-based page number.
        page: u32,
        /// Block index within the page.
        block: usize,
    },

    /// Processing a document panicked.
    #[error("Internal error: {0}")]
    Internal(String),

    /// No extractor is registered for the file extension.
    #[error("No extractor for extension: {0}")]
    UnsupportedExtension(String),
}

#[cfg(feature = "pdf")]
impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Render(format!("CSV error: {}", err))
    }
}

impl Error {
    /// Whether this error is a startup configuration fault (model or manifest)
    /// rather than a per-document failure.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(self, Error::Model(_) | Error::Manifest(_))
    }
}
