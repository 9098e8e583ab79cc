//! Block classification: the labeler seam and feature alignment.
//!
//! A trained model expects its inputs in a fixed column order (the feature
//! manifest). [`align`] turns a [`FeatureFrame`] into a dense
//! [`FeatureMatrix`] in that order; a [`Labeler`] then maps each matrix row
//! to a [`Label`].
//!
//! # Example
//!
//! ```no_run
//! use outline_graph::classify::{ModelArtifact, Labeler};
//!
//! fn main() -> outline_graph::Result<()> {
//!     let artifact = ModelArtifact::load("models")?;
//!     println!("{} features", artifact.manifest().len());
//!     Ok(())
//! }
//! ```

mod artifact;
mod gbdt;

pub use artifact::{ModelArtifact, FEATURE_MANIFEST_FILE, LABELS_FILE, MODEL_FILE};
pub use gbdt::GbdtModel;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::{is_join_key, FeatureFrame};

/// Class assigned to a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    /// The document title
    Title,
    /// A section heading
    Heading,
    /// Any other trained class (body text, captions, ...)
    Other(String),
}

impl Label {
    /// Parse a label as written by the trainer.
    pub fn parse(s: &str) -> Self {
        match s {
            "title" => Label::Title,
            "heading" => Label::Heading,
            other => Label::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Label::Title => "title",
            Label::Heading => "heading",
            Label::Other(s) => s,
        }
    }

    pub fn is_title(&self) -> bool {
        matches!(self, Label::Title)
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Label::Heading)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::parse(&s)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered feature names a trained model expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureManifest {
    names: Vec<String>,
}

impl FeatureManifest {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load a manifest from a JSON array of column names.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::Manifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&data)
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(data: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(data)
            .map_err(|e| Error::Manifest(format!("malformed manifest: {}", e)))?;
        if manifest.names.is_empty() {
            return Err(Error::Manifest("manifest lists no features".into()));
        }
        Ok(manifest)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureManifest {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Dense row-major matrix in manifest column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }
}

/// Columns reconciled during alignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentReport {
    /// Manifest columns the frame lacked; zero-filled
    pub missing: Vec<String>,
    /// Frame columns the manifest does not name; dropped
    pub dropped: Vec<String>,
    /// Count of NaN or infinite values replaced by 0.0
    pub non_finite: usize,
}

impl AlignmentReport {
    /// Whether the frame matched the manifest exactly.
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.dropped.is_empty() && self.non_finite == 0
    }
}

/// Reindex `frame` to the manifest's column order.
///
/// Join keys never reach the model. Missing columns are zero-filled, extra
/// columns dropped and non-finite values zeroed; none of this is an error.
pub fn align(frame: &FeatureFrame, manifest: &FeatureManifest) -> (FeatureMatrix, AlignmentReport) {
    let available: Vec<&'static str> = frame
        .column_names()
        .into_iter()
        .filter(|name| !is_join_key(name))
        .collect();

    let mut report = AlignmentReport {
        missing: manifest
            .names()
            .iter()
            .filter(|name| is_join_key(name) || !available.contains(&name.as_str()))
            .cloned()
            .collect(),
        dropped: available
            .iter()
            .filter(|name| !manifest.contains(name))
            .map(|name| name.to_string())
            .collect(),
        non_finite: 0,
    };

    let mut rows = Vec::with_capacity(frame.len());
    for row in frame.rows() {
        let values = manifest
            .names()
            .iter()
            .map(|name| {
                if is_join_key(name) {
                    return 0.0;
                }
                match row.get(name) {
                    Some(v) if v.is_finite() => v,
                    Some(_) => {
                        report.non_finite += 1;
                        0.0
                    }
                    None => 0.0,
                }
            })
            .collect();
        rows.push(values);
    }

    if !report.missing.is_empty() {
        log::warn!(
            "Feature columns missing from input, filled with 0: {}",
            report.missing.join(", ")
        );
    }
    if !report.dropped.is_empty() {
        log::debug!(
            "Feature columns not in manifest, dropped: {}",
            report.dropped.join(", ")
        );
    }
    if report.non_finite > 0 {
        log::warn!("Replaced {} non-finite feature values with 0", report.non_finite);
    }

    (FeatureMatrix::new(manifest.names().to_vec(), rows), report)
}

/// Maps aligned feature rows to labels.
///
/// Implementations must return exactly one label per row, in row order,
/// and must not depend on call history.
pub trait Labeler: Send + Sync {
    /// Predict a label for every row of `matrix`.
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>>;

    /// Columns the labeler expects, in order.
    fn manifest(&self) -> &FeatureManifest;

    /// Short name used in diagnostics.
    fn name(&self) -> &str {
        "labeler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureRow, FONT_SIZE, NODE_IDX, PAGE_IDX, SPACE_ABOVE, WORD_COUNT};

    fn frame() -> FeatureFrame {
        FeatureFrame::new(vec![
            FeatureRow::new(1, 0, vec![(FONT_SIZE, 18.0), (WORD_COUNT, 2.0), (SPACE_ABOVE, f64::NAN)]),
            FeatureRow::new(1, 1, vec![(FONT_SIZE, 11.0), (WORD_COUNT, 40.0), (SPACE_ABOVE, 6.0)]),
        ])
    }

    #[test]
    fn test_label_parse() {
        assert_eq!(Label::parse("title"), Label::Title);
        assert_eq!(Label::parse("heading"), Label::Heading);
        assert_eq!(Label::parse("other"), Label::Other("other".into()));
        assert_eq!(Label::Other("body".into()).to_string(), "body");

        let labels: Vec<Label> = serde_json::from_str(r#"["heading","other","title"]"#).unwrap();
        assert_eq!(labels[2], Label::Title);
    }

    #[test]
    fn test_align_reorders_and_fills() {
        let manifest: FeatureManifest = ["word_count", "font_size", "font_size_ratio"]
            .into_iter()
            .collect();
        let (matrix, report) = align(&frame(), &manifest);

        assert_eq!(matrix.n_rows(), 2);
        assert_eq!(matrix.n_cols(), 3);
        assert_eq!(matrix.row(0), &[2.0, 18.0, 0.0]);
        assert_eq!(matrix.row(1), &[40.0, 11.0, 0.0]);
        assert_eq!(report.missing, vec!["font_size_ratio".to_string()]);
        assert_eq!(report.dropped, vec!["space_above".to_string()]);
        assert!(!report.is_exact());
    }

    #[test]
    fn test_align_zeroes_non_finite() {
        let manifest: FeatureManifest = [FONT_SIZE, SPACE_ABOVE].into_iter().collect();
        let (matrix, report) = align(&frame(), &manifest);

        assert_eq!(matrix.row(0), &[18.0, 0.0]);
        assert_eq!(matrix.row(1), &[11.0, 6.0]);
        assert_eq!(report.non_finite, 1);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_align_never_feeds_join_keys() {
        let manifest: FeatureManifest = [PAGE_IDX, FONT_SIZE, NODE_IDX].into_iter().collect();
        let (matrix, report) = align(&frame(), &manifest);

        assert_eq!(matrix.row(1), &[0.0, 11.0, 0.0]);
        assert_eq!(report.missing, vec![PAGE_IDX.to_string(), NODE_IDX.to_string()]);
    }

    #[test]
    fn test_manifest_from_json() {
        let manifest = FeatureManifest::from_json(r#"["font_size", "norm_x0"]"#).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains("norm_x0"));

        assert!(matches!(
            FeatureManifest::from_json("[]"),
            Err(Error::Manifest(_))
        ));
        assert!(matches!(
            FeatureManifest::from_json("{\"a\": 1}"),
            Err(Error::Manifest(_))
        ));
    }
}
