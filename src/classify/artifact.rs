//! On-disk model artifact: booster, feature manifest and class labels.

use std::path::{Path, PathBuf};

use super::{FeatureManifest, FeatureMatrix, GbdtModel, Label, Labeler};
use crate::error::{Error, Result};

/// Booster file name inside the artifact directory.
pub const MODEL_FILE: &str = "heading_model.txt";
/// Manifest file name inside the artifact directory.
pub const FEATURE_MANIFEST_FILE: &str = "feature_names.json";
/// Class label file name inside the artifact directory.
pub const LABELS_FILE: &str = "labels.json";

/// A loaded, self-consistent model artifact.
///
/// Loading validates that the booster was trained on exactly the manifest's
/// columns and predicts exactly as many classes as `labels.json` names, so
/// a successfully loaded artifact never fails at prediction time for
/// configuration reasons.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    dir: PathBuf,
    model: GbdtModel,
    manifest: FeatureManifest,
    labels: Vec<Label>,
}

impl ModelArtifact {
    /// Load and cross-check the artifact stored in `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let model = GbdtModel::load(dir.join(MODEL_FILE))?;
        let manifest = FeatureManifest::load(dir.join(FEATURE_MANIFEST_FILE))?;
        let labels = load_labels(&dir.join(LABELS_FILE))?;

        let artifact = Self::from_parts(model, manifest, labels)?;
        log::info!(
            "Loaded model from {} ({} features, labels: {})",
            dir.display(),
            artifact.manifest.len(),
            artifact
                .labels
                .iter()
                .map(Label::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            ..artifact
        })
    }

    /// Assemble an artifact from already-loaded parts.
    pub fn from_parts(
        model: GbdtModel,
        manifest: FeatureManifest,
        labels: Vec<Label>,
    ) -> Result<Self> {
        if model.feature_names() != manifest.names() {
            return Err(Error::Manifest(format!(
                "manifest [{}] does not match model features [{}]",
                manifest.names().join(", "),
                model.feature_names().join(", ")
            )));
        }
        if model.class_count() != labels.len() {
            return Err(Error::Model(format!(
                "model predicts {} classes but {} labels are listed",
                model.class_count(),
                labels.len()
            )));
        }

        Ok(Self {
            dir: PathBuf::new(),
            model,
            manifest,
            labels,
        })
    }

    /// Directory the artifact was loaded from (empty when built from parts).
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model(&self) -> &GbdtModel {
        &self.model
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

impl Labeler for ModelArtifact {
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<Label>> {
        if matrix.columns() != self.manifest.names() {
            return Err(Error::Manifest(
                "feature matrix is not aligned to the model manifest".into(),
            ));
        }
        Ok(matrix
            .rows()
            .iter()
            .map(|row| self.labels[self.model.predict_class(row)].clone())
            .collect())
    }

    fn manifest(&self) -> &FeatureManifest {
        &self.manifest
    }

    fn name(&self) -> &str {
        "gbdt"
    }
}

fn load_labels(path: &Path) -> Result<Vec<Label>> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::Model(format!("cannot read {}: {}", path.display(), e)))?;
    let labels: Vec<Label> = serde_json::from_str(&data)
        .map_err(|e| Error::Model(format!("malformed {}: {}", path.display(), e)))?;
    if labels.is_empty() {
        return Err(Error::Model(format!("{} lists no labels", path.display())));
    }
    Ok(labels)
}
