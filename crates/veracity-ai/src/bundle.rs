//! Loading the paired vectorizer and classifier artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::info;

use crate::DetectError;
use crate::classifier::{Classifier, ClassifierArtifact};
use crate::vectorizer::{TfidfVectorizer, VectorizerArtifact};

/// Artifact format this build reads.
pub const FORMAT_VERSION: u32 = 1;

pub const VECTORIZER_FILE: &str = "vectorizer.json";
pub const MODEL_FILE: &str = "model.json";

/// Locations of the two artifacts that make up a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    pub vectorizer: PathBuf,
    pub model: PathBuf,
}

impl BundlePaths {
    pub fn new(vectorizer: impl Into<PathBuf>, model: impl Into<PathBuf>) -> Self {
        Self {
            vectorizer: vectorizer.into(),
            model: model.into(),
        }
    }

    /// `vectorizer.json` and `model.json` inside `dir`.
    pub fn from_dir(dir: &Path) -> Self {
        Self::new(dir.join(VECTORIZER_FILE), dir.join(MODEL_FILE))
    }
}

/// A vectorizer and classifier known to agree on dimension and label order.
///
/// Read-only after construction and shared by every inference call.
#[derive(Debug)]
pub struct ModelBundle {
    vectorizer: TfidfVectorizer,
    classifier: Classifier,
}

impl ModelBundle {
    /// Pair an already-built vectorizer and classifier.
    ///
    /// Fails with [`DetectError::DimensionMismatch`] when the vectorizer's
    /// output dimension differs from the classifier's input dimension.
    pub fn new(vectorizer: TfidfVectorizer, classifier: Classifier) -> Result<Self, DetectError> {
        if vectorizer.dim() != classifier.n_features() {
            return Err(DetectError::DimensionMismatch {
                context: "vectorizer",
                expected: classifier.n_features(),
                actual: vectorizer.dim(),
            });
        }
        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    /// Build from parsed artifacts, validating each and then the pair.
    pub fn from_artifacts(
        vectorizer: VectorizerArtifact,
        classifier: ClassifierArtifact,
    ) -> Result<Self, DetectError> {
        let vectorizer = TfidfVectorizer::from_artifact(vectorizer)?;
        let classifier = Classifier::from_artifact(classifier)?;
        Self::new(vectorizer, classifier)
    }

    /// Read both artifacts from disk and build the bundle. Fails fast on the
    /// first missing, unreadable or invalid file.
    pub fn load(paths: &BundlePaths) -> Result<Self, DetectError> {
        let vectorizer: VectorizerArtifact = read_artifact(&paths.vectorizer)?;
        check_version(&paths.vectorizer, vectorizer.format_version)?;
        let classifier: ClassifierArtifact = read_artifact(&paths.model)?;
        check_version(&paths.model, classifier.format_version)?;

        let bundle = Self::from_artifacts(vectorizer, classifier)?;
        info!(
            vectorizer = %paths.vectorizer.display(),
            model = %paths.model.display(),
            dim = bundle.dim(),
            family = bundle.classifier.family(),
            trees = bundle.classifier.tree_count().unwrap_or(0),
            "loaded model bundle"
        );
        Ok(bundle)
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Shared feature dimension.
    pub fn dim(&self) -> usize {
        self.vectorizer.dim()
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, DetectError> {
    if !path.exists() {
        return Err(DetectError::artifact(path, "file not found"));
    }
    let bytes = fs::read(path).map_err(|e| DetectError::artifact(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| DetectError::artifact(path, e))
}

fn check_version(path: &Path, version: u32) -> Result<(), DetectError> {
    if version != FORMAT_VERSION {
        return Err(DetectError::artifact(
            path,
            format!("unsupported format_version {version} (expected {FORMAT_VERSION})"),
        ));
    }
    Ok(())
}
