use std::path::PathBuf;

use thiserror::Error;
use veracity_core::Label;

/// Whether a failure is the caller's to fix or a defect in the loaded bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input; prompt for new text and try again.
    Input,
    /// Broken or mismatched artifacts; the process cannot serve predictions.
    Integrity,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectError {
    #[error("input text is empty; enter some text to analyze")]
    EmptyInput,

    #[error("feature extraction failed: {0}")]
    FeatureExtraction(String),

    #[error("dimension mismatch: {context} produces {actual} features but {expected} are expected")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("classifier class order {found:?} does not match label space {expected:?}")]
    LabelOrder {
        expected: Vec<Label>,
        found: Vec<String>,
    },

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },
}

impl DetectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput => ErrorKind::Input,
            _ => ErrorKind::Integrity,
        }
    }

    /// Only input errors can be retried within the same process.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Input
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
