//! Inference layer: TF-IDF vectorizer, tree-ensemble/logistic classifier and
//! the load-once detector that turns raw text into a [`PredictionResult`].

mod error;
pub use error::{DetectError, ErrorKind};

pub mod batch;
pub mod bundle;
pub mod classifier;
pub mod detector;
pub mod labels;
pub mod samples;
pub mod vectorizer;

#[cfg(test)]
mod testing;

pub use batch::{BatchRow, classify_batch, predictions_to_batch};
pub use bundle::{BundlePaths, ModelBundle};
pub use classifier::{Classifier, Score};
pub use detector::{Detector, LoadState};
pub use vectorizer::{FeatureVector, TfidfVectorizer};
pub use veracity_core::{Label, PredictionResult};
