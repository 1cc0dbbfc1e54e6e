pub mod label;
pub mod prediction;
pub mod schema;
pub mod text_stats;

pub use label::{Label, LabelError};
pub use prediction::{DISTRIBUTION_TOLERANCE, PredictionResult};
pub use text_stats::{TextStats, word_frequencies};
