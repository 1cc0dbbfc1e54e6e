//! Arrow schema for batch prediction output.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

/// Schema for one row per classified text.
///
/// Rows that failed with a per-row input error carry a null `label`,
/// `confidence` and probabilities, and the message in `error`.
pub fn prediction_schema() -> Schema {
    Schema::new(vec![
        Field::new("row", DataType::UInt32, false),
        Field::new("label", DataType::Utf8, true),
        Field::new("confidence", DataType::Float64, true),
        Field::new("p_fake", DataType::Float64, true),
        Field::new("p_real", DataType::Float64, true),
        Field::new("word_count", DataType::UInt32, false),
        Field::new("error", DataType::Utf8, true),
        Field::new(
            "classified_at",
            DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into())),
            false,
        ),
    ])
}

/// Shared handle to [`prediction_schema`].
pub fn prediction_schema_ref() -> Arc<Schema> {
    Arc::new(prediction_schema())
}
