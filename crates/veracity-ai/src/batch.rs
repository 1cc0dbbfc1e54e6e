//! Classify many texts and lay the results out as an Arrow `RecordBatch`.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampNanosecondArray, UInt32Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use tracing::info;
use veracity_core::schema::prediction_schema_ref;
use veracity_core::{Label, PredictionResult, TextStats};

use crate::DetectError;
use crate::detector::Detector;

/// Outcome for one input row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    /// Zero-based position in the input.
    pub row: usize,
    pub stats: TextStats,
    /// `Err` only ever holds a recoverable (input) error.
    pub outcome: Result<PredictionResult, DetectError>,
}

/// Classify `texts` in order.
///
/// Empty entries are recorded per row as [`DetectError::EmptyInput`]. Any
/// integrity error aborts the whole batch.
pub fn classify_batch<S: AsRef<str>>(
    detector: &Detector,
    texts: &[S],
) -> Result<Vec<BatchRow>, DetectError> {
    classify_rows(detector, 0, texts)
}

/// Like [`classify_batch`], numbering rows from `offset`. Used when a large
/// input is split into chunks handled by separate workers.
pub fn classify_rows<S: AsRef<str>>(
    detector: &Detector,
    offset: usize,
    texts: &[S],
) -> Result<Vec<BatchRow>, DetectError> {
    let mut rows = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        let text = text.as_ref();
        let outcome = match detector.classify(text) {
            Ok(result) => Ok(result),
            Err(e) if e.is_recoverable() => Err(e),
            Err(e) => return Err(e),
        };
        rows.push(BatchRow {
            row: offset + i,
            stats: TextStats::of(text),
            outcome,
        });
    }
    Ok(rows)
}

/// Build a RecordBatch with [`prediction_schema`](veracity_core::schema::prediction_schema).
pub fn predictions_to_batch(
    rows: &[BatchRow],
    classified_at: DateTime<Utc>,
) -> Result<RecordBatch, ArrowError> {
    let n = rows.len();
    let nanos = classified_at.timestamp_nanos_opt().ok_or_else(|| {
        ArrowError::InvalidArgumentError(format!("timestamp {classified_at} out of range"))
    })?;

    let mut row_ids = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    let mut confidences = Vec::with_capacity(n);
    let mut p_fake = Vec::with_capacity(n);
    let mut p_real = Vec::with_capacity(n);
    let mut word_counts = Vec::with_capacity(n);
    let mut errors = Vec::with_capacity(n);

    for row in rows {
        row_ids.push(to_u32(row.row, "row")?);
        word_counts.push(to_u32(row.stats.word_count, "word_count")?);
        match &row.outcome {
            Ok(result) => {
                labels.push(Some(result.predicted_label.as_str()));
                confidences.push(Some(result.confidence));
                p_fake.push(Some(result.probability(Label::Fake)));
                p_real.push(Some(result.probability(Label::Real)));
                errors.push(None);
            }
            Err(e) => {
                labels.push(None);
                confidences.push(None);
                p_fake.push(None);
                p_real.push(None);
                errors.push(Some(e.to_string()));
            }
        }
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from(row_ids)),
        Arc::new(StringArray::from(labels)),
        Arc::new(Float64Array::from(confidences)),
        Arc::new(Float64Array::from(p_fake)),
        Arc::new(Float64Array::from(p_real)),
        Arc::new(UInt32Array::from(word_counts)),
        Arc::new(StringArray::from(errors)),
        Arc::new(TimestampNanosecondArray::from(vec![nanos; n]).with_timezone("UTC")),
    ];

    let batch = RecordBatch::try_new(prediction_schema_ref(), columns)?;
    info!(rows = n, "built prediction batch");
    Ok(batch)
}

fn to_u32(value: usize, column: &str) -> Result<u32, ArrowError> {
    u32::try_from(value)
        .map_err(|_| ArrowError::InvalidArgumentError(format!("{column} {value} exceeds u32")))
}
