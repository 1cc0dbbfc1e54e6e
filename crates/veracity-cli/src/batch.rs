//! Batch pipeline: reads one text per line, classifies on blocking workers,
//! writes the predictions to Parquet or prints them as a table.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tracing::info;
use veracity_ai::batch::{BatchRow, classify_rows, predictions_to_batch};
use veracity_ai::Detector;

const CHUNK_SIZE: usize = 256;

pub struct BatchStats {
    pub total_rows: usize,
    pub classified: usize,
    pub empty: usize,
    pub elapsed_secs: f64,
}

/// Classify every line of `input` and return the predictions as one batch.
pub async fn run_batch_pipeline(
    detector: Arc<Detector>,
    input: &Path,
) -> anyhow::Result<(RecordBatch, BatchStats)> {
    let start = Instant::now();

    let content = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    let total_rows = lines.len();
    info!(total_rows, input = %input.display(), "read batch input");

    let mut handles = Vec::new();
    for (chunk_idx, chunk) in lines.chunks(CHUNK_SIZE).enumerate() {
        let detector = Arc::clone(&detector);
        let chunk = chunk.to_vec();
        let offset = chunk_idx * CHUNK_SIZE;
        handles.push(tokio::task::spawn_blocking(move || {
            classify_rows(&detector, offset, &chunk)
        }));
    }

    let mut rows: Vec<BatchRow> = Vec::with_capacity(total_rows);
    for chunk in futures::future::try_join_all(handles)
        .await
        .context("batch worker panicked")?
    {
        rows.extend(chunk.context("classifying batch")?);
    }

    let empty = rows.iter().filter(|r| r.outcome.is_err()).count();
    let batch = predictions_to_batch(&rows, chrono::Utc::now())?;

    Ok((
        batch,
        BatchStats {
            total_rows,
            classified: total_rows - empty,
            empty,
            elapsed_secs: start.elapsed().as_secs_f64(),
        },
    ))
}

/// Write a single RecordBatch to a Parquet file.
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    info!(rows = batch.num_rows(), path = %path.display(), "wrote predictions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, StringArray, UInt32Array};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::path::PathBuf;
    use veracity_ai::BundlePaths;
    use veracity_ai::samples::{FAKE_EXAMPLE, REAL_EXAMPLE};

    fn fixture_detector() -> Arc<Detector> {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../veracity-ai/tests/fixtures");
        Arc::new(Detector::open(BundlePaths::from_dir(&dir)).expect("fixture bundle loads"))
    }

    fn write_input(dir: &Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("input.txt");
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[tokio::test]
    async fn classifies_lines_in_order_across_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let mut lines = vec!["GOP outta here"; CHUNK_SIZE + 3];
        lines[1] = "";
        lines[CHUNK_SIZE + 1] = REAL_EXAMPLE.trim();
        let input = write_input(dir.path(), &lines);

        let (batch, stats) = run_batch_pipeline(fixture_detector(), &input).await.unwrap();
        assert_eq!(stats.total_rows, CHUNK_SIZE + 3);
        assert_eq!(stats.empty, 1);
        assert_eq!(stats.classified, CHUNK_SIZE + 2);
        assert_eq!(batch.num_rows(), CHUNK_SIZE + 3);

        let rows = batch
            .column_by_name("row")
            .unwrap()
            .as_any()
            .downcast_ref::<UInt32Array>()
            .unwrap();
        assert!((0..rows.len()).all(|i| rows.value(i) == i as u32));

        let labels = batch
            .column_by_name("label")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(labels.value(0), "FAKE");
        assert!(labels.is_null(1));
        assert_eq!(labels.value(CHUNK_SIZE + 1), "REAL");
    }

    #[tokio::test]
    async fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_batch_pipeline(fixture_detector(), &dir.path().join("nope.txt")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn parquet_output_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), &[FAKE_EXAMPLE.trim(), REAL_EXAMPLE.trim()]);
        let (batch, _) = run_batch_pipeline(fixture_detector(), &input).await.unwrap();

        let out = dir.path().join("predictions.parquet");
        write_parquet(&out, &batch).unwrap();

        let file = std::fs::File::open(&out).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>().unwrap();
        let total: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(total, 2);
        assert_eq!(batches[0].schema().fields().len(), 8);
    }
}
