mod batch;
mod display;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use veracity_ai::bundle::{MODEL_FILE, VECTORIZER_FILE};
use veracity_ai::samples::{FAKE_EXAMPLE, REAL_EXAMPLE};
use veracity_ai::{BundlePaths, DetectError, Detector};
use veracity_core::{TextStats, word_frequencies};

/// Exit status when the input text was empty.
const EXIT_EMPTY_INPUT: u8 = 2;

#[derive(Parser)]
#[command(name = "veracity", version, about = "Classify news text as REAL or FAKE")]
struct Cli {
    /// Directory holding vectorizer.json and model.json.
    #[arg(long, env = "VERACITY_MODEL_DIR", default_value = "model")]
    model_dir: PathBuf,

    /// Vectorizer artifact (overrides --model-dir).
    #[arg(long, env = "VERACITY_VECTORIZER")]
    vectorizer: Option<PathBuf>,

    /// Classifier artifact (overrides --model-dir).
    #[arg(long, env = "VERACITY_MODEL")]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one text from an argument, a file, a bundled example or stdin.
    Classify {
        text: Option<String>,

        #[arg(long, conflicts_with_all = ["text", "example"])]
        file: Option<PathBuf>,

        #[arg(long, value_enum, conflicts_with = "text")]
        example: Option<Example>,

        /// Print the prediction as JSON.
        #[arg(long)]
        json: bool,

        /// Number of frequent words to show.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Classify one text per line and write the predictions.
    Batch {
        input: PathBuf,

        /// Parquet output; prints a table when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Load the bundle and describe it.
    Inspect,
}

#[derive(Clone, Copy, ValueEnum)]
enum Example {
    Real,
    Fake,
}

impl Cli {
    fn bundle_paths(&self) -> BundlePaths {
        BundlePaths::new(
            self.vectorizer
                .clone()
                .unwrap_or_else(|| self.model_dir.join(VECTORIZER_FILE)),
            self.model
                .clone()
                .unwrap_or_else(|| self.model_dir.join(MODEL_FILE)),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::info!("veracity v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let paths = cli.bundle_paths();

    // Load failures are fatal: nothing is served from a broken bundle.
    let detector = tokio::task::spawn_blocking(move || Detector::open(paths))
        .await
        .context("bundle loader panicked")?
        .context("loading model bundle")?;
    let detector = Arc::new(detector);

    match cli.command {
        Command::Classify {
            text,
            file,
            example,
            json,
            top,
        } => {
            let text = match (text, file, example) {
                (Some(text), _, _) => text,
                (None, Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None, Some(Example::Real)) => REAL_EXAMPLE.to_string(),
                (None, None, Some(Example::Fake)) => FAKE_EXAMPLE.to_string(),
                (None, None, None) => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading stdin")?;
                    buf
                }
            };

            return run_classify(&detector, &text, json, top);
        }
        Command::Batch { input, output } => {
            let (batch, stats) = batch::run_batch_pipeline(Arc::clone(&detector), &input).await?;
            match output {
                Some(path) => batch::write_parquet(&path, &batch)?,
                None => arrow::util::pretty::print_batches(&[batch])?,
            }
            eprintln!(
                "  Classified {} of {} rows ({} empty) in {:.2}s",
                stats.classified, stats.total_rows, stats.empty, stats.elapsed_secs
            );
        }
        Command::Inspect => {
            display::print_bundle_summary(detector.load()?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Classify `text` and print the result card or JSON.
///
/// Empty input prints a prompt and yields [`EXIT_EMPTY_INPUT`]. Any other
/// failure is returned as an error and nothing is printed to stdout.
fn run_classify(
    detector: &Detector,
    text: &str,
    json: bool,
    top: usize,
) -> anyhow::Result<ExitCode> {
    let result = match detector.classify(text) {
        Ok(result) => result,
        Err(DetectError::EmptyInput) => {
            eprintln!("Please enter some text to analyze.");
            return Ok(ExitCode::from(EXIT_EMPTY_INPUT));
        }
        Err(e) => return Err(e).context("classification failed"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let stats = TextStats::of(text);
        let words = word_frequencies(text, top);
        display::print_result(&result, &stats, &words);
    }
    Ok(ExitCode::SUCCESS)
}
