//! Terminal rendering of a prediction and its text analysis.
//!
//! Renders the verdict line, one probability bar per label and the word
//! statistics. Values are displayed exactly as the detector produced them.

use veracity_ai::ModelBundle;
use veracity_core::{Label, PredictionResult, TextStats};

const BAR_WIDTH: usize = 40;
const WORD_BAR_WIDTH: usize = 20;

// ── Public API ──

/// Print the full result card for one classified text.
pub fn print_result(result: &PredictionResult, stats: &TextStats, words: &[(String, usize)]) {
    print!("{}", render_result(result, stats, words));
}

/// Print a summary of a loaded bundle.
pub fn print_bundle_summary(bundle: &ModelBundle) {
    let classifier = bundle.classifier();
    println!("=== Model bundle ===");
    println!("  {:<16} {}", "dimension", bundle.dim());
    println!("  {:<16} {:?}", "ngram_range", bundle.vectorizer().ngram_range());
    println!("  {:<16} {}", "model", classifier.family());
    if let Some(trees) = classifier.tree_count() {
        println!("  {:<16} {}", "trees", trees);
    }
    let order: Vec<String> = Label::ALL
        .iter()
        .map(|l| format!("{}={}", l.index(), l))
        .collect();
    println!("  {:<16} {}", "label order", order.join(", "));
}

pub fn render_result(
    result: &PredictionResult,
    stats: &TextStats,
    words: &[(String, usize)],
) -> String {
    let mut out = String::new();
    out.push_str(&verdict_line(result));
    out.push_str("\n\n");

    out.push_str("Prediction confidence\n");
    for label in Label::ALL {
        let p = result.probability(label);
        out.push_str(&format!("  {:<5} {} {:.2}\n", label, bar(p, BAR_WIDTH), p));
    }
    out.push('\n');

    out.push_str("Text analysis\n");
    out.push_str(&format!("  {:<16} {}\n", "word count", stats.word_count));
    out.push_str(&format!("  {:<16} {}\n", "character count", stats.char_count));

    if let Some((_, top)) = words.first() {
        out.push('\n');
        out.push_str("Frequent words\n");
        for (word, count) in words {
            let filled = (count * WORD_BAR_WIDTH).div_ceil(*top);
            out.push_str(&format!("  {:<16} {} {}\n", word, "#".repeat(filled), count));
        }
    }

    out
}

/// Headline verdict with the confidence as a percentage.
pub fn verdict_line(result: &PredictionResult) -> String {
    let headline = match result.predicted_label {
        Label::Fake => "FAKE NEWS",
        Label::Real => "REAL NEWS",
    };
    format!(
        "{headline} (confidence: {:.1}%)",
        result.confidence_percent()
    )
}

// ── Helpers ──

fn bar(p: f64, width: usize) -> String {
    let filled = (p.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
