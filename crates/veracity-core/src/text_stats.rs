//! Descriptive statistics of raw input text.
//!
//! Independent of the classifier: these feed the "text analysis" panel (word
//! and character counts) and the word-frequency view.

use std::collections::HashMap;

/// Words dropped from frequency counts.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "else",
    "ever", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "however", "if", "in", "into", "is", "it",
    "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "of",
    "off", "on", "once", "only", "or", "other", "otherwise", "ought", "our", "ours", "ourselves",
    "out", "over", "own", "same", "shall", "she", "should", "so", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "with", "would", "you", "your",
    "yours", "yourself", "yourselves",
];

/// Word and character counts for a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStats {
    /// Whitespace-separated tokens.
    pub word_count: usize,
    /// Unicode scalar values, whitespace included.
    pub char_count: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            word_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
        }
    }
}

/// Most frequent words in `text`, highest count first, ties alphabetical.
///
/// Words are maximal runs of alphanumeric characters and apostrophes,
/// lowercased, with a trailing possessive `'s` removed. Purely numeric words,
/// single characters and [`STOP_WORDS`] are skipped. A word ending in a single
/// `s` is counted under its singular when the singular also occurs. Returns
/// at most `top_n` entries.
pub fn word_frequencies(text: &str, top_n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for raw in text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}')) {
        let word = normalize_word(raw);
        if word.chars().count() < 2
            || word.chars().all(|c| c.is_numeric())
            || STOP_WORDS.contains(&word.as_str())
        {
            continue;
        }
        *counts.entry(word).or_insert(0) += 1;
    }

    merge_plurals(&mut counts);

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

fn merge_plurals(counts: &mut HashMap<String, usize>) {
    let plurals: Vec<String> = counts
        .keys()
        .filter(|w| w.ends_with('s') && !w.ends_with("ss"))
        .filter(|w| counts.contains_key(&w[..w.len() - 1]))
        .cloned()
        .collect();
    for plural in plurals {
        if let Some(n) = counts.remove(&plural) {
            *counts.entry(plural[..plural.len() - 1].to_string()).or_insert(0) += n;
        }
    }
}

fn normalize_word(raw: &str) -> String {
    let lower = raw.to_lowercase().replace('\u{2019}', "'");
    let stripped = lower.strip_suffix("'s").unwrap_or(&lower);
    stripped.trim_matches('\'').to_string()
}
