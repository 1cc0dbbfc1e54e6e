//! TF-IDF feature extraction with a vocabulary fixed at load time.
//!
//! Mirrors the transform side of a fitted scikit-learn `TfidfVectorizer`:
//! lowercase, regex tokenization, optional stop words, word n-grams, raw or
//! sublinear term frequency, IDF weighting and l1/l2 normalization. Terms
//! outside the vocabulary are dropped.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::DetectError;

/// scikit-learn's default token pattern: runs of two or more word characters.
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Vector normalization applied after IDF weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    #[default]
    L2,
    None,
}

/// Serialized form of a fitted vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerArtifact {
    pub format_version: u32,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Norm,
    /// term -> feature index
    pub vocabulary: HashMap<String, usize>,
    /// Inverse document frequency, indexed by feature index.
    pub idf: Vec<f64>,
}

fn default_true() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// Sparse feature vector: strictly increasing indices, one value each.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dim: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// All-zero vector of the given dimension.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from `(index, value)` pairs. Pairs are sorted, zero values are
    /// dropped and indices must be below `dim` and distinct.
    pub fn from_pairs(dim: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Option<Self> {
        let mut entries: BTreeMap<usize, f64> = BTreeMap::new();
        for (index, value) in pairs {
            if index >= dim || entries.insert(index, value).is_some() {
                return None;
            }
        }
        let (indices, values) = entries.into_iter().filter(|(_, v)| *v != 0.0).unzip();
        Some(Self {
            dim,
            indices,
            values,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    /// Value at `index` (zero for absent entries).
    pub fn get(&self, index: usize) -> f64 {
        self.indices
            .binary_search(&index)
            .map(|pos| self.values[pos])
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Dot product with a dense weight vector of the same dimension.
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.iter().map(|(i, v)| v * dense[i]).sum()
    }
}

/// Fitted TF-IDF vectorizer. Immutable after construction; `vectorize`
/// takes `&self` and is safe to call from many threads.
#[derive(Debug)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    token_pattern: Regex,
    lowercase: bool,
    ngram_range: (usize, usize),
    stop_words: HashSet<String>,
    sublinear_tf: bool,
    norm: Norm,
}

impl TfidfVectorizer {
    /// Validate an artifact and build the vectorizer from it.
    pub fn from_artifact(artifact: VectorizerArtifact) -> Result<Self, DetectError> {
        let dim = artifact.idf.len();
        if dim == 0 {
            return Err(DetectError::FeatureExtraction(
                "vocabulary has zero dimensions".into(),
            ));
        }
        if artifact.vocabulary.len() != dim {
            return Err(DetectError::FeatureExtraction(format!(
                "vocabulary has {} terms but idf has {dim} entries",
                artifact.vocabulary.len()
            )));
        }

        let mut seen = vec![false; dim];
        for (term, &index) in &artifact.vocabulary {
            if index >= dim {
                return Err(DetectError::FeatureExtraction(format!(
                    "term {term:?} maps to index {index}, outside {dim} dimensions"
                )));
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(DetectError::FeatureExtraction(format!(
                    "index {index} is assigned to more than one term"
                )));
            }
        }

        if let Some(pos) = artifact.idf.iter().position(|w| !w.is_finite() || *w < 0.0) {
            return Err(DetectError::FeatureExtraction(format!(
                "idf[{pos}] = {} is not a finite non-negative weight",
                artifact.idf[pos]
            )));
        }

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(DetectError::FeatureExtraction(format!(
                "invalid ngram_range ({min_n}, {max_n})"
            )));
        }

        let token_pattern = Regex::new(&artifact.token_pattern).map_err(|e| {
            DetectError::FeatureExtraction(format!("token pattern does not compile: {e}"))
        })?;

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            token_pattern,
            lowercase: artifact.lowercase,
            ngram_range: artifact.ngram_range,
            stop_words: artifact.stop_words.into_iter().collect(),
            sublinear_tf: artifact.sublinear_tf,
            norm: artifact.norm,
        })
    }

    /// Output dimensionality.
    pub fn dim(&self) -> usize {
        self.idf.len()
    }

    /// Feature index of `term`, if it is in the vocabulary.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn ngram_range(&self) -> (usize, usize) {
        self.ngram_range
    }

    /// Map one text to its TF-IDF vector.
    ///
    /// Never fails because of the text: empty, whitespace-only or
    /// fully out-of-vocabulary input yields an all-zero vector.
    pub fn vectorize(&self, text: &str) -> Result<FeatureVector, DetectError> {
        let dim = self.dim();
        if dim == 0 {
            return Err(DetectError::FeatureExtraction(
                "vocabulary has zero dimensions".into(),
            ));
        }

        let lowered;
        let text = if self.lowercase {
            lowered = text.to_lowercase();
            lowered.as_str()
        } else {
            text
        };

        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .collect();

        // BTreeMap keeps accumulation order, and therefore the float sums, fixed.
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        self.for_each_ngram(&tokens, |term| {
            if let Some(&index) = self.vocabulary.get(term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        });

        let mut weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, count)| {
                let tf = if self.sublinear_tf { 1.0 + count.ln() } else { count };
                (index, tf * self.idf[index])
            })
            .collect();

        let norm = match self.norm {
            Norm::L2 => weighted.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Norm::L1 => weighted.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            Norm::None => 1.0,
        };
        if norm > 0.0 {
            for (_, v) in &mut weighted {
                *v /= norm;
            }
        }

        FeatureVector::from_pairs(dim, weighted).ok_or_else(|| {
            DetectError::FeatureExtraction("vocabulary index outside vector dimension".into())
        })
    }

    fn for_each_ngram(&self, tokens: &[&str], mut f: impl FnMut(&str)) {
        let (min_n, max_n) = self.ngram_range;
        let mut buf = String::new();
        for n in min_n..=max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                if n == 1 {
                    f(window[0]);
                } else {
                    buf.clear();
                    for (i, token) in window.iter().enumerate() {
                        if i > 0 {
                            buf.push(' ');
                        }
                        buf.push_str(token);
                    }
                    f(&buf);
                }
            }
        }
    }
}
