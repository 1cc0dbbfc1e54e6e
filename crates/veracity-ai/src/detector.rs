//! Inference orchestration: load-once bundle lifecycle and `classify`.
//!
//! A [`Detector`] starts `Unloaded`, moves through `Loading` exactly once and
//! ends either `Ready` or `LoadFailed`. Both end states are permanent: a
//! failed load is reported to every later caller and never retried. Once
//! `Ready`, `classify` takes `&self`, holds no locks and can run on any
//! number of threads.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::{debug, error, info};
use veracity_core::PredictionResult;

use crate::DetectError;
use crate::bundle::{BundlePaths, ModelBundle};

/// Distance from 0.5/0.5 below which a prediction is logged as borderline.
pub const BOUNDARY_MARGIN: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    LoadFailed,
}

impl LoadState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Unloaded,
            1 => Self::Loading,
            2 => Self::Ready,
            _ => Self::LoadFailed,
        }
    }
}

pub struct Detector {
    paths: Option<BundlePaths>,
    state: AtomicU8,
    bundle: OnceLock<Result<ModelBundle, DetectError>>,
}

impl Detector {
    /// A detector that loads `paths` on first use.
    pub fn new(paths: BundlePaths) -> Self {
        Self {
            paths: Some(paths),
            state: AtomicU8::new(LoadState::Unloaded as u8),
            bundle: OnceLock::new(),
        }
    }

    /// A detector that is `Ready` with an already-built bundle.
    pub fn with_bundle(bundle: ModelBundle) -> Self {
        Self {
            paths: None,
            state: AtomicU8::new(LoadState::Ready as u8),
            bundle: OnceLock::from(Ok(bundle)),
        }
    }

    /// Load `paths` now, failing if the bundle is unusable.
    pub fn open(paths: BundlePaths) -> Result<Self, DetectError> {
        let detector = Self::new(paths);
        detector.load()?;
        Ok(detector)
    }

    pub fn state(&self) -> LoadState {
        LoadState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Return the loaded bundle, loading it first if nobody has yet.
    ///
    /// Concurrent first callers block on a single load. After a failure every
    /// call returns the same error.
    pub fn load(&self) -> Result<&ModelBundle, DetectError> {
        self.bundle
            .get_or_init(|| {
                self.set_state(LoadState::Loading);
                let result = match &self.paths {
                    Some(paths) => ModelBundle::load(paths),
                    None => Err(DetectError::InvalidModel("no bundle source configured".into())),
                };
                match &result {
                    Ok(bundle) => {
                        info!(dim = bundle.dim(), "detector ready");
                        self.set_state(LoadState::Ready);
                    }
                    Err(e) => {
                        error!(error = %e, "model bundle failed to load");
                        self.set_state(LoadState::LoadFailed);
                    }
                }
                result
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Classify one text as FAKE or REAL.
    ///
    /// Text with no non-whitespace characters fails with
    /// [`DetectError::EmptyInput`]. Any other error is an integrity defect
    /// and is returned as-is rather than replaced by a default label.
    pub fn classify(&self, text: &str) -> Result<PredictionResult, DetectError> {
        let bundle = self.load()?;

        if text.trim().is_empty() {
            return Err(DetectError::EmptyInput);
        }

        let vector = bundle.vectorizer().vectorize(text)?;
        let score = bundle.classifier().score(&vector)?;
        let result = PredictionResult::from_distribution(score.distribution, score.index)
            .ok_or_else(|| {
                DetectError::InvalidModel(format!("class index {} outside label space", score.index))
            })?;

        debug!(
            label = %result.predicted_label,
            confidence = result.confidence,
            features = vector.nnz(),
            near_boundary = result.is_near_boundary(BOUNDARY_MARGIN),
            "classified text"
        );
        Ok(result)
    }

    fn set_state(&self, state: LoadState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("paths", &self.paths)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::classifier::{Classifier, ClassifierArtifact, DecisionTree, ModelParams, TreeNode};
    use crate::samples::{FAKE_EXAMPLE, REAL_EXAMPLE};
    use crate::testing::{fixture_bundle, fixture_paths, write_bundle};
    use crate::vectorizer::{TfidfVectorizer, VectorizerArtifact};
    use veracity_core::{DISTRIBUTION_TOLERANCE, Label};

    /// Label of the arg-max entry, ties to the lowest index.
    fn label_of(distribution: &[f64; Label::COUNT]) -> Label {
        Label::ALL[crate::classifier::argmax(distribution)]
    }

    fn ready() -> Detector {
        Detector::with_bundle(fixture_bundle())
    }

    fn assert_contract(result: &PredictionResult) {
        assert_eq!(result.distribution.len(), 2);
        for p in result.distribution {
            assert!((0.0..=1.0).contains(&p), "probability {p} out of range");
        }
        let sum: f64 = result.distribution.iter().sum();
        assert!((sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE, "sum {sum}");
        assert_eq!(result.predicted_label, label_of(&result.distribution));
        assert_eq!(result.confidence, result.probability(result.predicted_label));
    }

    #[test]
    fn empty_and_whitespace_input_are_rejected() {
        let d = ready();
        for text in ["", "   ", "\n\t \r\n"] {
            assert_eq!(d.classify(text), Err(DetectError::EmptyInput));
        }
    }

    #[test]
    fn golden_examples_match_frozen_bundle() {
        let d = ready();

        let fake = d.classify(FAKE_EXAMPLE).unwrap();
        assert_eq!(fake.predicted_label, Label::Fake);
        assert!(fake.confidence > 0.85, "fake confidence {}", fake.confidence);
        assert_contract(&fake);

        let real = d.classify(REAL_EXAMPLE).unwrap();
        assert_eq!(real.predicted_label, Label::Real);
        assert!(real.confidence > 0.85, "real confidence {}", real.confidence);
        assert_contract(&real);
    }

    #[test]
    fn degenerate_text_flows_through_normal_path() {
        let d = ready();
        for text in ["!!!", "a", "...   ,,,   ;;", "    x    ", "zzzz qqqq", "Reuters"] {
            let result = d.classify(text).unwrap();
            assert_contract(&result);
        }
        // No known terms: every tree takes its "absent" branch.
        let result = d.classify("?!").unwrap();
        assert_eq!(result.predicted_label, Label::Fake);
        assert!(result.confidence < 0.65);
    }

    #[test]
    fn repeated_classification_is_bit_identical() {
        let d = ready();
        let text = "Officials said the committee declined to comment, sources said.";
        let first = d.classify(text).unwrap();
        for _ in 0..5 {
            let again = d.classify(text).unwrap();
            assert_eq!(again, first);
            assert_eq!(again.confidence.to_bits(), first.confidence.to_bits());
        }
    }

    #[test]
    fn very_long_input_is_processed_in_full() {
        let d = ready();
        let text = "filler words only ".repeat(20_000) + "reuters";
        let result = d.classify(&text).unwrap();
        assert_contract(&result);
        assert_eq!(result, d.classify("reuters").unwrap());
    }

    #[test]
    fn exact_tie_resolves_to_fake() {
        let vectorizer = TfidfVectorizer::from_artifact(VectorizerArtifact {
            format_version: 1,
            lowercase: true,
            token_pattern: crate::vectorizer::DEFAULT_TOKEN_PATTERN.into(),
            ngram_range: (1, 1),
            stop_words: vec![],
            sublinear_tf: false,
            norm: Default::default(),
            vocabulary: [("news".to_string(), 0)].into_iter().collect(),
            idf: vec![1.0],
        })
        .unwrap();
        let classifier = Classifier::from_artifact(ClassifierArtifact {
            format_version: 1,
            classes: vec!["FAKE".into(), "REAL".into()],
            n_features: 1,
            model: ModelParams::RandomForest {
                trees: vec![DecisionTree {
                    nodes: vec![TreeNode::Leaf {
                        value: vec![7.0, 7.0],
                    }],
                }],
            },
        })
        .unwrap();
        let d = Detector::with_bundle(ModelBundle::new(vectorizer, classifier).unwrap());

        let result = d.classify("news").unwrap();
        assert_eq!(result.distribution, [0.5, 0.5]);
        assert_eq!(result.predicted_label, Label::Fake);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn lazy_load_transitions_to_ready() {
        let d = Detector::new(fixture_paths());
        assert_eq!(d.state(), LoadState::Unloaded);
        let result = d.classify(REAL_EXAMPLE).unwrap();
        assert_eq!(result.predicted_label, Label::Real);
        assert_eq!(d.state(), LoadState::Ready);
    }

    #[test]
    fn failed_load_is_terminal_and_never_predicts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_bundle(dir.path(), 5, 6, r#"["FAKE", "REAL"]"#);
        let d = Detector::new(paths.clone());

        let first = d.load().unwrap_err();
        assert!(matches!(first, DetectError::DimensionMismatch { .. }));
        assert_eq!(d.state(), LoadState::LoadFailed);

        // Fixing the files does not resurrect the detector.
        std::fs::remove_file(&paths.model).unwrap();
        write_bundle(dir.path(), 5, 5, r#"["FAKE", "REAL"]"#);
        assert_eq!(d.load().unwrap_err(), first);
        assert_eq!(d.classify(REAL_EXAMPLE), Err(first.clone()));
        assert_eq!(d.classify(""), Err(first));
        assert_eq!(d.state(), LoadState::LoadFailed);
    }

    #[test]
    fn open_surfaces_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = Detector::open(BundlePaths::from_dir(dir.path())).unwrap_err();
        assert!(matches!(err, DetectError::Artifact { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn concurrent_first_callers_share_one_load() {
        let d = Arc::new(Detector::new(fixture_paths()));
        let bundles: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let d = Arc::clone(&d);
                    s.spawn(move || d.load().map(|b| b as *const ModelBundle as usize).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(bundles.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(d.state(), LoadState::Ready);
    }

    #[test]
    fn concurrent_classification_agrees_with_serial() {
        let d = ready();
        let texts = [FAKE_EXAMPLE, REAL_EXAMPLE, "!!!", "GOP sources said"];
        let serial: Vec<_> = texts.iter().map(|t| d.classify(t).unwrap()).collect();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for (text, expected) in texts.iter().zip(&serial) {
                        assert_eq!(&d.classify(text).unwrap(), expected);
                    }
                });
            }
        });
    }

    #[test]
    fn detector_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Detector>();
    }
}
