//! Shared helpers for unit tests: the frozen fixture bundle and tiny
//! hand-written bundles.

use std::fs;
use std::path::{Path, PathBuf};

use crate::bundle::{BundlePaths, MODEL_FILE, ModelBundle, VECTORIZER_FILE};

pub fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn fixture_paths() -> BundlePaths {
    BundlePaths::from_dir(&fixture_dir())
}

pub fn fixture_bundle() -> ModelBundle {
    ModelBundle::load(&fixture_paths()).expect("fixture bundle loads")
}

/// Write a bundle whose vectorizer has `vectorizer_dim` terms (`t0`, `t1`, ...)
/// and whose one-leaf forest expects `model_dim` features.
pub fn write_bundle(dir: &Path, vectorizer_dim: usize, model_dim: usize, classes: &str) -> BundlePaths {
    let vocabulary = (0..vectorizer_dim)
        .map(|i| format!("\"t{i}\": {i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let idf = vec!["1.0"; vectorizer_dim].join(", ");
    let vectorizer = format!(
        "{{\n  \"format_version\": 1,\n  \"vocabulary\": {{ {vocabulary} }},\n  \"idf\": [{idf}]\n}}\n"
    );
    let model = format!(
        "{{\n  \"format_version\": 1,\n  \"classes\": {classes},\n  \"n_features\": {model_dim},\n  \
         \"model\": {{ \"type\": \"random_forest\", \"trees\": [{{ \"nodes\": [{{ \"value\": [3, 1] }}] }}] }}\n}}\n"
    );

    let paths = BundlePaths::new(dir.join(VECTORIZER_FILE), dir.join(MODEL_FILE));
    fs::write(&paths.vectorizer, vectorizer).unwrap();
    fs::write(&paths.model, model).unwrap();
    paths
}
