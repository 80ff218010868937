//! Static embedding dimensions for known watsonx models
//!
//! Lookup is ASCII case-insensitive: the service lists some models with
//! mixed case (`ibm/granite-embedding-278M-multilingual`) while settings
//! often store them lower-cased.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Model used when none is configured
pub const DEFAULT_MODEL_ID: &str = "ibm/slate-125m-english-rtrvr-v2";

/// Width assumed for models missing from the table
pub const DEFAULT_DIMENSION: usize = 768;

/// Known embedding models and their vector widths
const KNOWN_MODELS: &[(&str, usize)] = &[
    ("ibm/slate-125m-english-rtrvr-v2", 768),
    ("ibm/slate-125m-english-rtrvr", 768),
    ("ibm/slate-30m-english-rtrvr-v2", 384),
    ("ibm/slate-30m-english-rtrvr", 384),
    ("ibm/granite-embedding-107m-multilingual", 384),
    ("ibm/granite-embedding-278m-multilingual", 768),
    ("intfloat/multilingual-e5-large", 1024),
    ("sentence-transformers/all-minilm-l6-v2", 384),
    ("sentence-transformers/all-minilm-l12-v2", 384),
];

static DIMENSIONS: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    KNOWN_MODELS
        .iter()
        .map(|(id, dim)| (id.to_ascii_lowercase(), *dim))
        .collect()
});

/// Dimension for a known model, `None` if the model is not in the table
pub fn known_dimension(model_id: &str) -> Option<usize> {
    DIMENSIONS.get(&model_id.to_ascii_lowercase()).copied()
}

/// Dimension for a model, falling back to [`DEFAULT_DIMENSION`]
pub fn expected_dimension(model_id: &str) -> usize {
    known_dimension(model_id).unwrap_or(DEFAULT_DIMENSION)
}

/// All known models, in table order
pub fn known_models() -> impl Iterator<Item = (&'static str, usize)> {
    KNOWN_MODELS.iter().copied()
}
