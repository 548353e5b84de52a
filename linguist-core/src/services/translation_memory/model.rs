use serde::{Deserialize, Serialize};

use super::{hash, normalize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TmEntry {
    pub source_lang: String,
    pub target_lang: String,

    pub original: String,
    pub translation: String,

    #[serde(default)]
    pub normalized: String,

    #[serde(default)]
    pub hash: String,
}

impl TmEntry {
    pub fn new(source_lang: &str, target_lang: &str, original: &str, translation: &str) -> Self {
        let normalized = normalize::normalize(original);
        let hash = hash::hash_norm(&normalized);
        TmEntry {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            original: original.to_string(),
            translation: translation.to_string(),
            normalized,
            hash,
        }
    }
}
