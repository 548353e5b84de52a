use std::path::PathBuf;

/// Runtime configuration loaded from environment variables (and `.env`).
///
/// | Env Var                | Default                   |
/// |------------------------|---------------------------|
/// | `LINGUIST_TM_PATH`     | `translation_memory.json` |
/// | `LINGUIST_SOURCE_LANG` | `en`                      |
/// | `LINGUIST_TARGET_LANG` | document language         |
/// | `LINGUIST_QA_STRICT`   | `false`                   |
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub tm_path: PathBuf,
    pub source_lang: String,
    /// Falls back to the `language` attribute of the document at hand.
    pub target_lang: Option<String>,
    pub qa_strict: bool,
}

pub const DEFAULT_TARGET_LANG: &str = "de_DE";

impl Default for CoreConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let tm_path = non_empty("LINGUIST_TM_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("translation_memory.json"));

        let source_lang = non_empty("LINGUIST_SOURCE_LANG").unwrap_or_else(|| "en".into());
        let target_lang = non_empty("LINGUIST_TARGET_LANG");

        let qa_strict = non_empty("LINGUIST_QA_STRICT")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Self {
            tm_path,
            source_lang,
            target_lang,
            qa_strict,
        }
    }

    pub fn target_lang_for<'a>(&'a self, document_language: Option<&'a str>) -> &'a str {
        self.target_lang
            .as_deref()
            .or(document_language)
            .unwrap_or(DEFAULT_TARGET_LANG)
    }
}
