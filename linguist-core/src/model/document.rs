use serde::{Deserialize, Serialize};

use super::entry::{TranslationText, TsMessage};
use crate::error::{CoreError, CoreResult};

fn default_version() -> String {
    "2.1".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TsDocument {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub source_language: Option<String>,

    #[serde(default)]
    pub contexts: Vec<TsContext>,
}

impl Default for TsDocument {
    fn default() -> Self {
        TsDocument {
            version: default_version(),
            language: None,
            source_language: None,
            contexts: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct TsContext {
    pub name: String,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub messages: Vec<TsMessage>,
}

impl TsContext {
    pub fn new(name: impl Into<String>) -> Self {
        TsContext {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Looks a message up by its lupdate identity, `(source, comment)`.
    pub fn find(&self, source: &str, comment: Option<&str>) -> Option<&TsMessage> {
        let key = (source, comment.unwrap_or(""));
        self.messages.iter().find(|m| m.key() == key)
    }

    pub fn find_mut(&mut self, source: &str, comment: Option<&str>) -> Option<&mut TsMessage> {
        let key = (source, comment.unwrap_or(""));
        self.messages.iter_mut().find(|m| m.key() == key)
    }
}

impl TsDocument {
    pub fn new(language: impl Into<String>) -> Self {
        TsDocument {
            language: Some(language.into()),
            ..Default::default()
        }
    }

    pub fn context(&self, name: &str) -> Option<&TsContext> {
        self.contexts.iter().find(|c| c.name == name)
    }

    pub fn context_mut(&mut self, name: &str) -> Option<&mut TsContext> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    pub fn context_or_insert(&mut self, name: &str) -> &mut TsContext {
        let idx = match self.contexts.iter().position(|c| c.name == name) {
            Some(i) => i,
            None => {
                self.contexts.push(TsContext::new(name));
                self.contexts.len() - 1
            }
        };
        &mut self.contexts[idx]
    }

    pub fn messages(&self) -> impl Iterator<Item = (&TsContext, &TsMessage)> {
        self.contexts
            .iter()
            .flat_map(|c| c.messages.iter().map(move |m| (c, m)))
    }

    pub fn message_count(&self) -> usize {
        self.contexts.iter().map(|c| c.messages.len()).sum()
    }

    /// Resolves a string the way an application's translator does at runtime:
    /// only finished, non-empty translations count. Historical entries are
    /// skipped even when they share the source text.
    pub fn translate(&self, context: &str, source: &str) -> Option<&str> {
        self.context(context)?
            .messages
            .iter()
            .filter(|m| m.source == source)
            .find_map(TsMessage::finished_text)
    }

    /// Rejects translation shapes the TS format cannot carry: plain text on a
    /// `numerus="yes"` message, or an empty form list on a plain one. Both
    /// would read back differently after writing.
    pub fn check_text_forms(&self) -> CoreResult<()> {
        for (ctx, m) in self.messages() {
            let Some(t) = &m.translation else {
                continue;
            };
            let bad = match &t.text {
                TranslationText::Single(_) => m.numerus,
                TranslationText::Numerus(forms) => !m.numerus && forms.is_empty(),
            };
            if bad {
                return Err(CoreError::structure(
                    Some(&ctx.name),
                    format!("translation of '{}' does not match its numerus flag", m.source),
                ));
            }
        }
        Ok(())
    }
}
