use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::document::TsDocument;
use crate::model::entry::{Location, Translation, TranslationText, TranslationType, TsMessage};

/// A string found by re-scanning the application's sources and UI files.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExtractedMessage {
    pub context: String,
    pub source: String,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub extra_comment: Option<String>,

    #[serde(default)]
    pub numerus: bool,

    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Remove messages instead of keeping them as vanished/obsolete.
    #[serde(default)]
    pub drop_obsolete: bool,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub added: usize,
    pub kept: usize,
    pub revived: usize,
    pub vanished: usize,
    pub removed: usize,
}

type Key = (String, String, String);

fn key_of(context: &str, source: &str, comment: Option<&str>) -> Key {
    (
        context.to_string(),
        source.to_string(),
        comment.unwrap_or("").to_string(),
    )
}

pub fn update(doc: &mut TsDocument, extracted: &[ExtractedMessage], opts: UpdateOptions) -> UpdateReport {
    let mut report = UpdateReport::default();

    let wanted: HashMap<Key, &ExtractedMessage> = extracted
        .iter()
        .map(|e| (key_of(&e.context, &e.source, e.comment.as_deref()), e))
        .collect();
    let mut matched: HashSet<Key> = HashSet::new();

    // Live entries claim their key first so a historical twin stays historical.
    for historical_pass in [false, true] {
        for ctx in doc.contexts.iter_mut() {
            for m in ctx.messages.iter_mut() {
                if m.is_historical() != historical_pass {
                    continue;
                }
                let key = key_of(&ctx.name, &m.source, m.comment.as_deref());
                let Some(e) = wanted.get(&key).copied() else {
                    continue;
                };
                if !matched.insert(key) {
                    continue;
                }

                m.locations = e.locations.clone();
                if e.extra_comment.is_some() {
                    m.extra_comment = e.extra_comment.clone();
                }
                if historical_pass {
                    if let Some(t) = m.translation.as_mut() {
                        t.kind = TranslationType::Unfinished;
                    }
                    report.revived += 1;
                } else {
                    report.kept += 1;
                }
            }
        }
    }

    for ctx in doc.contexts.iter_mut() {
        let name = ctx.name.clone();
        ctx.messages.retain_mut(|m| {
            let key = key_of(&name, &m.source, m.comment.as_deref());
            if matched.contains(&key) && !m.is_historical() {
                return true;
            }
            if matched.contains(&key) {
                // Historical twin of an entry that is still live.
                if opts.drop_obsolete {
                    report.removed += 1;
                    return false;
                }
                return true;
            }
            if opts.drop_obsolete {
                report.removed += 1;
                return false;
            }
            if !m.is_historical() {
                retire(m);
                report.vanished += 1;
            }
            true
        });
    }

    for e in extracted {
        let key = key_of(&e.context, &e.source, e.comment.as_deref());
        if !matched.insert(key) {
            continue;
        }
        doc.context_or_insert(&e.context).messages.push(new_message(e));
        report.added += 1;
    }

    doc.contexts.retain(|c| !c.messages.is_empty());

    tracing::info!(
        added = report.added,
        kept = report.kept,
        revived = report.revived,
        vanished = report.vanished,
        removed = report.removed,
        "updated translations from extracted sources"
    );
    report
}

/// Finished translations vanish; unfinished ones (or a missing translation)
/// become obsolete, whatever text they carry.
fn retire(m: &mut TsMessage) {
    m.locations.clear();
    let kind = match m.kind() {
        Some(TranslationType::Finished) => TranslationType::Vanished,
        _ => TranslationType::Obsolete,
    };
    match m.translation.as_mut() {
        Some(t) => t.kind = kind,
        None => {
            m.translation = Some(Translation {
                kind,
                text: TranslationText::default(),
            })
        }
    }
}

fn new_message(e: &ExtractedMessage) -> TsMessage {
    let text = if e.numerus {
        TranslationText::Numerus(Vec::new())
    } else {
        TranslationText::Single(String::new())
    };
    TsMessage {
        numerus: e.numerus,
        locations: e.locations.clone(),
        source: e.source.clone(),
        comment: e.comment.clone(),
        extra_comment: e.extra_comment.clone(),
        translation: Some(Translation {
            kind: TranslationType::Unfinished,
            text,
        }),
        ..Default::default()
    }
}
