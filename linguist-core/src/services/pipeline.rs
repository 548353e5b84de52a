use serde::Serialize;

use crate::model::document::TsDocument;
use crate::model::entry::{TranslationText, TranslationType};
use crate::services::qa;
use crate::services::translation_memory::{matcher, model::TmEntry};

pub struct PipelineConfig<'a> {
    pub source_lang: &'a str,
    pub target_lang: &'a str,
}

#[derive(Debug, Serialize, Default, PartialEq, Eq)]
pub struct PretranslateReport {
    pub candidates: usize,
    pub used_tm: usize,
    pub placeholder_conflicts: usize,
    /// Matches found only through normalization (case, mnemonics, trailing
    /// ellipsis) or whose accelerator disagrees with the source.
    pub inexact_matches: usize,
}

/// Fills empty unfinished messages from exact memory matches. A match is
/// applied as finished only when the remembered original is the same string
/// as the source and placeholders and accelerators agree; anything else is
/// left for the translator.
pub fn pretranslate(doc: &mut TsDocument, tm: &[TmEntry], cfg: PipelineConfig) -> PretranslateReport {
    let mut report = PretranslateReport::default();

    for ctx in doc.contexts.iter_mut() {
        for m in ctx.messages.iter_mut() {
            if m.numerus {
                continue;
            }
            let Some(t) = m.translation.as_mut() else {
                continue;
            };
            if t.kind != TranslationType::Unfinished || !t.text.is_empty() {
                continue;
            }
            report.candidates += 1;

            let Some(hit) = matcher::exact_match(tm, cfg.source_lang, cfg.target_lang, &m.source) else {
                continue;
            };

            if qa::placeholders(&hit.translation) != qa::placeholders(&m.source) {
                tracing::debug!(
                    context = %ctx.name,
                    source = %m.source,
                    "memory match skipped, placeholders differ"
                );
                report.placeholder_conflicts += 1;
                continue;
            }

            if hit.original != m.source || qa::has_accelerator(&hit.translation) != qa::has_accelerator(&m.source) {
                tracing::debug!(
                    context = %ctx.name,
                    source = %m.source,
                    original = %hit.original,
                    "memory match skipped, not an exact source match"
                );
                report.inexact_matches += 1;
                continue;
            }

            t.text = TranslationText::Single(hit.translation.clone());
            t.kind = TranslationType::Finished;
            report.used_tm += 1;
        }
    }

    tracing::info!(
        candidates = report.candidates,
        used_tm = report.used_tm,
        "pretranslated from memory"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::ts;

    #[test]
    fn fills_unfinished_from_memory() {
        let mut doc = ts::parse(
            r#"<TS version="2.1" language="de_DE"><context><name>launcher::MainWindow</name>
<message><source>Initial Setup</source><translation type="unfinished"></translation></message>
<message><source>By %1</source><translation type="unfinished"></translation></message>
<message><source>Coop</source><translation type="unfinished"></translation></message>
<message><source>Portable</source><translation>Tragbar</translation></message>
</context></TS>"#,
        )
        .unwrap();

        let tm = vec![
            TmEntry::new("en", "de_DE", "Initial Setup", "Initiales Setup"),
            TmEntry::new("en", "de_DE", "By %1", "Von"),
            TmEntry::new("en", "de_DE", "Portable", "Portabel"),
        ];

        let report = pretranslate(
            &mut doc,
            &tm,
            PipelineConfig {
                source_lang: "en",
                target_lang: "de_DE",
            },
        );

        assert_eq!(
            report,
            PretranslateReport {
                candidates: 3,
                used_tm: 1,
                placeholder_conflicts: 1,
                inexact_matches: 0,
            }
        );
        assert_eq!(doc.translate("launcher::MainWindow", "Initial Setup"), Some("Initiales Setup"));
        assert_eq!(doc.translate("launcher::MainWindow", "By %1"), None);
        // finished translations are never overwritten
        assert_eq!(doc.translate("launcher::MainWindow", "Portable"), Some("Tragbar"));
    }

    #[test]
    fn normalized_matches_are_not_approved() {
        let mut doc = ts::parse(
            r#"<TS version="2.1" language="de_DE"><context><name>MainWindow</name>
<message><source>E&amp;xit</source><translation type="unfinished"></translation></message>
<message><source>Save As...</source><translation type="unfinished"></translation></message>
<message><source>&amp;Open</source><translation type="unfinished"></translation></message>
</context></TS>"#,
        )
        .unwrap();

        let tm = vec![
            TmEntry::new("en", "de_DE", "Exit", "Beenden"),
            TmEntry::new("en", "de_DE", "Save As", "Speichern unter"),
            TmEntry::new("en", "de_DE", "&Open", "Öffnen"),
        ];

        let report = pretranslate(
            &mut doc,
            &tm,
            PipelineConfig {
                source_lang: "en",
                target_lang: "de_DE",
            },
        );

        assert_eq!(report.used_tm, 0);
        assert_eq!(report.inexact_matches, 3);
        assert!(qa::run(&doc, qa::QaOptions::default())
            .iter()
            .all(|i| i.code != "ACCELERATOR_MISMATCH"));
        assert_eq!(doc.translate("MainWindow", "Save As..."), None);
        assert!(doc.messages().all(|(_, m)| m.translation.as_ref().unwrap().text.is_empty()));
    }
}
