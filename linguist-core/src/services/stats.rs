use serde::Serialize;

use crate::model::document::{TsContext, TsDocument};
use crate::model::entry::TranslationType;

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Counts {
    pub finished: usize,
    pub unfinished: usize,
    /// Unfinished messages that have no text yet (a subset of `unfinished`).
    pub unfinished_empty: usize,
    pub vanished: usize,
    pub obsolete: usize,
    /// Live messages with no usable text: finished-but-empty or no
    /// `<translation>` element at all.
    pub untranslated: usize,
}

impl Counts {
    pub fn live(&self) -> usize {
        self.finished + self.unfinished + self.untranslated
    }

    fn add(&mut self, other: &Counts) {
        self.finished += other.finished;
        self.unfinished += other.unfinished;
        self.unfinished_empty += other.unfinished_empty;
        self.vanished += other.vanished;
        self.obsolete += other.obsolete;
        self.untranslated += other.untranslated;
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ContextStats {
    pub name: String,
    pub counts: Counts,
}

#[derive(Debug, Serialize, Clone)]
pub struct Stats {
    pub language: Option<String>,
    pub total: Counts,
    pub contexts: Vec<ContextStats>,
}

impl Stats {
    /// Same wording and counting as the lrelease summary line: only messages
    /// with text are generated, empty ones are ignored as untranslated.
    pub fn summary(&self) -> String {
        let t = &self.total;
        let unfinished = t.unfinished - t.unfinished_empty;
        let ignored = t.untranslated + t.unfinished_empty;
        let mut line = format!(
            "Generated {} translation(s) ({} finished and {} unfinished)",
            t.finished + unfinished,
            t.finished,
            unfinished
        );
        if ignored > 0 {
            line.push_str(&format!("\nIgnored {ignored} untranslated source text(s)"));
        }
        line
    }
}

pub fn summarize(doc: &TsDocument) -> Stats {
    let mut total = Counts::default();
    let contexts: Vec<ContextStats> = doc
        .contexts
        .iter()
        .map(|ctx| {
            let counts = count_context(ctx);
            total.add(&counts);
            ContextStats {
                name: ctx.name.clone(),
                counts,
            }
        })
        .collect();

    Stats {
        language: doc.language.clone(),
        total,
        contexts,
    }
}

fn count_context(ctx: &TsContext) -> Counts {
    let mut c = Counts::default();
    for m in &ctx.messages {
        match &m.translation {
            None => c.untranslated += 1,
            Some(t) => match t.kind {
                TranslationType::Finished if t.text.is_empty() => c.untranslated += 1,
                TranslationType::Finished => c.finished += 1,
                TranslationType::Unfinished => {
                    c.unfinished += 1;
                    if t.text.is_empty() {
                        c.unfinished_empty += 1;
                    }
                }
                TranslationType::Vanished => c.vanished += 1,
                TranslationType::Obsolete => c.obsolete += 1,
            },
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::ts;

    #[test]
    fn counts_each_status() {
        let doc = ts::parse(
            r#"<TS version="2.1" language="de_DE">
<context><name>DownloadProgress</name>
<message><source>Download Progress</source><translation>Downloadfortschritt</translation></message>
<message><source>TextLabel</source><translation></translation></message>
</context>
<context><name>MainWindow</name>
<message><source>Close</source><translation type="vanished">Schließen</translation></message>
<message><source>Coop</source><translation type="unfinished"></translation></message>
<message><source>Server</source><translation type="obsolete"></translation></message>
</context></TS>"#,
        )
        .unwrap();

        let stats = summarize(&doc);
        assert_eq!(
            stats.total,
            Counts {
                finished: 1,
                unfinished: 1,
                unfinished_empty: 1,
                vanished: 1,
                obsolete: 1,
                untranslated: 1,
            }
        );
        assert_eq!(stats.contexts[0].counts.live(), 2);
        assert_eq!(
            stats.summary(),
            "Generated 1 translation(s) (1 finished and 0 unfinished)\nIgnored 2 untranslated source text(s)"
        );
    }

    #[test]
    fn unfinished_text_counts_as_generated() {
        let doc = ts::parse(
            r#"<TS version="2.1" language="de_DE"><context><name>MainWindow</name>
<message><source>Close</source><translation type="unfinished">Schließen</translation></message>
<message><source>Coop</source><translation type="unfinished"></translation></message>
</context></TS>"#,
        )
        .unwrap();
        assert_eq!(
            summarize(&doc).summary(),
            "Generated 1 translation(s) (0 finished and 1 unfinished)\nIgnored 1 untranslated source text(s)"
        );
    }
}
