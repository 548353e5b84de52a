use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::document::TsDocument;
use crate::model::entry::{TranslationText, TranslationType, TsMessage};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct QaIssue {
    pub context: String,
    pub source: String,
    pub code: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QaOptions {
    /// Also report finished translations identical to their source.
    pub strict: bool,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%L?(\d{1,2}|n)").expect("placeholder regex"))
}

pub fn run(doc: &TsDocument, opts: QaOptions) -> Vec<QaIssue> {
    let mut issues: Vec<QaIssue> = Vec::new();
    let mut seen_contexts: HashSet<&str> = HashSet::new();

    for ctx in &doc.contexts {
        if !seen_contexts.insert(ctx.name.as_str()) {
            issues.push(issue(
                &ctx.name,
                "",
                "DUPLICATE_CONTEXT",
                Severity::Error,
                format!("context '{}' appears more than once", ctx.name),
            ));
        }

        // Historical entries are allowed to shadow live ones.
        let mut live_keys: HashMap<(&str, &str), usize> = HashMap::new();

        for m in &ctx.messages {
            let push = |issues: &mut Vec<QaIssue>, code: &str, severity: Severity, message: String| {
                issues.push(issue(&ctx.name, &m.source, code, severity, message));
            };

            if m.source.is_empty() {
                push(&mut issues, "EMPTY_SOURCE", Severity::Error, "message has an empty source".into());
            }

            if !m.is_historical() {
                let count = live_keys.entry(m.key()).or_insert(0);
                *count += 1;
                if *count == 2 {
                    push(
                        &mut issues,
                        "DUPLICATE_SOURCE",
                        Severity::Error,
                        "source string appears more than once in this context".into(),
                    );
                }
            }

            let Some(t) = &m.translation else {
                push(
                    &mut issues,
                    "MISSING_TRANSLATION",
                    Severity::Warning,
                    "message has no <translation> element".into(),
                );
                continue;
            };

            match (m.numerus, &t.text) {
                (true, TranslationText::Single(_)) => push(
                    &mut issues,
                    "NUMERUS_MISMATCH",
                    Severity::Error,
                    "numerus message carries a single translation".into(),
                ),
                (false, TranslationText::Numerus(_)) => push(
                    &mut issues,
                    "NUMERUS_MISMATCH",
                    Severity::Error,
                    "plural forms on a message without numerus=\"yes\"".into(),
                ),
                _ => {}
            }

            match t.kind {
                TranslationType::Unfinished => {
                    if !t.text.is_empty() {
                        push(
                            &mut issues,
                            "UNFINISHED_HAS_TEXT",
                            Severity::Warning,
                            "unfinished translation already has text".into(),
                        );
                    }
                }
                TranslationType::Finished => {
                    check_finished(m, &t.text, opts, &mut |code, severity, message| {
                        push(&mut issues, code, severity, message)
                    });
                }
                TranslationType::Vanished | TranslationType::Obsolete => {}
            }
        }
    }

    tracing::debug!(issues = issues.len(), "qa pass finished");
    issues
}

fn check_finished(
    m: &TsMessage,
    text: &TranslationText,
    opts: QaOptions,
    report: &mut dyn FnMut(&str, Severity, String),
) {
    if text.is_empty() {
        if !m.numerus {
            report(
                "FINISHED_BUT_EMPTY",
                Severity::Warning,
                "translation is marked finished but is empty".into(),
            );
        }
        return;
    }

    let expected = placeholders(&m.source);
    for form in text.forms() {
        let found = placeholders(form);
        // %n is optional in singular plural forms.
        let matches = if m.numerus {
            expected.iter().filter(|p| *p != "%n").all(|p| found.contains(p.as_str()))
                && found.iter().filter(|p| *p != "%n").all(|p| expected.contains(p.as_str()))
        } else {
            found == expected
        };
        if !matches {
            report(
                "PLACEHOLDER_MISMATCH",
                Severity::Error,
                format!(
                    "placeholders differ: source has {:?}, translation has {:?}",
                    expected, found
                ),
            );
            break;
        }
    }

    let primary = text.primary();
    if has_accelerator(&m.source) != has_accelerator(primary) {
        report(
            "ACCELERATOR_MISMATCH",
            Severity::Warning,
            "keyboard accelerator (&) present in only one of source and translation".into(),
        );
    }

    if opts.strict && primary.trim() == m.source.trim() {
        report(
            "SAME_AS_SOURCE",
            Severity::Warning,
            "translation is identical to the source".into(),
        );
    }
}

pub fn placeholders(text: &str) -> BTreeSet<String> {
    placeholder_re()
        .find_iter(text)
        .map(|m| m.as_str().replacen("%L", "%", 1))
        .collect()
}

/// `&x` marks a mnemonic; `&&` is a literal ampersand.
pub fn has_accelerator(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '&' {
            continue;
        }
        match chars.peek() {
            Some('&') => {
                chars.next();
            }
            Some(next) if !next.is_whitespace() => return true,
            _ => {}
        }
    }
    false
}

fn issue(context: &str, source: &str, code: &str, severity: Severity, message: String) -> QaIssue {
    QaIssue {
        context: context.to_string(),
        source: source.to_string(),
        code: code.to_string(),
        severity,
        message,
    }
}
