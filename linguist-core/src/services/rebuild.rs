use std::fmt::Write as _;
use std::path::Path;

use quick_xml::escape::escape;

use crate::error::CoreResult;
use crate::model::document::{TsContext, TsDocument};
use crate::model::entry::{Location, Translation, TranslationText, TsMessage};
use crate::services::storage;

const INDENT: &str = "    ";

/// Serializes a document in the layout lupdate writes, so that files coming
/// out of Qt tooling survive a parse/rebuild cycle unchanged.
pub fn rebuild(doc: &TsDocument) -> String {
    let mut out = String::with_capacity(doc.message_count() * 160 + 128);

    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<!DOCTYPE TS>\n");

    out.push_str("<TS");
    push_attr(&mut out, "version", &doc.version);
    if let Some(lang) = &doc.language {
        push_attr(&mut out, "language", lang);
    }
    if let Some(lang) = &doc.source_language {
        push_attr(&mut out, "sourcelanguage", lang);
    }
    out.push_str(">\n");

    for ctx in &doc.contexts {
        write_context(&mut out, ctx);
    }

    out.push_str("</TS>\n");
    out
}

pub fn write_file(path: &Path, doc: &TsDocument) -> CoreResult<()> {
    let text = rebuild(doc);
    storage::write_atomic(path, text.as_bytes())?;
    tracing::info!(
        path = %path.display(),
        contexts = doc.contexts.len(),
        messages = doc.message_count(),
        "wrote TS file"
    );
    Ok(())
}

fn write_context(out: &mut String, ctx: &TsContext) {
    out.push_str("<context>\n");
    push_element(out, 1, "name", &ctx.name);
    if let Some(comment) = &ctx.comment {
        push_element(out, 1, "comment", comment);
    }
    for m in &ctx.messages {
        write_message(out, m);
    }
    out.push_str("</context>\n");
}

fn write_message(out: &mut String, m: &TsMessage) {
    out.push_str(INDENT);
    out.push_str("<message");
    if let Some(id) = &m.id {
        push_attr(out, "id", id);
    }
    if m.numerus {
        push_attr(out, "numerus", "yes");
    }
    out.push_str(">\n");

    for loc in &m.locations {
        write_location(out, loc);
    }

    push_element(out, 2, "source", &m.source);

    let optional = [
        ("oldsource", &m.old_source),
        ("comment", &m.comment),
        ("oldcomment", &m.old_comment),
        ("extracomment", &m.extra_comment),
        ("translatorcomment", &m.translator_comment),
    ];
    for (tag, value) in optional {
        if let Some(v) = value {
            push_element(out, 2, tag, v);
        }
    }

    if let Some(t) = &m.translation {
        write_translation(out, t);
    }

    out.push_str(INDENT);
    out.push_str("</message>\n");
}

fn write_location(out: &mut String, loc: &Location) {
    indent(out, 2);
    out.push_str("<location");
    if let Some(f) = &loc.filename {
        push_attr(out, "filename", f);
    }
    if let Some(line) = loc.line {
        push_attr(out, "line", &line.to_attr());
    }
    out.push_str("/>\n");
}

fn write_translation(out: &mut String, t: &Translation) {
    indent(out, 2);
    out.push_str("<translation");
    if let Some(kind) = t.kind.as_attr() {
        push_attr(out, "type", kind);
    }
    out.push('>');

    match &t.text {
        TranslationText::Single(text) => out.push_str(&protect(text)),
        TranslationText::Numerus(forms) if forms.is_empty() => {}
        TranslationText::Numerus(forms) => {
            out.push('\n');
            for form in forms {
                push_element(out, 3, "numerusform", form);
            }
            indent(out, 2);
        }
    }

    out.push_str("</translation>\n");
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

fn push_element(out: &mut String, level: usize, tag: &str, text: &str) {
    indent(out, level);
    let _ = writeln!(out, "<{tag}>{}</{tag}>", protect(text));
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {name}=\"{}\"", escape(value));
}

/// Escapes markup characters the way Qt's TS writer does. Control characters
/// XML cannot carry (and `\r`, which XML readers fold into `\n`) become
/// `<byte value="xNN"/>`; non-ASCII whitespace becomes a character reference.
fn protect(text: &str) -> String {
    if !text.chars().any(needs_reference) {
        return escape(text).into_owned();
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut run = String::new();
    for ch in text.chars() {
        if !needs_reference(ch) {
            run.push(ch);
            continue;
        }
        out.push_str(&escape(run.as_str()));
        run.clear();
        if is_unencodable(ch) {
            let _ = write!(out, "<byte value=\"x{:x}\"/>", ch as u32);
        } else {
            let _ = write!(out, "&#x{:x};", ch as u32);
        }
    }
    out.push_str(&escape(run.as_str()));
    out
}

fn needs_reference(ch: char) -> bool {
    is_unencodable(ch) || (ch > '\u{7f}' && ch.is_whitespace())
}

fn is_unencodable(ch: char) -> bool {
    (ch as u32) < 0x20 && !matches!(ch, '\t' | '\n')
}
