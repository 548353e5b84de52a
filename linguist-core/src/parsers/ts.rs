use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::error::{CoreError, CoreResult};
use crate::model::document::{TsContext, TsDocument};
use crate::model::entry::{LineRef, Location, Translation, TranslationText, TranslationType, TsMessage};
use crate::services::encoding;

pub fn read_file(path: &Path) -> CoreResult<TsDocument> {
    let bytes = fs::read(path).map_err(|e| CoreError::io(path, e))?;
    let text = encoding::decode_bytes(&bytes)?;
    let doc = parse(&text)?;
    tracing::debug!(
        path = %path.display(),
        contexts = doc.contexts.len(),
        messages = doc.message_count(),
        "loaded TS file"
    );
    Ok(doc)
}

pub fn parse(text: &str) -> CoreResult<TsDocument> {
    TsReader::new(text).document()
}

struct TsReader<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> TsReader<'a> {
    fn new(text: &'a str) -> Self {
        let mut reader = Reader::from_str(text);
        // Whitespace inside <source>/<translation> is significant.
        reader.config_mut().trim_text(false);
        TsReader { reader }
    }

    fn xml_err(&self, err: impl std::fmt::Display) -> CoreError {
        CoreError::Xml {
            position: self.reader.buffer_position() as u64,
            message: err.to_string(),
        }
    }

    fn next(&mut self) -> CoreResult<Event<'a>> {
        self.reader.read_event().map_err(|e| self.xml_err(e))
    }

    fn attr(&self, e: &BytesStart, key: &[u8]) -> CoreResult<Option<String>> {
        for a in e.attributes() {
            let a = a.map_err(|err| self.xml_err(err))?;
            if a.key.as_ref() == key {
                let v = a.unescape_value().map_err(|err| self.xml_err(err))?;
                return Ok(Some(v.into_owned()));
            }
        }
        Ok(None)
    }

    fn skip(&mut self, e: &BytesStart) -> CoreResult<()> {
        let name = e.name().as_ref().to_vec();
        tracing::debug!(element = %String::from_utf8_lossy(&name), "skipping element");
        self.reader
            .read_to_end(QName(&name))
            .map_err(|err| self.xml_err(err))?;
        Ok(())
    }

    fn unexpected_eof(&self) -> CoreError {
        self.xml_err("unexpected end of document")
    }

    fn document(mut self) -> CoreResult<TsDocument> {
        let doc = loop {
            match self.next()? {
                Event::Start(e) if e.name().as_ref() == b"TS" => {
                    let doc = self.root_attrs(&e)?;
                    break self.contexts(doc)?;
                }
                Event::Empty(e) if e.name().as_ref() == b"TS" => break self.root_attrs(&e)?,
                Event::Start(e) | Event::Empty(e) => {
                    return Err(CoreError::structure(
                        None,
                        format!(
                            "root element must be <TS>, found <{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        ),
                    ));
                }
                Event::Eof => return Err(CoreError::structure(None, "missing <TS> root element")),
                _ => {}
            }
        };

        // Trailing comments/whitespace only.
        loop {
            match self.next()? {
                Event::Eof => break,
                Event::Start(e) | Event::Empty(e) => {
                    return Err(CoreError::structure(
                        None,
                        format!(
                            "unexpected <{}> after </TS>",
                            String::from_utf8_lossy(e.name().as_ref())
                        ),
                    ));
                }
                _ => {}
            }
        }

        Ok(doc)
    }

    fn root_attrs(&self, e: &BytesStart) -> CoreResult<TsDocument> {
        let mut doc = TsDocument::default();
        if let Some(v) = self.attr(e, b"version")? {
            doc.version = v;
        }
        doc.language = self.attr(e, b"language")?;
        doc.source_language = self.attr(e, b"sourcelanguage")?;
        Ok(doc)
    }

    fn contexts(&mut self, mut doc: TsDocument) -> CoreResult<TsDocument> {
        loop {
            match self.next()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"context" => doc.contexts.push(self.context()?),
                    b"message" => {
                        return Err(CoreError::structure(None, "<message> outside of <context>"))
                    }
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) if e.name().as_ref() == b"context" => {
                    return Err(CoreError::structure(None, "<context> without <name>"));
                }
                Event::End(e) if e.name().as_ref() == b"TS" => return Ok(doc),
                Event::Eof => return Err(self.unexpected_eof()),
                _ => {}
            }
        }
    }

    fn context(&mut self) -> CoreResult<TsContext> {
        let mut name: Option<String> = None;
        let mut ctx = TsContext::default();

        loop {
            match self.next()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"name" => name = Some(self.text(b"name")?),
                    b"comment" => ctx.comment = Some(self.text(b"comment")?),
                    b"message" => {
                        let message = self.message(&e, name.as_deref())?;
                        ctx.messages.push(message);
                    }
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"name" => name = Some(String::new()),
                    b"comment" => ctx.comment = Some(String::new()),
                    b"message" => {
                        return Err(CoreError::structure(
                            name.as_deref(),
                            "message without <source>",
                        ))
                    }
                    _ => {}
                },
                Event::End(e) if e.name().as_ref() == b"context" => break,
                Event::Eof => return Err(self.unexpected_eof()),
                _ => {}
            }
        }

        ctx.name = name.ok_or_else(|| CoreError::structure(None, "<context> without <name>"))?;
        Ok(ctx)
    }

    fn message(&mut self, start: &BytesStart, ctx_name: Option<&str>) -> CoreResult<TsMessage> {
        let mut m = TsMessage {
            id: self.attr(start, b"id")?,
            numerus: self.attr(start, b"numerus")?.as_deref() == Some("yes"),
            ..Default::default()
        };
        let mut source: Option<String> = None;

        loop {
            match self.next()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"location" => {
                        m.locations.push(self.location(&e, ctx_name)?);
                        self.skip(&e)?;
                    }
                    b"source" => {
                        if source.is_some() {
                            return Err(CoreError::structure(ctx_name, "message with two <source> elements"));
                        }
                        source = Some(self.text(b"source")?);
                    }
                    b"oldsource" => m.old_source = Some(self.text(b"oldsource")?),
                    b"comment" => m.comment = Some(self.text(b"comment")?),
                    b"oldcomment" => m.old_comment = Some(self.text(b"oldcomment")?),
                    b"extracomment" => m.extra_comment = Some(self.text(b"extracomment")?),
                    b"translatorcomment" => {
                        m.translator_comment = Some(self.text(b"translatorcomment")?)
                    }
                    b"translation" => {
                        if m.translation.is_some() {
                            return Err(CoreError::structure(
                                ctx_name,
                                "message with two <translation> elements",
                            ));
                        }
                        let kind = self.translation_type(&e, ctx_name)?;
                        let text = self.translation_text(m.numerus)?;
                        m.translation = Some(Translation { kind, text });
                    }
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"location" => m.locations.push(self.location(&e, ctx_name)?),
                    b"source" => {
                        if source.is_some() {
                            return Err(CoreError::structure(ctx_name, "message with two <source> elements"));
                        }
                        source = Some(String::new());
                    }
                    b"oldsource" => m.old_source = Some(String::new()),
                    b"comment" => m.comment = Some(String::new()),
                    b"oldcomment" => m.old_comment = Some(String::new()),
                    b"extracomment" => m.extra_comment = Some(String::new()),
                    b"translatorcomment" => m.translator_comment = Some(String::new()),
                    b"translation" => {
                        if m.translation.is_some() {
                            return Err(CoreError::structure(
                                ctx_name,
                                "message with two <translation> elements",
                            ));
                        }
                        let kind = self.translation_type(&e, ctx_name)?;
                        let text = if m.numerus {
                            TranslationText::Numerus(Vec::new())
                        } else {
                            TranslationText::Single(String::new())
                        };
                        m.translation = Some(Translation { kind, text });
                    }
                    other => {
                        tracing::debug!(element = %String::from_utf8_lossy(other), "ignoring empty element");
                    }
                },
                Event::End(e) if e.name().as_ref() == b"message" => break,
                Event::Eof => return Err(self.unexpected_eof()),
                _ => {}
            }
        }

        m.source = source.ok_or_else(|| CoreError::structure(ctx_name, "message without <source>"))?;
        Ok(m)
    }

    fn location(&self, e: &BytesStart, ctx_name: Option<&str>) -> CoreResult<Location> {
        let line = match self.attr(e, b"line")? {
            Some(raw) => Some(LineRef::parse(&raw).ok_or_else(|| {
                CoreError::structure(ctx_name, format!("invalid location line '{raw}'"))
            })?),
            None => None,
        };
        Ok(Location {
            filename: self.attr(e, b"filename")?,
            line,
        })
    }

    fn translation_type(&self, e: &BytesStart, ctx_name: Option<&str>) -> CoreResult<TranslationType> {
        match self.attr(e, b"type")? {
            None => Ok(TranslationType::Finished),
            Some(v) => TranslationType::from_attr(&v).ok_or_else(|| {
                CoreError::structure(ctx_name, format!("unknown translation type '{v}'"))
            }),
        }
    }

    fn translation_text(&mut self, numerus: bool) -> CoreResult<TranslationText> {
        let mut text = String::new();
        let mut forms: Vec<String> = Vec::new();

        loop {
            match self.next()? {
                Event::Text(e) => {
                    let t = e.unescape().map_err(|err| self.xml_err(err))?;
                    text.push_str(&t);
                }
                Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e.into_inner())),
                Event::Start(e) if e.name().as_ref() == b"numerusform" => {
                    forms.push(self.text(b"numerusform")?);
                }
                Event::Empty(e) if e.name().as_ref() == b"numerusform" => forms.push(String::new()),
                Event::Empty(e) if e.name().as_ref() == b"byte" => {
                    if let Some(ch) = self.byte_value(&e)? {
                        text.push(ch);
                    }
                }
                Event::Start(e) => self.skip(&e)?,
                Event::End(e) if e.name().as_ref() == b"translation" => break,
                Event::Eof => return Err(self.unexpected_eof()),
                _ => {}
            }
        }

        if numerus || !forms.is_empty() {
            Ok(TranslationText::Numerus(forms))
        } else {
            Ok(TranslationText::Single(text))
        }
    }

    /// Collects character data up to the matching end tag.
    fn text(&mut self, end: &[u8]) -> CoreResult<String> {
        let mut out = String::new();
        loop {
            match self.next()? {
                Event::Text(e) => {
                    let t = e.unescape().map_err(|err| self.xml_err(err))?;
                    out.push_str(&t);
                }
                Event::CData(e) => out.push_str(&String::from_utf8_lossy(&e.into_inner())),
                Event::Empty(e) if e.name().as_ref() == b"byte" => {
                    if let Some(ch) = self.byte_value(&e)? {
                        out.push(ch);
                    }
                }
                Event::Start(e) => self.skip(&e)?,
                Event::End(e) if e.name().as_ref() == end => return Ok(out),
                Event::Eof => return Err(self.unexpected_eof()),
                _ => {}
            }
        }
    }

    /// `<byte value="x1b"/>` encodes characters XML 1.0 cannot carry.
    fn byte_value(&self, e: &BytesStart) -> CoreResult<Option<char>> {
        let Some(raw) = self.attr(e, b"value")? else {
            return Ok(None);
        };
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        Ok(code.and_then(char::from_u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="de_DE">
<context>
    <name>MainWindow</name>
    <message>
        <location filename="mainwindow.ui" line="14"/>
        <source>CroftEngine</source>
        <translation>CroftEngine</translation>
    </message>
    <message>
        <source>Close</source>
        <translation type="vanished">Schließen</translation>
    </message>
    <message>
        <location filename="mainwindow.ui" line="166"/>
        <source>Choose Your Ghost Color</source>
        <oldsource>Choose Color</oldsource>
        <translation type="unfinished"></translation>
    </message>
    <message>
        <location filename="mainwindow.ui" line="214"/>
        <source>E&amp;xit</source>
        <translation>Beenden</translation>
    </message>
</context>
</TS>
"#;

    #[test]
    fn parses_root_attributes_and_messages() {
        let doc = parse(SAMPLE).expect("sample parses");
        assert_eq!(doc.version, "2.1");
        assert_eq!(doc.language.as_deref(), Some("de_DE"));
        assert_eq!(doc.contexts.len(), 1);

        let ctx = &doc.contexts[0];
        assert_eq!(ctx.name, "MainWindow");
        assert_eq!(ctx.messages.len(), 4);

        let first = &ctx.messages[0];
        assert_eq!(first.locations, vec![Location::new("mainwindow.ui", 14)]);
        assert_eq!(first.finished_text(), Some("CroftEngine"));

        let close = &ctx.messages[1];
        assert!(close.locations.is_empty());
        assert_eq!(close.kind(), Some(TranslationType::Vanished));

        let ghost = &ctx.messages[2];
        assert_eq!(ghost.old_source.as_deref(), Some("Choose Color"));
        assert_eq!(ghost.kind(), Some(TranslationType::Unfinished));

        assert_eq!(ctx.messages[3].source, "E&xit");
    }

    #[test]
    fn decodes_apostrophe_entity() {
        let text = r#"<TS version="2.1"><context><name>C</name><message>
<source>Don&apos;t overwrite</source><translation>Nicht überschreiben</translation>
</message></context></TS>"#;
        let doc = parse(text).unwrap();
        assert_eq!(doc.contexts[0].messages[0].source, "Don't overwrite");
    }

    #[test]
    fn numerus_forms_are_collected() {
        let text = r#"<TS version="2.1"><context><name>C</name>
<message numerus="yes"><source>%n file(s)</source><translation>
    <numerusform>%n Datei</numerusform>
    <numerusform>%n Dateien</numerusform>
</translation></message></context></TS>"#;
        let doc = parse(text).unwrap();
        let m = &doc.contexts[0].messages[0];
        assert!(m.numerus);
        assert_eq!(
            m.translation.as_ref().unwrap().text,
            TranslationText::Numerus(vec!["%n Datei".into(), "%n Dateien".into()])
        );
    }

    #[test]
    fn relative_locations_parse() {
        let text = r#"<TS version="2.1"><context><name>C</name><message>
<location filename="a.cpp" line="+10"/><location line="+2"/>
<source>x</source></message></context></TS>"#;
        let doc = parse(text).unwrap();
        let m = &doc.contexts[0].messages[0];
        assert_eq!(m.locations[1].filename, None);
        assert_eq!(m.locations[1].line, Some(LineRef::Relative(2)));
        assert!(m.translation.is_none());
    }

    #[test]
    fn rejects_message_without_source() {
        let text = r#"<TS version="2.1"><context><name>C</name><message>
<translation>x</translation></message></context></TS>"#;
        assert_matches!(
            parse(text),
            Err(CoreError::Structure { context: Some(ref c), .. }) if c == "C"
        );
    }

    #[test]
    fn rejects_two_sources() {
        let text = r#"<TS version="2.1"><context><name>C</name><message>
<source>a</source><source>b</source></message></context></TS>"#;
        assert_matches!(parse(text), Err(CoreError::Structure { .. }));
    }

    #[test]
    fn rejects_two_translations() {
        let text = r#"<TS version="2.1"><context><name>C</name><message>
<source>a</source><translation>x</translation><translation>y</translation>
</message></context></TS>"#;
        assert_matches!(parse(text), Err(CoreError::Structure { .. }));
    }

    #[test]
    fn rejects_unknown_translation_type() {
        let text = r#"<TS version="2.1"><context><name>C</name><message>
<source>a</source><translation type="approved">x</translation>
</message></context></TS>"#;
        assert_matches!(parse(text), Err(CoreError::Structure { .. }));
    }

    #[test]
    fn rejects_wrong_root_and_malformed_xml() {
        assert_matches!(parse("<xliff/>"), Err(CoreError::Structure { .. }));
        assert_matches!(
            parse("<TS version=\"2.1\"><context><name>C</name></TS>"),
            Err(CoreError::Xml { .. })
        );
    }

    #[test]
    fn unknown_message_children_are_skipped() {
        let text = r#"<TS version="2.1"><context><name>C</name><message>
<source>a</source><extra-po-flags>c-format</extra-po-flags><translation>b</translation>
</message></context></TS>"#;
        let doc = parse(text).unwrap();
        assert_eq!(doc.translate("C", "a"), Some("b"));
    }
}
