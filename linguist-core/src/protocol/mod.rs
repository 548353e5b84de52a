use std::path::PathBuf;

use serde_json::{json, Value};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::document::TsDocument;
use crate::parsers;
use crate::services::merge::{self, ExtractedMessage, UpdateOptions};
use crate::services::qa::{self, QaOptions, Severity};
use crate::services::translation_memory::store;
use crate::services::{encoding, pipeline, rebuild, stats};

mod command;
pub use command::Command;

fn get_cmd(req: &Value) -> &str {
    req.get("cmd").and_then(|v| v.as_str()).unwrap_or("")
}

fn get_id(req: &Value) -> Value {
    req.get("id").cloned().unwrap_or(Value::Null)
}

fn get_payload(req: &Value) -> &Value {
    static EMPTY: Value = Value::Null;
    req.get("payload").unwrap_or(&EMPTY)
}

fn ok(id: Value, payload: Value) -> String {
    json!({
        "id": id,
        "status": "ok",
        "payload": payload
    })
    .to_string()
}

fn err(id: Value, message: impl Into<String>) -> String {
    json!({
        "id": id,
        "status": "error",
        "message": message.into()
    })
    .to_string()
}

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

fn required<'a>(payload: &'a Value, key: &str) -> CoreResult<&'a str> {
    str_field(payload, key).ok_or_else(|| CoreError::InvalidRequest(format!("payload.{key} is required")))
}

/// A document can be sent as JSON (`document`), as TS text (`text`) or by
/// file (`path`), in that order of preference.
fn document_from_payload(payload: &Value) -> CoreResult<TsDocument> {
    if let Some(doc) = payload.get("document").filter(|v| !v.is_null()) {
        let doc: TsDocument = serde_json::from_value(doc.clone())?;
        doc.check_text_forms()?;
        return Ok(doc);
    }
    if let Some(text) = str_field(payload, "text") {
        return parsers::ts::parse(text);
    }
    if let Some(path) = str_field(payload, "path") {
        return parsers::ts::read_file(&PathBuf::from(path));
    }
    Err(CoreError::InvalidRequest(
        "payload.document, payload.text or payload.path is required".into(),
    ))
}

pub fn handle(input: &str, config: &CoreConfig) -> String {
    let req: Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(_) => {
            return json!({
                "status": "error",
                "message": "invalid json"
            })
            .to_string();
        }
    };

    let id = get_id(&req);
    let cmd_str = get_cmd(&req);
    let payload = get_payload(&req);

    let cmd = Command::from(cmd_str);
    tracing::debug!(cmd = cmd_str, "handling request");

    match dispatch(cmd, payload, config) {
        Ok(body) => ok(id, body),
        Err(e) => {
            tracing::warn!(cmd = cmd_str, error = %e, "request failed");
            err(id, e.to_string())
        }
    }
}

fn dispatch(cmd: Command, payload: &Value, config: &CoreConfig) -> CoreResult<Value> {
    match cmd {
        Command::Ping => Ok(json!({ "message": "linguist-core alive" })),

        Command::TsParse => {
            let doc = document_from_payload(payload)?;
            let summary = stats::summarize(&doc).summary();
            Ok(json!({ "document": doc, "summary": summary }))
        }

        Command::TsRebuild => {
            let doc = document_from_payload(payload)?;
            Ok(json!({ "text": rebuild::rebuild(&doc) }))
        }

        Command::TsWrite => {
            let target = PathBuf::from(required(payload, "output")?);
            let doc = document_from_payload(payload)?;
            rebuild::write_file(&target, &doc)?;
            Ok(json!({
                "path": target.to_string_lossy(),
                "messages": doc.message_count()
            }))
        }

        Command::TsValidate => {
            let doc = document_from_payload(payload)?;
            let strict = payload
                .get("strict")
                .and_then(|v| v.as_bool())
                .unwrap_or(config.qa_strict);
            let issues = qa::run(&doc, QaOptions { strict });
            let valid = issues.iter().all(|i| i.severity != Severity::Error);
            Ok(json!({ "valid": valid, "issues": issues }))
        }

        Command::TsStats => {
            let doc = document_from_payload(payload)?;
            let s = stats::summarize(&doc);
            let summary = s.summary();
            Ok(json!({ "stats": s, "summary": summary }))
        }

        Command::TsTranslate => {
            let doc = document_from_payload(payload)?;
            let context = required(payload, "context")?;
            let source = required(payload, "source")?;
            Ok(json!({ "translation": doc.translate(context, source) }))
        }

        Command::TsUpdate => {
            let mut doc = document_from_payload(payload)?;
            let messages: Vec<ExtractedMessage> = match payload.get("messages") {
                Some(v) => serde_json::from_value(v.clone())?,
                None => return Err(CoreError::InvalidRequest("payload.messages must be an array".into())),
            };
            let opts = UpdateOptions {
                drop_obsolete: payload
                    .get("drop_obsolete")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            };
            let report = merge::update(&mut doc, &messages, opts);
            Ok(json!({ "document": doc, "report": report }))
        }

        Command::TsPretranslate => {
            let mut doc = document_from_payload(payload)?;
            let tm = store::load(&config.tm_path)?;
            let target_lang = str_field(payload, "target_lang")
                .unwrap_or_else(|| config.target_lang_for(doc.language.as_deref()))
                .to_string();
            let source_lang = str_field(payload, "source_lang").unwrap_or(&config.source_lang);
            let report = pipeline::pretranslate(
                &mut doc,
                &tm,
                pipeline::PipelineConfig {
                    source_lang,
                    target_lang: &target_lang,
                },
            );
            Ok(json!({ "document": doc, "report": report }))
        }

        Command::TmHarvest => {
            let doc = document_from_payload(payload)?;
            let source_lang = str_field(payload, "source_lang").unwrap_or(&config.source_lang);
            let target_lang = str_field(payload, "target_lang")
                .unwrap_or_else(|| config.target_lang_for(doc.language.as_deref()));
            let total = store::merge_into(&config.tm_path, &doc, source_lang, target_lang)?;
            Ok(json!({ "entries": total }))
        }

        Command::DetectEncoding => {
            let path = PathBuf::from(required(payload, "path")?);
            let result = encoding::detect_from_file(&path)?;
            Ok(serde_json::to_value(result)?)
        }

        Command::Unknown => Err(CoreError::InvalidRequest("unknown command".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(req: Value) -> Value {
        let out = handle(&req.to_string(), &CoreConfig::default());
        serde_json::from_str(&out).unwrap()
    }

    #[test]
    fn ping_and_unknown() {
        let resp = call(json!({ "id": 1, "cmd": "ping" }));
        assert_eq!(resp["status"], "ok");
        assert_eq!(resp["id"], 1);

        let resp = call(json!({ "id": 2, "cmd": "nope" }));
        assert_eq!(resp["status"], "error");
        assert_eq!(resp["message"], "unknown command");
    }

    #[test]
    fn invalid_json_is_reported() {
        let out = handle("{not json", &CoreConfig::default());
        let resp: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(resp["message"], "invalid json");
    }

    #[test]
    fn parse_then_translate_by_text() {
        let text = r#"<TS version="2.1" language="de_DE"><context><name>MainWindow</name>
<message><source>Launch</source><translation>Starten</translation></message>
</context></TS>"#;

        let resp = call(json!({ "id": 3, "cmd": "ts.parse", "payload": { "text": text } }));
        assert_eq!(resp["status"], "ok");
        let doc = resp["payload"]["document"].clone();
        assert_eq!(doc["contexts"][0]["name"], "MainWindow");

        let resp = call(json!({
            "id": 4,
            "cmd": "ts.translate",
            "payload": { "document": doc, "context": "MainWindow", "source": "Launch" }
        }));
        assert_eq!(resp["payload"]["translation"], "Starten");
    }

    #[test]
    fn validate_reports_structure_errors_as_error_status() {
        let resp = call(json!({
            "id": 5,
            "cmd": "ts.validate",
            "payload": { "text": "<TS version=\"2.1\"><context><name>C</name><message><translation/></message></context></TS>" }
        }));
        assert_eq!(resp["status"], "error");
        assert!(resp["message"].as_str().unwrap().contains("without <source>"));
    }

    #[test]
    fn missing_document_is_invalid_request() {
        let resp = call(json!({ "id": 6, "cmd": "ts.stats", "payload": {} }));
        assert_eq!(resp["status"], "error");
    }

    #[test]
    fn document_with_mismatched_forms_is_rejected() {
        let doc = json!({
            "contexts": [{
                "name": "C",
                "messages": [{
                    "source": "Copy",
                    "translation": { "kind": "unfinished", "text": { "form": "numerus", "value": [] } }
                }]
            }]
        });
        let resp = call(json!({ "id": 7, "cmd": "ts.rebuild", "payload": { "document": doc } }));
        assert_eq!(resp["status"], "error");
        assert!(resp["message"].as_str().unwrap().contains("numerus flag"));
    }
}
