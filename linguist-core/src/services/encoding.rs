use std::fs;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Serialize)]
pub struct EncodingCandidate {
    pub name: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct EncodingDetectionResult {
    pub best: String,
    pub confidence: f32,
    pub candidates: Vec<EncodingCandidate>,
}

pub fn detect_from_file(path: &Path) -> CoreResult<EncodingDetectionResult> {
    let bytes = fs::read(path).map_err(|e| CoreError::io(path, e))?;
    Ok(detect(&bytes))
}

pub fn detect(bytes: &[u8]) -> EncodingDetectionResult {
    if bytes.starts_with(UTF8_BOM) {
        return EncodingDetectionResult {
            best: "utf-8-sig".into(),
            confidence: 0.99,
            candidates: vec![
                EncodingCandidate {
                    name: "utf-8-sig".into(),
                    confidence: 0.99,
                },
                EncodingCandidate {
                    name: "utf-8".into(),
                    confidence: 0.90,
                },
            ],
        };
    }

    // TS files declare utf-8; only fall back to guessing for legacy exports.
    if std::str::from_utf8(bytes).is_ok() {
        return EncodingDetectionResult {
            best: "utf-8".into(),
            confidence: 0.95,
            candidates: vec![EncodingCandidate {
                name: "utf-8".into(),
                confidence: 0.95,
            }],
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);

    let encoding = detector.guess(None, true);
    let best = encoding.name().to_lowercase();
    let confidence = estimate_confidence(bytes, encoding);

    let mut candidates = Vec::new();
    candidates.push(EncodingCandidate {
        name: best.clone(),
        confidence,
    });

    // Western catalogues: latin-1 and cp1252 are routinely confused.
    if best == "windows-1252" {
        candidates.push(EncodingCandidate {
            name: "iso-8859-15".into(),
            confidence: (confidence - 0.05).max(0.0),
        });
    }

    EncodingDetectionResult {
        best,
        confidence,
        candidates,
    }
}

/// Decodes raw file bytes to text, stripping a UTF-8 BOM and falling back to
/// detection when the bytes are not valid UTF-8.
pub fn decode_bytes(bytes: &[u8]) -> CoreResult<String> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(body) {
        return Ok(text.to_string());
    }

    let detected = detect(body);
    let encoding = Encoding::for_label(detected.best.as_bytes())
        .ok_or_else(|| CoreError::Encoding(format!("unsupported encoding '{}'", detected.best)))?;

    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        return Err(CoreError::Encoding(format!(
            "could not decode input as {}",
            encoding.name()
        )));
    }

    tracing::warn!(encoding = encoding.name(), "input was not utf-8, decoded with detected encoding");
    Ok(text.into_owned())
}

fn estimate_confidence(bytes: &[u8], encoding: &'static Encoding) -> f32 {
    let (text, _, had_errors) = encoding.decode(bytes);

    if had_errors {
        return 0.35;
    }

    let len = text.len();
    if len < 64 {
        0.55
    } else if len < 512 {
        0.70
    } else if len < 4096 {
        0.82
    } else {
        0.90
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_is_reported_and_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("<TS/>".as_bytes());
        assert_eq!(detect(&bytes).best, "utf-8-sig");
        assert_eq!(decode_bytes(&bytes).unwrap(), "<TS/>");
    }

    #[test]
    fn legacy_bytes_fall_back_to_detection() {
        // "Schließen" in windows-1252
        let bytes = b"<source>Schlie\xdfen</source>";
        let text = decode_bytes(bytes).unwrap();
        assert!(text.starts_with("<source>Schlie"));
        assert!(text.ends_with("en</source>"));
    }

    #[test]
    fn plain_utf8_passes_through() {
        let text = "Datenträgerabbild";
        assert_eq!(detect(text.as_bytes()).best, "utf-8");
        assert_eq!(decode_bytes(text.as_bytes()).unwrap(), text);
    }
}
