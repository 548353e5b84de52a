use serde::{Deserialize, Serialize};

/// One `<message>` of a TS file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct TsMessage {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub numerus: bool,

    #[serde(default)]
    pub locations: Vec<Location>,

    pub source: String,

    #[serde(default)]
    pub old_source: Option<String>,

    #[serde(default)]
    pub comment: Option<String>,

    #[serde(default)]
    pub old_comment: Option<String>,

    #[serde(default)]
    pub extra_comment: Option<String>,

    #[serde(default)]
    pub translator_comment: Option<String>,

    #[serde(default)]
    pub translation: Option<Translation>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Translation {
    #[serde(default)]
    pub kind: TranslationType,

    #[serde(default)]
    pub text: TranslationText,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TranslationType {
    Finished,
    Unfinished,
    Vanished,
    Obsolete,
}

impl Default for TranslationType {
    fn default() -> Self {
        TranslationType::Finished
    }
}

impl TranslationType {
    /// Value of the `type` attribute; `None` for finished translations.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            TranslationType::Finished => None,
            TranslationType::Unfinished => Some("unfinished"),
            TranslationType::Vanished => Some("vanished"),
            TranslationType::Obsolete => Some("obsolete"),
        }
    }

    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "unfinished" => Some(TranslationType::Unfinished),
            "vanished" => Some(TranslationType::Vanished),
            "obsolete" => Some(TranslationType::Obsolete),
            _ => None,
        }
    }

    /// Vanished and obsolete entries only exist for translator history.
    pub fn is_historical(self) -> bool {
        matches!(self, TranslationType::Vanished | TranslationType::Obsolete)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "form", content = "value")]
pub enum TranslationText {
    Single(String),
    Numerus(Vec<String>),
}

impl Default for TranslationText {
    fn default() -> Self {
        TranslationText::Single(String::new())
    }
}

impl TranslationText {
    pub fn is_empty(&self) -> bool {
        match self {
            TranslationText::Single(s) => s.is_empty(),
            TranslationText::Numerus(forms) => forms.iter().all(|f| f.is_empty()),
        }
    }

    /// The single text, or the first plural form.
    pub fn primary(&self) -> &str {
        match self {
            TranslationText::Single(s) => s,
            TranslationText::Numerus(forms) => forms.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn forms(&self) -> Vec<&str> {
        match self {
            TranslationText::Single(s) => vec![s.as_str()],
            TranslationText::Numerus(forms) => forms.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Location {
    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub line: Option<LineRef>,
}

impl Location {
    pub fn new(filename: impl Into<String>, line: u32) -> Self {
        Location {
            filename: Some(filename.into()),
            line: Some(LineRef::Absolute(line)),
        }
    }
}

/// `line="17"` is absolute, `line="+3"` / `line="-2"` is relative to the
/// previous location (lupdate `-locations relative`).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineRef {
    Absolute(u32),
    Relative(i32),
}

impl LineRef {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with('+') || value.starts_with('-') {
            value.parse::<i32>().ok().map(LineRef::Relative)
        } else {
            value.parse::<u32>().ok().map(LineRef::Absolute)
        }
    }

    pub fn to_attr(self) -> String {
        match self {
            LineRef::Absolute(n) => n.to_string(),
            LineRef::Relative(n) if n >= 0 => format!("+{n}"),
            LineRef::Relative(n) => n.to_string(),
        }
    }
}

impl TsMessage {
    pub fn new(source: impl Into<String>) -> Self {
        TsMessage {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> Option<TranslationType> {
        self.translation.as_ref().map(|t| t.kind)
    }

    pub fn is_historical(&self) -> bool {
        self.kind().is_some_and(TranslationType::is_historical)
    }

    /// Finished text usable at runtime.
    pub fn finished_text(&self) -> Option<&str> {
        let t = self.translation.as_ref()?;
        if t.kind != TranslationType::Finished || t.text.is_empty() {
            return None;
        }
        Some(t.text.primary())
    }

    pub fn key(&self) -> (&str, &str) {
        (self.source.as_str(), self.comment.as_deref().unwrap_or(""))
    }
}
