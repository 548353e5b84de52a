use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed xml at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("{}", structure_message(.context, .message))]
    Structure {
        context: Option<String>,
        message: String,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("translation memory: {0}")]
    TranslationMemory(String),
}

fn structure_message(context: &Option<String>, message: &str) -> String {
    match context {
        Some(name) => format!("invalid TS structure in context '{name}': {message}"),
        None => format!("invalid TS structure: {message}"),
    }
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn structure(context: Option<&str>, message: impl Into<String>) -> Self {
        CoreError::Structure {
            context: context.map(str::to_string),
            message: message.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
