//! Error types for the model store.

use thiserror::Error;

/// Errors the engine's public API can return.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no {kind} found matching '{name}' (see list_{kind}s to discover valid values)")]
    NotFound { kind: &'static str, name: String },

    #[error("invalid name '{name}' for {context}")]
    NameError { name: String, context: String },

    #[error("object '{object}' has no properties matching the given filters")]
    NoPropertiesError { object: String },

    #[error("record missing required field(s) {fields:?}")]
    KeyError { fields: Vec<String> },

    #[error("expected a unique {kind} but found {count} matches for '{name}'")]
    MultipleElementsError {
        kind: &'static str,
        name: String,
        count: usize,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("usage error: {0}")]
    UsageError(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("xml read error: {0}")]
    XmlRead(#[from] roxmltree::Error),

    #[error("xml write error: {0}")]
    XmlWrite(#[from] quick_xml::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
