//! Error taxonomy for the materialization and rendering pipeline.

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, KgvizError>;

#[derive(Debug, Error)]
pub enum KgvizError {
    /// A row value is not a node, relationship or path. Fatal for the whole
    /// materialization.
    #[error("unrecognized result shape ({reason}): {value}")]
    UnrecognizedResultShape { reason: String, value: String },

    /// Opening or using a store session failed.
    #[error("store connection error: {0}")]
    StoreConnection(String),

    /// An attribute cannot be represented in the export payload.
    #[error("cannot serialize attribute `{attribute}` of {element}: {detail}")]
    Serialization {
        element: String,
        attribute: String,
        detail: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KgvizError {
    pub(crate) fn unrecognized(reason: impl Into<String>, value: &serde_json::Value) -> Self {
        let mut rendered = value.to_string();
        if rendered.len() > 200 {
            let cut = (0..=200)
                .rev()
                .find(|i| rendered.is_char_boundary(*i))
                .unwrap_or(0);
            rendered.truncate(cut);
            rendered.push_str("...");
        }
        Self::UnrecognizedResultShape {
            reason: reason.into(),
            value: rendered,
        }
    }
}

impl From<reqwest::Error> for KgvizError {
    fn from(err: reqwest::Error) -> Self {
        Self::StoreConnection(err.to_string())
    }
}
