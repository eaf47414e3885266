//! Domain error types.

use thiserror::Error;

/// Errors raised while decoding or encoding a translation catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed CSV at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("Missing CSV column: {0}")]
    MissingColumn(&'static str),

    #[error("Malformed JSON catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed PO catalog at line {line}: {message}")]
    Po { line: usize, message: String },

    #[error("Catalog is not valid UTF-8")]
    Encoding,

    #[error("Catalog too large for MO encoding")]
    TooLarge,
}
