//! Poster error types

use std::path::PathBuf;
use thiserror::Error;

use shared::{Language, SharedError};

/// Result type for poster operations
pub type PosterResult<T> = Result<T, PosterError>;

/// Poster error types
#[derive(Error, Debug)]
pub enum PosterError {
    #[error("Malformed image identifier '{identifier}': {reason}")]
    MalformedIdentifier { identifier: String, reason: String },

    #[error("Unknown genus code: {code}")]
    UnknownGenus { code: String },

    #[error("Genus table {path} line {line}: {reason}")]
    GenusTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Ledger operation failed: {operation} on {path}")]
    Ledger {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ledger entry: {entry:?}")]
    InvalidLedgerEntry { entry: String },

    #[error("Image library error: {operation} on {path}")]
    Library {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Taxon lookup failed for '{query}': {message}")]
    Enrichment { query: String, message: String },

    #[error("Image re-encode failed: {message}")]
    Encode { message: String },

    #[error("Publish failed for language {language}: {message}")]
    Publish { language: Language, message: String },

    #[error("Notification failed: {message}")]
    Notify { message: String },

    #[error("Configuration error: {field}: {message}")]
    Configuration { field: String, message: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PosterError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        PosterError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn malformed(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        PosterError::MalformedIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}
