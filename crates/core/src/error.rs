//! Error types for BCC conversion.
//! Internal failures are `BccError`; callers only ever see `ConversionError`.

use thiserror::Error;

/// Stable classification of conversion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is not JSON, or carries no recognizable entry list.
    Format,
    /// The document parsed but no entry survived filtering.
    EmptyResult,
}

/// Failures raised while normalizing or serializing a document.
#[derive(Error, Debug)]
pub enum BccError {
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no recognizable entry list (expected one of: body, subtitles, events)")]
    MissingEntryList,

    #[error("no valid entries after filtering")]
    NoEntries,
}

impl BccError {
    /// Kind reported at the conversion boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BccError::Malformed(_) | BccError::MissingEntryList => ErrorKind::Format,
            BccError::NoEntries => ErrorKind::EmptyResult,
        }
    }
}

/// The single error type returned by [`crate::convert::convert`].
#[derive(Error, Debug)]
#[error("BCC conversion failed: {source}")]
pub struct ConversionError {
    #[from]
    source: BccError,
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// Parser detail (line and column) for malformed text, if any.
    pub fn diagnostic(&self) -> Option<String> {
        match &self.source {
            BccError::Malformed(err) => Some(format!(
                "line {} column {}: {:?}",
                err.line(),
                err.column(),
                err.classify()
            )),
            _ => None,
        }
    }
}
