//! Error taxonomy for the PDF core.
//!
//! Every fallible core operation returns one of these variants. Recoverable
//! errors (a single bad font, a single bad xref entry) never propagate past
//! the object or page boundary where they occur; they are converted into a
//! [`crate::warnings::Diagnostics`] entry and a sentinel value instead. Only
//! document-level failures (missing header, unrecoverable xref, wrong
//! password) are returned to the caller of `Document::open`/`Decrypt`.

use thiserror::Error;

/// Context describing where in the byte stream a parse failure occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    pub offset: usize,
    pub context: String,
}

impl ParseContext {
    pub fn new(offset: usize, context: impl Into<String>) -> Self {
        Self { offset, context: context.into() }
    }
}

impl std::fmt::Display for ParseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "offset {}: {}", self.offset, self.context)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XRefErrorKind {
    #[error("missing startxref keyword")]
    MissingStartxref,
    #[error("malformed xref entry")]
    BadEntry,
    #[error("object header does not match expected (object, generation)")]
    ObjectMismatch,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnsupportedFeatureKind {
    #[error("security handler revision {0} is not supported")]
    SecurityHandlerRevision(u8),
    #[error("filter {0} is not supported")]
    Filter(String),
    #[error("font subtype {0} is not supported")]
    FontSubtype(String),
}

/// Top-level error type returned by fallible public APIs.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("parse error: {0}")]
    Parse(ParseContext),

    #[error("xref error: {0}")]
    XRef(#[from] XRefErrorKind),

    #[error("filter {filter} failed at offset {offset}: {reason}")]
    Filter { filter: String, offset: usize, reason: String },

    #[error("incorrect password")]
    Auth,

    #[error("unsupported feature: {0}")]
    Unsupported(#[from] UnsupportedFeatureKind),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PdfError>;

impl From<crate::crypto::DecryptError> for PdfError {
    fn from(_: crate::crypto::DecryptError) -> Self {
        PdfError::Auth
    }
}
