use thiserror::Error;

use crate::types::FieldClass;

/// A problem found while decoding that was recovered locally.
///
/// Issues never abort the decode of a record; they are collected and handed back to the
/// caller alongside the decoded [`Record`](crate::record::Record).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Issue {
    /// A header declaration with an unrecognized `Number` or `Type` token, or one that could
    /// not be parsed at all. The field falls back to `Number=.` and `Type=String`.
    #[error("malformed {class} header field {id:?}: {reason}")]
    MalformedHeaderField {
        class: FieldClass,
        id: String,
        reason: String,
    },

    /// The declared number of sub-values does not match the observed one.
    /// The value was padded with missing values or truncated.
    #[error("{field}: expected {expected} values, found {found}")]
    ArityMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    /// A token that cannot be parsed as its declared type. It was replaced by a missing value.
    #[error("{field}: invalid value {token:?}: {reason}")]
    InvalidFieldValue {
        field: String,
        token: String,
        reason: String,
    },

    /// An annotation entry whose allele could not be resolved. It was stored in the shared bucket.
    #[error("{field}: cannot attribute annotation entry {index} to an allele: {reason}")]
    UnattributableAnnotation {
        field: String,
        index: usize,
        reason: String,
    },
}

/// A structural problem that prevents decoding a record line at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected at least {expected} tab-separated columns, found {found}")]
    MissingColumns { expected: usize, found: usize },

    #[error("invalid position {0:?}")]
    InvalidPosition(String),

    #[error("record contains a line break at byte {0}")]
    EmbeddedLineBreak(usize),
}
