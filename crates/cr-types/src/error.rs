use thiserror::Error;

/// Errors produced while parsing or converting repository values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// A value could not be coerced to the requested type.
    #[error("{0}")]
    ValueFormat(String),

    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid path segment {segment:?}: {reason}")]
    InvalidPath { segment: String, reason: String },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("unknown property type: {0}")]
    UnknownPropertyType(String),

    /// A lookup performed on behalf of the converter failed.
    #[error("lookup failed during conversion: {0}")]
    Lookup(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
