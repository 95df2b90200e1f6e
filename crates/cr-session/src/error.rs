use cr_types::{NodeId, TypeError};
use thiserror::Error;

/// Errors surfaced by sessions, nodes and properties.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No item at a path, or a same-name-sibling index below 1.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Unknown identifier, missing parent or ancestor depth out of range.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Type coercion failed or the multiplicity did not match.
    #[error("value format error: {0}")]
    ValueFormat(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A client-supplied identifier is already in use.
    #[error("item exists: {0}")]
    ItemExists(String),

    /// A node pending removal is still the target of a REFERENCE.
    #[error("node {0} is still a reference target")]
    ReferentialIntegrity(NodeId),

    #[error("namespace error: {0}")]
    Namespace(#[from] cr_namespace::NamespaceError),

    #[error("unsupported repository operation: {0}")]
    UnsupportedRepositoryOperation(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("no such workspace: {0}")]
    NoSuchWorkspace(String),

    /// The session has been logged out.
    #[error("session is not live")]
    NotLive,

    #[error("storage error: {0}")]
    Storage(#[from] cr_store::StoreError),
}

impl From<TypeError> for SessionError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::ValueFormat(msg) => Self::ValueFormat(msg),
            TypeError::UnknownPropertyType(_) => Self::ValueFormat(err.to_string()),
            TypeError::InvalidName { .. } => Self::ConstraintViolation(err.to_string()),
            TypeError::InvalidPath { .. } => Self::PathNotFound(err.to_string()),
            TypeError::InvalidIdentifier(_) => Self::ItemNotFound(err.to_string()),
            TypeError::Lookup(msg) => Self::Repository(msg),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
