use thiserror::Error;

#[derive(Debug, Error)]
pub enum NamespaceError {
    /// Built-in prefixes and URIs, and anything starting with `xml`.
    #[error("namespace {0:?} is reserved")]
    Reserved(String),

    #[error("namespace prefix must not be empty")]
    EmptyPrefix,

    #[error("namespace URI must not be empty")]
    EmptyUri,

    #[error("unknown namespace prefix: {0}")]
    UnknownPrefix(String),

    #[error("unknown namespace URI: {0}")]
    UnknownUri(String),

    #[error("store error: {0}")]
    Store(#[from] cr_store::StoreError),
}

pub type NamespaceResult<T> = Result<T, NamespaceError>;
