use cr_types::NodeId;

/// Errors from storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A data call was made before `connect` or after `disconnect`.
    #[error("storage backend is not connected")]
    NotConnected,

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("property {name:?} not found on node {node}")]
    PropertyNotFound { node: NodeId, name: String },

    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// A row with the same key already exists.
    #[error("duplicate row: {0}")]
    Duplicate(String),

    /// The backend has no root node row.
    #[error("storage holds no root node")]
    MissingRoot,

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
