use cr_types::{NodeId, PropertyType};
use serde::{Deserialize, Serialize};

/// Raw node data as stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRow {
    pub identifier: NodeId,
    /// `None` only for the root node.
    pub parent: Option<NodeId>,
    pub name: String,
    pub node_type: String,
}

/// Stored text of a property: one value or a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowValues {
    Single(String),
    Multiple(Vec<String>),
}

impl RowValues {
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    /// Iterate over every stored value text.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Multiple(vs) => vs,
        };
        slice.iter().map(String::as_str)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.texts().any(|t| t == text)
    }
}

/// Raw property data as stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRow {
    /// Identifier of the owning node.
    pub parent: NodeId,
    pub name: String,
    pub property_type: PropertyType,
    pub values: RowValues,
}

/// A custom namespace mapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRow {
    pub prefix: String,
    pub uri: String,
}

impl NamespaceRow {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }
}
