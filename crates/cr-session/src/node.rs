use std::collections::BTreeMap;

use cr_store::{NodeRow, PropertyRow};
use cr_types::{NodeId, PropertyType, Value};

use crate::error::SessionResult;
use crate::property::{Property, PropertyValues, JCR_PRIMARY_TYPE, JCR_UUID};

/// A node's link to its parent.
///
/// Freshly loaded nodes only know the parent identifier. The link becomes
/// `Resolved` once the parent has been pulled into the session's identity
/// map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentRef {
    Pending(NodeId),
    Resolved(NodeId),
}

impl ParentRef {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Pending(id) | Self::Resolved(id) => *id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// One node of the content tree, owned by a session.
///
/// Nodes refer to their parent and children by identifier only; the
/// session resolves identifiers through its identity map.
#[derive(Clone, Debug)]
pub struct Node {
    identifier: NodeId,
    name: String,
    node_type: String,
    /// `None` only for the root node.
    parent: Option<ParentRef>,
    children: Vec<NodeId>,
    properties: BTreeMap<String, Property>,
}

impl Node {
    /// A node that exists only in the session so far.
    pub(crate) fn new_transient(
        identifier: NodeId,
        parent: NodeId,
        name: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        let mut node = Self {
            identifier,
            name: name.into(),
            node_type: node_type.into(),
            parent: Some(ParentRef::Resolved(parent)),
            children: Vec::new(),
            properties: BTreeMap::new(),
        };
        node.add_autocreated_properties();
        node
    }

    /// A node built from backend rows.
    pub(crate) fn from_rows(
        row: NodeRow,
        property_rows: Vec<PropertyRow>,
        children: Vec<NodeId>,
    ) -> SessionResult<Self> {
        let mut node = Self {
            identifier: row.identifier,
            name: row.name,
            node_type: row.node_type,
            parent: row.parent.map(ParentRef::Pending),
            children,
            properties: BTreeMap::new(),
        };
        node.add_autocreated_properties();
        for prop_row in property_rows {
            let property = Property::from_row(prop_row)?;
            node.properties.insert(property.name().to_string(), property);
        }
        Ok(node)
    }

    fn add_autocreated_properties(&mut self) {
        let uuid = Property::new(
            JCR_UUID,
            self.identifier,
            PropertyType::String,
            PropertyValues::Single(Value::String(self.identifier.to_string())),
        );
        let primary_type = Property::new(
            JCR_PRIMARY_TYPE,
            self.identifier,
            PropertyType::Name,
            PropertyValues::Single(Value::Name(self.node_type.clone())),
        );
        self.properties.insert(JCR_UUID.into(), uuid);
        self.properties.insert(JCR_PRIMARY_TYPE.into(), primary_type);
    }

    pub(crate) fn to_row(&self) -> NodeRow {
        NodeRow {
            identifier: self.identifier,
            parent: self.parent_id(),
            name: self.name.clone(),
            node_type: self.node_type.clone(),
        }
    }

    pub fn identifier(&self) -> NodeId {
        self.identifier
    }

    /// Node name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_node_type(&self) -> &str {
        &self.node_type
    }

    pub fn parent_ref(&self) -> Option<ParentRef> {
        self.parent
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent.map(|p| p.id())
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Child identifiers in order.
    pub fn child_ids(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_nodes(&self) -> bool {
        !self.children.is_empty()
    }

    /// Always true: every node carries its autocreated properties.
    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// All properties in name order, autocreated ones included.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub(crate) fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.get_mut(name)
    }

    pub(crate) fn insert_property(&mut self, property: Property) {
        self.properties.insert(property.name().to_string(), property);
    }

    pub(crate) fn take_property(&mut self, name: &str) -> Option<Property> {
        self.properties.remove(name)
    }

    pub(crate) fn push_child(&mut self, id: NodeId) {
        self.children.push(id);
    }

    pub(crate) fn drop_child(&mut self, id: &NodeId) {
        self.children.retain(|c| c != id);
    }

    pub(crate) fn resolve_parent(&mut self) {
        if let Some(ParentRef::Pending(id)) = self.parent {
            self.parent = Some(ParentRef::Resolved(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_store::RowValues;

    #[test]
    fn transient_node_has_autocreated_properties() {
        let id = NodeId::new();
        let node = Node::new_transient(id, NodeId::new(), "page", "nt:unstructured");
        assert_eq!(
            node.property(JCR_UUID).unwrap().get_string().unwrap(),
            id.to_string()
        );
        let primary = node.property(JCR_PRIMARY_TYPE).unwrap();
        assert_eq!(primary.property_type(), PropertyType::Name);
        assert_eq!(primary.get_string().unwrap(), "nt:unstructured");
        assert!(node.parent_ref().unwrap().is_resolved());
        assert!(!node.has_nodes());
        assert!(node.has_properties());
    }

    #[test]
    fn loaded_node_has_pending_parent() {
        let parent = NodeId::new();
        let row = NodeRow {
            identifier: NodeId::new(),
            parent: Some(parent),
            name: "a".into(),
            node_type: "nt:folder".into(),
        };
        let prop = PropertyRow {
            parent: row.identifier,
            name: "title".into(),
            property_type: PropertyType::String,
            values: RowValues::Single("Hello".into()),
        };
        let child = NodeId::new();
        let mut node = Node::from_rows(row.clone(), vec![prop], vec![child]).unwrap();

        assert_eq!(node.parent_ref(), Some(ParentRef::Pending(parent)));
        assert_eq!(node.child_ids(), &[child]);
        assert_eq!(node.property("title").unwrap().get_string().unwrap(), "Hello");
        assert_eq!(node.to_row(), row);

        node.resolve_parent();
        assert_eq!(node.parent_ref(), Some(ParentRef::Resolved(parent)));
    }

    #[test]
    fn root_row_has_no_parent() {
        let row = NodeRow {
            identifier: NodeId::new(),
            parent: None,
            name: String::new(),
            node_type: "rep:root".into(),
        };
        let node = Node::from_rows(row, Vec::new(), Vec::new()).unwrap();
        assert!(node.is_root());
        assert_eq!(node.parent_id(), None);
    }

    #[test]
    fn corrupt_row_fails_load() {
        let id = NodeId::new();
        let row = NodeRow {
            identifier: id,
            parent: None,
            name: String::new(),
            node_type: "rep:root".into(),
        };
        let prop = PropertyRow {
            parent: id,
            name: "n".into(),
            property_type: PropertyType::Long,
            values: RowValues::Single("forty-two".into()),
        };
        assert!(Node::from_rows(row, vec![prop], Vec::new()).is_err());
    }
}
