//! Owned copies of the parts of a node an export needs.

use cr_session::{PropertyValues, Session, JCR_MIXIN_TYPES, JCR_PRIMARY_TYPE, JCR_UUID};
use cr_types::{NodeId, PropertyType, Value};

use crate::error::ExportResult;

pub(crate) struct PropertySnapshot {
    pub name: String,
    pub property_type: PropertyType,
    pub multiple: bool,
    pub values: Vec<Value>,
}

pub(crate) struct NodeSnapshot {
    pub identifier: NodeId,
    pub name: String,
    pub is_root: bool,
    pub primary_node_type: String,
    /// In name order.
    pub properties: Vec<PropertySnapshot>,
    pub children: Vec<NodeId>,
}

impl NodeSnapshot {
    pub fn take(session: &mut Session, id: &NodeId) -> ExportResult<Self> {
        let node = session.node_by_identifier(id)?;
        let properties = node
            .properties()
            .map(|p| {
                let (multiple, values) = match p.raw_values() {
                    PropertyValues::Single(v) => (false, vec![v.clone()]),
                    PropertyValues::Multiple(vs) => (true, vs.clone()),
                };
                PropertySnapshot {
                    name: p.name().to_string(),
                    property_type: p.property_type(),
                    multiple,
                    values,
                }
            })
            .collect();
        Ok(Self {
            identifier: node.identifier(),
            name: node.name().to_string(),
            is_root: node.is_root(),
            primary_node_type: node.primary_node_type().to_string(),
            properties,
            children: node.child_ids().to_vec(),
        })
    }

    /// Element or `sv:name` for this node.
    pub fn export_name(&self) -> &str {
        if self.is_root {
            "jcr:root"
        } else {
            &self.name
        }
    }

    /// Properties other than the ones the system view writes first.
    pub fn regular_properties(&self) -> impl Iterator<Item = &PropertySnapshot> {
        self.properties
            .iter()
            .filter(|p| ![JCR_PRIMARY_TYPE, JCR_MIXIN_TYPES, JCR_UUID].contains(&p.name.as_str()))
    }

    pub fn property(&self, name: &str) -> Option<&PropertySnapshot> {
        self.properties.iter().find(|p| p.name == name)
    }
}
