use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use cr_types::{NodeId, PropertyType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::rows::{NamespaceRow, NodeRow, PropertyRow};
use crate::traits::StorageBackend;

/// Node type given to the root row of a fresh backend.
pub const DEFAULT_ROOT_NODE_TYPE: &str = "rep:root";

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredNode {
    /// Insertion sequence, used to keep child order stable.
    seq: u64,
    row: NodeRow,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Tables {
    root: Option<NodeId>,
    next_seq: u64,
    nodes: BTreeMap<NodeId, StoredNode>,
    properties: BTreeMap<NodeId, BTreeMap<String, PropertyRow>>,
    namespaces: Vec<NamespaceRow>,
}

/// In-memory, `BTreeMap`-based storage backend.
///
/// Intended for tests, embedding and the command line. All tables live
/// behind one `RwLock`; rows are cloned on read and write. The backend starts
/// disconnected and holds a root node row from the moment it is created.
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
    connected: AtomicBool,
}

impl InMemoryBackend {
    /// Create an empty backend holding only a root node.
    pub fn new() -> Self {
        Self::with_root_node_type(DEFAULT_ROOT_NODE_TYPE)
    }

    /// Create an empty backend whose root node has the given type.
    pub fn with_root_node_type(node_type: &str) -> Self {
        let root = NodeRow {
            identifier: NodeId::new(),
            parent: None,
            name: String::new(),
            node_type: node_type.to_string(),
        };
        let mut tables = Tables {
            root: Some(root.identifier),
            next_seq: 1,
            ..Default::default()
        };
        tables.nodes.insert(root.identifier, StoredNode { seq: 0, row: root });
        Self::from_tables(tables)
    }

    fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
            connected: AtomicBool::new(false),
        }
    }

    /// Load a snapshot written by [`InMemoryBackend::save_to`].
    pub fn load_from(path: &Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path)?;
        let tables: Tables =
            serde_json::from_str(&text).map_err(|e| StoreError::Serialization(e.to_string()))?;
        if tables.root.is_none() {
            return Err(StoreError::MissingRoot);
        }
        debug!(path = %path.display(), nodes = tables.nodes.len(), "loaded snapshot");
        Ok(Self::from_tables(tables))
    }

    /// Write all tables to a pretty-printed JSON snapshot.
    pub fn save_to(&self, path: &Path) -> StoreResult<()> {
        let tables = self.tables.read().expect("lock poisoned");
        let text = serde_json::to_string_pretty(&*tables)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(path, text)?;
        debug!(path = %path.display(), nodes = tables.nodes.len(), "saved snapshot");
        Ok(())
    }

    /// Number of node rows, root included.
    pub fn node_count(&self) -> usize {
        self.tables.read().expect("lock poisoned").nodes.len()
    }

    /// Number of property rows across all nodes.
    pub fn property_count(&self) -> usize {
        self.tables
            .read()
            .expect("lock poisoned")
            .properties
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    fn ensure_connected(&self) -> StoreResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for InMemoryBackend {
    fn connect(&self) -> StoreResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) -> StoreResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn raw_root_node(&self) -> StoreResult<Option<NodeRow>> {
        self.ensure_connected()?;
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables
            .root
            .and_then(|id| tables.nodes.get(&id))
            .map(|stored| stored.row.clone()))
    }

    fn raw_node_by_identifier(&self, id: &NodeId) -> StoreResult<Option<NodeRow>> {
        self.ensure_connected()?;
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables.nodes.get(id).map(|stored| stored.row.clone()))
    }

    fn identifiers_of_sub_nodes(&self, id: &NodeId) -> StoreResult<Vec<NodeId>> {
        self.ensure_connected()?;
        let tables = self.tables.read().expect("lock poisoned");
        let mut children: Vec<&StoredNode> = tables
            .nodes
            .values()
            .filter(|stored| stored.row.parent.as_ref() == Some(id))
            .collect();
        children.sort_by_key(|stored| stored.seq);
        Ok(children.into_iter().map(|stored| stored.row.identifier).collect())
    }

    fn has_child_node_with_name(&self, id: &NodeId, name: &str) -> StoreResult<bool> {
        self.ensure_connected()?;
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables
            .nodes
            .values()
            .any(|stored| stored.row.parent.as_ref() == Some(id) && stored.row.name == name))
    }

    fn has_identifier(&self, id: &NodeId) -> StoreResult<bool> {
        self.ensure_connected()?;
        Ok(self.tables.read().expect("lock poisoned").nodes.contains_key(id))
    }

    fn is_reference_target(&self, id: &NodeId) -> StoreResult<bool> {
        self.ensure_connected()?;
        let target = id.to_string();
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables.properties.values().flat_map(BTreeMap::values).any(|row| {
            row.property_type == PropertyType::Reference && row.values.contains(&target)
        }))
    }

    fn add_node(&self, row: &NodeRow) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        if tables.nodes.contains_key(&row.identifier) {
            return Err(StoreError::Duplicate(format!("node {}", row.identifier)));
        }
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.nodes.insert(
            row.identifier,
            StoredNode {
                seq,
                row: row.clone(),
            },
        );
        debug!(node = %row.identifier, name = %row.name, "added node row");
        Ok(())
    }

    fn update_node(&self, row: &NodeRow) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let stored = tables
            .nodes
            .get_mut(&row.identifier)
            .ok_or(StoreError::NodeNotFound(row.identifier))?;
        stored.row = row.clone();
        Ok(())
    }

    fn remove_node(&self, id: &NodeId) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        tables.nodes.remove(id).ok_or(StoreError::NodeNotFound(*id))?;
        debug!(node = %id, "removed node row");
        Ok(())
    }

    fn raw_properties_of_node(&self, id: &NodeId) -> StoreResult<Vec<PropertyRow>> {
        self.ensure_connected()?;
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables
            .properties
            .get(id)
            .map(|props| props.values().cloned().collect())
            .unwrap_or_default())
    }

    fn add_property(&self, row: &PropertyRow) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let props = tables.properties.entry(row.parent).or_default();
        if props.contains_key(&row.name) {
            return Err(StoreError::Duplicate(format!(
                "property {} on node {}",
                row.name, row.parent
            )));
        }
        props.insert(row.name.clone(), row.clone());
        Ok(())
    }

    fn update_property(&self, row: &PropertyRow) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let existing = tables
            .properties
            .get_mut(&row.parent)
            .and_then(|props| props.get_mut(&row.name))
            .ok_or_else(|| StoreError::PropertyNotFound {
                node: row.parent,
                name: row.name.clone(),
            })?;
        *existing = row.clone();
        Ok(())
    }

    fn remove_property(&self, parent: &NodeId, name: &str) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let props = tables.properties.get_mut(parent);
        let removed = props.and_then(|props| props.remove(name));
        if removed.is_none() {
            return Err(StoreError::PropertyNotFound {
                node: *parent,
                name: name.to_string(),
            });
        }
        if tables.properties.get(parent).is_some_and(BTreeMap::is_empty) {
            tables.properties.remove(parent);
        }
        Ok(())
    }

    fn raw_properties_of_typed_value(
        &self,
        name: Option<&str>,
        ty: PropertyType,
        target: &NodeId,
    ) -> StoreResult<Vec<PropertyRow>> {
        self.ensure_connected()?;
        let target = target.to_string();
        let tables = self.tables.read().expect("lock poisoned");
        // BTreeMap iteration already yields (parent, name) order.
        Ok(tables
            .properties
            .values()
            .flat_map(BTreeMap::values)
            .filter(|row| row.property_type == ty)
            .filter(|row| name.map_or(true, |n| row.name == n))
            .filter(|row| row.values.contains(&target))
            .cloned()
            .collect())
    }

    fn raw_namespaces(&self) -> StoreResult<Vec<NamespaceRow>> {
        self.ensure_connected()?;
        Ok(self.tables.read().expect("lock poisoned").namespaces.clone())
    }

    fn add_namespace(&self, prefix: &str, uri: &str) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        if tables
            .namespaces
            .iter()
            .any(|ns| ns.prefix == prefix || ns.uri == uri)
        {
            return Err(StoreError::Duplicate(format!("namespace {prefix} -> {uri}")));
        }
        tables.namespaces.push(NamespaceRow::new(prefix, uri));
        Ok(())
    }

    fn update_namespace_prefix(&self, new_prefix: &str, uri: &str) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let row = tables
            .namespaces
            .iter_mut()
            .find(|ns| ns.uri == uri)
            .ok_or_else(|| StoreError::NamespaceNotFound(uri.to_string()))?;
        row.prefix = new_prefix.to_string();
        Ok(())
    }

    fn update_namespace_uri(&self, prefix: &str, new_uri: &str) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let row = tables
            .namespaces
            .iter_mut()
            .find(|ns| ns.prefix == prefix)
            .ok_or_else(|| StoreError::NamespaceNotFound(prefix.to_string()))?;
        row.uri = new_uri.to_string();
        Ok(())
    }

    fn delete_namespace(&self, prefix: &str) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut tables = self.tables.write().expect("lock poisoned");
        let before = tables.namespaces.len();
        tables.namespaces.retain(|ns| ns.prefix != prefix);
        if tables.namespaces.len() == before {
            return Err(StoreError::NamespaceNotFound(prefix.to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("node_count", &self.node_count())
            .field("property_count", &self.property_count())
            .field("connected", &self.is_connected())
            .finish()
    }
}
