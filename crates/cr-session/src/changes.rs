//! Unit-of-work bookkeeping: the new, dirty and removed sets for nodes and
//! properties.

use std::collections::HashSet;
use std::hash::Hash;

use cr_types::NodeId;

use crate::property::PropertyKey;

/// A set that iterates in insertion order.
#[derive(Clone, Debug)]
pub struct ChangeSet<K> {
    order: Vec<K>,
    members: HashSet<K>,
}

impl<K: Clone + Eq + Hash> ChangeSet<K> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            members: HashSet::new(),
        }
    }

    /// Returns `false` if the key was already present.
    pub fn insert(&mut self, key: K) -> bool {
        if !self.members.insert(key.clone()) {
            return false;
        }
        self.order.push(key);
        true
    }

    pub fn remove(&mut self, key: &K) -> bool {
        if !self.members.remove(key) {
            return false;
        }
        self.order.retain(|k| k != key);
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.members.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

impl<K: Clone + Eq + Hash> Default for ChangeSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash> PartialEq for ChangeSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

/// Pending changes of one session.
///
/// An entity is in at most one of {new, dirty}. Removing a new entity
/// forgets it entirely, so it never reaches the backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeLog {
    pub new_nodes: ChangeSet<NodeId>,
    pub dirty_nodes: ChangeSet<NodeId>,
    pub removed_nodes: ChangeSet<NodeId>,
    pub new_properties: ChangeSet<PropertyKey>,
    pub dirty_properties: ChangeSet<PropertyKey>,
    pub removed_properties: ChangeSet<PropertyKey>,
}

impl ChangeLog {
    pub fn register_node_new(&mut self, id: NodeId) {
        self.new_nodes.insert(id);
    }

    pub fn register_node_dirty(&mut self, id: NodeId) {
        if !self.new_nodes.contains(&id) {
            self.dirty_nodes.insert(id);
        }
    }

    pub fn register_node_removed(&mut self, id: NodeId) {
        if self.new_nodes.remove(&id) {
            return;
        }
        self.dirty_nodes.remove(&id);
        self.removed_nodes.insert(id);
    }

    /// A property pending removal that is set again becomes an update.
    pub fn register_property_new(&mut self, key: PropertyKey) {
        if self.removed_properties.remove(&key) {
            self.dirty_properties.insert(key);
        } else {
            self.new_properties.insert(key);
        }
    }

    pub fn register_property_dirty(&mut self, key: PropertyKey) {
        if !self.new_properties.contains(&key) {
            self.dirty_properties.insert(key);
        }
    }

    pub fn register_property_removed(&mut self, key: PropertyKey) {
        if self.new_properties.remove(&key) {
            return;
        }
        self.dirty_properties.remove(&key);
        self.removed_properties.insert(key);
    }

    pub fn is_new_node(&self, id: &NodeId) -> bool {
        self.new_nodes.contains(id)
    }

    pub fn is_modified_node(&self, id: &NodeId) -> bool {
        self.dirty_nodes.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.new_nodes.is_empty()
            && self.dirty_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.new_properties.is_empty()
            && self.dirty_properties.is_empty()
            && self.removed_properties.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Pending property keys of one node from a given set.
    pub fn properties_of<'a>(
        set: &'a ChangeSet<PropertyKey>,
        node: &'a NodeId,
    ) -> impl Iterator<Item = &'a PropertyKey> + 'a {
        set.iter().filter(move |key| key.node == *node)
    }
}
