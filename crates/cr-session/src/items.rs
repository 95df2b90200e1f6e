//! Node and property operations.
//!
//! Nodes live in the session's identity map, so every operation here is a
//! `Session` method that takes the node's identifier.

use cr_types::{convert_value, split_last, validate_name, Converted, NodeId, PropertyInput, PropertyType};
use tracing::debug;

use crate::error::{SessionError, SessionResult};
use crate::node::Node;
use crate::path_parser::{resolve, Item, ResolveMode};
use crate::property::{is_autocreated_name, Property, PropertyKey, PropertyValues};
use crate::session::Session;

impl Session {
    // -----------------------------------------------------------------------
    // Creating and changing
    // -----------------------------------------------------------------------

    /// Create a node at `rel_path` below `parent` and return its identifier.
    ///
    /// Everything before the last segment must resolve to an existing node.
    /// A primary node type is required; a caller-chosen identifier must not
    /// be in use yet.
    pub fn add_node(
        &mut self,
        parent: &NodeId,
        rel_path: &str,
        primary_node_type: Option<&str>,
        identifier: Option<NodeId>,
    ) -> SessionResult<NodeId> {
        self.ensure_loaded(parent)?;
        if rel_path.is_empty() {
            return Err(SessionError::PathNotFound("path not found or not provided".into()));
        }

        let (rest, name) = split_last(rel_path);
        validate_name(name).map_err(|e| {
            SessionError::ConstraintViolation(format!("invalid node name given: {e}"))
        })?;
        let target = if rest.is_empty() {
            *parent
        } else {
            self.resolve_node(parent, rest)?
        };

        let node_type = primary_node_type.ok_or_else(|| {
            SessionError::UnsupportedRepositoryOperation(
                "determining the node type for add_node is not supported, specify it explicitly"
                    .into(),
            )
        })?;

        let id = match identifier {
            Some(id) => {
                if self.has_identifier(&id)? {
                    return Err(SessionError::ItemExists(format!(
                        "the identifier {id} requested for {rel_path:?} is already in use"
                    )));
                }
                id
            }
            None => NodeId::new(),
        };

        self.nodes
            .insert(id, Node::new_transient(id, target, name, node_type));
        self.changes.register_node_new(id);
        self.loaded_node_mut(&target)?.push_child(id);
        self.changes.register_node_dirty(target);
        debug!(node = %id, parent = %target, name, node_type, "added node");
        Ok(id)
    }

    /// Set, replace or (with [`PropertyInput::Null`]) remove a property.
    ///
    /// The value is coerced to `ty`; [`PropertyType::Undefined`] lets the
    /// coercion engine pick. An existing property keeps its multiplicity.
    pub fn set_property(
        &mut self,
        node: &NodeId,
        name: &str,
        value: impl Into<PropertyInput>,
        ty: PropertyType,
    ) -> SessionResult<()> {
        self.ensure_loaded(node)?;
        validate_name(name).map_err(|e| {
            SessionError::ConstraintViolation(format!("property with invalid name could not be set: {e}"))
        })?;
        if is_autocreated_name(name) {
            return Err(SessionError::ConstraintViolation(format!(
                "{name} is protected"
            )));
        }

        let input = value.into();
        let key = PropertyKey::new(*node, name);
        let existing_multiple = self.loaded_node(node)?.property(name).map(Property::is_multiple);

        match (&input, existing_multiple) {
            (PropertyInput::Null, None) => {}
            (PropertyInput::Null, Some(_)) => {
                self.loaded_node_mut(node)?.take_property(name);
                self.changes.register_property_removed(key);
            }
            (PropertyInput::Multiple(_), Some(false)) => {
                return Err(SessionError::ValueFormat(format!(
                    "tried to set array value on non-multivalued property {name}"
                )));
            }
            (PropertyInput::Single(_), Some(true)) => {
                return Err(SessionError::ValueFormat(format!(
                    "tried to set non-array value on multivalued property {name}"
                )));
            }
            _ => {
                let (property_type, values) = match convert_value(&input, ty, &*self)? {
                    Converted::Single(v) => (v.property_type(), PropertyValues::Single(v)),
                    Converted::Multiple(t, vs) => (t, PropertyValues::Multiple(vs)),
                };
                let owner = self.loaded_node_mut(node)?;
                let created = match owner.property_mut(name) {
                    Some(existing) => {
                        existing.replace(property_type, values);
                        false
                    }
                    None => {
                        owner.insert_property(Property::new(name, *node, property_type, values));
                        true
                    }
                };
                if created {
                    self.changes.register_property_new(key);
                } else {
                    self.changes.register_property_dirty(key);
                }
            }
        }

        self.changes.register_node_dirty(*node);
        Ok(())
    }

    /// Assign new values to an existing property, coercing to its current
    /// type.
    pub fn set_property_value(
        &mut self,
        key: &PropertyKey,
        value: impl Into<PropertyInput>,
    ) -> SessionResult<()> {
        let ty = self.property_at(key)?.property_type();
        self.set_property(&key.node, &key.name, value, ty)
    }

    pub fn remove_property(&mut self, key: &PropertyKey) -> SessionResult<()> {
        self.property_at(key)?;
        self.set_property(&key.node, &key.name, PropertyInput::Null, PropertyType::Undefined)
    }

    /// Remove a node with its whole subtree and all its properties.
    pub fn remove_node(&mut self, id: &NodeId) -> SessionResult<()> {
        self.ensure_loaded(id)?;
        let parent = self.loaded_node(id)?.parent_id().ok_or_else(|| {
            SessionError::ConstraintViolation("the root node cannot be removed".into())
        })?;
        self.ensure_loaded(&parent)?;

        // Load the whole subtree first so a failing lookup changes nothing.
        let mut order = Vec::new();
        let mut stack = vec![*id];
        while let Some(current) = stack.pop() {
            self.ensure_loaded(&current)?;
            order.push(current);
            stack.extend(self.loaded_node(&current)?.child_ids().iter().copied());
        }

        // Reversed pre-order: children go before their parents.
        for current in order.iter().rev() {
            if let Some(node) = self.nodes.remove(current) {
                for property in node.properties().filter(|p| !p.is_autocreated()) {
                    self.changes.register_property_removed(property.key());
                }
                self.changes.register_node_removed(*current);
            }
        }

        self.loaded_node_mut(&parent)?.drop_child(id);
        self.changes.register_node_dirty(parent);
        debug!(node = %id, subtree = order.len(), "removed node");
        Ok(())
    }

    /// Remove the node or property at an absolute path.
    pub fn remove_item(&mut self, abs_path: &str) -> SessionResult<()> {
        match self.item(abs_path)? {
            Item::Node(id) => self.remove_node(&id),
            Item::Property(key) => self.remove_property(&key),
        }
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub(crate) fn resolve_node(&mut self, from: &NodeId, rel_path: &str) -> SessionResult<NodeId> {
        match resolve(self, rel_path, *from, ResolveMode::Nodes)? {
            Item::Node(id) => Ok(id),
            Item::Property(_) => Err(SessionError::PathNotFound(rel_path.to_string())),
        }
    }

    fn resolve_property(&mut self, from: &NodeId, rel_path: &str) -> SessionResult<PropertyKey> {
        match resolve(self, rel_path, *from, ResolveMode::Properties)? {
            Item::Property(key) => Ok(key),
            Item::Node(_) => Err(SessionError::PathNotFound(rel_path.to_string())),
        }
    }

    /// The node at `rel_path` relative to `from`.
    pub fn get_node(&mut self, from: &NodeId, rel_path: &str) -> SessionResult<&Node> {
        let id = self.resolve_node(from, rel_path)?;
        self.loaded_node(&id)
    }

    /// The property at `rel_path` relative to `from`.
    pub fn get_property(&mut self, from: &NodeId, rel_path: &str) -> SessionResult<&Property> {
        self.ensure_loaded(from)?;
        let key = if !rel_path.contains('/') && self.loaded_node(from)?.property(rel_path).is_some()
        {
            PropertyKey::new(*from, rel_path)
        } else {
            self.resolve_property(from, rel_path)?
        };
        self.loaded_property(&key)
    }

    /// The property a key points at.
    pub fn property_at(&mut self, key: &PropertyKey) -> SessionResult<&Property> {
        self.ensure_loaded(&key.node)?;
        self.loaded_property(key)
    }

    fn loaded_property(&self, key: &PropertyKey) -> SessionResult<&Property> {
        self.loaded_node(&key.node)?
            .property(&key.name)
            .ok_or_else(|| SessionError::PathNotFound(format!("property {key} not found")))
    }

    /// All children in order. Name pattern filters are not supported.
    pub fn get_nodes(&mut self, id: &NodeId, filter: Option<&str>) -> SessionResult<Vec<&Node>> {
        if filter.is_some() {
            return Err(SessionError::UnsupportedRepositoryOperation(
                "name patterns in get_nodes".into(),
            ));
        }
        self.ensure_loaded(id)?;
        let children = self.loaded_node(id)?.child_ids().to_vec();
        for child in &children {
            self.ensure_loaded(child)?;
        }
        children.iter().map(|child| self.loaded_node(child)).collect()
    }

    /// All properties in name order. Name pattern filters are not supported.
    pub fn get_properties(
        &mut self,
        id: &NodeId,
        filter: Option<&str>,
    ) -> SessionResult<Vec<&Property>> {
        if filter.is_some() {
            return Err(SessionError::UnsupportedRepositoryOperation(
                "name patterns in get_properties".into(),
            ));
        }
        self.ensure_loaded(id)?;
        Ok(self.loaded_node(id)?.properties().collect())
    }

    // -----------------------------------------------------------------------
    // Absolute paths
    // -----------------------------------------------------------------------

    /// The node or property at an absolute path, nodes first.
    pub fn item(&mut self, abs_path: &str) -> SessionResult<Item> {
        require_absolute(abs_path)?;
        let root = self.root_id()?;
        resolve(self, abs_path, root, ResolveMode::Items)
    }

    pub fn node(&mut self, abs_path: &str) -> SessionResult<&Node> {
        require_absolute(abs_path)?;
        let root = self.root_id()?;
        self.get_node(&root, abs_path)
    }

    pub fn property(&mut self, abs_path: &str) -> SessionResult<&Property> {
        require_absolute(abs_path)?;
        let root = self.root_id()?;
        let key = self.resolve_property(&root, abs_path)?;
        self.loaded_property(&key)
    }

    pub fn item_exists(&mut self, abs_path: &str) -> SessionResult<bool> {
        not_found_as_false(self.item(abs_path).map(|_| ()))
    }

    pub fn node_exists(&mut self, abs_path: &str) -> SessionResult<bool> {
        not_found_as_false(self.node(abs_path).map(|_| ()))
    }

    pub fn property_exists(&mut self, abs_path: &str) -> SessionResult<bool> {
        not_found_as_false(self.property(abs_path).map(|_| ()))
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// The parent of a node; the root has none.
    pub fn parent(&mut self, id: &NodeId) -> SessionResult<&Node> {
        self.ensure_loaded(id)?;
        let parent = self.loaded_node(id)?.parent_id().ok_or_else(|| {
            SessionError::ItemNotFound("the root node does not have a parent".into())
        })?;
        self.ensure_loaded(&parent)?;
        self.loaded_node_mut(id)?.resolve_parent();
        self.loaded_node(&parent)
    }

    /// Identifiers from the root down to `id`, both included.
    fn lineage(&mut self, id: &NodeId) -> SessionResult<Vec<NodeId>> {
        let mut chain = vec![*id];
        let mut current = *id;
        loop {
            self.ensure_loaded(&current)?;
            if self.loaded_node(&current)?.is_root() {
                break;
            }
            current = self.parent(&current)?.identifier();
            chain.push(current);
        }
        chain.reverse();
        Ok(chain)
    }

    /// Absolute path of a node; `/` for the root.
    pub fn path(&mut self, id: &NodeId) -> SessionResult<String> {
        let lineage = self.lineage(id)?;
        if lineage.len() == 1 {
            return Ok("/".into());
        }
        let mut path = String::new();
        for node in &lineage[1..] {
            path.push('/');
            path.push_str(self.loaded_node(node)?.name());
        }
        Ok(path)
    }

    pub fn property_path(&mut self, key: &PropertyKey) -> SessionResult<String> {
        self.property_at(key)?;
        let node_path = self.path(&key.node)?;
        if node_path == "/" {
            Ok(format!("/{}", key.name))
        } else {
            Ok(format!("{node_path}/{}", key.name))
        }
    }

    /// Number of ancestors; 0 for the root.
    pub fn depth(&mut self, id: &NodeId) -> SessionResult<usize> {
        Ok(self.lineage(id)?.len() - 1)
    }

    /// The ancestor at `depth`; the node itself at its own depth.
    pub fn ancestor(&mut self, id: &NodeId, depth: usize) -> SessionResult<&Node> {
        let lineage = self.lineage(id)?;
        let ancestor = lineage.get(depth).ok_or_else(|| {
            SessionError::ItemNotFound(format!(
                "no ancestor at depth {depth}, node is at depth {}",
                lineage.len() - 1
            ))
        })?;
        self.loaded_node(ancestor)
    }

    /// 1-based position among same-name siblings.
    pub fn index(&mut self, id: &NodeId) -> SessionResult<usize> {
        self.ensure_loaded(id)?;
        if self.loaded_node(id)?.is_root() {
            return Ok(1);
        }
        let name = self.loaded_node(id)?.name().to_string();
        let siblings = self.parent(id)?.child_ids().to_vec();
        let mut index = 0;
        for sibling in siblings {
            self.ensure_loaded(&sibling)?;
            if self.loaded_node(&sibling)?.name() == name {
                index += 1;
            }
            if sibling == *id {
                return Ok(index);
            }
        }
        Err(SessionError::Repository(format!(
            "node {id} is missing from its parent's children"
        )))
    }

    pub fn has_node(&mut self, id: &NodeId, rel_path: &str) -> SessionResult<bool> {
        not_found_as_false(self.resolve_node(id, rel_path).map(|_| ()))
    }

    pub fn has_property(&mut self, id: &NodeId, rel_path: &str) -> SessionResult<bool> {
        not_found_as_false(self.get_property(id, rel_path).map(|_| ()))
    }

    // -----------------------------------------------------------------------
    // References
    // -----------------------------------------------------------------------

    /// REFERENCE properties pointing at a node, optionally only those with
    /// the given name.
    pub fn references(&mut self, id: &NodeId, name: Option<&str>) -> SessionResult<Vec<&Property>> {
        self.typed_references(id, name, PropertyType::Reference)
    }

    /// WEAKREFERENCE properties pointing at a node.
    pub fn weak_references(
        &mut self,
        id: &NodeId,
        name: Option<&str>,
    ) -> SessionResult<Vec<&Property>> {
        self.typed_references(id, name, PropertyType::WeakReference)
    }

    /// Stored references merged with those pending in this session, ordered
    /// by owning node and name.
    fn typed_references(
        &mut self,
        id: &NodeId,
        name: Option<&str>,
        ty: PropertyType,
    ) -> SessionResult<Vec<&Property>> {
        self.ensure_loaded(id)?;
        let rows = self.backend().raw_properties_of_typed_value(name, ty, id)?;
        let mut keys = Vec::new();
        for row in rows {
            if self.changes.removed_nodes.contains(&row.parent) {
                continue;
            }
            self.ensure_loaded(&row.parent)?;
            let still_points = self
                .loaded_node(&row.parent)?
                .property(&row.name)
                .is_some_and(|p| p.references(ty, id));
            if still_points {
                keys.push(PropertyKey::new(row.parent, row.name));
            }
        }
        for node in self.nodes.values() {
            for property in node.properties() {
                let named = name.map_or(true, |n| property.name() == n);
                if named && property.references(ty, id) {
                    let key = property.key();
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
        }
        keys.sort();
        keys.iter().map(|key| self.loaded_property(key)).collect()
    }

    /// The node a REFERENCE or WEAKREFERENCE property points at.
    pub fn referenced_node(&mut self, key: &PropertyKey) -> SessionResult<&Node> {
        let property = self.property_at(key)?;
        let target = match property.property_type() {
            PropertyType::Reference | PropertyType::WeakReference => property
                .value()?
                .as_reference()
                .ok_or_else(|| SessionError::ValueFormat(format!("{key} holds no identifier")))?,
            PropertyType::Path => {
                return Err(SessionError::UnsupportedRepositoryOperation(
                    "dereferencing PATH properties".into(),
                ));
            }
            other => {
                return Err(SessionError::ValueFormat(format!(
                    "a {other} property cannot be dereferenced"
                )));
            }
        };
        self.node_by_identifier(&target)
    }
}

fn require_absolute(path: &str) -> SessionResult<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(SessionError::Repository(format!("{path:?} is not an absolute path")))
    }
}

fn not_found_as_false(result: SessionResult<()>) -> SessionResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(SessionError::PathNotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
