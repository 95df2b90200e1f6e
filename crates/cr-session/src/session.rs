use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cr_namespace::{NamespaceError, NamespaceRegistry};
use cr_store::{NodeRow, PropertyRow, StorageBackend, StoreError};
use cr_types::{ConversionContext, NodeId, PropertyType, TypeError, TypeResult};
use tracing::{debug, info, warn};

use crate::changes::ChangeLog;
use crate::config::RepositoryConfig;
use crate::error::{SessionError, SessionResult};
use crate::node::Node;
use crate::property::PropertyKey;

/// A client's view of one workspace.
///
/// The session owns every node it has loaded (the identity map), keeps the
/// pending new, dirty and removed sets, and is the only component that
/// talks to the storage backend. Within one session an identifier always
/// maps to the same in-memory [`Node`].
pub struct Session {
    workspace: String,
    backend: Arc<dyn StorageBackend>,
    namespaces: NamespaceRegistry,
    /// Session-local prefix remappings, prefix to URI.
    local_namespaces: BTreeMap<String, String>,
    config: RepositoryConfig,
    pub(crate) nodes: HashMap<NodeId, Node>,
    root: Option<NodeId>,
    pub(crate) changes: ChangeLog,
    live: bool,
}

impl Session {
    /// Open a session on a connected backend.
    pub fn new(
        workspace: impl Into<String>,
        backend: Arc<dyn StorageBackend>,
        namespaces: NamespaceRegistry,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            backend,
            namespaces,
            local_namespaces: BTreeMap::new(),
            config,
            nodes: HashMap::new(),
            root: None,
            changes: ChangeLog::default(),
            live: true,
        }
    }

    pub fn workspace_name(&self) -> &str {
        &self.workspace
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub(crate) fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub(crate) fn check_live(&self) -> SessionResult<()> {
        if self.live {
            Ok(())
        } else {
            Err(SessionError::NotLive)
        }
    }

    /// Pending changes, for inspection.
    pub fn changes(&self) -> &ChangeLog {
        &self.changes
    }

    pub fn has_pending_changes(&self) -> SessionResult<bool> {
        self.check_live()?;
        Ok(!self.changes.is_empty())
    }

    /// Number of nodes in the identity map.
    pub fn loaded_node_count(&self) -> usize {
        self.nodes.len()
    }

    // -----------------------------------------------------------------------
    // Identity map
    // -----------------------------------------------------------------------

    /// Identifier of the root node, fetching it from the backend once.
    pub fn root_id(&mut self) -> SessionResult<NodeId> {
        self.check_live()?;
        if let Some(id) = self.root {
            return Ok(id);
        }
        let row = self
            .backend
            .raw_root_node()?
            .ok_or_else(|| SessionError::Repository("workspace has no root node".into()))?;
        let id = row.identifier;
        if !self.nodes.contains_key(&id) {
            let node = self.load_node(row)?;
            self.nodes.insert(id, node);
        }
        self.root = Some(id);
        Ok(id)
    }

    pub fn root_node(&mut self) -> SessionResult<&Node> {
        let id = self.root_id()?;
        self.loaded_node(&id)
    }

    /// The node with this identifier, loading it into the identity map on
    /// first access.
    pub fn node_by_identifier(&mut self, id: &NodeId) -> SessionResult<&Node> {
        self.ensure_loaded(id)?;
        self.loaded_node(id)
    }

    /// Whether the identifier is loaded in this session or known to the
    /// backend.
    pub fn has_identifier(&self, id: &NodeId) -> SessionResult<bool> {
        self.check_live()?;
        Ok(self.nodes.contains_key(id) || self.backend.has_identifier(id)?)
    }

    pub(crate) fn ensure_loaded(&mut self, id: &NodeId) -> SessionResult<()> {
        self.check_live()?;
        if self.nodes.contains_key(id) {
            return Ok(());
        }
        if self.changes.removed_nodes.contains(id) {
            return Err(SessionError::ItemNotFound(format!("node {id} has been removed")));
        }
        let row = self.backend.raw_node_by_identifier(id)?.ok_or_else(|| {
            SessionError::ItemNotFound(format!("node with identifier {id} not found in repository"))
        })?;
        let node = self.load_node(row)?;
        self.nodes.insert(*id, node);
        Ok(())
    }

    fn load_node(&self, row: NodeRow) -> SessionResult<Node> {
        let properties = self.backend.raw_properties_of_node(&row.identifier)?;
        let children = self.backend.identifiers_of_sub_nodes(&row.identifier)?;
        debug!(
            node = %row.identifier,
            name = %row.name,
            properties = properties.len(),
            children = children.len(),
            "loaded node"
        );
        Node::from_rows(row, properties, children)
    }

    pub(crate) fn loaded_node(&self, id: &NodeId) -> SessionResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| SessionError::ItemNotFound(format!("node {id} is not loaded")))
    }

    pub(crate) fn loaded_node_mut(&mut self, id: &NodeId) -> SessionResult<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| SessionError::ItemNotFound(format!("node {id} is not loaded")))
    }

    pub fn is_new(&self, id: &NodeId) -> bool {
        self.changes.is_new_node(id)
    }

    pub fn is_modified(&self, id: &NodeId) -> bool {
        self.changes.is_modified_node(id)
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Validate, then write every pending change to the backend.
    ///
    /// Validation failures leave all pending changes untouched. So does a
    /// failing backend call, although rows written before it stay written.
    /// The change sets are cleared only once everything has been flushed,
    /// so `save` can simply be called again: rows a failed attempt already
    /// added are updated, and rows it already removed are skipped.
    pub fn save(&mut self) -> SessionResult<()> {
        self.check_live()?;
        if self.config.check_referential_integrity {
            self.validate_pending_changes()?;
        }

        let changes = &self.changes;
        info!(
            workspace = %self.workspace,
            new_nodes = changes.new_nodes.len(),
            dirty_nodes = changes.dirty_nodes.len(),
            removed_nodes = changes.removed_nodes.len(),
            new_properties = changes.new_properties.len(),
            dirty_properties = changes.dirty_properties.len(),
            removed_properties = changes.removed_properties.len(),
            "saving session"
        );

        for id in changes.new_nodes.iter() {
            let row = self.loaded_node(id)?.to_row();
            if self.backend.has_identifier(id)? {
                self.backend.update_node(&row)?;
            } else {
                self.backend.add_node(&row)?;
            }
            self.add_properties_of(id)?;
        }
        debug!("flushed new nodes");

        for id in changes.dirty_nodes.iter() {
            self.backend.update_node(&self.loaded_node(id)?.to_row())?;
            self.add_properties_of(id)?;
            for key in ChangeLog::properties_of(&changes.dirty_properties, id) {
                self.backend.update_property(&self.pending_property_row(key)?)?;
            }
            self.remove_properties_of(id)?;
        }
        debug!("flushed dirty nodes");

        for id in changes.removed_nodes.iter() {
            match self.backend.remove_node(id) {
                Err(StoreError::NodeNotFound(_)) => {}
                other => other?,
            }
            self.remove_properties_of(id)?;
        }
        debug!("flushed removed nodes");

        self.changes.clear();
        Ok(())
    }

    fn add_properties_of(&self, id: &NodeId) -> SessionResult<()> {
        for key in ChangeLog::properties_of(&self.changes.new_properties, id) {
            let row = self.pending_property_row(key)?;
            match self.backend.add_property(&row) {
                Err(StoreError::Duplicate(_)) => self.backend.update_property(&row)?,
                other => other?,
            }
        }
        Ok(())
    }

    fn remove_properties_of(&self, id: &NodeId) -> SessionResult<()> {
        for key in ChangeLog::properties_of(&self.changes.removed_properties, id) {
            match self.backend.remove_property(&key.node, &key.name) {
                Err(StoreError::PropertyNotFound { .. }) => {}
                other => other?,
            }
        }
        Ok(())
    }

    fn pending_property_row(&self, key: &PropertyKey) -> SessionResult<PropertyRow> {
        self.loaded_node(&key.node)?
            .property(&key.name)
            .map(|p| p.to_row())
            .ok_or_else(|| SessionError::Repository(format!("pending property {key} is missing")))
    }

    /// Refuse to remove nodes that something outside the removal set still
    /// references.
    fn validate_pending_changes(&self) -> SessionResult<()> {
        let removed = &self.changes.removed_nodes;
        for id in removed.iter() {
            if !self.backend.is_reference_target(id)? {
                continue;
            }
            let rows = self
                .backend
                .raw_properties_of_typed_value(None, PropertyType::Reference, id)?;
            if let Some(row) = rows.iter().find(|row| self.row_still_references(row, id)) {
                warn!(node = %id, referrer = %row.parent, property = %row.name, "referential integrity violation");
                return Err(SessionError::ReferentialIntegrity(*id));
            }
        }

        // References set in this session that have not been stored yet.
        for node in self.nodes.values() {
            for property in node.properties() {
                if let Some(target) = removed
                    .iter()
                    .find(|target| property.references(PropertyType::Reference, target))
                {
                    warn!(node = %target, referrer = %node.identifier(), property = %property.name(), "referential integrity violation");
                    return Err(SessionError::ReferentialIntegrity(*target));
                }
            }
        }
        Ok(())
    }

    /// Whether a stored reference row will still point at `target` after
    /// this session's changes are applied.
    fn row_still_references(&self, row: &PropertyRow, target: &NodeId) -> bool {
        if self.changes.removed_nodes.contains(&row.parent) {
            return false;
        }
        match self.nodes.get(&row.parent) {
            Some(node) => node
                .property(&row.name)
                .is_some_and(|p| p.references(PropertyType::Reference, target)),
            None => true,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Discard the identity map and all pending changes. With
    /// `keep_changes` nothing happens.
    pub fn refresh(&mut self, keep_changes: bool) -> SessionResult<()> {
        self.check_live()?;
        if keep_changes {
            return Ok(());
        }
        debug!(
            workspace = %self.workspace,
            discarded = !self.changes.is_empty(),
            "refreshing session"
        );
        self.nodes.clear();
        self.root = None;
        self.changes.clear();
        Ok(())
    }

    /// Disconnect the backend and release everything the session holds.
    pub fn logout(&mut self) -> SessionResult<()> {
        self.check_live()?;
        if !self.changes.is_empty() {
            warn!(workspace = %self.workspace, "logging out with unsaved changes");
        }
        self.backend.disconnect()?;
        self.live = false;
        self.nodes.clear();
        self.root = None;
        self.changes.clear();
        info!(workspace = %self.workspace, "logged out");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Namespaces
    // -----------------------------------------------------------------------

    pub fn namespace_registry(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    pub fn namespace_registry_mut(&mut self) -> SessionResult<&mut NamespaceRegistry> {
        self.check_live()?;
        Ok(&mut self.namespaces)
    }

    /// Remap `uri` to `prefix` for this session only.
    pub fn set_namespace_prefix(&mut self, prefix: &str, uri: &str) -> SessionResult<()> {
        self.check_live()?;
        if prefix
            .get(..3)
            .is_some_and(|head| head.eq_ignore_ascii_case("xml"))
        {
            return Err(NamespaceError::Reserved(prefix.to_string()).into());
        }
        if prefix.is_empty() {
            return Err(NamespaceError::EmptyPrefix.into());
        }
        if uri.is_empty() {
            return Err(NamespaceError::EmptyUri.into());
        }
        if !self.namespaces.has_uri(uri) {
            return Err(NamespaceError::UnknownUri(uri.to_string()).into());
        }
        self.local_namespaces.retain(|_, mapped| mapped != uri);
        self.local_namespaces.insert(prefix.to_string(), uri.to_string());
        debug!(prefix, uri, "remapped namespace for session");
        Ok(())
    }

    /// Prefixes in effect for this session: registry entries not shadowed
    /// by a local remapping, then the local prefixes.
    pub fn namespace_prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .namespaces
            .entries()
            .into_iter()
            .filter(|(prefix, uri)| !self.is_shadowed(prefix, uri))
            .map(|(prefix, _)| prefix)
            .collect();
        prefixes.extend(self.local_namespaces.keys().cloned());
        prefixes
    }

    pub fn namespace_uri(&self, prefix: &str) -> SessionResult<String> {
        if let Some(uri) = self.local_namespaces.get(prefix) {
            return Ok(uri.clone());
        }
        let uri = self.namespaces.uri(prefix)?;
        if self.is_shadowed(prefix, &uri) {
            return Err(NamespaceError::UnknownPrefix(prefix.to_string()).into());
        }
        Ok(uri)
    }

    pub fn namespace_prefix(&self, uri: &str) -> SessionResult<String> {
        if let Some((prefix, _)) = self.local_namespaces.iter().find(|(_, u)| u.as_str() == uri) {
            return Ok(prefix.clone());
        }
        Ok(self.namespaces.prefix(uri)?)
    }

    fn is_shadowed(&self, prefix: &str, uri: &str) -> bool {
        self.local_namespaces.contains_key(prefix)
            || self.local_namespaces.values().any(|mapped| mapped == uri)
    }

    // -----------------------------------------------------------------------
    // Unsupported surface
    // -----------------------------------------------------------------------

    pub fn import_xml(&mut self, _parent_abs_path: &str, _xml: &str) -> SessionResult<()> {
        unsupported("XML import")
    }

    pub fn move_item(&mut self, _src_abs_path: &str, _dest_abs_path: &str) -> SessionResult<()> {
        unsupported("moving items")
    }

    pub fn check_permission(&self, _abs_path: &str, _actions: &str) -> SessionResult<()> {
        unsupported("access control")
    }

    pub fn lock(&mut self, _abs_path: &str, _deep: bool) -> SessionResult<()> {
        unsupported("locking")
    }

    pub fn query(&self, _statement: &str, _language: &str) -> SessionResult<Vec<NodeId>> {
        unsupported("query execution")
    }

    pub fn checkin(&mut self, _abs_path: &str) -> SessionResult<()> {
        unsupported("versioning")
    }
}

fn unsupported<T>(what: &str) -> SessionResult<T> {
    Err(SessionError::UnsupportedRepositoryOperation(format!(
        "{what} is not supported"
    )))
}

impl ConversionContext for Session {
    fn has_identifier(&self, id: &NodeId) -> TypeResult<bool> {
        Session::has_identifier(self, id).map_err(|e| TypeError::Lookup(e.to_string()))
    }

    fn is_registered_prefix(&self, prefix: &str) -> TypeResult<bool> {
        Ok(self.namespace_prefixes().iter().any(|p| p == prefix))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("workspace", &self.workspace)
            .field("live", &self.live)
            .field("loaded_nodes", &self.nodes.len())
            .field("pending_changes", &!self.changes.is_empty())
            .finish()
    }
}
