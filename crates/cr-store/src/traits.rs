//! The [`StorageBackend`] trait: raw row CRUD consumed by the session.

use cr_types::{NodeId, PropertyType};

use crate::error::StoreResult;
use crate::rows::{NamespaceRow, NodeRow, PropertyRow};

/// Storage backend for one workspace.
///
/// Implementations must be thread-safe (`Send + Sync`). The session is the
/// only caller and it never interprets storage state other than through
/// these methods. Lookups return `Ok(None)` or an empty list when nothing
/// matches; mutations of rows that do not exist are errors.
pub trait StorageBackend: Send + Sync {
    /// Open the connection. Data calls before this fail.
    fn connect(&self) -> StoreResult<()>;

    /// Close the connection.
    fn disconnect(&self) -> StoreResult<()>;

    fn is_connected(&self) -> bool;

    // ---- Nodes ----

    /// Fetch the root node row of the workspace.
    fn raw_root_node(&self) -> StoreResult<Option<NodeRow>>;

    /// Fetch a node row by identifier.
    fn raw_node_by_identifier(&self, id: &NodeId) -> StoreResult<Option<NodeRow>>;

    /// Identifiers of the direct children of a node, in insertion order.
    fn identifiers_of_sub_nodes(&self, id: &NodeId) -> StoreResult<Vec<NodeId>>;

    /// Whether a node has at least one child with this name.
    fn has_child_node_with_name(&self, id: &NodeId, name: &str) -> StoreResult<bool>;

    /// Whether a node row with this identifier exists.
    fn has_identifier(&self, id: &NodeId) -> StoreResult<bool>;

    /// Whether any REFERENCE property points at this identifier.
    fn is_reference_target(&self, id: &NodeId) -> StoreResult<bool>;

    fn add_node(&self, row: &NodeRow) -> StoreResult<()>;

    fn update_node(&self, row: &NodeRow) -> StoreResult<()>;

    fn remove_node(&self, id: &NodeId) -> StoreResult<()>;

    // ---- Properties ----

    /// All property rows of a node.
    fn raw_properties_of_node(&self, id: &NodeId) -> StoreResult<Vec<PropertyRow>>;

    fn add_property(&self, row: &PropertyRow) -> StoreResult<()>;

    /// Replace type, multiplicity and values of an existing property.
    fn update_property(&self, row: &PropertyRow) -> StoreResult<()>;

    fn remove_property(&self, parent: &NodeId, name: &str) -> StoreResult<()>;

    /// Reverse lookup: property rows of type `ty` holding `target` among
    /// their values, optionally restricted to one property name. Ordered by
    /// owning node, then name.
    fn raw_properties_of_typed_value(
        &self,
        name: Option<&str>,
        ty: PropertyType,
        target: &NodeId,
    ) -> StoreResult<Vec<PropertyRow>>;

    // ---- Namespaces ----

    /// All custom namespace mappings.
    fn raw_namespaces(&self) -> StoreResult<Vec<NamespaceRow>>;

    fn add_namespace(&self, prefix: &str, uri: &str) -> StoreResult<()>;

    /// Rebind the row holding `uri` to `new_prefix`.
    fn update_namespace_prefix(&self, new_prefix: &str, uri: &str) -> StoreResult<()>;

    /// Rebind the row holding `prefix` to `new_uri`.
    fn update_namespace_uri(&self, prefix: &str, new_uri: &str) -> StoreResult<()>;

    fn delete_namespace(&self, prefix: &str) -> StoreResult<()>;
}
