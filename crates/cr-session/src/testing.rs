//! Shared fixtures for the session tests.

use std::sync::{Arc, Mutex};

use cr_store::{
    InMemoryBackend, NamespaceRow, NodeRow, PropertyRow, StorageBackend, StoreError, StoreResult,
};
use cr_types::{NodeId, PropertyType};

use crate::config::RepositoryConfig;
use crate::repository::Repository;
use crate::session::Session;

pub fn repository() -> Repository {
    Repository::new(Arc::new(InMemoryBackend::new()), RepositoryConfig::default())
}

pub fn session() -> Session {
    repository().login(None).unwrap()
}

/// Backend wrapper that records every mutating call.
#[derive(Default)]
pub struct RecordingBackend {
    inner: InMemoryBackend,
    calls: Mutex<Vec<String>>,
    fail_next: Mutex<Option<String>>,
}

impl RecordingBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("lock poisoned").clear();
    }

    /// Make the next mutating call starting with `call` fail once.
    pub fn fail_next(&self, call: &str) {
        *self.fail_next.lock().expect("lock poisoned") = Some(call.to_string());
    }

    fn record(&self, call: String) -> StoreResult<()> {
        let mut fail_next = self.fail_next.lock().expect("lock poisoned");
        let fails = fail_next.as_deref().is_some_and(|prefix| call.starts_with(prefix));
        self.calls.lock().expect("lock poisoned").push(call);
        if fails {
            *fail_next = None;
            return Err(StoreError::NotConnected);
        }
        Ok(())
    }
}

impl StorageBackend for RecordingBackend {
    fn connect(&self) -> StoreResult<()> {
        self.inner.connect()
    }

    fn disconnect(&self) -> StoreResult<()> {
        self.inner.disconnect()
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn raw_root_node(&self) -> StoreResult<Option<NodeRow>> {
        self.inner.raw_root_node()
    }

    fn raw_node_by_identifier(&self, id: &NodeId) -> StoreResult<Option<NodeRow>> {
        self.inner.raw_node_by_identifier(id)
    }

    fn identifiers_of_sub_nodes(&self, id: &NodeId) -> StoreResult<Vec<NodeId>> {
        self.inner.identifiers_of_sub_nodes(id)
    }

    fn has_child_node_with_name(&self, id: &NodeId, name: &str) -> StoreResult<bool> {
        self.inner.has_child_node_with_name(id, name)
    }

    fn has_identifier(&self, id: &NodeId) -> StoreResult<bool> {
        self.inner.has_identifier(id)
    }

    fn is_reference_target(&self, id: &NodeId) -> StoreResult<bool> {
        self.inner.is_reference_target(id)
    }

    fn add_node(&self, row: &NodeRow) -> StoreResult<()> {
        self.record(format!("add_node {}", row.name))?;
        self.inner.add_node(row)
    }

    fn update_node(&self, row: &NodeRow) -> StoreResult<()> {
        self.record(format!("update_node {}", row.name))?;
        self.inner.update_node(row)
    }

    fn remove_node(&self, id: &NodeId) -> StoreResult<()> {
        self.record(format!("remove_node {id}"))?;
        self.inner.remove_node(id)
    }

    fn raw_properties_of_node(&self, id: &NodeId) -> StoreResult<Vec<PropertyRow>> {
        self.inner.raw_properties_of_node(id)
    }

    fn add_property(&self, row: &PropertyRow) -> StoreResult<()> {
        self.record(format!("add_property {}", row.name))?;
        self.inner.add_property(row)
    }

    fn update_property(&self, row: &PropertyRow) -> StoreResult<()> {
        self.record(format!("update_property {}", row.name))?;
        self.inner.update_property(row)
    }

    fn remove_property(&self, parent: &NodeId, name: &str) -> StoreResult<()> {
        self.record(format!("remove_property {name}"))?;
        self.inner.remove_property(parent, name)
    }

    fn raw_properties_of_typed_value(
        &self,
        name: Option<&str>,
        ty: PropertyType,
        target: &NodeId,
    ) -> StoreResult<Vec<PropertyRow>> {
        self.inner.raw_properties_of_typed_value(name, ty, target)
    }

    fn raw_namespaces(&self) -> StoreResult<Vec<NamespaceRow>> {
        self.inner.raw_namespaces()
    }

    fn add_namespace(&self, prefix: &str, uri: &str) -> StoreResult<()> {
        self.inner.add_namespace(prefix, uri)
    }

    fn update_namespace_prefix(&self, new_prefix: &str, uri: &str) -> StoreResult<()> {
        self.inner.update_namespace_prefix(new_prefix, uri)
    }

    fn update_namespace_uri(&self, prefix: &str, new_uri: &str) -> StoreResult<()> {
        self.inner.update_namespace_uri(prefix, new_uri)
    }

    fn delete_namespace(&self, prefix: &str) -> StoreResult<()> {
        self.inner.delete_namespace(prefix)
    }
}

/// A repository over a recording backend, plus the backend handle.
pub fn recording_repository() -> (Repository, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::default());
    let repo = Repository::new(backend.clone(), RepositoryConfig::default());
    (repo, backend)
}
