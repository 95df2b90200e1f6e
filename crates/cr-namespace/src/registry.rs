use std::collections::BTreeMap;
use std::sync::Arc;

use cr_store::StorageBackend;
use tracing::{debug, info, warn};

use crate::error::{NamespaceError, NamespaceResult};

pub const NS_JCR: &str = "http://www.jcp.org/jcr/1.0";
pub const NS_NT: &str = "http://www.jcp.org/jcr/nt/1.0";
pub const NS_MIX: &str = "http://www.jcp.org/jcr/mix/1.0";
pub const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";
/// System view namespace. Used by export only, never registered.
pub const NS_SV: &str = "http://www.jcp.org/jcr/sv/1.0";

/// The fixed `(prefix, uri)` pairs every repository knows.
pub const BUILTIN_NAMESPACES: [(&str, &str); 5] = [
    ("jcr", NS_JCR),
    ("nt", NS_NT),
    ("mix", NS_MIX),
    ("xml", NS_XML),
    ("", ""),
];

/// Prefix/URI table: immutable built-ins plus custom entries persisted
/// through the storage backend.
///
/// Every successful mutation is written to the backend before the in-memory
/// table changes, so a failing backend leaves the registry untouched.
pub struct NamespaceRegistry {
    backend: Arc<dyn StorageBackend>,
    /// Custom mappings, prefix to URI.
    custom: BTreeMap<String, String>,
}

impl NamespaceRegistry {
    /// Load custom mappings from a connected backend.
    pub fn load(backend: Arc<dyn StorageBackend>) -> NamespaceResult<Self> {
        let custom: BTreeMap<String, String> = backend
            .raw_namespaces()?
            .into_iter()
            .map(|row| (row.prefix, row.uri))
            .collect();
        debug!(custom = custom.len(), "loaded namespace registry");
        Ok(Self { backend, custom })
    }

    /// Map `prefix` to `uri`.
    ///
    /// An existing mapping of `uri` is moved to `prefix`; an existing
    /// mapping of `prefix` is pointed at `uri`. Registering a pair that is
    /// already present does nothing.
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) -> NamespaceResult<()> {
        check_mutable_prefix(prefix)?;
        if uri.is_empty() {
            return Err(NamespaceError::EmptyUri);
        }
        if BUILTIN_NAMESPACES.iter().any(|(_, u)| *u == uri) {
            return Err(NamespaceError::Reserved(uri.to_string()));
        }

        if self.custom.get(prefix).map(String::as_str) == Some(uri) {
            return Ok(());
        }

        let prefix_of_uri = self
            .custom
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.clone());

        match prefix_of_uri {
            Some(old_prefix) => {
                // Both sides bound elsewhere: the prefix's old URI goes away.
                let displaced = self.custom.get(prefix).cloned();
                if displaced.is_some() {
                    self.backend.delete_namespace(prefix)?;
                }
                if let Err(e) = self.backend.update_namespace_prefix(prefix, uri) {
                    // Put the deleted row back so backend and table agree again.
                    if let Some(old_uri) = &displaced {
                        if let Err(restore) = self.backend.add_namespace(prefix, old_uri) {
                            warn!(prefix, uri = %old_uri, error = %restore, "could not restore namespace row");
                        }
                    }
                    return Err(e.into());
                }
                self.custom.remove(&old_prefix);
                info!(prefix, old_prefix = %old_prefix, uri, "rebound namespace prefix");
            }
            None if self.custom.contains_key(prefix) => {
                self.backend.update_namespace_uri(prefix, uri)?;
                info!(prefix, uri, "rebound namespace uri");
            }
            None => {
                self.backend.add_namespace(prefix, uri)?;
                info!(prefix, uri, "registered namespace");
            }
        }
        self.custom.insert(prefix.to_string(), uri.to_string());
        Ok(())
    }

    /// Remove a custom mapping.
    pub fn unregister_namespace(&mut self, prefix: &str) -> NamespaceResult<()> {
        check_mutable_prefix(prefix)?;
        if !self.custom.contains_key(prefix) {
            return Err(NamespaceError::UnknownPrefix(prefix.to_string()));
        }
        self.backend.delete_namespace(prefix)?;
        self.custom.remove(prefix);
        info!(prefix, "unregistered namespace");
        Ok(())
    }

    /// All prefixes, built-ins first.
    pub fn prefixes(&self) -> Vec<String> {
        BUILTIN_NAMESPACES
            .iter()
            .map(|(p, _)| p.to_string())
            .chain(self.custom.keys().cloned())
            .collect()
    }

    /// All URIs, built-ins first.
    pub fn uris(&self) -> Vec<String> {
        BUILTIN_NAMESPACES
            .iter()
            .map(|(_, u)| u.to_string())
            .chain(self.custom.values().cloned())
            .collect()
    }

    pub fn uri(&self, prefix: &str) -> NamespaceResult<String> {
        BUILTIN_NAMESPACES
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, u)| u.to_string())
            .or_else(|| self.custom.get(prefix).cloned())
            .ok_or_else(|| NamespaceError::UnknownPrefix(prefix.to_string()))
    }

    pub fn prefix(&self, uri: &str) -> NamespaceResult<String> {
        BUILTIN_NAMESPACES
            .iter()
            .find(|(_, u)| *u == uri)
            .map(|(p, _)| p.to_string())
            .or_else(|| {
                self.custom
                    .iter()
                    .find(|(_, u)| u.as_str() == uri)
                    .map(|(p, _)| p.clone())
            })
            .ok_or_else(|| NamespaceError::UnknownUri(uri.to_string()))
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.uri(prefix).is_ok()
    }

    pub fn has_uri(&self, uri: &str) -> bool {
        self.prefix(uri).is_ok()
    }

    /// `(prefix, uri)` pairs, built-ins first.
    pub fn entries(&self) -> Vec<(String, String)> {
        BUILTIN_NAMESPACES
            .iter()
            .map(|(p, u)| (p.to_string(), u.to_string()))
            .chain(self.custom.iter().map(|(p, u)| (p.clone(), u.clone())))
            .collect()
    }
}

/// Reject prefixes that may never be registered or unregistered.
fn check_mutable_prefix(prefix: &str) -> NamespaceResult<()> {
    if prefix.is_empty() {
        return Err(NamespaceError::EmptyPrefix);
    }
    let reserved = BUILTIN_NAMESPACES.iter().any(|(p, _)| *p == prefix)
        || prefix
            .get(..3)
            .is_some_and(|head| head.eq_ignore_ascii_case("xml"));
    if reserved {
        return Err(NamespaceError::Reserved(prefix.to_string()));
    }
    Ok(())
}

impl std::fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceRegistry")
            .field("builtin", &BUILTIN_NAMESPACES.len())
            .field("custom", &self.custom)
            .finish()
    }
}
