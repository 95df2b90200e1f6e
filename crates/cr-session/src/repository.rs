use std::sync::Arc;

use cr_namespace::NamespaceRegistry;
use cr_store::StorageBackend;
use tracing::info;

use crate::config::RepositoryConfig;
use crate::error::{SessionError, SessionResult};
use crate::session::Session;

/// Static descriptors reported by every repository.
const DESCRIPTORS: &[(&str, &str)] = &[
    ("jcr.specification.version", "2.0"),
    ("jcr.specification.name", "Content Repository for Java Technology API"),
    ("jcr.repository.vendor", "MapleAI"),
    ("jcr.repository.vendor.url", "https://github.com/mapleaiorg/cr"),
    ("jcr.repository.name", "cr"),
    ("jcr.repository.version", env!("CARGO_PKG_VERSION")),
    ("level.1.supported", "true"),
    ("level.2.supported", "true"),
    ("option.transactions.supported", "false"),
    ("option.versioning.supported", "false"),
    ("option.observation.supported", "false"),
    ("option.locking.supported", "false"),
    ("option.query.sql.supported", "false"),
    ("option.access.control.supported", "false"),
    ("option.xml.import.supported", "false"),
    ("option.xml.export.supported", "true"),
    ("query.xpath.pos.index", "false"),
    ("query.xpath.doc.order", "false"),
];

/// Entry point: hands out sessions over one storage backend.
pub struct Repository {
    backend: Arc<dyn StorageBackend>,
    config: RepositoryConfig,
}

impl Repository {
    pub fn new(backend: Arc<dyn StorageBackend>, config: RepositoryConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Open a session on `workspace`, or on the default workspace.
    ///
    /// Connects the backend and loads the namespace registry. Sessions
    /// share the backend, so logging out of one disconnects it for all of
    /// them until the next login.
    pub fn login(&self, workspace: Option<&str>) -> SessionResult<Session> {
        let name = workspace.unwrap_or(&self.config.default_workspace);
        if name != self.config.default_workspace {
            return Err(SessionError::NoSuchWorkspace(name.to_string()));
        }
        self.backend.connect()?;
        let namespaces = NamespaceRegistry::load(Arc::clone(&self.backend))?;
        info!(workspace = name, "logged in");
        Ok(Session::new(
            name,
            Arc::clone(&self.backend),
            namespaces,
            self.config.clone(),
        ))
    }

    pub fn descriptor_keys(&self) -> Vec<&'static str> {
        DESCRIPTORS.iter().map(|(key, _)| *key).collect()
    }

    pub fn descriptor(&self, key: &str) -> Option<&'static str> {
        DESCRIPTORS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| *value)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("default_workspace", &self.config.default_workspace)
            .field("connected", &self.backend.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_store::InMemoryBackend;

    fn repository() -> Repository {
        Repository::new(Arc::new(InMemoryBackend::new()), RepositoryConfig::default())
    }

    #[test]
    fn login_default_workspace() {
        let repo = repository();
        let session = repo.login(None).unwrap();
        assert_eq!(session.workspace_name(), "default");
        assert!(session.is_live());

        let named = repo.login(Some("default")).unwrap();
        assert_eq!(named.workspace_name(), "default");
    }

    #[test]
    fn unknown_workspace_is_rejected() {
        let repo = repository();
        assert!(matches!(
            repo.login(Some("live")),
            Err(SessionError::NoSuchWorkspace(name)) if name == "live"
        ));
    }

    #[test]
    fn descriptors() {
        let repo = repository();
        assert_eq!(repo.descriptor("jcr.specification.version"), Some("2.0"));
        assert_eq!(repo.descriptor("option.versioning.supported"), Some("false"));
        assert_eq!(repo.descriptor("no.such.key"), None);
        assert!(repo.descriptor_keys().contains(&"jcr.repository.name"));
    }
}
