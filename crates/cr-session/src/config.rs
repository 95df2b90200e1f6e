use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Configuration for a repository and the sessions it hands out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Workspace used when `login` is called without a name. It is also
    /// the only workspace the repository serves.
    pub default_workspace: String,
    /// Primary type for nodes created without an explicit type by tools.
    pub default_node_type: String,
    /// Whether `save` refuses to remove nodes that are still referenced.
    pub check_referential_integrity: bool,
    /// Node type of the root row in a freshly created store.
    pub root_node_type: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_workspace: "default".into(),
            default_node_type: "nt:unstructured".into(),
            check_referential_integrity: true,
            root_node_type: "rep:root".into(),
        }
    }
}

impl RepositoryConfig {
    /// Skips the referential integrity check on save. Meant for bulk
    /// imports and repair tools.
    pub fn lenient() -> Self {
        Self {
            check_referential_integrity: false,
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing keys take their default.
    pub fn from_toml_str(text: &str) -> SessionResult<Self> {
        toml::from_str(text).map_err(|e| SessionError::Repository(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> SessionResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Repository(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SessionResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SessionError::Repository(format!("cannot encode config: {e}")))
    }
}
