use serde::{Deserialize, Serialize};

/// Which XML form to produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportView {
    /// `sv:node` / `sv:property` elements that keep every type.
    #[default]
    System,
    /// One element per node, single-valued properties as attributes.
    Document,
}

/// Export settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Write BINARY properties without their content.
    pub skip_binary: bool,
    /// Export only the start node, not its descendants.
    pub no_recurse: bool,
    /// Spaces per nesting level; 0 writes everything on one line.
    pub indent: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            skip_binary: false,
            no_recurse: false,
            indent: 2,
        }
    }
}

impl ExportOptions {
    /// Single-line output, as used when comparing exports.
    pub fn compact() -> Self {
        Self {
            indent: 0,
            ..Self::default()
        }
    }

    pub fn with_skip_binary(mut self, skip: bool) -> Self {
        self.skip_binary = skip;
        self
    }

    pub fn with_no_recurse(mut self, no_recurse: bool) -> Self {
        self.no_recurse = no_recurse;
        self
    }
}
