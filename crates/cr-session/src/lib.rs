//! Sessions over a hierarchical content repository.
//!
//! A [`Session`] turns the raw rows of a [`cr_store::StorageBackend`] into
//! a tree of typed [`Node`]s and [`Property`]s. It keeps one in-memory
//! instance per identifier, tracks every mutation as new, dirty or removed,
//! and writes them back on [`Session::save`].
//!
//! # Key Types
//!
//! - [`Repository`] -- hands out sessions for the configured workspace
//! - [`Session`] -- identity map, unit of work and the node/property API
//! - [`Node`] / [`Property`] -- the in-memory tree
//! - [`Item`] / [`ResolveMode`] -- results and modes of path resolution
//! - [`ChangeLog`] -- the pending new, dirty and removed sets
//! - [`RepositoryConfig`] -- workspace, defaults and save-time checks
//!
//! # Design Rules
//!
//! 1. Nodes reference parents and children by identifier only.
//! 2. Names and references are validated when set, not at save time.
//! 3. `save` validates before it writes and clears pending changes only
//!    after everything has been written.
//! 4. A node or property created and removed in the same session never
//!    reaches the backend.

pub mod changes;
pub mod config;
pub mod error;
pub mod items;
pub mod node;
pub mod path_parser;
pub mod property;
pub mod repository;
pub mod session;

#[cfg(test)]
mod testing;

pub use changes::{ChangeLog, ChangeSet};
pub use config::RepositoryConfig;
pub use error::{SessionError, SessionResult};
pub use node::{Node, ParentRef};
pub use path_parser::{Item, ResolveMode};
pub use property::{Property, PropertyKey, PropertyValues, JCR_MIXIN_TYPES, JCR_PRIMARY_TYPE, JCR_UUID};
pub use repository::Repository;
pub use session::Session;
