//! Namespace registry for the content repository.
//!
//! Maps namespace prefixes to URIs. The JCR built-ins (`jcr`, `nt`, `mix`,
//! `xml` and the empty prefix) are fixed; custom mappings are loaded from
//! and written through to a [`cr_store::StorageBackend`].
//!
//! # Key Types
//!
//! - [`NamespaceRegistry`] -- the prefix/URI table
//! - [`NamespaceError`] -- rejected registrations and unknown entries

pub mod error;
pub mod registry;

pub use error::{NamespaceError, NamespaceResult};
pub use registry::{NamespaceRegistry, BUILTIN_NAMESPACES, NS_JCR, NS_MIX, NS_NT, NS_SV, NS_XML};
