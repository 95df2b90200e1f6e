//! Raw row storage for the content repository.
//!
//! The session layer never touches persistence directly. Everything it needs
//! (node rows, property rows, namespace rows, identifier and reverse
//! reference lookups) goes through the [`StorageBackend`] trait defined
//! here.
//!
//! # Storage Backends
//!
//! - [`InMemoryBackend`] -- `RwLock`-guarded tables for tests and embedding,
//!   with JSON snapshot files for the command line
//!
//! # Design Rules
//!
//! 1. Backends deal in rows, never in session objects.
//! 2. "Not found" on a lookup is `Ok(None)`; on a mutation it is an error.
//! 3. Child identifiers come back in insertion order.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod rows;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBackend;
pub use rows::{NamespaceRow, NodeRow, PropertyRow, RowValues};
pub use traits::StorageBackend;
