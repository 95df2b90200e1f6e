//! XML export of content repository subtrees.
//!
//! Two forms are supported. The system view keeps every property with its
//! type and multiplicity and can be read back without loss. The document
//! view is the readable form: elements named after nodes, single-valued
//! properties as attributes.
//!
//! # Key Types
//!
//! - [`ExportOptions`] -- binary skipping, recursion and indentation
//! - [`ExportView`] -- system or document view
//! - [`ExportError`] -- session, value and XML writer failures
//!
//! # Design Rules
//!
//! 1. Exports read through a [`cr_session::Session`], so unsaved changes
//!    are exported too.
//! 2. The top element declares every namespace prefix in effect for the
//!    session; nested elements declare none.
//! 3. BINARY values are base64 unless skipped, in which case they are
//!    written empty.

pub mod document_view;
pub mod error;
pub mod options;
pub mod system_view;

mod names;
mod snapshot;
mod writer;

pub use document_view::export_document_view;
pub use error::{ExportError, ExportResult};
pub use options::{ExportOptions, ExportView};
pub use system_view::export_system_view;

use cr_session::Session;

/// Export into a string in the requested view.
pub fn export_to_string(
    session: &mut Session,
    abs_path: &str,
    view: ExportView,
    options: &ExportOptions,
) -> ExportResult<String> {
    let mut buf = Vec::new();
    match view {
        ExportView::System => export_system_view(session, abs_path, &mut buf, options)?,
        ExportView::Document => export_document_view(session, abs_path, &mut buf, options)?,
    }
    String::from_utf8(buf).map_err(|e| ExportError::Encoding(e.to_string()))
}
