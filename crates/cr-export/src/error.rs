use cr_session::SessionError;
use cr_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("value could not be serialized: {0}")]
    Value(#[from] TypeError),

    #[error("XML writer error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export produced invalid UTF-8: {0}")]
    Encoding(String),
}

pub type ExportResult<T> = Result<T, ExportError>;
