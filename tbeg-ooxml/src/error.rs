//! PURPOSE: Error type for ZIP/XML package IO, converts into [`tbeg_model::TbegError::PackageIo`]
//! at the facade boundary the same way `PersistenceError` wraps
//! `rust_xlsxwriter`/`calamine` errors in the corpus.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OoxmlError>;

#[derive(Debug, Error)]
pub enum OoxmlError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("part not found: {0}")]
    PartNotFound(String),

    #[error("part is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

impl From<quick_xml::Error> for OoxmlError {
    fn from(err: quick_xml::Error) -> Self {
        OoxmlError::Xml(err.to_string())
    }
}

impl From<OoxmlError> for tbeg_model::TbegError {
    fn from(err: OoxmlError) -> Self {
        tbeg_model::TbegError::PackageIo(err.to_string())
    }
}
