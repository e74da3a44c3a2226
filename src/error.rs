//!
//! Error types for the conversion core. Recoverable issues are collected as
//! warnings on the result structs; only unrecoverable failures surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not a valid DOCX archive: {0}")]
    InvalidDocx(String),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<quick_xml::Error> for ConvertError {
    fn from(err: quick_xml::Error) -> Self {
        ConvertError::Xml(err.to_string())
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;
