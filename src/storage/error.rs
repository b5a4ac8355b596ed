use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed corpus {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Duplicate document id {0} in corpus")]
    DuplicateDocument(crate::DocId),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation {operation} failed: {cause}")]
    Backend { operation: String, cause: String },
}

pub type StorageResult<T> = Result<T, StorageError>;
