//! Filesystem side of MIDNAM editing: load a document, merge or patch it,
//! normalise, then write it back atomically with a timestamped backup.

mod file;
mod lock;
mod request;
mod store;

use std::path::{Path, PathBuf};

use midnam_core::MidnamError;
use serde::Serialize;
use thiserror::Error;

pub use file::{backup_path_for, backup_stamp, load_document, save_document, SaveOptions};
pub use lock::PathLocks;
pub use request::{ErrorResponse, PatchOutcome, PatchRequest, SaveOutcome, StructureRequest};
pub use store::DocumentStore;

/// Error type produced by store operations. Every variant that touches a
/// document names its path.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("malformed document {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: MidnamError,
    },
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("patch '{patch}' not found in bank '{bank}' of {}", path.display())]
    PatchNotFound {
        path: PathBuf,
        bank: String,
        patch: String,
    },
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Caller-facing error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFoundError,
    MalformedDocumentError,
    ValidationError,
    PatchNotFoundError,
    IoError,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFoundError,
            StoreError::Malformed { .. } => ErrorKind::MalformedDocumentError,
            StoreError::Validation(_) => ErrorKind::ValidationError,
            StoreError::PatchNotFound { .. } => ErrorKind::PatchNotFoundError,
            StoreError::Io { .. } => ErrorKind::IoError,
        }
    }

    /// Document the error concerns, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            StoreError::NotFound { path }
            | StoreError::Malformed { path, .. }
            | StoreError::PatchNotFound { path, .. }
            | StoreError::Io { path, .. } => Some(path.as_path()),
            StoreError::Validation(_) => None,
        }
    }

    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn malformed(path: &Path, source: impl Into<MidnamError>) -> StoreError {
        StoreError::Malformed {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_paths() {
        let err = StoreError::NotFound {
            path: PathBuf::from("a.midnam"),
        };
        assert_eq!(err.kind(), ErrorKind::NotFoundError);
        assert_eq!(err.path(), Some(Path::new("a.midnam")));
        assert!(err.to_string().contains("a.midnam"));

        let err = StoreError::malformed(Path::new("b.midnam"), MidnamError::NoDeviceRecord);
        assert_eq!(err.kind(), ErrorKind::MalformedDocumentError);
        assert!(err.to_string().contains("b.midnam"));

        let err = StoreError::Validation("missing file_path".into());
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.path().is_none());
    }

    #[test]
    fn kind_serialises_as_name() {
        let json = serde_json::to_string(&ErrorKind::PatchNotFoundError).expect("serialise");
        assert_eq!(json, "\"PatchNotFoundError\"");
    }
}
