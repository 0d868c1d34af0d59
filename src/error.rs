//! Error types for the vault.

use crate::types::DocumentId;
use std::fmt;
use thiserror::Error;

/// Restore stage reached when a restore failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreStage {
    Wipe,
    Recreate,
    Extract,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreStage::Wipe => write!(f, "wipe"),
            RestoreStage::Recreate => write!(f, "recreate"),
            RestoreStage::Extract => write!(f, "extract"),
        }
    }
}

/// Main error type for vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Archive not found: {0}")]
    ArchiveNotFound(String),

    #[error("Corrupt entry: {0}")]
    CorruptEntry(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Vault is locked by another process")]
    Locked,

    /// The live tree may be partial; re-run restore against `safety_archive`.
    #[error("Restore failed during {stage} (recover from safety archive {safety_archive}): {source}")]
    RestoreFailed {
        stage: RestoreStage,
        safety_archive: String,
        #[source]
        source: Box<VaultError>,
    },
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
