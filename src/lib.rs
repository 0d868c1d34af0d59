//! # Wireflow Vault
//!
//! The durability core of the wireflow workflow editor: per-document version
//! snapshots taken on every overwrite, full-tree archival backups, retention
//! pruning, and restore paths for both.
//!
//! ## Core Concepts
//!
//! - **Documents**: one JSON file per workflow under the data root
//! - **Version entries**: the *previous* state of a document, captured before
//!   every overwrite, retained up to a per-document cap
//! - **Archives**: point-in-time tar.gz copies of the whole data root, built
//!   copy-then-pack so a write in progress is never captured
//! - **Restore**: safety-archive → wipe → extract, never without a named
//!   recovery point
//!
//! ## Example
//!
//! ```ignore
//! use wireflow_vault::{Document, DocumentId, Vault, VaultConfig};
//!
//! let vault = Vault::open(VaultConfig {
//!     path: "./data".into(),
//!     ..Default::default()
//! })?;
//!
//! // Overwrites capture the prior state automatically
//! let id = DocumentId::new("wf-1758279897913")?;
//! vault.put_document(&Document::new(id.clone(), "Release pipeline"))?;
//!
//! // Full backup, listed newest first
//! let archive = vault.create_backup()?;
//! let summary = vault.inspect_backup(&archive.file_name())?;
//! ```

pub mod archive;
pub mod documents;
pub mod error;
pub mod restore;
pub mod timekey;
pub mod types;
pub mod vault;
pub mod versions;

// Re-exports
pub use archive::{ArchiveBuilder, ArchiveCatalog, ArchiveDescriptor, ArchiveName};
pub use documents::DocumentStore;
pub use error::{RestoreStage, Result, VaultError};
pub use restore::{RestoreEngine, RestoreReport};
pub use timekey::TimeKey;
pub use types::{Document, DocumentId, Owner, Summary, Tag, Team};
pub use vault::{Vault, VaultConfig, VersionInfo};
pub use versions::{VersionKey, VersionLedger, KEEP_LIMIT};
