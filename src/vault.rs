//! Main Vault struct tying all components together.

use crate::archive::{ArchiveBuilder, ArchiveCatalog, ArchiveDescriptor, ArchiveName};
use crate::documents::DocumentStore;
use crate::error::{Result, VaultError};
use crate::restore::{RestoreEngine, RestoreReport};
use crate::types::{Document, DocumentId, Owner, Summary, Tag, Team};
use crate::versions::{VersionKey, VersionLedger};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Subdirectory of the data root that owns archives.
const BACKUPS_DIR: &str = "backups";

/// Subdirectory of the backups directory that owns version entries.
const VERSIONS_DIR: &str = "versions";

/// Lock file, kept inside the backups domain so it is never archived or
/// wiped.
const LOCK_FILE: &str = "LOCK";

/// Vault configuration.
#[derive(Clone, Debug)]
pub struct VaultConfig {
    /// Data root; documents and metadata lists live directly under it.
    pub path: PathBuf,

    /// Write version entries gzip-compressed.
    pub compress_versions: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
            compress_versions: false,
        }
    }
}

/// One row of the admin version listing.
#[derive(Clone, Debug)]
pub struct VersionInfo {
    /// Version entry filename; the handle for fetch and restore.
    pub file: String,
    pub document_id: DocumentId,
    /// Workflow name read from the payload, falling back to the id when the
    /// payload cannot be read.
    pub name: String,
    /// Capture time, `YYYY-MM-DD HH:MM:SS`.
    pub captured_at: String,
    /// Position in the listing, newest = 1.
    pub ordinal: usize,
}

/// The durability core of the workflow store.
///
/// Provides a unified interface for:
/// - Document reads and writes with snapshot-before-overwrite versioning
/// - The metadata lists archived alongside documents
/// - Full-tree archival backups and their catalog
/// - Version and archive restore paths
///
/// Writes — document puts and deletes, metadata writes, archive builds, and
/// restores — are serialized behind a store-wide write lock so a snapshot and
/// the write it precedes are never interleaved with another writer, and so an
/// archive copy observes a settled tree.
pub struct Vault {
    config: VaultConfig,

    /// Lock file for exclusive access.
    _lock_file: File,

    documents: DocumentStore,
    ledger: VersionLedger,
    builder: ArchiveBuilder,
    catalog: ArchiveCatalog,
    restore: RestoreEngine,

    /// Lock for write operations.
    write_lock: Mutex<()>,
}

impl Vault {
    /// Open the vault at the configured data root, creating the directory
    /// structure if needed.
    pub fn open(config: VaultConfig) -> Result<Self> {
        let backups = config.path.join(BACKUPS_DIR);
        let versions = backups.join(VERSIONS_DIR);
        fs::create_dir_all(&versions)?;

        let lock_file = Self::acquire_lock(&backups)?;

        let documents = DocumentStore::new(&config.path)?;
        let ledger = VersionLedger::new(&versions, config.compress_versions)?;
        let builder = ArchiveBuilder::new(&config.path, &backups);
        let catalog = ArchiveCatalog::new(&backups);
        let restore = RestoreEngine::new(&config.path, &backups, &versions);

        Ok(Self {
            config,
            _lock_file: lock_file,
            documents,
            ledger,
            builder,
            catalog,
            restore,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    fn acquire_lock(backups: &Path) -> Result<File> {
        let lock_file = File::create(backups.join(LOCK_FILE))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| VaultError::Locked)?;
        Ok(lock_file)
    }

    // --- Document Operations ---

    /// Replace a document's current state, capturing the prior state in the
    /// version ledger first. Creating a document makes no version entry.
    pub fn put_document(&self, doc: &Document) -> Result<()> {
        let _lock = self.write_lock.lock();

        let prior = self.documents.get_bytes(&doc.id)?;
        self.ledger.snapshot(&doc.id, prior.as_deref())?;
        self.documents.put(doc)
    }

    /// Current state of a document.
    pub fn get_document(&self, id: &DocumentId) -> Result<Document> {
        self.documents.get(id)
    }

    /// Delete a document's current state. No version entry is created.
    pub fn delete_document(&self, id: &DocumentId) -> Result<bool> {
        let _lock = self.write_lock.lock();
        self.documents.delete(id)
    }

    /// All document ids, sorted.
    pub fn list_documents(&self) -> Result<Vec<DocumentId>> {
        self.documents.list()
    }

    // --- Metadata Lists ---

    pub fn read_tags(&self) -> Result<Vec<Tag>> {
        self.documents.read_tags()
    }

    pub fn write_tags(&self, tags: &[Tag]) -> Result<()> {
        let _lock = self.write_lock.lock();
        self.documents.write_tags(tags)
    }

    pub fn read_teams(&self) -> Result<Vec<Team>> {
        self.documents.read_teams()
    }

    pub fn write_teams(&self, teams: &[Team]) -> Result<()> {
        let _lock = self.write_lock.lock();
        self.documents.write_teams(teams)
    }

    pub fn read_owners(&self) -> Result<Vec<Owner>> {
        self.documents.read_owners()
    }

    pub fn write_owners(&self, owners: &[Owner]) -> Result<()> {
        let _lock = self.write_lock.lock();
        self.documents.write_owners(owners)
    }

    // --- Archive Operations ---

    /// Build a full archive of the live tree. Returns the catalogued name.
    pub fn create_backup(&self) -> Result<ArchiveName> {
        let _lock = self.write_lock.lock();
        self.builder.build()
    }

    /// List archives, newest first.
    pub fn list_backups(&self) -> Result<Vec<ArchiveDescriptor>> {
        self.catalog.list()
    }

    /// Summarize one archive's contents without touching live state.
    pub fn inspect_backup(&self, file_name: &str) -> Result<Summary> {
        let name = Self::parse_archive_name(file_name)?;
        self.catalog.inspect(&name)
    }

    /// Replace the live tree with an archive's contents. A safety archive of
    /// the current state is taken first; both success and failure name it.
    pub fn restore_backup(&self, file_name: &str) -> Result<RestoreReport> {
        let name = Self::parse_archive_name(file_name)?;
        let _lock = self.write_lock.lock();
        self.restore.restore(&self.builder, &name)
    }

    fn parse_archive_name(file_name: &str) -> Result<ArchiveName> {
        ArchiveName::parse(file_name)
            .ok_or_else(|| VaultError::InvalidName(format!("not an archive name: {}", file_name)))
    }

    // --- Version Operations ---

    /// List version entries, newest first: for one document, or across all
    /// documents (capped at the retention limit) when `id` is `None`.
    ///
    /// Display names are resolved by reading each payload; entries whose
    /// payload cannot be read fall back to the document id.
    pub fn list_versions(&self, id: Option<&DocumentId>) -> Result<Vec<VersionInfo>> {
        let keys = match id {
            Some(id) => self.ledger.list(id)?,
            None => self.ledger.list_all()?,
        };

        let infos = keys
            .into_iter()
            .enumerate()
            .map(|(idx, key)| {
                let name = match self.ledger.read(&key) {
                    Ok(doc) if !doc.name.is_empty() => doc.name,
                    Ok(_) => key.document_id().to_string(),
                    Err(e) => {
                        debug!(entry = %key, error = %e, "version payload unreadable, using id as name");
                        key.document_id().to_string()
                    }
                };
                VersionInfo {
                    file: key.file_name(),
                    document_id: key.document_id().clone(),
                    name,
                    captured_at: key.time_key().display_date(),
                    ordinal: idx + 1,
                }
            })
            .collect();

        Ok(infos)
    }

    /// Fetch one version's content.
    pub fn get_version(&self, file_name: &str) -> Result<Document> {
        self.ledger.read(&Self::parse_version_key(file_name)?)
    }

    /// Write a version back as the current state of its owning document,
    /// without minting a new version entry.
    pub fn restore_version(&self, file_name: &str) -> Result<()> {
        let key = Self::parse_version_key(file_name)?;
        let _lock = self.write_lock.lock();
        self.ledger.restore_to_live(&key, &self.documents)
    }

    fn parse_version_key(file_name: &str) -> Result<VersionKey> {
        VersionKey::parse(file_name).ok_or_else(|| {
            VaultError::InvalidName(format!("not a version entry name: {}", file_name))
        })
    }
}
