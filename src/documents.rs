//! Current-state document files and the metadata lists stored beside them.
//!
//! One `wf-<id>.json` file per workflow under the data root, plus the three
//! keyed lists (`tags.json`, `teams.json`, `owners.json`). This store only
//! ever replaces whole files; version capture happens above it, in
//! [`crate::Vault::put_document`].

use crate::error::{Result, VaultError};
use crate::types::{Document, DocumentId, Owner, Tag, Team};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Metadata list filenames.
pub const TAGS_FILE: &str = "tags.json";
pub const TEAMS_FILE: &str = "teams.json";
pub const OWNERS_FILE: &str = "owners.json";

/// Flat store of current-state JSON files.
pub struct DocumentStore {
    /// Data root; exclusively owns current-state files.
    root: PathBuf,
}

impl DocumentStore {
    /// Open the store at the given data root, creating it if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a document's current-state file.
    pub fn document_path(&self, id: &DocumentId) -> PathBuf {
        self.root.join(id.file_name())
    }

    /// Raw bytes of the current state, or `None` if the document does not
    /// exist yet.
    pub fn get_bytes(&self, id: &DocumentId) -> Result<Option<Vec<u8>>> {
        match fs::read(self.document_path(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Decode the current state of a document.
    pub fn get(&self, id: &DocumentId) -> Result<Document> {
        let bytes = self
            .get_bytes(id)?
            .ok_or_else(|| VaultError::DocumentNotFound(id.clone()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| VaultError::CorruptEntry(format!("{}: {}", id.file_name(), e)))
    }

    /// Replace the current state with exact bytes. Used by the version
    /// ledger's restore-to-live path, which must not re-encode the payload.
    pub fn put_bytes(&self, id: &DocumentId, bytes: &[u8]) -> Result<()> {
        let mut file = File::create(self.document_path(id))?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    }

    /// Replace the current state of a document.
    pub fn put(&self, doc: &Document) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        self.put_bytes(&doc.id, &bytes)
    }

    /// Delete a document's current state. No version entry is created for a
    /// delete. Returns whether anything was removed.
    pub fn delete(&self, id: &DocumentId) -> Result<bool> {
        match fs::remove_file(self.document_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List all document ids, sorted ascending.
    pub fn list(&self) -> Result<Vec<DocumentId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(id) = DocumentId::from_file_name(&name.to_string_lossy()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    // --- Metadata lists ---

    pub fn read_tags(&self) -> Result<Vec<Tag>> {
        self.read_list(TAGS_FILE)
    }

    pub fn write_tags(&self, tags: &[Tag]) -> Result<()> {
        self.write_list(TAGS_FILE, tags)
    }

    pub fn read_teams(&self) -> Result<Vec<Team>> {
        self.read_list(TEAMS_FILE)
    }

    pub fn write_teams(&self, teams: &[Team]) -> Result<()> {
        self.write_list(TEAMS_FILE, teams)
    }

    pub fn read_owners(&self) -> Result<Vec<Owner>> {
        self.read_list(OWNERS_FILE)
    }

    pub fn write_owners(&self, owners: &[Owner]) -> Result<()> {
        self.write_list(OWNERS_FILE, owners)
    }

    /// Read a metadata list; a missing file is an empty list.
    fn read_list<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.root.join(file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| VaultError::CorruptEntry(format!("{}: {}", file, e)))
    }

    fn write_list<T: Serialize>(&self, file: &str, items: &[T]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(items)?;
        let mut f = File::create(self.root.join(file))?;
        f.write_all(&bytes)?;
        f.sync_all()?;
        Ok(())
    }
}
