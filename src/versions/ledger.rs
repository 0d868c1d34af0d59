//! Append-only version ledger with retention pruning.
//!
//! Every overwrite of a document first lands the *previous* state here, keyed
//! by `(document id, time key)`. Entries are plain JSON or gzip-compressed
//! JSON, distinguished by filename suffix; readers handle both. Listing is a
//! pure string sort on filenames, newest first.

use crate::documents::DocumentStore;
use crate::error::{Result, VaultError};
use crate::timekey::{TimeKey, ENCODED_LEN};
use crate::types::{Document, DocumentId, JSON_EXT};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maximum number of version entries kept per document.
pub const KEEP_LIMIT: usize = 1000;

/// Suffix of gzip-compressed entries.
const GZ_EXT: &str = ".json.gz";

/// Key naming one version entry: the owning document, the capture time, and
/// the on-disk form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionKey {
    document_id: DocumentId,
    time_key: TimeKey,
    compressed: bool,
}

impl VersionKey {
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn time_key(&self) -> TimeKey {
        self.time_key
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// On-disk filename, `<id>_<timekey>.json[.gz]`.
    pub fn file_name(&self) -> String {
        let ext = if self.compressed { GZ_EXT } else { JSON_EXT };
        format!("{}_{}{}", self.document_id, self.time_key.encode(), ext)
    }

    /// The same key in the other on-disk form, for existence checks across
    /// both suffixes.
    fn as_other_form(&self) -> VersionKey {
        VersionKey {
            document_id: self.document_id.clone(),
            time_key: self.time_key,
            compressed: !self.compressed,
        }
    }

    /// Recover a key from a filename. `None` for anything that does not match
    /// the entry encoding, including stray files in the versions directory.
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, compressed) = if let Some(stem) = file_name.strip_suffix(GZ_EXT) {
            (stem, true)
        } else if let Some(stem) = file_name.strip_suffix(JSON_EXT) {
            (stem, false)
        } else {
            return None;
        };

        // The time key is fixed width at the end; everything before the
        // separating underscore is the document id.
        if stem.len() <= ENCODED_LEN + 1 {
            return None;
        }
        let split = stem.len() - ENCODED_LEN;
        let (head, encoded) = stem.split_at(split);
        let id = head.strip_suffix('_')?;

        Some(VersionKey {
            document_id: DocumentId::new(id).ok()?,
            time_key: TimeKey::decode(encoded)?,
            compressed,
        })
    }
}

impl std::fmt::Display for VersionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// The version ledger directory.
pub struct VersionLedger {
    /// Exclusively owns historical snapshots.
    root: PathBuf,
    /// Write new entries gzip-compressed.
    compress: bool,
    keep_limit: usize,
}

impl VersionLedger {
    /// Open the ledger at the given directory, creating it if needed.
    pub fn new(root: impl AsRef<Path>, compress: bool) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            compress,
            keep_limit: KEEP_LIMIT,
        })
    }

    /// Override the retention cap. Intended for tests; production callers
    /// keep [`KEEP_LIMIT`].
    pub fn with_keep_limit(mut self, keep_limit: usize) -> Self {
        self.keep_limit = keep_limit;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &VersionKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Capture the state about to be overwritten.
    ///
    /// Must be called before the new state is durably written; the entry
    /// represents the *previous* state. `current` is `None` when the document
    /// is being created, in which case there is nothing to snapshot and no
    /// entry is made. Pruning runs after every capture; its failure never
    /// fails the write that triggered it.
    pub fn snapshot(
        &self,
        id: &DocumentId,
        current: Option<&[u8]>,
    ) -> Result<Option<VersionKey>> {
        let bytes = match current {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let key = self.fresh_key(id, TimeKey::now())?;
        let path = self.entry_path(&key);

        if self.compress {
            let file = File::create(&path)?;
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(bytes)?;
            let file = encoder.finish()?;
            file.sync_all()?;
        } else {
            let mut file = File::create(&path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }

        if let Err(e) = self.prune(id) {
            warn!(document = %id, error = %e, "version prune failed");
        }

        Ok(Some(key))
    }

    /// First key at or after `base` that is free for this document, bumping
    /// the counter past any entry already on disk. Two captures in the same
    /// millisecond get distinct, order-preserving names.
    fn fresh_key(&self, id: &DocumentId, base: TimeKey) -> Result<VersionKey> {
        let mut time_key = base;
        loop {
            let key = VersionKey {
                document_id: id.clone(),
                time_key,
                compressed: self.compress,
            };
            let taken = self.entry_path(&key).exists()
                || self.entry_path(&key.as_other_form()).exists();
            if !taken {
                return Ok(key);
            }
            time_key = time_key.next_seq().ok_or_else(|| {
                VaultError::InvalidName(format!(
                    "version key space exhausted for {} at {}",
                    id,
                    time_key.encode()
                ))
            })?;
        }
    }

    /// List entries for one document, newest first. Filenames that do not
    /// parse are skipped, never fatal.
    pub fn list(&self, id: &DocumentId) -> Result<Vec<VersionKey>> {
        let mut keys: Vec<VersionKey> = self
            .scan()?
            .into_iter()
            .filter(|key| key.document_id() == id)
            .collect();
        keys.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(keys)
    }

    /// List entries across all documents, newest-name first, capped at the
    /// retention limit.
    pub fn list_all(&self) -> Result<Vec<VersionKey>> {
        let mut keys = self.scan()?;
        keys.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        keys.truncate(self.keep_limit);
        Ok(keys)
    }

    fn scan(&self) -> Result<Vec<VersionKey>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable versions entry");
                    continue;
                }
            };
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match VersionKey::parse(&name) {
                Some(key) => keys.push(key),
                None => debug!(file = %name, "skipping non-version file"),
            }
        }
        Ok(keys)
    }

    /// Raw JSON bytes of an entry, transparently gunzipped.
    pub fn read_bytes(&self, key: &VersionKey) -> Result<Vec<u8>> {
        let path = self.entry_path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::VersionNotFound(key.file_name()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        if key.is_compressed() {
            GzDecoder::new(file).read_to_end(&mut bytes).map_err(|e| {
                VaultError::CorruptEntry(format!("{}: {}", key.file_name(), e))
            })?;
        } else {
            let mut file = file;
            file.read_to_end(&mut bytes)?;
        }
        Ok(bytes)
    }

    /// Decode an entry's payload.
    pub fn read(&self, key: &VersionKey) -> Result<Document> {
        let bytes = self.read_bytes(key)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| VaultError::CorruptEntry(format!("{}: {}", key.file_name(), e)))
    }

    /// Write an entry back as the current state of its owning document.
    ///
    /// Does not snapshot the state being overwritten; the last legitimate
    /// `put` already captured it.
    pub fn restore_to_live(&self, key: &VersionKey, documents: &DocumentStore) -> Result<()> {
        let bytes = self.read_bytes(key)?;
        documents.put_bytes(key.document_id(), &bytes)
    }

    /// Delete the oldest entries beyond the retention cap, in the same
    /// lexical order `list` uses. Idempotent; per-entry failures are logged
    /// and skipped.
    pub fn prune(&self, id: &DocumentId) -> Result<()> {
        let keys = self.list(id)?;
        if keys.len() <= self.keep_limit {
            return Ok(());
        }
        for key in &keys[self.keep_limit..] {
            if let Err(e) = fs::remove_file(self.entry_path(key)) {
                warn!(entry = %key, error = %e, "failed to prune version entry");
            }
        }
        Ok(())
    }
}
