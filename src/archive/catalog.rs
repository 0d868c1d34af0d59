//! Archive listing and inspection.

use crate::archive::{ArchiveName, ARCHIVE_EXT};
use crate::documents::{OWNERS_FILE, TAGS_FILE, TEAMS_FILE};
use crate::error::{Result, VaultError};
use crate::types::{DocumentId, Summary};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One archive visible in the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    pub name: ArchiveName,
    /// Creation time parsed out of the filename, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
}

/// Read-only view over the archive directory.
pub struct ArchiveCatalog {
    archive_dir: PathBuf,
}

impl ArchiveCatalog {
    pub fn new(archive_dir: impl AsRef<Path>) -> Self {
        Self {
            archive_dir: archive_dir.as_ref().to_path_buf(),
        }
    }

    /// Full path of an archive file.
    pub fn archive_path(&self, name: &ArchiveName) -> PathBuf {
        self.archive_dir.join(name.file_name())
    }

    /// List archives, newest first. Filenames that do not match the archive
    /// encoding are excluded, never fatal.
    pub fn list(&self) -> Result<Vec<ArchiveDescriptor>> {
        let entries = match fs::read_dir(&self.archive_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut archives = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable archive entry");
                    continue;
                }
            };
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            match ArchiveName::parse(&file_name) {
                Some(name) => archives.push(ArchiveDescriptor {
                    created_at: name.time_key().display_date(),
                    name,
                }),
                None => {
                    if file_name.ends_with(ARCHIVE_EXT) {
                        debug!(file = %file_name, "skipping archive with unrecognized name");
                    }
                }
            }
        }

        archives.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(archives)
    }

    /// Extract an archive into a scratch directory and summarize its
    /// contents. Never touches the live store.
    ///
    /// Counting is best-effort: a missing or unparseable metadata list counts
    /// as zero, and a document file that fails to parse still counts as a
    /// document but contributes no nodes.
    pub fn inspect(&self, name: &ArchiveName) -> Result<Summary> {
        let path = self.archive_path(name);
        if !path.exists() {
            return Err(VaultError::ArchiveNotFound(name.file_name()));
        }

        // Scratch cleanup is owned by the TempDir guard, so every exit path
        // below releases it.
        let scratch = tempfile::Builder::new().prefix("wf-inspect-").tempdir()?;
        extract(&path, scratch.path())?;

        let summary = Summary {
            team_count: count_list(&scratch.path().join(TEAMS_FILE)),
            owner_count: count_list(&scratch.path().join(OWNERS_FILE)),
            tag_count: count_list(&scratch.path().join(TAGS_FILE)),
            ..Default::default()
        };
        let summary = count_documents(scratch.path(), summary)?;

        if let Err(e) = scratch.close() {
            warn!(error = %e, "failed to clean up inspect scratch directory");
        }

        Ok(summary)
    }
}

/// Unpack a tar.gz archive into `dest`.
pub(crate) fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.unpack(dest)?;
    Ok(())
}

/// Length of a JSON array file; missing or corrupt counts as zero.
fn count_list(path: &Path) -> usize {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return 0,
    };
    match serde_json::from_slice::<Vec<serde_json::Value>>(&bytes) {
        Ok(items) => items.len(),
        Err(e) => {
            debug!(file = %path.display(), error = %e, "unparseable metadata list counts as zero");
            0
        }
    }
}

/// Count document files and sum their node arrays.
fn count_documents(root: &Path, mut summary: Summary) -> Result<Summary> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let file_name = entry.file_name();
        if DocumentId::from_file_name(&file_name.to_string_lossy()).is_none() {
            continue;
        }
        summary.document_count += 1;

        let parsed = fs::read(entry.path())
            .ok()
            .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok());
        match parsed {
            Some(doc) => {
                if let Some(nodes) = doc.get("nodes").and_then(|n| n.as_array()) {
                    summary.total_node_count += nodes.len();
                }
            }
            None => {
                debug!(file = %file_name.to_string_lossy(), "unparseable document skipped for node count");
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveBuilder;
    use crate::timekey::TimeKey;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn name_at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> ArchiveName {
        ArchiveName::new(TimeKey::from_datetime(
            Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap(),
        ))
    }

    #[test]
    fn test_list_newest_first() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");
        fs::create_dir_all(&backups).unwrap();

        let t1 = name_at(2025, 1, 10, 8, 0, 0);
        let t2 = name_at(2025, 3, 5, 12, 30, 0);
        let t3 = name_at(2025, 9, 21, 18, 46, 37);
        for name in [&t1, &t2, &t3] {
            fs::write(backups.join(name.file_name()), b"").unwrap();
        }

        let catalog = ArchiveCatalog::new(&backups);
        let listed: Vec<ArchiveName> = catalog.list().unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(listed, vec![t3, t2, t1]);
    }

    #[test]
    fn test_list_excludes_unrecognized_names() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");
        fs::create_dir_all(backups.join("versions")).unwrap();

        fs::write(
            backups.join(name_at(2025, 1, 1, 0, 0, 0).file_name()),
            b"",
        )
        .unwrap();
        fs::write(backups.join("data_backup_garbled.tar.gz"), b"").unwrap();
        fs::write(backups.join("notes.txt"), b"").unwrap();

        let catalog = ArchiveCatalog::new(&backups);
        assert_eq!(catalog.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_of_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let catalog = ArchiveCatalog::new(dir.path().join("absent"));
        assert!(catalog.list().unwrap().is_empty());
    }

    #[test]
    fn test_descriptor_display_date() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");
        fs::create_dir_all(&backups).unwrap();
        fs::write(
            backups.join(name_at(2025, 9, 21, 18, 46, 37).file_name()),
            b"",
        )
        .unwrap();

        let listed = ArchiveCatalog::new(&backups).list().unwrap();
        assert_eq!(listed[0].created_at, "2025-09-21 18:46:37");
    }

    #[test]
    fn test_inspect_missing_archive_is_not_found() {
        let dir = TempDir::new().unwrap();
        let catalog = ArchiveCatalog::new(dir.path().join("backups"));
        let result = catalog.inspect(&name_at(2025, 1, 1, 0, 0, 0));
        assert!(matches!(result, Err(VaultError::ArchiveNotFound(_))));
    }

    #[test]
    fn test_inspect_counts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        fs::create_dir_all(&root).unwrap();

        let docs = [
            ("wf-1.json", json!({"id": "wf-1", "nodes": [1, 2]})),
            ("wf-2.json", json!({"id": "wf-2", "nodes": []})),
            ("wf-3.json", json!({"id": "wf-3", "nodes": [1, 2, 3, 4, 5]})),
        ];
        for (file, doc) in &docs {
            fs::write(root.join(file), serde_json::to_vec(doc).unwrap()).unwrap();
        }
        fs::write(
            root.join(TEAMS_FILE),
            serde_json::to_vec(&json!([{"id": "t1", "name": "core"}])).unwrap(),
        )
        .unwrap();
        fs::write(
            root.join(TAGS_FILE),
            serde_json::to_vec(&json!([{"id": "g1", "name": "a"}, {"id": "g2", "name": "b"}]))
                .unwrap(),
        )
        .unwrap();
        // owners.json intentionally absent

        let backups = root.join("backups");
        let name = ArchiveBuilder::new(&root, &backups).build().unwrap();

        let summary = ArchiveCatalog::new(&backups).inspect(&name).unwrap();
        assert_eq!(
            summary,
            Summary {
                team_count: 1,
                owner_count: 0,
                tag_count: 2,
                document_count: 3,
                total_node_count: 7,
            }
        );
    }

    #[test]
    fn test_inspect_tolerates_corrupt_contents() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        fs::create_dir_all(&root).unwrap();

        fs::write(root.join("wf-1.json"), b"{broken").unwrap();
        fs::write(
            root.join("wf-2.json"),
            serde_json::to_vec(&json!({"id": "wf-2", "nodes": [1]})).unwrap(),
        )
        .unwrap();
        fs::write(root.join(TAGS_FILE), b"not an array").unwrap();

        let backups = root.join("backups");
        let name = ArchiveBuilder::new(&root, &backups).build().unwrap();

        let summary = ArchiveCatalog::new(&backups).inspect(&name).unwrap();
        // The broken document still counts; its nodes do not.
        assert_eq!(summary.document_count, 2);
        assert_eq!(summary.total_node_count, 1);
        assert_eq!(summary.tag_count, 0);
    }

    #[test]
    fn test_inspect_does_not_touch_live_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("wf-1.json"), br#"{"id": "wf-1", "nodes": []}"#).unwrap();

        let backups = root.join("backups");
        let name = ArchiveBuilder::new(&root, &backups).build().unwrap();

        fs::write(root.join("wf-1.json"), br#"{"id": "wf-1", "nodes": [1]}"#).unwrap();
        ArchiveCatalog::new(&backups).inspect(&name).unwrap();

        let live = fs::read(root.join("wf-1.json")).unwrap();
        assert_eq!(live, br#"{"id": "wf-1", "nodes": [1]}"#);
    }
}
