//! Restore engine: safety archive, wipe, extract.
//!
//! Restoring replaces the live tree wholesale, which no other component is
//! permitted to do. The sequence is terminal on success or first failure:
//!
//! 1. Safety archive of the current live tree. Failure here aborts before
//!    live state is touched.
//! 2. Wipe every live entry (the backups domain stays in place; it owns the
//!    archive being restored and the safety archive just taken).
//! 3. Recreate the version-ledger directory.
//! 4. Extract the chosen archive into the live root.
//!
//! A failure during wipe or extract leaves the live tree partial. There is no
//! retry; the recovery path is to re-run restore against the safety archive,
//! which every failure names.

use crate::archive::{ArchiveBuilder, ArchiveName};
use crate::error::{RestoreStage, Result, VaultError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of a successful restore.
#[derive(Clone, Debug)]
pub struct RestoreReport {
    /// Archive the live tree now mirrors.
    pub restored_from: ArchiveName,
    /// Archive of the pre-restore state, taken as step one.
    pub safety_archive: ArchiveName,
}

/// Replaces the live tree with the contents of a chosen archive.
pub struct RestoreEngine {
    /// Live tree being replaced.
    data_root: PathBuf,
    /// Archive domain, left untouched by the wipe.
    archive_dir: PathBuf,
    /// Recreated after the wipe.
    versions_dir: PathBuf,
}

impl RestoreEngine {
    pub fn new(
        data_root: impl AsRef<Path>,
        archive_dir: impl AsRef<Path>,
        versions_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            data_root: data_root.as_ref().to_path_buf(),
            archive_dir: archive_dir.as_ref().to_path_buf(),
            versions_dir: versions_dir.as_ref().to_path_buf(),
        }
    }

    /// Run the full restore sequence.
    pub fn restore(&self, builder: &ArchiveBuilder, name: &ArchiveName) -> Result<RestoreReport> {
        let archive_path = self.archive_dir.join(name.file_name());
        if !archive_path.exists() {
            return Err(VaultError::ArchiveNotFound(name.file_name()));
        }

        // Step 1: the only recovery path for everything below.
        let safety_archive = builder.build()?;
        info!(safety = %safety_archive, restoring = %name, "starting restore");

        self.wipe()
            .map_err(|e| failed(RestoreStage::Wipe, &safety_archive, e))?;

        fs::create_dir_all(&self.versions_dir)
            .map_err(|e| failed(RestoreStage::Recreate, &safety_archive, e.into()))?;

        crate::archive::extract(&archive_path, &self.data_root)
            .map_err(|e| failed(RestoreStage::Extract, &safety_archive, e))?;

        Ok(RestoreReport {
            restored_from: *name,
            safety_archive,
        })
    }

    /// Remove every live entry except the backups domain. Destructive and not
    /// reversible except via the safety archive.
    fn wipe(&self) -> Result<()> {
        for entry in fs::read_dir(&self.data_root)? {
            let entry = entry?;
            if entry.path() == self.archive_dir {
                continue;
            }
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

fn failed(stage: RestoreStage, safety_archive: &ArchiveName, source: VaultError) -> VaultError {
    VaultError::RestoreFailed {
        stage,
        safety_archive: safety_archive.file_name(),
        source: Box::new(source),
    }
}
