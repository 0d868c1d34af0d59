//! Copy-then-pack archive construction.
//!
//! A document write snapshots-then-replaces, which is not atomic at the
//! filesystem level. Packing the live tree directly could therefore capture a
//! document mid-write. The builder first materializes a private copy of the
//! source tree into a scratch directory, packs the copy, and only then moves
//! the finished archive into the archive directory, so a partially packed
//! archive is never visible in the catalog.

use crate::archive::ArchiveName;
use crate::error::{Result, VaultError};
use crate::timekey::TimeKey;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Builds tar.gz archives of the data root.
pub struct ArchiveBuilder {
    /// Tree being archived.
    source_root: PathBuf,
    /// Destination for finished archives; excluded from the pack.
    archive_dir: PathBuf,
}

impl ArchiveBuilder {
    pub fn new(source_root: impl AsRef<Path>, archive_dir: impl AsRef<Path>) -> Self {
        Self {
            source_root: source_root.as_ref().to_path_buf(),
            archive_dir: archive_dir.as_ref().to_path_buf(),
        }
    }

    /// Archive every entry of the source tree except the archive directory
    /// itself. Returns the name the archive is catalogued under.
    pub fn build(&self) -> Result<ArchiveName> {
        let scratch = tempfile::Builder::new().prefix("wf-backup-").tempdir()?;

        // Copy first, pack the copy.
        let staged = scratch.path().join("data_copy");
        fs::create_dir_all(&staged)?;
        self.copy_source(&staged)?;

        let name = self.fresh_name()?;
        let packed = scratch.path().join(name.file_name());
        pack(&staged, &packed)?;

        // Atomic placement is the last step.
        fs::create_dir_all(&self.archive_dir)?;
        move_into_place(&packed, &self.archive_dir.join(name.file_name()))?;

        if let Err(e) = scratch.close() {
            warn!(error = %e, "failed to clean up backup scratch directory");
        }

        Ok(name)
    }

    /// Copy every source entry except the archive directory into `staged`.
    fn copy_source(&self, staged: &Path) -> Result<()> {
        for entry in fs::read_dir(&self.source_root)? {
            let entry = entry?;
            if entry.path() == self.archive_dir {
                continue;
            }
            copy_recursive(&entry.path(), &staged.join(entry.file_name()))?;
        }
        Ok(())
    }

    /// First unused archive name at or after now. Two builds in the same
    /// millisecond get distinct, order-preserving names.
    fn fresh_name(&self) -> Result<ArchiveName> {
        let mut time_key = TimeKey::now();
        loop {
            let name = ArchiveName::new(time_key);
            if !self.archive_dir.join(name.file_name()).exists() {
                return Ok(name);
            }
            time_key = time_key.next_seq().ok_or_else(|| {
                VaultError::InvalidName(format!(
                    "archive name space exhausted at {}",
                    time_key.encode()
                ))
            })?;
        }
    }
}

fn copy_recursive(src: &Path, dest: &Path) -> Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
    } else {
        fs::copy(src, dest)?;
    }
    Ok(())
}

/// Pack `staged` into a tar.gz at `dest`.
fn pack(staged: &Path, dest: &Path) -> Result<()> {
    let file = File::create(dest)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", staged)?;
    let encoder = builder.into_inner()?;
    let file = encoder.finish()?;
    file.sync_all()?;
    Ok(())
}

/// Move the finished archive into the catalog directory.
///
/// Scratch usually lives on a different filesystem, so a plain rename can
/// fail with EXDEV; the fallback copies to a hidden sibling of the final
/// path and renames within the destination directory, keeping the final
/// name's appearance atomic.
fn move_into_place(src: &Path, dest: &Path) -> Result<()> {
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }

    let staging = dest.with_file_name(format!(
        ".{}.partial",
        dest.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));
    fs::copy(src, &staging)?;
    File::open(&staging)?.sync_all()?;
    fs::rename(&staging, dest)?;
    let _ = fs::remove_file(src);
    Ok(())
}
