//! Full-store archives: building, cataloguing, inspection.

mod builder;
mod catalog;

pub use builder::ArchiveBuilder;
pub use catalog::{ArchiveCatalog, ArchiveDescriptor};
pub(crate) use catalog::extract;

use crate::timekey::TimeKey;
use std::fmt;

/// Filename prefix for archives.
pub const ARCHIVE_PREFIX: &str = "data_backup_";

/// Archive file suffix (gzip-compressed tar).
pub const ARCHIVE_EXT: &str = ".tar.gz";

/// Name of one archive, encoding its creation time.
///
/// Because the embedded [`TimeKey`] is fixed width, "list newest first" over
/// archive filenames is a pure string sort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArchiveName {
    time_key: TimeKey,
}

impl ArchiveName {
    pub fn new(time_key: TimeKey) -> Self {
        Self { time_key }
    }

    pub fn time_key(&self) -> TimeKey {
        self.time_key
    }

    /// On-disk filename, `data_backup_<timekey>.tar.gz`.
    pub fn file_name(&self) -> String {
        format!("{}{}{}", ARCHIVE_PREFIX, self.time_key.encode(), ARCHIVE_EXT)
    }

    /// Recover a name from a filename. `None` for anything that does not
    /// match the archive encoding.
    pub fn parse(file_name: &str) -> Option<Self> {
        let encoded = file_name
            .strip_prefix(ARCHIVE_PREFIX)?
            .strip_suffix(ARCHIVE_EXT)?;
        Some(Self {
            time_key: TimeKey::decode(encoded)?,
        })
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}
