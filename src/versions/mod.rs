//! Per-document version history.

mod ledger;

pub use ledger::{VersionKey, VersionLedger, KEEP_LIMIT};
