//! Sortable timestamp keys.
//!
//! Version entries and archives are both named from the same encoding so that
//! "list newest first" is a pure string sort on filenames. The encoding is
//! fixed-width and zero-padded: `YYYYMMDD_HHMMSSmmm_NN`, where `mmm` is the
//! millisecond component and `NN` is a counter that disambiguates keys minted
//! within the same millisecond (bumped by the writer, never overwritten).

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;

/// strftime layout for the date/time portion of a key.
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";

/// Width of the encoded date/time portion.
const STAMP_LEN: usize = 18;

/// Total width of an encoded key.
pub const ENCODED_LEN: usize = STAMP_LEN + 3;

/// Highest counter value before the key space for one millisecond runs out.
const MAX_SEQ: u8 = 99;

/// A sortable point-in-time key.
///
/// Ordering on the struct matches lexical ordering of [`TimeKey::encode`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeKey {
    /// Milliseconds since the Unix epoch (the encoding's full precision).
    millis: i64,
    /// Same-millisecond disambiguation counter.
    seq: u8,
}

impl TimeKey {
    /// Key for the current wall-clock time, counter zero.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Key for an explicit instant, counter zero.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        TimeKey {
            millis: dt.timestamp_millis(),
            seq: 0,
        }
    }

    /// The same instant with the next counter value, or `None` once the
    /// per-millisecond key space is exhausted.
    pub fn next_seq(self) -> Option<Self> {
        if self.seq >= MAX_SEQ {
            None
        } else {
            Some(TimeKey {
                millis: self.millis,
                seq: self.seq + 1,
            })
        }
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.millis
    }

    /// Encode to the fixed-width sortable form.
    pub fn encode(&self) -> String {
        let dt = DateTime::<Utc>::from_timestamp_millis(self.millis)
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp_millis(0).unwrap());
        format!("{}_{:02}", dt.format(STAMP_FORMAT), self.seq)
    }

    /// Decode a fixed-width key. Returns `None` for anything that does not
    /// match the encoding exactly.
    pub fn decode(s: &str) -> Option<Self> {
        if s.len() != ENCODED_LEN || !s.is_ascii() {
            return None;
        }
        let (stamp, rest) = s.split_at(STAMP_LEN);
        let seq = rest.strip_prefix('_')?.parse::<u8>().ok()?;
        if seq > MAX_SEQ {
            return None;
        }
        let naive = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
        Some(TimeKey {
            millis: naive.and_utc().timestamp_millis(),
            seq,
        })
    }

    /// Human-readable form, `YYYY-MM-DD HH:MM:SS`.
    pub fn display_date(&self) -> String {
        let dt = DateTime::<Utc>::from_timestamp_millis(self.millis)
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp_millis(0).unwrap());
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl fmt::Debug for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeKey({})", self.encode())
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
