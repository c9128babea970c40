//! # Error Types
//!
//! Crate-wide error enum and `Result` alias. Every failure mode of the storage
//! engine maps to a distinct variant so that callers can match on the kind
//! rather than parse messages.
//!
//! `PageFull` is special: it never escapes the B+tree. The tree catches it on
//! leaf and internal inserts and answers with a page split. Every other
//! variant propagates to the engine boundary, where a lookup miss is surfaced
//! as `Option::None` rather than `NotFound` (the SQL executor is the one
//! caller that turns a miss into a `NotFound` error for display).

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Underlying read/write/fsync/stat/open failure, with the file or page
    /// the operation was addressing.
    #[error("i/o error on {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A page write was attempted with a payload that is not exactly one page.
    #[error("invalid page size: {got} bytes, expected {expected}")]
    BadSize { got: usize, expected: usize },

    /// A page identifier or slot index beyond the valid range.
    #[error("{what} {index} out of range (bound {bound})")]
    OutOfRange {
        what: &'static str,
        index: u64,
        bound: u64,
    },

    /// A leaf or internal page cannot hold another entry. Consumed by the
    /// tree to drive splits; never surfaced to callers.
    #[error("page full: need {needed} bytes, have {available}")]
    PageFull { needed: usize, available: usize },

    /// Page type mismatch on load, a short or torn WAL record, or a
    /// malformed record header.
    #[error("corruption: {0}")]
    Corruption(String),

    /// Key absent on lookup. User-facing; the engine itself reports misses
    /// as `None`.
    #[error("key {0} not found")]
    NotFound(u32),

    /// A WAL entry could not be applied to the tree during recovery.
    #[error("WAL replay failed at entry {index}: {source}")]
    WalReplayFailed {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// Operation on a pager or WAL whose file handle has been closed.
    #[error("storage is closed")]
    Closed,

    /// Malformed statement handed to the query layer.
    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn corruption(detail: impl Into<String>) -> Self {
        Self::Corruption(detail.into())
    }
}
