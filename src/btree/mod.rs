//! # B+Tree Index
//!
//! Disk-resident B+tree over the buffer pool. Leaves hold the records and
//! chain together for ordered scans; internal pages hold separator keys and
//! child pointers; the tree drives splits off `PageFull` signals from the
//! page codecs.
//!
//! ## Module Organization
//!
//! - `record`: length-prefixed key/value codec for leaf payloads
//! - `leaf`: slot-directory leaf page views
//! - `internal`: separator/child internal page views
//! - `meta`: the 12-byte root/order sidecar file
//! - `tree`: insert, search, ordered scan, splits, WAL replay

pub mod internal;
pub mod leaf;
pub mod meta;
pub mod record;
pub mod tree;

pub use internal::{InternalPage, InternalPageMut};
pub use leaf::{LeafPage, LeafPageMut};
pub use meta::{TreeMeta, META_FILE_SIZE};
pub use record::Record;
pub use tree::BPlusTree;
