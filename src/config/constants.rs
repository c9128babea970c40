//! # Configuration Constants
//!
//! Tunables that are not part of the on-disk format. Page geometry lives in
//! [`crate::storage`] next to the codecs that depend on it; this module holds
//! the defaults the engine picks when the caller does not.
//!
//! ```text
//! DEFAULT_BUFFER_POOL_CAPACITY (64)
//!       └─> fallback when a pool is built with capacity 0
//!
//! ENGINE_BUFFER_POOL_CAPACITY (128)
//!       └─> the pool the Database façade wraps around its pager
//!
//! DEFAULT_TREE_ORDER (100)
//!       └─> persisted in the metadata sidecar; advisory only. Splits are
//!           driven by page capacity, never by this number.
//! ```

/// Buffer-pool capacity used when a caller asks for zero frames.
pub const DEFAULT_BUFFER_POOL_CAPACITY: usize = 64;

/// Buffer-pool capacity the engine façade uses for its page cache.
pub const ENGINE_BUFFER_POOL_CAPACITY: usize = 128;

/// Advisory tree order recorded in the metadata sidecar.
pub const DEFAULT_TREE_ORDER: u32 = 100;
