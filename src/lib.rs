//! # leafdb
//!
//! An embedded, single-writer key-value storage engine indexed by a
//! disk-resident B+tree, with crash recovery via a write-ahead log and an
//! LRU page cache in front of a fixed-size page file.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Shell / query layer (sql, cli)  │
//! ├─────────────────────────────────────┤
//! │        Database façade              │
//! ├────────────────────┬────────────────┤
//! │   B+Tree (btree)   │  WAL + sidecar │
//! ├────────────────────┴────────────────┤
//! │   Buffer pool (LRU, deferred I/O)   │
//! ├─────────────────────────────────────┤
//! │   Pager (4096-byte pages + fsync)   │
//! └─────────────────────────────────────┘
//! ```
//!
//! A mutation flows WAL-first: the operation is appended and fsynced, then
//! applied to the tree through the buffer pool. On open, any surviving WAL
//! entries are replayed through the same insert path and the log is
//! truncated, so durable state is always the prefix of operations whose
//! append returned.
//!
//! ## File Layout
//!
//! ```text
//! mydb.db        page file: free-page directory on page 0, tree pages after
//! mydb.wal       append-only operation log
//! mydb.wal.meta  12-byte root/order sidecar
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use leafdb::Database;
//!
//! let mut db = Database::open("./mydb")?;
//! db.put(100, "naruto")?;
//! assert_eq!(db.get(100)?.as_deref(), Some("naruto"));
//! db.close()?;
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: pager, free-page directory, buffer pool, WAL
//! - [`btree`]: record codec, page views, the tree itself
//! - [`database`]: the engine façade
//! - [`sql`]: two-statement SQL grammar plus the simple syntax
//! - [`cli`]: interactive shell
//!
//! The engine assumes a single application thread; internal locks exist so
//! misuse fails safe, not to make the tree reentrant.

pub mod btree;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod sql;
pub mod storage;

pub use database::{Database, Stats};
pub use error::{Error, Result};
