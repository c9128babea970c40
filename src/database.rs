//! # Database Façade
//!
//! Binds the pager, buffer pool, B+tree, WAL, and metadata sidecar into one
//! handle with a key-value surface: `put`, `get`, `keys`, `stats`, `query`.
//!
//! ## Files
//!
//! Opening `mydb` touches three siblings:
//!
//! ```text
//! mydb.db        page file (pager)
//! mydb.wal       write-ahead log
//! mydb.wal.meta  root page + order sidecar
//! ```
//!
//! ## Open Protocol
//!
//! The WAL and its sidecar decide between a fresh tree and recovery:
//!
//! - neither present: a new tree is created (root leaf + sidecar)
//! - both present: the sidecar names the root and the WAL is replayed,
//!   then truncated
//! - sidecar without WAL: open with an empty log
//! - WAL without sidecar: corruption, there is no root to replay onto
//!
//! ## Close Protocol
//!
//! Flush the buffer pool, close the tree (which fsyncs and closes the WAL),
//! then close the pager. After `close` every operation fails with `Closed`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::btree::{BPlusTree, TreeMeta};
use crate::config::{DEFAULT_TREE_ORDER, ENGINE_BUFFER_POOL_CAPACITY};
use crate::error::{Error, Result};
use crate::sql;
use crate::storage::{BufferPool, FilePager};

pub struct Database {
    tree: BPlusTree,
    pool: Arc<BufferPool>,
}

/// Snapshot of engine counters for the `.stats` surface.
#[derive(Debug, Clone)]
pub struct Stats {
    pub total_keys: usize,
    pub root_pid: u64,
    pub order: u32,
    pub wal_syncs: u64,
    pub cache_hit_rate: f64,
    pub buffer_pool_size: usize,
}

impl Database {
    /// Opens or creates the database rooted at `path` (without extension).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base = path.as_ref();
        let db_path = sibling(base, ".db");
        let wal_path = sibling(base, ".wal");
        let meta_path = sibling(base, ".wal.meta");

        let pager = FilePager::open(&db_path)?;
        let pool = Arc::new(BufferPool::new(pager, ENGINE_BUFFER_POOL_CAPACITY));

        let wal_exists = wal_path.exists();
        let meta_exists = meta_path.exists();

        let tree = if meta_exists {
            let meta = TreeMeta::load(&meta_path)?;
            BPlusTree::load(Arc::clone(&pool), meta.root_pid, meta.order, &wal_path)?
        } else if wal_exists {
            return Err(Error::corruption(format!(
                "WAL {} exists without its metadata sidecar",
                wal_path.display()
            )));
        } else {
            BPlusTree::create(Arc::clone(&pool), DEFAULT_TREE_ORDER, &wal_path)?
        };

        Ok(Self { tree, pool })
    }

    /// Flushes and closes the buffer pool, tree, and pager, in that order.
    pub fn close(&mut self) -> Result<()> {
        self.pool.flush()?;
        self.tree.close()?;
        self.pool.close()
    }

    /// Inserts a key-value pair. The WAL append fsyncs before the tree is
    /// touched.
    pub fn put(&mut self, key: u32, value: &str) -> Result<()> {
        self.tree.insert(key, value)
    }

    /// Looks up a key; `None` when absent.
    pub fn get(&self, key: u32) -> Result<Option<String>> {
        self.tree.search(key)
    }

    /// All keys in ascending order.
    pub fn keys(&self) -> Result<Vec<u32>> {
        self.tree.keys()
    }

    /// Runs one statement, SQL or simple syntax, and returns its formatted
    /// result.
    pub fn query(&mut self, input: &str) -> Result<String> {
        sql::run(self, input)
    }

    pub fn stats(&self) -> Result<Stats> {
        let pool_stats = self.pool.stats();
        let total_keys = self.tree.keys()?.len();

        Ok(Stats {
            total_keys,
            root_pid: self.tree.root_pid(),
            order: self.tree.order(),
            wal_syncs: self.tree.wal_sync_count(),
            cache_hit_rate: pool_stats.hit_rate,
            buffer_pool_size: pool_stats.size,
        })
    }

    pub fn pool_stats(&self) -> crate::storage::BufferPoolStats {
        self.pool.stats()
    }
}

/// `mydb` + `.wal` = `mydb.wal`, preserving any dots already in the name.
fn sibling(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
