//! # B+Tree
//!
//! The index over the page file: point insert, point lookup, and an ordered
//! scan along the leaf chain. All page access goes through the buffer pool;
//! all mutations are logged to the WAL before they touch a page.
//!
//! ## Shape
//!
//! ```text
//!                   [internal root]
//!                   /      |       \
//!          [leaf 1]   [leaf 4]   [leaf 6]
//!             |----------->|--------->|     next_page chain
//! ```
//!
//! Every node is one page. Descent follows separator keys; the leftmost
//! descent reaches the head of the leaf chain, and `next_page` links visit
//! every record in key order.
//!
//! ## Splits
//!
//! A full leaf splits around the middle of its record set. The first key of
//! the new right leaf is copied up into the parent; the key stays in the
//! leaf. A full internal page splits around its middle entry, whose key is
//! pushed up and appears in neither half. Splits recurse toward the root;
//! when the root itself splits a new internal root is allocated and the
//! metadata sidecar is rewritten.
//!
//! Splits are triggered purely by `PageFull` from the page codecs. The
//! `order` carried here is persisted for re-opens but gates nothing.
//!
//! ## Parent Pointers
//!
//! Each non-root page caches its parent in the page header. Splits keep the
//! cache honest: both halves inherit the parent of the page that split, and
//! every child handed to a new right internal page gets its pointer
//! rewritten before the split propagates.
//!
//! ## Recovery
//!
//! `load` replays every WAL entry through the normal insert path, bypassing
//! only the WAL append, then truncates the log. Replay failures abort the
//! open and name the entry that could not be applied.
//!
//! ## Concurrency
//!
//! Not reentrant. Split propagation reads the parent pointer it just wrote,
//! so interleaved inserts from two threads can tear the tree. One
//! application thread drives the engine; the WAL and pool keep their own
//! locks only so misuse fails safe rather than corrupts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::storage::{BufferPool, Page, PageType, Wal, WalEntry, WalOp};

use super::internal::{InternalPage, InternalPageMut};
use super::leaf::{LeafPage, LeafPageMut};
use super::meta::TreeMeta;
use super::record::Record;

pub struct BPlusTree {
    pool: Arc<BufferPool>,
    wal: Wal,
    root_pid: u64,
    order: u32,
    meta_path: PathBuf,
}

impl BPlusTree {
    /// Creates a fresh tree: allocates a root leaf, opens the WAL, and
    /// writes the metadata sidecar.
    pub fn create(pool: Arc<BufferPool>, order: u32, wal_path: impl AsRef<Path>) -> Result<Self> {
        let (root_pid, _) = allocate_typed_page(&pool, PageType::Leaf)?;
        let wal = Wal::open(&wal_path)?;
        let meta_path = sidecar_path(wal_path.as_ref());

        let tree = Self {
            pool,
            wal,
            root_pid,
            order,
            meta_path,
        };
        tree.save_metadata()?;
        // the empty root must be durable before the WAL can be replayed
        // against it after a crash
        tree.pool.flush()?;
        Ok(tree)
    }

    /// Opens an existing tree from its persisted root and replays the WAL.
    pub fn load(
        pool: Arc<BufferPool>,
        root_pid: u64,
        order: u32,
        wal_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let wal = Wal::open(&wal_path)?;
        let meta_path = sidecar_path(wal_path.as_ref());

        let mut tree = Self {
            pool,
            wal,
            root_pid,
            order,
            meta_path,
        };
        tree.replay_wal()?;
        Ok(tree)
    }

    /// Logs the insert, fsyncs, then applies it to the tree.
    pub fn insert(&mut self, key: u32, value: &str) -> Result<()> {
        self.wal.append(&WalEntry::insert(key, value))?;
        self.apply_insert(key, value)
    }

    /// Descends to the leaf for `key` and returns its value when present.
    pub fn search(&self, key: u32) -> Result<Option<String>> {
        let leaf_pid = self.find_leaf_page(key)?;
        let page = self.pool.read_page(leaf_pid)?;
        let leaf = LeafPage::new(&page)?;

        match leaf.search(key)? {
            Some(record) => Ok(Some(record.value_as_str()?.to_owned())),
            None => Ok(None),
        }
    }

    /// Every key in ascending order, by walking the leaf chain.
    pub fn keys(&self) -> Result<Vec<u32>> {
        let mut keys = Vec::new();
        let mut pid = self.find_leftmost_leaf()?;

        while pid != 0 {
            let page = self.pool.read_page(pid)?;
            let leaf = LeafPage::new(&page)?;
            for record in leaf.records()? {
                keys.push(record.key_as_u32()?);
            }
            pid = u64::from(page.header().next_page());
        }

        Ok(keys)
    }

    /// Closes the WAL, fsyncing it first.
    pub fn close(&mut self) -> Result<()> {
        self.wal.close()
    }

    pub fn root_pid(&self) -> u64 {
        self.root_pid
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn wal_sync_count(&self) -> u64 {
        self.wal.sync_count()
    }

    pub fn wal_size(&self) -> Result<u64> {
        self.wal.size()
    }

    /// Re-applies every logged operation through the normal insert path,
    /// then truncates the log.
    fn replay_wal(&mut self) -> Result<()> {
        let entries = self.wal.read_all()?;
        if entries.is_empty() {
            return Ok(());
        }

        tracing::info!(count = entries.len(), "replaying WAL entries");

        for (index, entry) in entries.iter().enumerate() {
            match entry.op {
                WalOp::Insert => {
                    self.apply_insert(entry.key, &entry.value)
                        .map_err(|err| Error::WalReplayFailed {
                            index,
                            source: Box::new(err),
                        })?;
                }
                op => {
                    return Err(Error::WalReplayFailed {
                        index,
                        source: Box::new(Error::corruption(format!(
                            "unsupported WAL operation {op:?}"
                        ))),
                    });
                }
            }
        }

        // replayed state must reach the page file before the log that
        // produced it is discarded
        self.pool.flush()?;
        self.wal.truncate()
    }

    /// The insert algorithm without the WAL append; replay reuses it.
    fn apply_insert(&mut self, key: u32, value: &str) -> Result<()> {
        let record = Record::from_parts(key, value);
        let leaf_pid = self.find_leaf_page(key)?;

        if let Some((promoted, new_pid)) = self.insert_into_leaf(leaf_pid, &record)? {
            self.insert_into_parent(leaf_pid, promoted, new_pid)?;
        }

        Ok(())
    }

    /// Tries a plain insert; on `PageFull` splits the leaf and returns the
    /// copied-up separator with the new right leaf.
    fn insert_into_leaf(&mut self, pid: u64, record: &Record) -> Result<Option<(u32, u64)>> {
        let mut page = self.pool.read_page(pid)?;

        let full = {
            let mut leaf = LeafPageMut::new(&mut page)?;
            match leaf.insert_record(record) {
                Ok(()) => false,
                Err(Error::PageFull { .. }) => true,
                Err(err) => return Err(err),
            }
        };

        if full {
            return self.split_leaf(pid, page, record).map(Some);
        }

        self.pool.write_page(pid, &page)?;
        Ok(None)
    }

    /// Splits a full leaf around the middle of its records plus the new one.
    /// The left half rebuilds in place, the right half goes to a fresh leaf,
    /// and the chain is relinked. Copy-up: the promoted key is the first key
    /// of the right leaf and stays there.
    fn split_leaf(&mut self, pid: u64, mut page: Page, record: &Record) -> Result<(u32, u64)> {
        let mut keyed: Vec<(u32, Record)> = Vec::new();
        for existing in LeafPage::new(&page)?.records()? {
            keyed.push((existing.key_as_u32()?, existing));
        }
        keyed.push((record.key_as_u32()?, record.clone()));
        keyed.sort_by_key(|(key, _)| *key);

        let split = keyed.len() / 2;
        let promoted = keyed[split].0;

        let (new_pid, mut new_page) = allocate_typed_page(&self.pool, PageType::Leaf)?;

        {
            let mut left = LeafPageMut::new(&mut page)?;
            left.clear();
            for (_, r) in &keyed[..split] {
                left.insert_record(r)?;
            }
        }
        {
            let mut right = LeafPageMut::new(&mut new_page)?;
            for (_, r) in &keyed[split..] {
                right.insert_record(r)?;
            }
        }

        let old_next = page.header().next_page();
        new_page.header_mut().set_next_page(old_next);
        page.header_mut().set_next_page(new_pid as u32);
        let parent = page.header().parent();
        new_page.header_mut().set_parent(parent);

        self.pool.write_page(pid, &page)?;
        self.pool.write_page(new_pid, &new_page)?;

        Ok((promoted, new_pid))
    }

    /// Hangs `(key, right_pid)` under the parent of `left_pid`, creating a
    /// new root when the left page is the root and splitting the parent when
    /// it is full.
    fn insert_into_parent(&mut self, left_pid: u64, key: u32, right_pid: u64) -> Result<()> {
        let left = self.pool.read_page(left_pid)?;
        let parent = left.header().parent();
        if parent == 0 {
            return self.create_new_root(left_pid, key, right_pid);
        }

        let parent_pid = u64::from(parent);
        let mut parent_page = self.pool.read_page(parent_pid)?;

        let full = {
            let mut node = InternalPageMut::new(&mut parent_page)?;
            match node.insert_entry(key, right_pid) {
                Ok(()) => false,
                Err(Error::PageFull { .. }) => true,
                Err(err) => return Err(err),
            }
        };

        if full {
            return self.split_internal(parent_pid, parent_page, key, right_pid);
        }

        self.set_parent(right_pid, parent_pid)?;
        self.pool.write_page(parent_pid, &parent_page)?;
        Ok(())
    }

    /// Splits a full internal page around its middle entry. Push-up: the
    /// middle key moves to the parent and appears in neither half; the
    /// middle entry's child becomes the right half's leftmost pointer.
    fn split_internal(
        &mut self,
        pid: u64,
        mut page: Page,
        new_key: u32,
        new_child: u64,
    ) -> Result<()> {
        let (mut entries, leftmost) = {
            let node = InternalPage::new(&page)?;
            let mut entries = Vec::with_capacity(node.num_keys() + 1);
            for i in 0..node.num_keys() {
                entries.push(node.entry_at(i)?);
            }
            (entries, node.leftmost_child())
        };

        let position = entries
            .iter()
            .position(|&(key, _)| new_key < key)
            .unwrap_or(entries.len());
        entries.insert(position, (new_key, new_child));

        let middle = entries.len() / 2;
        let (middle_key, middle_child) = entries[middle];

        let (new_pid, mut new_page) = allocate_typed_page(&self.pool, PageType::Internal)?;

        {
            let mut left = InternalPageMut::new(&mut page)?;
            left.clear();
            left.set_leftmost_child(leftmost);
            for &(key, child) in &entries[..middle] {
                left.insert_entry(key, child)?;
            }
        }
        {
            let mut right = InternalPageMut::new(&mut new_page)?;
            right.set_leftmost_child(middle_child);
            for &(key, child) in &entries[middle + 1..] {
                right.insert_entry(key, child)?;
            }
        }

        let parent = page.header().parent();
        new_page.header_mut().set_parent(parent);

        // every child now referenced by the right half points back at it
        self.set_parent(middle_child, new_pid)?;
        for &(_, child) in &entries[middle + 1..] {
            self.set_parent(child, new_pid)?;
        }

        self.pool.write_page(pid, &page)?;
        self.pool.write_page(new_pid, &new_page)?;

        self.insert_into_parent(pid, middle_key, new_pid)
    }

    /// Root promotion: a new internal root over the two halves of the old
    /// root. Rewrites the metadata sidecar with the new root.
    fn create_new_root(&mut self, left_pid: u64, key: u32, right_pid: u64) -> Result<()> {
        let (root_pid, mut root_page) = allocate_typed_page(&self.pool, PageType::Internal)?;

        {
            let mut root = InternalPageMut::new(&mut root_page)?;
            root.set_leftmost_child(left_pid);
            root.insert_entry(key, right_pid)?;
        }

        self.set_parent(left_pid, root_pid)?;
        self.set_parent(right_pid, root_pid)?;
        self.pool.write_page(root_pid, &root_page)?;

        self.root_pid = root_pid;

        // the tree under the new root must be durable before the sidecar
        // names it, or a crash would hand recovery an unreadable root
        self.pool.flush()?;
        if let Err(err) = self.save_metadata() {
            tracing::warn!(error = %err, "failed to rewrite metadata sidecar after root promotion");
        }

        Ok(())
    }

    fn set_parent(&self, pid: u64, parent_pid: u64) -> Result<()> {
        let mut page = self.pool.read_page(pid)?;
        page.header_mut().set_parent(parent_pid as u32);
        self.pool.write_page(pid, &page)
    }

    fn find_leaf_page(&self, key: u32) -> Result<u64> {
        let mut pid = self.root_pid;

        loop {
            let page = self.pool.read_page(pid)?;
            match page.page_type() {
                PageType::Leaf => return Ok(pid),
                PageType::Internal => {
                    let node = InternalPage::new(&page)?;
                    pid = node.search_child(key)?;
                }
                other => {
                    return Err(Error::corruption(format!(
                        "unexpected {other:?} page {pid} while descending"
                    )));
                }
            }
        }
    }

    fn find_leftmost_leaf(&self) -> Result<u64> {
        let mut pid = self.root_pid;

        loop {
            let page = self.pool.read_page(pid)?;
            match page.page_type() {
                PageType::Leaf => return Ok(pid),
                PageType::Internal => {
                    let node = InternalPage::new(&page)?;
                    pid = node.leftmost_child();
                }
                other => {
                    return Err(Error::corruption(format!(
                        "unexpected {other:?} page {pid} while descending"
                    )));
                }
            }
        }
    }

    fn save_metadata(&self) -> Result<()> {
        TreeMeta {
            root_pid: self.root_pid,
            order: self.order,
        }
        .save(&self.meta_path)
    }
}

/// `<wal path>.meta`, next to the log it describes.
fn sidecar_path(wal_path: &Path) -> PathBuf {
    let mut name = wal_path.as_os_str().to_os_string();
    name.push(".meta");
    PathBuf::from(name)
}

fn allocate_typed_page(pool: &BufferPool, page_type: PageType) -> Result<(u64, Page)> {
    let pid = pool.allocate()?;
    let page = Page::new(page_type);
    pool.write_page(pid, &page)?;
    Ok((pid, page))
}
