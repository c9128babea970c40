//! # LRU Buffer Pool
//!
//! A bounded cache of page images interposed between the B+tree and the
//! pager. Reads are served from memory when possible; writes land in the
//! cache as dirty frames and reach the pager only on eviction, flush, or
//! close.
//!
//! ## Structure
//!
//! ```text
//! map: pid -> frame index            frames: Vec<Frame>
//! ┌─────────────┐                    ┌──────┬──────┬───────┬───────┬───┐
//! │ 7 -> 3      │                    │ HEAD │ TAIL │ pid=9 │ pid=7 │...│
//! │ 9 -> 2      │                    └──┬───┴──▲───┴───────┴───────┴───┘
//! └─────────────┘                       │      │
//!            recency list: HEAD <-> MRU ... LRU <-> TAIL
//! ```
//!
//! The recency list is a doubly linked list threaded through frame indices,
//! with dummy head and tail sentinels at slots 0 and 1 so splicing never
//! branches on list ends. The map and the list are mutated together under
//! one mutex; a frame is in both or in neither.
//!
//! ## Eviction
//!
//! The least recently used frame sits just before the tail sentinel. If it
//! is dirty it is written back through the pager first; a failed write-back
//! is logged and the eviction proceeds (see DESIGN.md for the trade-off).
//!
//! ## Defensive Copies
//!
//! `read` and `write` move whole page images across the API boundary, so a
//! caller can never alias a cached buffer. Statistics count every `read` and
//! `write` call as exactly one hit or one miss.

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::config::DEFAULT_BUFFER_POOL_CAPACITY;
use crate::error::{Error, Result};

use super::page::Page;
use super::pager::FilePager;
use super::{PageBuf, PAGE_SIZE};

const HEAD: usize = 0;
const TAIL: usize = 1;

struct Frame {
    pid: u64,
    data: PageBuf,
    dirty: bool,
    prev: usize,
    next: usize,
}

impl Frame {
    fn sentinel() -> Self {
        Self {
            pid: u64::MAX,
            data: Box::new([0u8; PAGE_SIZE]),
            dirty: false,
            prev: HEAD,
            next: TAIL,
        }
    }
}

struct PoolInner {
    pager: FilePager,
    capacity: usize,
    frames: Vec<Frame>,
    free_slots: Vec<usize>,
    map: HashMap<u64, usize>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl PoolInner {
    fn new(pager: FilePager, capacity: usize) -> Self {
        let mut frames = Vec::with_capacity(capacity + 2);
        frames.push(Frame::sentinel());
        frames.push(Frame::sentinel());
        frames[HEAD].next = TAIL;
        frames[TAIL].prev = HEAD;

        Self {
            pager,
            capacity,
            frames,
            free_slots: Vec::new(),
            map: HashMap::with_capacity(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn unlink(&mut self, idx: usize) {
        let prev = self.frames[idx].prev;
        let next = self.frames[idx].next;
        self.frames[prev].next = next;
        self.frames[next].prev = prev;
    }

    fn link_front(&mut self, idx: usize) {
        let first = self.frames[HEAD].next;
        self.frames[idx].prev = HEAD;
        self.frames[idx].next = first;
        self.frames[first].prev = idx;
        self.frames[HEAD].next = idx;
    }

    fn touch(&mut self, idx: usize) {
        self.unlink(idx);
        self.link_front(idx);
    }

    /// Drops the LRU frame, writing it back first when dirty.
    fn evict_lru(&mut self) {
        let lru = self.frames[TAIL].prev;
        if lru == HEAD {
            return;
        }

        if self.frames[lru].dirty {
            let pid = self.frames[lru].pid;
            let frame = &self.frames[lru];
            if let Err(err) = self.pager.write_page(pid, &frame.data[..]) {
                tracing::warn!(pid, error = %err, "failed to write back dirty page during eviction");
            }
        }

        let pid = self.frames[lru].pid;
        self.unlink(lru);
        self.map.remove(&pid);
        self.free_slots.push(lru);
        self.evictions += 1;
    }

    /// Inserts a new frame at the MRU position, evicting first if at
    /// capacity. The caller has already checked the pid is absent.
    fn insert(&mut self, pid: u64, data: PageBuf, dirty: bool) {
        if self.map.len() >= self.capacity {
            self.evict_lru();
        }

        let frame = Frame {
            pid,
            data,
            dirty,
            prev: HEAD,
            next: TAIL,
        };

        let idx = match self.free_slots.pop() {
            Some(idx) => {
                self.frames[idx] = frame;
                idx
            }
            None => {
                self.frames.push(frame);
                self.frames.len() - 1
            }
        };

        self.map.insert(pid, idx);
        self.link_front(idx);
    }

    fn flush(&mut self) -> Result<()> {
        let PoolInner { pager, frames, map, .. } = self;
        for &idx in map.values() {
            if frames[idx].dirty {
                pager.write_page(frames[idx].pid, &frames[idx].data[..])?;
                frames[idx].dirty = false;
            }
        }
        Ok(())
    }

    fn dirty_count(&self) -> usize {
        self.map
            .values()
            .filter(|&&idx| self.frames[idx].dirty)
            .count()
    }
}

pub struct BufferPool {
    inner: Mutex<PoolInner>,
}

impl BufferPool {
    /// Wraps `pager` with a cache of `capacity` frames. A zero capacity
    /// falls back to the default of 64.
    pub fn new(pager: FilePager, capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_BUFFER_POOL_CAPACITY
        } else {
            capacity
        };
        Self {
            inner: Mutex::new(PoolInner::new(pager, capacity)),
        }
    }

    /// Returns a copy of the page image, reading through the pager on miss.
    pub fn read(&self, pid: u64) -> Result<PageBuf> {
        let mut inner = self.inner.lock();

        if let Some(&idx) = inner.map.get(&pid) {
            inner.hits += 1;
            inner.touch(idx);
            return Ok(inner.frames[idx].data.clone());
        }

        inner.misses += 1;
        let data = inner.pager.read_page(pid)?;
        inner.insert(pid, data.clone(), false);
        Ok(data)
    }

    /// Copies `data` into the cache and marks the frame dirty; the disk
    /// write is deferred until eviction or flush.
    pub fn write(&self, pid: u64, data: &[u8]) -> Result<()> {
        if data.len() != PAGE_SIZE {
            return Err(Error::BadSize {
                got: data.len(),
                expected: PAGE_SIZE,
            });
        }

        let mut inner = self.inner.lock();

        if let Some(&idx) = inner.map.get(&pid) {
            inner.hits += 1;
            inner.frames[idx].data.copy_from_slice(data);
            inner.frames[idx].dirty = true;
            inner.touch(idx);
            return Ok(());
        }

        inner.misses += 1;
        let mut buf: PageBuf = Box::new([0u8; PAGE_SIZE]);
        buf.copy_from_slice(data);
        inner.insert(pid, buf, true);
        Ok(())
    }

    /// Allocates a fresh page through the pager. The new page is not cached
    /// until it is first read or written.
    pub fn allocate(&self) -> Result<u64> {
        self.inner.lock().pager.allocate()
    }

    /// Writes every dirty frame through the pager and clears dirty flags.
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    /// Flushes all dirty frames, drops them, then closes the underlying
    /// pager. Later reads miss the empty cache and fail with `Closed`.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.flush()?;
        inner.pager.close()?;

        inner.map.clear();
        inner.free_slots.clear();
        inner.frames.truncate(2);
        inner.frames[HEAD].next = TAIL;
        inner.frames[TAIL].prev = HEAD;
        Ok(())
    }

    pub fn read_page(&self, pid: u64) -> Result<Page> {
        Ok(Page::from_buf(self.read(pid)?))
    }

    pub fn write_page(&self, pid: u64, page: &Page) -> Result<()> {
        self.write(pid, page.as_bytes())
    }

    pub fn stats(&self) -> BufferPoolStats {
        let inner = self.inner.lock();
        let lookups = inner.hits + inner.misses;
        BufferPoolStats {
            capacity: inner.capacity,
            size: inner.map.len(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            hit_rate: if lookups > 0 {
                inner.hits as f64 / lookups as f64
            } else {
                0.0
            },
            dirty_pages: inner.dirty_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferPoolStats {
    pub capacity: usize,
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
    pub dirty_pages: usize,
}
