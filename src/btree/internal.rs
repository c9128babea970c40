//! # Internal Page Codec
//!
//! Internal pages route key lookups to children. The body holds one leftmost
//! child pointer followed by sorted separator entries:
//!
//! ```text
//! Offset  Content
//! ------  -----------------------------------------------
//! 0       P0: leftmost child (u64)
//! 8       entry 0: key K1 (u32), child P1 (u64)
//! 20      entry 1: key K2 (u32), child P2 (u64)
//! ...
//! ```
//!
//! With `n` separator keys there are `n + 1` children. Keys under `P0` are
//! below `K1`; keys under `Pi` lie in `[Ki, Ki+1)`; keys under `Pn` are at or
//! above `Kn`. Separator keys are strictly increasing.
//!
//! At 12 bytes per entry a page routes up to 339 children, so internal
//! splits only appear in trees with tens of thousands of records.

use crate::error::{Error, Result};
use crate::storage::{Page, PageType, PAGE_BODY_SIZE};

pub const ENTRY_SIZE: usize = 12;
const LEFTMOST_SIZE: usize = 8;
const KEY_SIZE: usize = 4;

/// Largest number of separator entries one page can hold.
pub const fn max_entries() -> usize {
    (PAGE_BODY_SIZE - LEFTMOST_SIZE) / ENTRY_SIZE
}

#[derive(Debug)]
pub struct InternalPage<'a> {
    page: &'a Page,
}

pub struct InternalPageMut<'a> {
    page: &'a mut Page,
}

fn check_internal(page: &Page) -> Result<()> {
    if page.page_type() != PageType::Internal {
        return Err(Error::corruption(format!(
            "expected Internal page, got {:?}",
            page.page_type()
        )));
    }
    Ok(())
}

fn leftmost_child(page: &Page) -> u64 {
    u64::from_le_bytes(page.body()[0..LEFTMOST_SIZE].try_into().unwrap())
}

fn entry_at(page: &Page, index: usize) -> Result<(u32, u64)> {
    let num_keys = page.header().num_keys() as usize;
    if index >= num_keys {
        return Err(Error::OutOfRange {
            what: "entry",
            index: index as u64,
            bound: num_keys as u64,
        });
    }
    let offset = LEFTMOST_SIZE + index * ENTRY_SIZE;
    let body = page.body();
    let key = u32::from_le_bytes(body[offset..offset + KEY_SIZE].try_into().unwrap());
    let child = u64::from_le_bytes(
        body[offset + KEY_SIZE..offset + ENTRY_SIZE].try_into().unwrap(),
    );
    Ok((key, child))
}

/// The child to descend into for `key`: the child left of the first
/// separator above `key`, or the last child when no separator is above it.
fn search_child(page: &Page, key: u32) -> Result<u64> {
    let num_keys = page.header().num_keys() as usize;
    if num_keys == 0 {
        return Ok(leftmost_child(page));
    }

    for i in 0..num_keys {
        let (separator, _) = entry_at(page, i)?;
        if key < separator {
            return if i == 0 {
                Ok(leftmost_child(page))
            } else {
                Ok(entry_at(page, i - 1)?.1)
            };
        }
    }

    Ok(entry_at(page, num_keys - 1)?.1)
}

impl<'a> InternalPage<'a> {
    pub fn new(page: &'a Page) -> Result<Self> {
        check_internal(page)?;
        Ok(Self { page })
    }

    pub fn num_keys(&self) -> usize {
        self.page.header().num_keys() as usize
    }

    pub fn leftmost_child(&self) -> u64 {
        leftmost_child(self.page)
    }

    pub fn entry_at(&self, index: usize) -> Result<(u32, u64)> {
        entry_at(self.page, index)
    }

    pub fn search_child(&self, key: u32) -> Result<u64> {
        search_child(self.page, key)
    }
}

impl<'a> InternalPageMut<'a> {
    pub fn new(page: &'a mut Page) -> Result<Self> {
        check_internal(page)?;
        Ok(Self { page })
    }

    pub fn num_keys(&self) -> usize {
        self.page.header().num_keys() as usize
    }

    pub fn leftmost_child(&self) -> u64 {
        leftmost_child(self.page)
    }

    pub fn entry_at(&self, index: usize) -> Result<(u32, u64)> {
        entry_at(self.page, index)
    }

    pub fn search_child(&self, key: u32) -> Result<u64> {
        search_child(self.page, key)
    }

    pub fn set_leftmost_child(&mut self, pid: u64) {
        self.page.body_mut()[0..LEFTMOST_SIZE].copy_from_slice(&pid.to_le_bytes());
    }

    /// Writes an entry at `index`, which may be one past the current count
    /// during shifts and appends.
    fn set_entry(&mut self, index: usize, key: u32, child: u64) -> Result<()> {
        let offset = LEFTMOST_SIZE + index * ENTRY_SIZE;
        if offset + ENTRY_SIZE > PAGE_BODY_SIZE {
            return Err(Error::OutOfRange {
                what: "entry",
                index: index as u64,
                bound: max_entries() as u64,
            });
        }
        let body = self.page.body_mut();
        body[offset..offset + KEY_SIZE].copy_from_slice(&key.to_le_bytes());
        body[offset + KEY_SIZE..offset + ENTRY_SIZE].copy_from_slice(&child.to_le_bytes());
        Ok(())
    }

    /// Inserts `(key, child)` keeping separators sorted. Fails with
    /// `PageFull` when the body cannot hold another entry.
    pub fn insert_entry(&mut self, key: u32, child: u64) -> Result<()> {
        let num_keys = self.num_keys();
        if num_keys >= max_entries() {
            return Err(Error::PageFull {
                needed: ENTRY_SIZE,
                available: PAGE_BODY_SIZE - LEFTMOST_SIZE - num_keys * ENTRY_SIZE,
            });
        }

        let mut position = num_keys;
        for i in 0..num_keys {
            let (separator, _) = entry_at(self.page, i)?;
            if key < separator {
                position = i;
                break;
            }
        }

        let mut i = num_keys;
        while i > position {
            let (k, c) = entry_at(self.page, i - 1)?;
            self.set_entry(i, k, c)?;
            i -= 1;
        }
        self.set_entry(position, key, child)?;
        self.page.header_mut().set_num_keys((num_keys + 1) as u16);

        Ok(())
    }

    /// Drops every entry so a split can rebuild the page. The leftmost
    /// pointer is left for the caller to overwrite.
    pub fn clear(&mut self) {
        self.page.header_mut().set_num_keys(0);
    }
}
