//! # Page Types and Header Layout
//!
//! Every 4096-byte page begins with a 16-byte header describing what the page
//! holds and where it sits in the tree.
//!
//! ## Page Header Layout (16 bytes, little-endian)
//!
//! ```text
//! Offset  Size  Field      Description
//! ------  ----  ---------  ----------------------------------------
//! 0       2     page_type  0 = Free, 1 = Internal, 2 = Leaf
//! 2       2     num_keys   Number of records/entries in this page
//! 4       4     next_page  Leaf chain successor (0 = none)
//! 8       4     parent     Parent page (0 = root or unattached)
//! 12      4     reserved   Zero
//! ```
//!
//! The remaining 4080 bytes are the page body. Leaf and internal bodies have
//! their own layouts, implemented in `crate::btree::{leaf, internal}`; the
//! free-page directory body is implemented in `super::freelist`.
//!
//! ## Zero-Copy Access
//!
//! `PageHeader` is a `zerocopy` struct with explicit little-endian fields, so
//! it can be read by reference straight out of a page buffer regardless of
//! the buffer's alignment:
//!
//! ```text
//! let header = PageHeader::from_bytes(&page_data[..16])?;
//! ```
//!
//! ## Ownership
//!
//! `Page` owns a boxed 4096-byte buffer. The buffer pool hands out `Page`
//! values as defensive copies; codecs borrow into them as typed views.

use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{Error, Result};

use super::{PageBuf, PAGE_HEADER_SIZE, PAGE_SIZE};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Free = 0,
    Internal = 1,
    Leaf = 2,
    Unknown = 0xFFFF,
}

impl PageType {
    pub fn from_u16(v: u16) -> Self {
        match v {
            0 => PageType::Free,
            1 => PageType::Internal,
            2 => PageType::Leaf,
            _ => PageType::Unknown,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct PageHeader {
    page_type: U16<LittleEndian>,
    num_keys: U16<LittleEndian>,
    next_page: U32<LittleEndian>,
    parent: U32<LittleEndian>,
    reserved: U32<LittleEndian>,
}

impl PageHeader {
    pub fn new(page_type: PageType) -> Self {
        Self {
            page_type: U16::new(page_type as u16),
            num_keys: U16::new(0),
            next_page: U32::new(0),
            parent: U32::new(0),
            reserved: U32::new(0),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        if data.len() < size_of::<Self>() {
            return Err(Error::corruption(format!(
                "buffer too small for page header: {} < {}",
                data.len(),
                size_of::<Self>()
            )));
        }
        Self::ref_from_bytes(&data[..size_of::<Self>()])
            .map_err(|e| Error::corruption(format!("failed to read page header: {e:?}")))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        if data.len() < size_of::<Self>() {
            return Err(Error::corruption(format!(
                "buffer too small for page header: {} < {}",
                data.len(),
                size_of::<Self>()
            )));
        }
        Self::mut_from_bytes(&mut data[..size_of::<Self>()])
            .map_err(|e| Error::corruption(format!("failed to read page header: {e:?}")))
    }

    pub fn page_type(&self) -> PageType {
        PageType::from_u16(self.page_type.get())
    }

    pub fn set_page_type(&mut self, page_type: PageType) {
        self.page_type.set(page_type as u16);
    }

    pub fn num_keys(&self) -> u16 {
        self.num_keys.get()
    }

    pub fn set_num_keys(&mut self, count: u16) {
        self.num_keys.set(count);
    }

    pub fn next_page(&self) -> u32 {
        self.next_page.get()
    }

    pub fn set_next_page(&mut self, pid: u32) {
        self.next_page.set(pid);
    }

    pub fn parent(&self) -> u32 {
        self.parent.get()
    }

    pub fn set_parent(&mut self, pid: u32) {
        self.parent.set(pid);
    }
}

/// An owned page image: 16-byte header plus 4080-byte body.
#[derive(Clone)]
pub struct Page {
    data: PageBuf,
}

impl Page {
    pub fn new(page_type: PageType) -> Self {
        let mut data: PageBuf = Box::new([0u8; PAGE_SIZE]);
        data[..PAGE_HEADER_SIZE].copy_from_slice(PageHeader::new(page_type).as_bytes());
        Self { data }
    }

    pub fn from_buf(data: PageBuf) -> Self {
        Self { data }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(Error::BadSize {
                got: bytes.len(),
                expected: PAGE_SIZE,
            });
        }
        let mut data: PageBuf = Box::new([0u8; PAGE_SIZE]);
        data.copy_from_slice(bytes);
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    pub fn header(&self) -> &PageHeader {
        PageHeader::from_bytes(&self.data[..]).unwrap() // INVARIANT: buffer is always PAGE_SIZE bytes
    }

    pub fn header_mut(&mut self) -> &mut PageHeader {
        PageHeader::from_bytes_mut(&mut self.data[..]).unwrap() // INVARIANT: buffer is always PAGE_SIZE bytes
    }

    pub fn body(&self) -> &[u8] {
        &self.data[PAGE_HEADER_SIZE..]
    }

    pub fn body_mut(&mut self) -> &mut [u8] {
        &mut self.data[PAGE_HEADER_SIZE..]
    }

    pub fn page_type(&self) -> PageType {
        self.header().page_type()
    }

    pub fn is_leaf(&self) -> bool {
        self.page_type() == PageType::Leaf
    }

    pub fn is_internal(&self) -> bool {
        self.page_type() == PageType::Internal
    }

    pub fn is_free(&self) -> bool {
        self.page_type() == PageType::Free
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = self.header();
        f.debug_struct("Page")
            .field("page_type", &header.page_type())
            .field("num_keys", &header.num_keys())
            .field("next_page", &header.next_page())
            .field("parent", &header.parent())
            .finish()
    }
}
