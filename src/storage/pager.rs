//! # File Pager
//!
//! Maps page identifiers onto fixed offsets of a single regular file. The
//! pager is the only component that touches the database file; everything
//! above it speaks in 4096-byte page images.
//!
//! ## File Layout
//!
//! ```text
//! Offset        Content
//! ------------  ----------------------------------------
//! 0             Page 0: free-page directory
//! 4096          Page 1
//! 8192          Page 2
//! ...           ...
//! ```
//!
//! The file length is always `num_pages * 4096`. Pages are allocated densely:
//! `allocate` pops the free-page directory when it has a reclaimable entry
//! and extends the file otherwise.
//!
//! ## Durability
//!
//! Every `write_page` is followed by an fsync, so a page image that has been
//! written through the pager is durable when the call returns. Callers that
//! want deferred writes put the buffer pool in front of the pager.
//!
//! ## Open Protocol
//!
//! An empty file is initialised with an empty free-page directory on page 0.
//! A non-empty file must be a whole number of pages and page 0 must decode as
//! a directory; anything else is reported as corruption.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::freelist::FreeList;
use super::page::Page;
use super::{PageBuf, FREE_DIRECTORY_PID, PAGE_SIZE};

pub struct FilePager {
    file: Option<File>,
    path: PathBuf,
    num_pages: u64,
    free_list: FreeList,
}

impl FilePager {
    /// Opens or creates the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(format!("open {}", path.display()), e))?;

        let len = file
            .metadata()
            .map_err(|e| Error::io(format!("stat {}", path.display()), e))?
            .len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(Error::corruption(format!(
                "database file {} has length {} which is not a multiple of the page size",
                path.display(),
                len
            )));
        }

        let num_pages = len / PAGE_SIZE as u64;
        let mut pager = Self {
            file: Some(file),
            path,
            num_pages,
            free_list: FreeList::new(),
        };

        if num_pages == 0 {
            pager.init_free_directory()?;
        } else {
            pager.load_free_directory()?;
        }

        Ok(pager)
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::Closed)
    }

    /// Returns the 4096-byte image of `pid`. The read is a single
    /// `read_exact`, so it is never torn.
    pub fn read_page(&mut self, pid: u64) -> Result<PageBuf> {
        if pid >= self.num_pages {
            return Err(Error::OutOfRange {
                what: "page",
                index: pid,
                bound: self.num_pages,
            });
        }

        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(pid * PAGE_SIZE as u64))
            .map_err(|e| Error::io(format!("seek to page {pid}"), e))?;

        let mut buf: PageBuf = Box::new([0u8; PAGE_SIZE]);
        file.read_exact(&mut buf[..])
            .map_err(|e| Error::io(format!("read page {pid}"), e))?;

        Ok(buf)
    }

    /// Writes a full page image at `pid` and fsyncs.
    pub fn write_page(&mut self, pid: u64, data: &[u8]) -> Result<()> {
        if data.len() != PAGE_SIZE {
            return Err(Error::BadSize {
                got: data.len(),
                expected: PAGE_SIZE,
            });
        }
        if pid >= self.num_pages {
            return Err(Error::OutOfRange {
                what: "page",
                index: pid,
                bound: self.num_pages,
            });
        }

        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(pid * PAGE_SIZE as u64))
            .map_err(|e| Error::io(format!("seek to page {pid}"), e))?;
        file.write_all(data)
            .map_err(|e| Error::io(format!("write page {pid}"), e))?;
        file.sync_all()
            .map_err(|e| Error::io(format!("sync page {pid}"), e))?;

        Ok(())
    }

    /// Allocates a page: reuses the most recently freed identifier when the
    /// directory has one, otherwise extends the file. Either way the page is
    /// zero-filled on return.
    pub fn allocate(&mut self) -> Result<u64> {
        if let Some(pid) = self.free_list.pop() {
            if let Err(err) = self.write_page(pid, &[0u8; PAGE_SIZE]) {
                self.free_list.push(pid);
                return Err(err);
            }
            if let Err(err) = self.save_free_directory() {
                self.free_list.push(pid);
                return Err(err);
            }
            return Ok(pid);
        }

        let pid = self.num_pages;
        self.num_pages += 1;
        if let Err(err) = self.write_page(pid, &[0u8; PAGE_SIZE]) {
            self.num_pages -= 1;
            return Err(err);
        }

        Ok(pid)
    }

    /// Pushes `pid` onto the free-page directory and rewrites page 0.
    /// Page 0 itself can never be freed.
    pub fn free(&mut self, pid: u64) -> Result<()> {
        if pid == FREE_DIRECTORY_PID || pid >= self.num_pages {
            return Err(Error::OutOfRange {
                what: "freeable page",
                index: pid,
                bound: self.num_pages,
            });
        }

        self.free_list.push(pid);
        self.save_free_directory()
    }

    pub fn num_pages(&self) -> u64 {
        self.num_pages
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the file handle. Subsequent operations fail with `Closed`;
    /// closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.file.take();
        Ok(())
    }

    fn init_free_directory(&mut self) -> Result<()> {
        self.num_pages = 1;
        self.save_free_directory()
    }

    fn load_free_directory(&mut self) -> Result<()> {
        let buf = self.read_page(FREE_DIRECTORY_PID)?;
        let page = Page::from_buf(buf);
        self.free_list = FreeList::decode_from_page(&page)?;
        Ok(())
    }

    fn save_free_directory(&mut self) -> Result<()> {
        let page = self.free_list.encode_to_page()?;
        self.write_page(FREE_DIRECTORY_PID, page.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_pager(dir: &tempfile::TempDir) -> FilePager {
        FilePager::open(dir.path().join("test.db")).unwrap()
    }

    #[test]
    fn open_empty_file_initialises_directory_page() {
        let dir = tempdir().unwrap();
        let pager = open_pager(&dir);

        assert_eq!(pager.num_pages(), 1);
        assert_eq!(pager.free_count(), 0);

        let len = std::fs::metadata(dir.path().join("test.db")).unwrap().len();
        assert_eq!(len, PAGE_SIZE as u64);
    }

    #[test]
    fn allocate_extends_file_densely() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        assert_eq!(pager.allocate().unwrap(), 1);
        assert_eq!(pager.allocate().unwrap(), 2);
        assert_eq!(pager.num_pages(), 3);

        let len = std::fs::metadata(dir.path().join("test.db")).unwrap().len();
        assert_eq!(len, 3 * PAGE_SIZE as u64);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        let pid = pager.allocate().unwrap();
        let mut image = [0u8; PAGE_SIZE];
        image[0] = 0xAB;
        image[PAGE_SIZE - 1] = 0xCD;
        pager.write_page(pid, &image).unwrap();

        let back = pager.read_page(pid).unwrap();
        assert_eq!(back[0], 0xAB);
        assert_eq!(back[PAGE_SIZE - 1], 0xCD);
    }

    #[test]
    fn read_out_of_range_fails() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        let result = pager.read_page(9);
        assert!(matches!(
            result,
            Err(Error::OutOfRange { index: 9, bound: 1, .. })
        ));
    }

    #[test]
    fn write_wrong_size_fails() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        let result = pager.write_page(0, &[0u8; 100]);
        assert!(matches!(result, Err(Error::BadSize { got: 100, .. })));
    }

    #[test]
    fn freed_page_is_reused_lifo() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        let a = pager.allocate().unwrap();
        let b = pager.allocate().unwrap();
        pager.free(a).unwrap();
        pager.free(b).unwrap();
        assert_eq!(pager.free_count(), 2);

        assert_eq!(pager.allocate().unwrap(), b);
        assert_eq!(pager.allocate().unwrap(), a);
        assert_eq!(pager.num_pages(), 3);
    }

    #[test]
    fn reclaimed_page_is_zero_filled() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        let pid = pager.allocate().unwrap();
        pager.write_page(pid, &[0xFFu8; PAGE_SIZE]).unwrap();
        pager.free(pid).unwrap();

        let again = pager.allocate().unwrap();
        assert_eq!(again, pid);
        let back = pager.read_page(again).unwrap();
        assert!(back.iter().all(|&b| b == 0));
    }

    #[test]
    fn directory_page_cannot_be_freed() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        assert!(matches!(
            pager.free(0),
            Err(Error::OutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn free_list_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = FilePager::open(&path).unwrap();
            let a = pager.allocate().unwrap();
            pager.allocate().unwrap();
            pager.free(a).unwrap();
            pager.close().unwrap();
        }

        let mut pager = FilePager::open(&path).unwrap();
        assert_eq!(pager.free_count(), 1);
        assert_eq!(pager.allocate().unwrap(), 1);
    }

    #[test]
    fn operations_after_close_fail_closed() {
        let dir = tempdir().unwrap();
        let mut pager = open_pager(&dir);

        pager.close().unwrap();

        assert!(matches!(pager.read_page(0), Err(Error::Closed)));
        assert!(matches!(
            pager.write_page(0, &[0u8; PAGE_SIZE]),
            Err(Error::Closed)
        ));
        assert!(pager.close().is_ok());
    }

    #[test]
    fn open_rejects_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, [0u8; 100]).unwrap();

        let result = FilePager::open(&path);
        assert!(matches!(result, Err(Error::Corruption(_))));
    }
}
