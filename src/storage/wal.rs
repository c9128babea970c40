//! # Write-Ahead Log
//!
//! Append-only log of mutating operations. Every mutation is serialised and
//! fsynced here before the in-memory tree is touched, so after a crash the
//! durable state is exactly the prefix of operations whose append returned.
//!
//! ## Entry Format
//!
//! ```text
//! +--------+----------+----------------+------------------+
//! | op: u8 | key: u32 | value_len: u32 | value bytes      |
//! +--------+----------+----------------+------------------+
//! ```
//!
//! Little-endian, no per-entry checksum. `0x01` is insert; `0x02` and `0x03`
//! are reserved for delete and update, which the engine does not perform.
//!
//! ## Read Protocol
//!
//! `read_all` seeks to the start, decodes entries until end of file, then
//! seeks back to the end so appends continue where they left off. A partial
//! trailing record is reported as corruption with its offset; torn tails are
//! not discarded silently.
//!
//! ## Lifecycle
//!
//! The log grows monotonically until `truncate`, which the tree calls after
//! a successful replay. The sync counter restarts at zero on truncation.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};

pub const WAL_ENTRY_HEADER_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalOp {
    Insert,
    Delete,
    Update,
}

impl WalOp {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(WalOp::Insert),
            0x02 => Some(WalOp::Delete),
            0x03 => Some(WalOp::Update),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            WalOp::Insert => 0x01,
            WalOp::Delete => 0x02,
            WalOp::Update => 0x03,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    pub op: WalOp,
    pub key: u32,
    pub value: String,
}

impl WalEntry {
    pub fn insert(key: u32, value: &str) -> Self {
        Self {
            op: WalOp::Insert,
            key,
            value: value.to_owned(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let value = self.value.as_bytes();
        let mut buf = Vec::with_capacity(WAL_ENTRY_HEADER_SIZE + value.len());
        buf.push(self.op.as_byte());
        buf.extend_from_slice(&self.key.to_le_bytes());
        buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buf.extend_from_slice(value);
        buf
    }
}

struct WalInner {
    file: Option<File>,
    syncs: u64,
}

pub struct Wal {
    path: PathBuf,
    inner: Mutex<WalInner>,
}

impl Wal {
    /// Opens or creates the log at `path` for append and read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::io(format!("open WAL {}", path.display()), e))?;

        Ok(Self {
            path,
            inner: Mutex::new(WalInner {
                file: Some(file),
                syncs: 0,
            }),
        })
    }

    /// Appends one entry and fsyncs before returning.
    pub fn append(&self, entry: &WalEntry) -> Result<()> {
        let mut inner = self.inner.lock();
        let file = inner.file.as_mut().ok_or(Error::Closed)?;

        let buf = entry.encode();
        file.write_all(&buf)
            .map_err(|e| Error::io(format!("append to WAL {}", self.path.display()), e))?;
        file.sync_all()
            .map_err(|e| Error::io(format!("sync WAL {}", self.path.display()), e))?;

        inner.syncs += 1;
        Ok(())
    }

    /// Decodes every entry from the start of the log, in append order, then
    /// seeks back to the end.
    pub fn read_all(&self) -> Result<Vec<WalEntry>> {
        let mut inner = self.inner.lock();
        let file = inner.file.as_mut().ok_or(Error::Closed)?;

        file.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io("seek to WAL start", e))?;

        let mut entries = Vec::new();
        let mut offset = 0u64;

        loop {
            let mut header = [0u8; WAL_ENTRY_HEADER_SIZE];
            let got = read_up_to(file, &mut header)?;
            if got == 0 {
                break;
            }
            if got < WAL_ENTRY_HEADER_SIZE {
                return Err(Error::corruption(format!(
                    "torn WAL entry header at offset {offset}: {got} of {WAL_ENTRY_HEADER_SIZE} bytes"
                )));
            }

            let op = WalOp::from_byte(header[0]).ok_or_else(|| {
                Error::corruption(format!(
                    "unknown WAL opcode {:#04x} at offset {offset}",
                    header[0]
                ))
            })?;
            let key = u32::from_le_bytes(header[1..5].try_into().unwrap());
            let value_len = u32::from_le_bytes(header[5..9].try_into().unwrap()) as usize;

            let mut value = vec![0u8; value_len];
            let got = read_up_to(file, &mut value)?;
            if got < value_len {
                return Err(Error::corruption(format!(
                    "torn WAL entry value at offset {offset}: {got} of {value_len} bytes"
                )));
            }
            let value = String::from_utf8(value).map_err(|_| {
                Error::corruption(format!("non-UTF-8 WAL value at offset {offset}"))
            })?;

            entries.push(WalEntry { op, key, value });
            offset += (WAL_ENTRY_HEADER_SIZE + value_len) as u64;
        }

        file.seek(SeekFrom::End(0))
            .map_err(|e| Error::io("seek to WAL end", e))?;

        Ok(entries)
    }

    /// Truncates the log to zero bytes and resets the sync counter.
    pub fn truncate(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let file = inner.file.as_mut().ok_or(Error::Closed)?;

        file.set_len(0)
            .map_err(|e| Error::io(format!("truncate WAL {}", self.path.display()), e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io("seek after WAL truncate", e))?;

        inner.syncs = 0;
        Ok(())
    }

    /// Fsyncs and closes the log. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(file) = inner.file.take() {
            file.sync_all()
                .map_err(|e| Error::io(format!("sync WAL {} on close", self.path.display()), e))?;
        }
        Ok(())
    }

    /// Current length of the log file in bytes.
    pub fn size(&self) -> Result<u64> {
        let inner = self.inner.lock();
        let file = inner.file.as_ref().ok_or(Error::Closed)?;
        let meta = file
            .metadata()
            .map_err(|e| Error::io(format!("stat WAL {}", self.path.display()), e))?;
        Ok(meta.len())
    }

    /// Number of successful append fsyncs since the last truncation.
    pub fn sync_count(&self) -> u64 {
        self.inner.lock().syncs
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads until `buf` is full or end of file; returns the number of bytes
/// actually read.
fn read_up_to(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file
            .read(&mut buf[filled..])
            .map_err(|e| Error::io("read WAL entry", e))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_wal(dir: &tempfile::TempDir) -> Wal {
        Wal::open(dir.path().join("test.wal")).unwrap()
    }

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = tempdir().unwrap();
        let wal = open_wal(&dir);

        let entries = vec![
            WalEntry::insert(100, "naruto"),
            WalEntry::insert(50, "sakura"),
            WalEntry::insert(200, ""),
        ];
        for entry in &entries {
            wal.append(entry).unwrap();
        }

        assert_eq!(wal.read_all().unwrap(), entries);
        // a second read sees the same entries; the cursor went back to the end
        assert_eq!(wal.read_all().unwrap(), entries);
    }

    #[test]
    fn append_after_read_all_lands_at_the_end() {
        let dir = tempdir().unwrap();
        let wal = open_wal(&dir);

        wal.append(&WalEntry::insert(1, "a")).unwrap();
        wal.read_all().unwrap();
        wal.append(&WalEntry::insert(2, "b")).unwrap();

        let entries = wal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].key, 2);
    }

    #[test]
    fn sync_count_tracks_appends_and_resets_on_truncate() {
        let dir = tempdir().unwrap();
        let wal = open_wal(&dir);

        wal.append(&WalEntry::insert(1, "x")).unwrap();
        wal.append(&WalEntry::insert(2, "y")).unwrap();
        assert_eq!(wal.sync_count(), 2);

        wal.truncate().unwrap();
        assert_eq!(wal.sync_count(), 0);
        assert_eq!(wal.size().unwrap(), 0);
        assert!(wal.read_all().unwrap().is_empty());
    }

    #[test]
    fn size_reports_serialized_length() {
        let dir = tempdir().unwrap();
        let wal = open_wal(&dir);

        wal.append(&WalEntry::insert(7, "abc")).unwrap();
        assert_eq!(wal.size().unwrap(), (WAL_ENTRY_HEADER_SIZE + 3) as u64);
    }

    #[test]
    fn empty_log_reads_no_entries() {
        let dir = tempdir().unwrap();
        let wal = open_wal(&dir);
        assert!(wal.read_all().unwrap().is_empty());
    }

    #[test]
    fn torn_header_is_corruption_with_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");

        {
            let wal = Wal::open(&path).unwrap();
            wal.append(&WalEntry::insert(1, "ok")).unwrap();
            wal.close().unwrap();
        }
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0x01, 0xAA, 0xBB]).unwrap();
        }

        let wal = Wal::open(&path).unwrap();
        let err = wal.read_all().unwrap_err();
        match err {
            Error::Corruption(detail) => {
                let expected_offset = WAL_ENTRY_HEADER_SIZE + 2;
                assert!(detail.contains(&format!("offset {expected_offset}")), "{detail}");
            }
            other => panic!("expected Corruption, got {other:?}"),
        }
    }

    #[test]
    fn torn_value_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");

        {
            let mut file = File::create(&path).unwrap();
            // header promises 100 value bytes, only 4 follow
            file.write_all(&[0x01]).unwrap();
            file.write_all(&5u32.to_le_bytes()).unwrap();
            file.write_all(&100u32.to_le_bytes()).unwrap();
            file.write_all(b"oops").unwrap();
        }

        let wal = Wal::open(&path).unwrap();
        assert!(matches!(wal.read_all(), Err(Error::Corruption(_))));
    }

    #[test]
    fn unknown_opcode_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");

        {
            let mut file = File::create(&path).unwrap();
            file.write_all(&[0x7F]).unwrap();
            file.write_all(&1u32.to_le_bytes()).unwrap();
            file.write_all(&0u32.to_le_bytes()).unwrap();
        }

        let wal = Wal::open(&path).unwrap();
        assert!(matches!(wal.read_all(), Err(Error::Corruption(_))));
    }

    #[test]
    fn append_after_close_fails_closed() {
        let dir = tempdir().unwrap();
        let wal = open_wal(&dir);

        wal.close().unwrap();
        assert!(matches!(
            wal.append(&WalEntry::insert(1, "x")),
            Err(Error::Closed)
        ));
        assert!(wal.close().is_ok());
    }
}
