//! # Metadata Sidecar
//!
//! A 12-byte file next to the WAL holding what a re-open needs before it can
//! walk the tree: the current root page and the advisory order.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  ---------------------------
//! 0       8     root_pid (u64, little-endian)
//! 8       4     order (u32, little-endian)
//! ```
//!
//! The file is rewritten in full and fsynced on every root change. A crash
//! mid-write can leave it torn; a future version should write to a temp file
//! and rename.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zerocopy::byteorder::{LittleEndian, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{Error, Result};

pub const META_FILE_SIZE: usize = 12;

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct MetaRecord {
    root_pid: U64<LittleEndian>,
    order: U32<LittleEndian>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeMeta {
    pub root_pid: u64,
    pub order: u32,
}

impl TreeMeta {
    pub fn save(&self, path: &Path) -> Result<()> {
        let record = MetaRecord {
            root_pid: U64::new(self.root_pid),
            order: U32::new(self.order),
        };

        let mut file = File::create(path)
            .map_err(|e| Error::io(format!("create metadata sidecar {}", path.display()), e))?;
        file.write_all(record.as_bytes())
            .map_err(|e| Error::io(format!("write metadata sidecar {}", path.display()), e))?;
        file.sync_all()
            .map_err(|e| Error::io(format!("sync metadata sidecar {}", path.display()), e))?;

        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| Error::io(format!("read metadata sidecar {}", path.display()), e))?;
        if data.len() != META_FILE_SIZE {
            return Err(Error::corruption(format!(
                "metadata sidecar {} is {} bytes, expected {META_FILE_SIZE}",
                path.display(),
                data.len()
            )));
        }

        let record = MetaRecord::read_from_bytes(&data[..])
            .map_err(|e| Error::corruption(format!("malformed metadata sidecar: {e:?}")))?;

        Ok(Self {
            root_pid: record.root_pid.get(),
            order: record.order.get(),
        })
    }
}
