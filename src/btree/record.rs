//! # Record Codec
//!
//! A leaf payload: length-prefixed key and value.
//!
//! ```text
//! +--------------+------------+----------------+--------------+
//! | key_len: u32 | key bytes  | value_len: u32 | value bytes  |
//! +--------------+------------+----------------+--------------+
//! ```
//!
//! In this engine keys are always 4-byte little-endian `u32` and values are
//! UTF-8 strings, but the codec itself only fixes the framing; the typed
//! accessors report anything else as corruption.

use crate::error::{Error, Result};

const LEN_FIELD_SIZE: usize = 4;
const KEY_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl Record {
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value }
    }

    pub fn from_parts(key: u32, value: &str) -> Self {
        Self {
            key: key.to_le_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn key_as_u32(&self) -> Result<u32> {
        let bytes: [u8; KEY_SIZE] = self.key.as_slice().try_into().map_err(|_| {
            Error::corruption(format!("record key is {} bytes, expected 4", self.key.len()))
        })?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn value_as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.value)
            .map_err(|_| Error::corruption("record value is not valid UTF-8"))
    }

    pub fn encoded_len(&self) -> usize {
        2 * LEN_FIELD_SIZE + self.key.len() + self.value.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.value);
        buf
    }

    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), self.encoded_len());
        let mut offset = 0;
        buf[offset..offset + LEN_FIELD_SIZE]
            .copy_from_slice(&(self.key.len() as u32).to_le_bytes());
        offset += LEN_FIELD_SIZE;
        buf[offset..offset + self.key.len()].copy_from_slice(&self.key);
        offset += self.key.len();
        buf[offset..offset + LEN_FIELD_SIZE]
            .copy_from_slice(&(self.value.len() as u32).to_le_bytes());
        offset += LEN_FIELD_SIZE;
        buf[offset..offset + self.value.len()].copy_from_slice(&self.value);
    }

    /// Decodes one record from the front of `data`, returning it together
    /// with the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < LEN_FIELD_SIZE {
            return Err(Error::corruption("record truncated before key length"));
        }
        let key_len = u32::from_le_bytes(data[0..LEN_FIELD_SIZE].try_into().unwrap()) as usize;
        let mut offset = LEN_FIELD_SIZE;

        if data.len() < offset + key_len + LEN_FIELD_SIZE {
            return Err(Error::corruption("record truncated inside key"));
        }
        let key = data[offset..offset + key_len].to_vec();
        offset += key_len;

        let value_len =
            u32::from_le_bytes(data[offset..offset + LEN_FIELD_SIZE].try_into().unwrap()) as usize;
        offset += LEN_FIELD_SIZE;

        if data.len() < offset + value_len {
            return Err(Error::corruption("record truncated inside value"));
        }
        let value = data[offset..offset + value_len].to_vec();
        offset += value_len;

        Ok((Self { key, value }, offset))
    }
}
