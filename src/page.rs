//! The block identifier and the typed page buffer (spec.md §3, §4.1).

use std::convert::TryInto;
use std::fmt;

use crate::error::{DbError, DbResult};

/// Identifies a block: a named file and a zero-based block number. Value
/// equal and hashable, since it is the unit of I/O and of locking.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct BlockId {
    file_name: String,
    block_num: i32,
}

impl BlockId {
    pub fn new(file_name: impl Into<String>, block_num: i32) -> Self {
        BlockId {
            file_name: file_name.into(),
            block_num,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn block_num(&self) -> i32 {
        self.block_num
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[file {}, block {}]", self.file_name, self.block_num)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An owned byte buffer of exactly `BlockSize` bytes, with typed read/write
/// primitives at explicit offsets. A page is owned either by a `Buffer` for
/// its lifetime, or transiently by the log manager / its iterator.
#[derive(Clone)]
pub struct Page {
    buf: Vec<u8>,
}

impl Page {
    /// A fresh, zero-filled page of `block_size` bytes.
    pub fn new(block_size: usize) -> Self {
        Page {
            buf: vec![0u8; block_size],
        }
    }

    /// Wrap an existing buffer (used when a page is read from disk into a
    /// pre-allocated buffer, or reconstructed from a log record's bytes).
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Page { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn contents(&self) -> &[u8] {
        &self.buf
    }

    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    fn check_range(&self, offset: usize, len: usize) -> DbResult<()> {
        if offset.checked_add(len).map_or(true, |end| end > self.buf.len()) {
            return Err(DbError::Bounds(format!(
                "offset {} + len {} exceeds page size {}",
                offset,
                len,
                self.buf.len()
            )));
        }
        Ok(())
    }

    /// Read a 4-byte little-endian signed integer at `offset`.
    pub fn get_int(&self, offset: usize) -> DbResult<i32> {
        self.check_range(offset, 4)?;
        let bytes: [u8; 4] = self.buf[offset..offset + 4].try_into().unwrap();
        Ok(i32::from_le_bytes(bytes))
    }

    /// Write a 4-byte little-endian signed integer at `offset`.
    pub fn set_int(&mut self, offset: usize, val: i32) -> DbResult<()> {
        self.check_range(offset, 4)?;
        self.buf[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
        Ok(())
    }

    /// Read a length-prefixed byte string (4-byte little-endian unsigned
    /// length, then that many bytes of UTF-8) at `offset`.
    pub fn get_bytes(&self, offset: usize) -> DbResult<Vec<u8>> {
        self.check_range(offset, 4)?;
        let len_bytes: [u8; 4] = self.buf[offset..offset + 4].try_into().unwrap();
        let len = u32::from_le_bytes(len_bytes) as usize;
        self.check_range(offset + 4, len)?;
        Ok(self.buf[offset + 4..offset + 4 + len].to_vec())
    }

    /// Write a length-prefixed byte string at `offset`.
    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> DbResult<()> {
        self.check_range(offset, 4 + bytes.len())?;
        self.buf[offset..offset + 4].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
        self.buf[offset + 4..offset + 4 + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn get_string(&self, offset: usize) -> DbResult<String> {
        let bytes = self.get_bytes(offset)?;
        String::from_utf8(bytes).map_err(|e| DbError::Bounds(format!("invalid utf8: {}", e)))
    }

    pub fn set_string(&mut self, offset: usize, s: &str) -> DbResult<()> {
        self.set_bytes(offset, s.as_bytes())
    }

    /// Number of bytes a string of this many bytes occupies once
    /// length-prefixed (spec.md §6).
    pub fn max_length(byte_len: usize) -> usize {
        4 + byte_len
    }
}
