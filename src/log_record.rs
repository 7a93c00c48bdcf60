//! Typed log records: tag + fields, with a single `undo` dispatcher instead
//! of dynamic dispatch (spec.md §3, §6; spec.md §9 design note on
//! "polymorphic log records").

use crate::error::DbResult;
use crate::log_manager::{Lsn, LogManager};
use crate::page::{BlockId, Page};
use crate::transaction::Transaction;

const INT_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
enum RecordTag {
    Checkpoint = 0,
    Start = 1,
    Commit = 2,
    Rollback = 3,
    SetInt = 4,
    SetString = 5,
}

impl RecordTag {
    fn from_i32(v: i32) -> DbResult<Self> {
        Ok(match v {
            0 => RecordTag::Checkpoint,
            1 => RecordTag::Start,
            2 => RecordTag::Commit,
            3 => RecordTag::Rollback,
            4 => RecordTag::SetInt,
            5 => RecordTag::SetString,
            other => {
                return Err(crate::error::DbError::Corrupt(format!(
                    "unknown log record tag {}",
                    other
                )))
            }
        })
    }
}

/// One of the log record kinds from spec.md §3. `undo` is the single
/// dispatcher a tagged enum buys us in place of dynamic dispatch.
#[derive(Debug, Clone)]
pub enum LogRecord {
    Checkpoint,
    Start { tx_num: i32 },
    Commit { tx_num: i32 },
    Rollback { tx_num: i32 },
    SetInt {
        tx_num: i32,
        block: BlockId,
        offset: usize,
        old_value: i32,
    },
    SetString {
        tx_num: i32,
        block: BlockId,
        offset: usize,
        old_value: String,
    },
}

impl LogRecord {
    pub fn tx_num(&self) -> Option<i32> {
        match self {
            LogRecord::Checkpoint => None,
            LogRecord::Start { tx_num }
            | LogRecord::Commit { tx_num }
            | LogRecord::Rollback { tx_num }
            | LogRecord::SetInt { tx_num, .. }
            | LogRecord::SetString { tx_num, .. } => Some(*tx_num),
        }
    }

    /// Serializes this record: a tag followed by the fields in declared
    /// order; strings are length-prefixed (spec.md §6).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            LogRecord::Checkpoint => {
                let mut p = Page::new(INT_SIZE);
                p.set_int(0, RecordTag::Checkpoint as i32).unwrap();
                p.contents().to_vec()
            }
            LogRecord::Start { tx_num } => encode_tx_only(RecordTag::Start, *tx_num),
            LogRecord::Commit { tx_num } => encode_tx_only(RecordTag::Commit, *tx_num),
            LogRecord::Rollback { tx_num } => encode_tx_only(RecordTag::Rollback, *tx_num),
            LogRecord::SetInt {
                tx_num,
                block,
                offset,
                old_value,
            } => {
                let fname_size = Page::max_length(block.file_name().len());
                let size = 4 * INT_SIZE + fname_size + 2 * INT_SIZE;
                let mut p = Page::new(size);
                p.set_int(0, RecordTag::SetInt as i32).unwrap();
                p.set_int(INT_SIZE, *tx_num).unwrap();
                p.set_string(2 * INT_SIZE, block.file_name()).unwrap();
                let bpos = 2 * INT_SIZE + fname_size;
                p.set_int(bpos, block.block_num()).unwrap();
                p.set_int(bpos + INT_SIZE, *offset as i32).unwrap();
                p.set_int(bpos + 2 * INT_SIZE, *old_value).unwrap();
                p.contents().to_vec()
            }
            LogRecord::SetString {
                tx_num,
                block,
                offset,
                old_value,
            } => {
                let fname_size = Page::max_length(block.file_name().len());
                let val_size = Page::max_length(old_value.len());
                let size = 2 * INT_SIZE + fname_size + 2 * INT_SIZE + val_size;
                let mut p = Page::new(size);
                p.set_int(0, RecordTag::SetString as i32).unwrap();
                p.set_int(INT_SIZE, *tx_num).unwrap();
                p.set_string(2 * INT_SIZE, block.file_name()).unwrap();
                let bpos = 2 * INT_SIZE + fname_size;
                p.set_int(bpos, block.block_num()).unwrap();
                p.set_int(bpos + INT_SIZE, *offset as i32).unwrap();
                p.set_string(bpos + 2 * INT_SIZE, old_value).unwrap();
                p.contents().to_vec()
            }
        }
    }

    /// Deserializes a record from the raw bytes an append/iterator call
    /// returned.
    pub fn from_bytes(bytes: &[u8]) -> DbResult<Self> {
        let p = Page::from_bytes(bytes.to_vec());
        let tag = RecordTag::from_i32(p.get_int(0)?)?;
        Ok(match tag {
            RecordTag::Checkpoint => LogRecord::Checkpoint,
            RecordTag::Start => LogRecord::Start {
                tx_num: p.get_int(INT_SIZE)?,
            },
            RecordTag::Commit => LogRecord::Commit {
                tx_num: p.get_int(INT_SIZE)?,
            },
            RecordTag::Rollback => LogRecord::Rollback {
                tx_num: p.get_int(INT_SIZE)?,
            },
            RecordTag::SetInt => {
                let tx_num = p.get_int(INT_SIZE)?;
                let fname = p.get_string(2 * INT_SIZE)?;
                let bpos = 2 * INT_SIZE + Page::max_length(fname.len());
                let block_num = p.get_int(bpos)?;
                let offset = p.get_int(bpos + INT_SIZE)? as usize;
                let old_value = p.get_int(bpos + 2 * INT_SIZE)?;
                LogRecord::SetInt {
                    tx_num,
                    block: BlockId::new(fname, block_num),
                    offset,
                    old_value,
                }
            }
            RecordTag::SetString => {
                let tx_num = p.get_int(INT_SIZE)?;
                let fname = p.get_string(2 * INT_SIZE)?;
                let bpos = 2 * INT_SIZE + Page::max_length(fname.len());
                let block_num = p.get_int(bpos)?;
                let offset = p.get_int(bpos + INT_SIZE)? as usize;
                let old_value = p.get_string(bpos + 2 * INT_SIZE)?;
                LogRecord::SetString {
                    tx_num,
                    block: BlockId::new(fname, block_num),
                    offset,
                    old_value,
                }
            }
        })
    }

    /// Appends `self` to the log and returns the assigned LSN.
    pub fn write_to_log(&self, lm: &LogManager) -> DbResult<Lsn> {
        lm.append(&self.to_bytes())
    }

    /// Applies this record's undo action: SETINT/SETSTRING restore the
    /// pre-image without logging; everything else is a no-op.
    pub fn undo(&self, tx: &mut Transaction) -> DbResult<()> {
        match self {
            LogRecord::SetInt {
                block,
                offset,
                old_value,
                ..
            } => {
                tx.pin(block)?;
                tx.set_int(block, *offset, *old_value, false)?;
                tx.unpin(block);
            }
            LogRecord::SetString {
                block,
                offset,
                old_value,
                ..
            } => {
                tx.pin(block)?;
                tx.set_string(block, *offset, old_value, false)?;
                tx.unpin(block);
            }
            LogRecord::Checkpoint
            | LogRecord::Start { .. }
            | LogRecord::Commit { .. }
            | LogRecord::Rollback { .. } => {}
        }
        Ok(())
    }
}

fn encode_tx_only(tag: RecordTag, tx_num: i32) -> Vec<u8> {
    let mut p = Page::new(2 * INT_SIZE);
    p.set_int(0, tag as i32).unwrap();
    p.set_int(INT_SIZE, tx_num).unwrap();
    p.contents().to_vec()
}
