//! Undo-only recovery: commit/rollback/restart-recovery log handling
//! (spec.md §4.5). Grounded on go-rdb's `RecoveryManager`, restructured so it
//! does not hold a back-reference to its owning `Transaction` — `rollback`
//! and `recover` instead take the transaction as an explicit argument,
//! avoiding a self-referential struct.

use std::sync::Arc;

use crate::buffer::Buffer;
use crate::buffer_manager::BufferManager;
use crate::error::DbResult;
use crate::log_manager::{Lsn, LogManager};
use crate::log_record::LogRecord;
use crate::transaction::Transaction;

#[derive(Clone)]
pub struct RecoveryManager {
    lm: Arc<LogManager>,
    bm: Arc<BufferManager>,
    tx_num: i32,
}

impl RecoveryManager {
    /// Appends a START record for `tx_num` and returns a manager bound to
    /// it.
    pub fn new(lm: Arc<LogManager>, bm: Arc<BufferManager>, tx_num: i32) -> DbResult<Self> {
        LogRecord::Start { tx_num }.write_to_log(&lm)?;
        Ok(RecoveryManager { lm, bm, tx_num })
    }

    pub fn lm(&self) -> &Arc<LogManager> {
        &self.lm
    }

    pub fn bm(&self) -> &Arc<BufferManager> {
        &self.bm
    }

    /// Reads the pre-image at `offset` out of `buf` and appends a SETINT
    /// record carrying it; returns the assigned LSN.
    pub fn log_set_int(&self, buf: &Buffer, offset: usize) -> DbResult<Lsn> {
        let old_value = buf.contents().get_int(offset)?;
        let block = buf
            .block()
            .expect("log_set_int called on an unassigned buffer")
            .clone();
        LogRecord::SetInt {
            tx_num: self.tx_num,
            block,
            offset,
            old_value,
        }
        .write_to_log(&self.lm)
    }

    /// As `log_set_int`, for string fields.
    pub fn log_set_string(&self, buf: &Buffer, offset: usize) -> DbResult<Lsn> {
        let old_value = buf.contents().get_string(offset)?;
        let block = buf
            .block()
            .expect("log_set_string called on an unassigned buffer")
            .clone();
        LogRecord::SetString {
            tx_num: self.tx_num,
            block,
            offset,
            old_value,
        }
        .write_to_log(&self.lm)
    }

    pub fn commit(&self) -> DbResult<()> {
        self.bm.flush_all(self.tx_num)?;
        let lsn = LogRecord::Commit {
            tx_num: self.tx_num,
        }
        .write_to_log(&self.lm)?;
        self.lm.flush_at_least(lsn)
    }

    /// Undoes every record belonging to this transaction, newest first,
    /// stopping at its START record; then flushes and logs ROLLBACK.
    pub fn rollback(&self, tx: &mut Transaction) -> DbResult<()> {
        for bytes in self.lm.iterator()? {
            let rec = LogRecord::from_bytes(&bytes?)?;
            if rec.tx_num() != Some(self.tx_num) {
                continue;
            }
            if matches!(rec, LogRecord::Start { .. }) {
                break;
            }
            rec.undo(tx)?;
        }
        self.bm.flush_all(self.tx_num)?;
        let lsn = LogRecord::Rollback {
            tx_num: self.tx_num,
        }
        .write_to_log(&self.lm)?;
        self.lm.flush_at_least(lsn)
    }

    /// Restart recovery: undoes every record of a transaction that never
    /// reached COMMIT/ROLLBACK before the most recent CHECKPOINT, then
    /// writes a fresh CHECKPOINT.
    pub fn recover(&self, tx: &mut Transaction) -> DbResult<()> {
        let mut finished = Vec::new();
        for bytes in self.lm.iterator()? {
            let rec = LogRecord::from_bytes(&bytes?)?;
            if matches!(rec, LogRecord::Checkpoint) {
                break;
            }
            match &rec {
                LogRecord::Commit { tx_num } | LogRecord::Rollback { tx_num } => {
                    finished.push(*tx_num);
                }
                _ => {
                    if let Some(tx_num) = rec.tx_num() {
                        if !finished.contains(&tx_num) {
                            rec.undo(tx)?;
                        }
                    }
                }
            }
        }
        self.bm.flush_all(self.tx_num)?;
        let lsn = LogRecord::Checkpoint.write_to_log(&self.lm)?;
        self.lm.flush_at_least(lsn)
    }
}
