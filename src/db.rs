//! `SimpleDB`: the single construction entry point (SPEC_FULL.md §A.3).
//! Grounded on the teacher's `Database`/`Unique` bootstrap pattern, but
//! carries no process-wide singleton (spec.md §9): every component is
//! created here once and handed down as an explicit `Arc`.

use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use crate::buffer_manager::BufferManager;
use crate::error::DbResult;
use crate::file_manager::FileManager;
use crate::lock_table::LockTable;
use crate::log_manager::LogManager;
use crate::transaction::Transaction;

/// Default block size in bytes (spec.md §6).
pub const DEFAULT_BLOCK_SIZE: usize = 400;
/// Default buffer pool size, in buffers.
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 8;

const LOG_FILE: &str = "simpledb.log";

pub struct SimpleDB {
    fm: Arc<FileManager>,
    lm: Arc<LogManager>,
    bm: Arc<BufferManager>,
    lt: Arc<LockTable>,
    next_tx_num: AtomicI32,
}

impl SimpleDB {
    pub fn new(
        dir: impl AsRef<Path>,
        block_size: usize,
        buffer_pool_size: usize,
    ) -> DbResult<Self> {
        let fm = Arc::new(FileManager::new(dir, block_size)?);
        let lm = Arc::new(LogManager::new(fm.clone(), LOG_FILE)?);
        let bm = Arc::new(BufferManager::new(fm.clone(), lm.clone(), buffer_pool_size));
        Ok(SimpleDB {
            fm,
            lm,
            bm,
            lt: Arc::new(LockTable::new()),
            next_tx_num: AtomicI32::new(1),
        })
    }

    pub fn with_defaults(dir: impl AsRef<Path>) -> DbResult<Self> {
        Self::new(dir, DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_POOL_SIZE)
    }

    /// Starts a new transaction with a freshly assigned, process-wide unique
    /// number.
    pub fn new_tx(&self) -> DbResult<Transaction> {
        let tx_num = self.next_tx_num.fetch_add(1, Ordering::SeqCst);
        Transaction::new(
            self.fm.clone(),
            self.lm.clone(),
            self.bm.clone(),
            self.lt.clone(),
            tx_num,
        )
    }

    pub fn file_manager(&self) -> &Arc<FileManager> {
        &self.fm
    }

    pub fn log_manager(&self) -> &Arc<LogManager> {
        &self.lm
    }

    pub fn buffer_manager(&self) -> &Arc<BufferManager> {
        &self.bm
    }

    pub fn lock_table(&self) -> &Arc<LockTable> {
        &self.lt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn new_tx_assigns_increasing_tx_numbers() {
        let dir = tempdir().unwrap();
        let db = SimpleDB::with_defaults(dir.path()).unwrap();
        let t1 = db.new_tx().unwrap();
        let t2 = db.new_tx().unwrap();
        assert!(t2.tx_num() > t1.tx_num());
    }
}
