//! Per-transaction lock bookkeeping over the shared `LockTable` (spec.md
//! §4.4). A transaction that already holds shared or exclusive on a block
//! does not re-enter the table for it: grounded on go-rdb's
//! `ConcurrencyManager`, which keeps a private list of locks it has already
//! acquired and is a no-op on a repeat request for the same block.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DbResult;
use crate::lock_table::LockTable;
use crate::page::BlockId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockKind {
    Shared,
    Exclusive,
}

/// Tracks the locks one transaction currently holds and releases them all
/// together at commit/rollback.
pub struct ConcurrencyManager {
    table: Arc<LockTable>,
    locks: HashMap<BlockId, LockKind>,
}

impl ConcurrencyManager {
    pub fn new(table: Arc<LockTable>) -> Self {
        ConcurrencyManager {
            table,
            locks: HashMap::new(),
        }
    }

    /// Acquires shared access to `block` if this transaction does not
    /// already hold shared or exclusive on it.
    pub fn s_lock(&mut self, block: &BlockId) -> DbResult<()> {
        if self.locks.contains_key(block) {
            return Ok(());
        }
        self.table.s_lock(block)?;
        self.locks.insert(block.clone(), LockKind::Shared);
        Ok(())
    }

    /// Acquires exclusive access to `block`, first ensuring this
    /// transaction holds shared on it (so the lock table only ever sees an
    /// upgrade from one shared holder, never a bare exclusive request).
    pub fn x_lock(&mut self, block: &BlockId) -> DbResult<()> {
        if self.has_x_lock(block) {
            return Ok(());
        }
        self.s_lock(block)?;
        self.table.x_lock(block)?;
        self.locks.insert(block.clone(), LockKind::Exclusive);
        Ok(())
    }

    fn has_x_lock(&self, block: &BlockId) -> bool {
        self.locks.get(block) == Some(&LockKind::Exclusive)
    }

    /// Releases every lock this transaction holds.
    pub fn release(&mut self) {
        for block in self.locks.keys() {
            self.table.unlock(block);
        }
        self.locks.clear();
    }
}
