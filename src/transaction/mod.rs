//! Transaction: the client-facing facade composing the concurrency
//! manager, buffer list, and recovery manager (spec.md §4.6). Grounded on
//! go-rdb's `Transaction`.

mod buffer_list;
mod concurrency_manager;
mod recovery_manager;

pub use concurrency_manager::ConcurrencyManager;
pub use recovery_manager::RecoveryManager;

use std::sync::Arc;

use crate::buffer_manager::BufferManager;
use crate::error::DbResult;
use crate::file_manager::FileManager;
use crate::lock_table::LockTable;
use crate::log_manager::LogManager;
use crate::page::BlockId;
use buffer_list::BufferList;

/// Conventional block number standing for "the end of the file", used to
/// lock a file's length rather than a particular block (spec.md §4.6).
const END_OF_FILE: i32 = -1;

pub struct Transaction {
    fm: Arc<FileManager>,
    bm: Arc<BufferManager>,
    cm: ConcurrencyManager,
    bl: BufferList,
    rm: RecoveryManager,
    tx_num: i32,
}

impl Transaction {
    pub fn new(
        fm: Arc<FileManager>,
        lm: Arc<LogManager>,
        bm: Arc<BufferManager>,
        lt: Arc<LockTable>,
        tx_num: i32,
    ) -> DbResult<Self> {
        let rm = RecoveryManager::new(lm, bm.clone(), tx_num)?;
        Ok(Transaction {
            fm,
            bm: bm.clone(),
            cm: ConcurrencyManager::new(lt),
            bl: BufferList::new(bm),
            rm,
            tx_num,
        })
    }

    pub fn tx_num(&self) -> i32 {
        self.tx_num
    }

    pub fn commit(&mut self) -> DbResult<()> {
        self.rm.commit()?;
        self.cm.release();
        self.bl.unpin_all();
        Ok(())
    }

    pub fn rollback(&mut self) -> DbResult<()> {
        // clone (Arc clones, no I/O) so `self` is free to pass to
        // `rm.rollback` as `&mut Transaction` without overlapping the borrow
        // of `self.rm`.
        let rm = self.rm.clone();
        let result = rm.rollback(self);
        self.cm.release();
        self.bl.unpin_all();
        result
    }

    /// Restart recovery. Intended for use on a freshly constructed
    /// transaction before any other transaction touches the buffer pool.
    pub fn recover(&mut self) -> DbResult<()> {
        self.bm.flush_all(self.tx_num)?;
        let rm = self.rm.clone();
        rm.recover(self)
    }

    pub fn pin(&mut self, block: &BlockId) -> DbResult<()> {
        self.bl.pin(block)
    }

    pub fn unpin(&mut self, block: &BlockId) {
        self.bl.unpin(block)
    }

    pub fn get_int(&mut self, block: &BlockId, offset: usize) -> DbResult<i32> {
        self.cm.s_lock(block)?;
        let handle = self.require_pinned(block)?;
        Ok(self.bm.with_buffer(handle, |buf| buf.contents().get_int(offset))?)
    }

    pub fn get_string(&mut self, block: &BlockId, offset: usize) -> DbResult<String> {
        self.cm.s_lock(block)?;
        let handle = self.require_pinned(block)?;
        Ok(self.bm.with_buffer(handle, |buf| buf.contents().get_string(offset))?)
    }

    pub fn set_int(
        &mut self,
        block: &BlockId,
        offset: usize,
        value: i32,
        ok_to_log: bool,
    ) -> DbResult<()> {
        self.cm.x_lock(block)?;
        let handle = self.require_pinned(block)?;
        let lsn = if ok_to_log {
            Some(self.bm.with_buffer(handle, |buf| self.rm.log_set_int(buf, offset))?)
        } else {
            None
        };
        self.bm.with_buffer(handle, |buf| -> DbResult<()> {
            buf.contents_mut().set_int(offset, value)?;
            buf.set_modified(self.tx_num, lsn);
            Ok(())
        })
    }

    pub fn set_string(
        &mut self,
        block: &BlockId,
        offset: usize,
        value: &str,
        ok_to_log: bool,
    ) -> DbResult<()> {
        self.cm.x_lock(block)?;
        let handle = self.require_pinned(block)?;
        let lsn = if ok_to_log {
            Some(self.bm.with_buffer(handle, |buf| self.rm.log_set_string(buf, offset))?)
        } else {
            None
        };
        self.bm.with_buffer(handle, |buf| -> DbResult<()> {
            buf.contents_mut().set_string(offset, value)?;
            buf.set_modified(self.tx_num, lsn);
            Ok(())
        })
    }

    pub fn size(&mut self, file_name: &str) -> DbResult<i32> {
        let dummy = BlockId::new(file_name, END_OF_FILE);
        self.cm.s_lock(&dummy)?;
        self.fm.length(file_name)
    }

    pub fn append(&mut self, file_name: &str) -> DbResult<BlockId> {
        let dummy = BlockId::new(file_name, END_OF_FILE);
        self.cm.x_lock(&dummy)?;
        self.fm.append(file_name)
    }

    pub fn block_size(&self) -> usize {
        self.fm.block_size()
    }

    pub fn available_buffers(&self) -> usize {
        self.bm.available()
    }

    fn require_pinned(&self, block: &BlockId) -> DbResult<crate::buffer::BufferHandle> {
        self.bl
            .handle_for(block)
            .ok_or_else(|| crate::error::DbError::BufferNotFound(format!("{:?}", block)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SimpleDB;
    use tempfile::tempdir;

    #[test]
    fn committed_writes_survive_and_uncommitted_ones_roll_back() {
        let dir = tempdir().unwrap();
        let db = SimpleDB::new(dir.path(), 400, 8).unwrap();
        let blk = BlockId::new("testfile", 1);

        let mut tx1 = db.new_tx().unwrap();
        tx1.pin(&blk).unwrap();
        tx1.set_int(&blk, 80, 1, false).unwrap();
        tx1.set_string(&blk, 40, "one", false).unwrap();
        tx1.commit().unwrap();

        let mut tx2 = db.new_tx().unwrap();
        tx2.pin(&blk).unwrap();
        assert_eq!(tx2.get_int(&blk, 80).unwrap(), 1);
        assert_eq!(tx2.get_string(&blk, 40).unwrap(), "one");
        tx2.set_int(&blk, 80, 2, true).unwrap();
        tx2.set_string(&blk, 40, "one!", true).unwrap();
        tx2.commit().unwrap();

        let mut tx3 = db.new_tx().unwrap();
        tx3.pin(&blk).unwrap();
        assert_eq!(tx3.get_int(&blk, 80).unwrap(), 2);
        assert_eq!(tx3.get_string(&blk, 40).unwrap(), "one!");
        tx3.set_int(&blk, 80, 9999, true).unwrap();
        assert_eq!(tx3.get_int(&blk, 80).unwrap(), 9999);
        tx3.rollback().unwrap();

        let mut tx4 = db.new_tx().unwrap();
        tx4.pin(&blk).unwrap();
        assert_eq!(tx4.get_int(&blk, 80).unwrap(), 2);
        tx4.commit().unwrap();
    }

    #[test]
    fn size_and_append_lock_the_end_of_file_sentinel_block() {
        let dir = tempdir().unwrap();
        let db = SimpleDB::new(dir.path(), 400, 8).unwrap();
        let mut tx = db.new_tx().unwrap();
        assert_eq!(tx.size("growing").unwrap(), 0);
        let b0 = tx.append("growing").unwrap();
        assert_eq!(b0.block_num(), 0);
        assert_eq!(tx.size("growing").unwrap(), 1);
        tx.commit().unwrap();
    }
}
