//! Sequential cursor over a table file's blocks (spec.md §4.7). Grounded on
//! go-rdb's `record.TableScan`.

use crate::error::DbResult;
use crate::page::BlockId;
use crate::record::layout::Layout;
use crate::record::record_id::RecordId;
use crate::record::record_page::RecordPage;
use crate::transaction::Transaction;

/// A restartable cursor over `<table>.tbl`, addressing records by RID.
/// `insert`/`next` both scan forward from the current slot, extending the
/// file with a freshly formatted block when nothing is found before the
/// end (spec.md §4.7).
pub struct TableScan {
    layout: Layout,
    file_name: String,
    rp: Option<RecordPage>,
    current_slot: i32,
}

impl TableScan {
    pub fn new(tx: &mut Transaction, table_name: &str, layout: Layout) -> DbResult<Self> {
        let mut ts = TableScan {
            layout,
            file_name: format!("{}.tbl", table_name),
            rp: None,
            current_slot: -1,
        };
        if tx.size(&ts.file_name)? == 0 {
            ts.move_to_new_block(tx)?;
        } else {
            ts.before_first(tx)?;
        }
        Ok(ts)
    }

    pub fn close(&mut self, tx: &mut Transaction) {
        if let Some(rp) = self.rp.take() {
            rp.close(tx);
        }
    }

    /// Positions before the first record of the file.
    pub fn before_first(&mut self, tx: &mut Transaction) -> DbResult<()> {
        self.move_to_block(tx, 0)
    }

    /// Advances to the next USED slot, crossing into later blocks as
    /// needed. Returns `false` once the last block is exhausted.
    pub fn next(&mut self, tx: &mut Transaction) -> DbResult<bool> {
        self.current_slot = self.rp().next_after(tx, self.current_slot)?;
        while self.current_slot < 0 {
            if self.at_last_block(tx)? {
                return Ok(false);
            }
            let next_block = self.rp().block().block_num() + 1;
            self.move_to_block(tx, next_block)?;
            self.current_slot = self.rp().next_after(tx, self.current_slot)?;
        }
        Ok(true)
    }

    pub fn get_int(&self, tx: &mut Transaction, field_name: &str) -> DbResult<i32> {
        self.rp().get_int(tx, self.current_slot, field_name)
    }

    pub fn get_string(&self, tx: &mut Transaction, field_name: &str) -> DbResult<String> {
        self.rp().get_string(tx, self.current_slot, field_name)
    }

    pub fn has_field(&self, field_name: &str) -> bool {
        self.layout.schema().has_field(field_name)
    }

    pub fn set_int(&self, tx: &mut Transaction, field_name: &str, value: i32) -> DbResult<()> {
        self.rp().set_int(tx, self.current_slot, field_name, value)
    }

    pub fn set_string(&self, tx: &mut Transaction, field_name: &str, value: &str) -> DbResult<()> {
        self.rp()
            .set_string(tx, self.current_slot, field_name, value)
    }

    /// Finds the next EMPTY slot from the current position, appending a
    /// new formatted block to the file if every existing block is full.
    /// On return, the current slot is USED and zero-valued, ready to be
    /// populated.
    pub fn insert(&mut self, tx: &mut Transaction) -> DbResult<()> {
        self.current_slot = self.rp().insert_after(tx, self.current_slot)?;
        while self.current_slot < 0 {
            if self.at_last_block(tx)? {
                self.move_to_new_block(tx)?;
            } else {
                let next_block = self.rp().block().block_num() + 1;
                self.move_to_block(tx, next_block)?;
            }
            self.current_slot = self.rp().insert_after(tx, self.current_slot)?;
        }
        Ok(())
    }

    pub fn delete(&mut self, tx: &mut Transaction) -> DbResult<()> {
        self.rp().delete(tx, self.current_slot)
    }

    pub fn move_to_rid(&mut self, tx: &mut Transaction, rid: RecordId) -> DbResult<()> {
        self.close(tx);
        let blk = BlockId::new(self.file_name.clone(), rid.block_num());
        self.rp = Some(RecordPage::new(tx, blk, self.layout.clone())?);
        self.current_slot = rid.slot();
        Ok(())
    }

    pub fn get_rid(&self) -> RecordId {
        RecordId::new(self.rp().block().block_num(), self.current_slot)
    }

    fn move_to_block(&mut self, tx: &mut Transaction, block_num: i32) -> DbResult<()> {
        self.close(tx);
        let blk = BlockId::new(self.file_name.clone(), block_num);
        self.rp = Some(RecordPage::new(tx, blk, self.layout.clone())?);
        self.current_slot = -1;
        Ok(())
    }

    fn move_to_new_block(&mut self, tx: &mut Transaction) -> DbResult<()> {
        self.close(tx);
        let blk = tx.append(&self.file_name)?;
        let rp = RecordPage::new(tx, blk, self.layout.clone())?;
        rp.format(tx)?;
        self.rp = Some(rp);
        self.current_slot = -1;
        Ok(())
    }

    fn at_last_block(&self, tx: &mut Transaction) -> DbResult<bool> {
        let size = tx.size(&self.file_name)?;
        Ok(self.rp().block().block_num() == size - 1)
    }

    fn rp(&self) -> &RecordPage {
        self.rp.as_ref().expect("TableScan always has a current block")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SimpleDB;
    use crate::record::schema::Schema;
    use tempfile::tempdir;

    fn test_layout() -> Layout {
        let mut schema = Schema::new();
        schema.add_int_field("id");
        schema.add_string_field("name", 10);
        Layout::new(schema).unwrap()
    }

    #[test]
    fn insert_scan_delete_round_trip() {
        let dir = tempdir().unwrap();
        let db = SimpleDB::new(dir.path(), 400, 8).unwrap();
        let mut tx = db.new_tx().unwrap();

        let mut ts = TableScan::new(&mut tx, "t", test_layout()).unwrap();
        for i in 0..50 {
            ts.insert(&mut tx).unwrap();
            ts.set_int(&mut tx, "id", i).unwrap();
            ts.set_string(&mut tx, "name", &format!("rec{}", i)).unwrap();
        }

        ts.before_first(&mut tx).unwrap();
        let mut count = 0;
        let mut deleted = 0;
        while ts.next(&mut tx).unwrap() {
            let id = ts.get_int(&mut tx, "id").unwrap();
            count += 1;
            if id % 2 == 0 {
                ts.delete(&mut tx).unwrap();
                deleted += 1;
            }
        }
        assert_eq!(count, 50);
        assert_eq!(deleted, 25);

        ts.before_first(&mut tx).unwrap();
        let mut remaining = 0;
        while ts.next(&mut tx).unwrap() {
            assert_eq!(ts.get_int(&mut tx, "id").unwrap() % 2, 1);
            remaining += 1;
        }
        assert_eq!(remaining, 25);

        ts.close(&mut tx);
        tx.commit().unwrap();
    }

    #[test]
    fn move_to_rid_addresses_a_specific_record() {
        let dir = tempdir().unwrap();
        let db = SimpleDB::new(dir.path(), 400, 8).unwrap();
        let mut tx = db.new_tx().unwrap();

        let mut ts = TableScan::new(&mut tx, "t", test_layout()).unwrap();
        ts.insert(&mut tx).unwrap();
        ts.set_int(&mut tx, "id", 42).unwrap();
        let rid = ts.get_rid();

        ts.insert(&mut tx).unwrap();
        ts.set_int(&mut tx, "id", 99).unwrap();

        ts.move_to_rid(&mut tx, rid).unwrap();
        assert_eq!(ts.get_int(&mut tx, "id").unwrap(), 42);

        ts.close(&mut tx);
        tx.commit().unwrap();
    }
}
