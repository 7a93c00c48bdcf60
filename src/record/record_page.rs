//! Fixed-slot record layout within one pinned block (spec.md §4.7).
//! Grounded on go-rdb's `record.RecordPage`. The transaction is threaded
//! through each call rather than stored, so one `RecordPage` composes
//! cleanly with callers (like `TableScan`) that also need direct access to
//! the same `Transaction`.

use crate::error::DbResult;
use crate::page::BlockId;
use crate::record::layout::Layout;
use crate::record::schema::FieldType;
use crate::transaction::Transaction;

const EMPTY: i32 = 0;
const USED: i32 = 1;

/// One block addressed through `layout`'s slot geometry. Every accessor
/// delegates to `Transaction::get*`/`set*` so reads and writes stay locked
/// and logged (spec.md §4.7). The block is pinned on construction and must
/// be released with `close`.
pub struct RecordPage {
    blk: BlockId,
    layout: Layout,
}

impl RecordPage {
    pub fn new(tx: &mut Transaction, blk: BlockId, layout: Layout) -> DbResult<Self> {
        tx.pin(&blk)?;
        Ok(RecordPage { blk, layout })
    }

    pub fn block(&self) -> &BlockId {
        &self.blk
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn close(self, tx: &mut Transaction) {
        tx.unpin(&self.blk);
    }

    pub fn get_int(&self, tx: &mut Transaction, slot: i32, field_name: &str) -> DbResult<i32> {
        let pos = self.field_pos(slot, field_name)?;
        tx.get_int(&self.blk, pos)
    }

    pub fn get_string(&self, tx: &mut Transaction, slot: i32, field_name: &str) -> DbResult<String> {
        let pos = self.field_pos(slot, field_name)?;
        tx.get_string(&self.blk, pos)
    }

    pub fn set_int(&self, tx: &mut Transaction, slot: i32, field_name: &str, value: i32) -> DbResult<()> {
        let pos = self.field_pos(slot, field_name)?;
        tx.set_int(&self.blk, pos, value, true)
    }

    pub fn set_string(
        &self,
        tx: &mut Transaction,
        slot: i32,
        field_name: &str,
        value: &str,
    ) -> DbResult<()> {
        let pos = self.field_pos(slot, field_name)?;
        tx.set_string(&self.blk, pos, value, true)
    }

    /// Marks `slot` empty (logged).
    pub fn delete(&self, tx: &mut Transaction, slot: i32) -> DbResult<()> {
        self.set_flag(tx, slot, EMPTY)
    }

    /// Zeroes every slot that fits in the block: flag = EMPTY, every
    /// Integer field = 0, every String field = "" (unlogged — this runs
    /// immediately after allocating a fresh block).
    pub fn format(&self, tx: &mut Transaction) -> DbResult<()> {
        let mut slot = 0;
        while self.is_valid_slot(tx, slot) {
            tx.set_int(&self.blk, self.offset(slot), EMPTY, false)?;
            for field_name in self.layout.schema().fields() {
                let field_pos = self.offset(slot) + self.layout.offset(field_name)?;
                match self.layout.schema().field_type(field_name)? {
                    FieldType::Integer => {
                        tx.set_int(&self.blk, field_pos, 0, false)?;
                    }
                    FieldType::String => {
                        tx.set_string(&self.blk, field_pos, "", false)?;
                    }
                }
            }
            slot += 1;
        }
        Ok(())
    }

    /// First USED slot strictly after `slot`, or -1.
    pub fn next_after(&self, tx: &mut Transaction, slot: i32) -> DbResult<i32> {
        self.search_after(tx, slot, USED)
    }

    /// First EMPTY slot strictly after `slot`; marks it USED (logged) and
    /// returns it, or -1 if none fits in the block.
    pub fn insert_after(&self, tx: &mut Transaction, slot: i32) -> DbResult<i32> {
        let new_slot = self.search_after(tx, slot, EMPTY)?;
        if new_slot >= 0 {
            self.set_flag(tx, new_slot, USED)?;
        }
        Ok(new_slot)
    }

    fn set_flag(&self, tx: &mut Transaction, slot: i32, flag: i32) -> DbResult<()> {
        tx.set_int(&self.blk, self.offset(slot), flag, true)
    }

    fn search_after(&self, tx: &mut Transaction, mut slot: i32, flag: i32) -> DbResult<i32> {
        slot += 1;
        while self.is_valid_slot(tx, slot) {
            if tx.get_int(&self.blk, self.offset(slot))? == flag {
                return Ok(slot);
            }
            slot += 1;
        }
        Ok(-1)
    }

    fn is_valid_slot(&self, tx: &Transaction, slot: i32) -> bool {
        self.offset(slot + 1) <= tx.block_size()
    }

    fn offset(&self, slot: i32) -> usize {
        slot as usize * self.layout.slot_size()
    }

    fn field_pos(&self, slot: i32, field_name: &str) -> DbResult<usize> {
        Ok(self.offset(slot) + self.layout.offset(field_name)?)
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
    fn format_zeroes_every_slot_then_insert_after_finds_the_first_one() {
        let dir = tempdir().unwrap();
        let db = SimpleDB::new(dir.path(), 400, 8).unwrap();
        let mut tx = db.new_tx().unwrap();
        let blk = tx.append("t").unwrap();

        let rp = RecordPage::new(&mut tx, blk.clone(), test_layout()).unwrap();
        rp.format(&mut tx).unwrap();
        assert_eq!(rp.next_after(&mut tx, -1).unwrap(), -1);

        let slot = rp.insert_after(&mut tx, -1).unwrap();
        assert!(slot >= 0);
        rp.set_int(&mut tx, slot, "id", 7).unwrap();
        rp.set_string(&mut tx, slot, "name", "abc").unwrap();
        assert_eq!(rp.get_int(&mut tx, slot, "id").unwrap(), 7);
        assert_eq!(rp.get_string(&mut tx, slot, "name").unwrap(), "abc");

        rp.delete(&mut tx, slot).unwrap();
        assert_eq!(rp.next_after(&mut tx, -1).unwrap(), -1);

        rp.close(&mut tx);
        tx.commit().unwrap();
    }
}
