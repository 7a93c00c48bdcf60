//! Leaf page cursor: search, iterate matching records (including overflow
//! chains), insert with split/overflow creation, delete (spec.md §4.8.2).
//! Grounded on go-rdb's `btree.BTreeLeaf`.

use crate::btree::data_value::DataValue;
use crate::btree::directory_entry::DirectoryEntry;
use crate::btree::page::BTreePage;
use crate::error::DbResult;
use crate::page::BlockId;
use crate::record::layout::Layout;
use crate::record::record_id::RecordId;
use crate::transaction::Transaction;

/// A cursor over one leaf page (or, once overflow is entered, the current
/// page of its overflow chain), positioned by `search_key`. Must be moved
/// to a valid starting slot via construction (which mirrors `BeforeFirst`)
/// before any `has_next` call (spec.md §4.8.2, §9: "BeforeFirst must be
/// called before any Next — a precondition, not enforced by type").
pub struct BTreeLeaf {
    layout: Layout,
    search_key: DataValue,
    contents: BTreePage,
    current_slot: i32,
    file_name: String,
}

impl BTreeLeaf {
    pub fn new(
        tx: &mut Transaction,
        blk: BlockId,
        layout: Layout,
        search_key: DataValue,
    ) -> DbResult<Self> {
        let file_name = blk.file_name().to_string();
        let contents = BTreePage::new(tx, blk, layout.clone())?;
        let current_slot = contents.find_slot_before(tx, &search_key)?;
        Ok(BTreeLeaf {
            layout,
            search_key,
            contents,
            current_slot,
            file_name,
        })
    }

    pub fn close(self, tx: &mut Transaction) {
        self.contents.close(tx);
    }

    /// Advances to the next record matching `search_key`, crossing into
    /// the overflow chain as needed (spec.md §4.8.2).
    pub fn has_next(&mut self, tx: &mut Transaction) -> DbResult<bool> {
        self.current_slot += 1;
        if self.current_slot >= self.contents.num_records(tx)? {
            return self.try_overflow(tx);
        }
        if self.contents.data_value(tx, self.current_slot)? == self.search_key {
            return Ok(true);
        }
        self.try_overflow(tx)
    }

    pub fn get_data_rid(&self, tx: &mut Transaction) -> DbResult<RecordId> {
        self.contents.data_rid(tx, self.current_slot)
    }

    /// Removes the record addressing `target`, if present among the
    /// remaining matches for `search_key` (spec.md §4.8.2).
    pub fn delete(&mut self, tx: &mut Transaction, target: RecordId) -> DbResult<()> {
        while self.has_next(tx)? {
            if self.get_data_rid(tx)? == target {
                self.contents.delete_at(tx, self.current_slot)?;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Inserts `rid` under `search_key`. The caller must have positioned
    /// this leaf via construction on `search_key` first (precondition:
    /// `current_slot == find_slot_before(search_key)`). Returns the
    /// directory entry a split produced, if any (spec.md §4.8.2).
    pub fn insert(&mut self, tx: &mut Transaction, rid: RecordId) -> DbResult<Option<DirectoryEntry>> {
        let flag = self.contents.flag(tx)?;
        let first_val = self.contents.data_value(tx, 0)?;

        if flag >= 0 && first_val > self.search_key {
            // This leaf is an overflow page whose slot-0 key is larger
            // than the new key: the new key must become the chain's key.
            // Read `first_val` before splitting (spec.md §9 open
            // question: split(0, f) would otherwise invalidate it).
            let new_blk = self.contents.split(tx, 0, flag)?;
            self.current_slot = 0;
            self.contents.set_flag(tx, -1)?;
            self.contents.insert_leaf(tx, self.current_slot, &self.search_key, rid)?;
            return Ok(Some(DirectoryEntry::new(first_val, new_blk.block_num())));
        }

        self.current_slot += 1;
        self.contents
            .insert_leaf(tx, self.current_slot, &self.search_key, rid)?;
        if !self.contents.is_full(tx)? {
            return Ok(None);
        }

        let first_key = self.contents.data_value(tx, 0)?;
        let num_records = self.contents.num_records(tx)?;
        let last_key = self.contents.data_value(tx, num_records - 1)?;

        if last_key == first_key {
            // Every record in this page shares one key: split off
            // everything but slot 0 into an overflow page.
            let flag = self.contents.flag(tx)?;
            let new_blk = self.contents.split(tx, 1, flag)?;
            self.contents.set_flag(tx, new_blk.block_num())?;
            return Ok(None);
        }

        let mut split_pos = num_records / 2;
        let split_key = self.contents.data_value(tx, split_pos)?;
        if split_key == first_key {
            // move right, away from the run starting at first_key
            while self.contents.data_value(tx, split_pos)? == split_key {
                split_pos += 1;
            }
        } else {
            // move left, to the start of split_key's run
            while self.contents.data_value(tx, split_pos - 1)? == split_key {
                split_pos -= 1;
            }
        }
        let new_blk = self.contents.split(tx, split_pos, -1)?;
        Ok(Some(DirectoryEntry::new(split_key, new_blk.block_num())))
    }

    fn try_overflow(&mut self, tx: &mut Transaction) -> DbResult<bool> {
        let first_key = self.contents.data_value(tx, 0)?;
        let flag = self.contents.flag(tx)?;
        if self.search_key != first_key || flag < 0 {
            return Ok(false);
        }
        let next_blk = BlockId::new(self.file_name.clone(), flag);
        let new_page = BTreePage::new(tx, next_blk, self.layout.clone())?;
        let old = std::mem::replace(&mut self.contents, new_page);
        old.close(tx);
        self.current_slot = 0;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SimpleDB;
    use crate::record::schema::Schema;
    use tempfile::tempdir;

    fn leaf_layout() -> Layout {
        let mut schema = Schema::new();
        schema.add_int_field(crate::btree::page::FIELD_ID);
        schema.add_int_field(crate::btree::page::FIELD_BLOCK_NUMBER);
        schema.add_int_field(crate::btree::page::FIELD_DATA_VALUE);
        Layout::new(schema).unwrap()
    }

    #[test]
    fn insert_then_find_the_same_key_round_trips() {
        let dir = tempdir().unwrap();
        let db = SimpleDB::new(dir.path(), 400, 8).unwrap();
        let mut tx = db.new_tx().unwrap();

        let layout = leaf_layout();
        let blk = tx.append("t_leaf").unwrap();
        {
            let page = BTreePage::new(&mut tx, blk.clone(), layout.clone()).unwrap();
            page.format(&mut tx, &blk, -1).unwrap();
            page.close(&mut tx);
        }

        let mut leaf = BTreeLeaf::new(&mut tx, blk.clone(), layout.clone(), DataValue::Int(10)).unwrap();
        let e = leaf.insert(&mut tx, RecordId::new(1, 0)).unwrap();
        assert!(e.is_none());
        leaf.close(&mut tx);

        let mut leaf = BTreeLeaf::new(&mut tx, blk, layout, DataValue::Int(10)).unwrap();
        assert!(leaf.has_next(&mut tx).unwrap());
        assert_eq!(leaf.get_data_rid(&mut tx).unwrap(), RecordId::new(1, 0));
        assert!(!leaf.has_next(&mut tx).unwrap());
        leaf.close(&mut tx);
        tx.commit().unwrap();
    }
}
