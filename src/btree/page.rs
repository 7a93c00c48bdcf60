//! Shared directory/leaf page representation (spec.md §3, §4.8.1).
//! Grounded on go-rdb's `btree.BTreePage`. As with `RecordPage`, the
//! transaction is threaded through each call instead of stored.

use crate::btree::data_value::DataValue;
use crate::error::DbResult;
use crate::page::BlockId;
use crate::record::layout::Layout;
use crate::record::record_id::RecordId;
use crate::record::schema::FieldType;
use crate::transaction::Transaction;

const FLAG_POS: usize = 0;
const INT_BYTE_SIZE: usize = 4;
const NUM_RECORDS_POS: usize = INT_BYTE_SIZE;

/// No-overflow sentinel for a leaf page's flag (spec.md §3).
pub const NO_OVERFLOW: i32 = -1;

pub const FIELD_BLOCK_NUMBER: &str = "block";
pub const FIELD_DATA_VALUE: &str = "dataval";
pub const FIELD_ID: &str = "id";

/// One block laid out as `[flag][numRecords][slot 0][slot 1]...`. A
/// directory page's flag is its level; a leaf page's flag is
/// `NO_OVERFLOW` or the block number of its overflow chain (spec.md §3).
/// The block is pinned on construction and released by `close`.
pub struct BTreePage {
    blk: BlockId,
    layout: Layout,
}

impl BTreePage {
    pub fn new(tx: &mut Transaction, blk: BlockId, layout: Layout) -> DbResult<Self> {
        tx.pin(&blk)?;
        Ok(BTreePage { blk, layout })
    }

    pub fn block(&self) -> &BlockId {
        &self.blk
    }

    pub fn close(self, tx: &mut Transaction) {
        tx.unpin(&self.blk);
    }

    /// The largest slot `s` with `dataValue(s) <= key`, scanning from slot
    /// 0 (spec.md §4.8.1). Returns -1 only when the page has no records.
    pub fn find_slot_before(&self, tx: &mut Transaction, key: &DataValue) -> DbResult<i32> {
        let mut slot = 0;
        let num_records = self.num_records(tx)?;
        while slot < num_records && self.data_value(tx, slot)? < *key {
            slot += 1;
        }
        Ok(slot - 1)
    }

    pub fn is_full(&self, tx: &mut Transaction) -> DbResult<bool> {
        Ok(self.slot_pos(self.num_records(tx)? + 1) >= tx.block_size())
    }

    /// Appends a new, formatted block in this page's file; moves every
    /// slot from `split_pos` onward into it (in order), sets the new
    /// page's flag to `new_flag`, and returns its block (spec.md §4.8.1).
    pub fn split(
        &self,
        tx: &mut Transaction,
        split_pos: i32,
        new_flag: i32,
    ) -> DbResult<BlockId> {
        let new_blk = self.append_new(tx, new_flag)?;
        let new_page = BTreePage::new(tx, new_blk.clone(), self.layout.clone())?;
        self.transfer_records(tx, split_pos, &new_page)?;
        new_page.set_flag(tx, new_flag)?;
        new_page.close(tx);
        Ok(new_blk)
    }

    pub fn data_value(&self, tx: &mut Transaction, slot: i32) -> DbResult<DataValue> {
        self.get_val(tx, slot, FIELD_DATA_VALUE)
    }

    pub fn flag(&self, tx: &mut Transaction) -> DbResult<i32> {
        tx.get_int(&self.blk, FLAG_POS)
    }

    pub fn set_flag(&self, tx: &mut Transaction, flag: i32) -> DbResult<()> {
        tx.set_int(&self.blk, FLAG_POS, flag, true)
    }

    /// Appends and formats a new block in this page's file.
    pub fn append_new(&self, tx: &mut Transaction, flag: i32) -> DbResult<BlockId> {
        let blk = tx.append(self.blk.file_name())?;
        tx.pin(&blk)?;
        self.format(tx, &blk, flag)?;
        tx.unpin(&blk);
        Ok(blk)
    }

    /// Zeroes every slot of `blk` and sets its flag and record count
    /// (unlogged — runs immediately after allocation).
    pub fn format(&self, tx: &mut Transaction, blk: &BlockId, flag: i32) -> DbResult<()> {
        tx.set_int(blk, FLAG_POS, flag, false)?;
        tx.set_int(blk, NUM_RECORDS_POS, 0, false)?;
        let rec_size = self.layout.slot_size();
        let mut pos = 2 * INT_BYTE_SIZE;
        while pos + rec_size <= tx.block_size() {
            self.make_default_record(tx, blk, pos)?;
            pos += rec_size;
        }
        Ok(())
    }

    fn make_default_record(&self, tx: &mut Transaction, blk: &BlockId, pos: usize) -> DbResult<()> {
        for field_name in self.layout.schema().fields() {
            let offset = pos + self.layout.offset(field_name)?;
            match self.layout.schema().field_type(field_name)? {
                FieldType::Integer => tx.set_int(blk, offset, 0, false)?,
                FieldType::String => tx.set_string(blk, offset, "", false)?,
            }
        }
        Ok(())
    }

    pub fn child_block_number(&self, tx: &mut Transaction, slot: i32) -> DbResult<i32> {
        self.get_int(tx, slot, FIELD_BLOCK_NUMBER)
    }

    pub fn insert_directory(
        &self,
        tx: &mut Transaction,
        slot: i32,
        val: &DataValue,
        block_num: i32,
    ) -> DbResult<()> {
        self.insert_at(tx, slot)?;
        self.set_val(tx, slot, FIELD_DATA_VALUE, val)?;
        self.set_int(tx, slot, FIELD_BLOCK_NUMBER, block_num)
    }

    pub fn data_rid(&self, tx: &mut Transaction, slot: i32) -> DbResult<RecordId> {
        let block_num = self.get_int(tx, slot, FIELD_BLOCK_NUMBER)?;
        let id = self.get_int(tx, slot, FIELD_ID)?;
        Ok(RecordId::new(block_num, id))
    }

    pub fn insert_leaf(&self, tx: &mut Transaction, slot: i32, val: &DataValue, rid: RecordId) -> DbResult<()> {
        self.insert_at(tx, slot)?;
        self.set_val(tx, slot, FIELD_DATA_VALUE, val)?;
        self.set_int(tx, slot, FIELD_BLOCK_NUMBER, rid.block_num())?;
        self.set_int(tx, slot, FIELD_ID, rid.slot())
    }

    /// Shifts every slot after `slot` left by one and decrements the
    /// record count (spec.md §4.8.1).
    pub fn delete_at(&self, tx: &mut Transaction, slot: i32) -> DbResult<()> {
        let num_records = self.num_records(tx)?;
        for i in (slot + 1)..num_records {
            self.copy_record(tx, i, i - 1)?;
        }
        self.set_num_records(tx, num_records - 1)
    }

    pub fn num_records(&self, tx: &mut Transaction) -> DbResult<i32> {
        tx.get_int(&self.blk, NUM_RECORDS_POS)
    }

    fn get_int(&self, tx: &mut Transaction, slot: i32, field_name: &str) -> DbResult<i32> {
        let pos = self.field_pos(slot, field_name)?;
        tx.get_int(&self.blk, pos)
    }

    fn get_string(&self, tx: &mut Transaction, slot: i32, field_name: &str) -> DbResult<String> {
        let pos = self.field_pos(slot, field_name)?;
        tx.get_string(&self.blk, pos)
    }

    fn get_val(&self, tx: &mut Transaction, slot: i32, field_name: &str) -> DbResult<DataValue> {
        match self.layout.schema().field_type(field_name)? {
            FieldType::Integer => Ok(DataValue::Int(self.get_int(tx, slot, field_name)?)),
            FieldType::String => Ok(DataValue::Str(self.get_string(tx, slot, field_name)?)),
        }
    }

    fn set_int(&self, tx: &mut Transaction, slot: i32, field_name: &str, val: i32) -> DbResult<()> {
        let pos = self.field_pos(slot, field_name)?;
        tx.set_int(&self.blk, pos, val, true)
    }

    fn set_string(&self, tx: &mut Transaction, slot: i32, field_name: &str, val: &str) -> DbResult<()> {
        let pos = self.field_pos(slot, field_name)?;
        tx.set_string(&self.blk, pos, val, true)
    }

    fn set_val(&self, tx: &mut Transaction, slot: i32, field_name: &str, val: &DataValue) -> DbResult<()> {
        match val {
            DataValue::Int(v) => self.set_int(tx, slot, field_name, *v),
            DataValue::Str(v) => self.set_string(tx, slot, field_name, v),
        }
    }

    fn set_num_records(&self, tx: &mut Transaction, n: i32) -> DbResult<()> {
        tx.set_int(&self.blk, NUM_RECORDS_POS, n, true)
    }

    /// Shifts every slot from `slot` onward right by one and increments
    /// the record count; the vacated slot's contents are unspecified until
    /// a field is set (spec.md §4.8.1).
    fn insert_at(&self, tx: &mut Transaction, slot: i32) -> DbResult<()> {
        let num_records = self.num_records(tx)?;
        let mut i = num_records;
        while i > slot {
            self.copy_record(tx, i - 1, i)?;
            i -= 1;
        }
        self.set_num_records(tx, num_records + 1)
    }

    fn copy_record(&self, tx: &mut Transaction, from: i32, to: i32) -> DbResult<()> {
        self.copy_record_to(tx, from, self, to)
    }

    fn copy_record_to(&self, tx: &mut Transaction, from: i32, dest: &BTreePage, to: i32) -> DbResult<()> {
        for field_name in self.layout.schema().fields() {
            let v = self.get_val(tx, from, field_name)?;
            dest.set_val(tx, to, field_name, &v)?;
        }
        Ok(())
    }

    /// Copies every slot from `slot` onward into `dest` (appending there),
    /// deleting each from `self` as it goes (spec.md §4.8.1, "split").
    fn transfer_records(&self, tx: &mut Transaction, slot: i32, dest: &BTreePage) -> DbResult<()> {
        let mut dest_slot = 0;
        let mut slot = slot;
        while slot < self.num_records(tx)? {
            dest.insert_at(tx, dest_slot)?;
            self.copy_record_to(tx, slot, dest, dest_slot)?;
            self.delete_at(tx, slot)?;
            dest_slot += 1;
        }
        Ok(())
    }

    fn field_pos(&self, slot: i32, field_name: &str) -> DbResult<usize> {
        Ok(self.slot_pos(slot) + self.layout.offset(field_name)?)
    }

    fn slot_pos(&self, slot: i32) -> usize {
        2 * INT_BYTE_SIZE + slot as usize * self.layout.slot_size()
    }
}
