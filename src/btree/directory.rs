//! Directory page cursor: descend to a leaf, insert directory entries with
//! splits, grow a new root (spec.md §4.8.3). Grounded on go-rdb's
//! `btree.BTreeDirectory`.

use crate::btree::directory_entry::DirectoryEntry;
use crate::btree::page::BTreePage;
use crate::error::DbResult;
use crate::page::BlockId;
use crate::record::layout::Layout;
use crate::transaction::Transaction;

/// Wraps one directory page. Its flag is the tree level: 0 for a directory
/// whose children are leaves (spec.md §4.8.3).
pub struct BTreeDirectory {
    layout: Layout,
    contents: BTreePage,
    file_name: String,
}

impl BTreeDirectory {
    pub fn new(tx: &mut Transaction, blk: BlockId, layout: Layout) -> DbResult<Self> {
        let file_name = blk.file_name().to_string();
        let contents = BTreePage::new(tx, blk, layout.clone())?;
        Ok(BTreeDirectory {
            layout,
            contents,
            file_name,
        })
    }

    pub fn close(self, tx: &mut Transaction) {
        self.contents.close(tx);
    }

    /// Descends from this (root) page to the level-0 directory and returns
    /// the leaf block number containing `search_key` (spec.md §4.8.3).
    pub fn search(&mut self, tx: &mut Transaction, search_key: &crate::btree::data_value::DataValue) -> DbResult<i32> {
        let mut child_blk = self.find_child_block(tx, search_key)?;
        let mut level = self.contents.flag(tx)?;
        while level > 0 {
            let next_page = BTreePage::new(tx, child_blk.clone(), self.layout.clone())?;
            let old = std::mem::replace(&mut self.contents, next_page);
            old.close(tx);
            child_blk = self.find_child_block(tx, search_key)?;
            level = self.contents.flag(tx)?;
        }
        Ok(child_blk.block_num())
    }

    /// Called only on the root (block 0) after a recursive `insert`
    /// returned a non-empty entry. Moves the root's current contents into
    /// a brand-new block at the same level, inserts an entry for that
    /// displaced block followed by `entry`, then increments the root's
    /// level (spec.md §4.8.3; SPEC_FULL.md §B.4 pins the ordering: split
    /// first at the current level, increment last).
    pub fn make_new_root(&mut self, tx: &mut Transaction, entry: DirectoryEntry) -> DbResult<()> {
        let first_val = self.contents.data_value(tx, 0)?;
        let level = self.contents.flag(tx)?;
        let new_blk = self.contents.split(tx, 0, level)?;
        let old_root = DirectoryEntry::new(first_val, new_blk.block_num());
        self.insert_entry(tx, &old_root)?;
        self.insert_entry(tx, &entry)?;
        self.contents.set_flag(tx, level + 1)
    }

    /// Recursively descends to the level-0 directory holding `entry`'s
    /// key and inserts it there, propagating any split upward (spec.md
    /// §4.8.3).
    pub fn insert(&mut self, tx: &mut Transaction, entry: &DirectoryEntry) -> DbResult<Option<DirectoryEntry>> {
        let level = self.contents.flag(tx)?;
        if level == 0 {
            return self.insert_entry(tx, entry);
        }
        let child_blk = self.find_child_block(tx, entry.data_value())?;
        let mut child = BTreeDirectory::new(tx, child_blk, self.layout.clone())?;
        let my_entry = child.insert(tx, entry)?;
        child.close(tx);
        match my_entry {
            Some(e) => self.insert_entry(tx, &e),
            None => Ok(None),
        }
    }

    fn insert_entry(&mut self, tx: &mut Transaction, entry: &DirectoryEntry) -> DbResult<Option<DirectoryEntry>> {
        let n = self.contents.find_slot_before(tx, entry.data_value())?;
        let new_slot = n + 1;
        self.contents
            .insert_directory(tx, new_slot, entry.data_value(), entry.block_number())?;

        if !self.contents.is_full(tx)? {
            return Ok(None);
        }

        // Directory values are unique by construction of parent keys, so
        // (unlike a leaf) no run-straddling adjustment is needed.
        let level = self.contents.flag(tx)?;
        let split_pos = self.contents.num_records(tx)? / 2;
        let split_val = self.contents.data_value(tx, split_pos)?;
        let new_blk = self.contents.split(tx, split_pos, level)?;
        Ok(Some(DirectoryEntry::new(split_val, new_blk.block_num())))
    }

    fn find_child_block(&mut self, tx: &mut Transaction, search_key: &crate::btree::data_value::DataValue) -> DbResult<BlockId> {
        let mut slot = self.contents.find_slot_before(tx, search_key)?;
        if self.contents.data_value(tx, slot + 1)? == *search_key {
            slot += 1;
        }
        let block_num = self.contents.child_block_number(tx, slot)?;
        Ok(BlockId::new(self.file_name.clone(), block_num))
    }
}
