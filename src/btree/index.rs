//! The B-tree index façade: `beforeFirst`/`next`/`getDataRid` cursor plus
//! `insert`/`delete` mutators (spec.md §4.8.4). Grounded on go-rdb's
//! `btree.BTreeIndex`.

use crate::btree::data_value::DataValue;
use crate::btree::directory::BTreeDirectory;
use crate::btree::leaf::BTreeLeaf;
use crate::btree::page::{BTreePage, FIELD_BLOCK_NUMBER, FIELD_DATA_VALUE, NO_OVERFLOW};
use crate::error::DbResult;
use crate::page::BlockId;
use crate::record::layout::Layout;
use crate::record::record_id::RecordId;
use crate::record::schema::Schema;
use crate::transaction::Transaction;

/// Holds the current leaf tracking a positioned search key (spec.md
/// §4.8.4). The directory file's root always lives at block 0
/// (SPEC_FULL.md §B.3/§B.4).
pub struct BTreeIndex {
    dir_layout: Layout,
    leaf_layout: Layout,
    dir_table: String,
    leaf_table: String,
    leaf: Option<BTreeLeaf>,
    root_blk: BlockId,
}

impl BTreeIndex {
    pub fn new(tx: &mut Transaction, index_name: &str, leaf_layout: Layout) -> DbResult<Self> {
        let leaf_table = format!("{}_leaf", index_name);
        let dir_table = format!("{}_directory", index_name);

        Self::initialize_leaf_table_if_needed(tx, &leaf_table, &leaf_layout)?;

        let dir_layout = Self::directory_layout(&leaf_layout)?;
        let root_blk = BlockId::new(dir_table.clone(), 0);
        Self::initialize_directory(tx, &dir_table, &root_blk, &dir_layout)?;

        Ok(BTreeIndex {
            dir_layout,
            leaf_layout,
            dir_table,
            leaf_table,
            leaf: None,
            root_blk,
        })
    }

    /// Positions this index's cursor on the leaf that would contain
    /// `search_key` (spec.md §4.8.4).
    pub fn before_first(&mut self, tx: &mut Transaction, search_key: DataValue) -> DbResult<()> {
        self.close(tx);
        let mut root_dir = BTreeDirectory::new(tx, self.root_blk.clone(), self.dir_layout.clone())?;
        let blk_num = root_dir.search(tx, &search_key)?;
        root_dir.close(tx);
        let leaf_blk = BlockId::new(self.leaf_table.clone(), blk_num);
        self.leaf = Some(BTreeLeaf::new(tx, leaf_blk, self.leaf_layout.clone(), search_key)?);
        Ok(())
    }

    pub fn next(&mut self, tx: &mut Transaction) -> DbResult<bool> {
        self.leaf_mut().has_next(tx)
    }

    pub fn get_data_rid(&self, tx: &mut Transaction) -> DbResult<RecordId> {
        self.leaf().get_data_rid(tx)
    }

    /// Inserts an index record for `(data_val, rid)`, propagating any leaf
    /// split through the directory and growing a new root if the root
    /// itself split (spec.md §4.8.4).
    pub fn insert(&mut self, tx: &mut Transaction, data_val: DataValue, rid: RecordId) -> DbResult<()> {
        self.before_first(tx, data_val)?;
        let entry = self.leaf_mut().insert(tx, rid)?;
        self.close(tx);
        let Some(entry) = entry else { return Ok(()) };

        let mut root_dir = BTreeDirectory::new(tx, self.root_blk.clone(), self.dir_layout.clone())?;
        let e2 = root_dir.insert(tx, &entry)?;
        if let Some(e2) = e2 {
            root_dir.make_new_root(tx, e2)?;
        }
        root_dir.close(tx);
        Ok(())
    }

    /// Removes the index record for `(data_val, rid)`. The directory is
    /// never rebuilt on delete; empty leaf chains are tolerated (spec.md
    /// §4.8.4).
    pub fn delete(&mut self, tx: &mut Transaction, data_val: DataValue, rid: RecordId) -> DbResult<()> {
        self.before_first(tx, data_val)?;
        self.leaf_mut().delete(tx, rid)?;
        Ok(())
    }

    /// Safe to call with no leaf positioned (SPEC_FULL.md §B.3).
    pub fn close(&mut self, tx: &mut Transaction) {
        if let Some(leaf) = self.leaf.take() {
            leaf.close(tx);
        }
    }

    fn leaf(&self) -> &BTreeLeaf {
        self.leaf.as_ref().expect("before_first must be called before using the cursor")
    }

    fn leaf_mut(&mut self) -> &mut BTreeLeaf {
        self.leaf.as_mut().expect("before_first must be called before using the cursor")
    }

    fn initialize_leaf_table_if_needed(tx: &mut Transaction, leaf_table: &str, leaf_layout: &Layout) -> DbResult<()> {
        if tx.size(leaf_table)? != 0 {
            return Ok(());
        }
        let blk = tx.append(leaf_table)?;
        let page = BTreePage::new(tx, blk.clone(), leaf_layout.clone())?;
        page.format(tx, &blk, NO_OVERFLOW)?;
        page.close(tx);
        Ok(())
    }

    fn directory_layout(leaf_layout: &Layout) -> DbResult<Layout> {
        let mut dir_schema = Schema::new();
        dir_schema.add(FIELD_BLOCK_NUMBER, leaf_layout.schema())?;
        dir_schema.add(FIELD_DATA_VALUE, leaf_layout.schema())?;
        Layout::new(dir_schema)
    }

    fn initialize_directory(
        tx: &mut Transaction,
        dir_table: &str,
        root_blk: &BlockId,
        dir_layout: &Layout,
    ) -> DbResult<()> {
        if tx.size(dir_table)? != 0 {
            return Ok(());
        }
        tx.append(dir_table)?;
        let page = BTreePage::new(tx, root_blk.clone(), dir_layout.clone())?;
        page.format(tx, root_blk, 0)?;

        let field_type = dir_layout.schema().field_type(FIELD_DATA_VALUE)?;
        let min_val = DataValue::min_value(field_type);
        page.insert_directory(tx, 0, &min_val, 0)?;
        page.close(tx);
        Ok(())
    }
}
