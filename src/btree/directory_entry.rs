//! The "bubble up" result of an insert that split a child page (spec.md
//! §4.8.2, §4.8.3). Grounded on go-rdb's `DirectoryEntry` /
//! `emptyDir` pair, restated as `Option<DirectoryEntry>` rather than a
//! zero-value sentinel.

use crate::btree::data_value::DataValue;

/// A new (smallest key in the new page, new page's block number) pair that
/// a split produced and that the caller must insert into the parent
/// directory.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    data_value: DataValue,
    block_number: i32,
}

impl DirectoryEntry {
    pub fn new(data_value: DataValue, block_number: i32) -> Self {
        DirectoryEntry {
            data_value,
            block_number,
        }
    }

    pub fn data_value(&self) -> &DataValue {
        &self.data_value
    }

    pub fn block_number(&self) -> i32 {
        self.block_number
    }
}
