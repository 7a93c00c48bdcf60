//! Per-field byte offsets and slot size derived from a `Schema` (spec.md
//! §3). Grounded on go-rdb's `record.Layout`.

use std::collections::HashMap;

use crate::error::DbResult;
use crate::record::schema::{Schema, INT_BYTE_SIZE};

/// `schema` + per-field offsets + `slotSize`. The first 4 bytes of every
/// slot are the used/empty flag; field offsets start right after it.
#[derive(Debug, Clone)]
pub struct Layout {
    schema: Schema,
    offsets: HashMap<String, usize>,
    slot_size: usize,
}

impl Layout {
    /// Lays fields out in schema order immediately after the flag.
    pub fn new(schema: Schema) -> DbResult<Self> {
        let mut offsets = HashMap::new();
        let mut pos = INT_BYTE_SIZE;
        for field in schema.fields() {
            offsets.insert(field.clone(), pos);
            pos += schema.length_in_bytes(field)?;
        }
        Ok(Layout {
            schema,
            offsets,
            slot_size: pos,
        })
    }

    /// Builds a layout from externally computed offsets (e.g. a catalog
    /// table's persisted layout).
    pub fn with_offsets(schema: Schema, offsets: HashMap<String, usize>, slot_size: usize) -> Self {
        Layout {
            schema,
            offsets,
            slot_size,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn offset(&self, field_name: &str) -> DbResult<usize> {
        self.offsets.get(field_name).copied().ok_or_else(|| {
            crate::error::DbError::Schema(format!("no offset for field {}", field_name))
        })
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_the_flag_and_accumulate() {
        let mut schema = Schema::new();
        schema.add_int_field("id");
        schema.add_string_field("name", 10);
        let layout = Layout::new(schema).unwrap();

        assert_eq!(layout.offset("id").unwrap(), 4);
        assert_eq!(layout.offset("name").unwrap(), 8);
        assert_eq!(layout.slot_size(), 8 + 4 + 10);
    }
}
