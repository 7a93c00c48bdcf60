//! Tracks the buffers one transaction currently has pinned, with
//! multiplicity (spec.md §4.6). Grounded on go-rdb's `BufferList`.

use std::sync::Arc;

use crate::buffer::BufferHandle;
use crate::buffer_manager::BufferManager;
use crate::error::DbResult;
use crate::page::BlockId;

struct Pin {
    block: BlockId,
    handle: BufferHandle,
}

pub struct BufferList {
    bm: Arc<BufferManager>,
    pins: Vec<Pin>,
}

impl BufferList {
    pub fn new(bm: Arc<BufferManager>) -> Self {
        BufferList { bm, pins: Vec::new() }
    }

    pub fn pin(&mut self, block: &BlockId) -> DbResult<()> {
        let handle = self.bm.pin(block)?;
        self.pins.push(Pin {
            block: block.clone(),
            handle,
        });
        Ok(())
    }

    /// Unpins one hold on `block`. A block this list never pinned is
    /// silently ignored (matches go-rdb's `unpin`, which treats "not
    /// found" as success).
    pub fn unpin(&mut self, block: &BlockId) {
        if let Some(pos) = self.pins.iter().position(|p| &p.block == block) {
            let handle = self.pins[pos].handle;
            self.pins.remove(pos);
            self.bm.unpin(handle);
        }
    }

    pub fn unpin_all(&mut self) {
        for pin in self.pins.drain(..) {
            self.bm.unpin(pin.handle);
        }
    }

    pub fn handle_for(&self, block: &BlockId) -> Option<BufferHandle> {
        self.pins.iter().find(|p| &p.block == block).map(|p| p.handle)
    }
}
