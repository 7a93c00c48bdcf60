//! One pool slot: a page plus its bookkeeping (spec.md §3, §4.3).

use crate::error::DbResult;
use crate::file_manager::FileManager;
use crate::log_manager::{Lsn, LogManager};
use crate::page::{BlockId, Page};

/// A small, copyable reference to a pool slot (spec.md §9 design note: "pass
/// a small `BufferHandle { index, generation }` rather than direct
/// references"). The generation guards against a caller holding a handle
/// across a reassignment it didn't itself cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

/// Holds one page-sized payload, the block it mirrors, a pin count, the
/// last modifying transaction number (-1 if clean), and the LSN of the most
/// recent log record that made it dirty (-1 if none).
pub struct Buffer {
    contents: Page,
    block: Option<BlockId>,
    pins: i32,
    modifying_tx: i32,
    lsn: Lsn,
    pub(crate) generation: u64,
}

impl Buffer {
    pub(crate) fn new(block_size: usize) -> Self {
        Buffer {
            contents: Page::new(block_size),
            block: None,
            pins: 0,
            modifying_tx: -1,
            lsn: -1,
            generation: 0,
        }
    }

    pub fn contents(&self) -> &Page {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut Page {
        &mut self.contents
    }

    pub fn block(&self) -> Option<&BlockId> {
        self.block.as_ref()
    }

    pub fn is_pinned(&self) -> bool {
        self.pins > 0
    }

    pub fn pin_count(&self) -> i32 {
        self.pins
    }

    pub fn modifying_tx(&self) -> i32 {
        self.modifying_tx
    }

    /// Records that `tx_num` just modified this buffer via a log record with
    /// the given LSN (or no new LSN, for unlogged writes such as undo).
    pub fn set_modified(&mut self, tx_num: i32, lsn: Option<Lsn>) {
        self.modifying_tx = tx_num;
        if let Some(lsn) = lsn {
            self.lsn = lsn;
        }
    }

    pub(crate) fn pin(&mut self) {
        self.pins += 1;
    }

    pub(crate) fn unpin(&mut self) {
        self.pins -= 1;
    }

    /// Reassigns this (currently unpinned) buffer to a new block: flushes
    /// any dirty contents first, then reads the new block in.
    pub(crate) fn assign_to_block(
        &mut self,
        block: BlockId,
        fm: &FileManager,
        lm: &LogManager,
    ) -> DbResult<()> {
        self.flush(fm, lm)?;
        fm.read(&block, &mut self.contents)?;
        self.block = Some(block);
        self.pins = 0;
        self.generation = self.generation.wrapping_add(1);
        Ok(())
    }

    /// WAL property: the log is flushed up to this buffer's LSN before the
    /// data page is written, and only then is the buffer marked clean.
    pub(crate) fn flush(&mut self, fm: &FileManager, lm: &LogManager) -> DbResult<()> {
        if self.modifying_tx >= 0 {
            lm.flush_at_least(self.lsn)?;
            if let Some(block) = &self.block {
                fm.write(block, &self.contents)?;
            }
            self.modifying_tx = -1;
        }
        Ok(())
    }
}
