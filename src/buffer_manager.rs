//! Fixed-size buffer pool with naive victim selection and a
//! condition-variable wait for a free buffer (spec.md §4.3).

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::buffer::{Buffer, BufferHandle};
use crate::error::{DbError, DbResult};
use crate::file_manager::FileManager;
use crate::log_manager::LogManager;
use crate::page::BlockId;

/// How long a pin may wait for a free buffer before aborting (spec.md §4.3,
/// §5, §7).
pub const MAX_WAIT: Duration = Duration::from_secs(10);

struct Pool {
    buffers: Vec<Buffer>,
    available: usize,
}

/// A fixed-size pool of buffers created at startup. `pin`/`unpin` are
/// coordinated by one condition variable over one inner mutex so releases
/// can broadcast to waiters (spec.md §5).
pub struct BufferManager {
    fm: Arc<FileManager>,
    lm: Arc<LogManager>,
    pool: Mutex<Pool>,
    not_full: Condvar,
}

impl BufferManager {
    pub fn new(fm: Arc<FileManager>, lm: Arc<LogManager>, num_buffers: usize) -> Self {
        let block_size = fm.block_size();
        let buffers = (0..num_buffers).map(|_| Buffer::new(block_size)).collect();
        BufferManager {
            fm,
            lm,
            pool: Mutex::new(Pool {
                buffers,
                available: num_buffers,
            }),
            not_full: Condvar::new(),
        }
    }

    /// Number of currently unpinned buffers.
    pub fn available(&self) -> usize {
        self.pool.lock().unwrap().available
    }

    /// Pins `block`, blocking until a buffer is free or `MAX_WAIT` elapses.
    pub fn pin(&self, block: &BlockId) -> DbResult<BufferHandle> {
        let deadline = Instant::now() + MAX_WAIT;
        let mut pool = self.pool.lock().unwrap();
        loop {
            match self.try_pin(&mut pool, block)? {
                Some(handle) => return Ok(handle),
                None => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!("pin timed out waiting for a free buffer for {:?}", block);
                        DbError::PinTimeout.log_backtrace();
                        return Err(DbError::PinTimeout);
                    }
                    let (guard, timeout_result) = self
                        .not_full
                        .wait_timeout(pool, deadline - now)
                        .unwrap();
                    pool = guard;
                    if timeout_result.timed_out() {
                        // one more attempt before giving up, in case the
                        // wakeup and the deadline landed at the same instant
                        if let Some(handle) = self.try_pin(&mut pool, block)? {
                            return Ok(handle);
                        }
                        DbError::PinTimeout.log_backtrace();
                        return Err(DbError::PinTimeout);
                    }
                }
            }
        }
    }

    fn try_pin(&self, pool: &mut Pool, block: &BlockId) -> DbResult<Option<BufferHandle>> {
        let index = match find_existing(pool, block) {
            Some(i) => i,
            None => match choose_unpinned(pool) {
                Some(i) => {
                    pool.buffers[i].assign_to_block(block.clone(), &self.fm, &self.lm)?;
                    i
                }
                None => return Ok(None),
            },
        };

        let buf = &mut pool.buffers[index];
        if !buf.is_pinned() {
            pool.available -= 1;
        }
        pool.buffers[index].pin();
        let generation = pool.buffers[index].generation;
        Ok(Some(BufferHandle { index, generation }))
    }

    /// Unpins the buffer behind `handle` once.
    pub fn unpin(&self, handle: BufferHandle) {
        let mut pool = self.pool.lock().unwrap();
        let buf = &mut pool.buffers[handle.index];
        if buf.generation != handle.generation {
            // the slot has been reassigned since this handle was pinned;
            // nothing to unpin.
            return;
        }
        buf.unpin();
        if !buf.is_pinned() {
            pool.available += 1;
            drop(pool);
            self.not_full.notify_all();
        }
    }

    /// Runs `f` against the buffer behind `handle`, re-acquiring the pool
    /// lock for the duration of the call.
    pub fn with_buffer<R>(&self, handle: BufferHandle, f: impl FnOnce(&mut Buffer) -> R) -> R {
        let mut pool = self.pool.lock().unwrap();
        f(&mut pool.buffers[handle.index])
    }

    /// Flushes every buffer last modified by `tx_num`.
    pub fn flush_all(&self, tx_num: i32) -> DbResult<()> {
        let mut pool = self.pool.lock().unwrap();
        for buf in pool.buffers.iter_mut() {
            if buf.modifying_tx() == tx_num {
                buf.flush(&self.fm, &self.lm)?;
            }
        }
        Ok(())
    }

    pub fn pool_size(&self) -> usize {
        self.pool.lock().unwrap().buffers.len()
    }
}

fn find_existing(pool: &Pool, block: &BlockId) -> Option<usize> {
    pool.buffers
        .iter()
        .position(|b| b.block() == Some(block))
}

fn choose_unpinned(pool: &Pool) -> Option<usize> {
    let victim = pool.buffers.iter().position(|b| !b.is_pinned());
    if let Some(i) = victim {
        debug!("choosing buffer {} as victim", i);
    }
    victim
}
