//! Per-block shared/exclusive lock table with a condition-variable wait
//! and abort-on-timeout (spec.md §4.4).

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use log::warn;

use crate::error::{DbError, DbResult};
use crate::page::BlockId;

/// How long `sLock`/`xLock` may wait before aborting (spec.md §4.4, §5).
pub const MAX_WAIT: Duration = Duration::from_secs(10);

/// `-1` = exclusive, `0` = unlocked (absent from the map), `k >= 1` =
/// shared, held by `k` transactions.
struct LockState {
    locks: HashMap<BlockId, i32>,
}

/// Process-wide table of per-block locks. Waiters share one condition
/// variable; release broadcasts to all of them (spec.md §5).
pub struct LockTable {
    state: Mutex<LockState>,
    cond: Condvar,
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LockTable {
    pub fn new() -> Self {
        LockTable {
            state: Mutex::new(LockState {
                locks: HashMap::new(),
            }),
            cond: Condvar::new(),
        }
    }

    /// Blocks while `block` is exclusively locked, then records one more
    /// shared holder.
    pub fn s_lock(&self, block: &BlockId) -> DbResult<()> {
        let deadline = Instant::now() + MAX_WAIT;
        let mut st = self.state.lock().unwrap();
        while Self::has_x_lock(&st, block) {
            let now = Instant::now();
            if now >= deadline {
                warn!("sLock timed out on {:?}", block);
                let err = DbError::LockAbort(format!("{:?}", block));
                err.log_backtrace();
                return Err(err);
            }
            let (guard, timeout) = self.cond.wait_timeout(st, deadline - now).unwrap();
            st = guard;
            if timeout.timed_out() && Self::has_x_lock(&st, block) {
                let err = DbError::LockAbort(format!("{:?}", block));
                err.log_backtrace();
                return Err(err);
            }
        }
        let entry = st.locks.entry(block.clone()).or_insert(0);
        *entry += 1;
        Ok(())
    }

    /// Blocks while any *other* transaction holds shared on `block` (the
    /// caller is assumed to already hold its own shared lock and is counted
    /// in the total), then sets the block exclusive.
    pub fn x_lock(&self, block: &BlockId) -> DbResult<()> {
        let deadline = Instant::now() + MAX_WAIT;
        let mut st = self.state.lock().unwrap();
        while Self::has_other_s_locks(&st, block) {
            let now = Instant::now();
            if now >= deadline {
                warn!("xLock timed out on {:?}", block);
                let err = DbError::LockAbort(format!("{:?}", block));
                err.log_backtrace();
                return Err(err);
            }
            let (guard, timeout) = self.cond.wait_timeout(st, deadline - now).unwrap();
            st = guard;
            if timeout.timed_out() && Self::has_other_s_locks(&st, block) {
                let err = DbError::LockAbort(format!("{:?}", block));
                err.log_backtrace();
                return Err(err);
            }
        }
        st.locks.insert(block.clone(), -1);
        Ok(())
    }

    /// Releases one hold on `block`: decrements a shared count, or clears
    /// an exclusive/last-shared hold and wakes waiters.
    pub fn unlock(&self, block: &BlockId) {
        let mut st = self.state.lock().unwrap();
        match st.locks.get(block).copied() {
            Some(v) if v > 1 => {
                st.locks.insert(block.clone(), v - 1);
            }
            Some(_) => {
                st.locks.remove(block);
                drop(st);
                self.cond.notify_all();
            }
            None => {}
        }
    }

    fn has_x_lock(st: &LockState, block: &BlockId) -> bool {
        st.locks.get(block).copied() == Some(-1)
    }

    fn has_other_s_locks(st: &LockState, block: &BlockId) -> bool {
        st.locks.get(block).copied().unwrap_or(0) > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn two_shared_locks_are_compatible() {
        let lt = LockTable::new();
        let blk = BlockId::new("f", 0);
        lt.s_lock(&blk).unwrap();
        lt.s_lock(&blk).unwrap();
    }

    #[test]
    fn exclusive_excludes_shared() {
        let lt = Arc::new(LockTable::new());
        let blk = BlockId::new("f", 0);
        lt.s_lock(&blk).unwrap();

        let lt2 = lt.clone();
        let blk2 = blk.clone();
        let handle = thread::spawn(move || {
            // this should block until the shared lock above is released
            lt2.x_lock(&blk2)
        });

        thread::sleep(Duration::from_millis(50));
        lt.unlock(&blk);
        assert!(handle.join().unwrap().is_ok());
    }
}
