//! Append-only log of variable-length records, written back-to-front
//! within each block, with a newest-first iterator (spec.md §4.2).

use std::sync::{Arc, Mutex};

use log::debug;

use crate::error::DbResult;
use crate::file_manager::FileManager;
use crate::page::{BlockId, Page};

/// LSNs are 1-based; the first record appended gets LSN 1.
pub type Lsn = i32;

struct LogManagerState {
    log_page: Page,
    current_block: BlockId,
    latest_lsn: Lsn,
    last_saved_lsn: Lsn,
}

/// Owns one page (the "log page") and the current block of the log file.
/// `append` is back-to-front within a block so a reverse iterator yields
/// newest-first without an index. An internal mutex protects append/flush;
/// it may call into `FileManager` while held (spec.md §5).
pub struct LogManager {
    fm: Arc<FileManager>,
    log_file: String,
    state: Mutex<LogManagerState>,
}

impl LogManager {
    pub fn new(fm: Arc<FileManager>, log_file: impl Into<String>) -> DbResult<Self> {
        let log_file = log_file.into();
        let block_size = fm.block_size();
        let log_size = fm.length(&log_file)?;

        let (log_page, current_block) = if log_size == 0 {
            let mut page = Page::new(block_size);
            page.set_int(0, block_size as i32)?;
            let block = fm.append(&log_file)?;
            fm.write(&block, &page)?;
            (page, block)
        } else {
            // Supplemented (B.1, grounded on go-rdb's NewLogManager): an
            // existing log file's tail block is read back in rather than
            // always starting a fresh block.
            let block = BlockId::new(log_file.clone(), log_size - 1);
            let mut page = Page::new(block_size);
            fm.read(&block, &mut page)?;
            (page, block)
        };

        Ok(LogManager {
            fm,
            log_file,
            state: Mutex::new(LogManagerState {
                log_page,
                current_block,
                latest_lsn: 0,
                last_saved_lsn: 0,
            }),
        })
    }

    /// Appends `record` to the log, writing it back-to-front within the
    /// current block. Returns the LSN assigned to this record.
    pub fn append(&self, record: &[u8]) -> DbResult<Lsn> {
        let mut st = self.state.lock().unwrap();
        let block_size = self.fm.block_size();

        let rec_size = record.len();
        let needed = rec_size + 4;

        let mut boundary = st.log_page.get_int(0)? as usize;
        if (boundary as i64) - (needed as i64) < 4 {
            // no room even for the new boundary value: flush and roll over
            self.flush_locked(&mut st)?;
            let new_block = self.fm.append(&self.log_file)?;
            let mut page = Page::new(block_size);
            page.set_int(0, block_size as i32)?;
            st.log_page = page;
            st.current_block = new_block;
            boundary = block_size;
        }

        let rec_pos = boundary - needed;
        st.log_page.set_bytes(rec_pos, record)?;
        st.log_page.set_int(0, rec_pos as i32)?;

        st.latest_lsn += 1;
        debug!("appended log record at lsn {}", st.latest_lsn);
        Ok(st.latest_lsn)
    }

    /// Flushes the log up to and including `lsn` if it has not already
    /// been saved.
    pub fn flush_at_least(&self, lsn: Lsn) -> DbResult<()> {
        let mut st = self.state.lock().unwrap();
        if lsn >= st.last_saved_lsn {
            self.flush_locked(&mut st)?;
        }
        Ok(())
    }

    fn flush_locked(&self, st: &mut LogManagerState) -> DbResult<()> {
        self.fm.write(&st.current_block, &st.log_page)?;
        st.last_saved_lsn = st.latest_lsn;
        Ok(())
    }

    /// Forces a flush, then returns an iterator over all log records from
    /// newest to oldest.
    pub fn iterator(&self) -> DbResult<LogIterator<'_>> {
        {
            let mut st = self.state.lock().unwrap();
            self.flush_locked(&mut st)?;
        }
        let st = self.state.lock().unwrap();
        LogIterator::new(&self.fm, st.current_block.clone())
    }
}

/// Reverse iterator over log records: newest to oldest.
pub struct LogIterator<'a> {
    fm: &'a FileManager,
    block: BlockId,
    page: Page,
    current_pos: usize,
    boundary: usize,
}

impl<'a> LogIterator<'a> {
    fn new(fm: &'a FileManager, block: BlockId) -> DbResult<Self> {
        let block_size = fm.block_size();
        let mut it = LogIterator {
            fm,
            block,
            page: Page::new(block_size),
            current_pos: 0,
            boundary: 0,
        };
        it.move_to_block(it.block.clone())?;
        Ok(it)
    }

    fn move_to_block(&mut self, block: BlockId) -> DbResult<()> {
        self.fm.read(&block, &mut self.page)?;
        self.boundary = self.page.get_int(0)? as usize;
        self.current_pos = self.boundary;
        self.block = block;
        Ok(())
    }

    fn has_next(&self) -> bool {
        self.current_pos < self.fm.block_size() || self.block.block_num() > 0
    }
}

impl<'a> Iterator for LogIterator<'a> {
    type Item = DbResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }

        if self.current_pos == self.fm.block_size() {
            let prev = BlockId::new(self.block.file_name(), self.block.block_num() - 1);
            if let Err(e) = self.move_to_block(prev) {
                return Some(Err(e));
            }
        }

        let rec = match self.page.get_bytes(self.current_pos) {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };
        self.current_pos += 4 + rec.len();
        Some(Ok(rec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_lm(block_size: usize) -> (Arc<FileManager>, LogManager) {
        let dir = tempdir().unwrap();
        // leak the tempdir so the FileManager's files remain valid for the test
        let path = dir.into_path();
        let fm = Arc::new(FileManager::new(path, block_size).unwrap());
        let lm = LogManager::new(fm.clone(), "simpledb.log").unwrap();
        (fm, lm)
    }

    #[test]
    fn lsns_start_at_one_and_are_contiguous() {
        let (_fm, lm) = new_lm(400);
        assert_eq!(lm.append(b"a").unwrap(), 1);
        assert_eq!(lm.append(b"bb").unwrap(), 2);
        assert_eq!(lm.append(b"ccc").unwrap(), 3);
    }

    #[test]
    fn iterator_visits_newest_first() {
        let (_fm, lm) = new_lm(400);
        lm.append(b"rec1").unwrap();
        lm.append(b"rec2").unwrap();
        lm.append(b"rec3").unwrap();

        let recs: Vec<Vec<u8>> = lm.iterator().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(recs, vec![b"rec3".to_vec(), b"rec2".to_vec(), b"rec1".to_vec()]);
    }

    #[test]
    fn rolls_over_to_a_new_block_when_full() {
        let (_fm, lm) = new_lm(64);
        // each record needs 4 (length prefix) + payload bytes; force several rollovers
        for i in 0..40 {
            lm.append(format!("record-{:03}", i).as_bytes()).unwrap();
        }
        let recs: Vec<Vec<u8>> = lm.iterator().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(recs.len(), 40);
        assert_eq!(recs[0], b"record-039".to_vec());
        assert_eq!(recs[39], b"record-000".to_vec());
    }
}
