//! Fixed-size block I/O over named files (spec.md §4.1).

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;

use crate::error::DbResult;
use crate::page::{BlockId, Page};

struct OpenFiles {
    dir: PathBuf,
    handles: HashMap<String, File>,
}

impl OpenFiles {
    fn get(&mut self, file_name: &str) -> DbResult<&mut File> {
        if !self.handles.contains_key(file_name) {
            let path = self.dir.join(file_name);
            let f = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)?;
            self.handles.insert(file_name.to_string(), f);
        }
        Ok(self.handles.get_mut(file_name).unwrap())
    }
}

/// Reads/writes named, block-addressed files under one directory. All I/O
/// is serialized on a single mutex (spec.md §5): the lock is held only for
/// the duration of one read/write/append/length syscall sequence, never
/// while a log or buffer lock is held.
pub struct FileManager {
    block_size: usize,
    is_new: bool,
    files: Mutex<OpenFiles>,
}

impl FileManager {
    /// Opens (creating if needed) the database directory. Discards stale
    /// files whose names begin with `temp` — materialization scratch left
    /// over from a previous, out-of-scope planner run.
    pub fn new(dir: impl AsRef<Path>, block_size: usize) -> DbResult<Self> {
        let dir = dir.as_ref();
        let is_new = !dir.exists();
        if is_new {
            fs::create_dir_all(dir)?;
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let name = entry.file_name();
                if name.to_string_lossy().starts_with("temp") {
                    debug!("discarding stale scratch file {:?}", name);
                    fs::remove_file(entry.path())?;
                }
            }
        }

        Ok(FileManager {
            block_size,
            is_new,
            files: Mutex::new(OpenFiles {
                dir: dir.to_path_buf(),
                handles: HashMap::new(),
            }),
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Reads up to `block_size` bytes of `block` into `page`. A short read
    /// at EOF is not an error; the untouched tail of the page buffer keeps
    /// whatever it held before the call.
    pub fn read(&self, block: &BlockId, page: &mut Page) -> DbResult<()> {
        let mut files = self.files.lock().unwrap();
        let block_size = self.block_size;
        let f = files.get(block.file_name())?;
        f.seek(SeekFrom::Start((block.block_num() as u64) * block_size as u64))?;
        let n = f.read(page.contents_mut())?;
        debug!("read {} bytes of {:?}", n, block);
        Ok(())
    }

    /// Writes exactly `page`'s buffer to `block`.
    pub fn write(&self, block: &BlockId, page: &Page) -> DbResult<()> {
        let mut files = self.files.lock().unwrap();
        let block_size = self.block_size;
        let f = files.get(block.file_name())?;
        f.seek(SeekFrom::Start((block.block_num() as u64) * block_size as u64))?;
        f.write_all(page.contents())?;
        Ok(())
    }

    /// Extends `file` by one zero-filled block and returns its `BlockId`.
    pub fn append(&self, file_name: &str) -> DbResult<BlockId> {
        let mut files = self.files.lock().unwrap();
        let block_size = self.block_size;
        let new_block_num = {
            let f = files.get(file_name)?;
            (f.metadata()?.len() / block_size as u64) as i32
        };
        let block = BlockId::new(file_name, new_block_num);
        let zeros = vec![0u8; block_size];
        let f = files.get(file_name)?;
        f.seek(SeekFrom::Start((new_block_num as u64) * block_size as u64))?;
        f.write_all(&zeros)?;
        Ok(block)
    }

    /// Number of blocks currently in `file` (floored file size / block size).
    pub fn length(&self, file_name: &str) -> DbResult<i32> {
        let mut files = self.files.lock().unwrap();
        let block_size = self.block_size;
        let f = files.get(file_name)?;
        Ok((f.metadata()?.len() / block_size as u64) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_then_read_round_trip() {
        let dir = tempdir().unwrap();
        let fm = FileManager::new(dir.path(), 400).unwrap();

        let blk = fm.append("testfile").unwrap();
        assert_eq!(blk.block_num(), 0);
        assert_eq!(fm.length("testfile").unwrap(), 1);

        let mut page = Page::new(400);
        page.set_string(88, "abcdefghijklm").unwrap();
        fm.write(&blk, &page).unwrap();

        let mut page2 = Page::new(400);
        fm.read(&blk, &mut page2).unwrap();
        assert_eq!(page2.get_string(88).unwrap(), "abcdefghijklm");
    }

    #[test]
    fn append_extends_file_length() {
        let dir = tempdir().unwrap();
        let fm = FileManager::new(dir.path(), 400).unwrap();
        fm.append("f").unwrap();
        fm.append("f").unwrap();
        assert_eq!(fm.length("f").unwrap(), 2);
    }

    #[test]
    fn discards_stale_temp_files_on_open() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("temp12345"), b"scratch").unwrap();
        std::fs::write(dir.path().join("keepme"), b"data").unwrap();

        FileManager::new(dir.path(), 400).unwrap();

        assert!(!dir.path().join("temp12345").exists());
        assert!(dir.path().join("keepme").exists());
    }
}
