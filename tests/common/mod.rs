//! Shared scratch-database helper for the integration tests (SPEC_FULL.md
//! §A.4), mirroring the teacher's `tests/common/mod.rs`.

use simpledb_core::db::SimpleDB;
use simpledb_core::logging;
use tempfile::TempDir;

/// A `SimpleDB` rooted in a fresh temp directory. The directory is kept
/// alive alongside the database so its files remain valid for the test.
pub struct TestDb {
    pub db: SimpleDB,
    _dir: TempDir,
}

pub fn new_db(block_size: usize, pool_size: usize) -> TestDb {
    logging::init_for_tests();
    let dir = tempfile::tempdir().unwrap();
    let db = SimpleDB::new(dir.path(), block_size, pool_size).unwrap();
    TestDb { db, _dir: dir }
}
