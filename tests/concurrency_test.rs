//! (S4) Lock compatibility: two shared locks on the same block succeed
//! concurrently; an exclusive request blocks until every shared holder
//! releases (spec.md §4.4, §8).

mod common;

use std::thread;
use std::time::Duration;

use simpledb_core::page::BlockId;

#[test]
fn two_transactions_can_hold_shared_locks_on_the_same_block_at_once() {
    let t = common::new_db(400, 8);
    let blk = t.db.file_manager().append("concur").unwrap();

    let mut tx1 = t.db.new_tx().unwrap();
    let mut tx2 = t.db.new_tx().unwrap();
    tx1.pin(&blk).unwrap();
    tx2.pin(&blk).unwrap();

    // both readers should observe the block without blocking each other
    tx1.get_int(&blk, 0).unwrap();
    tx2.get_int(&blk, 0).unwrap();

    tx1.commit().unwrap();
    tx2.commit().unwrap();
}

#[test]
fn an_exclusive_lock_waits_for_every_shared_holder_to_release() {
    let t = common::new_db(400, 8);
    let blk = t.db.file_manager().append("concur2").unwrap();

    let mut reader = t.db.new_tx().unwrap();
    reader.pin(&blk).unwrap();
    reader.get_int(&blk, 0).unwrap();

    let db = &t.db;
    thread::scope(|scope| {
        let handle = scope.spawn(|| {
            let mut writer = db.new_tx().unwrap();
            writer.pin(&blk).unwrap();
            writer.set_int(&blk, 0, 99, true).unwrap();
            writer.commit().unwrap();
        });

        thread::sleep(Duration::from_millis(100));
        assert!(!handle.is_finished(), "writer should block while the reader holds its shared lock");
        reader.commit().unwrap();
        handle.join().unwrap();
    });

    let mut check = db.new_tx().unwrap();
    check.pin(&blk).unwrap();
    assert_eq!(check.get_int(&blk, 0).unwrap(), 99);
    check.commit().unwrap();
}
