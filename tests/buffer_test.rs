//! (S1) Buffer pool contention: with a pool of 3, a 4th concurrent pin
//! blocks until one of the first three is released, then succeeds
//! (spec.md §8).

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use simpledb_core::page::BlockId;

#[test]
fn a_pin_beyond_pool_capacity_blocks_until_a_buffer_is_released() {
    let t = common::new_db(400, 3);
    let bm = t.db.buffer_manager().clone();

    let b0 = BlockId::new("buftest", 0);
    let b1 = BlockId::new("buftest", 1);
    let b2 = BlockId::new("buftest", 2);
    let b3 = BlockId::new("buftest", 3);

    let h0 = bm.pin(&b0).unwrap();
    let _h1 = bm.pin(&b1).unwrap();
    let _h2 = bm.pin(&b2).unwrap();
    assert_eq!(bm.available(), 0);

    let bm2 = Arc::clone(&bm);
    let waiter = thread::spawn(move || bm2.pin(&b3));

    thread::sleep(Duration::from_millis(100));
    assert!(!waiter.is_finished(), "pin should still be blocked with no free buffer");

    bm.unpin(h0);
    let h3 = waiter.join().unwrap().expect("pin should succeed once a buffer frees up");
    bm.unpin(h3);
}

#[test]
fn pinning_the_same_block_twice_reuses_the_buffer() {
    let t = common::new_db(400, 2);
    let bm = t.db.buffer_manager();
    let blk = BlockId::new("buftest2", 0);

    let h1 = bm.pin(&blk).unwrap();
    let h2 = bm.pin(&blk).unwrap();
    assert_eq!(bm.available(), 1);

    bm.unpin(h1);
    assert_eq!(bm.available(), 1);
    bm.unpin(h2);
    assert_eq!(bm.available(), 2);
}
