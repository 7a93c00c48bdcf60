//! (S5) B-tree split under many distinct keys, and (S6) an overflow chain
//! under many duplicate keys (spec.md §4.8, §8).

mod common;

use rand::seq::SliceRandom;
use rand::thread_rng;

use simpledb_core::btree::{BTreeIndex, DataValue};
use simpledb_core::record::record_id::RecordId;
use simpledb_core::record::{Layout, Schema};

fn int_index_leaf_layout() -> Layout {
    let mut schema = Schema::new();
    schema.add_int_field("id");
    schema.add_int_field("block");
    schema.add_int_field("dataval");
    Layout::new(schema).unwrap()
}

#[test]
fn five_hundred_distinct_keys_all_round_trip_and_the_tree_grows_past_one_block() {
    let t = common::new_db(400, 8);
    let mut tx = t.db.new_tx().unwrap();

    let mut index = BTreeIndex::new(&mut tx, "studentid", int_index_leaf_layout()).unwrap();
    for k in 1..=500 {
        index.insert(&mut tx, DataValue::Int(k), RecordId::new(k, 0)).unwrap();
    }

    index.before_first(&mut tx, DataValue::Int(250)).unwrap();
    assert!(index.next(&mut tx).unwrap());
    assert_eq!(index.get_data_rid(&mut tx).unwrap(), RecordId::new(250, 0));
    assert!(!index.next(&mut tx).unwrap());
    index.close(&mut tx);

    for k in 1..=500 {
        index.before_first(&mut tx, DataValue::Int(k)).unwrap();
        let mut matches = 0;
        while index.next(&mut tx).unwrap() {
            assert_eq!(index.get_data_rid(&mut tx).unwrap(), RecordId::new(k, 0));
            matches += 1;
        }
        assert_eq!(matches, 1, "key {} should have exactly one match", k);
        index.close(&mut tx);
    }

    // 500 keys cannot fit in a single directory block at this page size,
    // so the root must have split at least once.
    assert!(tx.size("studentid_directory").unwrap() > 1);

    tx.commit().unwrap();
}

#[test]
fn three_hundred_duplicate_keys_are_all_visited_through_an_overflow_chain() {
    let t = common::new_db(400, 8);
    let mut tx = t.db.new_tx().unwrap();

    let mut index = BTreeIndex::new(&mut tx, "zipcode", int_index_leaf_layout()).unwrap();
    for slot in 0..300 {
        index
            .insert(&mut tx, DataValue::Int(42), RecordId::new(1, slot))
            .unwrap();
    }

    index.before_first(&mut tx, DataValue::Int(42)).unwrap();
    let mut seen = std::collections::HashSet::new();
    while index.next(&mut tx).unwrap() {
        let rid = index.get_data_rid(&mut tx).unwrap();
        assert_eq!(rid.block_num(), 1);
        seen.insert(rid.slot());
    }
    assert_eq!(seen.len(), 300);
    index.close(&mut tx);

    // every duplicate past the first page spilled into an overflow block.
    assert!(tx.size("zipcode_leaf").unwrap() > 1);

    tx.commit().unwrap();
}

#[test]
fn lookups_succeed_regardless_of_the_order_keys_were_inserted_in() {
    let t = common::new_db(400, 8);
    let mut tx = t.db.new_tx().unwrap();

    let mut keys: Vec<i32> = (1..=300).collect();
    keys.shuffle(&mut thread_rng());

    let mut index = BTreeIndex::new(&mut tx, "shuffled", int_index_leaf_layout()).unwrap();
    for &k in &keys {
        index.insert(&mut tx, DataValue::Int(k), RecordId::new(k, 0)).unwrap();
    }

    for k in 1..=300 {
        index.before_first(&mut tx, DataValue::Int(k)).unwrap();
        assert!(index.next(&mut tx).unwrap(), "key {} missing after shuffled insert", k);
        assert_eq!(index.get_data_rid(&mut tx).unwrap(), RecordId::new(k, 0));
        index.close(&mut tx);
    }

    tx.commit().unwrap();
}
