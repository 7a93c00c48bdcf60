//! Log manager ordering and recovery (spec.md §4.2, §8).

mod common;

#[test]
fn appended_records_are_visible_newest_first_without_an_explicit_flush() {
    let t = common::new_db(400, 8);
    let lm = t.db.log_manager();

    lm.append(b"first").unwrap();
    lm.append(b"second").unwrap();
    lm.append(b"third").unwrap();

    let recs: Vec<Vec<u8>> = lm.iterator().unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(
        recs,
        vec![b"third".to_vec(), b"second".to_vec(), b"first".to_vec()]
    );
}

#[test]
fn reopening_an_existing_log_file_picks_up_its_tail_block() {
    let dir = tempfile::tempdir().unwrap();
    let db1 = simpledb_core::db::SimpleDB::new(dir.path(), 400, 8).unwrap();
    db1.log_manager().append(b"before restart").unwrap();
    drop(db1);

    // a fresh SimpleDB over the same directory (SPEC_FULL.md §B.1) must see
    // the previously appended record rather than starting a blank log.
    let db2 = simpledb_core::db::SimpleDB::new(dir.path(), 400, 8).unwrap();
    let recs: Vec<Vec<u8>> = db2.log_manager().iterator().unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(recs, vec![b"before restart".to_vec()]);
}
