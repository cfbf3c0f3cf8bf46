//! Cross-cutting concurrency soundness checks for [`lsm_core::Memtable`].
//!
//! Grounded in the style of `kamil-kielbasa-aeternusdb`'s
//! `memtable/tests/tests_concurrency.rs`: spawn writer and reader threads
//! against one shared table and assert readers never observe a value that
//! was never written.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use lsm_core::{Memtable, VersionedCursor};

#[test]
fn concurrent_writers_land_every_key() {
    let table = Arc::new(Memtable::new());
    let trx_counter = Arc::new(AtomicU64::new(1));

    let mut handles = Vec::new();
    for writer in 0..8 {
        let table = Arc::clone(&table);
        let trx_counter = Arc::clone(&trx_counter);
        handles.push(thread::spawn(move || {
            for i in 0..200 {
                let key = format!("writer{writer}-key{i:04}");
                let val = format!("val{i}");
                let trx_id = trx_counter.fetch_add(1, Ordering::SeqCst);
                table.put(key.as_bytes(), val.as_bytes(), trx_id);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let mut seen = HashSet::new();
    let mut iter = table.begin(0);
    while !iter.is_end() {
        seen.insert(iter.key().to_vec());
        iter.advance();
    }
    assert_eq!(seen.len(), 8 * 200);
}

#[test]
fn readers_never_observe_a_value_never_written() {
    let table = Arc::new(Memtable::new());
    for i in 0..100 {
        let key = format!("key{i:04}");
        table.put(key.as_bytes(), b"initial", 1);
    }

    let writer_table = Arc::clone(&table);
    let writer = thread::spawn(move || {
        for trx_id in 2..200 {
            let idx = trx_id % 100;
            let key = format!("key{idx:04}");
            let val = format!("updated-by-{trx_id}");
            writer_table.put(key.as_bytes(), val.as_bytes(), trx_id as u64);
        }
    });

    let reader_table = Arc::clone(&table);
    let reader = thread::spawn(move || {
        let valid_prefixes = ["initial".to_string(), "updated-by-".to_string()];
        for _ in 0..500 {
            for i in 0..100 {
                let key = format!("key{i:04}");
                if let Some(entry) = reader_table.get(key.as_bytes(), 0) {
                    let observed = String::from_utf8(entry.val).unwrap();
                    assert!(valid_prefixes.iter().any(|p| observed.starts_with(p)));
                }
            }
        }
    });

    writer.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn freeze_does_not_lose_writes_under_contention() {
    let mut config = lsm_core::LsmCoreConfig::default();
    config.freeze_by_entry_count = true;
    let table = Arc::new(Memtable::with_config(config));

    let mut handles = Vec::new();
    for writer in 0..4 {
        let table = Arc::clone(&table);
        handles.push(thread::spawn(move || {
            for i in 0..3_000 {
                let key = format!("w{writer}-{i:05}");
                table.put(key.as_bytes(), b"v", 1);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for writer in 0..4 {
        for i in 0..3_000 {
            let key = format!("w{writer}-{i:05}");
            assert!(table.get(key.as_bytes(), 0).is_some(), "missing {key}");
        }
    }
}
