//! Two-tier active/frozen holder of ordered versioned indices.
//!
//! Grounded in `original_source/src/memtable/memtable.{h,cpp}`: one active
//! index takes writes; once it crosses the freeze threshold it is moved,
//! whole, to the front of a frozen list and replaced by a fresh empty
//! index. The arena-based [`crate::skiplist::SkipList`] isn't lock-free,
//! so synchronization is explicit: a reader/writer lock around the active
//! reference and a separate one around the frozen vector, taken
//! active-then-frozen whenever both are needed, matching the locking
//! order below.

pub mod iterator;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{LsmCoreConfig, DEFAULT_FREEZE_ENTRY_COUNT};
use crate::iterator::VersionedCursor;
use crate::skiplist::{SkipList, SkipListIterator};

pub use iterator::MemtableIterator;
use iterator::Item;

/// The value half of a memtable lookup: the winning version's bytes and
/// the `trx_id` it was written at. An empty `val` is a tombstone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemtableEntry {
    pub val: Vec<u8>,
    pub trx_id: u64,
}

pub struct Memtable {
    active: RwLock<SkipList>,
    frozen: RwLock<Vec<Arc<SkipList>>>,
    config: LsmCoreConfig,
}

impl Memtable {
    pub fn new() -> Self {
        Self::with_config(LsmCoreConfig::default())
    }

    pub fn with_config(config: LsmCoreConfig) -> Self {
        Self {
            active: RwLock::new(SkipList::new()),
            frozen: RwLock::new(Vec::new()),
            config,
        }
    }

    fn over_threshold(&self, active: &SkipList) -> bool {
        if self.config.freeze_by_entry_count {
            active.len() >= DEFAULT_FREEZE_ENTRY_COUNT
        } else {
            active.size_bytes() > self.config.per_memtable_size
        }
    }

    /// Locks active then frozen, in that fixed order, to avoid deadlock
    /// with any other path that needs both.
    fn freeze_if_over_threshold(&self) {
        let mut active = self.active.write();
        if !self.over_threshold(&active) {
            return;
        }
        let mut frozen = self.frozen.write();
        let sealed = std::mem::replace(&mut *active, SkipList::new());
        tracing::debug!(
            size_bytes = sealed.size_bytes(),
            entries = sealed.len(),
            "freezing active memtable"
        );
        frozen.insert(0, Arc::new(sealed));
    }

    /// Freezes unconditionally, regardless of whether the active index is
    /// over threshold (the compactor-facing manual flush trigger).
    pub fn freeze(&self) {
        let mut active = self.active.write();
        let mut frozen = self.frozen.write();
        let sealed = std::mem::replace(&mut *active, SkipList::new());
        frozen.insert(0, Arc::new(sealed));
    }

    pub fn put(&self, key: &[u8], val: &[u8], trx_id: u64) {
        {
            let mut active = self.active.write();
            active.put(key, val, trx_id);
        }
        self.freeze_if_over_threshold();
    }

    pub fn put_batch(&self, pairs: &[(Vec<u8>, Vec<u8>)], trx_id: u64) {
        {
            let mut active = self.active.write();
            for (key, val) in pairs {
                active.put(key, val, trx_id);
            }
        }
        self.freeze_if_over_threshold();
    }

    /// A removal is a tombstone: `put(key, "", trx_id)`.
    pub fn remove(&self, key: &[u8], trx_id: u64) {
        self.put(key, b"", trx_id);
    }

    pub fn remove_batch(&self, keys: &[Vec<u8>], trx_id: u64) {
        let pairs: Vec<(Vec<u8>, Vec<u8>)> = keys.iter().map(|k| (k.clone(), Vec::new())).collect();
        self.put_batch(&pairs, trx_id);
    }

    fn entry_from(it: &SkipListIterator<'_>) -> MemtableEntry {
        MemtableEntry {
            val: it.val().to_vec(),
            trx_id: it.trx_id(),
        }
    }

    /// Consults the active index; on miss, consults frozen indices
    /// newest-first.
    pub fn get(&self, key: &[u8], trx_id: u64) -> Option<MemtableEntry> {
        {
            let active = self.active.read();
            let it = active.get(key, trx_id);
            if it.is_valid() {
                return Some(Self::entry_from(&it));
            }
        }
        let frozen = self.frozen.read();
        for table in frozen.iter() {
            let it = table.get(key, trx_id);
            if it.is_valid() {
                return Some(Self::entry_from(&it));
            }
        }
        None
    }

    /// Probes the active index for every key in one pass, then probes
    /// frozen tables only for the keys still missing.
    pub fn get_batch(&self, keys: &[Vec<u8>], trx_id: u64) -> Vec<(Vec<u8>, Option<MemtableEntry>)> {
        let mut results: Vec<(Vec<u8>, Option<MemtableEntry>)> = {
            let active = self.active.read();
            keys.iter()
                .map(|key| {
                    let it = active.get(key, trx_id);
                    let entry = if it.is_valid() { Some(Self::entry_from(&it)) } else { None };
                    (key.clone(), entry)
                })
                .collect()
        };

        if results.iter().all(|(_, entry)| entry.is_some()) {
            return results;
        }

        let frozen = self.frozen.read();
        for (key, slot) in results.iter_mut() {
            if slot.is_some() {
                continue;
            }
            for table in frozen.iter() {
                let it = table.get(key, trx_id);
                if it.is_valid() {
                    *slot = Some(Self::entry_from(&it));
                    break;
                }
            }
        }
        results
    }

    pub fn begin(&self, trx_id: u64) -> MemtableIterator {
        let active = self.active.read();
        let frozen = self.frozen.read();
        let mut items = Vec::new();
        collect_all(&active, 0, &mut items);
        for (idx, table) in frozen.iter().enumerate() {
            collect_all(table, idx + 1, &mut items);
        }
        MemtableIterator::new(items, trx_id)
    }

    pub fn iters_prefix(&self, prefix: &[u8], trx_id: u64) -> MemtableIterator {
        let active = self.active.read();
        let frozen = self.frozen.read();
        let mut items = Vec::new();
        collect_prefix(&active, 0, prefix, &mut items);
        for (idx, table) in frozen.iter().enumerate() {
            collect_prefix(table, idx + 1, prefix, &mut items);
        }
        MemtableIterator::new(items, trx_id)
    }

    pub fn iters_monotony_predicate<F>(&self, trx_id: u64, f: F) -> Option<MemtableIterator>
    where
        F: Fn(&[u8]) -> i32 + Copy,
    {
        let active = self.active.read();
        let frozen = self.frozen.read();
        let mut items = Vec::new();
        if let Some((begin, end)) = active.iters_monotony_predicate(f) {
            collect_range(begin, end, 0, &mut items);
        }
        for (idx, table) in frozen.iter().enumerate() {
            if let Some((begin, end)) = table.iters_monotony_predicate(f) {
                collect_range(begin, end, idx + 1, &mut items);
            }
        }
        if items.is_empty() {
            None
        } else {
            Some(MemtableIterator::new(items, trx_id))
        }
    }

    pub fn active_bytes(&self) -> usize {
        self.active.read().size_bytes()
    }

    pub fn frozen_bytes(&self) -> usize {
        self.frozen.read().iter().map(|table| table.size_bytes()).sum()
    }

    pub fn total_bytes(&self) -> usize {
        self.active_bytes() + self.frozen_bytes()
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_all(list: &SkipList, level: usize, items: &mut Vec<Item>) {
    for (key, val, trx_id) in list.begin() {
        items.push(Item {
            key: key.to_vec(),
            val: val.to_vec(),
            level,
            table_index: 0,
            trx_id,
        });
    }
}

fn collect_prefix(list: &SkipList, level: usize, prefix: &[u8], items: &mut Vec<Item>) {
    let mut cur = list.begin_prefix(prefix);
    let end = list.end_prefix(prefix);
    while cur != end {
        items.push(Item {
            key: cur.key().to_vec(),
            val: cur.val().to_vec(),
            level,
            table_index: 0,
            trx_id: cur.trx_id(),
        });
        cur.advance();
    }
}

fn collect_range(mut begin: SkipListIterator<'_>, end: SkipListIterator<'_>, level: usize, items: &mut Vec<Item>) {
    while begin != end {
        items.push(Item {
            key: begin.key().to_vec(),
            val: begin.val().to_vec(),
            level,
            table_index: 0,
            trx_id: begin.trx_id(),
        });
        begin.advance();
    }
}
