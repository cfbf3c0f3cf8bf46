//! Merged, MVCC-aware iteration over a memtable's active and frozen
//! indices.
//!
//! Grounded in `original_source/src/memtable/memtable_iterator.{h,cpp}`:
//! a min-heap of candidate `Item`s, one per live version, with the head
//! always the winning version for its key under a snapshot. The original
//! comparator is `item1.trx_id > item2.trx_id || item1.level < item2.level
//! || item1.index < item2.index` - a short-circuiting `||` where a
//! lexicographic compare was clearly intended (the `level`/`index` tiebreaks
//! become unreachable whenever the first clause is true, and get no say at
//! all when it's false but one of them would have mattered). `Item`'s
//! `Ord` here uses proper `.then_with()` chaining instead.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::{CoreError, Result};
use crate::iterator::{IteratorKind, VersionedCursor};

/// One candidate version of a key, tagged with which table it came from.
/// `level == 0` is the active index; `level == k` is `frozen[k-1]`.
/// `table_index` exists for parity with the heap ordering contract when
/// a level can hold more than one table (it doesn't here; always `0`).
#[derive(Clone, Debug)]
pub struct Item {
    pub key: Vec<u8>,
    pub val: Vec<u8>,
    pub level: usize,
    pub table_index: usize,
    pub trx_id: u64,
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.trx_id == other.trx_id
            && self.level == other.level
            && self.table_index == other.table_index
    }
}

impl Eq for Item {}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Item {
    /// Ascending `key`; among equal keys, prefer higher `trx_id`, then
    /// lower `level`, then lower `table_index` - the winning version for
    /// a key sorts least under this order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| other.trx_id.cmp(&self.trx_id))
            .then_with(|| self.level.cmp(&other.level))
            .then_with(|| self.table_index.cmp(&other.table_index))
    }
}

/// A forward cursor over deduplicated, non-tombstone, snapshot-visible
/// `(key, val)` pairs across every table a [`crate::memtable::Memtable`]
/// holds.
pub struct MemtableIterator {
    heap: BinaryHeap<Reverse<Item>>,
    max_trx_id: u64,
}

impl MemtableIterator {
    pub(crate) fn new(items: Vec<Item>, max_trx_id: u64) -> Self {
        let mut heap = BinaryHeap::with_capacity(items.len());
        for item in items {
            heap.push(Reverse(item));
        }
        let mut iter = Self { heap, max_trx_id };
        iter.settle();
        iter
    }

    fn pop_key_group(&mut self, key: &[u8]) {
        loop {
            match self.heap.peek() {
                Some(Reverse(top)) if top.key == key => {
                    self.heap.pop();
                }
                _ => break,
            }
        }
    }

    /// Restores the invariant that the heap's head is either empty or a
    /// snapshot-visible, non-tombstone winner: drop versions newer than
    /// `max_trx_id`, then drop whole key-groups whose winning version is
    /// a tombstone (empty `val`), repeating until the head satisfies both
    /// or the heap drains.
    fn settle(&mut self) {
        loop {
            if self.max_trx_id != 0 {
                loop {
                    match self.heap.peek() {
                        Some(Reverse(top)) if top.trx_id > self.max_trx_id => {
                            self.heap.pop();
                        }
                        _ => break,
                    }
                }
            }
            match self.heap.peek() {
                None => return,
                Some(Reverse(top)) if top.val.is_empty() => {
                    let key = top.key.clone();
                    self.pop_key_group(&key);
                }
                Some(_) => return,
            }
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.heap.peek().expect("valid iterator").0.key
    }

    pub fn val(&self) -> &[u8] {
        &self.heap.peek().expect("valid iterator").0.val
    }
}

impl VersionedCursor for MemtableIterator {
    fn advance(&mut self) {
        if let Some(Reverse(top)) = self.heap.peek() {
            let key = top.key.clone();
            self.pop_key_group(&key);
        }
        self.settle();
    }

    fn is_end(&self) -> bool {
        self.heap.is_empty()
    }

    fn iterator_kind(&self) -> IteratorKind {
        IteratorKind::Memtable
    }

    fn current(&self) -> Result<(&[u8], &[u8])> {
        match self.heap.peek() {
            Some(Reverse(item)) => Ok((&item.key, &item.val)),
            None => Err(CoreError::IteratorOutOfRange),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, val: &str, level: usize, trx_id: u64) -> Item {
        Item {
            key: key.as_bytes().to_vec(),
            val: val.as_bytes().to_vec(),
            level,
            table_index: 0,
            trx_id,
        }
    }

    #[test]
    fn winner_is_highest_trx_id_at_lowest_level() {
        let items = vec![item("k", "old", 1, 1), item("k", "new", 0, 2)];
        let iter = MemtableIterator::new(items, 0);
        assert_eq!(iter.val(), b"new");
    }

    #[test]
    fn tombstone_hides_older_versions_and_is_itself_skipped() {
        let items = vec![item("k", "v1", 1, 1), item("k", "", 0, 2)];
        let iter = MemtableIterator::new(items, 0);
        assert!(iter.is_end());
    }

    #[test]
    fn snapshot_below_tombstone_still_sees_old_value() {
        let items = vec![item("k", "v1", 1, 1), item("k", "", 0, 2)];
        let iter = MemtableIterator::new(items, 1);
        assert_eq!(iter.val(), b"v1");
    }

    #[test]
    fn advance_moves_to_next_distinct_key() {
        let items = vec![
            item("a", "1", 0, 1),
            item("b", "2a", 1, 1),
            item("b", "2b", 0, 2),
        ];
        let mut iter = MemtableIterator::new(items, 0);
        assert_eq!(iter.key(), b"a");
        iter.advance();
        assert_eq!(iter.key(), b"b");
        assert_eq!(iter.val(), b"2b");
        iter.advance();
        assert!(iter.is_end());
    }
}
