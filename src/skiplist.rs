//! The ordered versioned index: a probabilistic skip list over
//! `(key, trx_id)` pairs.
//!
//! Grounded in `original_source/src/skiplist/skiplist.{h,cpp}`: a classic
//! probabilistic skip list keyed by `(key, trx_id)` under the versioned key
//! ordering. We pick the arena option over reference-counted nodes: all
//! nodes live in one `Vec<Node>`, `next` pointers are arena indices
//! (`u32`), and the whole structure is freed in one deallocation when the
//! `SkipList` is dropped - better cache locality and no `Rc`/`Arc`
//! bookkeeping per node, at the cost of never reclaiming a slot vacated by
//! `remove` until the whole index is dropped (`remove` is a low-level
//! operation that is never hot).
//!
//! The index itself takes no internal lock: callers (the memtable) are
//! responsible for synchronizing `put`/`remove` against concurrent
//! readers; once a `SkipList` is frozen it is never mutated again and can
//! be shared behind an `Arc` freely.

pub mod iterator;

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::key::{has_prefix, versioned_cmp};
pub use iterator::SkipListIterator;

pub(crate) const NIL: u32 = u32::MAX;
pub const DEFAULT_MAX_LEVEL: usize = 16;

pub(crate) struct Node {
    pub(crate) key: Vec<u8>,
    pub(crate) val: Vec<u8>,
    pub(crate) trx_id: u64,
    pub(crate) next: Vec<u32>,
}

/// The probabilistic ordered map. `head` always lives at arena index `0`
/// and is never returned to callers.
pub struct SkipList {
    arena: Vec<Node>,
    max_level: usize,
    cur_level: usize,
    size_bytes: usize,
    rng: StdRng,
}

impl SkipList {
    pub fn new() -> Self {
        Self::with_max_level(DEFAULT_MAX_LEVEL)
    }

    pub fn with_max_level(max_level: usize) -> Self {
        assert!(max_level >= 1);
        let head = Node {
            key: Vec::new(),
            val: Vec::new(),
            trx_id: 0,
            next: vec![NIL; max_level],
        };
        Self {
            arena: vec![head],
            max_level,
            cur_level: 1,
            size_bytes: 0,
            // Seeded from a hardware-random source at construction.
            rng: StdRng::from_entropy(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn len(&self) -> usize {
        self.arena.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 1
    }

    pub(crate) fn node(&self, idx: u32) -> &Node {
        &self.arena[idx as usize]
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < self.max_level && self.rng.gen::<bool>() {
            level += 1;
        }
        level
    }

    /// Walks from `head`, filling `update[i]` with the last node at level
    /// `i` whose versioned key is strictly less than `(key, trx_id)`.
    fn search_update_path(&self, key: &[u8], trx_id: u64) -> Vec<u32> {
        let mut update = vec![0u32; self.max_level];
        let mut current = 0u32;
        for level in (0..self.cur_level).rev() {
            loop {
                let next = self.arena[current as usize].next[level];
                if next == NIL {
                    break;
                }
                let n = &self.arena[next as usize];
                if versioned_cmp(&n.key, n.trx_id, key, trx_id) == Ordering::Less {
                    current = next;
                } else {
                    break;
                }
            }
            update[level] = current;
        }
        update
    }

    /// Insert or replace.
    pub fn put(&mut self, key: &[u8], val: &[u8], trx_id: u64) {
        let update = self.search_update_path(key, trx_id);
        let candidate = self.arena[update[0] as usize].next[0];

        if candidate != NIL {
            let node = &self.arena[candidate as usize];
            if node.key == key && node.trx_id == trx_id {
                let old_len = node.val.len();
                self.arena[candidate as usize].val = val.to_vec();
                self.size_bytes = self.size_bytes + val.len() - old_len;
                return;
            }
        }

        let new_level = self.random_level();
        let mut update = update;
        if new_level > self.cur_level {
            for slot in update.iter_mut().take(new_level).skip(self.cur_level) {
                *slot = 0;
            }
            self.cur_level = new_level;
        }

        let new_idx = self.arena.len() as u32;
        let mut next = vec![NIL; new_level];
        for (level, slot) in next.iter_mut().enumerate() {
            *slot = self.arena[update[level] as usize].next[level];
        }
        self.arena.push(Node {
            key: key.to_vec(),
            val: val.to_vec(),
            trx_id,
            next,
        });
        for level in 0..new_level {
            self.arena[update[level] as usize].next[level] = new_idx;
        }
        self.size_bytes += key.len() + val.len() + std::mem::size_of::<u64>();
    }

    /// Point lookup under a snapshot `trx_id`. `trx_id == 0`
    /// means "latest version", which falls out for free from the
    /// newest-first secondary ordering.
    pub fn get(&self, key: &[u8], trx_id: u64) -> SkipListIterator<'_> {
        let mut current = 0u32;
        for level in (0..self.cur_level).rev() {
            loop {
                let next = self.arena[current as usize].next[level];
                if next == NIL || self.arena[next as usize].key.as_slice() >= key {
                    break;
                }
                current = next;
            }
        }
        let mut candidate = self.arena[current as usize].next[0];

        if trx_id == 0 {
            if candidate != NIL && self.arena[candidate as usize].key == key {
                return SkipListIterator::at(self, candidate);
            }
            return SkipListIterator::invalid();
        }

        while candidate != NIL && self.arena[candidate as usize].key == key {
            if self.arena[candidate as usize].trx_id <= trx_id {
                return SkipListIterator::at(self, candidate);
            }
            candidate = self.arena[candidate as usize].next[0];
        }
        SkipListIterator::invalid()
    }

    /// Physical removal of the node with `node.key == key`, ignoring
    /// `trx_id` (a low-level operation, never the MVCC tombstone
    /// path).
    pub fn remove(&mut self, key: &[u8]) {
        let mut update = vec![0u32; self.max_level];
        let mut current = 0u32;
        for level in (0..self.cur_level).rev() {
            loop {
                let next = self.arena[current as usize].next[level];
                if next == NIL || self.arena[next as usize].key.as_slice() >= key {
                    break;
                }
                current = next;
            }
            update[level] = current;
        }
        let target = self.arena[current as usize].next[0];
        if target == NIL || self.arena[target as usize].key.as_slice() != key {
            return;
        }
        let target_levels = self.arena[target as usize].next.len();
        for level in 0..target_levels {
            if self.arena[update[level] as usize].next[level] == target {
                self.arena[update[level] as usize].next[level] = self.arena[target as usize].next[level];
            }
        }
        let node = &self.arena[target as usize];
        self.size_bytes -= node.key.len() + node.val.len() + std::mem::size_of::<u64>();
        while self.cur_level > 1 && self.arena[0].next[self.cur_level - 1] == NIL {
            self.cur_level -= 1;
        }
    }

    /// Ascending `(key, val, trx_id)` snapshot, driving SSTable building
    /// (used to drive SSTable building).
    pub fn flush(&self) -> Vec<(Vec<u8>, Vec<u8>, u64)> {
        let mut out = Vec::with_capacity(self.len());
        let mut current = self.arena[0].next[0];
        while current != NIL {
            let node = &self.arena[current as usize];
            out.push((node.key.clone(), node.val.clone(), node.trx_id));
            current = node.next[0];
        }
        out
    }

    pub fn begin(&self) -> SkipListIterator<'_> {
        SkipListIterator::at(self, self.arena[0].next[0])
    }

    /// First key `>= prefix`.
    pub fn begin_prefix(&self, prefix: &[u8]) -> SkipListIterator<'_> {
        self.lower_bound(prefix)
    }

    /// First key whose prefix is no longer `prefix`.
    pub fn end_prefix(&self, prefix: &[u8]) -> SkipListIterator<'_> {
        let mut current = self.lower_bound_idx(prefix);
        while current != NIL && has_prefix(&self.arena[current as usize].key, prefix) {
            current = self.arena[current as usize].next[0];
        }
        SkipListIterator::at(self, current)
    }

    fn lower_bound_idx(&self, key: &[u8]) -> u32 {
        let mut current = 0u32;
        for level in (0..self.cur_level).rev() {
            loop {
                let next = self.arena[current as usize].next[level];
                if next == NIL || self.arena[next as usize].key.as_slice() >= key {
                    break;
                }
                current = next;
            }
        }
        self.arena[current as usize].next[0]
    }

    fn lower_bound(&self, key: &[u8]) -> SkipListIterator<'_> {
        SkipListIterator::at(self, self.lower_bound_idx(key))
    }

    /// Half-open range of keys where the monotone three-valued predicate
    /// `f` evaluates to zero.
    ///
    /// `f` must be monotone in the sense that the region where `f == 1`
    /// precedes the region `f == 0`, which precedes `f == -1`. The
    /// original's tail scan walks level indices beyond `cur_level`; this
    /// implementation descends `cur_level-1 ..= 0` for both the lower and
    /// upper search, which is the corrected bound.
    pub fn iters_monotony_predicate<F>(
        &self,
        f: F,
    ) -> Option<(SkipListIterator<'_>, SkipListIterator<'_>)>
    where
        F: Fn(&[u8]) -> i32,
    {
        let lower = self.boundary_idx(|k| f(k) > 0);
        if lower == NIL || f(&self.arena[lower as usize].key) != 0 {
            return None;
        }
        let upper = self.boundary_idx(|k| f(k) >= 0);
        Some((
            SkipListIterator::at(self, lower),
            SkipListIterator::at(self, upper),
        ))
    }

    /// Descends the skip list, advancing past any node whose key satisfies
    /// `keep_advancing`, and returns the arena index of the first node that
    /// doesn't (or `NIL` at the end of the list).
    fn boundary_idx<F>(&self, keep_advancing: F) -> u32
    where
        F: Fn(&[u8]) -> bool,
    {
        let mut current = 0u32;
        for level in (0..self.cur_level).rev() {
            loop {
                let next = self.arena[current as usize].next[level];
                if next == NIL || !keep_advancing(&self.arena[next as usize].key) {
                    break;
                }
                current = next;
            }
        }
        self.arena[current as usize].next[0]
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}
