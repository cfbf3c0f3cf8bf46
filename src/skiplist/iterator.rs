use crate::error::Result;
use crate::iterator::{out_of_range, IteratorKind, VersionedCursor};

use super::{SkipList, NIL};

/// A forward cursor into a [`SkipList`], positioned at a single node.
///
/// Mirrors `original_source/src/skiplist/skiplist_iterator.h`: an invalid
/// iterator carries no list reference at all rather than a dangling index,
/// so `is_end()`/`is_valid()` never need to dereference the arena.
pub struct SkipListIterator<'a> {
    list: Option<&'a SkipList>,
    idx: u32,
}

impl<'a> SkipListIterator<'a> {
    pub(super) fn at(list: &'a SkipList, idx: u32) -> Self {
        if idx == NIL {
            Self::invalid()
        } else {
            Self {
                list: Some(list),
                idx,
            }
        }
    }

    pub fn invalid() -> Self {
        Self {
            list: None,
            idx: NIL,
        }
    }

    pub fn key(&self) -> &'a [u8] {
        self.list.expect("valid iterator").node(self.idx).key.as_slice()
    }

    pub fn val(&self) -> &'a [u8] {
        self.list.expect("valid iterator").node(self.idx).val.as_slice()
    }

    pub fn trx_id(&self) -> u64 {
        self.list.expect("valid iterator").node(self.idx).trx_id
    }
}

impl<'a> Iterator for SkipListIterator<'a> {
    type Item = (&'a [u8], &'a [u8], u64);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.is_valid() {
            return None;
        }
        let list = self.list.unwrap();
        let node = list.node(self.idx);
        let item = (node.key.as_slice(), node.val.as_slice(), node.trx_id);
        self.idx = node.next[0];
        if self.idx == NIL {
            self.list = None;
        }
        Some(item)
    }
}

impl<'a> VersionedCursor for SkipListIterator<'a> {
    fn advance(&mut self) {
        let _ = self.next();
    }

    fn is_end(&self) -> bool {
        self.list.is_none()
    }

    fn iterator_kind(&self) -> IteratorKind {
        IteratorKind::SkipList
    }

    fn current(&self) -> Result<(&[u8], &[u8])> {
        if self.is_end() {
            return Err(out_of_range());
        }
        Ok((self.key(), self.val()))
    }
}

impl<'a> PartialEq for SkipListIterator<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self.list, other.list) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::eq(a, b) && self.idx == other.idx,
            _ => false,
        }
    }
}

impl<'a> Eq for SkipListIterator<'a> {}
