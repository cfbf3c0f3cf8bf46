//! Common iterator protocol shared by the skip list, block, and memtable
//! cursors.
//!
//! The original C++ expresses this as a `BaseIterator` abstract class
//! with a tagged `IteratorType` enum used only for cross-kind comparisons
//! (`original_source/src/iterator/iterator.h`). This crate keeps an
//! equivalent trait-based shape but avoids runtime downcasting: comparing
//! two cursors of different concrete kinds is a `dyn`-level helper, not a
//! blanket `PartialEq` impl, so two concrete cursor types never need to
//! know about each other.

use crate::error::{CoreError, Result};

/// Tag identifying the concrete cursor behind a `dyn VersionedCursor`.
/// Used only to decide "same kind or not" for cross-kind comparisons -
/// never for downcasting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IteratorKind {
    SkipList,
    Block,
    Memtable,
}

/// A forward, single-pass cursor yielding `(key, val)` pairs.
///
/// Iterators are not restartable: once advanced past an item there is no
/// way back. Dereferencing an iterator that `is_end()` or otherwise
/// `!is_valid()` is an error (`IteratorOutOfRange`), never a panic.
pub trait VersionedCursor {
    fn advance(&mut self);
    fn is_end(&self) -> bool;
    fn is_valid(&self) -> bool {
        !self.is_end()
    }
    fn iterator_kind(&self) -> IteratorKind;
    fn current(&self) -> Result<(&[u8], &[u8])>;
}

/// Cross-kind equality: iterators of different concrete kinds are defined
/// as "not equal" rather than raising `IteratorKindMismatch`. Same-kind
/// comparison falls back to validity + current key/val.
pub fn cursors_equal(a: &dyn VersionedCursor, b: &dyn VersionedCursor) -> bool {
    if a.iterator_kind() != b.iterator_kind() {
        return false;
    }
    match (a.is_valid(), b.is_valid()) {
        (false, false) => true,
        (false, true) | (true, false) => false,
        (true, true) => a.current().ok() == b.current().ok(),
    }
}

/// Helper asserting the precondition explicitly; returns the
/// `IteratorKindMismatch` error value rather than panicking, for callers
/// that want to fail loudly on a kind mismatch instead of silently getting
/// `false` from [`cursors_equal`].
pub fn assert_same_kind(a: &dyn VersionedCursor, b: &dyn VersionedCursor) -> Result<()> {
    if a.iterator_kind() != b.iterator_kind() {
        return Err(CoreError::IteratorKindMismatch);
    }
    Ok(())
}

pub(crate) fn out_of_range() -> CoreError {
    CoreError::IteratorOutOfRange
}
