//! Configuration consumed by the core.
//!
//! Plain, explicitly-constructed record - no hidden singleton. The
//! collaborator that owns config-file parsing builds one of these and
//! hands it down to [`crate::memtable::Memtable`] and
//! [`crate::block_cache::BlockCache`]; this crate never reads a file or an
//! env var itself.

/// Sizing knobs the core reads from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LsmCoreConfig {
    /// Total memtable budget in bytes (active + frozen). Default 64 MiB.
    pub sum_memtable_size: usize,
    /// Freeze threshold in bytes for the active index. Default 4 MiB.
    pub per_memtable_size: usize,
    /// Size ratio between SSTable levels; consumed by the compaction
    /// collaborator only, carried here because it ships in the same config
    /// block. Default 4.
    pub sst_level_ratio: usize,
    /// Default block capacity in bytes. Default 32 KiB.
    pub block_size: usize,
    /// Block cache capacity in items. Default 1024.
    pub block_cache_size: usize,
    /// K for the LRU-K cache eviction policy. Default 8.
    pub block_cache_lruk: usize,
    /// Whether the active index freezes by entry count (~10_000) instead of
    /// `per_memtable_size` bytes. Both forms are supported; byte-based is
    /// the default since it bounds memory directly.
    pub freeze_by_entry_count: bool,
}

/// Entry-count freeze threshold used when `freeze_by_entry_count` is set.
pub const DEFAULT_FREEZE_ENTRY_COUNT: usize = 10_000;

impl Default for LsmCoreConfig {
    fn default() -> Self {
        Self {
            sum_memtable_size: 64 * 1024 * 1024,
            per_memtable_size: 4 * 1024 * 1024,
            sst_level_ratio: 4,
            block_size: 32 * 1024,
            block_cache_size: 1024,
            block_cache_lruk: 8,
            freeze_by_entry_count: false,
        }
    }
}
