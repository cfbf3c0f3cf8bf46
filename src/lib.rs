//! Core, in-memory half of an LSM-tree key-value store: the ordered
//! versioned index, the memtable built on top of it, the block format
//! that backs SSTables on disk, and the block cache that serves them back.
//!
//! MVCC is threaded through every read path as a client-assigned,
//! monotonically increasing `trx_id`: `put`/`remove` stamp each write with
//! one, and every read takes a snapshot `trx_id` (`0` meaning "latest").
//! The SSTable reader/writer, write-ahead log, compactor, and
//! configuration-file loader that sit around this core are out of scope
//! here; they consume what this crate exposes.

pub mod block;
pub mod block_cache;
pub mod block_meta;
pub mod config;
pub mod error;
pub mod iterator;
pub mod key;
pub mod memtable;
pub mod skiplist;

pub use block::Block;
pub use block_cache::BlockCache;
pub use block_meta::{decode_meta, encode_meta, BlockMeta};
pub use config::LsmCoreConfig;
pub use error::{CoreError, Result};
pub use iterator::{IteratorKind, VersionedCursor};
pub use memtable::{Memtable, MemtableEntry};
pub use skiplist::SkipList;
