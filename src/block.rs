//! The sorted, immutable, checksummed unit that backs an SSTable.
//!
//! Grounded in `original_source/src/block/block.{h,cpp}`: the wire format
//! here carries the `trx_id` per entry and is not prefix-compressed, so
//! `Block` owns both the append path (`add_entry`) and the read path
//! (`get_val_binary`, `get_monotony_predicate_iters`) directly, mirroring
//! the original's single `Block` class.

pub mod iterator;

use bytes::{Buf, BufMut, Bytes};

use crate::error::{CoreError, Result};

pub use iterator::BlockIterator;

const SIZEOF_U16: usize = std::mem::size_of::<u16>();
const SIZEOF_U32: usize = std::mem::size_of::<u32>();
const SIZEOF_U64: usize = std::mem::size_of::<u64>();

struct Entry {
    key: Vec<u8>,
    val: Vec<u8>,
    trx_id: u64,
}

/// An append-only sorted buffer of `(key, val, trx_id)` entries. Entries
/// must be appended in non-decreasing `key` order with newest-first
/// `trx_id` among equal keys; the block itself never re-sorts.
pub struct Block {
    entries: Vec<Entry>,
    offsets: Vec<u16>,
    data: Vec<u8>,
    capacity: usize,
}

impl Block {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            offsets: Vec::new(),
            data: Vec::new(),
            capacity,
        }
    }

    fn current_size(&self) -> usize {
        self.data.len() + self.offsets.len() * SIZEOF_U16 + SIZEOF_U16
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Appends one entry, returning `false` (without mutating the block)
    /// if it would not fit under `capacity` and `force_write` is not set.
    /// The very first entry is always admitted.
    pub fn add_entry(&mut self, key: &[u8], val: &[u8], trx_id: u64, force_write: bool) -> bool {
        let entry_size = SIZEOF_U16 + key.len() + SIZEOF_U16 + val.len() + SIZEOF_U64;
        if !force_write && !self.is_empty() && self.current_size() + entry_size > self.capacity {
            return false;
        }
        self.offsets.push(self.data.len() as u16);
        self.data.put_u16(key.len() as u16);
        self.data.put(key);
        self.data.put_u16(val.len() as u16);
        self.data.put(val);
        self.data.put_u64(trx_id);
        self.entries.push(Entry {
            key: key.to_vec(),
            val: val.to_vec(),
            trx_id,
        });
        true
    }

    /// First key in the block, without re-decoding `data` (used by the
    /// SSTable builder to populate `BlockMeta::first_key`).
    pub fn get_first_key(&self) -> Option<&[u8]> {
        self.entries.first().map(|e| e.key.as_slice())
    }

    pub fn last_key(&self) -> Option<&[u8]> {
        self.entries.last().map(|e| e.key.as_slice())
    }

    /// Serializes per the wire layout: `data | offsets | entry_count
    /// [| checksum]`. The checksum, when present, covers every byte
    /// preceding it.
    pub fn encode(&self, with_hash: bool) -> Bytes {
        let mut buf = self.data.clone();
        for offset in &self.offsets {
            buf.put_u16(*offset);
        }
        buf.put_u16(self.offsets.len() as u16);
        if with_hash {
            let checksum = crc32fast::hash(&buf);
            buf.put_u32(checksum);
        }
        buf.into()
    }

    /// Parses a block previously produced by [`Block::encode`]. Fails with
    /// `BlockDecodeError` if the buffer is too small, a checksum is
    /// present and doesn't match, or an entry's length prefix would run
    /// past the buffer.
    pub fn decode(bytes: &[u8], with_hash: bool) -> Result<Self> {
        let mut body = bytes;
        if with_hash {
            if body.len() < SIZEOF_U32 {
                return Err(CoreError::BlockDecode {
                    reason: "buffer too small for checksum".into(),
                });
            }
            let split = body.len() - SIZEOF_U32;
            let expected = (&body[split..]).get_u32();
            body = &body[..split];
            let actual = crc32fast::hash(body);
            if actual != expected {
                return Err(CoreError::BlockDecode {
                    reason: "checksum mismatch".into(),
                });
            }
        }

        if body.len() < SIZEOF_U16 {
            return Err(CoreError::BlockDecode {
                reason: "buffer too small for entry_count".into(),
            });
        }
        let entry_count = (&body[body.len() - SIZEOF_U16..]).get_u16() as usize;
        let offsets_len = entry_count * SIZEOF_U16;
        if body.len() < SIZEOF_U16 + offsets_len {
            return Err(CoreError::BlockDecode {
                reason: "buffer too small for offsets".into(),
            });
        }
        let data_end = body.len() - SIZEOF_U16 - offsets_len;
        let offsets_raw = &body[data_end..body.len() - SIZEOF_U16];
        let offsets: Vec<u16> = offsets_raw.chunks(SIZEOF_U16).map(|mut c| c.get_u16()).collect();
        let data = body[..data_end].to_vec();

        let mut entries = Vec::with_capacity(entry_count);
        for &offset in &offsets {
            let mut cursor = &data[offset as usize..];
            if cursor.len() < SIZEOF_U16 {
                return Err(CoreError::BlockDecode {
                    reason: "entry key_len extends past buffer".into(),
                });
            }
            let key_len = cursor.get_u16() as usize;
            if cursor.len() < key_len + SIZEOF_U16 {
                return Err(CoreError::BlockDecode {
                    reason: "entry key extends past buffer".into(),
                });
            }
            let key = cursor[..key_len].to_vec();
            cursor.advance(key_len);
            let val_len = cursor.get_u16() as usize;
            if cursor.len() < val_len + SIZEOF_U64 {
                return Err(CoreError::BlockDecode {
                    reason: "entry val/trx_id extends past buffer".into(),
                });
            }
            let val = cursor[..val_len].to_vec();
            cursor.advance(val_len);
            let trx_id = cursor.get_u64();
            entries.push(Entry { key, val, trx_id });
        }

        let capacity = data.len().max(1);
        Ok(Self {
            entries,
            offsets,
            data,
            capacity,
        })
    }

    fn lower_bound(&self, key: &[u8]) -> usize {
        self.entries.partition_point(|e| e.key.as_slice() < key)
    }

    /// `adjust_idx_by_trx_id`: given binary search landed on the leftmost
    /// entry matching `key` at `start`, walk to the entry whose `trx_id`
    /// is the largest value `<= trx_id` (or the newest version when
    /// `trx_id == 0`). Entries sharing a key are stored newest-first, so
    /// `start` is already the answer for `trx_id == 0`.
    fn adjust_idx_by_trx_id(&self, key: &[u8], start: usize, trx_id: u64) -> Option<usize> {
        if start >= self.entries.len() || self.entries[start].key.as_slice() != key {
            return None;
        }
        if trx_id == 0 {
            return Some(start);
        }
        let mut idx = start;
        while idx < self.entries.len() && self.entries[idx].key.as_slice() == key {
            if self.entries[idx].trx_id <= trx_id {
                return Some(idx);
            }
            idx += 1;
        }
        None
    }

    /// Binary search on `key`, resolving the matching version via
    /// `adjust_idx_by_trx_id`.
    pub fn get_val_binary(&self, key: &[u8], trx_id: u64) -> Option<&[u8]> {
        let start = self.lower_bound(key);
        let idx = self.adjust_idx_by_trx_id(key, start, trx_id)?;
        Some(self.entries[idx].val.as_slice())
    }

    /// Two binary searches locate the plateau where the monotone
    /// three-valued predicate `f` evaluates to zero; returns the
    /// inclusive-exclusive `[begin, end)` index range, or `None` if empty.
    fn monotony_range<F>(&self, f: F) -> Option<(usize, usize)>
    where
        F: Fn(&[u8]) -> i32,
    {
        let begin = self.entries.partition_point(|e| f(&e.key) > 0);
        if begin >= self.entries.len() || f(&self.entries[begin].key) != 0 {
            return None;
        }
        let end = self.entries.partition_point(|e| f(&e.key) >= 0);
        Some((begin, end))
    }

    pub fn get_monotony_predicate_iters<F>(
        &self,
        trx_id: u64,
        f: F,
    ) -> Option<(BlockIterator<'_>, BlockIterator<'_>)>
    where
        F: Fn(&[u8]) -> i32,
    {
        let (begin, end) = self.monotony_range(f)?;
        Some((
            BlockIterator::at(self, begin, trx_id),
            BlockIterator::at(self, end, trx_id),
        ))
    }

    pub(crate) fn entry_at(&self, idx: usize) -> Option<(&[u8], &[u8], u64)> {
        self.entries.get(idx).map(|e| (e.key.as_slice(), e.val.as_slice(), e.trx_id))
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn begin(&self, trx_id: u64) -> BlockIterator<'_> {
        BlockIterator::at(self, 0, trx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(entries: &[(&[u8], &[u8], u64)], capacity: usize) -> Block {
        let mut block = Block::new(capacity);
        for (k, v, t) in entries {
            assert!(block.add_entry(k, v, *t, false));
        }
        block
    }

    #[test]
    fn basic_roundtrip_and_versioned_get() {
        let block = build(
            &[
                (b"apple", b"red", 1),
                (b"banana", b"yellow", 2),
                (b"orange", b"orange3", 3),
                (b"orange", b"orange2", 2),
                (b"orange", b"orange1", 1),
            ],
            1024,
        );
        for with_hash in [true, false] {
            let encoded = block.encode(with_hash);
            let decoded = Block::decode(&encoded, with_hash).unwrap();
            assert_eq!(decoded.get_val_binary(b"orange", 3), Some(b"orange3".as_ref()));
            assert_eq!(decoded.get_val_binary(b"orange", 2), Some(b"orange2".as_ref()));
            assert_eq!(decoded.get_val_binary(b"orange", 1), Some(b"orange1".as_ref()));
            assert_eq!(decoded.get_val_binary(b"orange", 0), Some(b"orange3".as_ref()));
        }
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let block = build(&[(b"k", b"v", 1)], 1024);
        let mut encoded = block.encode(true).to_vec();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xff;
        assert!(matches!(
            Block::decode(&encoded, true),
            Err(CoreError::BlockDecode { .. })
        ));
    }

    #[test]
    fn capacity_is_enforced_but_first_entry_always_admitted() {
        let mut block = Block::new(8);
        assert!(block.add_entry(b"oversized-key", b"oversized-value", 1, false));
        assert!(!block.add_entry(b"k2", b"v2", 1, false));
        assert!(block.add_entry(b"k2", b"v2", 1, true));
    }

    #[test]
    fn predicate_scan_returns_inclusive_exclusive_range() {
        let mut block = Block::new(1 << 20);
        for i in 0..50 {
            let key = format!("key{i:04}");
            let val = format!("val{i:04}");
            block.add_entry(key.as_bytes(), val.as_bytes(), 0, false);
        }
        let f = |k: &[u8]| -> i32 {
            if k < b"key0020".as_ref() {
                1
            } else if k >= b"key0030".as_ref() {
                -1
            } else {
                0
            }
        };
        let (begin, end) = block.monotony_range(f).unwrap();
        assert_eq!(block.entries[begin].key, b"key0020");
        assert_eq!(block.entries[end - 1].key, b"key0029");
    }

    #[test]
    fn missing_key_returns_none() {
        let block = build(&[(b"a", b"1", 1), (b"c", b"3", 1)], 1024);
        assert_eq!(block.get_val_binary(b"b", 0), None);
    }
}
