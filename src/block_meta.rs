//! The per-block sparse index that lives at an SSTable's tail.
//!
//! `u32 offset | u16 len | bytes` records, checksummed as a whole, with
//! plain byte-range keys rather than a key wrapper that packs a timestamp
//! suffix into the key itself.

use bytes::{Buf, BufMut, Bytes};

use crate::error::{CoreError, Result};

const SIZEOF_U16: usize = std::mem::size_of::<u16>();
const SIZEOF_U32: usize = std::mem::size_of::<u32>();

/// One record per block: its byte offset within the SSTable file and the
/// inclusive range of keys it covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMeta {
    pub offset: u32,
    pub first_key: Vec<u8>,
    pub last_key: Vec<u8>,
}

/// Serializes `metas` as `entry_count | meta* | checksum`. An empty slice
/// still produces the 4-byte count plus 4-byte checksum.
pub fn encode_meta(metas: &[BlockMeta]) -> Bytes {
    let mut buf = Vec::new();
    buf.put_u32(metas.len() as u32);
    for meta in metas {
        buf.put_u32(meta.offset);
        buf.put_u16(meta.first_key.len() as u16);
        buf.put_slice(&meta.first_key);
        buf.put_u16(meta.last_key.len() as u16);
        buf.put_slice(&meta.last_key);
    }
    let checksum = crc32fast::hash(&buf);
    buf.put_u32(checksum);
    buf.into()
}

/// Parses a buffer produced by [`encode_meta`]. Fails with
/// `MetaDecodeError` if the buffer is shorter than 8 bytes, the checksum
/// doesn't match, or an entry's length prefix would run past the buffer.
pub fn decode_meta(bytes: &[u8]) -> Result<Vec<BlockMeta>> {
    if bytes.len() < SIZEOF_U32 * 2 {
        return Err(CoreError::MetaDecode {
            reason: "buffer shorter than header + checksum".into(),
        });
    }
    let split = bytes.len() - SIZEOF_U32;
    let expected = (&bytes[split..]).get_u32();
    let body = &bytes[..split];
    let actual = crc32fast::hash(body);
    if actual != expected {
        return Err(CoreError::MetaDecode {
            reason: "checksum mismatch".into(),
        });
    }

    let mut cursor = body;
    let entry_count = cursor.get_u32() as usize;
    let mut metas = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        if cursor.len() < SIZEOF_U32 + SIZEOF_U16 {
            return Err(CoreError::MetaDecode {
                reason: "meta entry extends past buffer".into(),
            });
        }
        let offset = cursor.get_u32();
        let fkey_len = cursor.get_u16() as usize;
        if cursor.len() < fkey_len + SIZEOF_U16 {
            return Err(CoreError::MetaDecode {
                reason: "first_key extends past buffer".into(),
            });
        }
        let first_key = cursor[..fkey_len].to_vec();
        cursor.advance(fkey_len);
        let lkey_len = cursor.get_u16() as usize;
        if cursor.len() < lkey_len {
            return Err(CoreError::MetaDecode {
                reason: "last_key extends past buffer".into(),
            });
        }
        let last_key = cursor[..lkey_len].to_vec();
        cursor.advance(lkey_len);
        metas.push(BlockMeta {
            offset,
            first_key,
            last_key,
        });
    }
    Ok(metas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let metas = vec![
            BlockMeta {
                offset: 0,
                first_key: b"apple".to_vec(),
                last_key: b"banana".to_vec(),
            },
            BlockMeta {
                offset: 4096,
                first_key: b"cherry".to_vec(),
                last_key: b"date".to_vec(),
            },
        ];
        let encoded = encode_meta(&metas);
        let decoded = decode_meta(&encoded).unwrap();
        assert_eq!(decoded, metas);
    }

    #[test]
    fn empty_vector_roundtrips() {
        let encoded = encode_meta(&[]);
        assert_eq!(encoded.len(), 8);
        assert_eq!(decode_meta(&encoded).unwrap(), Vec::new());
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let metas = vec![BlockMeta {
            offset: 1,
            first_key: b"a".to_vec(),
            last_key: b"z".to_vec(),
        }];
        let mut encoded = encode_meta(&metas).to_vec();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xff;
        assert!(matches!(decode_meta(&encoded), Err(CoreError::MetaDecode { .. })));
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(matches!(decode_meta(&[0u8; 4]), Err(CoreError::MetaDecode { .. })));
    }
}
