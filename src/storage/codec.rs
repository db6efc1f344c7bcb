//! Record Codec
//!
//! Encodes a shard's `table → id-sorted records` content, and the generic
//! checksummed frame shared with the catalog file.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{ElementalError, Result};
use crate::record::{Record, RecordId};

use super::ShardId;

// =============================================================================
// Frame Constants
// =============================================================================

/// Magic bytes identifying a shard file
pub(crate) const SHARD_MAGIC: &[u8; 4] = b"ELDS";

/// Magic bytes identifying the catalog file
pub(crate) const CATALOG_MAGIC: &[u8; 4] = b"ELDC";

/// Current frame format version
pub(crate) const FORMAT_VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + BodyLen (4) + BodyCRC (4) = 14 bytes
pub(crate) const HEADER_SIZE: usize = 14;

// =============================================================================
// Shard Content
// =============================================================================

/// Everything stored in one shard file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardData {
    /// Keyed by table name so tables sharing a shard never collide on ids
    pub tables: BTreeMap<String, TableData>,
}

/// One table's persisted records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// High-water mark: the next id to assign. Survives deletion of the
    /// highest record so ids are never reused.
    pub next_id: RecordId,

    /// Ascending by id
    pub records: Vec<Record>,
}

impl TableData {
    /// Position of `id`, if persisted
    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.binary_search_by_key(&id, |r| r.id).ok()
    }

    /// Insertion-sort `record` into place, walking back from the tail
    ///
    /// Fresh ids are always the largest, so the common case is an append.
    /// A record with an already-present id replaces it.
    pub fn insert_sorted(&mut self, record: Record) {
        let mut pos = self.records.len();
        while pos > 0 && self.records[pos - 1].id > record.id {
            pos -= 1;
        }
        if pos > 0 && self.records[pos - 1].id == record.id {
            self.records[pos - 1] = record;
        } else {
            self.records.insert(pos, record);
        }
    }

    fn is_sorted(&self) -> bool {
        self.records.windows(2).all(|w| w[0].id < w[1].id)
    }
}

// =============================================================================
// Frame Encoding/Decoding
// =============================================================================

/// Wrap `body` in a header carrying `magic`, version, length and CRC32
pub(crate) fn encode_frame(magic: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_slice(magic);
    buf.put_u16_le(FORMAT_VERSION);
    buf.put_u32_le(body.len() as u32);
    buf.put_u32_le(crc32fast::hash(body));
    buf.put_slice(body);
    buf.to_vec()
}

/// Validate a frame and return its body
pub(crate) fn decode_frame<'a>(
    magic: &[u8; 4],
    bytes: &'a [u8],
) -> std::result::Result<&'a [u8], String> {
    if bytes.len() < HEADER_SIZE {
        return Err(format!(
            "truncated header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        ));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let mut found = [0u8; 4];
    header.copy_to_slice(&mut found);
    if &found != magic {
        return Err(format!("invalid magic: expected {:?}, got {:?}", magic, found));
    }

    let version = header.get_u16_le();
    if version != FORMAT_VERSION {
        return Err(format!("unsupported format version: {}", version));
    }

    let body_len = header.get_u32_le() as usize;
    let expected_crc = header.get_u32_le();

    let body = &bytes[HEADER_SIZE..];
    if body.len() != body_len {
        return Err(format!(
            "body length mismatch: header says {}, file has {}",
            body_len,
            body.len()
        ));
    }

    let actual_crc = crc32fast::hash(body);
    if actual_crc != expected_crc {
        return Err(format!(
            "checksum mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        ));
    }

    Ok(body)
}

// =============================================================================
// Shard Encoding/Decoding
// =============================================================================

/// Serialize a shard to its on-disk bytes
pub fn encode_shard(data: &ShardData) -> Result<Vec<u8>> {
    let body = bincode::serialize(data)
        .map_err(|e| ElementalError::Serialization(format!("shard encode: {}", e)))?;
    Ok(encode_frame(SHARD_MAGIC, &body))
}

/// Deserialize a shard, reporting any failure as `CorruptShard`
pub fn decode_shard(shard: ShardId, bytes: &[u8]) -> Result<ShardData> {
    let corrupt = |reason: String| ElementalError::CorruptShard { shard, reason };

    let body = decode_frame(SHARD_MAGIC, bytes).map_err(corrupt)?;
    let data: ShardData =
        bincode::deserialize(body).map_err(|e| corrupt(format!("body decode: {}", e)))?;

    if let Some((name, _)) = data.tables.iter().find(|(_, t)| !t.is_sorted()) {
        return Err(corrupt(format!("records of table {} are not id-sorted", name)));
    }

    Ok(data)
}
