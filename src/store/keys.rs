//! Byte encodings for RocksDB keys.
//!
//! All encodings sort in the natural order of the values they encode so that
//! prefix scans return rows ordered by id or by timestamp.

use chrono::{DateTime, Utc};

use crate::model::{Id, PairKey};

/// Separator between string components of a key.
pub const SEP: u8 = 0;

/// Length of the `(timestamp, sequence)` suffix of event keys.
pub const EVENT_SUFFIX_LEN: usize = 16;

pub fn id_key(id: Id) -> [u8; 8] {
    id.to_be_bytes()
}

pub fn id_from_bytes(buf: &[u8]) -> Option<Id> {
    let bytes: [u8; 8] = buf.try_into().ok()?;
    Some(Id::from_be_bytes(bytes))
}

/// Prefix for an index keyed by a string value.
pub fn str_prefix(value: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(value.len() + 1);
    key.extend_from_slice(value.as_bytes());
    key.push(SEP);
    key
}

/// Prefix for an index keyed by a parent id.
pub fn id_prefix(id: Id) -> Vec<u8> {
    id_key(id).to_vec()
}

/// Full index key: the index prefix followed by the indexed row id.
pub fn index_key(prefix: &[u8], id: Id) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&id_key(id));
    key
}

/// Order-preserving encoding of a UTC timestamp at microsecond resolution.
pub fn timestamp_bytes(ts: &DateTime<Utc>) -> [u8; 8] {
    ((ts.timestamp_micros() as u64) ^ (1 << 63)).to_be_bytes()
}

/// Prefix shared by all events of a pair.
pub fn pair_prefix(key: &PairKey) -> Vec<u8> {
    let mut buf = str_prefix(&key.uniprot_acc);
    buf.extend_from_slice(&str_prefix(&key.enst_id));
    buf
}

/// Key of one event row; `seq` breaks ties between identical timestamps.
pub fn event_key(key: &PairKey, ts: &DateTime<Utc>, seq: u64) -> Vec<u8> {
    let mut buf = pair_prefix(key);
    buf.extend_from_slice(&timestamp_bytes(ts));
    buf.extend_from_slice(&seq.to_be_bytes());
    buf
}

/// Upper bound for all event keys of a pair.
pub fn pair_upper_bound(key: &PairKey) -> Vec<u8> {
    let mut buf = pair_prefix(key);
    buf.extend_from_slice(&[0xff; EVENT_SUFFIX_LEN]);
    buf
}

/// Key into the `cv` column family.
pub fn term_key(vocabulary: &str, code: i64) -> Vec<u8> {
    let mut buf = str_prefix(vocabulary);
    buf.extend_from_slice(&((code as u64) ^ (1 << 63)).to_be_bytes());
    buf
}
