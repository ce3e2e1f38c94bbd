//! Bucket-table abstraction: the shape every bucket layout must implement,
//! plus the shared self-describing binary format both layouts serialize to.

mod semisort;
mod uncompressed;

pub use semisort::SemiSortedTable;
pub use uncompressed::UncompressedTable;

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::RngCore;

use crate::error::Error;

/// Discriminant for the two bucket layouts, as written in the serialized
/// header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde_derive::Serialize, serde_derive::Deserialize))]
pub enum TableType {
    Uncompressed = 0,
    SemiSorted = 1,
}

impl TableType {
    fn from_i32(v: i32) -> Result<Self, Error> {
        match v {
            0 => Ok(TableType::Uncompressed),
            1 => Ok(TableType::SemiSorted),
            other => Err(Error::ParseError(format!("unknown table type tag {other}"))),
        }
    }
}

/// The bucket-array abstraction the filter drives: two interchangeable
/// layouts (uncompressed, semi-sorted) implement the same eviction,
/// membership, and deletion primitives over a shared `BitArray`.
pub trait Table {
    /// Inserts `fp` into bucket `bucket`. If an empty slot exists, fills it
    /// and returns `None`. Otherwise evicts a uniformly random occupant,
    /// writes `fp` in its place, and returns the evicted fingerprint.
    fn insert_with_replacement(&mut self, bucket: u32, fp: u64, rng: &mut dyn RngCore) -> Option<u64>;

    /// Linear scan of bucket `bucket`'s slots for `fp`.
    fn contains(&self, bucket: u32, fp: u64) -> bool;

    /// Removes the first slot in bucket `bucket` equal to `fp`, if any.
    fn delete(&mut self, bucket: u32, fp: u64) -> bool;

    /// True iff bucket `bucket` holds no empty slot.
    fn is_full(&self, bucket: u32) -> bool;

    /// Returns `(bucketCount, bucketCapacity, fingerprintLength)`.
    fn size(&self) -> (u32, u32, u32);

    /// The table layout tag, used by the shared serialization header.
    fn table_type(&self) -> TableType;

    /// Number of occupied (non-empty) slots across the whole table.
    fn occupied_count(&self) -> u64;

    /// Serializes the header and backing bit array into a self-describing
    /// byte blob (see the module-level format description).
    fn serialize(&self) -> Vec<u8>;
}

/// Writes the 16-byte, big-endian header shared by both table layouts.
pub(crate) fn write_header(buf: &mut Vec<u8>, table_type: TableType, b: u32, k: u32, f: u32) {
    buf.write_i32::<BigEndian>(table_type as i32).unwrap();
    buf.write_i32::<BigEndian>(b as i32).unwrap();
    buf.write_i32::<BigEndian>(k as i32).unwrap();
    buf.write_i32::<BigEndian>(f as i32).unwrap();
}

struct Header {
    table_type: TableType,
    bucket_count: u32,
    bucket_capacity: u32,
    fingerprint_length: u32,
}

fn read_header(bytes: &[u8]) -> Result<(Header, &[u8]), Error> {
    if bytes.len() <= 16 {
        return Err(Error::ParseError(format!(
            "serialized table must be > 16 bytes, found {}",
            bytes.len()
        )));
    }
    let mut cursor = Cursor::new(&bytes[0..16]);
    let table_type = TableType::from_i32(cursor.read_i32::<BigEndian>().unwrap())?;
    let bucket_count = cursor.read_i32::<BigEndian>().unwrap();
    let bucket_capacity = cursor.read_i32::<BigEndian>().unwrap();
    let fingerprint_length = cursor.read_i32::<BigEndian>().unwrap();

    if bucket_count < 1 || bucket_capacity < 1 || fingerprint_length < 1 {
        return Err(Error::ParseError(
            "header fields must be positive".into(),
        ));
    }

    let body = &bytes[16..];
    if body.len() % 8 != 0 {
        return Err(Error::ParseError(
            "table body is not a whole number of 8-byte words".into(),
        ));
    }

    Ok((
        Header {
            table_type,
            bucket_count: bucket_count as u32,
            bucket_capacity: bucket_capacity as u32,
            fingerprint_length: fingerprint_length as u32,
        },
        body,
    ))
}

/// Parses a serialized table blob and rebuilds the matching table
/// implementation. The caller is responsible for supplying a hash function,
/// strategy, and funnel behaviourally identical to the ones used when the
/// table was serialized; this module has no way to check that.
pub fn deserialize_table(bytes: &[u8]) -> Result<Box<dyn Table>, Error> {
    let (header, body) = read_header(bytes)?;
    match header.table_type {
        TableType::Uncompressed => Ok(Box::new(UncompressedTable::from_body(
            header.bucket_count,
            header.bucket_capacity,
            header.fingerprint_length,
            body,
        )?)),
        TableType::SemiSorted => Ok(Box::new(SemiSortedTable::from_body(
            header.bucket_count,
            header.bucket_capacity,
            header.fingerprint_length,
            body,
        )?)),
    }
}
