//! Four-fingerprint buckets, semi-sorted: the bucket's low nibbles are
//! dictionary-compressed, saving one bit per slot over the uncompressed
//! layout. See the module-level design notes for the encoding.

use std::sync::OnceLock;

use rand::RngCore;

use crate::bit_array::BitArray;
use crate::error::Error;

use super::{write_header, Table, TableType};

const BUCKET_CAPACITY: u32 = 4;
const ENUM_SIZE: usize = 3876;

/// `(forward, inverse)`: `forward[idx]` is the 12-bit sorted-nibble tag for
/// index `idx`; `inverse[tag]` is the index for a given (already sorted)
/// tag. Built once, lazily, since it never depends on any particular
/// filter instance.
fn enumeration() -> &'static (Vec<u16>, Vec<u16>) {
    static TABLE: OnceLock<(Vec<u16>, Vec<u16>)> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut forward = Vec::with_capacity(ENUM_SIZE);
        let mut inverse = vec![0u16; 1 << 16];
        for a in 0..16u16 {
            for b in a..16u16 {
                for c in b..16u16 {
                    for d in c..16u16 {
                        let tag = (a << 12) | (b << 8) | (c << 4) | d;
                        inverse[tag as usize] = forward.len() as u16;
                        forward.push(tag);
                    }
                }
            }
        }
        debug_assert_eq!(forward.len(), ENUM_SIZE);
        (forward, inverse)
    })
}

fn validate_size(bucket_count: u32, bucket_capacity: u32, fingerprint_length: u32) -> Result<(), Error> {
    if bucket_count < 1 || (bucket_count as u64) >= (1u64 << 31) {
        return Err(Error::InvalidArgument("bucket_count must be in [1, 2^31)".into()));
    }
    if bucket_capacity != BUCKET_CAPACITY {
        return Err(Error::InvalidArgument(
            "semi-sorted layout requires bucket_capacity == 4".into(),
        ));
    }
    if fingerprint_length < 4 || fingerprint_length > 64 {
        return Err(Error::InvalidArgument(
            "semi-sorted layout requires fingerprint_length >= 4".into(),
        ));
    }
    Ok(())
}

/// Bucket table storing 4 fingerprints per bucket as a sorted multiset:
/// the low nibble of each fingerprint is dictionary-compressed into a
/// shared 12-bit tag, cutting one bit off every slot's storage width.
#[derive(Clone, Debug)]
pub struct SemiSortedTable {
    bits: BitArray,
    bucket_count: u32,
    fingerprint_length: u32,
}

impl SemiSortedTable {
    pub fn new(bucket_count: u32, bucket_capacity: u32, fingerprint_length: u32) -> Result<Self, Error> {
        validate_size(bucket_count, bucket_capacity, fingerprint_length)?;
        let cells = bucket_count as usize * BUCKET_CAPACITY as usize;
        let bits = BitArray::new(cells, fingerprint_length - 1)?;
        Ok(Self {
            bits,
            bucket_count,
            fingerprint_length,
        })
    }

    pub(crate) fn from_body(
        bucket_count: u32,
        bucket_capacity: u32,
        fingerprint_length: u32,
        body: &[u8],
    ) -> Result<Self, Error> {
        validate_size(bucket_count, bucket_capacity, fingerprint_length)?;
        let cells = bucket_count as usize * BUCKET_CAPACITY as usize;
        let bits = BitArray::from_bytes(cells, fingerprint_length - 1, body)?;
        Ok(Self {
            bits,
            bucket_count,
            fingerprint_length,
        })
    }

    #[inline]
    fn cell_index(&self, bucket: u32, slot: u32) -> usize {
        bucket as usize * BUCKET_CAPACITY as usize + slot as usize
    }

    fn decode_bucket(&self, bucket: u32) -> [u64; 4] {
        let mut cells = [0u64; 4];
        for slot in 0..4 {
            cells[slot as usize] = self.bits.get(self.cell_index(bucket, slot)).unwrap();
        }

        let idx = ((cells[3] & 0b111) << 9)
            | ((cells[2] & 0b111) << 6)
            | ((cells[1] & 0b111) << 3)
            | (cells[0] & 0b111);
        let tag = enumeration().0[idx as usize] as u64;
        let nibbles = [(tag >> 12) & 0xF, (tag >> 8) & 0xF, (tag >> 4) & 0xF, tag & 0xF];

        let mut fps = [0u64; 4];
        for i in 0..4 {
            let high = cells[i] >> 3;
            fps[i] = (high << 4) | nibbles[i];
        }
        fps
    }

    fn encode_bucket(&mut self, bucket: u32, fps: [u64; 4]) {
        let mut parts: [(u64, u64); 4] = fps.map(|fp| (fp >> 4, fp & 0xF));
        parts.sort_by_key(|&(_, low)| low);

        let tag = (parts[0].1 << 12) | (parts[1].1 << 8) | (parts[2].1 << 4) | parts[3].1;
        let idx = enumeration().1[tag as usize] as u64;

        for i in 0..4 {
            let chunk = (idx >> (3 * i)) & 0b111;
            let cell = (parts[i].0 << 3) | chunk;
            self.bits.set(self.cell_index(bucket, i as u32), cell).unwrap();
        }
    }
}

impl Table for SemiSortedTable {
    fn insert_with_replacement(&mut self, bucket: u32, fp: u64, rng: &mut dyn RngCore) -> Option<u64> {
        let mut fps = self.decode_bucket(bucket);
        if let Some(slot) = fps.iter().position(|&f| f == 0) {
            fps[slot] = fp;
            self.encode_bucket(bucket, fps);
            None
        } else {
            let slot = (rng.next_u32() % 4) as usize;
            let evicted = fps[slot];
            fps[slot] = fp;
            self.encode_bucket(bucket, fps);
            Some(evicted)
        }
    }

    fn contains(&self, bucket: u32, fp: u64) -> bool {
        self.decode_bucket(bucket).contains(&fp)
    }

    fn delete(&mut self, bucket: u32, fp: u64) -> bool {
        let mut fps = self.decode_bucket(bucket);
        if let Some(slot) = fps.iter().position(|&f| f == fp) {
            fps[slot] = 0;
            self.encode_bucket(bucket, fps);
            true
        } else {
            false
        }
    }

    fn is_full(&self, bucket: u32) -> bool {
        self.decode_bucket(bucket).iter().all(|&f| f != 0)
    }

    fn size(&self) -> (u32, u32, u32) {
        (self.bucket_count, BUCKET_CAPACITY, self.fingerprint_length)
    }

    fn table_type(&self) -> TableType {
        TableType::SemiSorted
    }

    fn occupied_count(&self) -> u64 {
        (0..self.bucket_count)
            .map(|b| self.decode_bucket(b).iter().filter(|&&f| f != 0).count() as u64)
            .sum()
    }

    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(
            &mut out,
            TableType::SemiSorted,
            self.bucket_count,
            BUCKET_CAPACITY,
            self.fingerprint_length,
        );
        out.extend_from_slice(&self.bits.to_bytes());
        out
    }
}
