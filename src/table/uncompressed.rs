//! One fingerprint per slot, stored at its natural bit width.

use rand::RngCore;

use crate::bit_array::BitArray;
use crate::error::Error;

use super::{write_header, Table, TableType};

fn validate_size(bucket_count: u32, bucket_capacity: u32, fingerprint_length: u32) -> Result<(), Error> {
    if bucket_count < 1 || (bucket_count as u64) >= (1u64 << 31) {
        return Err(Error::InvalidArgument("bucket_count must be in [1, 2^31)".into()));
    }
    if bucket_capacity < 1 || bucket_capacity > 128 {
        return Err(Error::InvalidArgument("bucket_capacity must be in [1, 128]".into()));
    }
    if fingerprint_length < 1 || fingerprint_length > 64 {
        return Err(Error::InvalidArgument("fingerprint_length must be in [1, 64]".into()));
    }
    Ok(())
}

/// Bucket table storing each fingerprint in its own `F`-bit cell.
#[derive(Clone, Debug)]
pub struct UncompressedTable {
    bits: BitArray,
    bucket_count: u32,
    bucket_capacity: u32,
    fingerprint_length: u32,
}

impl UncompressedTable {
    pub fn new(bucket_count: u32, bucket_capacity: u32, fingerprint_length: u32) -> Result<Self, Error> {
        validate_size(bucket_count, bucket_capacity, fingerprint_length)?;
        let cells = bucket_count as usize * bucket_capacity as usize;
        let bits = BitArray::new(cells, fingerprint_length)?;
        Ok(Self {
            bits,
            bucket_count,
            bucket_capacity,
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
        let cells = bucket_count as usize * bucket_capacity as usize;
        let bits = BitArray::from_bytes(cells, fingerprint_length, body)?;
        Ok(Self {
            bits,
            bucket_count,
            bucket_capacity,
            fingerprint_length,
        })
    }

    #[inline]
    fn cell_index(&self, bucket: u32, slot: u32) -> usize {
        bucket as usize * self.bucket_capacity as usize + slot as usize
    }
}

impl Table for UncompressedTable {
    fn insert_with_replacement(&mut self, bucket: u32, fp: u64, rng: &mut dyn RngCore) -> Option<u64> {
        for slot in 0..self.bucket_capacity {
            let idx = self.cell_index(bucket, slot);
            if self.bits.get(idx).unwrap() == 0 {
                self.bits.set(idx, fp).unwrap();
                return None;
            }
        }
        let victim = rng.next_u32() % self.bucket_capacity;
        let idx = self.cell_index(bucket, victim);
        let evicted = self.bits.get(idx).unwrap();
        self.bits.set(idx, fp).unwrap();
        Some(evicted)
    }

    fn contains(&self, bucket: u32, fp: u64) -> bool {
        (0..self.bucket_capacity).any(|slot| self.bits.get(self.cell_index(bucket, slot)).unwrap() == fp)
    }

    fn delete(&mut self, bucket: u32, fp: u64) -> bool {
        for slot in 0..self.bucket_capacity {
            let idx = self.cell_index(bucket, slot);
            if self.bits.get(idx).unwrap() == fp {
                self.bits.set(idx, 0).unwrap();
                return true;
            }
        }
        false
    }

    fn is_full(&self, bucket: u32) -> bool {
        (0..self.bucket_capacity).all(|slot| self.bits.get(self.cell_index(bucket, slot)).unwrap() != 0)
    }

    fn size(&self) -> (u32, u32, u32) {
        (self.bucket_count, self.bucket_capacity, self.fingerprint_length)
    }

    fn table_type(&self) -> TableType {
        TableType::Uncompressed
    }

    fn occupied_count(&self) -> u64 {
        (0..self.bits.len()).filter(|&i| self.bits.get(i).unwrap() != 0).count() as u64
    }

    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_header(
            &mut out,
            TableType::Uncompressed,
            self.bucket_count,
            self.bucket_capacity,
            self.fingerprint_length,
        );
        out.extend_from_slice(&self.bits.to_bytes());
        out
    }
}
