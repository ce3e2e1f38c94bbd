//! Pluggable 64-bit hash functions.
//!
//! The filter treats hashing as an external collaborator: it only needs
//! 64 bits of entropy per element and per fingerprint. `Murmur3Hash` is the
//! default, matching the literal scenarios in the design that name
//! `MURMUR3_128` as the reference entropy source. `FnvHash` and
//! `FarmHash` are optional, lighter-weight alternatives carried over from
//! the teacher crate's own optional `fnv`/`farmhash` dependencies, which it
//! benchmarked as alternate hashers for the same filter.

use std::io::Cursor;

/// Supplies 64 bits of hash entropy for an arbitrary byte string.
pub trait HashFunction {
    fn hash64(&self, bytes: &[u8]) -> u64;
}

/// MurmurHash3 x64/128, truncated to the low 64 bits.
#[derive(Debug, Clone, Copy)]
pub struct Murmur3Hash {
    seed: u32,
}

impl Murmur3Hash {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl Default for Murmur3Hash {
    fn default() -> Self {
        Self { seed: 0 }
    }
}

impl HashFunction for Murmur3Hash {
    fn hash64(&self, bytes: &[u8]) -> u64 {
        let mut cursor = Cursor::new(bytes);
        let h128 = murmur3::murmur3_x64_128(&mut cursor, self.seed)
            .expect("murmur3 hashing over an in-memory buffer cannot fail");
        h128 as u64
    }
}

/// FNV-1a, via the `fnv` crate's `Hasher` impl. Fast, not bit-mixing as
/// thoroughly as Murmur3 — fine for short keys where speed dominates.
#[cfg(feature = "fnv_hash")]
#[derive(Debug, Clone, Copy, Default)]
pub struct FnvHash;

#[cfg(feature = "fnv_hash")]
impl HashFunction for FnvHash {
    fn hash64(&self, bytes: &[u8]) -> u64 {
        use std::hash::Hasher;
        let mut hasher = fnv::FnvHasher::default();
        hasher.write(bytes);
        hasher.finish()
    }
}

/// Google's FarmHash, via the `farmhash` crate.
#[cfg(feature = "farmhash_hash")]
#[derive(Debug, Clone, Copy, Default)]
pub struct FarmHash;

#[cfg(feature = "farmhash_hash")]
impl HashFunction for FarmHash {
    fn hash64(&self, bytes: &[u8]) -> u64 {
        farmhash::fingerprint64(bytes)
    }
}
