//! Dense storage of `N` fixed-width cells packed into 64-bit words.
//!
//! A cell is any value of `1..=64` bits. Cell `i` occupies the bit range
//! `[i*W, (i+1)*W)` of the backing word sequence and may straddle a single
//! word boundary, but never more than one.

use crate::error::Error;

const MAX_CELLS: u64 = (1u64 << 31) * 64;

#[inline]
fn mask(bits: u32) -> u64 {
    if bits == 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// A packed array of `length` cells, each `bits_per_element` bits wide.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde_derive::Serialize, serde_derive::Deserialize))]
pub struct BitArray {
    words: Vec<u64>,
    length: usize,
    bits_per_element: u32,
}

impl BitArray {
    /// Allocates a zeroed array of `length` cells of `bits_per_element` bits.
    pub fn new(length: usize, bits_per_element: u32) -> Result<Self, Error> {
        if length == 0 {
            return Err(Error::InvalidArgument("BitArray length must be > 0".into()));
        }
        if (length as u64) >= MAX_CELLS {
            return Err(Error::InvalidArgument("BitArray length too large".into()));
        }
        if bits_per_element == 0 || bits_per_element > 64 {
            return Err(Error::InvalidArgument(
                "bits_per_element must be in 1..=64".into(),
            ));
        }

        let total_bits = (length as u128) * (bits_per_element as u128);
        let word_count = ((total_bits + 63) / 64) as u128;
        if word_count > i32::MAX as u128 {
            return Err(Error::InvalidArgument(
                "BitArray word count exceeds a 32-bit index".into(),
            ));
        }

        Ok(Self {
            words: vec![0u64; word_count as usize],
            length,
            bits_per_element,
        })
    }

    /// Rebuilds a `BitArray` from a previously exported byte buffer.
    ///
    /// `bytes.len()` must equal exactly the word count implied by
    /// `length` and `bits_per_element`.
    pub fn from_bytes(length: usize, bits_per_element: u32, bytes: &[u8]) -> Result<Self, Error> {
        let array = Self::new(length, bits_per_element)?;
        if bytes.len() != array.words.len() * 8 {
            return Err(Error::ParseError(format!(
                "expected {} bytes, found {}",
                array.words.len() * 8,
                bytes.len()
            )));
        }

        let words = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                u64::from_le_bytes(buf)
            })
            .collect();

        Ok(Self {
            words,
            length,
            bits_per_element,
        })
    }

    /// Number of logical cells.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether this array has zero cells (never true for a constructed array).
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Width in bits of every cell.
    pub fn bits_per_element(&self) -> u32 {
        self.bits_per_element
    }

    fn check_index(&self, i: usize) -> Result<(), Error> {
        if i >= self.length {
            return Err(Error::InvalidArgument(format!(
                "index {} out of bounds for length {}",
                i, self.length
            )));
        }
        Ok(())
    }

    /// Reads the cell at `i` into the low `bits_per_element` bits of the result.
    pub fn get(&self, i: usize) -> Result<u64, Error> {
        self.check_index(i)?;
        let w = self.bits_per_element;
        let bit_start = i * w as usize;
        let bit_end = bit_start + w as usize;
        let word1 = bit_start / 64;
        let word2 = (bit_end - 1) / 64;

        if word1 == word2 {
            let shift = bit_start % 64;
            Ok((self.words[word1] >> shift) & mask(w))
        } else {
            let shift = bit_start % 64;
            let low_width = 64 - shift as u32;
            let high_width = w - low_width;
            let low = self.words[word1] >> shift;
            let high = self.words[word2] & mask(high_width);
            Ok(low | (high << low_width))
        }
    }

    /// Writes the low `bits_per_element` bits of `v` into cell `i`.
    pub fn set(&mut self, i: usize, v: u64) -> Result<(), Error> {
        self.check_index(i)?;
        let w = self.bits_per_element;
        let v = v & mask(w);
        let bit_start = i * w as usize;
        let bit_end = bit_start + w as usize;
        let word1 = bit_start / 64;
        let word2 = (bit_end - 1) / 64;

        if word1 == word2 {
            let shift = bit_start % 64;
            self.words[word1] = (self.words[word1] & !(mask(w) << shift)) | (v << shift);
        } else {
            let shift = bit_start % 64;
            let low_width = 64 - shift as u32;
            let high_width = w - low_width;
            self.words[word1] = (self.words[word1] & !(mask(low_width) << shift)) | (v << shift);
            self.words[word2] =
                (self.words[word2] & !mask(high_width)) | ((v >> low_width) & mask(high_width));
        }
        Ok(())
    }

    /// Emits the backing words as little-endian bytes, 8 per word.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.words.len() * 8);
        for word in &self.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Number of 64-bit words backing this array.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}
