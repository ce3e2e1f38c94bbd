//! A cuckoo filter: a space-efficient approximate-membership-query
//! structure supporting insertion, membership queries, and deletion, with
//! no false negatives.
//!
//! ```
//! use cuckoofilter_rs::{CuckooFilterBuilder, funnel::U64Funnel};
//!
//! let mut filter = CuckooFilterBuilder::new()
//!     .capacity(10_000)
//!     .target_fpr(0.01)
//!     .funnel(U64Funnel)
//!     .build()
//!     .unwrap();
//!
//! filter.insert(&42u64);
//! assert!(filter.contains(&42u64));
//! assert!(!filter.contains(&43u64));
//! ```

pub mod bit_array;
pub mod error;
pub mod filter;
pub mod funnel;
pub mod hash;
pub mod sizing;
pub mod strategy;
pub mod table;

pub use bit_array::BitArray;
pub use error::Error;
pub use filter::{CuckooFilter, CuckooFilterBuilder};
pub use funnel::Funnel;
pub use hash::{HashFunction, Murmur3Hash};
#[cfg(feature = "farmhash_hash")]
pub use hash::FarmHash;
#[cfg(feature = "fnv_hash")]
pub use hash::FnvHash;
pub use strategy::{SimpleModStrategy, Strategy, UniformStrategy};
pub use table::{Table, TableType};
