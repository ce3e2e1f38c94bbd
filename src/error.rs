use std::error::Error as StdError;
use std::fmt;

/// Errors raised synchronously by a misused or malformed filter.
///
/// `InsertionFailure` and `DeletionMiss` from the design are not part of
/// this enum: they are reported as plain `bool`s from `insert`/`delete`,
/// since a near-full filter or a missing element are expected outcomes,
/// not faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An out-of-range configuration value: bucket count, bucket capacity,
    /// fingerprint length, bits-per-cell, array length, target false
    /// positive rate, an out-of-bounds `BitArray` index, an unsatisfiable
    /// sizing request, a semi-sorted layout requested with the wrong
    /// (K, F), or a builder `build()` missing a required field.
    InvalidArgument(String),
    /// A serialized table blob is malformed: shorter than the 16-byte
    /// header, an unknown table type tag, or a body that isn't a whole
    /// number of 8-byte words.
    ParseError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::ParseError(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl StdError for Error {}
