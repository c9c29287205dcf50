//! Error types shared by every operation.

use std::io;
use thiserror::Error;

/// Why a single line failed to parse.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("line exceeds the maximum entry length")]
    LineTooLong,

    #[error("malformed dotted-quad address")]
    MalformedAddress,

    #[error("octet out of range (must be 0-255)")]
    OctetOutOfRange,

    #[error("malformed prefix length")]
    MalformedMask,

    #[error("prefix length out of range")]
    MaskOutOfRange,

    #[error("malformed address range")]
    MalformedRange,

    #[error("range end precedes range start")]
    ReversedRange,
}

/// A prefix length outside `0..=32` reached the bit utilities.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid prefix length /{0}")]
pub struct InvalidMask(pub u8);

/// Errors returned by the public operations.
#[derive(Error, Debug)]
pub enum IpListError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid entry at line {line}: {reason}")]
    InvalidEntry { line: usize, reason: ParseError },

    #[error("invalid entry at line {line}: range overlaps the range at line {previous}")]
    OverlappingRange { line: usize, previous: usize },

    #[error("invalid entry: ranges expand to {requested} records, which cannot be allocated")]
    TooManyRecords { requested: u64 },

    #[error("serialized data length {len} is not a multiple of the record size")]
    TruncatedRecords { len: usize },

    #[error(transparent)]
    Mask(#[from] InvalidMask),
}

impl IpListError {
    /// True for the failures that reject the caller's entries as a whole.
    pub fn is_invalid_entry(&self) -> bool {
        matches!(
            self,
            IpListError::InvalidEntry { .. }
                | IpListError::OverlappingRange { .. }
                | IpListError::TooManyRecords { .. }
        )
    }

    /// The 1-based line that caused the failure, if there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            IpListError::InvalidEntry { line, .. } | IpListError::OverlappingRange { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IpListError>;
