//! Core address and block types.
//!
//! Addresses are plain `u32` values (most significant octet first). A
//! [`Block`] is an aligned CIDR block whose base never carries host bits.

use crate::error::{InvalidMask, ParseError};
use crate::parser::{parse_line, Entry};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Widest prefix length of an IPv4 block.
pub const MAX_PREFIX_LEN: u8 = 32;

/// Size in bytes of one serialized block record.
pub const RECORD_LEN: usize = 5;

/// Network mask for a prefix length, e.g. `/24` -> `0xFFFF_FF00`.
#[inline]
pub fn netmask(prefix_len: u8) -> Result<u32, InvalidMask> {
    match prefix_len {
        0 => Ok(0),
        1..=MAX_PREFIX_LEN => Ok(u32::MAX << (MAX_PREFIX_LEN - prefix_len)),
        _ => Err(InvalidMask(prefix_len)),
    }
}

/// Clear every bit of `address` below the prefix boundary.
#[inline]
pub fn mask(address: u32, prefix_len: u8) -> Result<u32, InvalidMask> {
    Ok(address & netmask(prefix_len)?)
}

/// Whether a block came from an explicit `/n` literal or was discovered.
///
/// Only `Atomic` blocks take part in aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Fixed,
    Atomic,
}

/// An aligned CIDR block.
///
/// Ordering is by base address, then by prefix length, which is also the
/// byte order of the serialized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block {
    pub base: u32,
    pub prefix_len: u8,
}

impl Block {
    /// Create a block, silently stripping any host bits from `address`.
    #[inline]
    pub fn new(address: u32, prefix_len: u8) -> Result<Self, InvalidMask> {
        Ok(Self {
            base: mask(address, prefix_len)?,
            prefix_len,
        })
    }

    /// A single-address `/32` block.
    #[inline]
    pub fn host(address: u32) -> Self {
        Self {
            base: address,
            prefix_len: MAX_PREFIX_LEN,
        }
    }

    /// Number of addresses covered.
    ///
    /// A prefix length above 32 is treated as a single address.
    #[inline]
    pub fn size(&self) -> u64 {
        netmask(self.prefix_len).map_or(1, |m| u64::from(!m) + 1)
    }

    #[inline]
    pub fn first(&self) -> u32 {
        self.base
    }

    #[inline]
    pub fn last(&self) -> u32 {
        (self.base as u64 + self.size() - 1) as u32
    }

    #[inline]
    pub fn contains_address(&self, address: u32) -> bool {
        self.first() <= address && address <= self.last()
    }

    /// True if `other` lies entirely within this block.
    #[inline]
    pub fn contains(&self, other: &Block) -> bool {
        self.prefix_len <= other.prefix_len && self.contains_address(other.base)
    }

    /// True if the two blocks are the two halves of the same parent block.
    pub fn is_buddy(&self, other: &Block) -> bool {
        if self.prefix_len != other.prefix_len || !(1..=MAX_PREFIX_LEN).contains(&self.prefix_len) {
            return false;
        }
        let bit = 1u32 << (MAX_PREFIX_LEN - self.prefix_len);
        self.base ^ other.base == bit
    }

    /// The block one prefix bit shorter that contains this one.
    pub fn parent(&self) -> Result<Block, InvalidMask> {
        if self.prefix_len == 0 {
            return Err(InvalidMask(self.prefix_len));
        }
        Block::new(self.base, self.prefix_len - 1)
    }

    /// Encode as `[a, b, c, d, prefix_len]`.
    #[inline]
    pub fn to_record(&self) -> [u8; RECORD_LEN] {
        let [a, b, c, d] = self.base.to_be_bytes();
        [a, b, c, d, self.prefix_len]
    }

    /// Decode a record produced by [`Block::to_record`].
    pub fn from_record(record: &[u8; RECORD_LEN]) -> Result<Block, InvalidMask> {
        let address = u32::from_be_bytes([record[0], record[1], record[2], record[3]]);
        Block::new(address, record[4])
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ipv4Addr::from(self.base))?;
        if self.prefix_len != MAX_PREFIX_LEN {
            write!(f, "/{}", self.prefix_len)?;
        }
        Ok(())
    }
}

impl FromStr for Block {
    type Err = ParseError;

    /// Parse a bare address or a CIDR literal. Ranges are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_line(s.as_bytes())? {
            Entry::Address(address) => Ok(Block::host(address)),
            Entry::Cidr(block) => Ok(block),
            Entry::Range { .. } => Err(ParseError::MalformedAddress),
        }
    }
}

/// Iterator over the maximal aligned blocks covering an inclusive range.
///
/// Produces O(log n) blocks per range rather than one per address.
#[derive(Debug, Clone)]
pub struct RangeBlocks {
    next: u64,
    end: u64,
}

/// Decompose `[start, end]` into the minimal ordered list of aligned blocks.
///
/// An empty iterator is returned when `start > end`.
pub fn decompose_range(start: u32, end: u32) -> RangeBlocks {
    RangeBlocks {
        next: start as u64,
        end: end as u64,
    }
}

impl Iterator for RangeBlocks {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if self.next > self.end {
            return None;
        }
        let remaining = self.end - self.next + 1;
        // Largest power of two not exceeding what is left of the range.
        let fit_bits = 63 - remaining.leading_zeros();
        let align_bits = if self.next == 0 {
            MAX_PREFIX_LEN as u32
        } else {
            self.next.trailing_zeros().min(MAX_PREFIX_LEN as u32)
        };
        let bits = fit_bits.min(align_bits);

        let block = Block {
            base: self.next as u32,
            prefix_len: MAX_PREFIX_LEN - bits as u8,
        };
        self.next += 1u64 << bits;
        Some(block)
    }
}
