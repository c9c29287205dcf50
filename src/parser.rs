//! Zero-allocation line parser.
//!
//! Turns one line (terminator already removed) into an [`Entry`]:
//!
//! - `a.b.c.d` – a single address
//! - `a.b.c.d/n` – a CIDR block, host bits stripped
//! - `a.b.c.d,e.f.g.h` – an inclusive range
//!
//! Octets are decimal; leading zeros never switch to octal (`0255` is 255).

use crate::address::{Block, MAX_PREFIX_LEN};
use crate::config::mask_in_bounds;
use crate::error::{IpListError, ParseError};
use memchr::memchr;

/// Longest line content the parser will look at.
///
/// No well-formed entry comes close; anything longer is rejected outright.
pub const MAX_LINE_LEN: usize = 256;

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entry {
    /// A bare address, equivalent to a `/32`.
    Address(u32),
    /// An explicit `/n` block.
    Cidr(Block),
    /// An inclusive range with `start <= end`.
    Range { start: u32, end: u32 },
}

impl Entry {
    /// Number of addresses the entry covers.
    pub fn address_count(&self) -> u64 {
        match self {
            Entry::Address(_) => 1,
            Entry::Cidr(block) => block.size(),
            Entry::Range { start, end } => (*end as u64) - (*start as u64) + 1,
        }
    }
}

/// Parse one line.
pub fn parse_line(line: &[u8]) -> Result<Entry, ParseError> {
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    if line.len() > MAX_LINE_LEN {
        return Err(ParseError::LineTooLong);
    }

    if let Some(comma) = memchr(b',', line) {
        return parse_range(&line[..comma], &line[comma + 1..]);
    }

    match memchr(b'/', line) {
        Some(slash) => {
            let address = parse_address(&line[..slash])?;
            let prefix_len = parse_mask(&line[slash + 1..])?;
            let block = Block::new(address, prefix_len).map_err(|_| ParseError::MaskOutOfRange)?;
            Ok(Entry::Cidr(block))
        }
        None => Ok(Entry::Address(parse_address(line)?)),
    }
}

/// Parse a line held in a string.
#[inline]
pub fn parse_str(line: &str) -> Result<Entry, ParseError> {
    parse_line(line.as_bytes())
}

/// Parse every line, failing on the first malformed one.
///
/// Errors carry the 1-based position of the offending line.
pub fn parse_lines<S: AsRef<[u8]>>(lines: &[S]) -> Result<Vec<Entry>, IpListError> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            parse_line(line.as_ref())
                .map_err(|reason| IpListError::InvalidEntry { line: i + 1, reason })
        })
        .collect()
}

/// Check a line without keeping the result.
#[inline]
pub fn is_valid_line(line: &[u8]) -> bool {
    parse_line(line).is_ok()
}

fn parse_range(first: &[u8], second: &[u8]) -> Result<Entry, ParseError> {
    if first.is_empty() || second.is_empty() || memchr(b',', second).is_some() {
        return Err(ParseError::MalformedRange);
    }
    // Endpoints never carry a mask.
    if memchr(b'/', first).is_some() || memchr(b'/', second).is_some() {
        return Err(ParseError::MalformedRange);
    }

    let start = parse_address(first)?;
    let end = parse_address(second)?;
    if end < start {
        return Err(ParseError::ReversedRange);
    }
    Ok(Entry::Range { start, end })
}

/// Parse exactly four dot-separated decimal octets.
pub fn parse_address(bytes: &[u8]) -> Result<u32, ParseError> {
    let mut groups = bytes.split(|&b| b == b'.');
    let mut address: u32 = 0;

    for _ in 0..4 {
        let group = groups.next().ok_or(ParseError::MalformedAddress)?;
        address = (address << 8) | parse_octet(group)? as u32;
    }

    if groups.next().is_some() {
        return Err(ParseError::MalformedAddress);
    }
    Ok(address)
}

/// Parse one decimal octet, rejecting values above 255 as soon as they appear.
#[inline(always)]
fn parse_octet(bytes: &[u8]) -> Result<u8, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::MalformedAddress);
    }
    let mut n: u32 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return Err(ParseError::MalformedAddress);
        }
        n = n * 10 + d as u32;
        if n > 255 {
            return Err(ParseError::OctetOutOfRange);
        }
    }
    Ok(n as u8)
}

/// Parse the one or two digits following a `/`.
#[inline(always)]
fn parse_mask(bytes: &[u8]) -> Result<u8, ParseError> {
    if bytes.is_empty() || bytes.len() > 2 {
        return Err(ParseError::MalformedMask);
    }
    let mut n: u8 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return Err(ParseError::MalformedMask);
        }
        n = n * 10 + d;
    }
    if n > MAX_PREFIX_LEN || !mask_in_bounds(n) {
        return Err(ParseError::MaskOutOfRange);
    }
    Ok(n)
}
