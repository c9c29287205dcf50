//! Serialize command implementation.
//!
//! Encodes entries as a flat sequence of 5-byte records:
//! `[addr0][addr1][addr2][addr3][prefix_len]`, address most significant first,
//! no header and no delimiter.
//!
//! Unlike normalization, ranges are not decomposed into aligned blocks: every
//! address in a range becomes its own `/32` record. Explicit blocks and bare
//! addresses produce exactly one record each. Records are sorted by
//! (address, prefix length) and exact duplicates are dropped.
//!
//! Two ranges whose address sets intersect are rejected rather than merged.

use crate::address::{Block, RECORD_LEN};
use crate::error::{IpListError, Result};
use crate::parser::{parse_lines, Entry};
use crate::streaming::lines::read_entries;
use crate::streaming::BlockWriter;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::debug;

/// Serialize command configuration.
#[derive(Debug, Clone, Default)]
pub struct SerializeCommand;

impl SerializeCommand {
    pub fn new() -> Self {
        Self
    }

    /// Expand entries into sorted, deduplicated records.
    pub fn records(&self, entries: &[Entry]) -> Result<Vec<Block>> {
        check_range_overlaps(entries)?;

        let requested: u64 = entries.iter().map(record_count).sum();
        let mut records: Vec<Block> = Vec::new();
        usize::try_from(requested)
            .ok()
            .and_then(|n| records.try_reserve_exact(n).ok())
            .ok_or(IpListError::TooManyRecords { requested })?;

        for entry in entries {
            match *entry {
                Entry::Address(address) => records.push(Block::host(address)),
                Entry::Cidr(block) => records.push(block),
                Entry::Range { start, end } => records.extend((start..=end).map(Block::host)),
            }
        }

        records.sort_unstable();
        records.dedup();
        debug!(
            entries = entries.len(),
            records = records.len(),
            "serialized entry list"
        );
        Ok(records)
    }

    /// Serialize a list file.
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        input_path: P,
        output: &mut W,
    ) -> Result<SerializeStats> {
        let file = File::open(input_path.as_ref())?;
        self.run_reader(file, output)
    }

    /// Serialize stdin.
    pub fn run_stdin<W: Write>(&self, output: &mut W) -> Result<SerializeStats> {
        let stdin = io::stdin();
        self.run_reader(stdin.lock(), output)
    }

    /// Serialize any line source. Nothing is written on failure.
    pub fn run_reader<R: Read, W: Write>(
        &self,
        reader: R,
        output: &mut W,
    ) -> Result<SerializeStats> {
        let entries = read_entries(reader)?;
        let records = self.records(&entries)?;

        let mut writer = BlockWriter::new(output);
        for record in &records {
            writer.write_record(record)?;
        }
        writer.flush()?;

        Ok(SerializeStats {
            entries_read: entries.len(),
            records_written: records.len(),
        })
    }
}

/// Statistics from a serialize operation.
#[derive(Debug, Default, Clone)]
pub struct SerializeStats {
    /// Number of entries parsed
    pub entries_read: usize,
    /// Number of 5-byte records written
    pub records_written: usize,
}

impl SerializeStats {
    /// Size of the encoded output in bytes.
    pub fn bytes_written(&self) -> usize {
        self.records_written * RECORD_LEN
    }
}

impl std::fmt::Display for SerializeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read: {}, Records: {}, Bytes: {}",
            self.entries_read,
            self.records_written,
            self.bytes_written()
        )
    }
}

/// Serialize text lines into records.
///
/// ```
/// use iplist_normalize::serialize;
///
/// let bytes = serialize(&["10.0.0.1,10.0.0.2"]).unwrap();
/// assert_eq!(bytes, vec![10, 0, 0, 1, 32, 10, 0, 0, 2, 32]);
/// ```
pub fn serialize<S: AsRef<[u8]>>(lines: &[S]) -> Result<Vec<u8>> {
    let entries = parse_lines(lines)?;
    serialize_entries(&entries)
}

/// Serialize already-parsed entries into records.
pub fn serialize_entries(entries: &[Entry]) -> Result<Vec<u8>> {
    let records = SerializeCommand::new().records(entries)?;
    let mut out = Vec::with_capacity(records.len() * RECORD_LEN);
    for record in &records {
        out.extend_from_slice(&record.to_record());
    }
    Ok(out)
}

/// Decode records produced by [`serialize`].
pub fn decode_records(bytes: &[u8]) -> Result<Vec<Block>> {
    if bytes.len() % RECORD_LEN != 0 {
        return Err(IpListError::TruncatedRecords { len: bytes.len() });
    }
    bytes
        .chunks_exact(RECORD_LEN)
        .map(|chunk| {
            let record: &[u8; RECORD_LEN] = chunk
                .try_into()
                .map_err(|_| IpListError::TruncatedRecords { len: bytes.len() })?;
            Ok(Block::from_record(record)?)
        })
        .collect()
}

#[inline]
fn record_count(entry: &Entry) -> u64 {
    match entry {
        Entry::Range { .. } => entry.address_count(),
        _ => 1,
    }
}

/// Reject ranges from different lines whose address sets intersect.
fn check_range_overlaps(entries: &[Entry]) -> Result<()> {
    let mut ranges: Vec<(u32, u32, usize)> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| match *entry {
            Entry::Range { start, end } => Some((start, end, i + 1)),
            _ => None,
        })
        .collect();
    ranges.sort_unstable();

    for pair in ranges.windows(2) {
        let (_, prev_end, prev_line) = pair[0];
        let (next_start, _, next_line) = pair[1];
        if next_start <= prev_end {
            return Err(IpListError::OverlappingRange {
                line: prev_line.max(next_line),
                previous: prev_line.min(next_line),
            });
        }
    }
    Ok(())
}
