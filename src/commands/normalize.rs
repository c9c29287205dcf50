//! Normalize command implementation.
//!
//! Canonicalizes a list of entries into a sorted, deduplicated and maximally
//! aggregated list of CIDR blocks.
//!
//! # Algorithm
//!
//! 1. Parse every line; the first failure aborts the whole call
//! 2. Decompose ranges into maximal aligned blocks (O(log n) per range)
//! 3. Drop atomic blocks nested inside other atomic blocks and exact duplicates
//! 4. Merge atomic buddy pairs level by level, from `/32` up to `/1`
//! 5. Sort by (base, prefix length) and drop duplicate values
//!
//! Aggregation runs as a worklist keyed by (prefix length, base): merges at
//! level `n` only create blocks at level `n - 1`, so a single descending pass
//! reaches the fixed point in O(n log n).
//!
//! # Fixed blocks
//!
//! Explicit `/n` literals (other than `/32`) are `Fixed`. They never merge and
//! are never absorbed, even when an atomic block already covers them. A merge
//! whose parent block would strictly contain a fixed block is refused.

use crate::address::{decompose_range, Block, Origin, MAX_PREFIX_LEN};
use crate::error::Result;
use crate::parser::{parse_lines, Entry};
use crate::streaming::lines::read_entries;
use crate::streaming::BlockWriter;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::debug;

/// Normalize command configuration.
#[derive(Debug, Clone, Default)]
pub struct NormalizeCommand {
    /// Write 5-byte records instead of text lines.
    pub binary: bool,
}

impl NormalizeCommand {
    pub fn new() -> Self {
        Self { binary: false }
    }

    /// Emit binary records instead of text.
    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// Normalize already-parsed entries, collecting statistics.
    pub fn normalize(&self, entries: &[Entry]) -> Result<(Vec<Block>, NormalizeStats)> {
        let mut stats = NormalizeStats {
            entries_read: entries.len(),
            ..Default::default()
        };
        let blocks = coalesce(entries, &mut stats)?;
        stats.blocks_written = blocks.len();
        Ok((blocks, stats))
    }

    /// Normalize a list file and write the canonical list.
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        input_path: P,
        output: &mut W,
    ) -> Result<NormalizeStats> {
        let file = File::open(input_path.as_ref())?;
        self.run_reader(file, output)
    }

    /// Normalize stdin.
    pub fn run_stdin<W: Write>(&self, output: &mut W) -> Result<NormalizeStats> {
        let stdin = io::stdin();
        self.run_reader(stdin.lock(), output)
    }

    /// Normalize any line source.
    ///
    /// Nothing is written unless every line parses.
    pub fn run_reader<R: Read, W: Write>(
        &self,
        reader: R,
        output: &mut W,
    ) -> Result<NormalizeStats> {
        let entries = read_entries(reader)?;
        let (blocks, stats) = self.normalize(&entries)?;

        let mut writer = BlockWriter::new(output);
        for block in &blocks {
            if self.binary {
                writer.write_record(block)?;
            } else {
                writer.write_block_line(block)?;
            }
        }
        writer.flush()?;
        Ok(stats)
    }
}

/// Statistics from a normalize operation.
#[derive(Debug, Default, Clone)]
pub struct NormalizeStats {
    /// Number of entries parsed
    pub entries_read: usize,
    /// Number of range entries decomposed into blocks
    pub ranges_decomposed: usize,
    /// Number of explicit blocks kept verbatim
    pub fixed_blocks: usize,
    /// Number of buddy merges performed
    pub merges: usize,
    /// Number of blocks in the canonical output
    pub blocks_written: usize,
}

impl NormalizeStats {
    /// How many input entries per output block.
    pub fn compression_ratio(&self) -> f64 {
        if self.blocks_written == 0 {
            0.0
        } else {
            self.entries_read as f64 / self.blocks_written as f64
        }
    }
}

impl std::fmt::Display for NormalizeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read: {}, Ranges: {}, Fixed: {}, Merges: {}, Written: {}, Compression: {:.2}x",
            self.entries_read,
            self.ranges_decomposed,
            self.fixed_blocks,
            self.merges,
            self.blocks_written,
            self.compression_ratio()
        )
    }
}

/// Normalize text lines into canonical text.
///
/// ```
/// use iplist_normalize::normalize;
///
/// let out = normalize(&["255.255.255.255/24", "188.165.42.1/16"]).unwrap();
/// assert_eq!(out, vec!["188.165.0.0/16", "255.255.255.0/24"]);
/// ```
pub fn normalize<S: AsRef<[u8]>>(lines: &[S]) -> Result<Vec<String>> {
    Ok(normalize_blocks(lines)?
        .iter()
        .map(ToString::to_string)
        .collect())
}

/// Normalize text lines into structured blocks.
pub fn normalize_blocks<S: AsRef<[u8]>>(lines: &[S]) -> Result<Vec<Block>> {
    let entries = parse_lines(lines)?;
    normalize_entries(&entries)
}

/// Normalize already-parsed entries.
pub fn normalize_entries(entries: &[Entry]) -> Result<Vec<Block>> {
    NormalizeCommand::new()
        .normalize(entries)
        .map(|(blocks, _)| blocks)
}

/// Classify an entry for aggregation.
///
/// A literal `/32` names exactly one address, same as a bare address.
#[inline]
fn origin_of(entry: &Entry) -> Origin {
    match entry {
        Entry::Cidr(block) if block.prefix_len != MAX_PREFIX_LEN => Origin::Fixed,
        _ => Origin::Atomic,
    }
}

fn coalesce(entries: &[Entry], stats: &mut NormalizeStats) -> Result<Vec<Block>> {
    let mut fixed: BTreeSet<Block> = BTreeSet::new();
    let mut atomic: Vec<Block> = Vec::with_capacity(entries.len());

    for entry in entries {
        match (*entry, origin_of(entry)) {
            (Entry::Cidr(block), Origin::Fixed) => {
                fixed.insert(block);
            }
            (Entry::Cidr(block), Origin::Atomic) => atomic.push(block),
            (Entry::Address(address), _) => atomic.push(Block::host(address)),
            (Entry::Range { start, end }, _) => {
                stats.ranges_decomposed += 1;
                atomic.extend(decompose_range(start, end));
            }
        }
    }
    stats.fixed_blocks = fixed.len();

    let mut levels = disjoint_levels(atomic);
    stats.merges = merge_buddies(&mut levels, &fixed)?;

    let mut blocks: Vec<Block> = fixed.into_iter().collect();
    for (prefix_len, level) in levels.iter().enumerate() {
        blocks.extend(level.iter().map(|&base| Block {
            base,
            prefix_len: prefix_len as u8,
        }));
    }
    blocks.sort_unstable();
    blocks.dedup();

    debug!(
        entries = stats.entries_read,
        merges = stats.merges,
        blocks = blocks.len(),
        "normalized entry list"
    );
    Ok(blocks)
}

/// Bucket atomic blocks by prefix length, dropping any block that sits inside
/// another one.
///
/// Aligned blocks are either nested or disjoint, so after sorting by
/// (base, prefix length) a block is redundant exactly when it starts before the
/// end of the last block kept.
fn disjoint_levels(mut atomic: Vec<Block>) -> Vec<FxHashSet<u32>> {
    atomic.sort_unstable();
    atomic.dedup();

    let mut levels: Vec<FxHashSet<u32>> = (0..=MAX_PREFIX_LEN)
        .map(|_| FxHashSet::default())
        .collect();
    let mut covered_to: Option<u32> = None;

    for block in atomic {
        if covered_to.is_some_and(|last| block.base <= last) {
            continue;
        }
        covered_to = Some(block.last());
        levels[block.prefix_len as usize].insert(block.base);
    }
    levels
}

/// Merge buddy pairs until no pair is left, returning the number of merges.
fn merge_buddies(levels: &mut [FxHashSet<u32>], fixed: &BTreeSet<Block>) -> Result<usize> {
    let mut merges = 0;

    for prefix_len in (1..=MAX_PREFIX_LEN).rev() {
        let level = prefix_len as usize;
        if levels[level].len() < 2 {
            continue;
        }

        let mut bases: Vec<u32> = levels[level].iter().copied().collect();
        bases.sort_unstable();
        let bit = 1u32 << (MAX_PREFIX_LEN - prefix_len);

        for base in bases {
            // Only the lower half of a pair starts a merge.
            if base & bit != 0 || !levels[level].contains(&(base | bit)) {
                continue;
            }
            let parent = Block { base, prefix_len }.parent()?;
            if encloses_fixed(fixed, &parent) {
                continue;
            }
            levels[level].remove(&base);
            levels[level].remove(&(base | bit));
            levels[level - 1].insert(parent.base);
            merges += 1;
        }
    }
    Ok(merges)
}

/// True if some fixed block lies strictly inside `parent`.
fn encloses_fixed(fixed: &BTreeSet<Block>, parent: &Block) -> bool {
    let lo = Block {
        base: parent.base,
        prefix_len: parent.prefix_len + 1,
    };
    let hi = Block {
        base: parent.last(),
        prefix_len: MAX_PREFIX_LEN,
    };
    fixed.range(lo..=hi).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IpListError, ParseError};

    fn expand(blocks: &[String]) -> Vec<u32> {
        blocks
            .iter()
            .flat_map(|s| {
                let block: Block = s.parse().unwrap();
                block.first()..=block.last()
            })
            .collect()
    }

    fn class_c(prefix: &str) -> Vec<String> {
        (0..=255).map(|i| format!("{}.{}", prefix, i)).collect()
    }

    #[test]
    fn test_empty_list() {
        let empty: [&str; 0] = [];
        assert_eq!(normalize(&empty).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_removes_duplicates() {
        assert_eq!(
            normalize(&["192.168.0.1/32", "192.168.0.1", "192.168.0.1/32", "192.168.0.1"]).unwrap(),
            vec!["192.168.0.1"]
        );
    }

    #[test]
    fn test_strips_extra_bits() {
        assert_eq!(
            normalize(&["255.255.255.255/24", "188.165.42.1/16"]).unwrap(),
            vec!["188.165.0.0/16", "255.255.255.0/24"]
        );
    }

    #[test]
    fn test_fixed_blocks_keep_redundant_atomics() {
        assert_eq!(
            normalize(&["1.2.3.4", "10.0.0.0/8", "3.3.3.3/32", "1.2.0.0/16"]).unwrap(),
            vec!["1.2.0.0/16", "1.2.3.4", "3.3.3.3", "10.0.0.0/8"]
        );
    }

    #[test]
    fn test_coalesces_networks() {
        let lines: Vec<String> = (0..4).flat_map(|c| class_c(&format!("10.0.{}", c))).collect();
        assert_eq!(normalize(&lines).unwrap(), vec!["10.0.0.0/22"]);
    }

    #[test]
    fn test_missing_element_blocks_full_aggregation() {
        let mut lines = class_c("192.168.1");
        lines.retain(|l| l != "192.168.1.42");
        lines.push("192.168.2.0".to_string());

        let out = normalize(&lines).unwrap();
        assert!(!out.contains(&"192.168.1.0/24".to_string()));
        assert_eq!(expand(&out), expand(&lines));
    }

    #[test]
    fn test_fixed_element_is_kept_beside_atomics() {
        let mut lines = class_c("192.168.1");
        lines[10] = "192.168.1.10/24".to_string();

        let out = normalize(&lines).unwrap();
        assert_eq!(out[0], "192.168.1.0/24");
        let mut expected = expand(&["192.168.1.0/24".to_string()]);
        expected.extend(expand(&class_c("192.168.1")).into_iter().filter(|&a| a != 0xC0A8_010A));
        assert_eq!(expand(&out), expected);
    }

    #[test]
    fn test_fixed_and_discovered_equal_blocks_collapse() {
        let mut lines = class_c("192.168.1");
        lines[10] = "192.168.1.10/24".to_string();
        lines.push("192.168.1.10".to_string());
        lines.push("192.168.1.0/24".to_string());
        assert_eq!(normalize(&lines).unwrap(), vec!["192.168.1.0/24"]);
    }

    #[test]
    fn test_fixed_inside_parent_blocks_merge() {
        // .0/30 would strictly contain the fixed .2/31, so the halves stay apart
        let out = normalize(&["10.0.0.0", "10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.2/31"])
            .unwrap();
        assert_eq!(out, vec!["10.0.0.0/31", "10.0.0.2/31"]);
    }

    #[test]
    fn test_fixed_never_merges() {
        assert_eq!(
            normalize(&["10.0.0.0/25", "10.0.0.128/25"]).unwrap(),
            vec!["10.0.0.0/25", "10.0.0.128/25"]
        );
    }

    #[test]
    fn test_range_crossing_a_dot() {
        assert_eq!(
            normalize(&["192.168.1.255,192.168.2.1"]).unwrap(),
            vec!["192.168.1.255", "192.168.2.0/31"]
        );
    }

    #[test]
    fn test_large_ranges_coalesce() {
        assert_eq!(
            normalize(&["10.0.0.0,10.0.255.255", "10.1.0.0,10.255.255.255"]).unwrap(),
            vec!["10.0.0.0/8"]
        );
    }

    #[test]
    fn test_overlapping_ranges_do_not_duplicate() {
        assert_eq!(
            normalize(&["10.0.0.0,10.0.0.5", "10.0.0.3,10.0.0.9"]).unwrap(),
            vec!["10.0.0.0/29", "10.0.0.8/31"]
        );
    }

    #[test]
    fn test_single_entry_range() {
        assert_eq!(normalize(&["4.0.0.0,4.0.0.0"]).unwrap(), vec!["4.0.0.0"]);
    }

    #[test]
    fn test_reversed_range_fails() {
        let err = normalize(&["10.0.0.1", "192.168.2.0,192.168.1.192"]).unwrap_err();
        assert!(matches!(
            err,
            IpListError::InvalidEntry {
                line: 2,
                reason: ParseError::ReversedRange
            }
        ));
    }

    #[test]
    fn test_bad_entry_fails() {
        for bad in [
            "192.168.",
            "192.168.2.0,",
            ",192.168.2.0",
            "192.168.0.0/32,192.168.0.0/32",
        ] {
            let bad = [bad];
            let err = normalize(&bad).unwrap_err();
            assert!(err.is_invalid_entry(), "{:?}", bad);
        }
    }

    #[test]
    fn test_duplicate_sequences() {
        let lines = [
            "65.96.66.64", "65.96.66.64", "65.96.66.66", "65.96.66.66", "65.96.66.67",
            "65.96.66.68", "65.96.66.69", "65.96.66.69", "65.96.66.72", "65.96.66.71",
            "65.96.66.71",
        ];
        assert_eq!(
            normalize(&lines).unwrap(),
            vec![
                "65.96.66.64",
                "65.96.66.66/31",
                "65.96.66.68/31",
                "65.96.66.71",
                "65.96.66.72"
            ]
        );
    }

    #[test]
    fn test_whole_address_space() {
        assert_eq!(
            normalize(&["0.0.0.0,127.255.255.255", "128.0.0.0,255.255.255.255"]).unwrap(),
            vec!["0.0.0.0/0"]
        );
    }

    #[test]
    fn test_stats() {
        let entries = parse_lines(&["10.0.0.0", "10.0.0.1", "10.0.0.2,10.0.0.3", "8.0.0.0/8"]).unwrap();
        let (blocks, stats) = NormalizeCommand::new().normalize(&entries).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(stats.entries_read, 4);
        assert_eq!(stats.ranges_decomposed, 1);
        assert_eq!(stats.fixed_blocks, 1);
        assert_eq!(stats.merges, 2);
        assert_eq!(stats.blocks_written, 2);
        assert_eq!(stats.compression_ratio(), 2.0);
    }

    #[test]
    fn test_run_reader_text_and_binary() {
        let input = "10.0.0.1\r\n10.0.0.0\n9.9.9.9/8\n";

        let mut text = Vec::new();
        NormalizeCommand::new()
            .run_reader(input.as_bytes(), &mut text)
            .unwrap();
        assert_eq!(text, b"9.0.0.0/8\n10.0.0.0/31\n");

        let mut binary = Vec::new();
        NormalizeCommand::new()
            .with_binary(true)
            .run_reader(input.as_bytes(), &mut binary)
            .unwrap();
        assert_eq!(binary, [9, 0, 0, 0, 8, 10, 0, 0, 0, 31]);
    }

    #[test]
    fn test_run_reader_writes_nothing_on_failure() {
        let mut output = Vec::new();
        let err = NormalizeCommand::new()
            .run_reader("10.0.0.1\nfoo\n".as_bytes(), &mut output)
            .unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(output.is_empty());
    }
}
