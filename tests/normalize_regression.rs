//! Regression scenarios for list normalization.
//!
//! Mirrors the behaviours older list loaders were tested against, adjusted
//! where this tool merges further (buddy blocks at every level, ranges
//! decomposed into aligned blocks).

use iplist_normalize::{normalize, normalize_blocks, Block, IpListError, ParseError};
use std::collections::BTreeSet;

// =============================================================================
// Helper functions
// =============================================================================

fn addr(s: &str) -> u32 {
    u32::from_be_bytes(s.parse::<std::net::Ipv4Addr>().unwrap().octets())
}

fn text(a: u32) -> String {
    std::net::Ipv4Addr::from(a).to_string()
}

/// Every address of a block, as bare text.
fn block_addresses(cidr: &str) -> Vec<String> {
    let block: Block = cidr.parse().unwrap();
    (block.first()..=block.last()).map(text).collect()
}

/// Union of addresses covered by canonical output lines.
fn coverage(lines: &[String]) -> BTreeSet<u32> {
    lines
        .iter()
        .flat_map(|l| {
            let block: Block = l.parse().unwrap();
            block.first()..=block.last()
        })
        .collect()
}

// =============================================================================
// Basic behaviour
// =============================================================================

#[test]
fn test_empty_is_empty() {
    let empty: [&str; 0] = [];
    assert!(normalize(&empty).unwrap().is_empty());
}

#[test]
fn test_removes_duplicates() {
    assert_eq!(
        normalize(&["192.168.0.1/32", "192.168.0.1", "192.168.0.1/32", "192.168.0.1"]).unwrap(),
        vec!["192.168.0.1"]
    );
}

#[test]
fn test_fails_on_bad_ip() {
    let err = normalize(&["192.168."]).unwrap_err();
    assert!(matches!(
        err,
        IpListError::InvalidEntry {
            line: 1,
            reason: ParseError::MalformedAddress
        }
    ));
}

#[test]
fn test_strips_extra_bits() {
    assert_eq!(
        normalize(&["255.255.255.255/24", "188.165.42.1/16"]).unwrap(),
        vec!["188.165.0.0/16", "255.255.255.0/24"]
    );
}

#[test]
fn test_single_private_ip() {
    assert_eq!(normalize(&["10.0.0.1"]).unwrap(), vec!["10.0.0.1"]);
}

#[test]
fn test_various_wellformed_ips() {
    assert_eq!(
        normalize(&["1.2.3.4", "10.0.0.0/8", "3.3.3.3/32", "1.2.0.0/16"]).unwrap(),
        vec!["1.2.0.0/16", "1.2.3.4", "3.3.3.3", "10.0.0.0/8"]
    );
}

// =============================================================================
// Coalescing
// =============================================================================

#[test]
fn test_coalesces_networks() {
    let ips = block_addresses("10.0.0.0/22");
    assert_eq!(ips.len(), 1024);
    assert_eq!(normalize(&ips).unwrap(), vec!["10.0.0.0/22"]);
}

#[test]
fn test_missing_element_blocks_class_c() {
    let mut ips = block_addresses("192.168.1.0/24");
    ips.retain(|ip| ip != "192.168.1.42");
    ips.push("192.168.2.0".to_string());

    let out = normalize(&ips).unwrap();
    assert_eq!(
        out,
        vec![
            "192.168.1.0/27",
            "192.168.1.32/29",
            "192.168.1.40/31",
            "192.168.1.43",
            "192.168.1.44/30",
            "192.168.1.48/28",
            "192.168.1.64/26",
            "192.168.1.128/25",
            "192.168.2.0",
        ]
    );

    let expected: BTreeSet<u32> = ips.iter().map(|ip| addr(ip)).collect();
    assert_eq!(coverage(&out), expected);
}

#[test]
fn test_explicit_block_keeps_its_addresses_apart() {
    // One address of the class C is replaced by the whole class C as a block
    let mut ips = block_addresses("192.168.1.0/24");
    ips[10] = "192.168.1.10/24".to_string();

    assert_eq!(
        normalize(&ips).unwrap(),
        vec![
            "192.168.1.0/24",
            "192.168.1.0/29",
            "192.168.1.8/31",
            "192.168.1.11",
            "192.168.1.12/30",
            "192.168.1.16/28",
            "192.168.1.32/27",
            "192.168.1.64/26",
            "192.168.1.128/25",
        ]
    );
}

#[test]
fn test_uniqs_discovered_class_c() {
    let mut ips = block_addresses("192.168.1.0/24");
    ips[10] = "192.168.1.10/24".to_string();
    ips.push("192.168.1.10".to_string());
    ips.push("192.168.1.0/24".to_string());

    assert_eq!(normalize(&ips).unwrap(), vec!["192.168.1.0/24"]);
}

#[test]
fn test_duplicate_sequences_coalesce() {
    let lines = [
        "65.96.66.64",
        "65.96.66.64",
        "65.96.66.66",
        "65.96.66.66",
        "65.96.66.67",
        "65.96.66.68",
        "65.96.66.69",
        "65.96.66.69",
        "65.96.66.72",
        "65.96.66.71",
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

// =============================================================================
// Ranges
// =============================================================================

#[test]
fn test_range_crossing_a_dot() {
    assert_eq!(
        normalize(&["192.168.1.255,192.168.2.1"]).unwrap(),
        vec!["192.168.1.255", "192.168.2.0/31"]
    );
}

#[test]
fn test_coalesce_large_range() {
    assert_eq!(
        normalize(&["10.0.0.0,10.0.255.255", "10.1.0.0,10.255.255.255"]).unwrap(),
        vec!["10.0.0.0/8"]
    );
}

#[test]
fn test_rejects_unsorted_range() {
    let err = normalize(&["192.168.2.0,192.168.1.192"]).unwrap_err();
    assert!(matches!(
        err,
        IpListError::InvalidEntry {
            reason: ParseError::ReversedRange,
            ..
        }
    ));
}

#[test]
fn test_rejects_invalid_range() {
    for bad in ["192.168.2.0,", ",192.168.2.0", "192.168.0.0/32,192.168.0.0/32"] {
        let lines = [bad];
        assert!(normalize(&lines).unwrap_err().is_invalid_entry(), "{}", bad);
    }
}

#[test]
fn test_single_entry_range() {
    assert_eq!(normalize(&["4.0.0.0,4.0.0.0"]).unwrap(), vec!["4.0.0.0"]);
}

#[test]
fn test_overlapping_ranges_merge() {
    assert_eq!(
        normalize(&["10.0.0.0,10.0.0.200", "10.0.0.100,10.0.0.255"]).unwrap(),
        vec!["10.0.0.0/24"]
    );
}

#[test]
fn test_failure_reports_line() {
    let err = normalize(&["10.0.0.1", "10.0.0.2", "10.0.0.3/99"]).unwrap_err();
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_blocks_are_masked_and_ordered() {
    let blocks = normalize_blocks(&["9.9.9.9/8", "1.1.1.1", "1.1.1.0,1.1.1.0", "200.1.2.3/30"])
        .unwrap();
    assert!(blocks.windows(2).all(|w| w[0] < w[1]));
    for block in &blocks {
        assert_eq!(iplist_normalize::mask(block.base, block.prefix_len), Ok(block.base));
    }
    assert_eq!(blocks.len(), 3);
}
