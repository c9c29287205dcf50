//! iplist: IPv4 list normalizer
//!
//! This library turns loosely written IPv4 allow/deny lists into a canonical,
//! minimal set of CIDR blocks.
//!
//! # Input
//!
//! One entry per line:
//!
//! - `a.b.c.d` - a single address
//! - `a.b.c.d/n` - a CIDR block (host bits are stripped)
//! - `a.b.c.d,e.f.g.h` - an inclusive address range
//!
//! # Operations
//!
//! - **normalize**: decompose ranges, merge buddy blocks, emit sorted text
//! - **serialize**: fixed 5-byte binary records, one per block or address
//! - **validate**: report the positions of malformed lines
//! - **strip_invalid_lines**: O(1) memory filter that drops malformed lines
//!
//! # Example
//!
//! ```rust
//! use iplist_normalize::normalize;
//!
//! let out = normalize(&["10.0.0.0,10.0.0.255", "10.0.1.0,10.0.1.255", "192.168.0.1"]).unwrap();
//! assert_eq!(out, vec!["10.0.0.0/23", "192.168.0.1"]);
//! ```

pub mod address;
pub mod commands;
pub mod config;
pub mod error;
pub mod parser;
pub mod streaming;

// Re-export commonly used types
pub use address::{decompose_range, mask, Block, Origin};
pub use commands::{
    decode_records, normalize, normalize_blocks, normalize_entries, serialize, serialize_entries,
    strip_invalid_lines, validate, validate_reader,
};
pub use error::{InvalidMask, IpListError, ParseError, Result};
pub use parser::{parse_line, Entry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::address::{Block, Origin};
    pub use crate::commands::{
        NormalizeCommand, SerializeCommand, StripCommand, ValidateCommand,
    };
    pub use crate::error::{IpListError, ParseError};
    pub use crate::parser::{parse_line, Entry};
}
