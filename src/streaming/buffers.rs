//! Buffer size constants for streaming operations.
//!
//! These control memory usage vs I/O throughput. None of them grows with the
//! input: a stream of any length is processed with the same footprint.

use crate::parser::MAX_LINE_LEN;

/// Default input buffer size (64 KB).
/// Matches the read chunk of the older loaders this tool replaces.
pub const DEFAULT_INPUT_BUFFER: usize = 64 * 1024;

/// Low-memory input buffer size (4 KB).
pub const LOW_MEMORY_INPUT_BUFFER: usize = 4 * 1024;

/// Default output buffer size (256 KB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 256 * 1024;

/// Low-memory output buffer size (16 KB).
pub const LOW_MEMORY_OUTPUT_BUFFER: usize = 16 * 1024;

/// Line buffer capacity: the longest accepted entry plus a `\r`.
pub const LINE_BUFFER: usize = MAX_LINE_LEN + 1;

/// Returns the appropriate input buffer size based on low_memory flag.
#[inline]
pub const fn input_buffer_size(low_memory: bool) -> usize {
    if low_memory {
        LOW_MEMORY_INPUT_BUFFER
    } else {
        DEFAULT_INPUT_BUFFER
    }
}

/// Returns the appropriate output buffer size based on low_memory flag.
#[inline]
pub const fn output_buffer_size(low_memory: bool) -> usize {
    if low_memory {
        LOW_MEMORY_OUTPUT_BUFFER
    } else {
        DEFAULT_OUTPUT_BUFFER
    }
}
