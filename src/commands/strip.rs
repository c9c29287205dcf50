//! Streaming strip implementation with O(1) memory complexity.
//!
//! Copies a line stream to a sink, dropping every line that does not parse.
//! Forwarded lines keep their original terminator (`\n`, `\r\n`, or none for
//! a final unterminated line).
//!
//! # Memory Complexity
//!
//! O(1) - one bounded line buffer plus fixed read and write buffers,
//! regardless of stream length or line length.

use crate::error::Result;
use crate::streaming::buffers::{input_buffer_size, output_buffer_size};
use crate::streaming::{BlockWriter, LineScanner};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Streaming strip command configuration.
#[derive(Debug, Clone, Default)]
pub struct StripCommand {
    /// Use small read and write buffers.
    pub low_memory: bool,
}

impl StripCommand {
    pub fn new() -> Self {
        Self { low_memory: false }
    }

    pub fn with_low_memory(mut self, low_memory: bool) -> Self {
        self.low_memory = low_memory;
        self
    }

    /// Strip a list file.
    pub fn run_path<P: AsRef<Path>, W: Write>(
        &self,
        input_path: P,
        output: &mut W,
    ) -> Result<StripStats> {
        let file = File::open(input_path.as_ref())?;
        self.run(file, output)
    }

    /// Strip stdin.
    pub fn run_stdin<W: Write>(&self, output: &mut W) -> Result<StripStats> {
        let stdin = io::stdin();
        self.run(stdin.lock(), output)
    }

    /// Core streaming filter.
    ///
    /// Malformed lines are dropped, never reported as errors. Only I/O
    /// failures of the source or sink abort the copy.
    pub fn run<R: Read, W: Write>(&self, source: R, sink: &mut W) -> Result<StripStats> {
        let mut stats = StripStats::default();
        let mut scanner = LineScanner::with_capacity(input_buffer_size(self.low_memory), source);
        let mut writer = BlockWriter::with_capacity(output_buffer_size(self.low_memory), sink);

        while let Some(line) = scanner.next_line()? {
            stats.lines_read += 1;
            if line.overlong {
                stats.overlong_lines += 1;
            }
            match line.parse() {
                Ok(_) => {
                    writer.write_line(line.content(), line.terminator)?;
                    stats.lines_written += 1;
                }
                Err(reason) => {
                    trace!(line = line.number, %reason, "dropping line");
                    stats.lines_dropped += 1;
                }
            }
        }

        writer.flush()?;
        debug!(
            read = stats.lines_read,
            written = stats.lines_written,
            dropped = stats.lines_dropped,
            "stripped invalid lines"
        );
        Ok(stats)
    }
}

/// Statistics from a strip operation.
#[derive(Debug, Default, Clone)]
pub struct StripStats {
    /// Number of lines scanned
    pub lines_read: usize,
    /// Number of valid lines forwarded to the sink
    pub lines_written: usize,
    /// Number of malformed lines skipped
    pub lines_dropped: usize,
    /// Dropped lines that exceeded the line buffer
    pub overlong_lines: usize,
}

impl std::fmt::Display for StripStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read: {}, Written: {}, Dropped: {} ({} overlong)",
            self.lines_read, self.lines_written, self.lines_dropped, self.overlong_lines
        )
    }
}

/// Copy `source` to `sink`, keeping only lines that parse.
///
/// Returns the number of lines written.
///
/// ```
/// use iplist_normalize::strip_invalid_lines;
///
/// let mut out = Vec::new();
/// let n = strip_invalid_lines(&b"foo\r\n10.0.0.1\r\n"[..], &mut out).unwrap();
/// assert_eq!(n, 1);
/// assert_eq!(out, b"10.0.0.1\r\n");
/// ```
pub fn strip_invalid_lines<R: Read, W: Write>(source: R, sink: &mut W) -> Result<usize> {
    let stats = StripCommand::new().run(source, sink)?;
    Ok(stats.lines_written)
}
