//! Validate command implementation.
//!
//! Reports the 1-based positions of lines that fail to parse, stopping after
//! a configurable number of failures. Validation never fails on content;
//! only the caller's I/O can produce an error.

use crate::parser::parse_line;
use crate::streaming::buffers::input_buffer_size;
use crate::streaming::LineScanner;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, trace};

/// Validate command configuration.
#[derive(Debug, Clone)]
pub struct ValidateCommand {
    /// Stop after this many failing lines (always at least 1).
    pub limit: usize,
    /// Use small read buffers.
    pub low_memory: bool,
}

impl Default for ValidateCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidateCommand {
    pub fn new() -> Self {
        Self {
            limit: 1,
            low_memory: false,
        }
    }

    /// Set the failure limit. Zero is treated as one.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_low_memory(mut self, low_memory: bool) -> Self {
        self.low_memory = low_memory;
        self
    }

    /// Validate an in-memory sequence of lines (terminators excluded).
    pub fn validate_lines<S: AsRef<[u8]>>(&self, lines: &[S]) -> Vec<usize> {
        let mut failures = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if let Err(reason) = parse_line(line.as_ref()) {
                trace!(line = i + 1, %reason, "invalid line");
                failures.push(i + 1);
                if failures.len() >= self.limit {
                    break;
                }
            }
        }
        debug!(failures = failures.len(), "validated lines");
        failures
    }

    /// Validate a line stream.
    pub fn run<R: Read>(&self, reader: R) -> io::Result<Vec<usize>> {
        let mut scanner = LineScanner::with_capacity(input_buffer_size(self.low_memory), reader);
        let mut failures = Vec::new();

        while let Some(line) = scanner.next_line()? {
            if let Err(reason) = line.parse() {
                trace!(line = line.number, %reason, "invalid line");
                failures.push(line.number);
                if failures.len() >= self.limit {
                    break;
                }
            }
        }

        debug!(
            lines = scanner.line_number(),
            failures = failures.len(),
            "validated stream"
        );
        Ok(failures)
    }

    /// Validate a list file.
    pub fn run_path<P: AsRef<Path>>(&self, input_path: P) -> io::Result<Vec<usize>> {
        let file = File::open(input_path.as_ref())?;
        self.run(file)
    }

    /// Validate stdin.
    pub fn run_stdin(&self) -> io::Result<Vec<usize>> {
        let stdin = io::stdin();
        self.run(stdin.lock())
    }
}

/// Positions of the first `limit` lines that fail to parse.
///
/// ```
/// use iplist_normalize::validate;
///
/// assert_eq!(validate(&["10.0.0.1", "10.0.0.", "foo"], 5), vec![2, 3]);
/// assert!(validate(&["10.0.0.0/8"], 1).is_empty());
/// ```
pub fn validate<S: AsRef<[u8]>>(lines: &[S], limit: usize) -> Vec<usize> {
    ValidateCommand::new().with_limit(limit).validate_lines(lines)
}

/// Stream form of [`validate`].
pub fn validate_reader<R: Read>(reader: R, limit: usize) -> io::Result<Vec<usize>> {
    ValidateCommand::new().with_limit(limit).run(reader)
}
