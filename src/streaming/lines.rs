//! Bounded line scanning.
//!
//! [`LineScanner`] splits any `Read` source into lines without ever holding
//! more than [`LINE_BUFFER`] bytes of a single line. Bytes past the bound are
//! consumed and discarded, and the line is reported as overlong.

use super::buffers::{DEFAULT_INPUT_BUFFER, LINE_BUFFER};
use crate::error::{IpListError, ParseError};
use crate::parser::{parse_line, Entry, MAX_LINE_LEN};
use memchr::memchr;
use std::io::{self, BufRead, BufReader, Read};

/// How a scanned line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// Final line of the stream, no newline.
    None,
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
}

impl Terminator {
    #[inline]
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Terminator::None => b"",
            Terminator::Lf => b"\n",
            Terminator::CrLf => b"\r\n",
        }
    }
}

/// One line handed out by [`LineScanner`].
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    /// 1-based position in the stream.
    pub number: usize,
    /// Line ending, excluded from `content`.
    pub terminator: Terminator,
    /// The line did not fit the bounded buffer; `content` is empty.
    pub overlong: bool,
    content: &'a [u8],
}

impl<'a> Line<'a> {
    /// Line content without its terminator.
    #[inline]
    pub fn content(&self) -> &'a [u8] {
        self.content
    }

    /// Parse the line, treating an overlong line as a failure.
    #[inline]
    pub fn parse(&self) -> Result<Entry, ParseError> {
        if self.overlong {
            return Err(ParseError::LineTooLong);
        }
        parse_line(self.content)
    }
}

/// A streaming line reader with a fixed-size line buffer.
pub struct LineScanner<R: Read> {
    reader: BufReader<R>,
    line: Vec<u8>,
    line_number: usize,
}

impl<R: Read> LineScanner<R> {
    /// Create a scanner with the default input buffer.
    pub fn new(reader: R) -> Self {
        Self::with_capacity(DEFAULT_INPUT_BUFFER, reader)
    }

    /// Create a scanner with a custom input buffer capacity.
    ///
    /// The line buffer is unaffected; only the read chunk size changes.
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line: Vec::with_capacity(LINE_BUFFER),
            line_number: 0,
        }
    }

    /// Number of lines handed out so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next line, or `None` at end of stream.
    pub fn next_line(&mut self) -> io::Result<Option<Line<'_>>> {
        self.line.clear();
        let mut overlong = false;
        let mut saw_bytes = false;
        let mut found_newline = false;

        loop {
            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                break;
            }
            saw_bytes = true;

            let (chunk_len, consumed) = match memchr(b'\n', available) {
                Some(i) => {
                    found_newline = true;
                    (i, i + 1)
                }
                None => (available.len(), available.len()),
            };

            if !overlong {
                if self.line.len() + chunk_len > LINE_BUFFER {
                    overlong = true;
                    self.line.clear();
                } else {
                    self.line.extend_from_slice(&available[..chunk_len]);
                }
            }

            self.reader.consume(consumed);
            if found_newline {
                break;
            }
        }

        if !saw_bytes {
            return Ok(None);
        }
        self.line_number += 1;

        let mut len = self.line.len();
        let terminator = if !found_newline {
            Terminator::None
        } else if !overlong && self.line.last() == Some(&b'\r') {
            len -= 1;
            Terminator::CrLf
        } else {
            Terminator::Lf
        };
        if len > MAX_LINE_LEN {
            overlong = true;
            len = 0;
        }

        Ok(Some(Line {
            number: self.line_number,
            terminator,
            overlong,
            content: &self.line[..len],
        }))
    }

    /// Buffered line capacity actually allocated (for memory-bound checks).
    pub fn line_capacity(&self) -> usize {
        self.line.capacity()
    }
}

/// Parse every line of a stream, failing on the first malformed one.
pub fn read_entries<R: Read>(reader: R) -> Result<Vec<Entry>, IpListError> {
    let mut scanner = LineScanner::new(reader);
    let mut entries = Vec::new();
    while let Some(line) = scanner.next_line()? {
        let entry = line.parse().map_err(|reason| IpListError::InvalidEntry {
            line: line.number,
            reason,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
