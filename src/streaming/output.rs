//! Efficient output formatting for streaming operations.
//!
//! Uses itoa for octet and prefix formatting to avoid allocation in the hot
//! path.

use super::buffers::DEFAULT_OUTPUT_BUFFER;
use super::lines::Terminator;
use crate::address::{Block, MAX_PREFIX_LEN};
use crate::error::IpListError;
use std::io::{BufWriter, Write};

/// High-performance block writer.
///
/// Writes canonical text (`a.b.c.d` or `a.b.c.d/n`), binary records, or raw
/// lines through one buffered sink.
pub struct BlockWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> BlockWriter<W> {
    /// Create a new BlockWriter with the default buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    /// Create a new BlockWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write a block in canonical text form.
    #[inline]
    pub fn write_block(&mut self, block: &Block) -> Result<(), IpListError> {
        let octets = block.base.to_be_bytes();
        for (i, octet) in octets.iter().enumerate() {
            if i > 0 {
                self.writer.write_all(b".").map_err(IpListError::Io)?;
            }
            self.writer
                .write_all(self.itoa_buf.format(*octet).as_bytes())
                .map_err(IpListError::Io)?;
        }
        if block.prefix_len != MAX_PREFIX_LEN {
            self.writer.write_all(b"/").map_err(IpListError::Io)?;
            self.writer
                .write_all(self.itoa_buf.format(block.prefix_len).as_bytes())
                .map_err(IpListError::Io)?;
        }
        Ok(())
    }

    /// Write a block followed by newline.
    #[inline]
    pub fn write_block_line(&mut self, block: &Block) -> Result<(), IpListError> {
        self.write_block(block)?;
        self.writer.write_all(b"\n").map_err(IpListError::Io)?;
        Ok(())
    }

    /// Write a block as a 5-byte record.
    #[inline]
    pub fn write_record(&mut self, block: &Block) -> Result<(), IpListError> {
        self.writer
            .write_all(&block.to_record())
            .map_err(IpListError::Io)?;
        Ok(())
    }

    /// Write a line exactly as it was read, terminator included.
    #[inline]
    pub fn write_line(&mut self, content: &[u8], terminator: Terminator) -> Result<(), IpListError> {
        self.writer.write_all(content).map_err(IpListError::Io)?;
        self.writer
            .write_all(terminator.as_bytes())
            .map_err(IpListError::Io)?;
        Ok(())
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<(), IpListError> {
        self.writer.flush().map_err(IpListError::Io)?;
        Ok(())
    }
}
