//! Streaming utilities shared by the line-oriented commands.
//!
//! - Bounded line scanning with terminator preservation
//! - Buffer sizing
//! - Allocation-free block and record output
//!
//! Every stream is processed with a single bounded line buffer, so memory use
//! does not depend on the length of the input or of any one line in it.

pub mod buffers;
pub mod lines;
pub mod output;

pub use lines::{Line, LineScanner, Terminator};
pub use output::BlockWriter;
