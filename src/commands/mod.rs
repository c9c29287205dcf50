//! Command implementations for iplist.

pub mod normalize;
pub mod serialize;
pub mod strip;
pub mod validate;

pub use normalize::{
    normalize, normalize_blocks, normalize_entries, NormalizeCommand, NormalizeStats,
};
pub use serialize::{
    decode_records, serialize, serialize_entries, SerializeCommand, SerializeStats,
};
pub use strip::{strip_invalid_lines, StripCommand, StripStats};
pub use validate::{validate, validate_reader, ValidateCommand};
