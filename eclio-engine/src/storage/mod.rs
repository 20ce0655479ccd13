//! Storage layer for Fortran-framed keyword files
//!
//! This module handles the low-level binary format:
//! - Record framing and byte order
//! - Element types and their tags
//! - The 16-byte keyword header
//! - The sidecar index written after a scan

pub mod record;
pub mod data_type;
pub mod header;
pub mod index;

pub use record::{detect_endian, is_record_file, Endian, RecordStream};
pub use data_type::{DataType, StringWidth};
pub use header::{KeywordHeader, KeywordName};
pub use index::{IndexEntry, KeywordIndex};
