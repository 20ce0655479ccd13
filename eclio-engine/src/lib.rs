//! Eclio Engine - reader/writer for Fortran-framed simulator restart files
//!
//! This crate provides the record framing, keyword codec and the indexed,
//! windowed keyword file used by the `eclio` tool.

pub mod error;
pub mod storage;
pub mod keyword;
pub mod file_manager;

pub use error::{EclError, EclResult, ErrorKind};
pub use file_manager::{write_keywords, KeywordFile, NameFilter, OpenMode, Selection};
pub use keyword::{Keyword, KeywordData, Value};
pub use storage::{DataType, Endian, KeywordHeader, KeywordName, RecordStream, StringWidth};
