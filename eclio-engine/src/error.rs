//! Error classification and the crate-wide error type
//!
//! Every failure surfaced by the engine carries an [`ErrorKind`] so callers
//! can tell stream-fatal conditions (I/O, broken framing) apart from the
//! recoverable ones (lookups, header mismatches, read-only violations).

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of engine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Disk or operating system failure
    Io,
    /// File does not exist
    NotFound,
    /// Operating system refused access
    PermissionDenied,
    /// File is not a Fortran-framed keyword file
    NotThisFormat,
    /// Leading and trailing record lengths disagree, or a record is cut short
    Corrupt,
    /// Clean end of stream at a record boundary
    Eof,
    /// Keyword header record is malformed
    BadHeader,
    /// Position outside the current window
    IndexOutOfRange,
    /// No keyword with the requested name/occurrence
    KeywordNotFound,
    /// No restart section matches the selection criterion
    SectionNotFound,
    /// Mutation attempted on a read-only file
    NotWritable,
    /// Replacement keyword does not match the on-disk header
    HeaderMismatch,
    /// Value or operand has the wrong element type
    TypeMismatch,
    /// Element index or sub-range outside the keyword
    OutOfRange,
    /// Text value wider than the element width
    ValueTooLong,
    /// Keyword name is empty or longer than eight characters
    InvalidName,
    /// Argument rejected for any other reason
    InvalidValue,
    /// Sidecar index does not describe the data file
    StaleIndex,
}

impl ErrorKind {
    /// Fatal errors leave the underlying stream in an unusable position.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::Io
                | ErrorKind::NotFound
                | ErrorKind::PermissionDenied
                | ErrorKind::NotThisFormat
                | ErrorKind::Corrupt
                | ErrorKind::BadHeader
        )
    }

    /// Check if this is a lookup miss the caller could have probed for
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            ErrorKind::IndexOutOfRange | ErrorKind::KeywordNotFound | ErrorKind::SectionNotFound
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorKind::Io => "I/O error",
            ErrorKind::NotFound => "File not found",
            ErrorKind::PermissionDenied => "Permission denied",
            ErrorKind::NotThisFormat => "Not a keyword file",
            ErrorKind::Corrupt => "Corrupt record framing",
            ErrorKind::Eof => "End of file",
            ErrorKind::BadHeader => "Bad keyword header",
            ErrorKind::IndexOutOfRange => "Index out of range",
            ErrorKind::KeywordNotFound => "Keyword not found",
            ErrorKind::SectionNotFound => "Restart section not found",
            ErrorKind::NotWritable => "File not writable",
            ErrorKind::HeaderMismatch => "Header mismatch",
            ErrorKind::TypeMismatch => "Type mismatch",
            ErrorKind::OutOfRange => "Out of range",
            ErrorKind::ValueTooLong => "Value too long",
            ErrorKind::InvalidName => "Invalid keyword name",
            ErrorKind::InvalidValue => "Invalid value",
            ErrorKind::StaleIndex => "Stale index",
        })
    }
}

/// Main error type for the eclio engine
#[derive(Error, Debug)]
pub enum EclError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Not a Fortran-framed keyword file: {}", .0.display())]
    NotThisFormat(PathBuf),

    #[error("Corrupt record at offset {offset}: leading length {leading} != trailing length {trailing}")]
    Corrupt { offset: u64, leading: i32, trailing: i32 },

    #[error("Truncated record at offset {offset}")]
    Truncated { offset: u64 },

    #[error("Negative record length {length} at offset {offset}")]
    NegativeLength { offset: u64, length: i32 },

    #[error("End of file")]
    Eof,

    #[error("Bad keyword header at offset {offset}: {reason}")]
    BadHeader { offset: u64, reason: String },

    #[error("Position {index} outside window of {len} keywords")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Keyword {name:?} occurrence {occurrence} not found")]
    KeywordNotFound { name: String, occurrence: usize },

    #[error("No restart section matches {0}")]
    SectionNotFound(String),

    #[error("File opened read-only")]
    NotWritable,

    #[error("Header mismatch: on disk {expected}, replacement {found}")]
    HeaderMismatch { expected: String, found: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Range {offset}+{count} exceeds keyword length {len}")]
    OutOfRange { offset: usize, count: usize, len: usize },

    #[error("Value {value:?} is wider than {width} characters")]
    ValueTooLong { value: String, width: usize },

    #[error("Invalid keyword name {0:?}")]
    InvalidName(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Stale index {}: {reason}", .path.display())]
    StaleIndex { path: PathBuf, reason: String },
}

impl EclError {
    /// Get the classification for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EclError::Io(_) => ErrorKind::Io,
            EclError::NotFound(_) => ErrorKind::NotFound,
            EclError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            EclError::NotThisFormat(_) => ErrorKind::NotThisFormat,
            EclError::Corrupt { .. }
            | EclError::Truncated { .. }
            | EclError::NegativeLength { .. } => ErrorKind::Corrupt,
            EclError::Eof => ErrorKind::Eof,
            EclError::BadHeader { .. } => ErrorKind::BadHeader,
            EclError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            EclError::KeywordNotFound { .. } => ErrorKind::KeywordNotFound,
            EclError::SectionNotFound(_) => ErrorKind::SectionNotFound,
            EclError::NotWritable => ErrorKind::NotWritable,
            EclError::HeaderMismatch { .. } => ErrorKind::HeaderMismatch,
            EclError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            EclError::OutOfRange { .. } => ErrorKind::OutOfRange,
            EclError::ValueTooLong { .. } => ErrorKind::ValueTooLong,
            EclError::InvalidName(_) => ErrorKind::InvalidName,
            EclError::InvalidValue(_) => ErrorKind::InvalidValue,
            EclError::StaleIndex { .. } => ErrorKind::StaleIndex,
        }
    }

    /// Map an open failure to a path-carrying error
    pub(crate) fn from_open(err: std::io::Error, path: &std::path::Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => EclError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => EclError::PermissionDenied(path.to_path_buf()),
            _ => EclError::Io(err),
        }
    }

    pub(crate) fn bad_header(offset: u64, reason: impl Into<String>) -> Self {
        EclError::BadHeader {
            offset,
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations
pub type EclResult<T> = Result<T, EclError>;
