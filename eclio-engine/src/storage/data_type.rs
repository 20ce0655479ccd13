//! Element types and their on-disk tags
//!
//! Each keyword header carries a 4-character type tag. Fixed-width types map
//! one to one onto a tag; STRING types encode their width in the tag itself
//! (`C0nn`, width `nn`).

use crate::error::{EclError, EclResult};

/// Length of the type tag in a keyword header
pub const TYPE_TAG_LEN: usize = 4;

/// Width of a CHAR element
pub const CHAR_WIDTH: usize = 8;

/// Widest STRING element expressible in a `C0nn` tag
pub const MAX_STRING_WIDTH: usize = 99;

/// Elements per data record for numeric and bool keywords
pub const BLOCKSIZE_NUMERIC: usize = 1000;

/// Elements per data record for CHAR and STRING keywords
pub const BLOCKSIZE_CHAR: usize = 105;

/// Element width of a STRING type, always within `1..=99`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringWidth(u8);

impl StringWidth {
    pub fn new(width: usize) -> EclResult<Self> {
        if width == 0 || width > MAX_STRING_WIDTH {
            return Err(EclError::InvalidValue(format!(
                "string width {} outside 1..={}",
                width, MAX_STRING_WIDTH
            )));
        }
        Ok(StringWidth(width as u8))
    }

    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

/// Element types supported by the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit signed integer (`INTE`)
    Int,
    /// 32-bit IEEE float (`REAL`)
    Float,
    /// 64-bit IEEE float (`DOUB`)
    Double,
    /// Logical stored in a 32-bit field (`LOGI`)
    Bool,
    /// Eight byte space-padded text (`CHAR`)
    Char,
    /// Section marker without payload (`MESS`)
    Message,
    /// Fixed-width text of 1..=99 bytes (`C0nn`)
    String(StringWidth),
}

impl DataType {
    /// STRING type of the given width, validated against the tag range
    pub fn string(width: usize) -> EclResult<Self> {
        Ok(DataType::String(StringWidth::new(width)?))
    }

    /// Parse a header type tag
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        if tag.len() != TYPE_TAG_LEN {
            return None;
        }
        match tag {
            b"INTE" => Some(DataType::Int),
            b"REAL" => Some(DataType::Float),
            b"DOUB" => Some(DataType::Double),
            b"LOGI" => Some(DataType::Bool),
            b"CHAR" => Some(DataType::Char),
            b"MESS" => Some(DataType::Message),
            [b'C', b'0', hi, lo] if hi.is_ascii_digit() && lo.is_ascii_digit() => {
                let width = ((hi - b'0') * 10 + (lo - b'0')) as usize;
                DataType::string(width).ok()
            }
            _ => None,
        }
    }

    /// The 4-character tag written to disk
    pub fn tag(&self) -> [u8; TYPE_TAG_LEN] {
        match self {
            DataType::Int => *b"INTE",
            DataType::Float => *b"REAL",
            DataType::Double => *b"DOUB",
            DataType::Bool => *b"LOGI",
            DataType::Char => *b"CHAR",
            DataType::Message => *b"MESS",
            DataType::String(width) => {
                let width = width.0;
                [b'C', b'0', b'0' + width / 10, b'0' + width % 10]
            }
        }
    }

    /// Bytes occupied by one element on disk
    pub fn element_size(&self) -> usize {
        match self {
            DataType::Int | DataType::Float | DataType::Bool => 4,
            DataType::Double => 8,
            DataType::Char => CHAR_WIDTH,
            DataType::Message => 0,
            DataType::String(width) => width.get(),
        }
    }

    /// Maximum number of elements in one data record
    pub fn block_size(&self) -> usize {
        if self.is_alpha() {
            BLOCKSIZE_CHAR
        } else {
            BLOCKSIZE_NUMERIC
        }
    }

    /// Number of data records a keyword of `count` elements occupies
    pub fn record_count(&self, count: usize) -> usize {
        if self.element_size() == 0 || count == 0 {
            return 0;
        }
        count.div_ceil(self.block_size())
    }

    /// Payload bytes (without framing) of `count` elements
    pub fn data_bytes(&self, count: usize) -> usize {
        count * self.element_size()
    }

    pub fn is_alpha(&self) -> bool {
        matches!(self, DataType::Char | DataType::String(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float | DataType::Double)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = self.tag();
        f.write_str(std::str::from_utf8(&tag).unwrap_or("????"))
    }
}
