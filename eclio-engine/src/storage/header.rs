//! Keyword names and the keyword header record
//!
//! The header record payload is exactly 16 bytes:
//! - Bytes 0-7: space-padded name
//! - Bytes 8-11: element count (i32, file byte order)
//! - Bytes 12-15: type tag

use std::fmt;
use std::str::FromStr;

use crate::error::{EclError, EclResult};
use crate::storage::data_type::{DataType, TYPE_TAG_LEN};
use crate::storage::record::Endian;

/// Length of a keyword name
pub const NAME_LEN: usize = 8;

/// Well-known keyword delimiting restart sections
pub const SEQNUM_KW: &str = "SEQNUM";
/// Integer header carrying the simulation date
pub const INTEHEAD_KW: &str = "INTEHEAD";
/// Double header carrying elapsed simulation days
pub const DOUBHEAD_KW: &str = "DOUBHEAD";

/// Fixed eight byte keyword name, space padded
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeywordName([u8; NAME_LEN]);

impl KeywordName {
    /// Build a name from text, padding it to eight bytes.
    ///
    /// Names must be non-empty ASCII of at most eight bytes.
    pub fn new(name: &str) -> EclResult<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > NAME_LEN || !name.is_ascii() {
            return Err(EclError::InvalidName(name.to_string()));
        }
        let mut raw = [b' '; NAME_LEN];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(KeywordName(raw))
    }

    /// Wrap the raw bytes read from a header
    pub fn from_raw(raw: [u8; NAME_LEN]) -> Self {
        KeywordName(raw)
    }

    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    /// Name without trailing padding
    pub fn trimmed(&self) -> String {
        String::from_utf8_lossy(&self.0).trim_end().to_string()
    }

    /// Compare against a caller-supplied name, ignoring padding
    pub fn matches(&self, name: &str) -> bool {
        KeywordName::new(name).map(|n| n == *self).unwrap_or(false)
    }
}

impl fmt::Display for KeywordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.trimmed())
    }
}

impl fmt::Debug for KeywordName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl FromStr for KeywordName {
    type Err = EclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeywordName::new(s)
    }
}

impl PartialEq<str> for KeywordName {
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl PartialEq<&str> for KeywordName {
    fn eq(&self, other: &&str) -> bool {
        self.matches(other)
    }
}

/// The `(name, count, type)` triple of a keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeywordHeader {
    pub name: KeywordName,
    pub count: usize,
    pub data_type: DataType,
}

impl KeywordHeader {
    /// Size of the header record payload
    pub const SIZE: usize = NAME_LEN + 4 + TYPE_TAG_LEN;

    pub fn new(name: KeywordName, count: usize, data_type: DataType) -> Self {
        KeywordHeader {
            name,
            count,
            data_type,
        }
    }

    /// Parse a header record payload read at `offset`
    pub fn from_bytes(data: &[u8], endian: Endian, offset: u64) -> EclResult<Self> {
        if data.len() != Self::SIZE {
            return Err(EclError::bad_header(
                offset,
                format!("header record is {} bytes, expected {}", data.len(), Self::SIZE),
            ));
        }

        let mut raw = [0u8; NAME_LEN];
        raw.copy_from_slice(&data[0..NAME_LEN]);
        let name = KeywordName::from_raw(raw);

        let count = endian.read_i32(&data[NAME_LEN..NAME_LEN + 4]);
        if count < 0 {
            return Err(EclError::bad_header(
                offset,
                format!("negative element count {} for {}", count, name),
            ));
        }

        let tag = &data[NAME_LEN + 4..Self::SIZE];
        let data_type = DataType::from_tag(tag).ok_or_else(|| {
            EclError::bad_header(
                offset,
                format!("unknown type tag {:?} for {}", String::from_utf8_lossy(tag), name),
            )
        })?;

        Ok(KeywordHeader {
            name,
            count: count as usize,
            data_type,
        })
    }

    /// Serialize to a header record payload
    pub fn to_bytes(&self, endian: Endian) -> EclResult<[u8; Self::SIZE]> {
        let count = i32::try_from(self.count).map_err(|_| {
            EclError::InvalidValue(format!("{} elements do not fit a header", self.count))
        })?;

        let mut buf = [0u8; Self::SIZE];
        buf[0..NAME_LEN].copy_from_slice(self.name.as_bytes());
        endian.write_i32(&mut buf[NAME_LEN..NAME_LEN + 4], count);
        buf[NAME_LEN + 4..].copy_from_slice(&self.data_type.tag());
        Ok(buf)
    }

    /// Total payload bytes of the data records
    pub fn data_bytes(&self) -> usize {
        self.data_type.data_bytes(self.count)
    }

    /// Bytes the whole keyword occupies on disk, framing included
    pub fn fortio_size(&self) -> u64 {
        let framing = 2 * crate::storage::record::MARKER_SIZE;
        let records = self.data_type.record_count(self.count) as u64;
        (Self::SIZE as u64 + framing) + records * framing + self.data_bytes() as u64
    }
}

impl fmt::Display for KeywordHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8} {:>10} {}", self.name, self.count, self.data_type)
    }
}
