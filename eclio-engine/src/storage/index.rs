//! Sidecar index: the header/offset table of a scanned keyword file
//!
//! Layout (little-endian, independent of the data file's byte order):
//! - Bytes 0-3: signature `EKIX`
//! - Bytes 4-5: format version
//! - Byte 6: data file byte order (0 = big, 1 = little)
//! - Byte 7: reserved
//! - Bytes 8-15: data file length at the time of the scan
//! - u32 length + UTF-8 file name of the data file
//! - u32 entry count, then per entry: name (8), count (u32), tag (4),
//!   offset (u64)

use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{EclError, EclResult};
use crate::storage::data_type::{DataType, TYPE_TAG_LEN};
use crate::storage::header::{KeywordHeader, KeywordName, NAME_LEN};
use crate::storage::record::Endian;

/// One keyword's header and the byte offset of its header record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub header: KeywordHeader,
    pub offset: u64,
}

/// Persisted scan result of one data file
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordIndex {
    pub endian: Endian,
    pub source_name: String,
    pub source_len: u64,
    pub entries: Vec<IndexEntry>,
}

impl KeywordIndex {
    pub const SIGNATURE: [u8; 4] = *b"EKIX";
    pub const VERSION: u16 = 1;

    const ENTRY_SIZE: usize = NAME_LEN + 4 + TYPE_TAG_LEN + 8;

    pub fn new(endian: Endian, source_name: &str, source_len: u64, entries: Vec<IndexEntry>) -> Self {
        KeywordIndex {
            endian,
            source_name: source_name.to_string(),
            source_len,
            entries,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let name = self.source_name.as_bytes();
        let mut buf = Vec::with_capacity(24 + name.len() + self.entries.len() * Self::ENTRY_SIZE);

        buf.extend_from_slice(&Self::SIGNATURE);
        buf.extend_from_slice(&Self::VERSION.to_le_bytes());
        buf.push(match self.endian {
            Endian::Big => 0,
            Endian::Little => 1,
        });
        buf.push(0);
        buf.extend_from_slice(&self.source_len.to_le_bytes());
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(name);
        buf.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());

        for entry in &self.entries {
            buf.extend_from_slice(entry.header.name.as_bytes());
            buf.extend_from_slice(&(entry.header.count as u32).to_le_bytes());
            buf.extend_from_slice(&entry.header.data_type.tag());
            buf.extend_from_slice(&entry.offset.to_le_bytes());
        }
        buf
    }

    pub fn from_bytes(data: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);

        let mut signature = [0u8; 4];
        cursor.read_exact(&mut signature)?;
        if signature != Self::SIGNATURE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "Invalid index signature"));
        }

        let version = cursor.read_u16::<LittleEndian>()?;
        if version != Self::VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported index version {}", version),
            ));
        }

        let endian = match cursor.read_u8()? {
            0 => Endian::Big,
            1 => Endian::Little,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid byte order flag {}", other),
                ))
            }
        };
        let _reserved = cursor.read_u8()?;
        let source_len = cursor.read_u64::<LittleEndian>()?;

        let name_len = cursor.read_u32::<LittleEndian>()? as usize;
        if name_len > data.len().saturating_sub(cursor.position() as usize) {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "Index file name truncated"));
        }
        let mut name = vec![0u8; name_len];
        cursor.read_exact(&mut name)?;
        let source_name = String::from_utf8_lossy(&name).to_string();

        let entry_count = cursor.read_u32::<LittleEndian>()? as usize;
        let remaining = data.len().saturating_sub(cursor.position() as usize);
        if remaining < entry_count * Self::ENTRY_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "Index entries truncated"));
        }

        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let mut raw = [0u8; NAME_LEN];
            cursor.read_exact(&mut raw)?;
            let count = cursor.read_u32::<LittleEndian>()? as usize;
            let mut tag = [0u8; TYPE_TAG_LEN];
            cursor.read_exact(&mut tag)?;
            let data_type = DataType::from_tag(&tag).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "Invalid type tag in index")
            })?;
            let offset = cursor.read_u64::<LittleEndian>()?;

            entries.push(IndexEntry {
                header: KeywordHeader::new(KeywordName::from_raw(raw), count, data_type),
                offset,
            });
        }

        Ok(KeywordIndex {
            endian,
            source_name,
            source_len,
            entries,
        })
    }

    pub fn write_to(&self, path: &Path) -> EclResult<()> {
        let mut file = fs::File::create(path).map_err(|e| EclError::from_open(e, path))?;
        file.write_all(&self.to_bytes())?;
        file.sync_all()?;
        tracing::debug!("Wrote index {:?} with {} entries", path, self.entries.len());
        Ok(())
    }

    /// Read an index and check that it still describes `data_path`.
    ///
    /// The index is stale when the data file was modified after it, when
    /// it was built for a file of another name, or when the recorded
    /// length no longer matches.
    pub fn read_for(index_path: &Path, data_path: &Path) -> EclResult<Self> {
        let stale = |reason: String| EclError::StaleIndex {
            path: index_path.to_path_buf(),
            reason,
        };

        let bytes = fs::read(index_path).map_err(|e| EclError::from_open(e, index_path))?;
        let index = KeywordIndex::from_bytes(&bytes).map_err(|e| stale(e.to_string()))?;

        let data_meta = fs::metadata(data_path).map_err(|e| EclError::from_open(e, data_path))?;
        let index_meta = fs::metadata(index_path)?;
        if let (Ok(data_time), Ok(index_time)) = (data_meta.modified(), index_meta.modified()) {
            if data_time > index_time {
                return Err(stale("data file is newer than the index".to_string()));
            }
        }

        let data_name = data_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if data_name != index.source_name {
            return Err(stale(format!(
                "index describes {:?}, not {:?}",
                index.source_name, data_name
            )));
        }

        if data_meta.len() != index.source_len {
            return Err(stale(format!(
                "data file is {} bytes, index recorded {}",
                data_meta.len(),
                index.source_len
            )));
        }

        Ok(index)
    }
}
