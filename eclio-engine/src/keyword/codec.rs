//! Keyword <-> record conversion
//!
//! A keyword is one 16-byte header record followed by its elements split
//! into data records of at most `block_size` elements each. Decoding keeps
//! pulling data records until exactly `count * element_size` payload bytes
//! have been collected.

use std::io::{Read, Seek, Write};

use bytes::{Bytes, BytesMut};

use super::{Keyword, KeywordData, BOOL_FALSE_INT, BOOL_TRUE_INT};
use crate::error::{EclError, EclResult};
use crate::storage::data_type::DataType;
use crate::storage::header::KeywordHeader;
use crate::storage::record::{Endian, RecordStream, MARKER_SIZE};

impl Keyword {
    /// Read one complete keyword at the stream's current position.
    ///
    /// Returns `Eof` only when the stream is exhausted before the header.
    pub fn decode<F: Read + Write + Seek>(stream: &mut RecordStream<F>) -> EclResult<Keyword> {
        let (header, offset) = Self::decode_header(stream)?;
        let data = Self::decode_data(stream, &header, offset)?;
        Ok(Keyword::from_parts(header, data))
    }

    /// Read a header record; returns the header and its byte offset
    pub fn decode_header<F: Read + Write + Seek>(
        stream: &mut RecordStream<F>,
    ) -> EclResult<(KeywordHeader, u64)> {
        let offset = stream.tell()?;
        let record = stream.read_record()?;
        let header = KeywordHeader::from_bytes(&record, stream.endian(), offset)?;
        tracing::trace!("Header at {}: {}", offset, header);
        Ok((header, offset))
    }

    /// Read the data records following `header`
    pub fn decode_data<F: Read + Write + Seek>(
        stream: &mut RecordStream<F>,
        header: &KeywordHeader,
        offset: u64,
    ) -> EclResult<KeywordData> {
        let expected = header.data_bytes();
        let start = stream.tell()?;
        let available = stream.stream_len()?.saturating_sub(start);
        let framing = if expected > 0 { 2 * MARKER_SIZE } else { 0 };
        if expected as u64 + framing > available {
            tracing::warn!(
                "{} declares {} data bytes but only {} remain after offset {}",
                header.name,
                expected,
                available,
                offset
            );
            return Err(EclError::Truncated { offset });
        }
        let mut payload = BytesMut::with_capacity(expected);

        while payload.len() < expected {
            let record = stream.read_record().map_err(|e| eof_as_truncated(e, offset))?;
            if payload.len() + record.len() > expected {
                return Err(EclError::bad_header(
                    offset,
                    format!(
                        "data records of {} exceed the declared {} bytes",
                        header.name, expected
                    ),
                ));
            }
            payload.extend_from_slice(&record);
        }

        Ok(elements_from_bytes(header.data_type, &payload, stream.endian()))
    }

    /// Skip the data records following `header` without decoding them
    pub fn skip_data<F: Read + Write + Seek>(
        stream: &mut RecordStream<F>,
        header: &KeywordHeader,
        offset: u64,
    ) -> EclResult<()> {
        let expected = header.data_bytes();
        let mut seen = 0usize;

        while seen < expected {
            let length = stream.skip_record().map_err(|e| eof_as_truncated(e, offset))? as usize;
            if seen + length > expected {
                return Err(EclError::bad_header(
                    offset,
                    format!(
                        "data records of {} exceed the declared {} bytes",
                        header.name, expected
                    ),
                ));
            }
            seen += length;
        }
        Ok(())
    }

    /// Header record followed by the chunked data records
    pub fn encode_records(&self, endian: Endian) -> EclResult<Vec<Bytes>> {
        let mut records = Vec::with_capacity(1 + self.data_type().record_count(self.count()));
        records.push(Bytes::copy_from_slice(&self.header().to_bytes(endian)?));

        let block = self.data_type().block_size();
        let mut start = 0;
        while start < self.count() && self.data_type().element_size() > 0 {
            let end = (start + block).min(self.count());
            records.push(Bytes::from(self.element_bytes(start..end, endian)));
            start = end;
        }
        Ok(records)
    }

    /// Write the keyword at the stream's current position
    pub fn encode<F: Read + Write + Seek>(&self, stream: &mut RecordStream<F>) -> EclResult<()> {
        for record in self.encode_records(stream.endian())? {
            stream.write_record(&record)?;
        }
        Ok(())
    }

    /// Exact on-disk size of the keyword, framing included
    pub fn fortio_size(&self) -> u64 {
        self.header().fortio_size()
    }

    fn element_bytes(&self, range: std::ops::Range<usize>, endian: Endian) -> Vec<u8> {
        let size = self.data_type().element_size();
        let mut buf = vec![0u8; range.len() * size];

        match self.data() {
            KeywordData::Int(v) => {
                for (chunk, value) in buf.chunks_exact_mut(4).zip(&v[range]) {
                    endian.write_i32(chunk, *value);
                }
            }
            KeywordData::Float(v) => {
                for (chunk, value) in buf.chunks_exact_mut(4).zip(&v[range]) {
                    endian.write_f32(chunk, *value);
                }
            }
            KeywordData::Double(v) => {
                for (chunk, value) in buf.chunks_exact_mut(8).zip(&v[range]) {
                    endian.write_f64(chunk, *value);
                }
            }
            KeywordData::Bool(v) => {
                for (chunk, value) in buf.chunks_exact_mut(4).zip(&v[range]) {
                    endian.write_i32(chunk, if *value { BOOL_TRUE_INT } else { BOOL_FALSE_INT });
                }
            }
            KeywordData::Alpha(bytes) => {
                buf.copy_from_slice(&bytes[range.start * size..range.end * size]);
            }
            KeywordData::Message => {}
        }
        buf
    }
}

fn elements_from_bytes(data_type: DataType, payload: &[u8], endian: Endian) -> KeywordData {
    match data_type {
        DataType::Int => KeywordData::Int(payload.chunks_exact(4).map(|c| endian.read_i32(c)).collect()),
        DataType::Float => {
            KeywordData::Float(payload.chunks_exact(4).map(|c| endian.read_f32(c)).collect())
        }
        DataType::Double => {
            KeywordData::Double(payload.chunks_exact(8).map(|c| endian.read_f64(c)).collect())
        }
        DataType::Bool => {
            KeywordData::Bool(payload.chunks_exact(4).map(|c| endian.read_i32(c) != 0).collect())
        }
        DataType::Char | DataType::String(_) => KeywordData::Alpha(payload.to_vec()),
        DataType::Message => KeywordData::Message,
    }
}

/// A keyword cut off by end of file is a broken file, not a clean end
fn eof_as_truncated(err: EclError, offset: u64) -> EclError {
    match err {
        EclError::Eof => {
            tracing::warn!("Keyword at offset {} is cut short by end of file", offset);
            EclError::Truncated { offset }
        }
        other => other,
    }
}
