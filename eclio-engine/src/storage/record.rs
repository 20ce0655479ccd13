//! Fortran sequential-record framing
//!
//! Every physical record on disk is laid out as
//! `[i32 length][length bytes][i32 length]`, with both length fields in the
//! byte order of the file. There is no record directory: the only way to
//! reach record N is to walk the chain or to seek to an offset remembered
//! from an earlier walk.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{EclError, EclResult};

/// Size of one record length marker
pub const MARKER_SIZE: u64 = 4;

/// Byte order of a file (applies to frame markers and payload values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    /// Simulator default
    #[default]
    Big,
    Little,
}

impl Endian {
    pub fn read_i32(&self, buf: &[u8]) -> i32 {
        match self {
            Endian::Big => BigEndian::read_i32(buf),
            Endian::Little => LittleEndian::read_i32(buf),
        }
    }

    pub fn read_f32(&self, buf: &[u8]) -> f32 {
        match self {
            Endian::Big => BigEndian::read_f32(buf),
            Endian::Little => LittleEndian::read_f32(buf),
        }
    }

    pub fn read_f64(&self, buf: &[u8]) -> f64 {
        match self {
            Endian::Big => BigEndian::read_f64(buf),
            Endian::Little => LittleEndian::read_f64(buf),
        }
    }

    pub fn write_i32(&self, buf: &mut [u8], value: i32) {
        match self {
            Endian::Big => BigEndian::write_i32(buf, value),
            Endian::Little => LittleEndian::write_i32(buf, value),
        }
    }

    pub fn write_f32(&self, buf: &mut [u8], value: f32) {
        match self {
            Endian::Big => BigEndian::write_f32(buf, value),
            Endian::Little => LittleEndian::write_f32(buf, value),
        }
    }

    pub fn write_f64(&self, buf: &mut [u8], value: f64) {
        match self {
            Endian::Big => BigEndian::write_f64(buf, value),
            Endian::Little => LittleEndian::write_f64(buf, value),
        }
    }
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endian::Big => f.write_str("big"),
            Endian::Little => f.write_str("little"),
        }
    }
}

/// Framed record reader/writer over any seekable byte stream
pub struct RecordStream<F = File> {
    inner: F,
    endian: Endian,
    writable: bool,
    path: Option<PathBuf>,
}

impl RecordStream<File> {
    /// Open an existing file for reading.
    ///
    /// With `endian == None` the byte order is detected from the first
    /// record; a file where neither byte order yields a consistent frame is
    /// rejected with `NotThisFormat`.
    pub fn open_read(path: &Path, endian: Option<Endian>) -> EclResult<Self> {
        let file = File::open(path).map_err(|e| EclError::from_open(e, path))?;
        Self::from_file(file, path, endian, false)
    }

    /// Open an existing file for reading and in-place rewriting
    pub fn open_read_write(path: &Path, endian: Option<Endian>) -> EclResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| EclError::from_open(e, path))?;
        Self::from_file(file, path, endian, true)
    }

    /// Create a file for writing.
    ///
    /// An existing file is truncated when `overwrite` is set and refused
    /// with `PermissionDenied` otherwise.
    pub fn open_write(path: &Path, overwrite: bool, endian: Endian) -> EclResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let file = options.open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                EclError::PermissionDenied(path.to_path_buf())
            } else {
                EclError::from_open(e, path)
            }
        })?;

        let mut stream = RecordStream::new(file, endian, true);
        stream.path = Some(path.to_path_buf());
        Ok(stream)
    }

    fn from_file(
        mut file: File,
        path: &Path,
        endian: Option<Endian>,
        writable: bool,
    ) -> EclResult<Self> {
        let endian = match endian {
            Some(endian) => endian,
            None => detect_endian(&mut file)?
                .ok_or_else(|| EclError::NotThisFormat(path.to_path_buf()))?,
        };
        tracing::debug!("Opened {:?} as {}-endian record stream", path, endian);

        let mut stream = RecordStream::new(file, endian, writable);
        stream.path = Some(path.to_path_buf());
        Ok(stream)
    }

    /// Flush pending writes to disk and release the file handle
    pub fn close(mut self) -> EclResult<()> {
        if self.writable {
            self.inner.flush()?;
            self.inner.sync_all()?;
        }
        Ok(())
    }
}

impl<F: Read + Write + Seek> RecordStream<F> {
    /// Wrap an already open stream positioned at a record boundary
    pub fn new(inner: F, endian: Endian, writable: bool) -> Self {
        RecordStream {
            inner,
            endian,
            writable,
            path: None,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read one physical record and return its payload
    pub fn read_record(&mut self) -> EclResult<Bytes> {
        let offset = self.tell()?;
        let length = self.read_leading(offset)?;
        self.check_extent(offset, length)?;

        let mut payload = BytesMut::zeroed(length as usize);
        self.inner.read_exact(&mut payload).map_err(|e| truncated(e, offset))?;

        self.read_trailing(offset, length)?;
        Ok(payload.freeze())
    }

    /// Skip over one physical record, validating its framing.
    ///
    /// Returns the payload length.
    pub fn skip_record(&mut self) -> EclResult<u32> {
        let offset = self.tell()?;
        let length = self.read_leading(offset)?;
        self.check_extent(offset, length)?;
        self.inner.seek(SeekFrom::Start(offset + MARKER_SIZE + length as u64))?;

        self.read_trailing(offset, length)?;
        Ok(length)
    }

    /// Write one physical record in the stream's byte order
    pub fn write_record(&mut self, payload: &[u8]) -> EclResult<()> {
        if !self.writable {
            return Err(EclError::NotWritable);
        }
        let length = i32::try_from(payload.len()).map_err(|_| {
            EclError::InvalidValue(format!("record of {} bytes exceeds frame limit", payload.len()))
        })?;

        let mut marker = [0u8; MARKER_SIZE as usize];
        self.endian.write_i32(&mut marker, length);

        self.inner.write_all(&marker)?;
        self.inner.write_all(payload)?;
        self.inner.write_all(&marker)?;
        Ok(())
    }

    /// Current byte offset
    pub fn tell(&mut self) -> EclResult<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Move to an absolute byte offset (must be a record boundary)
    pub fn seek(&mut self, offset: u64) -> EclResult<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Check if the cursor sits at the end of the stream
    pub fn at_eof(&mut self) -> EclResult<bool> {
        let pos = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(pos >= end)
    }

    /// Total byte length of the stream
    pub fn stream_len(&mut self) -> EclResult<u64> {
        let pos = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }

    pub fn flush(&mut self) -> EclResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Get mutable reference to the underlying stream
    pub fn get_mut(&mut self) -> &mut F {
        &mut self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }

    fn read_leading(&mut self, offset: u64) -> EclResult<u32> {
        let mut marker = [0u8; MARKER_SIZE as usize];
        let got = read_full(&mut self.inner, &mut marker)?;
        if got == 0 {
            return Err(EclError::Eof);
        }
        if got < marker.len() {
            return Err(EclError::Truncated { offset });
        }

        let length = self.endian.read_i32(&marker);
        if length < 0 {
            return Err(EclError::NegativeLength { offset, length });
        }
        Ok(length as u32)
    }

    /// A record of `length` bytes at `offset` must end inside the stream
    fn check_extent(&mut self, offset: u64, length: u32) -> EclResult<()> {
        let end = self.stream_len()?;
        if offset + 2 * MARKER_SIZE + length as u64 > end {
            self.inner.seek(SeekFrom::Start(offset))?;
            return Err(EclError::Truncated { offset });
        }
        Ok(())
    }

    fn read_trailing(&mut self, offset: u64, length: u32) -> EclResult<()> {
        let mut marker = [0u8; MARKER_SIZE as usize];
        self.inner.read_exact(&mut marker).map_err(|e| truncated(e, offset))?;

        let trailing = self.endian.read_i32(&marker);
        if trailing != length as i32 {
            tracing::warn!(
                "Record framing mismatch at offset {}: {} != {}",
                offset,
                length,
                trailing
            );
            return Err(EclError::Corrupt {
                offset,
                leading: length as i32,
                trailing,
            });
        }
        Ok(())
    }
}

/// Guess the byte order of a stream from its first record.
///
/// Returns `Ok(None)` when neither byte order yields a plausible frame. An
/// empty stream is accepted with the default byte order. The stream is
/// rewound to the start either way.
pub fn detect_endian<F: Read + Seek>(inner: &mut F) -> EclResult<Option<Endian>> {
    let end = inner.seek(SeekFrom::End(0))?;
    inner.seek(SeekFrom::Start(0))?;
    if end == 0 {
        return Ok(Some(Endian::default()));
    }
    if end < 2 * MARKER_SIZE {
        return Ok(None);
    }

    let mut leading = [0u8; MARKER_SIZE as usize];
    inner.read_exact(&mut leading)?;

    let mut detected = None;
    for endian in [Endian::Big, Endian::Little] {
        let length = endian.read_i32(&leading);
        if length <= 0 || length as u64 + 2 * MARKER_SIZE > end {
            continue;
        }

        inner.seek(SeekFrom::Start(MARKER_SIZE + length as u64))?;
        let mut trailing = [0u8; MARKER_SIZE as usize];
        inner.read_exact(&mut trailing)?;
        if trailing == leading {
            detected = Some(endian);
            break;
        }
    }

    inner.seek(SeekFrom::Start(0))?;
    Ok(detected)
}

/// Cheap probe: does the file start with a well-formed record?
pub fn is_record_file(path: &Path) -> bool {
    match File::open(path) {
        Ok(mut file) => matches!(detect_endian(&mut file), Ok(Some(_))),
        Err(_) => false,
    }
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn truncated(err: io::Error, offset: u64) -> EclError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        EclError::Truncated { offset }
    } else {
        EclError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn memory_stream(endian: Endian) -> RecordStream<Cursor<Vec<u8>>> {
        RecordStream::new(Cursor::new(Vec::new()), endian, true)
    }

    #[test]
    fn test_record_roundtrip_both_orders() {
        for endian in [Endian::Big, Endian::Little] {
            let mut stream = memory_stream(endian);
            stream.write_record(b"HELLO").unwrap();
            stream.write_record(&[]).unwrap();
            stream.write_record(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

            stream.seek(0).unwrap();
            assert_eq!(&stream.read_record().unwrap()[..], b"HELLO");
            assert!(stream.read_record().unwrap().is_empty());
            assert_eq!(&stream.read_record().unwrap()[..], &[1, 2, 3, 4, 5, 6, 7, 8]);
            assert!(matches!(stream.read_record(), Err(EclError::Eof)));
        }
    }

    #[test]
    fn test_frame_layout_is_bit_exact() {
        let mut stream = memory_stream(Endian::Big);
        stream.write_record(b"AB").unwrap();
        let bytes = stream.into_inner().into_inner();
        assert_eq!(bytes, vec![0, 0, 0, 2, b'A', b'B', 0, 0, 0, 2]);

        let mut stream = memory_stream(Endian::Little);
        stream.write_record(b"AB").unwrap();
        let bytes = stream.into_inner().into_inner();
        assert_eq!(bytes, vec![2, 0, 0, 0, b'A', b'B', 2, 0, 0, 0]);
    }

    #[test]
    fn test_flipped_trailing_marker_is_corrupt() {
        let mut stream = memory_stream(Endian::Big);
        stream.write_record(b"PAYLOAD!").unwrap();
        let mut bytes = stream.into_inner().into_inner();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let mut stream = RecordStream::new(Cursor::new(bytes.clone()), Endian::Big, false);
        let err = stream.read_record().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert!(matches!(err, EclError::Corrupt { offset: 0, leading: 8, trailing: 9 }));

        let mut stream = RecordStream::new(Cursor::new(bytes), Endian::Big, false);
        assert_eq!(stream.skip_record().unwrap_err().kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn test_truncated_record() {
        let bytes = vec![0, 0, 0, 16, 1, 2, 3];
        let mut stream = RecordStream::new(Cursor::new(bytes.clone()), Endian::Big, false);
        assert!(matches!(stream.read_record(), Err(EclError::Truncated { offset: 0 })));

        let mut stream = RecordStream::new(Cursor::new(bytes), Endian::Big, false);
        assert!(matches!(stream.skip_record(), Err(EclError::Truncated { offset: 0 })));

        let mut stream = RecordStream::new(Cursor::new(vec![0, 0]), Endian::Big, false);
        assert!(matches!(stream.read_record(), Err(EclError::Truncated { offset: 0 })));
    }

    #[test]
    fn test_oversized_leading_length() {
        let mut bytes = vec![0x7F, 0xFF, 0xFF, 0xFF];
        bytes.extend_from_slice(&[0u8; 12]);
        let mut stream = RecordStream::new(Cursor::new(bytes), Endian::Big, false);
        assert!(matches!(stream.read_record(), Err(EclError::Truncated { offset: 0 })));
        assert_eq!(stream.tell().unwrap(), 0);
    }

    #[test]
    fn test_negative_length() {
        let bytes = vec![0xFF, 0xFF, 0xFF, 0xF0, 0, 0, 0, 0];
        let mut stream = RecordStream::new(Cursor::new(bytes), Endian::Big, false);
        assert!(matches!(
            stream.read_record(),
            Err(EclError::NegativeLength { offset: 0, length: -16 })
        ));
    }

    #[test]
    fn test_skip_and_tell() {
        let mut stream = memory_stream(Endian::Little);
        stream.write_record(&[0u8; 10]).unwrap();
        stream.write_record(b"NEXT").unwrap();

        stream.seek(0).unwrap();
        assert_eq!(stream.skip_record().unwrap(), 10);
        assert_eq!(stream.tell().unwrap(), 18);
        assert_eq!(&stream.read_record().unwrap()[..], b"NEXT");
        assert!(stream.at_eof().unwrap());
    }

    #[test]
    fn test_read_only_stream_rejects_writes() {
        let mut stream = RecordStream::new(Cursor::new(Vec::new()), Endian::Big, false);
        assert!(matches!(stream.write_record(b"X"), Err(EclError::NotWritable)));
    }

    #[test]
    fn test_detect_endian_from_file() {
        let dir = tempdir().unwrap();
        for endian in [Endian::Big, Endian::Little] {
            let path = dir.path().join(format!("{}.bin", endian));
            let mut stream = RecordStream::open_write(&path, true, endian).unwrap();
            stream.write_record(&[7u8; 16]).unwrap();
            stream.close().unwrap();

            let stream = RecordStream::open_read(&path, None).unwrap();
            assert_eq!(stream.endian(), endian);
            assert!(is_record_file(&path));
        }
    }

    #[test]
    fn test_detect_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.txt");
        std::fs::write(&path, b"this is certainly not a record file").unwrap();

        let err = RecordStream::open_read(&path, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotThisFormat);
        assert!(!is_record_file(&path));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let err = RecordStream::open_read(&dir.path().join("missing"), None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_open_write_without_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exists.bin");
        std::fs::write(&path, b"").unwrap();

        let err = RecordStream::open_write(&path, false, Endian::Big).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(RecordStream::open_write(&path, true, Endian::Big).is_ok());
    }
}
