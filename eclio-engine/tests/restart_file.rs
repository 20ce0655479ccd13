//! End-to-end behaviour of restart files on disk

use std::fs;
use std::path::{Path, PathBuf};

use eclio_engine::file_manager::Window;
use eclio_engine::{
    write_keywords, DataType, EclError, Endian, ErrorKind, Keyword, KeywordFile, KeywordHeader,
    KeywordName, OpenMode, RecordStream, Selection, Value,
};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, endian: Endian, keywords: &[Keyword]) -> PathBuf {
    let path = dir.join(name);
    write_keywords(&path, endian, keywords).unwrap();
    path
}

/// SEQNUM=5 at position 0, SEQNUM=7 at position 20, 35 keywords in total
fn two_sections() -> Vec<Keyword> {
    let mut keywords = Vec::new();
    keywords.push(Keyword::from_ints("SEQNUM", vec![5]).unwrap());
    for i in 1..20 {
        keywords.push(Keyword::from_floats("PRESSURE", vec![i as f32; 10]).unwrap());
    }
    keywords.push(Keyword::from_ints("SEQNUM", vec![7]).unwrap());
    for i in 21..35 {
        keywords.push(Keyword::from_floats("PRESSURE", vec![i as f32; 10]).unwrap());
    }
    keywords
}

#[test]
fn roundtrip_across_chunk_boundaries() {
    let dir = tempdir().unwrap();
    let mut keywords = Vec::new();
    for count in [0usize, 1, 1000, 1001, 2001] {
        keywords.push(Keyword::from_ints("INTS", (0..count as i32).collect()).unwrap());
        keywords.push(Keyword::from_floats("REALS", vec![1.5; count]).unwrap());
        keywords.push(Keyword::from_doubles("DOUBS", vec![-2.25; count]).unwrap());
        keywords.push(Keyword::from_bools("LOGIS", (0..count).map(|i| i % 3 == 0).collect()).unwrap());
    }
    let names: Vec<String> = (0..211).map(|i| format!("N{}", i)).collect();
    keywords.push(Keyword::from_strings("NAMES", &names).unwrap());
    keywords.push(Keyword::from_strings_with_width("LONGNAME", 40, &names).unwrap());
    keywords.push(Keyword::message("STARTSOL").unwrap());

    for endian in [Endian::Big, Endian::Little] {
        let path = write(dir.path(), &format!("RT_{}.UNRST", endian), endian, &keywords);
        let file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();
        assert_eq!(file.size(), keywords.len());
        for (position, expected) in keywords.iter().enumerate() {
            assert_eq!(file.get(position).unwrap(), expected);
        }
    }
}

#[test]
fn flipped_trailing_length_fails_open() {
    let dir = tempdir().unwrap();
    let keywords = vec![
        Keyword::from_ints("SEQNUM", vec![1]).unwrap(),
        Keyword::from_floats("PRESSURE", vec![1.0; 50]).unwrap(),
    ];
    let path = write(dir.path(), "BROKEN.UNRST", Endian::Big, &keywords);

    let mut bytes = fs::read(&path).unwrap();
    // trailing marker of the PRESSURE data record is the last four bytes
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    let err = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    assert!(err.kind().is_fatal());
}

#[test]
fn windowing_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "CASE.UNRST", Endian::Big, &two_sections());
    let mut file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();

    file.select_window(Selection::ReportStep(5)).unwrap();
    let first = (file.window(), file.size());
    file.select_window(Selection::Global).unwrap();
    assert_eq!(file.size(), 35);
    file.select_window(Selection::ReportStep(5)).unwrap();
    assert_eq!((file.window(), file.size()), first);
}

#[test]
fn name_index_is_complete() {
    let dir = tempdir().unwrap();
    let keywords = vec![
        Keyword::from_ints("SEQNUM", vec![1]).unwrap(),
        Keyword::from_floats("PRESSURE", vec![1.0]).unwrap(),
        Keyword::from_ints("SEQNUM", vec![2]).unwrap(),
        Keyword::from_floats("PRESSURE", vec![2.0]).unwrap(),
    ];
    let path = write(dir.path(), "NAMES.UNRST", Endian::Little, &keywords);
    let file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();

    assert_eq!(file.count_named("SEQNUM"), 2);
    let second = file.get_named("PRESSURE", 1).unwrap();
    assert_eq!(second, file.get(3).unwrap());
    assert_eq!(second.get(0).unwrap(), Value::Float(2.0));
    assert_eq!(file.report_steps().len(), 2);
}

#[test]
fn replace_with_wrong_count_leaves_bytes_unchanged() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "EDIT.UNRST", Endian::Big, &two_sections());
    let original = fs::read(&path).unwrap();

    let mut file = KeywordFile::open(&path, OpenMode::read_write(), None).unwrap();
    let old = file.get(3).unwrap().clone();
    let longer = Keyword::zeroed("PRESSURE", old.count() + 1, DataType::Float).unwrap();
    let err = file.replace(&old, longer).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HeaderMismatch);

    let retyped = Keyword::zeroed("PRESSURE", old.count(), DataType::Double).unwrap();
    assert!(matches!(file.replace(&old, retyped), Err(EclError::HeaderMismatch { .. })));
    file.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), original);
    let reread = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();
    assert_eq!(reread.get(3).unwrap(), &old);
}

#[test]
fn report_step_selection_end_to_end() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "E2E.UNRST", Endian::Big, &two_sections());
    let mut file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();

    file.select_window(Selection::ReportStep(7)).unwrap();
    assert_eq!(file.window(), Window::new(20, 35));
    assert_eq!(file.size(), 15);
    assert_eq!(file.get(0).unwrap().get(0).unwrap(), Value::Int(7));

    let err = file.select_window(Selection::ReportStep(99)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SectionNotFound);
    assert_eq!(file.window(), Window::new(20, 35));
    assert_eq!(file.size(), 15);
}

#[test]
fn partial_trailing_keyword_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("CUT.UNRST");
    let mut stream = RecordStream::open_write(&path, true, Endian::Big).unwrap();
    Keyword::from_ints("SEQNUM", vec![1]).unwrap().encode(&mut stream).unwrap();
    let header = Keyword::from_floats("PRESSURE", vec![0.0; 10]).unwrap();
    stream.write_record(&header.header().to_bytes(Endian::Big).unwrap()).unwrap();
    stream.close().unwrap();

    let err = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap_err();
    assert!(matches!(err, EclError::Truncated { .. }));
}

#[test]
fn lazy_modification_roundtrip() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "LAZY.UNRST", Endian::Little, &two_sections());

    let mut file = KeywordFile::open(&path, OpenMode::read_write().with_lazy(true), None).unwrap();
    file.select_window(Selection::ReportStep(7)).unwrap();
    let mut pressure = file.get_named("PRESSURE", 0).unwrap().clone();
    pressure.mul_scalar(Value::Int(2)).unwrap();
    file.save(&pressure).unwrap();
    file.close().unwrap();

    let file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();
    assert_eq!(file.get(21).unwrap().get(0).unwrap(), Value::Float(42.0));
}

#[test]
fn corrupt_leading_length_fails_open() {
    let dir = tempdir().unwrap();
    let keywords = vec![
        Keyword::from_ints("SEQNUM", vec![1]).unwrap(),
        Keyword::from_floats("PRESSURE", vec![1.0; 50]).unwrap(),
    ];
    let path = write(dir.path(), "LEAD.UNRST", Endian::Big, &keywords);

    // SEQNUM takes 36 bytes, the PRESSURE header 24: its data record starts at 60
    let mut bytes = fs::read(&path).unwrap();
    bytes[60..64].copy_from_slice(&196i32.to_be_bytes());
    fs::write(&path, &bytes).unwrap();

    let err = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap_err();
    assert!(matches!(err, EclError::Corrupt { offset: 60, leading: 196, .. }));

    let lazy = OpenMode::read_only().with_lazy(true);
    let err = KeywordFile::open(&path, lazy, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);

    bytes[60..64].copy_from_slice(&i32::MAX.to_be_bytes());
    fs::write(&path, &bytes).unwrap();
    let err = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap_err();
    assert!(matches!(err, EclError::Truncated { offset: 60 }));
}

#[test]
fn oversized_header_count_is_truncated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("HUGE.UNRST");
    let header = KeywordHeader::new(
        KeywordName::new("PRESSURE").unwrap(),
        i32::MAX as usize,
        DataType::Double,
    );
    let mut stream = RecordStream::open_write(&path, true, Endian::Big).unwrap();
    stream.write_record(&header.to_bytes(Endian::Big).unwrap()).unwrap();
    stream.write_record(&[0u8; 8]).unwrap();
    stream.close().unwrap();

    let err = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap_err();
    assert!(matches!(err, EclError::Truncated { offset: 0 }));
    assert!(err.kind().is_fatal());

    let lazy = OpenMode::read_only().with_lazy(true);
    let err = KeywordFile::open(&path, lazy, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
}

#[test]
fn string_width_stays_within_tag_range() {
    for width in [0, 100, 150] {
        let err = Keyword::from_strings_with_width("ZWEL", width, &["W"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert!(DataType::string(width).is_err());
    }

    let dir = tempdir().unwrap();
    let widest = Keyword::from_strings_with_width("ZWEL", 99, &["A", "B"]).unwrap();
    let narrow = Keyword::zeroed("ZNAME", 3, DataType::string(1).unwrap()).unwrap();
    let path = write(dir.path(), "WIDTH.UNRST", Endian::Little, &[widest.clone(), narrow.clone()]);

    let file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();
    assert_eq!(file.get(0).unwrap(), &widest);
    assert_eq!(file.get(1).unwrap(), &narrow);
    assert_eq!(file.header(0).unwrap().data_type.tag(), *b"C099");
}
