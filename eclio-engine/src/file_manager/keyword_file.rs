//! Keyword file - an indexed, windowed view over one framed keyword file
//!
//! Opening a file scans it once, front to back, recording every keyword's
//! header and byte offset. Keyword data is decoded during the scan unless a
//! name filter or lazy mode defers it, in which case the first access seeks
//! back to the remembered offset and caches the result.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::restart::{intehead_phases, intehead_simulator, Phases, RestartIndex, RestartSection, Simulator};
use super::window::{Selection, Window};
use crate::error::{EclError, EclResult};
use crate::keyword::Keyword;
use crate::storage::header::{KeywordHeader, KeywordName, DOUBHEAD_KW, INTEHEAD_KW, SEQNUM_KW};
use crate::storage::index::{IndexEntry, KeywordIndex};
use crate::storage::record::{Endian, RecordStream};

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

/// Keywords loaded regardless of filter or lazy mode
const RESTART_KEYWORDS: [&str; 3] = [SEQNUM_KW, INTEHEAD_KW, DOUBHEAD_KW];

/// How to open a keyword file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenMode {
    /// Allow in-place replacement of keywords
    pub writable: bool,
    /// Byte order; `None` detects it from the first record
    pub endian: Option<Endian>,
    /// Defer decoding keyword data until first access
    pub lazy: bool,
}

impl OpenMode {
    pub fn read_only() -> Self {
        OpenMode::default()
    }

    pub fn read_write() -> Self {
        OpenMode {
            writable: true,
            ..OpenMode::default()
        }
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = Some(endian);
        self
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }
}

/// Names whose data should be decoded at open
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    names: HashSet<KeywordName>,
}

impl NameFilter {
    pub fn new<I, S>(names: I) -> EclResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| KeywordName::new(n.as_ref()))
            .collect::<EclResult<HashSet<_>>>()?;
        Ok(NameFilter { names })
    }

    pub fn contains(&self, name: &KeywordName) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One keyword position: header and offset always, data once loaded
struct Slot {
    header: KeywordHeader,
    offset: u64,
    keyword: OnceLock<Keyword>,
}

/// An open keyword file
pub struct KeywordFile {
    id: u64,
    path: PathBuf,
    mode: OpenMode,
    stream: Mutex<RecordStream<File>>,
    slots: Vec<Slot>,
    /// Global positions per name, ascending
    names: HashMap<KeywordName, Vec<usize>>,
    restart: RestartIndex,
    window: Window,
    selection: Selection,
}

impl KeywordFile {
    /// Open and scan a keyword file.
    ///
    /// With a `filter`, only the named keywords (plus SEQNUM, INTEHEAD and
    /// DOUBHEAD) are decoded during the scan; the rest are loaded on first
    /// access. Broken framing anywhere in the file fails the open.
    pub fn open(path: &Path, mode: OpenMode, filter: Option<&NameFilter>) -> EclResult<Self> {
        let mut stream = if mode.writable {
            RecordStream::open_read_write(path, mode.endian)?
        } else {
            RecordStream::open_read(path, mode.endian)?
        };
        let id = NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed);

        let mut slots = Vec::new();
        loop {
            let (header, offset) = match Keyword::decode_header(&mut stream) {
                Ok(found) => found,
                Err(EclError::Eof) => break,
                Err(e) => return Err(e),
            };

            let position = slots.len();
            let wanted = is_restart_keyword(&header.name)
                || (!mode.lazy && filter.map_or(true, |f| f.contains(&header.name)));

            let keyword = OnceLock::new();
            if wanted {
                let data = Keyword::decode_data(&mut stream, &header, offset)?;
                let mut loaded = Keyword::from_parts(header, data);
                loaded.bind(id, position);
                let _ = keyword.set(loaded);
            } else {
                Keyword::skip_data(&mut stream, &header, offset)?;
            }

            slots.push(Slot {
                header,
                offset,
                keyword,
            });
        }

        tracing::debug!("Scanned {} keywords from {:?}", slots.len(), path);
        Ok(Self::assemble(id, path, mode, stream, slots))
    }

    /// Open using a sidecar index instead of scanning.
    ///
    /// Only the restart keywords are read at open; everything else is
    /// loaded on first access.
    pub fn open_with_index(path: &Path, index_path: &Path, mode: OpenMode) -> EclResult<Self> {
        let index = KeywordIndex::read_for(index_path, path)?;
        let endian = mode.endian.unwrap_or(index.endian);
        let stream = if mode.writable {
            RecordStream::open_read_write(path, Some(endian))?
        } else {
            RecordStream::open_read(path, Some(endian))?
        };
        let id = NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed);

        let slots = index
            .entries
            .iter()
            .map(|entry| Slot {
                header: entry.header,
                offset: entry.offset,
                keyword: OnceLock::new(),
            })
            .collect();

        let mut file = Self::assemble(id, path, mode, stream, slots);
        for position in 0..file.slots.len() {
            if is_restart_keyword(&file.slots[position].header.name) {
                file.load(position)?;
            }
        }
        file.rebuild_restart_index();

        tracing::debug!(
            "Opened {:?} from index {:?} ({} keywords)",
            path,
            index_path,
            file.slots.len()
        );
        Ok(file)
    }

    fn assemble(
        id: u64,
        path: &Path,
        mode: OpenMode,
        stream: RecordStream<File>,
        slots: Vec<Slot>,
    ) -> Self {
        let mut names: HashMap<KeywordName, Vec<usize>> = HashMap::new();
        for (position, slot) in slots.iter().enumerate() {
            names.entry(slot.header.name).or_default().push(position);
        }

        let mut file = KeywordFile {
            id,
            path: path.to_path_buf(),
            mode,
            stream: Mutex::new(stream),
            window: Window::global(slots.len()),
            slots,
            names,
            restart: RestartIndex::default(),
            selection: Selection::Global,
        };
        file.rebuild_restart_index();
        file
    }

    fn rebuild_restart_index(&mut self) {
        let keywords = self
            .slots
            .iter()
            .enumerate()
            .map(|(position, slot)| (position, slot.keyword.get()));
        self.restart = RestartIndex::build(keywords, self.slots.len());
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn endian(&self) -> Endian {
        self.stream.lock().endian()
    }

    /// Number of keywords in the active window
    pub fn size(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Number of keywords in the whole file
    pub fn global_size(&self) -> usize {
        self.slots.len()
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Number of keywords named `name` in the active window
    pub fn count_named(&self, name: &str) -> usize {
        self.window_positions(name).len()
    }

    pub fn has_kw(&self, name: &str) -> bool {
        self.count_named(name) > 0
    }

    /// Keyword at a window-relative position
    pub fn get(&self, position: usize) -> EclResult<&Keyword> {
        let global = self.to_global(position)?;
        self.load(global)
    }

    /// Header at a window-relative position, without loading data
    pub fn header(&self, position: usize) -> EclResult<&KeywordHeader> {
        let global = self.to_global(position)?;
        Ok(&self.slots[global].header)
    }

    /// The `occurrence`-th keyword named `name` in the active window
    pub fn get_named(&self, name: &str, occurrence: usize) -> EclResult<&Keyword> {
        let global = self.named_global(name, occurrence)?;
        self.load(global)
    }

    /// Occurrence number of the keyword at `position` among same-named
    /// keywords in the window
    pub fn occurrence_of(&self, position: usize) -> EclResult<usize> {
        let global = self.to_global(position)?;
        let name = self.slots[global].header.name;
        let positions = self.names.get(&name).map(Vec::as_slice).unwrap_or(&[]);
        let in_window = self.window.clip(positions);
        Ok(in_window.partition_point(|&p| p < global))
    }

    /// Distinct names in the window, in order of first appearance
    pub fn distinct_names(&self) -> Vec<KeywordName> {
        let mut seen = HashSet::new();
        self.slots[self.window.start..self.window.end]
            .iter()
            .map(|slot| slot.header.name)
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Keywords of the window in position order, loading as needed
    pub fn iter(&self) -> impl Iterator<Item = EclResult<&Keyword>> + '_ {
        (self.window.start..self.window.end).map(move |global| self.load(global))
    }

    /// Headers of the window in position order
    pub fn headers(&self) -> impl Iterator<Item = &KeywordHeader> + '_ {
        self.slots[self.window.start..self.window.end]
            .iter()
            .map(|slot| &slot.header)
    }

    /// Name/count/type listing of the window
    pub fn kw_list(&self) -> KeywordListing<'_> {
        KeywordListing { file: self }
    }

    /// Make `selection` the active window.
    ///
    /// Selection is always resolved against the whole file. On failure the
    /// current window is left as it was.
    pub fn select_window(&mut self, selection: Selection) -> EclResult<()> {
        let window = match &selection {
            Selection::Global => Some(Window::global(self.slots.len())),
            Selection::ReportStep(step) => section_window(self.restart.find_report_step(*step)),
            Selection::SimTime(time) => section_window(self.restart.find_sim_time(*time)),
            Selection::PositionIndex(index) => section_window(self.restart.section(*index)),
            Selection::BlockAt { name, occurrence } => self.block_window(name, *occurrence),
        }
        .ok_or_else(|| EclError::SectionNotFound(selection.to_string()))?;

        tracing::debug!(
            "Selected {} in {:?}: positions {}..{}",
            selection,
            self.path,
            window.start,
            window.end
        );
        self.window = window;
        self.selection = selection;
        Ok(())
    }

    fn block_window(&self, name: &str, occurrence: usize) -> Option<Window> {
        let name = KeywordName::new(name).ok()?;
        let positions = self.names.get(&name)?;
        let start = *positions.get(occurrence)?;
        let end = positions.get(occurrence + 1).copied().unwrap_or(self.slots.len());
        Some(Window::new(start, end))
    }

    /// Restart sections starting inside the active window
    fn window_sections(&self) -> impl Iterator<Item = &RestartSection> + '_ {
        self.restart
            .sections()
            .iter()
            .filter(move |s| self.window.contains(s.start))
    }

    pub fn has_report_step(&self, report_step: i32) -> bool {
        self.window_sections().any(|s| s.report_step == report_step)
    }

    pub fn has_sim_time(&self, time: NaiveDateTime) -> bool {
        self.window_sections().any(|s| s.sim_time == Some(time))
    }

    /// Report steps of the sections in the window
    pub fn report_steps(&self) -> Vec<i32> {
        self.window_sections().map(|s| s.report_step).collect()
    }

    pub fn report_dates(&self) -> Vec<NaiveDateTime> {
        self.window_sections().filter_map(|s| s.sim_time).collect()
    }

    pub fn restart_sections(&self) -> Vec<&RestartSection> {
        self.window_sections().collect()
    }

    /// Elapsed days of the `section`-th restart section in the window
    pub fn restart_sim_days(&self, section: usize) -> EclResult<f64> {
        self.restart_section(section)?
            .sim_days
            .ok_or_else(|| missing_keyword(DOUBHEAD_KW))
    }

    pub fn restart_sim_time(&self, section: usize) -> EclResult<NaiveDateTime> {
        self.restart_section(section)?
            .sim_time
            .ok_or_else(|| missing_keyword(INTEHEAD_KW))
    }

    fn restart_section(&self, section: usize) -> EclResult<&RestartSection> {
        self.window_sections()
            .nth(section)
            .ok_or_else(|| EclError::SectionNotFound(Selection::PositionIndex(section).to_string()))
    }

    /// Simulator recorded in the first INTEHEAD of the window
    pub fn simulator(&self) -> EclResult<Simulator> {
        let intehead = self.get_named(INTEHEAD_KW, 0)?;
        intehead_simulator(intehead).ok_or_else(|| short_intehead(intehead))
    }

    /// Active phases recorded in the first INTEHEAD of the window
    pub fn phases(&self) -> EclResult<Phases> {
        let intehead = self.get_named(INTEHEAD_KW, 0)?;
        intehead_phases(intehead).ok_or_else(|| short_intehead(intehead))
    }

    /// Force-load every keyword in the window
    pub fn load_all(&self) -> EclResult<()> {
        for global in self.window.start..self.window.end {
            self.load(global)?;
        }
        Ok(())
    }

    /// Overwrite the bytes of `old` in place with `new`.
    ///
    /// `old` must have been obtained from this file. The replacement must
    /// carry exactly the header on disk; nothing is written otherwise.
    pub fn replace(&mut self, old: &Keyword, mut new: Keyword) -> EclResult<()> {
        if !self.mode.writable {
            return Err(EclError::NotWritable);
        }

        let position = match old.binding() {
            Some(binding) if binding.file_id == self.id && binding.position < self.slots.len() => {
                binding.position
            }
            _ => {
                return Err(EclError::KeywordNotFound {
                    name: old.name().to_string(),
                    occurrence: 0,
                })
            }
        };

        let slot = &self.slots[position];
        if *new.header() != slot.header {
            return Err(EclError::HeaderMismatch {
                expected: slot.header.to_string(),
                found: new.header().to_string(),
            });
        }

        let offset = slot.offset;
        let stream = self.stream.get_mut();
        stream.seek(offset)?;
        new.encode(stream)?;
        stream.flush()?;
        tracing::trace!("Rewrote {} at offset {}", new.name(), offset);

        let restart_changed = is_restart_keyword(new.name());
        new.bind(self.id, position);
        self.slots[position].keyword = OnceLock::from(new);
        if restart_changed {
            self.rebuild_restart_index();
        }
        Ok(())
    }

    /// Write a modified copy of a keyword back to where it came from
    pub fn save(&mut self, keyword: &Keyword) -> EclResult<()> {
        self.replace(keyword, keyword.clone())
    }

    /// Persist the header/offset table next to the data file
    pub fn write_index(&self, index_path: &Path) -> EclResult<()> {
        let (endian, source_len) = {
            let mut stream = self.stream.lock();
            (stream.endian(), stream.stream_len()?)
        };
        let source_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let entries = self
            .slots
            .iter()
            .map(|slot| IndexEntry {
                header: slot.header,
                offset: slot.offset,
            })
            .collect();

        KeywordIndex::new(endian, &source_name, source_len, entries).write_to(index_path)
    }

    /// Release the file, flushing pending writes
    pub fn close(self) -> EclResult<()> {
        tracing::debug!("Closing {:?}", self.path);
        self.stream.into_inner().close()
    }

    fn load(&self, global: usize) -> EclResult<&Keyword> {
        let slot = &self.slots[global];
        if let Some(keyword) = slot.keyword.get() {
            return Ok(keyword);
        }

        let mut stream = self.stream.lock();
        if let Some(keyword) = slot.keyword.get() {
            return Ok(keyword);
        }

        stream.seek(slot.offset)?;
        let mut keyword = Keyword::decode(&mut *stream)?;
        if *keyword.header() != slot.header {
            return Err(EclError::bad_header(
                slot.offset,
                format!("expected {}, found {}", slot.header, keyword.header()),
            ));
        }
        keyword.bind(self.id, global);
        tracing::trace!("Loaded {} from offset {}", slot.header.name, slot.offset);
        Ok(slot.keyword.get_or_init(|| keyword))
    }

    fn to_global(&self, position: usize) -> EclResult<usize> {
        self.window.to_global(position).ok_or(EclError::IndexOutOfRange {
            index: position,
            len: self.window.len(),
        })
    }

    fn window_positions(&self, name: &str) -> &[usize] {
        let Ok(name) = KeywordName::new(name) else {
            return &[];
        };
        match self.names.get(&name) {
            Some(positions) => self.window.clip(positions),
            None => &[],
        }
    }

    fn named_global(&self, name: &str, occurrence: usize) -> EclResult<usize> {
        self.window_positions(name)
            .get(occurrence)
            .copied()
            .ok_or_else(|| EclError::KeywordNotFound {
                name: name.to_string(),
                occurrence,
            })
    }
}

impl fmt::Debug for KeywordFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordFile")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("keywords", &self.slots.len())
            .field("window", &self.window)
            .finish()
    }
}

/// Text listing of the keywords in a file's active window
pub struct KeywordListing<'a> {
    file: &'a KeywordFile,
}

impl fmt::Display for KeywordListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for header in self.file.headers() {
            writeln!(f, "{}", header)?;
        }
        Ok(())
    }
}

/// Write `keywords` in order to a fresh file
pub fn write_keywords<'a, I>(path: &Path, endian: Endian, keywords: I) -> EclResult<()>
where
    I: IntoIterator<Item = &'a Keyword>,
{
    let mut stream = RecordStream::open_write(path, true, endian)?;
    let mut written = 0usize;
    for keyword in keywords {
        keyword.encode(&mut stream)?;
        written += 1;
    }
    tracing::debug!("Wrote {} keywords to {:?}", written, path);
    stream.close()
}

fn is_restart_keyword(name: &KeywordName) -> bool {
    RESTART_KEYWORDS.iter().any(|kw| name == kw)
}

fn section_window(section: Option<&RestartSection>) -> Option<Window> {
    section.map(|s| Window::new(s.start, s.end))
}

fn missing_keyword(name: &str) -> EclError {
    EclError::KeywordNotFound {
        name: name.to_string(),
        occurrence: 0,
    }
}

fn short_intehead(intehead: &Keyword) -> EclError {
    EclError::OutOfRange {
        offset: 0,
        count: intehead.count() + 1,
        len: intehead.count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::file_manager::restart::tests::intehead;
    use crate::keyword::Value;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn restart_keywords() -> Vec<Keyword> {
        vec![
            Keyword::from_ints(SEQNUM_KW, vec![0]).unwrap(),
            intehead(2000, 1, 1, None),
            Keyword::from_doubles(DOUBHEAD_KW, vec![0.0]).unwrap(),
            Keyword::from_floats("PRESSURE", vec![250.0; 1200]).unwrap(),
            Keyword::from_floats("SWAT", vec![0.2; 1200]).unwrap(),
            Keyword::from_ints(SEQNUM_KW, vec![1]).unwrap(),
            intehead(2000, 2, 1, None),
            Keyword::from_doubles(DOUBHEAD_KW, vec![31.0]).unwrap(),
            Keyword::from_floats("PRESSURE", vec![240.0; 1200]).unwrap(),
            Keyword::from_floats("SWAT", vec![0.3; 1200]).unwrap(),
        ]
    }

    fn write_fixture(dir: &Path, endian: Endian) -> PathBuf {
        let path = dir.join("CASE.UNRST");
        write_keywords(&path, endian, &restart_keywords()).unwrap();
        path
    }

    #[test]
    fn test_open_and_lookup() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Little);
        let file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();

        assert_eq!(file.endian(), Endian::Little);
        assert_eq!(file.size(), 10);
        assert_eq!(file.count_named("PRESSURE"), 2);
        assert_eq!(file.count_named("NOSUCH"), 0);
        assert!(file.has_kw("SWAT"));

        let swat = file.get_named("SWAT", 1).unwrap();
        assert_eq!(swat.get(0).unwrap(), Value::Float(0.3));
        assert!(swat.is_bound());
        assert_eq!(file.get(9).unwrap(), swat);
        assert_eq!(file.occurrence_of(9).unwrap(), 1);

        let err = file.get(10).unwrap_err();
        assert!(matches!(err, EclError::IndexOutOfRange { index: 10, len: 10 }));
        let err = file.get_named("SWAT", 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeywordNotFound);
    }

    #[test]
    fn test_report_steps_and_dates() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Big);
        let file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();

        assert_eq!(file.report_steps(), vec![0, 1]);
        let feb = NaiveDate::from_ymd_opt(2000, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(file.has_sim_time(feb));
        assert!(file.has_report_step(1));
        assert!(!file.has_report_step(2));
        assert_eq!(file.report_dates().len(), 2);
        assert_eq!(file.restart_sim_days(1).unwrap(), 31.0);
        assert_eq!(file.restart_sim_time(1).unwrap(), feb);
        assert_eq!(file.restart_sim_days(5).unwrap_err().kind(), ErrorKind::SectionNotFound);
        assert_eq!(file.simulator().unwrap(), Simulator::Eclipse100);
        assert_eq!(file.phases().unwrap(), Phases::OIL | Phases::WATER);
    }

    #[test]
    fn test_restart_queries_follow_window() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Big);
        let mut file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();

        file.select_window(Selection::ReportStep(1)).unwrap();
        assert_eq!(file.count_named(SEQNUM_KW), 1);
        assert_eq!(file.report_steps(), vec![1]);
        assert!(file.has_report_step(1));
        assert!(!file.has_report_step(0));
        let jan = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(!file.has_sim_time(jan));
        assert_eq!(file.report_dates().len(), 1);
        assert_eq!(file.restart_sections().len(), 1);
        assert_eq!(file.restart_sim_days(0).unwrap(), 31.0);
        assert_eq!(file.restart_sim_days(1).unwrap_err().kind(), ErrorKind::SectionNotFound);

        // selection still resolves against the whole file
        file.select_window(Selection::ReportStep(0)).unwrap();
        assert_eq!(file.report_steps(), vec![0]);
        assert!(file.has_sim_time(jan));

        file.select_window(Selection::Global).unwrap();
        assert_eq!(file.report_steps(), vec![0, 1]);
    }

    #[test]
    fn test_select_window() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Big);
        let mut file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();

        file.select_window(Selection::ReportStep(1)).unwrap();
        assert_eq!(file.size(), 5);
        assert_eq!(file.count_named("PRESSURE"), 1);
        assert_eq!(file.get_named("PRESSURE", 0).unwrap().get(0).unwrap(), Value::Float(240.0));
        assert_eq!(file.occurrence_of(4).unwrap(), 0);

        // selection is resolved against the whole file, not the current window
        file.select_window(Selection::PositionIndex(0)).unwrap();
        assert_eq!(file.window(), Window::new(0, 5));

        let feb = NaiveDate::from_ymd_opt(2000, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        file.select_window(Selection::SimTime(feb)).unwrap();
        assert_eq!(file.window(), Window::new(5, 10));

        let err = file.select_window(Selection::ReportStep(7)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SectionNotFound);
        assert_eq!(file.window(), Window::new(5, 10));

        file.select_window(Selection::BlockAt {
            name: "PRESSURE".to_string(),
            occurrence: 0,
        })
        .unwrap();
        assert_eq!(file.window(), Window::new(3, 8));

        file.select_window(Selection::Global).unwrap();
        assert_eq!(file.size(), 10);
    }

    #[test]
    fn test_name_filter_defers_loading() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Big);
        let filter = NameFilter::new(["SWAT"]).unwrap();
        let file = KeywordFile::open(&path, OpenMode::read_only(), Some(&filter)).unwrap();

        assert!(file.slots[3].keyword.get().is_none());
        assert!(file.slots[4].keyword.get().is_some());
        assert!(file.slots[0].keyword.get().is_some());

        let pressure = file.get(3).unwrap();
        assert_eq!(pressure.count(), 1200);
        assert!(file.slots[3].keyword.get().is_some());
    }

    #[test]
    fn test_lazy_mode_and_load_all() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Big);
        let mode = OpenMode::read_only().with_lazy(true);
        let file = KeywordFile::open(&path, mode, None).unwrap();

        assert!(file.slots[4].keyword.get().is_none());
        assert_eq!(file.report_steps(), vec![0, 1]);
        file.load_all().unwrap();
        assert!(file.slots.iter().all(|s| s.keyword.get().is_some()));
        assert_eq!(file.iter().filter(|k| k.is_ok()).count(), 10);
    }

    #[test]
    fn test_replace_in_place() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Big);
        let before = std::fs::metadata(&path).unwrap().len();

        let mut file = KeywordFile::open(&path, OpenMode::read_write(), None).unwrap();
        let mut swat = file.get_named("SWAT", 0).unwrap().clone();
        swat.set(0, Value::Float(0.9)).unwrap();
        file.save(&swat).unwrap();
        assert_eq!(file.get_named("SWAT", 0).unwrap().get(0).unwrap(), Value::Float(0.9));
        file.close().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), before);
        let file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();
        let swat = file.get_named("SWAT", 0).unwrap();
        assert_eq!(swat.get(0).unwrap(), Value::Float(0.9));
        assert_eq!(swat.get(1).unwrap(), Value::Float(0.2));
    }

    #[test]
    fn test_replace_rejections() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Big);

        let mut read_only = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();
        let swat = read_only.get_named("SWAT", 0).unwrap().clone();
        let err = read_only.save(&swat).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotWritable);

        let mut file = KeywordFile::open(&path, OpenMode::read_write(), None).unwrap();
        let err = file.save(&swat).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeywordNotFound);

        let unbound = Keyword::from_floats("SWAT", vec![0.0; 1200]).unwrap();
        assert_eq!(file.save(&unbound).unwrap_err().kind(), ErrorKind::KeywordNotFound);

        let own = file.get_named("SWAT", 0).unwrap().clone();
        let shorter = Keyword::from_floats("SWAT", vec![0.0; 1199]).unwrap();
        let err = file.replace(&own, shorter).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HeaderMismatch);
    }

    #[test]
    fn test_replace_seqnum_updates_sections() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Big);
        let mut file = KeywordFile::open(&path, OpenMode::read_write(), None).unwrap();

        let seqnum = file.get_named(SEQNUM_KW, 1).unwrap().clone();
        let renumbered = Keyword::from_ints(SEQNUM_KW, vec![42]).unwrap();
        file.replace(&seqnum, renumbered).unwrap();
        assert_eq!(file.report_steps(), vec![0, 42]);
    }

    #[test]
    fn test_index_roundtrip() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Little);
        let index_path = dir.path().join("CASE.INDEX");

        let scanned = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();
        scanned.write_index(&index_path).unwrap();

        let indexed = KeywordFile::open_with_index(&path, &index_path, OpenMode::read_only()).unwrap();
        assert_eq!(indexed.endian(), Endian::Little);
        assert_eq!(indexed.size(), scanned.size());
        assert_eq!(indexed.report_steps(), scanned.report_steps());
        assert!(indexed.slots[4].keyword.get().is_none());
        assert_eq!(indexed.get(9).unwrap(), scanned.get(9).unwrap());
    }

    #[test]
    fn test_listing_and_distinct_names() {
        let dir = tempdir().unwrap();
        let path = write_fixture(dir.path(), Endian::Big);
        let file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();

        let names: Vec<String> = file.distinct_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["SEQNUM", "INTEHEAD", "DOUBHEAD", "PRESSURE", "SWAT"]);

        let listing = file.kw_list().to_string();
        assert_eq!(listing.lines().count(), 10);
        assert!(listing.lines().nth(3).unwrap().starts_with("PRESSURE"));
        assert!(listing.contains("REAL"));
    }

    #[test]
    fn test_open_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("EMPTY.UNRST");
        write_keywords(&path, Endian::Big, std::iter::empty()).unwrap();

        let mut file = KeywordFile::open(&path, OpenMode::read_only(), None).unwrap();
        assert_eq!(file.size(), 0);
        assert!(file.report_steps().is_empty());
        assert!(file.select_window(Selection::PositionIndex(0)).is_err());
    }
}
