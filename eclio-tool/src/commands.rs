//! Subcommand implementations
//!
//! Every command writes its report to the given writer so it can be
//! exercised without a terminal.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use eclio_engine::file_manager::RestartSection;
use eclio_engine::{EclError, KeywordFile, NameFilter, OpenMode, RecordStream, Selection};

/// Options shared by every command that opens a file
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub mode: OpenMode,
    pub filter: Option<NameFilter>,
}

impl OpenOptions {
    fn open(&self, path: &Path) -> Result<KeywordFile> {
        KeywordFile::open(path, self.mode, self.filter.as_ref())
            .with_context(|| format!("opening {}", path.display()))
    }
}

pub fn list<W: Write>(out: &mut W, path: &Path, opts: &OpenOptions, report_step: Option<i32>) -> Result<()> {
    let mut file = opts.open(path)?;
    if let Some(step) = report_step {
        file.select_window(Selection::ReportStep(step))?;
    }
    write!(out, "{}", file.kw_list())?;
    Ok(())
}

pub fn steps<W: Write>(out: &mut W, path: &Path, opts: &OpenOptions) -> Result<()> {
    let file = opts.open(path)?;
    let sections = file.restart_sections();
    if sections.is_empty() {
        writeln!(out, "no restart sections")?;
        return Ok(());
    }

    writeln!(out, "{:>6} {:>10} {:>20} {:>12}", "step", "keywords", "date", "days")?;
    for section in sections {
        writeln!(out, "{}", format_section(section))?;
    }
    Ok(())
}

fn format_section(section: &RestartSection) -> String {
    let date = section
        .sim_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let days = section
        .sim_days
        .map(|d| format!("{:.3}", d))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>6} {:>10} {:>20} {:>12}",
        section.report_step,
        section.end - section.start,
        date,
        days
    )
}

pub struct ShowArgs<'a> {
    pub name: &'a str,
    pub occurrence: usize,
    pub report_step: Option<i32>,
    pub limit: usize,
}

pub fn show<W: Write>(out: &mut W, path: &Path, opts: &OpenOptions, args: &ShowArgs<'_>) -> Result<()> {
    let mut file = opts.open(path)?;
    if let Some(step) = args.report_step {
        file.select_window(Selection::ReportStep(step))?;
    }

    let keyword = file.get_named(args.name, args.occurrence)?;
    writeln!(out, "{}", keyword.header())?;

    let shown = keyword.count().min(args.limit);
    for index in 0..shown {
        writeln!(out, "{:>8}: {}", index, keyword.get(index)?)?;
    }
    if shown < keyword.count() {
        writeln!(out, "... {} more", keyword.count() - shown)?;
    }
    Ok(())
}

/// Default sidecar path: the data file name with `.index` appended
pub fn default_index_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".index");
    PathBuf::from(name)
}

pub fn index<W: Write>(out: &mut W, path: &Path, opts: &OpenOptions, output: Option<&Path>) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_index_path(path));

    let mut mode = opts.mode;
    mode.lazy = true;
    let file = KeywordFile::open(path, mode, None)
        .with_context(|| format!("opening {}", path.display()))?;
    file.write_index(&output)?;

    info!("Indexed {} keywords of {}", file.global_size(), path.display());
    writeln!(out, "{} keywords -> {}", file.global_size(), output.display())?;
    Ok(())
}

/// Walk every record, then every keyword; report the first failure
pub fn verify<W: Write>(out: &mut W, path: &Path, opts: &OpenOptions) -> Result<bool> {
    let mut stream = RecordStream::open_read(path, opts.mode.endian)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut records = 0usize;
    loop {
        match stream.skip_record() {
            Ok(_) => records += 1,
            Err(EclError::Eof) => break,
            Err(e) => {
                warn!("Framing error in {}: {}", path.display(), e);
                writeln!(out, "FAILED after {} records: {}", records, e)?;
                return Ok(false);
            }
        }
    }
    let bytes = stream.tell()?;

    let mut mode = opts.mode;
    mode.lazy = false;
    let file = match KeywordFile::open(path, mode, None) {
        Ok(file) => file,
        Err(e) => {
            writeln!(out, "FAILED decoding keywords: {}", e)?;
            return Ok(false);
        }
    };

    writeln!(
        out,
        "OK: {} records, {} keywords, {} restart sections, {} bytes, {}-endian",
        records,
        file.global_size(),
        file.restart_sections().len(),
        bytes,
        file.endian()
    )?;
    Ok(true)
}
