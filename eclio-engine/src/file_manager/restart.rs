//! Restart sections of unified restart files
//!
//! A section starts at every `SEQNUM` keyword and runs up to the next one
//! (or the end of the file). The first `INTEHEAD` and `DOUBHEAD` inside a
//! section date it:
//! - INTEHEAD[64..=66]: day, month, year
//! - INTEHEAD[206], [207], [410]: hour, minute, microseconds (when present)
//! - DOUBHEAD[0]: elapsed simulation days

use bitflags::bitflags;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::keyword::Keyword;
use crate::storage::header::{DOUBHEAD_KW, INTEHEAD_KW, SEQNUM_KW};

pub const INTEHEAD_PHASE_INDEX: usize = 14;
pub const INTEHEAD_IPROG_INDEX: usize = 94;
pub const INTEHEAD_DAY_INDEX: usize = 64;
pub const INTEHEAD_MONTH_INDEX: usize = 65;
pub const INTEHEAD_YEAR_INDEX: usize = 66;
pub const INTEHEAD_HOUR_INDEX: usize = 206;
pub const INTEHEAD_MINUTE_INDEX: usize = 207;
pub const INTEHEAD_MICROSECOND_INDEX: usize = 410;
pub const DOUBHEAD_DAYS_INDEX: usize = 0;

/// Report step of a section whose SEQNUM carries no integer
pub const UNKNOWN_REPORT_STEP: i32 = -1;

bitflags! {
    /// Active phases from INTEHEAD[14]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Phases: i32 {
        const OIL = 1;
        const WATER = 2;
        const GAS = 4;
    }
}

/// Simulator that wrote the file, from INTEHEAD[94]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Simulator {
    Eclipse100,
    Eclipse300,
    Eclipse300Thermal,
    Intersect,
    FrontSim,
    Other(i32),
}

impl Simulator {
    pub fn from_code(code: i32) -> Self {
        match code {
            100 => Simulator::Eclipse100,
            300 => Simulator::Eclipse300,
            500 => Simulator::Eclipse300Thermal,
            700 => Simulator::Intersect,
            800 => Simulator::FrontSim,
            other => Simulator::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Simulator::Eclipse100 => 100,
            Simulator::Eclipse300 => 300,
            Simulator::Eclipse300Thermal => 500,
            Simulator::Intersect => 700,
            Simulator::FrontSim => 800,
            Simulator::Other(code) => *code,
        }
    }
}

/// One report step: global positions `[start, end)`
#[derive(Debug, Clone, PartialEq)]
pub struct RestartSection {
    pub report_step: i32,
    pub start: usize,
    pub end: usize,
    pub sim_time: Option<NaiveDateTime>,
    pub sim_days: Option<f64>,
}

/// All restart sections of a file in position order
#[derive(Debug, Clone, Default)]
pub struct RestartIndex {
    sections: Vec<RestartSection>,
}

impl RestartIndex {
    /// Build from the loaded keywords, in global position order.
    ///
    /// Only `SEQNUM`, `INTEHEAD` and `DOUBHEAD` are consulted; everything
    /// else can be passed as `None`.
    pub fn build<'a, I>(keywords: I, total: usize) -> Self
    where
        I: IntoIterator<Item = (usize, Option<&'a Keyword>)>,
    {
        let mut sections: Vec<RestartSection> = Vec::new();
        let mut dated = false;
        let mut timed = false;

        for (position, keyword) in keywords {
            let Some(keyword) = keyword else { continue };
            let name = keyword.name();

            if *name == SEQNUM_KW {
                if let Some(last) = sections.last_mut() {
                    last.end = position;
                }
                let report_step = match keyword.as_ints().and_then(|v| v.first().copied()) {
                    Some(step) => step,
                    None => {
                        tracing::warn!(
                            "SEQNUM at position {} is {} with {} elements; using report step {}",
                            position,
                            keyword.data_type(),
                            keyword.count(),
                            UNKNOWN_REPORT_STEP
                        );
                        UNKNOWN_REPORT_STEP
                    }
                };
                sections.push(RestartSection {
                    report_step,
                    start: position,
                    end: total,
                    sim_time: None,
                    sim_days: None,
                });
                dated = false;
                timed = false;
            } else if *name == INTEHEAD_KW && !dated {
                if let Some(section) = sections.last_mut() {
                    section.sim_time = intehead_time(keyword);
                    dated = true;
                }
            } else if *name == DOUBHEAD_KW && !timed {
                if let Some(section) = sections.last_mut() {
                    section.sim_days = keyword
                        .as_doubles()
                        .and_then(|v| v.get(DOUBHEAD_DAYS_INDEX).copied());
                    timed = true;
                }
            }
        }

        tracing::debug!("Indexed {} restart sections", sections.len());
        RestartIndex { sections }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[RestartSection] {
        &self.sections
    }

    /// The i-th section by linear count
    pub fn section(&self, index: usize) -> Option<&RestartSection> {
        self.sections.get(index)
    }

    /// First section with exactly this report step
    pub fn find_report_step(&self, report_step: i32) -> Option<&RestartSection> {
        self.sections.iter().find(|s| s.report_step == report_step)
    }

    /// First section dated exactly `time`
    pub fn find_sim_time(&self, time: NaiveDateTime) -> Option<&RestartSection> {
        self.sections.iter().find(|s| s.sim_time == Some(time))
    }

    pub fn report_steps(&self) -> Vec<i32> {
        self.sections.iter().map(|s| s.report_step).collect()
    }

    pub fn report_dates(&self) -> Vec<NaiveDateTime> {
        self.sections.iter().filter_map(|s| s.sim_time).collect()
    }
}

/// Date and time stored in an INTEHEAD keyword
pub fn intehead_time(intehead: &Keyword) -> Option<NaiveDateTime> {
    let values = intehead.as_ints()?;
    let day = *values.get(INTEHEAD_DAY_INDEX)?;
    let month = *values.get(INTEHEAD_MONTH_INDEX)?;
    let year = *values.get(INTEHEAD_YEAR_INDEX)?;

    let date = NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?);
    let Some(date) = date else {
        tracing::warn!("INTEHEAD carries invalid date {}-{}-{}", year, month, day);
        return None;
    };

    let time = match (
        values.get(INTEHEAD_HOUR_INDEX),
        values.get(INTEHEAD_MINUTE_INDEX),
        values.get(INTEHEAD_MICROSECOND_INDEX),
    ) {
        (Some(&hour), Some(&minute), Some(&micros)) => {
            let seconds = micros / 1_000_000;
            let micros = micros % 1_000_000;
            NaiveTime::from_hms_micro_opt(
                u32::try_from(hour).ok()?,
                u32::try_from(minute).ok()?,
                u32::try_from(seconds).ok()?,
                u32::try_from(micros).ok()?,
            )?
        }
        _ => NaiveTime::from_hms_opt(0, 0, 0)?,
    };

    Some(date.and_time(time))
}

/// Simulator code from an INTEHEAD keyword
pub fn intehead_simulator(intehead: &Keyword) -> Option<Simulator> {
    intehead
        .as_ints()?
        .get(INTEHEAD_IPROG_INDEX)
        .map(|code| Simulator::from_code(*code))
}

/// Phase mask from an INTEHEAD keyword
pub fn intehead_phases(intehead: &Keyword) -> Option<Phases> {
    intehead
        .as_ints()?
        .get(INTEHEAD_PHASE_INDEX)
        .map(|mask| Phases::from_bits_truncate(*mask))
}
