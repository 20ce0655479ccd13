//! The active window of a keyword file
//!
//! Positions handed to callers are relative to the window; the file keeps
//! everything in global positions and translates at the boundary.

use std::fmt;

use chrono::NaiveDateTime;

/// How to pick the active window
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Every keyword in the file
    Global,
    /// The restart section whose SEQNUM equals this report step
    ReportStep(i32),
    /// The restart section dated exactly this time
    SimTime(NaiveDateTime),
    /// The i-th restart section
    PositionIndex(usize),
    /// From the `occurrence`-th keyword `name` up to the next one of the
    /// same name (or end of file)
    BlockAt { name: String, occurrence: usize },
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Global => f.write_str("global view"),
            Selection::ReportStep(step) => write!(f, "report step {}", step),
            Selection::SimTime(time) => write!(f, "simulation time {}", time),
            Selection::PositionIndex(index) => write!(f, "restart section #{}", index),
            Selection::BlockAt { name, occurrence } => {
                write!(f, "block {} occurrence {}", name, occurrence)
            }
        }
    }
}

/// Half-open range of global positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn new(start: usize, end: usize) -> Self {
        Window { start, end: end.max(start) }
    }

    pub fn global(total: usize) -> Self {
        Window { start: 0, end: total }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, global: usize) -> bool {
        global >= self.start && global < self.end
    }

    /// Window-relative position to global position
    pub fn to_global(&self, local: usize) -> Option<usize> {
        (local < self.len()).then(|| self.start + local)
    }

    /// Sub-slice of a sorted global position list that falls in the window
    pub fn clip<'a>(&self, positions: &'a [usize]) -> &'a [usize] {
        let lo = positions.partition_point(|&p| p < self.start);
        let hi = positions.partition_point(|&p| p < self.end);
        &positions[lo..hi]
    }
}
