//! File manager for keyword files
//!
//! Manages the keyword table of an open file, restart sections and the
//! active window.

pub mod keyword_file;
pub mod restart;
pub mod window;

pub use keyword_file::{write_keywords, KeywordFile, KeywordListing, NameFilter, OpenMode};
pub use restart::{Phases, RestartIndex, RestartSection, Simulator};
pub use window::{Selection, Window};
