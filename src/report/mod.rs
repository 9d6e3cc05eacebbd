//! Reporting utilities: summaries, joined tables, rankings, sector breakdown.

pub mod format;

pub use format::*;
