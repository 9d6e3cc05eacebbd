//! Time-series join.
//!
//! - `parse`: locale-aware cell parsing (decimal conventions, years)
//! - `joiner`: first-match alignment of N series on a year axis

pub mod joiner;
pub mod parse;

pub use joiner::*;
pub use parse::*;
