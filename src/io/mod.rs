//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - joined-series CSV export (`export`)
//! - chart JSON read/write (`chart`)

pub mod chart;
pub mod export;
pub mod ingest;

pub use chart::*;
pub use export::*;
pub use ingest::*;
