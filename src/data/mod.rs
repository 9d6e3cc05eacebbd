//! Dataset acquisition.
//!
//! - `catalog`: per-dataset column/decimal/sector configuration
//! - `fetch`: local directory or remote base URL
//! - `adapter`: native rows -> canonical observations
//! - `dataset`: fetch + ingest + adapt, one or many at a time
//! - `loader`: background loads where only the latest request counts

pub mod adapter;
pub mod catalog;
pub mod dataset;
pub mod fetch;
pub mod loader;
