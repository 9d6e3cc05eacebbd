//! `rd-series` library crate.
//!
//! The binary (`rds`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the reconciliation stages (normalize, resolve, join, measure, lay out)
//!   are reusable on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod join;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod resolve;
pub mod text;
pub mod tui;
