//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - selection enums (`Language`, `Sector`, `Metric`, `Level`)
//! - entity identity (`CanonicalEntity`, `EntityClass`)
//! - row shapes before and after adapters (`RawObservation`, `Observation`)
//! - joined outputs (`SeriesKey`, `TimeSeriesRow`, `MetricsSummary`, `ChartFile`)
//! - chart-end markers (`AnnotationPoint`)

pub mod types;

pub use types::*;
