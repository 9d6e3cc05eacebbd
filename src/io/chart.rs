//! Read/write chart JSON files.
//!
//! Chart JSON is the "portable" representation of one selection:
//! - metric, sector, language and title
//! - series legends (label, color, flag, badge)
//! - the joined rows and the headline summary
//!
//! The schema is defined by `domain::ChartFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::ChartFile;
use crate::error::AppError;

/// Write a chart JSON file.
pub fn write_chart_json(path: &Path, chart: &ChartFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create chart JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, chart)
        .map_err(|e| AppError::new(2, format!("Failed to write chart JSON: {e}")))?;
    Ok(())
}

/// Read a chart JSON file.
pub fn read_chart_json(path: &Path) -> Result<ChartFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open chart JSON '{}': {e}", path.display())))?;
    let chart: ChartFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid chart JSON: {e}")))?;
    Ok(chart)
}
