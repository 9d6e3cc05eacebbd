//! Debug bundle writer for inspecting loaded datasets and a selection.
//!
//! The bundle is a markdown file under `debug/` listing, per dataset, the
//! rows read, row errors and unresolved entity names, followed by the joined
//! table of the current selection.

use std::fmt::Write as _;
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::{ChartView, LoadedData, Selection};
use crate::error::AppError;
use crate::resolve::EntityTable;

/// Row errors listed per dataset before truncating.
const MAX_ROW_ERRORS: usize = 50;

pub fn write_debug_bundle(
    dir: &Path,
    data: &LoadedData,
    selection: &Selection,
    view: Option<&ChartView>,
    table: &EntityTable,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "rds_debug_{:?}_{}_{ts}.md",
        selection.metric,
        selection.primary_code()
    ));

    let text = render_debug_bundle(data, selection, view, table);
    write(&path, text).map_err(|e| AppError::new(4, format!("Failed to write debug file: {e}")))?;

    tracing::info!(path = %path.display(), "wrote debug bundle");
    Ok(path)
}

pub fn render_debug_bundle(
    data: &LoadedData,
    selection: &Selection,
    view: Option<&ChartView>,
    table: &EntityTable,
) -> String {
    // Writing to a String cannot fail.
    let mut out = String::new();
    let _ = writeln!(out, "# rds debug bundle");
    let _ = writeln!(out, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(out, "- entity_table: {}", table.version());
    let _ = writeln!(
        out,
        "- selection: metric={:?} country={} region={} sector={:?} years={}..{} lang={:?}",
        selection.metric,
        selection.country,
        selection.region.as_deref().unwrap_or("-"),
        selection.sector,
        fmt_year(selection.from),
        fmt_year(selection.to),
        selection.language,
    );

    for dataset in data.datasets() {
        let _ = writeln!(out, "\n## Dataset `{}`", dataset.config.id);
        let _ = writeln!(out, "- source: {}", dataset.config.source);
        let _ = writeln!(
            out,
            "- rows_read: {} | observations: {} | row_errors: {} | unresolved: {}",
            dataset.rows_read,
            dataset.observations.len(),
            dataset.row_errors.len(),
            dataset.misses.len()
        );
        let years = dataset.years();
        if let (Some(first), Some(last)) = (years.first(), years.last()) {
            let _ = writeln!(out, "- years: {first}..{last}");
        }

        if !dataset.misses.is_empty() {
            let _ = writeln!(out, "\n### Unresolved names");
            let _ = writeln!(out, "| input | rows |");
            let _ = writeln!(out, "| - | - |");
            for (_, input, count) in dataset.misses.iter() {
                let _ = writeln!(out, "| {} | {count} |", escape_cell(input));
            }
        }

        if !dataset.row_errors.is_empty() {
            let _ = writeln!(out, "\n### Row errors");
            let _ = writeln!(out, "| line | message |");
            let _ = writeln!(out, "| - | - |");
            for err in dataset.row_errors.iter().take(MAX_ROW_ERRORS) {
                let _ = writeln!(out, "| {} | {} |", err.line, escape_cell(&err.message));
            }
            if dataset.row_errors.len() > MAX_ROW_ERRORS {
                let _ = writeln!(out, "\n({} more)", dataset.row_errors.len() - MAX_ROW_ERRORS);
            }
        }
    }

    match view {
        Some(view) => {
            let _ = writeln!(out, "\n## Joined table");
            let header: Vec<&str> = view.legends.iter().map(|l| l.key.as_str()).collect();
            let _ = writeln!(out, "| year | {} |", header.join(" | "));
            let _ = writeln!(out, "| - |{}", " - |".repeat(header.len()));
            for row in &view.rows {
                let cells: Vec<String> = view.legends.iter().map(|l| fmt_opt(row.get(&l.key))).collect();
                let _ = writeln!(out, "| {} | {} |", row.year, cells.join(" | "));
            }
        }
        None => {
            let _ = writeln!(out, "\n## Joined table\nno data for this selection");
        }
    }

    out
}

fn fmt_year(year: Option<i32>) -> String {
    year.map(|y| y.to_string()).unwrap_or_else(|| "auto".to_string())
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.3}"),
        _ => "-".to_string(),
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::Catalog;
    use crate::data::dataset::parse_dataset;
    use crate::domain::Metric;

    #[test]
    fn bundle_lists_misses_and_row_errors() {
        let catalog = Catalog::builtin().unwrap();
        let table = EntityTable::builtin().unwrap();
        let text = "freq,unit,sectperf,geo,TIME_PERIOD,OBS_VALUE\n\
            A,PC_GDP,TOTAL,ES,2020,1.41\n\
            A,PC_GDP,TOTAL,Atlantis,2020,9.9\n\
            A,PC_GDP,TOTAL,ES,year,1.0\n";
        let country = parse_dataset(text, catalog.get("eurostat_gerd").unwrap(), &table).unwrap();
        let data = LoadedData {
            metric: Metric::RdGdp,
            country,
            region: None,
        };

        let md = render_debug_bundle(&data, &Selection::default(), None, &table);
        assert!(md.contains("## Dataset `eurostat_gerd`"));
        assert!(md.contains("| Atlantis | 1 |"));
        assert!(md.contains("| 4 | Invalid year 'year'. |"));
        assert!(md.contains("no data for this selection"));
    }
}
