//! Export joined rows to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts:
//! one row per year, one column per series (named by series key), empty cells
//! for absent values, then one `<key>_yoy` column per series.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::app::pipeline::ChartView;
use crate::error::AppError;

/// Write the joined table of `view` to a CSV file.
pub fn write_series_csv(path: &Path, view: &ChartView) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_series(file, view)
}

pub fn write_series<W: Write>(out: W, view: &ChartView) -> Result<(), AppError> {
    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write export CSV: {e}"));
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["year".to_string()];
    header.extend(view.legends.iter().map(|l| l.key.to_string()));
    header.extend(view.legends.iter().map(|l| format!("{}_yoy", l.key)));
    writer.write_record(&header).map_err(write_err)?;

    for (idx, row) in view.rows.iter().enumerate() {
        let mut record = vec![row.year.to_string()];
        record.extend(view.legends.iter().map(|l| fmt_cell(row.get(&l.key))));
        record.extend(view.legends.iter().map(|l| {
            fmt_cell(
                view.yoy
                    .get(&l.key)
                    .and_then(|v| v.get(idx).copied().flatten()),
            )
        }));
        writer.write_record(&record).map_err(write_err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

fn fmt_cell(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.4}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{Context, LoadedData, Selection, build_view};
    use crate::data::catalog::Catalog;
    use crate::data::dataset::parse_dataset;
    use crate::data::fetch::DataSource;
    use crate::domain::Metric;
    use crate::resolve::EntityTable;

    const EUROSTAT: &str = "freq,unit,sectperf,geo,TIME_PERIOD,OBS_VALUE\n\
        A,PC_GDP,TOTAL,ES,2019,1.25\n\
        A,PC_GDP,TOTAL,ES,2020,1.41\n\
        A,PC_GDP,TOTAL,EU27_2020,2019,2.23\n";

    #[test]
    fn absent_values_export_as_empty_cells() {
        let ctx = Context {
            catalog: Catalog::builtin().unwrap(),
            table: EntityTable::builtin().unwrap(),
            source: DataSource::Dir("/nonexistent".into()),
        };
        let country = parse_dataset(EUROSTAT, ctx.catalog.get("eurostat_gerd").unwrap(), &ctx.table).unwrap();
        let data = LoadedData {
            metric: Metric::RdGdp,
            country,
            region: None,
        };
        let view = build_view(&ctx, &data, &Selection::default()).unwrap();

        let mut out = Vec::new();
        write_series(&mut out, &view).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "year,country,eu,country_yoy,eu_yoy",
            "2019,1.2500,2.2300,,",
            "2020,1.4100,,12.8000,",
        ]);
    }
}
