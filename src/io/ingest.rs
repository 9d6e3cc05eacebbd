//! CSV ingest.
//!
//! This module turns the text of one published dataset into `RawObservation`s:
//! - **Configurable shape**: delimiter from the catalog (or sniffed)
//! - **Schema check up front**: year / value / entity columns must exist
//! - **Row-level validation**: malformed rows are skipped and reported
//! - **No interpretation**: numbers, names and sectors stay strings here

use std::collections::HashSet;

use csv::StringRecord;

use crate::data::catalog::DatasetConfig;
use crate::domain::{RawObservation, column_key};
use crate::error::DatasetError;

/// A row-level error encountered during ingest or adaptation.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: raw rows plus what went wrong along the way.
#[derive(Debug, Clone, Default)]
pub struct IngestedTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawObservation>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Parse `text` according to `config`.
pub fn read_table(text: &str, config: &DatasetConfig) -> Result<IngestedTable, DatasetError> {
    let delimiter = config.delimiter.resolve(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DatasetError::Csv {
            dataset: config.id.clone(),
            message: e.to_string(),
        })?
        .clone();

    let header_keys: HashSet<String> = headers.iter().map(column_key).collect();
    ensure_required_columns_exist(config, &header_keys)?;

    let mut out = IngestedTable {
        headers: headers.iter().map(|h| h.trim_start_matches('\u{feff}').to_string()).collect(),
        ..IngestedTable::default()
    };

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        out.rows_read += 1;

        match result {
            Ok(record) if is_blank(&record) => {}
            Ok(record) => out.rows.push(to_raw(&headers, &record, line)),
            Err(e) => out.row_errors.push(RowError {
                line,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    tracing::debug!(
        dataset = %config.id,
        delimiter = %(delimiter as char).escape_default(),
        rows = out.rows.len(),
        errors = out.row_errors.len(),
        "dataset ingested"
    );

    Ok(out)
}

fn ensure_required_columns_exist(config: &DatasetConfig, header_keys: &HashSet<String>) -> Result<(), DatasetError> {
    let missing = |column: &str| DatasetError::MissingColumn {
        dataset: config.id.clone(),
        column: column.to_string(),
    };

    if !header_keys.contains(&column_key(&config.year_column)) {
        return Err(missing(&config.year_column));
    }
    if !header_keys.contains(&column_key(&config.value_column)) {
        return Err(missing(&config.value_column));
    }
    if !config
        .entity_columns
        .iter()
        .any(|c| header_keys.contains(&column_key(c)))
    {
        return Err(missing(&config.entity_columns.join(" | ")));
    }
    for optional in [&config.sector_column, &config.unit_column].into_iter().flatten() {
        if !header_keys.contains(&column_key(optional)) {
            return Err(missing(optional));
        }
    }
    Ok(())
}

fn to_raw(headers: &StringRecord, record: &StringRecord, line: usize) -> RawObservation {
    let mut raw = RawObservation::new(line);
    for (name, value) in headers.iter().zip(record.iter()) {
        raw.insert(name, value);
    }
    raw
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::Catalog;

    #[test]
    fn semicolon_dataset_with_bom_header() {
        let catalog = Catalog::builtin().unwrap();
        let config = catalog.get("ine_regional").unwrap();
        let text = "\u{feff}Año;Comunidad;Sector;% PIB I+D\n\
                    2020;Cataluña;Total;1,62\n\
                    ;;;\n\
                    2021;Cataluña;Total;1,71\n";

        let table = read_table(text, config).unwrap();
        assert_eq!(table.headers[0], "Año");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows_read, 3);
        assert_eq!(table.rows[0].get("año"), Some("2020"));
        assert_eq!(table.rows[1].get("% PIB I+D"), Some("1,71"));
        assert_eq!(table.rows[1].line, 4);
    }

    #[test]
    fn missing_value_column_is_reported() {
        let catalog = Catalog::builtin().unwrap();
        let config = catalog.get("eurostat_gerd").unwrap();
        let text = "geo,TIME_PERIOD,sectperf,unit\nES,2020,TOTAL,PC_GDP\n";
        let err = read_table(text, config).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::MissingColumn { ref column, .. } if column == "OBS_VALUE"
        ));
    }
}
