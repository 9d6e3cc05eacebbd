//! A loaded dataset: fetch, ingest, adapt.

use rayon::prelude::*;

use crate::data::adapter::DatasetAdapter;
use crate::data::catalog::DatasetConfig;
use crate::data::fetch::DataSource;
use crate::domain::Observation;
use crate::error::DatasetError;
use crate::io::ingest::{RowError, read_table};
use crate::resolve::{EntityTable, ResolutionLog};

/// One dataset after adaptation, plus everything that went wrong on the way.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub config: DatasetConfig,
    pub observations: Vec<Observation>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub misses: ResolutionLog,
}

impl Dataset {
    pub fn adapter(&self) -> DatasetAdapter<'_> {
        DatasetAdapter::new(&self.config)
    }

    /// Distinct years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.observations.iter().map(|o| o.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

/// Adapt already-fetched `text` as dataset `config`.
pub fn parse_dataset(text: &str, config: &DatasetConfig, table: &EntityTable) -> Result<Dataset, DatasetError> {
    let ingested = read_table(text, config)?;
    let adapter = DatasetAdapter::new(config);

    let mut misses = ResolutionLog::default();
    let mut row_errors = ingested.row_errors;
    let mut observations = Vec::with_capacity(ingested.rows.len());

    for raw in &ingested.rows {
        match adapter.adapt(raw, table, &mut misses) {
            Ok(obs) => observations.push(obs),
            Err(message) => row_errors.push(RowError { line: raw.line, message }),
        }
    }
    row_errors.sort_by_key(|e| e.line);

    if !misses.is_empty() || !row_errors.is_empty() {
        tracing::warn!(
            dataset = %config.id,
            unresolved = misses.len(),
            row_errors = row_errors.len(),
            "dataset loaded with issues"
        );
    }

    Ok(Dataset {
        config: config.clone(),
        observations,
        row_errors,
        rows_read: ingested.rows_read,
        misses,
    })
}

/// Fetch and adapt one dataset.
pub fn load_dataset(source: &DataSource, config: &DatasetConfig, table: &EntityTable) -> Result<Dataset, DatasetError> {
    let text = source.fetch_text(config)?;
    parse_dataset(&text, config, table)
}

/// Fetch several datasets concurrently. Results keep the input order.
pub fn load_many(
    source: &DataSource,
    configs: &[&DatasetConfig],
    table: &EntityTable,
) -> Vec<Result<Dataset, DatasetError>> {
    configs
        .par_iter()
        .map(|config| load_dataset(source, config, table))
        .collect()
}
