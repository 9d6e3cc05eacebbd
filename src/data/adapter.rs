//! Per-dataset adapters: native columns -> canonical `Observation`.
//!
//! The joiner never branches on dataset identity; everything dataset-specific
//! (column names, decimal convention, sector spellings, unit filter) lives in
//! the catalog entry and is applied here.

use std::collections::HashSet;

use crate::data::catalog::DatasetConfig;
use crate::domain::{Observation, RawObservation, Sector, SeriesPoint};
use crate::join::{RowMatcher, SeriesMatch, parse_decimal, parse_year};
use crate::resolve::{EntityTable, ResolutionLog};

/// How a dataset selects rows of one sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorFilter {
    /// Filter rows on this native sector code.
    Code(String),
    /// No sector column; every row counts as `Total`.
    Any,
    /// The dataset cannot provide this sector.
    Unsupported,
}

impl SectorFilter {
    pub fn is_supported(&self) -> bool {
        !matches!(self, SectorFilter::Unsupported)
    }
}

pub struct DatasetAdapter<'a> {
    config: &'a DatasetConfig,
}

impl<'a> DatasetAdapter<'a> {
    pub fn new(config: &'a DatasetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DatasetConfig {
        self.config
    }

    /// Interpret one raw row.
    ///
    /// Rows without a usable year or entity are errors (reported, skipped).
    /// Unresolved entities are kept with `entity_code: None` and recorded in
    /// `misses`; unparseable values become `None`.
    pub fn adapt(
        &self,
        raw: &RawObservation,
        table: &EntityTable,
        misses: &mut ResolutionLog,
    ) -> Result<Observation, String> {
        let year_cell = raw
            .get(&self.config.year_column)
            .ok_or_else(|| format!("Missing `{}` value.", self.config.year_column))?;
        let year = parse_year(year_cell).ok_or_else(|| format!("Invalid year '{year_cell}'."))?;

        let (entity, entity_code) = self.resolve_entity(raw, table, misses)?;

        let sector = self
            .config
            .sector_column
            .as_deref()
            .and_then(|c| raw.get(c))
            .map(str::to_string);
        let unit = self
            .config
            .unit_column
            .as_deref()
            .and_then(|c| raw.get(c))
            .map(str::to_string);
        let value = raw
            .get(&self.config.value_column)
            .and_then(|v| parse_decimal(v, self.config.decimal));

        Ok(Observation {
            line: raw.line,
            year,
            entity,
            entity_code,
            sector,
            unit,
            value,
        })
    }

    /// Try each configured entity column in order; the first that resolves wins.
    /// If none resolves, the first non-empty cell is kept as the raw entity.
    fn resolve_entity(
        &self,
        raw: &RawObservation,
        table: &EntityTable,
        misses: &mut ResolutionLog,
    ) -> Result<(String, Option<String>), String> {
        let cells: Vec<&str> = self
            .config
            .entity_columns
            .iter()
            .filter_map(|c| raw.get(c))
            .collect();

        let first = *cells
            .first()
            .ok_or_else(|| format!("Missing entity value ({}).", self.config.entity_columns.join(" | ")))?;

        for cell in &cells {
            if let Some(entity) = table.resolve(cell, &self.config.id) {
                return Ok((cell.to_string(), Some(entity.code.clone())));
            }
        }

        misses.record_miss(&self.config.id, first);
        Ok((first.to_string(), None))
    }

    /// Native spelling of `sector` in this dataset.
    pub fn sector_code(&self, sector: Sector) -> SectorFilter {
        if self.config.sector_column.is_none() {
            return if sector == Sector::Total { SectorFilter::Any } else { SectorFilter::Unsupported };
        }
        SectorFilter::Code(
            self.config
                .sectors
                .get(&sector)
                .cloned()
                .unwrap_or_else(|| sector.eurostat_code().to_string()),
        )
    }

    /// The standard row predicate for `entity_code` / `sector` in this dataset.
    pub fn matcher(&self, entity_code: &str, sector: Sector) -> SeriesMatch {
        let base = SeriesMatch::new(entity_code).unit(self.config.unit.as_deref());
        match self.sector_code(sector) {
            SectorFilter::Code(code) => base.sector(Some(&code)),
            SectorFilter::Any => base.sector(None),
            SectorFilter::Unsupported => base.unavailable(),
        }
    }

    /// Resolved observations of `sector` as points, deduplicated to the first
    /// row per (entity, year) in source order. Unresolved rows are skipped.
    pub fn points(&self, observations: &[Observation], sector: Sector) -> Vec<SeriesPoint> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for obs in observations {
            let Some(code) = obs.entity_code.as_deref() else { continue };
            if !self.matcher(code, sector).matches(obs) {
                continue;
            }
            if seen.insert((code.to_string(), obs.year)) {
                out.push(SeriesPoint {
                    year: obs.year,
                    entity_code: code.to_string(),
                    sector,
                    value: obs.value,
                });
            }
        }
        out
    }

    /// `(code, value)` pairs of `year` / `sector`, first row per entity.
    pub fn snapshot(&self, observations: &[Observation], year: i32, sector: Sector) -> Vec<(String, Option<f64>)> {
        self.points(observations, sector)
            .into_iter()
            .filter(|p| p.year == year)
            .map(|p| (p.entity_code, p.value))
            .collect()
    }
}
