//! Dataset catalog: how to read each published CSV.
//!
//! The catalog describes, per dataset, its delimiter, the native column names
//! for year / entity / sector / unit / value, its decimal convention, and the
//! native spelling of each sector. A built-in catalog (`data/catalog.json`)
//! is embedded; `--catalog <file>` replaces it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Level, Metric, Sector};
use crate::error::AppError;
use crate::join::DecimalSeparator;

const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

/// Field delimiter of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
    /// Sniff from the header line (most frequent of `;`, `,`, tab).
    #[default]
    Auto,
}

impl Delimiter {
    pub fn resolve(self, text: &str) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Auto => sniff_delimiter(text),
        }
    }
}

fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    [b';', b',', b'\t']
        .into_iter()
        .max_by_key(|d| header.bytes().filter(|b| b == d).count())
        .filter(|d| header.as_bytes().contains(d))
        .unwrap_or(b',')
}

/// How to interpret one dataset's native columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub id: String,
    pub metric: Metric,
    pub level: Level,
    /// File name relative to the data location, or an absolute `http(s)` URL.
    pub source: String,
    #[serde(default)]
    pub delimiter: Delimiter,
    pub year_column: String,
    /// Candidate entity columns; the first one present in a row wins.
    pub entity_columns: Vec<String>,
    #[serde(default)]
    pub sector_column: Option<String>,
    #[serde(default)]
    pub unit_column: Option<String>,
    /// Required value of `unit_column` (rows in other units are ignored).
    #[serde(default)]
    pub unit: Option<String>,
    pub value_column: String,
    #[serde(default)]
    pub decimal: DecimalSeparator,
    /// Native sector spellings; missing entries fall back to Eurostat codes.
    #[serde(default)]
    pub sectors: BTreeMap<Sector, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub datasets: Vec<DatasetConfig>,
}

impl Catalog {
    pub fn builtin() -> Result<Self, AppError> {
        serde_json::from_str(BUILTIN_CATALOG)
            .map_err(|e| AppError::new(4, format!("Built-in catalog is invalid: {e}")))
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)
            .map_err(|e| AppError::new(2, format!("Failed to read catalog '{}': {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| AppError::new(2, format!("Invalid catalog '{}': {e}", path.display())))
    }

    pub fn get(&self, id: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.id == id)
    }

    /// First dataset carrying `metric` at `level`.
    pub fn find(&self, metric: Metric, level: Level) -> Option<&DatasetConfig> {
        self.datasets
            .iter()
            .find(|d| d.metric == metric && d.level == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_covers_every_metric_and_level() {
        let catalog = Catalog::builtin().unwrap();
        for metric in [Metric::RdGdp, Metric::Researchers, Metric::Patents] {
            for level in [Level::Country, Level::Region] {
                assert!(catalog.find(metric, level).is_some(), "{metric:?} {level:?}");
            }
        }
        let ine = catalog.get("ine_regional").unwrap();
        assert_eq!(ine.decimal, DecimalSeparator::Comma);
        assert_eq!(ine.sectors[&Sector::Business], "(EMPRESAS)");
    }

    #[test]
    fn delimiter_sniffing() {
        assert_eq!(Delimiter::Auto.resolve("Año;Comunidad;Valor\n2020;x;1,2"), b';');
        assert_eq!(Delimiter::Auto.resolve("Year,Country,Value"), b',');
        assert_eq!(Delimiter::Auto.resolve("single"), b',');
        assert_eq!(Delimiter::Tab.resolve("a,b"), b'\t');
    }
}
