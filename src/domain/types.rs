//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - built fresh on every selection change
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Display language for entity names and labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    pub fn toggle(self) -> Self {
        match self {
            Language::Es => Language::En,
            Language::En => Language::Es,
        }
    }
}

/// R&D performance sector.
///
/// Every dataset spells these differently (`BES`, `(EMPRESAS)`, `Empresas`...);
/// the per-dataset adapter owns that translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Total,
    Business,
    Government,
    HigherEducation,
    PrivateNonProfit,
}

impl Sector {
    pub const ALL: [Sector; 5] = [
        Sector::Total,
        Sector::Business,
        Sector::Government,
        Sector::HigherEducation,
        Sector::PrivateNonProfit,
    ];

    /// Eurostat `sectperf` code, used when a dataset declares no mapping.
    pub fn eurostat_code(self) -> &'static str {
        match self {
            Sector::Total => "TOTAL",
            Sector::Business => "BES",
            Sector::Government => "GOV",
            Sector::HigherEducation => "HES",
            Sector::PrivateNonProfit => "PNP",
        }
    }

    pub fn label(self, lang: Language) -> &'static str {
        match (self, lang) {
            (Sector::Total, Language::Es) => "Todos los sectores",
            (Sector::Total, Language::En) => "All sectors",
            (Sector::Business, Language::Es) => "Empresas",
            (Sector::Business, Language::En) => "Business enterprise",
            (Sector::Government, Language::Es) => "Administración Pública",
            (Sector::Government, Language::En) => "Government",
            (Sector::HigherEducation, Language::Es) => "Enseñanza Superior",
            (Sector::HigherEducation, Language::En) => "Higher education",
            (Sector::PrivateNonProfit, Language::Es) => "IPSFL",
            (Sector::PrivateNonProfit, Language::En) => "Private non-profit",
        }
    }

    pub fn next(self) -> Self {
        let idx = Sector::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Sector::ALL[(idx + 1) % Sector::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Sector::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Sector::ALL[(idx + Sector::ALL.len() - 1) % Sector::ALL.len()]
    }
}

/// Which indicator a dataset carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Gross domestic expenditure on R&D as % of GDP.
    RdGdp,
    /// Researchers (full-time equivalent).
    Researchers,
    /// Patent applications.
    Patents,
}

impl Metric {
    pub fn label(self, lang: Language) -> &'static str {
        match (self, lang) {
            (Metric::RdGdp, Language::Es) => "Gasto en I+D (% PIB)",
            (Metric::RdGdp, Language::En) => "R&D expenditure (% GDP)",
            (Metric::Researchers, Language::Es) => "Investigadores (EJC)",
            (Metric::Researchers, Language::En) => "Researchers (FTE)",
            (Metric::Patents, Language::Es) => "Solicitudes de patentes",
            (Metric::Patents, Language::En) => "Patent applications",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::RdGdp => "%",
            Metric::Researchers | Metric::Patents => "",
        }
    }
}

/// Geographic level of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Country,
    Region,
}

/// Class of a canonical entity. Codes are unique within a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityClass {
    Country,
    Region,
    /// Aggregates (EU, euro area): comparison baselines, never ranked.
    Supranational,
}

/// Localized display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNames {
    pub es: String,
    pub en: String,
}

impl LocalNames {
    pub fn get(&self, lang: Language) -> &str {
        match lang {
            Language::Es => &self.es,
            Language::En => &self.en,
        }
    }
}

/// Resolved identity for a country, region or aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub names: LocalNames,
    /// Primary code: ISO2 for countries, NUTS2 for regions, Eurostat code for aggregates.
    pub code: String,
    pub class: EntityClass,
    #[serde(default)]
    pub iso2: Option<String>,
    #[serde(default)]
    pub iso3: Option<String>,
    #[serde(default)]
    pub nuts: Option<String>,
    /// Extra codes seen in source data (`EL` for Greece, `UK` for the United Kingdom...).
    #[serde(default)]
    pub alt_codes: Vec<String>,
    /// Spellings seen in source data besides the localized names.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Flag asset reference (path or URL fragment).
    pub flag: String,
}

impl CanonicalEntity {
    pub fn name(&self, lang: Language) -> &str {
        self.names.get(lang)
    }

    /// Every code this entity answers to, primary first.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.code.as_str())
            .chain(self.iso2.as_deref())
            .chain(self.iso3.as_deref())
            .chain(self.nuts.as_deref())
            .chain(self.alt_codes.iter().map(String::as_str))
    }

    /// Every spelling this entity answers to: localized names, then aliases.
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        [self.names.es.as_str(), self.names.en.as_str()]
            .into_iter()
            .chain(self.aliases.iter().map(String::as_str))
    }
}

/// One row from a source table, before any dataset-specific interpretation.
///
/// Header lookups are case-insensitive; values are trimmed.
#[derive(Debug, Clone, Default)]
pub struct RawObservation {
    /// 1-based line number in the source file.
    pub line: usize,
    fields: HashMap<String, String>,
}

impl RawObservation {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            fields: HashMap::new(),
        }
    }

    pub fn insert(&mut self, column: &str, value: &str) {
        self.fields.insert(column_key(column), value.trim().to_string());
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, column: &str, value: &str) -> Self {
        self.insert(column, value);
        self
    }

    /// Value of `column`, `None` when the column is absent or the cell is empty.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(&column_key(column))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.fields.contains_key(&column_key(column))
    }
}

/// Header key used by `RawObservation`.
///
/// Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
/// first header; it is stripped so schema checks see the real name.
pub fn column_key(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_lowercase()
}

/// A row after the dataset adapter has interpreted its native columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub line: usize,
    pub year: i32,
    /// Entity name or code as written in the source.
    pub entity: String,
    /// Canonical code, when the resolver recognized `entity`.
    pub entity_code: Option<String>,
    /// Native sector code, if the dataset has a sector column.
    pub sector: Option<String>,
    pub unit: Option<String>,
    /// Parsed value; `None` when the cell was missing or unparseable.
    pub value: Option<f64>,
}

/// One (entity, year, sector) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub entity_code: String,
    pub sector: Sector,
    pub value: Option<f64>,
}

/// Key of a joined series (`country`, `eu`, `community`...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesKey(String);

impl SeriesKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn country() -> Self {
        Self::new("country")
    }

    pub fn eu() -> Self {
        Self::new("eu")
    }

    pub fn community() -> Self {
        Self::new("community")
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One row of a joined table.
///
/// Every declared series key is present; `None` marks an absent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub year: i32,
    pub values: BTreeMap<SeriesKey, Option<f64>>,
}

impl TimeSeriesRow {
    /// Value for `key`, flattening "undeclared" and "absent" into `None`.
    pub fn get(&self, key: &SeriesKey) -> Option<f64> {
        self.values.get(key).copied().flatten()
    }

    pub fn has_any_value(&self) -> bool {
        self.values.values().any(Option::is_some)
    }
}

/// Presentation metadata for one joined series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesLegend {
    pub key: SeriesKey,
    pub label: String,
    /// `#rrggbb`
    pub color: String,
    /// Flag asset reference of the entity behind the series.
    pub icon: String,
    /// Short badge text for terminals (entity code).
    pub badge: String,
}

/// A chart-end marker after layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPoint {
    pub series_key: SeriesKey,
    pub value: f64,
    pub raw_y: f64,
    pub adjusted_y: f64,
    pub color: String,
    pub icon: String,
}

/// Rank of one entity within its peers for a year/sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankPosition {
    /// 1-based.
    pub rank: usize,
    pub total: usize,
}

/// Headline numbers shown next to a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Latest year with a value for the primary series.
    pub latest_year: Option<i32>,
    pub latest: Option<f64>,
    /// Year-over-year change (%) of the primary series at `latest_year`.
    pub yoy: Option<f64>,
    /// Difference (%) of the primary series against each peer at `latest_year`.
    pub peer_diffs: BTreeMap<SeriesKey, Option<f64>>,
    /// Rank of the focal entity among its peers, when a ranking was computed.
    pub rank: Option<RankPosition>,
}

/// A saved chart (JSON), readable by `rds plot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartFile {
    pub tool: String,
    pub metric: Metric,
    pub sector: Sector,
    pub language: Language,
    pub title: String,
    pub series: Vec<SeriesLegend>,
    pub rows: Vec<TimeSeriesRow>,
    pub summary: MetricsSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_observation_lookup_ignores_case_and_bom() {
        let row = RawObservation::new(2)
            .with("\u{feff}TIME_PERIOD", " 2020 ")
            .with("OBS_VALUE", "");
        assert_eq!(row.get("time_period"), Some("2020"));
        assert_eq!(row.get("obs_value"), None);
        assert!(row.has_column("OBS_VALUE"));
    }

    #[test]
    fn sector_cycles_through_all() {
        let mut s = Sector::Total;
        for _ in 0..Sector::ALL.len() {
            s = s.next();
        }
        assert_eq!(s, Sector::Total);
        assert_eq!(Sector::Total.prev(), Sector::PrivateNonProfit);
    }

    #[test]
    fn time_series_row_flattens_absent() {
        let mut values = BTreeMap::new();
        values.insert(SeriesKey::country(), Some(1.4));
        values.insert(SeriesKey::eu(), None);
        let row = TimeSeriesRow { year: 2020, values };
        assert_eq!(row.get(&SeriesKey::country()), Some(1.4));
        assert_eq!(row.get(&SeriesKey::eu()), None);
        assert_eq!(row.get(&SeriesKey::community()), None);
        assert!(row.has_any_value());
    }
}
