//! Shared pipeline logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! catalog lookup -> parallel load (fetch, ingest, adapt) -> join -> metrics
//! -> chart view
//!
//! The CLI and the TUI then focus on presentation (printing vs widgets).
//! Every input (catalog, entity table, data source) is immutable and passed
//! in through `Context`.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::data::catalog::Catalog;
use crate::data::dataset::{Dataset, load_many};
use crate::data::fetch::DataSource;
use crate::data::loader::LoadState;
use crate::domain::{
    AnnotationPoint, ChartFile, EntityClass, Language, Level, Metric, MetricsSummary, SeriesKey, SeriesLegend,
    Sector, TimeSeriesRow,
};
use crate::error::{AppError, DatasetError};
use crate::join::{RowMatcher, SeriesSpec, column, join, year_range};
use crate::metrics::{Ranking, rank, share_of_total, summarize, yoy};
use crate::resolve::{EntityTable, ResolutionLog};

/// Code of the EU aggregate used as the comparison baseline.
pub const EU_CODE: &str = "EU27_2020";

const COLOR_COUNTRY: &str = "#c60b1e";
const COLOR_EU: &str = "#003399";
const COLOR_COMMUNITY: &str = "#2a9d8f";

/// Immutable inputs shared by every request.
pub struct Context {
    pub catalog: Catalog,
    pub table: EntityTable,
    pub source: DataSource,
}

/// What the user is looking at.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub metric: Metric,
    /// Country code (ISO2).
    pub country: String,
    /// Region code (NUTS2); when set, the region is the focal series.
    pub region: Option<String>,
    pub sector: Sector,
    pub from: Option<i32>,
    pub to: Option<i32>,
    pub language: Language,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            metric: Metric::RdGdp,
            country: "ES".to_string(),
            region: None,
            sector: Sector::Total,
            from: None,
            to: None,
            language: Language::Es,
        }
    }
}

impl Selection {
    pub fn primary_key(&self) -> SeriesKey {
        if self.region.is_some() {
            SeriesKey::community()
        } else {
            SeriesKey::country()
        }
    }

    pub fn primary_code(&self) -> &str {
        self.region.as_deref().unwrap_or(&self.country)
    }

    pub fn level(&self) -> Level {
        if self.region.is_some() { Level::Region } else { Level::Country }
    }
}

/// Datasets backing one metric.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub metric: Metric,
    pub country: Dataset,
    pub region: Option<Dataset>,
}

impl LoadedData {
    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        std::iter::once(&self.country).chain(self.region.as_ref())
    }

    pub fn dataset(&self, level: Level) -> Option<&Dataset> {
        match level {
            Level::Country => Some(&self.country),
            Level::Region => self.region.as_ref(),
        }
    }

    /// Resolution misses across all datasets.
    pub fn misses(&self) -> ResolutionLog {
        let mut all = ResolutionLog::default();
        for dataset in self.datasets() {
            all.merge(&dataset.misses);
        }
        all
    }
}

/// Load the datasets of `metric` (country level, plus region level when asked).
pub fn load(ctx: &Context, metric: Metric, with_region: bool) -> Result<LoadedData, DatasetError> {
    let find = |level: Level| {
        ctx.catalog
            .find(metric, level)
            .ok_or_else(|| DatasetError::UnknownDataset(format!("{metric:?}/{level:?}")))
    };

    let mut configs = vec![find(Level::Country)?];
    if with_region {
        configs.push(find(Level::Region)?);
    }

    let mut loaded = load_many(&ctx.source, &configs, &ctx.table).into_iter();
    let country = next_dataset(&mut loaded)?;
    let region = if with_region {
        Some(next_dataset(&mut loaded)?)
    } else {
        None
    };

    Ok(LoadedData { metric, country, region })
}

fn next_dataset(results: &mut impl Iterator<Item = Result<Dataset, DatasetError>>) -> Result<Dataset, DatasetError> {
    results.next().unwrap_or(Err(DatasetError::Empty))
}

/// Share of one sector in the focal entity's total for a year.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorShare {
    pub sector: Sector,
    pub value: Option<f64>,
    pub share: Option<f64>,
}

/// Everything a front-end needs to draw one selection.
#[derive(Debug, Clone)]
pub struct ChartView {
    pub selection: Selection,
    pub title: String,
    pub legends: Vec<SeriesLegend>,
    pub rows: Vec<TimeSeriesRow>,
    pub yoy: BTreeMap<SeriesKey, Vec<Option<f64>>>,
    pub summary: MetricsSummary,
    /// Peers of the focal entity at `summary.latest_year`.
    pub ranking: Ranking,
    pub breakdown: Vec<SectorShare>,
}

impl ChartView {
    pub fn value_bounds(&self) -> Option<[f64; 2]> {
        crate::layout::value_bounds(&self.rows)
    }

    /// De-cluttered end-of-line badges for a plot `height` pixels tall.
    pub fn end_markers(&self, bounds: [f64; 2], height: f64, min_gap: f64) -> Vec<AnnotationPoint> {
        crate::layout::end_markers(&self.legends, &self.rows, bounds, height, min_gap)
    }

    pub fn to_chart_file(&self) -> ChartFile {
        ChartFile {
            tool: "rds".to_string(),
            metric: self.selection.metric,
            sector: self.selection.sector,
            language: self.selection.language,
            title: self.title.clone(),
            series: self.legends.clone(),
            rows: self.rows.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Join, measure and label `data` for `sel`.
///
/// Fails with `DatasetError::Empty` when no requested year has any value.
pub fn build_view(ctx: &Context, data: &LoadedData, sel: &Selection) -> Result<ChartView, DatasetError> {
    let table = &ctx.table;
    let lang = sel.language;

    let country_adapter = data.country.adapter();
    let country_match = country_adapter.matcher(&sel.country, sel.sector);
    let eu_match = country_adapter.matcher(EU_CODE, sel.sector);

    let region = match sel.region.as_deref() {
        Some(code) => {
            let dataset = data
                .region
                .as_ref()
                .ok_or_else(|| DatasetError::UnknownDataset(format!("{:?}/Region", data.metric)))?;
            let matcher = dataset.adapter().matcher(code, sel.sector);
            Some((code, dataset, matcher))
        }
        None => None,
    };

    let mut specs = vec![
        SeriesSpec::new(SeriesKey::country(), &data.country.observations, &country_match),
        SeriesSpec::new(SeriesKey::eu(), &data.country.observations, &eu_match),
    ];
    let mut legends = vec![
        legend(table, SeriesKey::country(), &sel.country, lang, COLOR_COUNTRY),
        legend(table, SeriesKey::eu(), EU_CODE, lang, COLOR_EU),
    ];
    if let Some((code, dataset, matcher)) = &region {
        specs.push(SeriesSpec::new(SeriesKey::community(), &dataset.observations, matcher));
        legends.push(legend(table, SeriesKey::community(), code, lang, COLOR_COMMUNITY));
    }

    let years = year_axis(sel, data);
    let rows = join(&years, &specs);
    if !rows.iter().any(TimeSeriesRow::has_any_value) {
        tracing::info!(metric = ?sel.metric, focus = sel.primary_code(), sector = ?sel.sector, "no data for selection");
        return Err(DatasetError::Empty);
    }

    let yoy: BTreeMap<SeriesKey, Vec<Option<f64>>> = legends
        .iter()
        .map(|l| (l.key.clone(), yoy(&column(&rows, &l.key))))
        .collect();

    let primary = sel.primary_key();
    let peers: Vec<SeriesKey> = legends
        .iter()
        .map(|l| l.key.clone())
        .filter(|k| *k != primary)
        .collect();
    let mut summary = summarize(&rows, &primary, &peers);

    let focal_dataset = region.as_ref().map(|(_, d, _)| *d).unwrap_or(&data.country);
    let (ranking, breakdown) = match summary.latest_year {
        Some(year) => {
            let snapshot = peer_snapshot(table, focal_dataset, year, sel.sector);
            (
                rank(&snapshot, table),
                sector_breakdown(focal_dataset, sel.primary_code(), year),
            )
        }
        None => (Ranking::default(), Vec::new()),
    };
    summary.rank = ranking.position(sel.primary_code());

    Ok(ChartView {
        selection: sel.clone(),
        title: format!("{} - {}", sel.metric.label(lang), sel.sector.label(lang)),
        legends,
        rows,
        yoy,
        summary,
        ranking,
        breakdown,
    })
}

/// Requested years: the selection's bounds clamped to the data's span,
/// defaulting to that span capped at the current year. Years outside the
/// span would be all-absent rows.
fn year_axis(sel: &Selection, data: &LoadedData) -> Vec<i32> {
    let mut span = year_range(&data.country.observations);
    if sel.region.is_some()
        && let Some((lo, hi)) = data.region.as_ref().and_then(|d| year_range(&d.observations))
    {
        span = Some(match span {
            Some((a, b)) => (a.min(lo), b.max(hi)),
            None => (lo, hi),
        });
    }

    let Some((lo, hi)) = span else {
        return Vec::new();
    };
    let lo = sel.from.map_or(lo, |from| from.max(lo));
    let hi = sel.to.map_or_else(|| hi.min(chrono::Local::now().year()), |to| to.min(hi));
    if lo > hi {
        return Vec::new();
    }
    (lo..=hi).collect()
}

fn legend(table: &EntityTable, key: SeriesKey, code: &str, lang: Language, color: &str) -> SeriesLegend {
    let entity = table.by_code(code);
    SeriesLegend {
        key,
        label: entity.map(|e| e.name(lang).to_string()).unwrap_or_else(|| code.to_string()),
        color: color.to_string(),
        icon: entity.map(|e| e.flag.clone()).unwrap_or_default(),
        badge: entity.map(|e| e.code.clone()).unwrap_or_else(|| code.to_string()),
    }
}

/// Value of every sector the dataset provides for `code` in `year`, with
/// its share of the total.
pub fn sector_breakdown(dataset: &Dataset, code: &str, year: i32) -> Vec<SectorShare> {
    let adapter = dataset.adapter();
    let value_of = |sector: Sector| -> Option<Option<f64>> {
        if !adapter.sector_code(sector).is_supported() {
            return None;
        }
        let matcher = adapter.matcher(code, sector);
        Some(
            dataset
                .observations
                .iter()
                .find(|o| o.year == year && matcher.matches(o))
                .and_then(|o| o.value),
        )
    };

    let total = value_of(Sector::Total).flatten();
    Sector::ALL
        .iter()
        .filter_map(|&sector| {
            let value = value_of(sector)?;
            Some(SectorShare {
                sector,
                value,
                share: share_of_total(value, total),
            })
        })
        .collect()
}

/// `(code, value)` pairs of `year` restricted to entities of the dataset's
/// level, so a national total inside a regional file is not ranked as a region.
fn peer_snapshot(table: &EntityTable, dataset: &Dataset, year: i32, sector: Sector) -> Vec<(String, Option<f64>)> {
    let class = match dataset.config.level {
        Level::Country => EntityClass::Country,
        Level::Region => EntityClass::Region,
    };
    dataset
        .adapter()
        .snapshot(&dataset.observations, year, sector)
        .into_iter()
        .filter(|(code, _)| {
            table
                .by_code(code)
                .is_some_and(|e| e.class == class || e.class == EntityClass::Supranational)
        })
        .collect()
}

/// Rank every entity of `dataset` for `sector` in `year`, or in the latest
/// year where anything is ranked.
pub fn rank_year(
    ctx: &Context,
    dataset: &Dataset,
    sector: Sector,
    year: Option<i32>,
) -> Result<(i32, Ranking), DatasetError> {
    let candidates: Vec<i32> = match year {
        Some(y) => vec![y],
        None => dataset.years().into_iter().rev().collect(),
    };
    candidates
        .into_iter()
        .map(|y| (y, rank(&peer_snapshot(&ctx.table, dataset, y, sector), &ctx.table)))
        .find(|(_, ranking)| !ranking.is_empty())
        .ok_or(DatasetError::Empty)
}

/// Resolve a user-typed country or region (name or code) to its code.
pub fn resolve_focus(table: &EntityTable, input: &str, class: EntityClass) -> Result<String, AppError> {
    let entity = table
        .resolve(input, "")
        .ok_or_else(|| AppError::new(2, format!("Unknown entity '{input}'.")))?;
    if entity.class != class {
        return Err(AppError::new(
            2,
            format!("'{input}' resolves to {} ({:?}), expected a {class:?}.", entity.code, entity.class),
        ));
    }
    Ok(entity.code.clone())
}

/// What a front-end should show for the current load + selection.
#[derive(Debug, Clone)]
pub enum ViewState {
    Loading,
    /// Fetch or parse failed.
    Unavailable(String),
    /// Data loaded but nothing matches the selection.
    NoData,
    Ready(Box<ChartView>),
}

impl ViewState {
    pub fn from_load(state: &LoadState<LoadedData>, ctx: &Context, sel: &Selection) -> Self {
        match state {
            LoadState::Idle | LoadState::Loading => ViewState::Loading,
            LoadState::Failed(err) => Self::from_error(err),
            LoadState::Ready(data) => match build_view(ctx, data, sel) {
                Ok(view) => ViewState::Ready(Box::new(view)),
                Err(err) => Self::from_error(&err),
            },
        }
    }

    fn from_error(err: &DatasetError) -> Self {
        if err.is_unavailable() {
            ViewState::Unavailable(err.to_string())
        } else {
            ViewState::NoData
        }
    }

    /// Placeholder text for non-ready states.
    pub fn message(&self, lang: Language) -> Option<&'static str> {
        match (self, lang) {
            (ViewState::Ready(_), _) => None,
            (ViewState::Loading, Language::Es) => Some("Cargando datos..."),
            (ViewState::Loading, Language::En) => Some("Loading data..."),
            (ViewState::Unavailable(_), Language::Es) => Some("Datos no disponibles"),
            (ViewState::Unavailable(_), Language::En) => Some("Data unavailable"),
            (ViewState::NoData, Language::Es) => Some("Sin datos para esta selección"),
            (ViewState::NoData, Language::En) => Some("No data for this selection"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::parse_dataset;

    const EUROSTAT: &str = "freq,unit,sectperf,geo,TIME_PERIOD,OBS_VALUE\n\
        A,PC_GDP,TOTAL,ES,2019,1.25\n\
        A,PC_GDP,TOTAL,ES,2020,1.41\n\
        A,PC_GDP,TOTAL,ES,2021,1.43\n\
        A,PC_GDP,BES,ES,2021,0.80\n\
        A,PC_GDP,TOTAL,EU27_2020,2019,2.23\n\
        A,PC_GDP,TOTAL,EU27_2020,2020,2.30\n\
        A,PC_GDP,TOTAL,EU27_2020,2021,0\n\
        A,PC_GDP,TOTAL,PT,2021,1.68\n\
        A,PC_GDP,TOTAL,DE,2021,3.13\n";

    const INE: &str = "Año;Comunidad;Sector;% PIB I+D\n\
        2019;Comunidad (ES51) Cataluña;Total;1,52\n\
        2020;Cataluña;Total;1,62\n\
        2020;Madrid;Total;1,76\n\
        2020;País Vasco;Total;2,11\n\
        2020;Total Nacional;Total;1,41\n";

    fn context() -> Context {
        Context {
            catalog: Catalog::builtin().unwrap(),
            table: EntityTable::builtin().unwrap(),
            source: DataSource::Dir("/nonexistent".into()),
        }
    }

    fn loaded(ctx: &Context) -> LoadedData {
        let country = parse_dataset(EUROSTAT, ctx.catalog.get("eurostat_gerd").unwrap(), &ctx.table).unwrap();
        let region = parse_dataset(INE, ctx.catalog.get("ine_regional").unwrap(), &ctx.table).unwrap();
        LoadedData {
            metric: Metric::RdGdp,
            country,
            region: Some(region),
        }
    }

    #[test]
    fn country_view_with_zero_eu_reference() {
        let ctx = context();
        let data = loaded(&ctx);
        let sel = Selection {
            to: Some(2021),
            ..Selection::default()
        };
        let view = build_view(&ctx, &data, &sel).unwrap();

        let years: Vec<i32> = view.rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2019, 2020, 2021]);
        assert_eq!(view.summary.latest_year, Some(2021));
        assert_eq!(view.summary.latest, Some(1.43));
        // EU value of 0 in 2021: the difference is absent, not infinite.
        assert_eq!(view.summary.peer_diffs[&SeriesKey::eu()], None);
        // DE 3.13, PT 1.68, ES 1.43; the EU aggregate is not ranked.
        assert_eq!(view.ranking.total(), 3);
        assert_eq!(view.summary.rank.map(|r| r.rank), Some(3));
        assert_eq!(view.legends[0].label, "España");

        let business = view.breakdown.iter().find(|s| s.sector == Sector::Business).unwrap();
        assert_eq!(business.value, Some(0.80));
        assert!((business.share.unwrap() - 55.944).abs() < 1e-2);
    }

    #[test]
    fn region_view_is_focal_and_missing_years_are_absent() {
        let ctx = context();
        let data = loaded(&ctx);
        let sel = Selection {
            region: Some("ES51".to_string()),
            from: Some(2019),
            to: Some(2021),
            language: Language::En,
            ..Selection::default()
        };
        let view = build_view(&ctx, &data, &sel).unwrap();

        assert_eq!(view.legends.len(), 3);
        assert_eq!(view.legends[2].label, "Catalonia");
        assert_eq!(view.rows[2].get(&SeriesKey::community()), None);
        assert!(view.rows[2].values.contains_key(&SeriesKey::community()));
        assert_eq!(view.summary.latest_year, Some(2020));
        assert_eq!(view.summary.latest, Some(1.62));
        assert_eq!(view.summary.rank.map(|r| (r.rank, r.total)), Some((3, 3)));
        let yoy = &view.yoy[&SeriesKey::community()];
        assert!((yoy[1].unwrap() - 6.578_947).abs() < 1e-4);
    }

    #[test]
    fn requested_years_are_clamped_to_data_span() {
        let ctx = context();
        let data = loaded(&ctx);
        let sel = Selection {
            from: Some(i32::MIN),
            to: Some(i32::MAX),
            ..Selection::default()
        };
        let view = build_view(&ctx, &data, &sel).unwrap();
        let years: Vec<i32> = view.rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2019, 2020, 2021]);

        let outside = Selection {
            from: Some(1900),
            to: Some(1950),
            ..Selection::default()
        };
        assert!(matches!(build_view(&ctx, &data, &outside), Err(DatasetError::Empty)));
    }

    #[test]
    fn unsupported_sector_is_no_data() {
        let ctx = context();
        let data = loaded(&ctx);
        let sel = Selection {
            sector: Sector::Government,
            ..Selection::default()
        };
        assert!(matches!(build_view(&ctx, &data, &sel), Err(DatasetError::Empty)));

        let state = ViewState::from_load(&LoadState::Ready(data), &ctx, &sel);
        assert!(matches!(state, ViewState::NoData));
        assert_eq!(state.message(Language::En), Some("No data for this selection"));
    }

    #[test]
    fn failed_fetch_is_unavailable() {
        let ctx = context();
        let state = ViewState::from_load(
            &LoadState::Failed(DatasetError::Status {
                dataset: "eurostat_gerd".to_string(),
                status: 503,
            }),
            &ctx,
            &Selection::default(),
        );
        assert!(matches!(state, ViewState::Unavailable(_)));
        assert_eq!(state.message(Language::Es), Some("Datos no disponibles"));
    }

    #[test]
    fn rank_year_defaults_to_latest_ranked_year() {
        let ctx = context();
        let data = loaded(&ctx);
        let (year, ranking) = rank_year(&ctx, &data.country, Sector::Total, None).unwrap();
        assert_eq!(year, 2021);
        assert_eq!(ranking.entries[0].code, "DE");
    }

    #[test]
    fn resolve_focus_checks_class() {
        let table = EntityTable::builtin().unwrap();
        assert_eq!(resolve_focus(&table, "Cataluña", EntityClass::Region).unwrap(), "ES51");
        assert_eq!(resolve_focus(&table, "spain", EntityClass::Country).unwrap(), "ES");
        assert_eq!(resolve_focus(&table, "Spain", EntityClass::Region).unwrap_err().exit_code(), 2);
    }
}
