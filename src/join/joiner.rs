//! Align independently-shaped series on a shared year axis.
//!
//! Each `SeriesSpec` contributes one column. For every requested year the
//! first row accepted by its matcher supplies the value; if none
//! matches the value is absent. Source datasets are expected to hold one row
//! per (entity, year, sector, unit); extra matches are counted and logged.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{Observation, SeriesKey, TimeSeriesRow};
use crate::text::squash;

/// Row predicate used by the joiner.
pub trait RowMatcher {
    fn matches(&self, obs: &Observation) -> bool;
}

impl<F> RowMatcher for F
where
    F: Fn(&Observation) -> bool,
{
    fn matches(&self, obs: &Observation) -> bool {
        self(obs)
    }
}

/// The usual predicate: resolved entity code + native sector + unit.
///
/// `sector: None` / `unit: None` accept any value. Sector and unit comparisons
/// ignore case, accents and punctuation.
#[derive(Debug, Clone)]
pub struct SeriesMatch {
    entity_code: String,
    sector: Option<String>,
    unit: Option<String>,
    /// Set when the dataset cannot provide the requested sector at all.
    unavailable: bool,
}

impl SeriesMatch {
    pub fn new(entity_code: &str) -> Self {
        Self {
            entity_code: entity_code.to_ascii_uppercase(),
            sector: None,
            unit: None,
            unavailable: false,
        }
    }

    pub fn sector(mut self, native: Option<&str>) -> Self {
        self.sector = native.map(squash);
        self
    }

    pub fn unit(mut self, unit: Option<&str>) -> Self {
        self.unit = unit.map(squash);
        self
    }

    /// A matcher that accepts nothing (the series will be all-absent).
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

impl RowMatcher for SeriesMatch {
    fn matches(&self, obs: &Observation) -> bool {
        if self.unavailable {
            return false;
        }
        let Some(code) = obs.entity_code.as_deref() else {
            return false;
        };
        if !code.eq_ignore_ascii_case(&self.entity_code) {
            return false;
        }
        if !field_matches(obs.sector.as_deref(), self.sector.as_deref()) {
            return false;
        }
        field_matches(obs.unit.as_deref(), self.unit.as_deref())
    }
}

fn field_matches(value: Option<&str>, wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted else { return true };
    let Some(value) = value else { return false };
    squash(value) == wanted
}

/// One column of the joined table.
pub struct SeriesSpec<'a> {
    pub key: SeriesKey,
    pub rows: &'a [Observation],
    pub matcher: &'a dyn RowMatcher,
}

impl<'a> SeriesSpec<'a> {
    pub fn new(key: SeriesKey, rows: &'a [Observation], matcher: &'a dyn RowMatcher) -> Self {
        Self { key, rows, matcher }
    }
}

/// Join `specs` over `years`.
///
/// Output: one row per distinct requested year, ascending, each carrying an
/// entry (possibly `None`) for every spec key. Input order of `years` and of
/// the rows does not affect the output order.
pub fn join(years: &[i32], specs: &[SeriesSpec<'_>]) -> Vec<TimeSeriesRow> {
    let mut years = years.to_vec();
    years.sort_unstable();
    years.dedup();

    let columns: Vec<(&SeriesKey, HashMap<i32, Option<f64>>)> = specs
        .iter()
        .map(|spec| (&spec.key, index_first_match(spec, &years)))
        .collect();

    years
        .iter()
        .map(|&year| {
            let values: BTreeMap<SeriesKey, Option<f64>> = columns
                .iter()
                .map(|(key, by_year)| ((*key).clone(), by_year.get(&year).copied().flatten()))
                .collect();
            TimeSeriesRow { year, values }
        })
        .collect()
}

/// First matching row per requested year.
fn index_first_match(spec: &SeriesSpec<'_>, years: &[i32]) -> HashMap<i32, Option<f64>> {
    let mut by_year: HashMap<i32, Option<f64>> = HashMap::new();
    let mut duplicates = 0usize;

    for obs in spec.rows {
        if years.binary_search(&obs.year).is_err() || !spec.matcher.matches(obs) {
            continue;
        }
        if by_year.contains_key(&obs.year) {
            duplicates += 1;
            continue;
        }
        by_year.insert(obs.year, obs.value);
    }

    if duplicates > 0 {
        tracing::debug!(
            series = %spec.key,
            duplicates,
            "multiple rows matched one year; kept the first"
        );
    }
    by_year
}

/// Inclusive year range covered by `rows`, if any.
pub fn year_range(rows: &[Observation]) -> Option<(i32, i32)> {
    let min = rows.iter().map(|o| o.year).min()?;
    let max = rows.iter().map(|o| o.year).max()?;
    Some((min, max))
}

/// Values of one series in row order (for YoY and plotting).
pub fn column(rows: &[TimeSeriesRow], key: &SeriesKey) -> Vec<Option<f64>> {
    rows.iter().map(|r| r.get(key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(year: i32, code: &str, sector: &str, value: Option<f64>) -> Observation {
        Observation {
            line: 0,
            year,
            entity: code.to_string(),
            entity_code: Some(code.to_string()),
            sector: Some(sector.to_string()),
            unit: None,
            value,
        }
    }

    #[test]
    fn missing_year_is_absent() {
        let rows = vec![obs(2020, "ES51", "Total", Some(1.52))];
        let matcher = SeriesMatch::new("ES51").sector(Some("total"));
        let specs = [SeriesSpec::new(SeriesKey::community(), &rows, &matcher)];

        let joined = join(&[2020, 2021], &specs);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].year, 2020);
        assert_eq!(joined[0].values[&SeriesKey::community()], Some(1.52));
        assert_eq!(joined[1].year, 2021);
        assert!(joined[1].values.contains_key(&SeriesKey::community()));
        assert_eq!(joined[1].values[&SeriesKey::community()], None);
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        let rows = vec![
            obs(2022, "ES", "TOTAL", Some(1.44)),
            obs(2019, "ES", "TOTAL", Some(1.25)),
            obs(2020, "ES", "TOTAL", Some(1.41)),
        ];
        let matcher = SeriesMatch::new("es");
        let specs = [SeriesSpec::new(SeriesKey::country(), &rows, &matcher)];

        let joined = join(&[2022, 2019, 2020, 2019], &specs);
        let years: Vec<i32> = joined.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2019, 2020, 2022]);
        assert_eq!(column(&joined, &SeriesKey::country()), vec![Some(1.25), Some(1.41), Some(1.44)]);
    }

    #[test]
    fn first_match_wins_even_if_absent() {
        let rows = vec![
            obs(2020, "ES", "TOTAL", None),
            obs(2020, "ES", "TOTAL", Some(9.9)),
        ];
        let matcher = SeriesMatch::new("ES");
        let specs = [SeriesSpec::new(SeriesKey::country(), &rows, &matcher)];
        let joined = join(&[2020], &specs);
        assert_eq!(joined[0].get(&SeriesKey::country()), None);
    }

    #[test]
    fn every_key_present_in_every_row() {
        let national = vec![obs(2020, "ES", "TOTAL", Some(1.41)), obs(2020, "EU27_2020", "TOTAL", Some(2.3))];
        let regional = vec![obs(2021, "ES51", "Total", Some(1.6))];
        let es = SeriesMatch::new("ES").sector(Some("TOTAL"));
        let eu = SeriesMatch::new("EU27_2020").sector(Some("TOTAL"));
        let cat = SeriesMatch::new("ES51").sector(Some("Total"));
        let specs = [
            SeriesSpec::new(SeriesKey::country(), &national, &es),
            SeriesSpec::new(SeriesKey::eu(), &national, &eu),
            SeriesSpec::new(SeriesKey::community(), &regional, &cat),
        ];

        let joined = join(&[2020, 2021], &specs);
        for row in &joined {
            assert_eq!(row.values.len(), 3);
        }
        assert_eq!(joined[0].get(&SeriesKey::eu()), Some(2.3));
        assert_eq!(joined[1].get(&SeriesKey::community()), Some(1.6));
        assert_eq!(joined[1].get(&SeriesKey::country()), None);
    }

    #[test]
    fn sector_and_unit_filters_apply() {
        let mut row = obs(2020, "ES", "Administración Pública", Some(0.25));
        row.unit = Some("PC_GDP".to_string());
        let rows = vec![row];

        let gov = SeriesMatch::new("ES")
            .sector(Some("administracion publica"))
            .unit(Some("pc_gdp"));
        assert!(gov.matches(&rows[0]));
        assert!(!SeriesMatch::new("ES").sector(Some("BES")).matches(&rows[0]));
        assert!(!SeriesMatch::new("ES").unit(Some("EUR_HAB")).matches(&rows[0]));
        assert!(!SeriesMatch::new("ES").unavailable().matches(&rows[0]));
    }

    #[test]
    fn closures_work_as_matchers() {
        let rows = vec![obs(2020, "FR", "TOTAL", Some(2.2))];
        let any_france = |o: &Observation| o.entity == "FR";
        let specs = [SeriesSpec::new(SeriesKey::new("france"), &rows, &any_france)];
        let joined = join(&[2020], &specs);
        assert_eq!(joined[0].get(&SeriesKey::new("france")), Some(2.2));
    }

    #[test]
    fn year_range_spans_rows() {
        let rows = vec![obs(2015, "ES", "T", None), obs(2009, "ES", "T", None)];
        assert_eq!(year_range(&rows), Some((2009, 2015)));
        assert_eq!(year_range(&[]), None);
    }
}
