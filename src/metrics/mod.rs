//! Derived metrics over joined series.
//!
//! All functions are total: missing inputs and zero denominators yield
//! `None`, never `inf`, `NaN` or a panic.

use std::collections::BTreeMap;

use crate::domain::{MetricsSummary, RankPosition, SeriesKey, TimeSeriesRow};
use crate::resolve::EntityTable;

/// Percentage change `(cur - prev) / prev * 100`.
pub fn pct_change(cur: Option<f64>, prev: Option<f64>) -> Option<f64> {
    let (cur, prev) = (cur?, prev?);
    if prev == 0.0 {
        return None;
    }
    finite((cur - prev) / prev * 100.0)
}

/// Year-over-year deltas for a column of values (index 0 is always absent).
pub fn yoy(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    out.extend(values.first().map(|_| None));
    out.extend(values.windows(2).map(|w| pct_change(w[1], w[0])));
    out
}

/// Difference of `focal` against `reference` in percent.
pub fn peer_diff(focal: Option<f64>, reference: Option<f64>) -> Option<f64> {
    pct_change(focal, reference)
}

/// `part` as a percentage of `total`.
pub fn share_of_total(part: Option<f64>, total: Option<f64>) -> Option<f64> {
    let (part, total) = (part?, total?);
    if total == 0.0 {
        return None;
    }
    finite(part / total * 100.0)
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// One ranked entity.
#[derive(Debug, Clone, PartialEq)]
pub struct RankEntry {
    pub code: String,
    pub value: f64,
    /// 1-based.
    pub rank: usize,
}

/// Peers of one year/sector, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub entries: Vec<RankEntry>,
}

impl Ranking {
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn position(&self, code: &str) -> Option<RankPosition> {
        self.entries
            .iter()
            .find(|e| e.code.eq_ignore_ascii_case(code))
            .map(|e| RankPosition {
                rank: e.rank,
                total: self.total(),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rank a snapshot of `(code, value)` pairs descending by value.
///
/// Supranational aggregates and absent values are left out. Equal values
/// keep their input order and get consecutive ranks; there is no tiebreak.
pub fn rank(snapshot: &[(String, Option<f64>)], table: &EntityTable) -> Ranking {
    let mut candidates: Vec<(&str, f64)> = snapshot
        .iter()
        .filter(|(code, _)| !table.is_supranational(code))
        .filter_map(|(code, value)| value.filter(|v| v.is_finite()).map(|v| (code.as_str(), v)))
        .collect();

    // `sort_by` is stable, so ties stay in input order.
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ranking {
        entries: candidates
            .into_iter()
            .enumerate()
            .map(|(idx, (code, value))| RankEntry {
                code: code.to_string(),
                value,
                rank: idx + 1,
            })
            .collect(),
    }
}

/// Headline numbers for a chart: latest primary value, its YoY change, and
/// its difference against each peer series in the same year.
pub fn summarize(rows: &[TimeSeriesRow], primary: &SeriesKey, peers: &[SeriesKey]) -> MetricsSummary {
    let latest_idx = rows.iter().rposition(|r| r.get(primary).is_some());

    let Some(idx) = latest_idx else {
        return MetricsSummary {
            latest_year: None,
            latest: None,
            yoy: None,
            peer_diffs: peers.iter().map(|k| (k.clone(), None)).collect(),
            rank: None,
        };
    };

    let row = &rows[idx];
    let latest = row.get(primary);
    let prev = idx.checked_sub(1).and_then(|i| rows[i].get(primary));
    let peer_diffs: BTreeMap<SeriesKey, Option<f64>> = peers
        .iter()
        .map(|k| (k.clone(), peer_diff(latest, row.get(k))))
        .collect();

    MetricsSummary {
        latest_year: Some(row.year),
        latest,
        yoy: pct_change(latest, prev),
        peer_diffs,
        rank: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(year: i32, values: &[(&str, Option<f64>)]) -> TimeSeriesRow {
        TimeSeriesRow {
            year,
            values: values.iter().map(|(k, v)| (SeriesKey::from(*k), *v)).collect(),
        }
    }

    #[test]
    fn yoy_handles_absent_and_zero() {
        let deltas = yoy(&[Some(1.0), Some(1.5), None, Some(2.0), Some(0.0), Some(1.0)]);
        assert_eq!(deltas.len(), 6);
        assert_eq!(deltas[0], None);
        assert!((deltas[1].unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(deltas[2], None);
        assert_eq!(deltas[3], None);
        assert!((deltas[4].unwrap() + 100.0).abs() < 1e-9);
        assert_eq!(deltas[5], None);
        assert!(yoy(&[]).is_empty());
    }

    #[test]
    fn peer_diff_with_zero_reference_is_absent() {
        assert_eq!(peer_diff(Some(1.41), Some(0.0)), None);
        assert_eq!(peer_diff(Some(1.41), None), None);
        assert_eq!(peer_diff(None, Some(2.0)), None);
        let d = peer_diff(Some(1.5), Some(2.0)).unwrap();
        assert!((d + 25.0).abs() < 1e-9);
    }

    #[test]
    fn share_of_total_basic() {
        assert!((share_of_total(Some(0.8), Some(1.6)).unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(share_of_total(Some(0.8), Some(0.0)), None);
    }

    #[test]
    fn ranking_excludes_aggregates_and_keeps_tie_order() {
        let table = EntityTable::builtin().unwrap();
        let snapshot = vec![
            ("EU27_2020".to_string(), Some(2.2)),
            ("ES".to_string(), Some(1.4)),
            ("PT".to_string(), Some(1.7)),
            ("IT".to_string(), Some(1.4)),
            ("EA20".to_string(), Some(2.3)),
            ("FR".to_string(), None),
            ("DE".to_string(), Some(3.1)),
        ];
        let ranking = rank(&snapshot, &table);
        let codes: Vec<&str> = ranking.entries.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["DE", "PT", "ES", "IT"]);
        assert_eq!(ranking.position("es"), Some(RankPosition { rank: 3, total: 4 }));
        assert_eq!(ranking.position("EU27_2020"), None);
        assert_eq!(ranking.position("FR"), None);
    }

    #[test]
    fn summarize_uses_latest_primary_year() {
        let rows = vec![
            row(2019, &[("community", Some(1.5)), ("country", Some(1.25))]),
            row(2020, &[("community", Some(1.6)), ("country", Some(1.4))]),
            row(2021, &[("community", None), ("country", Some(1.43))]),
        ];
        let summary = summarize(&rows, &SeriesKey::community(), &[SeriesKey::country()]);
        assert_eq!(summary.latest_year, Some(2020));
        assert_eq!(summary.latest, Some(1.6));
        assert!((summary.yoy.unwrap() - 6.666_666).abs() < 1e-4);
        let diff = summary.peer_diffs[&SeriesKey::country()].unwrap();
        assert!((diff - 14.285_714).abs() < 1e-4);
    }

    #[test]
    fn summarize_without_data() {
        let rows = vec![row(2020, &[("country", None)])];
        let summary = summarize(&rows, &SeriesKey::country(), &[SeriesKey::eu()]);
        assert_eq!(summary.latest_year, None);
        assert_eq!(summary.peer_diffs[&SeriesKey::eu()], None);
    }

    proptest! {
        #[test]
        fn yoy_matches_formula(prev in -1e6f64..1e6, cur in -1e6f64..1e6) {
            let d = yoy(&[Some(prev), Some(cur)]);
            if prev == 0.0 {
                prop_assert_eq!(d[1], None);
            } else {
                let expected = (cur - prev) / prev * 100.0;
                prop_assert!((d[1].unwrap() - expected).abs() <= 1e-9 * expected.abs().max(1.0));
            }
        }
    }
}
