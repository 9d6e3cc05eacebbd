use std::path::PathBuf;
use std::time::{Duration, Instant};

use rd_series::app::pipeline::{self, Context, Selection, ViewState};
use rd_series::data::catalog::Catalog;
use rd_series::data::fetch::DataSource;
use rd_series::data::loader::{LoadState, Loader};
use rd_series::domain::{Language, Level, Metric, Sector, SeriesKey};
use rd_series::resolve::EntityTable;

fn context() -> Context {
    Context {
        catalog: Catalog::builtin().unwrap(),
        table: EntityTable::builtin().unwrap(),
        source: DataSource::Dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")),
    }
}

fn close(a: Option<f64>, b: f64) -> bool {
    a.is_some_and(|a| (a - b).abs() < 1e-6)
}

#[test]
fn country_view_from_bundled_data() {
    let ctx = context();
    let data = pipeline::load(&ctx, Metric::RdGdp, false).unwrap();
    let sel = Selection {
        from: Some(2019),
        ..Selection::default()
    };
    let view = pipeline::build_view(&ctx, &data, &sel).unwrap();

    let years: Vec<i32> = view.rows.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![2019, 2020, 2021, 2022]);
    assert_eq!(view.summary.latest_year, Some(2022));
    // "1.44 p": the provisional flag is dropped.
    assert!(close(view.summary.latest, 1.44));
    assert!(close(view.summary.peer_diffs[&SeriesKey::eu()], (1.44 - 2.24) / 2.24 * 100.0));

    // DE, FR, PT, ES, IT; EU and euro area aggregates are not ranked.
    assert_eq!(view.ranking.total(), 5);
    assert_eq!(view.summary.rank.map(|r| r.rank), Some(4));
}

#[test]
fn region_view_keeps_missing_years_absent() {
    let ctx = context();
    let data = pipeline::load(&ctx, Metric::RdGdp, true).unwrap();
    let sel = Selection {
        region: Some("ES51".to_string()),
        language: Language::En,
        ..Selection::default()
    };
    let view = pipeline::build_view(&ctx, &data, &sel).unwrap();

    let last = view.rows.last().unwrap();
    assert_eq!(last.year, 2022);
    assert!(last.values.contains_key(&SeriesKey::community()));
    assert_eq!(last.get(&SeriesKey::community()), None);
    assert!(close(last.get(&SeriesKey::country()), 1.44));

    // "Comunidad (ES51) Cataluña" in 2015 joins the same series.
    assert!(close(view.rows[0].get(&SeriesKey::community()), 1.45));

    assert_eq!(view.summary.latest_year, Some(2021));
    assert!(close(view.summary.latest, 1.69));
    // País Vasco, Navarra, Madrid, Cataluña, ...; "Total Nacional" is not a region.
    assert_eq!(view.summary.rank.map(|r| r.rank), Some(4));
    assert!(view.ranking.position("ES").is_none());
    assert!(view.ranking.position("ES30").is_some());

    let business = view.breakdown.iter().find(|s| s.sector == Sector::Business).unwrap();
    assert!(close(business.share, 1.03 / 1.69 * 100.0));

    let misses = data.misses();
    assert!(misses.iter().any(|(_, input, _)| input == "Atlántida"));
}

#[test]
fn patents_without_sector_column() {
    let ctx = context();
    let data = pipeline::load(&ctx, Metric::Patents, false).unwrap();

    let view = pipeline::build_view(&ctx, &data, &Selection {
        metric: Metric::Patents,
        ..Selection::default()
    })
    .unwrap();
    assert!(close(view.summary.latest, 2024.0));
    // The EU row is found through its code column.
    assert!(close(view.rows.last().unwrap().get(&SeriesKey::eu()), 59000.0));

    let business = Selection {
        metric: Metric::Patents,
        sector: Sector::Business,
        ..Selection::default()
    };
    let state = ViewState::from_load(&LoadState::Ready(data), &ctx, &business);
    assert!(matches!(state, ViewState::NoData));
}

#[test]
fn regional_ranking_defaults_to_latest_year() {
    let ctx = context();
    let data = pipeline::load(&ctx, Metric::Patents, true).unwrap();
    let dataset = data.dataset(Level::Region).unwrap();
    let (year, ranking) = pipeline::rank_year(&ctx, dataset, Sector::Total, None).unwrap();
    assert_eq!(year, 2022);
    assert_eq!(ranking.entries[0].code, "ES51");
    assert_eq!(ranking.entries[0].value, 955.0);
}

#[test]
fn missing_file_is_unavailable() {
    let ctx = Context {
        source: DataSource::Dir(PathBuf::from("/nonexistent")),
        ..context()
    };
    let err = pipeline::load(&ctx, Metric::RdGdp, false).unwrap_err();
    assert!(err.is_unavailable());
}

#[test]
fn background_load_reaches_ready() {
    let ctx = std::sync::Arc::new(context());
    let mut loader = Loader::new();
    let job_ctx = std::sync::Arc::clone(&ctx);
    loader.request(move || pipeline::load(&job_ctx, Metric::Researchers, true));

    let deadline = Instant::now() + Duration::from_secs(10);
    while loader.state().is_loading() && Instant::now() < deadline {
        loader.poll();
        std::thread::sleep(Duration::from_millis(10));
    }

    let sel = Selection {
        metric: Metric::Researchers,
        region: Some("ES30".to_string()),
        ..Selection::default()
    };
    let ViewState::Ready(view) = ViewState::from_load(loader.state(), &ctx, &sel) else {
        panic!("expected a ready view");
    };
    // "38.850,1" with comma decimals.
    assert!(close(view.summary.latest, 38850.1));
}
