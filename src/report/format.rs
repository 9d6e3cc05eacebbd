//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (labels follow the selection's language)

use crate::app::pipeline::{ChartView, SectorShare};
use crate::domain::{Language, Level, Metric, Sector, SeriesKey};
use crate::metrics::Ranking;
use crate::resolve::{EntityTable, MatchRule};

/// Absent values print as this.
const ABSENT: &str = "-";

/// Pick the Spanish or English text.
pub fn tr(lang: Language, es: &'static str, en: &'static str) -> &'static str {
    match lang {
        Language::Es => es,
        Language::En => en,
    }
}

/// Header + headline metrics for a chart view.
pub fn format_summary(view: &ChartView) -> String {
    let lang = view.selection.language;
    let unit = view.selection.metric.unit();
    let mut out = String::new();

    out.push_str(&format!("=== rds - {} ===\n", view.title));
    let (first, last) = match (view.rows.first(), view.rows.last()) {
        (Some(a), Some(b)) => (a.year.to_string(), b.year.to_string()),
        _ => (ABSENT.to_string(), ABSENT.to_string()),
    };
    out.push_str(&format!("{}: {first}-{last}\n", tr(lang, "Años", "Years")));
    out.push_str(&format!("{}:\n", tr(lang, "Series", "Series")));
    for legend in &view.legends {
        let focal = if legend.key == view.selection.primary_key() { "*" } else { " " };
        out.push_str(&format!("{focal} {:<10} {:<8} {}\n", legend.key, legend.badge, legend.label));
    }

    let s = &view.summary;
    out.push('\n');
    out.push_str(&format!(
        "{} ({}): {}\n",
        tr(lang, "Último valor", "Latest value"),
        s.latest_year.map(|y| y.to_string()).unwrap_or_else(|| ABSENT.to_string()),
        fmt_value(s.latest, view.selection.metric, unit),
    ));
    out.push_str(&format!("{}: {}\n", tr(lang, "Variación anual", "Year-over-year"), fmt_pct(s.yoy)));
    for (key, diff) in &s.peer_diffs {
        out.push_str(&format!(
            "{} {}: {}\n",
            tr(lang, "Diferencia vs", "Difference vs"),
            legend_label(view, key),
            fmt_pct(*diff)
        ));
    }
    if let Some(rank) = s.rank {
        out.push_str(&format!(
            "{}: {}/{}\n",
            tr(lang, "Posición", "Rank"),
            rank.rank,
            rank.total
        ));
    }
    out
}

fn legend_label<'a>(view: &'a ChartView, key: &'a SeriesKey) -> &'a str {
    view.legends
        .iter()
        .find(|l| l.key == *key)
        .map(|l| l.label.as_str())
        .unwrap_or(key.as_str())
}

/// The joined table: one row per year, one column per series, plus YoY of
/// the focal series.
pub fn format_series_table(view: &ChartView) -> String {
    let lang = view.selection.language;
    let metric = view.selection.metric;
    let primary = view.selection.primary_key();
    let mut out = String::new();

    let mut header = format!("{:<6}", tr(lang, "año", "year"));
    let mut rule = format!("{:-<6}", "");
    for legend in &view.legends {
        header.push_str(&format!(" {:>14}", truncate(&legend.label, 14)));
        rule.push_str(&format!(" {:-<14}", ""));
    }
    header.push_str(&format!(" {:>10}", tr(lang, "var. %", "yoy %")));
    rule.push_str(&format!(" {:-<10}", ""));
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    let yoy = view.yoy.get(&primary);
    for (idx, row) in view.rows.iter().enumerate() {
        let mut line = format!("{:<6}", row.year);
        for legend in &view.legends {
            line.push_str(&format!(" {:>14}", fmt_value(row.get(&legend.key), metric, "")));
        }
        let delta = yoy.and_then(|v| v.get(idx).copied().flatten());
        line.push_str(&format!(" {:>10}", fmt_pct(delta)));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Ranked peers with localized names.
pub fn format_ranking(
    ranking: &Ranking,
    year: i32,
    table: &EntityTable,
    metric: Metric,
    lang: Language,
    top: Option<usize>,
    highlight: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {year} ({} {}):\n",
        tr(lang, "Clasificación", "Ranking"),
        ranking.total(),
        tr(lang, "entidades", "entities")
    ));
    out.push_str(format!("{:>4} {:<8} {:<28} {:>12}", "#", tr(lang, "código", "code"), tr(lang, "nombre", "name"), tr(lang, "valor", "value")).trim_end());
    out.push('\n');
    out.push_str(format!("{:-<4} {:-<8} {:-<28} {:-<12}", "", "", "", "").trim_end());
    out.push('\n');

    let shown = top.unwrap_or(usize::MAX);
    for entry in ranking.entries.iter().take(shown) {
        let name = table.by_code(&entry.code).map(|e| e.name(lang)).unwrap_or(&entry.code);
        let marker = match highlight {
            Some(code) if code.eq_ignore_ascii_case(&entry.code) => " <",
            _ => "",
        };
        out.push_str(
            format!(
                "{:>4} {:<8} {:<28} {:>12}{marker}",
                entry.rank,
                entry.code,
                truncate(name, 28),
                fmt_value(Some(entry.value), metric, "")
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Sector values and shares of the total for the focal entity.
pub fn format_breakdown(view: &ChartView) -> String {
    let lang = view.selection.language;
    let mut out = String::new();
    let year = view
        .summary
        .latest_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| ABSENT.to_string());
    out.push_str(&format!("{} ({year}):\n", tr(lang, "Desglose por sector", "Sector breakdown")));
    for SectorShare { sector, value, share } in &view.breakdown {
        out.push_str(
            format!(
                "  {:<26} {:>12} {:>9}",
                sector.label(lang),
                fmt_value(*value, view.selection.metric, ""),
                share.map(|s| format!("{s:.1}%")).unwrap_or_else(|| ABSENT.to_string())
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// One line per input for `rds resolve`.
pub fn format_resolution(results: &[(String, Option<(String, String, MatchRule)>)]) -> String {
    let mut out = String::new();
    for (input, hit) in results {
        match hit {
            Some((code, name, rule)) => {
                out.push_str(&format!("{:<36} -> {:<10} {:<28} [{}]\n", truncate(input, 36), code, name, rule.label()))
            }
            None => out.push_str(&format!("{:<36} -> (unresolved)\n", truncate(input, 36))),
        }
    }
    out
}

/// Heading for `rds rank`.
pub fn format_rank_heading(metric: Metric, level: Level, sector: Sector, lang: Language) -> String {
    let level = match level {
        Level::Country => tr(lang, "países", "countries"),
        Level::Region => tr(lang, "comunidades autónomas", "regions"),
    };
    format!("=== rds - {} - {} ({level}) ===\n", metric.label(lang), sector.label(lang))
}

/// Value with the metric's precision: percentages with two decimals,
/// counts as integers.
pub fn fmt_value(v: Option<f64>, metric: Metric, unit: &str) -> String {
    match v {
        None => ABSENT.to_string(),
        Some(v) => match metric {
            Metric::RdGdp => format!("{v:.2}{unit}"),
            Metric::Researchers | Metric::Patents => format!("{v:.0}{unit}"),
        },
    }
}

/// Signed percentage (`+6.6%`), or `-` when absent.
pub fn fmt_pct(v: Option<f64>) -> String {
    v.map(|v| format!("{v:+.1}%")).unwrap_or_else(|| ABSENT.to_string())
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
