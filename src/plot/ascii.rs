//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - one symbol per series (`*`, `+`, `o`, `x`) at each present year
//! - `.` segments joining consecutive present years (absent years break the line)
//! - end labels to the right of the plot, de-cluttered one row apart

use crate::domain::{ChartFile, SeriesLegend, TimeSeriesRow};
use crate::layout::{end_markers, value_bounds};

const SYMBOLS: [char; 4] = ['*', '+', 'o', 'x'];

/// Render a plot of the joined series.
pub fn render_ascii_plot(legends: &[SeriesLegend], rows: &[TimeSeriesRow], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (year_min, year_max) = match (rows.first(), rows.last()) {
        (Some(a), Some(b)) => (a.year as f64, b.year as f64),
        _ => return "Plot: no data\n".to_string(),
    };
    let Some(bounds) = value_bounds(rows) else {
        return "Plot: no data\n".to_string();
    };
    let [y_min, y_max] = bounds;

    let mut grid = vec![vec![' '; width]; height];

    // Segments first so symbols can overlay.
    for legend in legends {
        let mut prev: Option<(usize, usize)> = None;
        for row in rows {
            let Some(v) = row.get(&legend.key) else {
                prev = None;
                continue;
            };
            let cell = (
                map_x(row.year as f64, year_min, year_max, width),
                map_y(v, y_min, y_max, height),
            );
            if let Some((x0, y0)) = prev {
                draw_line(&mut grid, x0, y0, cell.0, cell.1, '.');
            }
            prev = Some(cell);
        }
    }

    for (idx, legend) in legends.iter().enumerate() {
        let symbol = symbol(idx);
        for row in rows {
            if let Some(v) = row.get(&legend.key) {
                let x = map_x(row.year as f64, year_min, year_max, width);
                let y = map_y(v, y_min, y_max, height);
                grid[y][x] = symbol;
            }
        }
    }

    // End labels: one grid row is the minimum gap. Labels pushed past the
    // bottom get extra rows rather than overwriting each other.
    let mut labels: Vec<Vec<String>> = vec![Vec::new(); height];
    for marker in end_markers(legends, rows, bounds, (height - 1) as f64, 1.0) {
        let Some(idx) = legends.iter().position(|l| l.key == marker.series_key) else {
            continue;
        };
        let row = marker.adjusted_y.round().max(0.0) as usize;
        if row >= labels.len() {
            labels.resize(row + 1, Vec::new());
        }
        labels[row].push(format!("{} {} {}", symbol(idx), legends[idx].badge, fmt_label(marker.value)));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: years=[{}, {}] | y=[{y_min:.2}, {y_max:.2}]\n",
        year_min as i32, year_max as i32
    ));

    for (i, label) in labels.iter().enumerate() {
        let mut line: String = match grid.get(i) {
            Some(cells) => cells.iter().collect(),
            None => " ".repeat(width),
        };
        if !label.is_empty() {
            line.push(' ');
            line.push_str(&label.join("  "));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Render a saved chart: title, legend, plot.
pub fn render_chart_file(chart: &ChartFile, width: usize, height: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", chart.title));
    for (idx, legend) in chart.series.iter().enumerate() {
        out.push_str(&format!("  {} {} ({})\n", symbol(idx), legend.label, legend.badge));
    }
    out.push_str(&render_ascii_plot(&chart.series, &chart.rows, width, height));
    out
}

fn symbol(idx: usize) -> char {
    SYMBOLS[idx % SYMBOLS.len()]
}

fn fmt_label(v: f64) -> String {
    if v.abs() >= 100.0 { format!("{v:.0}") } else { format!("{v:.2}") }
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    if t_max <= t_min {
        return 0;
    }
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesKey;

    fn legend(key: &str, badge: &str) -> SeriesLegend {
        SeriesLegend {
            key: SeriesKey::from(key),
            label: badge.to_string(),
            color: "#000000".to_string(),
            icon: String::new(),
            badge: badge.to_string(),
        }
    }

    fn row(year: i32, country: Option<f64>, eu: Option<f64>) -> TimeSeriesRow {
        TimeSeriesRow {
            year,
            values: [(SeriesKey::country(), country), (SeriesKey::eu(), eu)].into_iter().collect(),
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let legends = [legend("country", "ES"), legend("eu", "EU")];
        let rows = [row(2019, Some(1.0), Some(2.0)), row(2020, Some(1.0), Some(2.0))];

        let txt = render_ascii_plot(&legends, &rows, 10, 5);
        let expected = concat!(
            "Plot: years=[2019, 2020] | y=[0.95, 2.05]\n",
            "+........+ + EU 2.00\n",
            "\n",
            "\n",
            "\n",
            "*........* * ES 1.00\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn close_series_get_separate_label_rows() {
        let legends = [legend("country", "ES"), legend("eu", "EU")];
        let rows = [row(2019, Some(1.0), Some(3.0)), row(2020, Some(2.0), Some(2.01))];

        let txt = render_ascii_plot(&legends, &rows, 20, 8);
        let es = txt.lines().position(|l| l.ends_with("ES 2.00")).unwrap();
        let eu = txt.lines().position(|l| l.ends_with("EU 2.01")).unwrap();
        assert_ne!(es, eu);
    }

    #[test]
    fn absent_years_break_the_line() {
        let legends = [legend("country", "ES")];
        let rows = [
            row(2019, Some(1.0), None),
            row(2020, None, None),
            row(2021, Some(1.0), None),
        ];
        let txt = render_ascii_plot(&legends, &rows, 11, 5);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[3], "*         * * ES 1.00");
        assert!(lines[1..].iter().all(|l| !l.contains("..")));
    }

    #[test]
    fn empty_rows_render_placeholder() {
        assert_eq!(render_ascii_plot(&[], &[], 10, 5), "Plot: no data\n");
    }
}
