//! Plotters-powered time-series chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - nicer axis + mesh rendering
//! - less manual work for ticks/labels
//! - one colored line per series with gaps where years are absent
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One series, already split into contiguous runs of present years.
pub struct ChartSeries {
    pub segments: Vec<Vec<(f64, f64)>>,
    pub color: (u8, u8, u8),
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct SeriesPlottersChart<'a> {
    pub series: &'a [ChartSeries],
    /// X bounds (years).
    pub x_bounds: [f64; 2],
    /// Y bounds (metric units).
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: String,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for SeriesPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(&self.y_label)
                .x_labels(6)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(WHITE)
                .bold_line_style(WHITE)
                .draw()?;

            for series in self.series {
                let (r, g, b) = series.color;
                let color = RGBColor(r, g, b);
                for segment in &series.segments {
                    if segment.len() > 1 {
                        chart.draw_series(LineSeries::new(segment.iter().copied(), &color))?;
                    }
                    // `Circle` radii are mapped incorrectly by the backend; a
                    // colored `Pixel` marks each year instead.
                    chart.draw_series(segment.iter().map(|&(x, y)| Pixel::new((x, y), color)))?;
                }
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
