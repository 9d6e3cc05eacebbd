//! Chart-end annotation layout.
//!
//! Flag badges sit at the right edge of a chart, one per visible series, at
//! the pixel row of that series' last value. When several series end close
//! together the badges would overlap, so they are pushed apart with a single
//! greedy pass: sort by pixel Y, then move each badge down to
//! `previous + min_gap` whenever it sits closer than `min_gap`.
//!
//! This is not a constraint solver. With many clustered series the last
//! badge can end up below the plot area; callers clip or accept that.

use crate::domain::{AnnotationPoint, SeriesKey, SeriesLegend, TimeSeriesRow};

/// Default vertical spacing between badges, in pixels.
pub const DEFAULT_MIN_GAP: f64 = 24.0;

/// A badge before layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationInput {
    pub series_key: SeriesKey,
    pub value: f64,
    pub pixel_y: f64,
    pub color: String,
    pub icon: String,
}

/// Lay out badges so adjacent ones are at least `min_gap` apart.
///
/// Output is sorted by raw pixel Y (stable for equal Y). Inputs with a
/// non-finite pixel Y are dropped.
pub fn layout_annotations(inputs: Vec<AnnotationInput>, min_gap: f64) -> Vec<AnnotationPoint> {
    let min_gap = if min_gap.is_finite() { min_gap.max(0.0) } else { 0.0 };

    let mut sorted: Vec<AnnotationInput> = inputs.into_iter().filter(|a| a.pixel_y.is_finite()).collect();
    sorted.sort_by(|a, b| a.pixel_y.total_cmp(&b.pixel_y));

    let mut out: Vec<AnnotationPoint> = Vec::with_capacity(sorted.len());
    for input in sorted {
        let adjusted_y = match out.last() {
            Some(prev) if input.pixel_y - prev.adjusted_y < min_gap => prev.adjusted_y + min_gap,
            _ => input.pixel_y,
        };
        out.push(AnnotationPoint {
            series_key: input.series_key,
            value: input.value,
            raw_y: input.pixel_y,
            adjusted_y,
            color: input.color,
            icon: input.icon,
        });
    }
    out
}

/// Map a value onto a vertical pixel extent (`0` at the top, `height` at
/// the bottom), given the plot's value bounds.
pub fn value_to_pixel(value: f64, bounds: [f64; 2], height: f64) -> f64 {
    let [lo, hi] = bounds;
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
        return height / 2.0;
    }
    let u = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    (1.0 - u) * height
}

/// Value extent of all present values in `rows`, padded by 5%.
///
/// `None` when nothing is present.
pub fn value_bounds(rows: &[TimeSeriesRow]) -> Option<[f64; 2]> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in rows.iter().flat_map(|r| r.values.values().flatten()) {
        lo = lo.min(*v);
        hi = hi.max(*v);
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    let pad = ((hi - lo).abs() * 0.05).max(1e-9);
    Some([lo - pad, hi + pad])
}

/// End-of-line badges for each legend: last present value of the series,
/// mapped onto `height` pixels and de-cluttered.
pub fn end_markers(
    legends: &[SeriesLegend],
    rows: &[TimeSeriesRow],
    bounds: [f64; 2],
    height: f64,
    min_gap: f64,
) -> Vec<AnnotationPoint> {
    let inputs = legends
        .iter()
        .filter_map(|legend| {
            let value = rows.iter().rev().find_map(|r| r.get(&legend.key))?;
            Some(AnnotationInput {
                series_key: legend.key.clone(),
                value,
                pixel_y: value_to_pixel(value, bounds, height),
                color: legend.color.clone(),
                icon: legend.icon.clone(),
            })
        })
        .collect();
    layout_annotations(inputs, min_gap)
}
