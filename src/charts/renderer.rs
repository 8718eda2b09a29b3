//! Static Chart Renderer
//! Generates SVG chart images for the dashboard, in its dark theme.
//!
//! Charts:
//! 1. Pollution timeline: one line per city, vertical legislation markers
//! 2. Energy output by water-scarcity level: coloured bars with MW labels

use super::ChartError;
use crate::data::LegislationMarker;
use crate::stats::{CitySeries, ScarcityEnergy};
use plotters::prelude::*;

// Colors
const BACKGROUND: RGBColor = RGBColor(14, 17, 23); // #0e1117
const GRID: RGBColor = RGBColor(51, 51, 51); // #333333
const MARKER: RGBColor = RGBColor(170, 170, 170);

/// Line colours, cycled per city.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(255, 87, 34),   // Deep Orange
    RGBColor(52, 152, 219),  // Blue
    RGBColor(96, 125, 139),  // Blue Grey
];

const FONT: &str = "sans-serif";

fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

/// Parse `#RRGGBB`.
pub fn hex_color(hex: &str) -> Option<RGBColor> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

/// Year range and padded value ceiling for a set of series.
pub fn timeline_bounds(series: &[CitySeries]) -> Option<(i32, i32, f64)> {
    let points = series.iter().flat_map(|s| s.points.iter());
    let (mut x_min, mut x_max, mut y_max) = (i32::MAX, i32::MIN, f64::NEG_INFINITY);
    for &(year, value) in points {
        x_min = x_min.min(year);
        x_max = x_max.max(year);
        y_max = y_max.max(value);
    }
    if x_min > x_max {
        return None;
    }
    // Keep a non-empty x range for single-year data.
    if x_min == x_max {
        x_max += 1;
    }
    let ceiling = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };
    Some((x_min, x_max, ceiling))
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Timeline of one pollutant across cities with legislation markers.
    pub fn timeline_svg(
        title: &str,
        unit: &str,
        series: &[CitySeries],
        markers: &[&LegislationMarker],
        size: (u32, u32),
    ) -> Result<String, ChartError> {
        let (x_min, x_max, y_max) = timeline_bounds(series).ok_or(ChartError::NoData)?;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
            root.fill(&BACKGROUND).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(title, (FONT, 22).into_font().color(&WHITE))
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, 0f64..y_max)
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .x_desc("Year")
                .y_desc(unit)
                .axis_style(&WHITE)
                .bold_line_style(GRID)
                .light_line_style(BACKGROUND)
                .label_style((FONT, 12).into_font().color(&WHITE))
                .axis_desc_style((FONT, 14).into_font().color(&WHITE))
                .draw()
                .map_err(render_err)?;

            for marker in markers.iter().filter(|m| (x_min..=x_max).contains(&m.year)) {
                let x = marker.year;
                chart
                    .draw_series(std::iter::once(PathElement::new(
                        vec![(x, 0.0), (x, y_max)],
                        MARKER.mix(0.6).stroke_width(1),
                    )))
                    .map_err(render_err)?;
                chart
                    .draw_series(std::iter::once(Text::new(
                        marker.abbrev.to_string(),
                        (x, y_max * 0.98),
                        (FONT, 11).into_font().color(&MARKER),
                    )))
                    .map_err(render_err)?;
            }

            for (idx, s) in series.iter().enumerate() {
                let color = PALETTE[idx % PALETTE.len()];
                chart
                    .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))
                    .map_err(render_err)?
                    .label(s.city.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }

            chart
                .configure_series_labels()
                .background_style(&BACKGROUND.mix(0.85))
                .border_style(&GRID)
                .label_font((FONT, 12).into_font().color(&WHITE))
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }

        Ok(svg)
    }

    /// Total energy output (MW) by water-scarcity level.
    pub fn energy_by_scarcity_svg(
        levels: &[ScarcityEnergy],
        size: (u32, u32),
    ) -> Result<String, ChartError> {
        if levels.is_empty() {
            return Err(ChartError::NoData);
        }
        let y_top = levels.iter().map(|l| l.energy_mw).fold(0.0, f64::max);
        let y_max = if y_top > 0.0 { y_top * 1.15 } else { 1.0 };

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
            root.fill(&BACKGROUND).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(
                    "Total Energy Output (MW) by Water Scarcity Level",
                    (FONT, 18).into_font().color(&WHITE),
                )
                .margin(20)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(0f64..10f64, 0f64..y_max)
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .x_desc("Water Scarcity Level (0 = Abundant, 10 = Severe)")
                .y_desc("Total Energy Output (Megawatts)")
                .x_labels(11)
                .axis_style(&WHITE)
                .bold_line_style(GRID)
                .light_line_style(BACKGROUND)
                .label_style((FONT, 12).into_font().color(&WHITE))
                .axis_desc_style((FONT, 14).into_font().color(&WHITE))
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(levels.iter().map(|l| {
                    let color = hex_color(l.color).unwrap_or(WHITE);
                    Rectangle::new(
                        [(l.water_scarcity - 0.2, 0.0), (l.water_scarcity + 0.2, l.energy_mw)],
                        color.filled(),
                    )
                }))
                .map_err(render_err)?;

            chart
                .draw_series(levels.iter().map(|l| {
                    Text::new(
                        format!("{} MW", l.energy_mw as i64),
                        (l.water_scarcity - 0.3, l.energy_mw + y_max * 0.04),
                        (FONT, 12).into_font().color(&WHITE),
                    )
                }))
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }

        Ok(svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_band_colors() {
        assert_eq!(hex_color("#FF8C00"), Some(RGBColor(255, 140, 0)));
        assert_eq!(hex_color("#00BFFF"), Some(RGBColor(0, 191, 255)));
        assert_eq!(hex_color("FF8C00"), None);
        assert_eq!(hex_color("#FFF"), None);
    }

    #[test]
    fn bounds_cover_all_series() {
        let series = vec![
            CitySeries {
                city: "Austin".into(),
                points: vec![(1990, 4.0), (2000, 10.0)],
            },
            CitySeries {
                city: "Boston".into(),
                points: vec![(1985, 2.0)],
            },
        ];
        let (x_min, x_max, y_max) = timeline_bounds(&series).unwrap();
        assert_eq!((x_min, x_max), (1985, 2000));
        assert!((y_max - 11.0).abs() < 1e-9);

        assert!(timeline_bounds(&[]).is_none());
        let single = vec![CitySeries {
            city: "Tampa".into(),
            points: vec![(2010, 0.0)],
        }];
        assert_eq!(timeline_bounds(&single), Some((2010, 2011, 1.0)));
    }
}
