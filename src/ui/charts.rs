use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::{FRAC_PI_2, TAU};

use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Polygon, Text, VLine,
};

use super::{category_label, ready_or_placeholder, CHART_HEIGHT, UNIT};
use crate::color::{CategoryColors, ContinuousScale};
use crate::data::aggregate::{SectorChange, YearSeries};
use crate::state::Dashboard;

// ---------------------------------------------------------------------------
// Country-wise charts
// ---------------------------------------------------------------------------

/// Total emissions of the selected country over time.
pub fn trend_chart(ui: &mut Ui, dashboard: &Dashboard) {
    let selection = dashboard.selection();
    ui.strong(format!("{} – GHG emission trend", selection.country));
    let Some(series) = ready_or_placeholder(ui, &dashboard.charts.trend) else {
        return;
    };

    let line: PlotPoints = series.iter().map(|&(year, v)| [year as f64, v]).collect();
    let markers: PlotPoints = series.iter().map(|&(year, v)| [year as f64, v]).collect();
    let country = selection.country.as_str();

    Plot::new("trend_plot")
        .height(CHART_HEIGHT)
        .x_axis_label("Year")
        .y_axis_label(UNIT)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(line).name(country).width(2.0));
            plot_ui.points(Points::new(markers).name(country).radius(3.0));
            plot_ui.vline(
                VLine::new(selection.year as f64)
                    .color(Color32::GRAY)
                    .name("Selected year"),
            );
        });
}

/// Two-ring sunburst: the country in the centre, its sectors around it.
pub fn sunburst_chart(ui: &mut Ui, dashboard: &Dashboard) {
    let selection = dashboard.selection();
    ui.strong(format!(
        "{} – Sectoral breakdown ({})",
        selection.country, selection.year
    ));
    let Some(breakdown) = ready_or_placeholder(ui, &dashboard.charts.sunburst) else {
        return;
    };

    // Negative sector values cannot be drawn as wedges.
    let wedges: Vec<(&str, f64)> = breakdown
        .iter()
        .filter(|(_, &v)| v > 0.0)
        .map(|(s, &v)| (s.as_str(), v))
        .collect();
    let total: f64 = wedges.iter().map(|(_, v)| v).sum();
    if total <= 0.0 {
        super::placeholder(ui, "No positive sector values to draw");
        return;
    }
    let colors = CategoryColors::new(breakdown.keys().map(String::as_str));

    Plot::new("sunburst_plot")
        .height(CHART_HEIGHT)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show_x(false)
        .show_y(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            let centre = Color32::from_gray(90);
            for quad in ring_quads(0.0, 1.0, 0.0, TAU) {
                plot_ui.polygon(
                    Polygon::new(PlotPoints::new(quad))
                        .fill_color(centre)
                        .stroke(Stroke::new(1.0, centre)),
                );
            }

            // Clockwise from twelve o'clock.
            let mut angle = FRAC_PI_2;
            for &(sector, value) in &wedges {
                let sweep = value / total * TAU;
                let color = colors.color_for(sector);
                let name = format!("{sector}: {value:.1} ({:.0}%)", value / total * 100.0);
                for quad in ring_quads(1.05, 2.0, angle - sweep, angle) {
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::new(quad))
                            .fill_color(color)
                            .stroke(Stroke::new(1.0, color))
                            .name(&name),
                    );
                }
                angle -= sweep;
            }

            plot_ui.text(
                Text::new(
                    PlotPoint::new(0.0, 0.0),
                    RichText::new(&selection.country).strong(),
                )
                .color(Color32::WHITE),
            );
        });
}

/// Convex quads tiling the ring segment between `start` and `end` radians.
/// egui_plot only fills convex polygons correctly, so arcs are split.
fn ring_quads(inner: f64, outer: f64, start: f64, end: f64) -> Vec<Vec<[f64; 2]>> {
    let steps = (((end - start).abs() / TAU) * 96.0).ceil().max(1.0) as usize;
    let point = |r: f64, a: f64| [r * a.cos(), r * a.sin()];
    (0..steps)
        .map(|i| {
            let a0 = start + (end - start) * i as f64 / steps as f64;
            let a1 = start + (end - start) * (i + 1) as f64 / steps as f64;
            vec![
                point(inner, a0),
                point(outer, a0),
                point(outer, a1),
                point(inner, a1),
            ]
        })
        .collect()
}

/// Sectors that rose or fell the most over the trailing window.
pub fn movers_chart(ui: &mut Ui, dashboard: &Dashboard) {
    let selection = dashboard.selection();
    let from_year = selection
        .year
        .saturating_sub_unsigned(dashboard.view().window_years);
    ui.strong(format!(
        "Sectors increasing or decreasing in {} ({from_year}–{})",
        selection.country, selection.year
    ));
    let Some(movers) = ready_or_placeholder(ui, &dashboard.charts.sector_movers) else {
        return;
    };

    let mut rows: Vec<&SectorChange> = movers
        .decreasing
        .iter()
        .chain(movers.increasing.iter())
        .collect();
    rows.sort_by(|a, b| a.change.total_cmp(&b.change));

    // Bars are coloured by percent change; sectors starting at zero take
    // the end of the scale matching their direction.
    let percents = rows.iter().filter_map(|c| c.percent_change);
    let (min, max) = percents.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p), hi.max(p))
    });
    let scale = ContinuousScale::red_yellow_green();
    let fill = |c: &SectorChange| match c.percent_change {
        Some(p) => scale.map(p, min, max),
        None if c.change > 0.0 => scale.at(1.0),
        None => scale.at(0.0),
    };

    let bars: Vec<Bar> = rows
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let percent = c
                .percent_change
                .map_or_else(|| "n/a".to_string(), |p| format!("{p:+.1}%"));
            Bar::new(i as f64, c.change)
                .name(format!(
                    "{}: {:.1} → {:.1} ({percent})",
                    c.sector, c.start, c.end
                ))
                .fill(fill(c))
                .width(0.7)
        })
        .collect();
    let names: Vec<String> = rows.iter().map(|c| c.sector.clone()).collect();

    Plot::new("movers_plot")
        .height(CHART_HEIGHT)
        .x_axis_label(format!("Change ({UNIT})"))
        .y_axis_formatter(move |mark, _range| category_label(&names, mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
        });
}

/// Yearly LULUCF values of the selected country, stacked by sector.
pub fn lulucf_bars(ui: &mut Ui, dashboard: &Dashboard) {
    ui.strong(format!(
        "{} – LULUCF sector emissions ({UNIT})",
        dashboard.selection().country
    ));
    let Some(series) = ready_or_placeholder(ui, &dashboard.charts.lulucf_sectors) else {
        return;
    };

    let colors = CategoryColors::new(series.keys().map(String::as_str));
    let (years, stacks) = align_years(series);
    let mut charts: Vec<BarChart> = Vec::with_capacity(stacks.len());
    for (sector, values) in stacks {
        let bars: Vec<Bar> = years
            .iter()
            .zip(values)
            .map(|(&year, v)| Bar::new(year as f64, v).width(0.8))
            .collect();
        let below: Vec<&BarChart> = charts.iter().collect();
        let chart = BarChart::new(bars)
            .name(sector)
            .color(colors.color_for(sector))
            .stack_on(&below);
        charts.push(chart);
    }

    Plot::new("lulucf_bars_plot")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label(UNIT)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

/// Puts every sector on the union of years, filling gaps with 0.
///
/// `BarChart::stack_on` adds the charts below bar by bar in index order,
/// so all stacked series must share the same x positions.
fn align_years(series: &BTreeMap<String, YearSeries>) -> (Vec<i32>, Vec<(&str, Vec<f64>)>) {
    let years: Vec<i32> = series
        .values()
        .flatten()
        .map(|&(year, _)| year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let stacks = series
        .iter()
        .map(|(sector, points)| {
            let by_year: BTreeMap<i32, f64> = points.iter().copied().collect();
            let values = years
                .iter()
                .map(|year| by_year.get(year).copied().unwrap_or(0.0))
                .collect();
            (sector.as_str(), values)
        })
        .collect();
    (years, stacks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_years_pads_uneven_coverage() {
        let series = BTreeMap::from([
            ("Deforestation".to_string(), vec![(2001, 30.0)]),
            ("Other land".to_string(), vec![(2000, 5.0), (2001, 6.0)]),
        ]);
        let (years, stacks) = align_years(&series);
        assert_eq!(years, vec![2000, 2001]);
        assert_eq!(
            stacks,
            vec![
                ("Deforestation", vec![0.0, 30.0]),
                ("Other land", vec![5.0, 6.0]),
            ]
        );
    }

    #[test]
    fn test_align_years_empty() {
        let empty = BTreeMap::new();
        let (years, stacks) = align_years(&empty);
        assert!(years.is_empty());
        assert!(stacks.is_empty());
    }

    #[test]
    fn test_ring_quads_cover_the_arc() {
        let quads = ring_quads(1.0, 2.0, 0.0, TAU / 4.0);
        assert_eq!(quads.len(), 24);
        assert!(quads.iter().all(|q| q.len() == 4));

        let first = quads[0][0];
        assert!((first[0] - 1.0).abs() < 1e-12 && first[1].abs() < 1e-12);
        let last = quads[23][2];
        assert!(last[0].abs() < 1e-12 && (last[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ring_quads_tiny_arc_still_drawn() {
        assert_eq!(ring_quads(1.0, 2.0, 0.0, 1e-6).len(), 1);
    }
}
