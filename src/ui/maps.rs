//! Cross-country views: tile-map choropleths, top emitters and the rank
//! bump chart.
//!
//! The choropleths draw one square tile per country in alphabetical order.
//! Countries without a value are not drawn. Clicking a tile returns the
//! country so the caller can select it.

use eframe::egui::{
    self, vec2, Align2, Color32, FontId, Rect, ScrollArea, Sense, Stroke, StrokeKind, Ui,
};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

use super::{category_label, ready_or_placeholder, CHART_HEIGHT, UNIT};
use crate::color::{CategoryColors, ContinuousScale, EMITTER_BAR, HIGHLIGHT};
use crate::data::aggregate::RankSeries;
use crate::state::Dashboard;

const TILE_SIZE: f32 = 38.0;

// ---------------------------------------------------------------------------
// Tile grid
// ---------------------------------------------------------------------------

struct Tile<'a> {
    country: &'a str,
    fill: Color32,
    hover: String,
}

/// Draw the tiles and return the country that was clicked, if any.
fn tile_grid(ui: &mut Ui, id: &str, tiles: Vec<Tile<'_>>, selected: &str) -> Option<String> {
    let mut clicked = None;
    ScrollArea::vertical()
        .id_salt(id)
        .max_height(CHART_HEIGHT)
        .auto_shrink([false, true])
        .show(ui, |ui: &mut Ui| {
            ui.horizontal_wrapped(|ui: &mut Ui| {
                ui.spacing_mut().item_spacing = vec2(2.0, 2.0);
                for tile in tiles {
                    let (rect, response) =
                        ui.allocate_exact_size(vec2(TILE_SIZE, TILE_SIZE), Sense::click());
                    paint_tile(ui, rect, &tile, tile.country == selected);
                    let response = response.on_hover_text(&tile.hover);
                    if response.clicked() {
                        clicked = Some(tile.country.to_string());
                    }
                }
            });
        });
    clicked
}

fn paint_tile(ui: &Ui, rect: Rect, tile: &Tile<'_>, selected: bool) {
    let painter = ui.painter();
    painter.rect_filled(rect, 2.0, tile.fill);
    if selected {
        painter.rect_stroke(rect, 2.0, Stroke::new(3.0, HIGHLIGHT), StrokeKind::Inside);
    }
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        short_name(tile.country),
        FontId::proportional(10.0),
        text_color(tile.fill),
    );
}

/// Tile label: initials for multi-word names, else the first three letters.
fn short_name(country: &str) -> String {
    let words: Vec<&str> = country
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| w.chars().next().is_some_and(char::is_alphabetic))
        .collect();
    if words.len() >= 2 {
        words
            .iter()
            .take(3)
            .filter_map(|w| w.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    } else {
        country.chars().take(3).flat_map(char::to_uppercase).collect()
    }
}

/// Black on light fills, white on dark ones.
fn text_color(fill: Color32) -> Color32 {
    let luma = 0.299 * fill.r() as f32 + 0.587 * fill.g() as f32 + 0.114 * fill.b() as f32;
    if luma > 140.0 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

fn gradient_legend(ui: &mut Ui, scale: &ContinuousScale, low: &str, high: &str) {
    ui.horizontal(|ui: &mut Ui| {
        ui.small(low);
        let (rect, _) = ui.allocate_exact_size(vec2(160.0, 10.0), Sense::hover());
        let steps = 32;
        let step_width = rect.width() / steps as f32;
        for i in 0..steps {
            let left = rect.left() + i as f32 * step_width;
            let segment = Rect::from_min_size(
                egui::pos2(left, rect.top()),
                vec2(step_width + 0.5, rect.height()),
            );
            let t = (i as f64 + 0.5) / steps as f64;
            ui.painter().rect_filled(segment, 0.0, scale.at(t));
        }
        ui.small(high);
    });
}

fn swatch_legend(ui: &mut Ui, entries: &[(String, Color32)]) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (name, color) in entries {
            let (rect, _) = ui.allocate_exact_size(vec2(10.0, 10.0), Sense::hover());
            ui.painter().rect_filled(rect, 2.0, *color);
            ui.small(name);
            ui.add_space(6.0);
        }
    });
}

// ---------------------------------------------------------------------------
// Choropleths
// ---------------------------------------------------------------------------

/// Total emissions per country in the selected year, on a log scale.
pub fn global_map(ui: &mut Ui, dashboard: &Dashboard) -> Option<String> {
    let year = dashboard.selection().year;
    ui.strong(format!("Global GHG emissions ({year})"));
    let snapshot = ready_or_placeholder(ui, &dashboard.charts.global_map)?;

    let log_value = |v: f64| v.max(0.0).ln_1p();
    let max = snapshot.values().copied().map(log_value).fold(0.0, f64::max);
    let scale = ContinuousScale::yl_or_rd();
    let tiles = snapshot
        .iter()
        .map(|(country, &value)| Tile {
            country,
            fill: scale.map(log_value(value), 0.0, max),
            hover: format!("{country}: {value:.1} {UNIT}"),
        })
        .collect();

    gradient_legend(ui, &scale, "0", &format!("{:.0} {UNIT} (log)", max.exp_m1()));
    tile_grid(ui, "global_map", tiles, &dashboard.selection().country)
}

/// Largest sector of every country in the selected year.
pub fn dominant_map(ui: &mut Ui, dashboard: &Dashboard) -> Option<String> {
    let year = dashboard.selection().year;
    ui.strong(format!("Dominant emission sector by country ({year})"));
    let dominant = ready_or_placeholder(ui, &dashboard.charts.dominant_map)?;

    let colors = CategoryColors::new(dominant.values().map(String::as_str));
    let tiles = dominant
        .iter()
        .map(|(country, sector)| Tile {
            country,
            fill: colors.color_for(sector),
            hover: format!("{country}: {sector}"),
        })
        .collect();

    swatch_legend(ui, &colors.legend_entries());
    tile_grid(ui, "dominant_map", tiles, &dashboard.selection().country)
}

/// Net LULUCF per country: sinks in green, sources in red.
pub fn lulucf_map(ui: &mut Ui, dashboard: &Dashboard) -> Option<String> {
    let year = dashboard.selection().year;
    ui.strong(format!("LULUCF net emissions: sinks vs sources ({year})"));
    let snapshot = ready_or_placeholder(ui, &dashboard.charts.lulucf_map)?;

    let max_abs = snapshot.values().map(|v| v.abs()).fold(0.0, f64::max);
    let scale = ContinuousScale::sink_source();
    let tiles = snapshot
        .iter()
        .map(|(country, &value)| {
            let role = if value < 0.0 { "sink" } else { "source" };
            Tile {
                country,
                fill: scale.map_diverging(value, max_abs),
                hover: format!("{country}: {value:+.1} {UNIT} (net {role})"),
            }
        })
        .collect();

    gradient_legend(
        ui,
        &scale,
        &format!("{:.0}", -max_abs),
        &format!("{max_abs:+.0} {UNIT}"),
    );
    tile_grid(ui, "lulucf_map", tiles, &dashboard.selection().country)
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

/// Horizontal bars of the largest emitters, largest at the top.
pub fn top_emitters_chart(ui: &mut Ui, dashboard: &Dashboard) {
    let selection = dashboard.selection();
    ui.strong(format!(
        "Top {} emitters ({})",
        dashboard.view().top_n,
        selection.year
    ));
    let Some(entries) = ready_or_placeholder(ui, &dashboard.charts.top_emitters) else {
        return;
    };

    // Bar 0 sits at the bottom of the axis, so the list is reversed.
    let names: Vec<String> = entries
        .iter()
        .rev()
        .map(|e| {
            if e.outside_top_k {
                format!("{} (#{})", e.country, e.rank)
            } else {
                e.country.clone()
            }
        })
        .collect();
    let bars: Vec<Bar> = entries
        .iter()
        .rev()
        .enumerate()
        .map(|(i, e)| {
            let fill = if e.country == selection.country {
                HIGHLIGHT
            } else {
                EMITTER_BAR
            };
            Bar::new(i as f64, e.value)
                .name(format!("#{} {}: {:.1}", e.rank, e.country, e.value))
                .fill(fill)
                .width(0.7)
        })
        .collect();

    Plot::new("top_emitters_plot")
        .height(CHART_HEIGHT)
        .x_axis_label(UNIT)
        .y_axis_formatter(move |mark, _range| category_label(&names, mark.value))
        .y_axis_min_width(96.0)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
        });
}

/// Rank of the top countries over every year; rank 1 at the top.
pub fn bump_chart(ui: &mut Ui, dashboard: &Dashboard) {
    let selection = dashboard.selection();
    ui.strong(format!(
        "Emission rank over time: top {} in {}",
        dashboard.view().top_n,
        selection.year
    ));
    let Some(trajectories) = ready_or_placeholder(ui, &dashboard.charts.rank_bump) else {
        return;
    };

    let colors = CategoryColors::new(trajectories.keys().map(String::as_str));

    Plot::new("rank_bump_plot")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label("Rank")
        .y_axis_formatter(|mark, _range| rank_label(mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (country, series) in trajectories {
                let is_selected = *country == selection.country;
                let (color, width) = if is_selected {
                    (HIGHLIGHT, 5.0)
                } else {
                    (colors.color_for(country), 2.0)
                };
                // Years without a rank break the line.
                for run in contiguous_runs(series) {
                    let points: Vec<[f64; 2]> = run
                        .iter()
                        .map(|&(year, rank)| [year as f64, -(rank as f64)])
                        .collect();
                    plot_ui.line(
                        Line::new(PlotPoints::new(points.clone()))
                            .name(country)
                            .color(color)
                            .width(width),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::new(points))
                            .name(country)
                            .color(color)
                            .radius(width / 2.0 + 1.0),
                    );
                }
            }
        });
}

/// Ranks are plotted as negative values so rank 1 is on top.
fn rank_label(value: f64) -> String {
    if value >= 0.0 || (value - value.round()).abs() > 1e-6 {
        return String::new();
    }
    format!("{}", -value.round() as i64)
}

/// Split a rank series into the maximal runs of consecutive ranked years.
fn contiguous_runs(series: &RankSeries) -> Vec<Vec<(i32, u32)>> {
    let mut runs = Vec::new();
    let mut current: Vec<(i32, u32)> = Vec::new();
    for &(year, rank) in series {
        match rank {
            Some(rank) => current.push((year, rank)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("France"), "FRA");
        assert_eq!(short_name("United States"), "US");
        assert_eq!(short_name("Bosnia And Herzegovina"), "BAH");
        assert_eq!(short_name("Guinea-Bissau"), "GB");
        assert_eq!(short_name("Chad"), "CHA");
    }

    #[test]
    fn test_text_color_contrast() {
        assert_eq!(text_color(Color32::from_rgb(255, 255, 204)), Color32::BLACK);
        assert_eq!(text_color(Color32::from_rgb(128, 0, 38)), Color32::WHITE);
    }

    #[test]
    fn test_rank_label() {
        assert_eq!(rank_label(-1.0), "1");
        assert_eq!(rank_label(-12.0), "12");
        assert_eq!(rank_label(-1.5), "");
        assert_eq!(rank_label(0.0), "");
        assert_eq!(rank_label(3.0), "");
    }

    #[test]
    fn test_contiguous_runs_split_on_gaps() {
        let series = vec![
            (2000, None),
            (2001, Some(3)),
            (2002, Some(2)),
            (2003, None),
            (2004, Some(1)),
        ];
        assert_eq!(
            contiguous_runs(&series),
            vec![vec![(2001, 3), (2002, 2)], vec![(2004, 1)]]
        );
        assert!(contiguous_runs(&vec![(2000, None)]).is_empty());
    }
}
