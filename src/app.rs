use eframe::egui::{self, ScrollArea, Ui};

use crate::state::Dashboard;
use crate::ui::{charts, maps, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct GhgExplorerApp {
    pub dashboard: Dashboard,
}

impl GhgExplorerApp {
    pub fn new(dashboard: Dashboard) -> Self {
        Self { dashboard }
    }

    fn country_section(&self, ui: &mut Ui) {
        ui.heading(format!("Country-wise: {}", self.dashboard.selection().country));
        ui.columns(2, |cols: &mut [Ui]| {
            charts::trend_chart(&mut cols[0], &self.dashboard);
            charts::sunburst_chart(&mut cols[1], &self.dashboard);
        });
        ui.add_space(12.0);
        ui.columns(2, |cols: &mut [Ui]| {
            charts::movers_chart(&mut cols[0], &self.dashboard);
            charts::lulucf_bars(&mut cols[1], &self.dashboard);
        });
    }

    /// Returns a country clicked on one of the maps.
    fn global_section(&self, ui: &mut Ui) -> Option<String> {
        let mut clicked = None;
        ui.heading(format!("Global: {}", self.dashboard.selection().year));
        ui.columns(2, |cols: &mut [Ui]| {
            let hit = maps::global_map(&mut cols[0], &self.dashboard);
            keep_first(&mut clicked, hit);
            maps::top_emitters_chart(&mut cols[1], &self.dashboard);
        });
        ui.add_space(12.0);
        ui.columns(2, |cols: &mut [Ui]| {
            let hit = maps::dominant_map(&mut cols[0], &self.dashboard);
            keep_first(&mut clicked, hit);
            maps::bump_chart(&mut cols[1], &self.dashboard);
        });
        ui.add_space(12.0);
        let hit = maps::lulucf_map(ui, &self.dashboard);
        keep_first(&mut clicked, hit);
        clicked
    }
}

/// The first map clicked in a frame wins.
fn keep_first(clicked: &mut Option<String>, hit: Option<String>) {
    if clicked.is_none() {
        *clicked = hit;
    }
}

impl eframe::App for GhgExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.dashboard);
        });

        // ---- Left side panel: selectors ----
        egui::SidePanel::left("selection_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.dashboard);
            });

        // ---- Central panel: charts ----
        let clicked = egui::CentralPanel::default()
            .show(ctx, |ui| {
                ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui: &mut Ui| {
                        self.country_section(ui);
                        ui.separator();
                        self.global_section(ui)
                    })
                    .inner
            })
            .inner;

        if let Some(country) = clicked {
            self.dashboard.set_country(&country);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::data::model::Datasets;

    #[test]
    fn test_keep_first_click() {
        let mut clicked = None;
        keep_first(&mut clicked, None);
        assert_eq!(clicked, None);
        keep_first(&mut clicked, Some("Chile".to_string()));
        keep_first(&mut clicked, Some("Peru".to_string()));
        keep_first(&mut clicked, None);
        assert_eq!(clicked.as_deref(), Some("Chile"));
    }

    #[test]
    fn test_frame_renders_without_data() {
        let app = GhgExplorerApp::new(Dashboard::new(
            Datasets::default(),
            ViewConfig::default(),
        ));
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                app.country_section(ui);
                assert_eq!(app.global_section(ui), None);
            });
        });
        assert!(app.dashboard.countries().is_empty());
    }
}
