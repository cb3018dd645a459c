use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use super::{ready_or_placeholder, sorted_desc};
use crate::state::Dashboard;

const SOURCE_URL: &str = "https://edgar.jrc.ec.europa.eu/report_2025";

// ---------------------------------------------------------------------------
// Left side panel – selection widgets
// ---------------------------------------------------------------------------

/// Render the country / year selectors and the sector summary.
pub fn side_panel(ui: &mut Ui, dashboard: &mut Dashboard) {
    ui.heading("Selection");
    ui.separator();

    if dashboard.countries().is_empty() {
        ui.label("No country data loaded.");
        return;
    }

    // ---- Country selector ----
    ui.strong("Country");
    let current = dashboard.selection().country.clone();
    let mut picked: Option<String> = None;
    egui::ComboBox::from_id_salt("country")
        .selected_text(&current)
        .width(ui.available_width())
        .height(400.0)
        .show_ui(ui, |ui: &mut Ui| {
            for country in dashboard.countries() {
                if ui.selectable_label(*country == current, country).clicked() {
                    picked = Some(country.clone());
                }
            }
        });
    if let Some(country) = picked {
        dashboard.set_country(&country);
    }

    // ---- Year selector ----
    ui.add_space(8.0);
    ui.strong("Year");
    match dashboard.years() {
        Some(range) => {
            let mut year = dashboard.selection().year;
            let slider = egui::Slider::new(&mut year, range).step_by(1.0);
            if ui.add(slider).changed() {
                dashboard.set_year(year);
            }
        }
        None => {
            ui.label(format!("{} (no year data)", dashboard.selection().year));
        }
    }
    ui.separator();

    // ---- Sector summary ----
    match dashboard.charts.dominant_sector.ready() {
        Some((sector, value)) => {
            ui.label("Dominant sector");
            ui.label(RichText::new(format!("{sector} ({value:.1} Mt)")).strong());
        }
        None => {
            ui.label(RichText::new("No dominant sector").italics().color(Color32::GRAY));
        }
    }
    ui.add_space(8.0);

    if let Some(breakdown) = ready_or_placeholder(ui, &dashboard.charts.sunburst) {
        let rows = sorted_desc(breakdown);
        TableBuilder::new(ui)
            .id_salt("sector_table")
            .striped(true)
            .vscroll(false)
            .column(Column::auto().at_least(120.0))
            .column(Column::remainder())
            .header(18.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Sector");
                });
                header.col(|ui| {
                    ui.strong("Mt CO₂eq");
                });
            })
            .body(|body| {
                body.rows(18.0, rows.len(), |mut row| {
                    let (sector, value) = rows[row.index()];
                    row.col(|ui| {
                        ui.label(sector);
                    });
                    row.col(|ui| {
                        ui.label(format!("{value:.1}"));
                    });
                });
            });
    }

    ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui: &mut Ui| {
        ui.hyperlink_to("Source: EDGAR 2025 GHG", SOURCE_URL);
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / status bar.
pub fn top_bar(ui: &mut Ui, dashboard: &Dashboard) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Quit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();

        let loaded: Vec<String> = dashboard
            .datasets()
            .loaded()
            .map(|t| format!("{}: {} countries", t.kind(), t.len()))
            .collect();
        if loaded.is_empty() {
            ui.label("No tables loaded");
        } else {
            ui.label(loaded.join(" · "));
        }

        if let Some(msg) = &dashboard.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}
