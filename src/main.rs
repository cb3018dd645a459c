mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use anyhow::{anyhow, Context};
use app::GhgExplorerApp;
use config::AppConfig;
use eframe::egui;
use state::Dashboard;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = AppConfig::discover().context("Failed to read configuration")?;
    let datasets = data::loader::load_all(&config.data);
    let dashboard = Dashboard::new(datasets, config.view);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "GHG Emissions Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(GhgExplorerApp::new(dashboard)))),
    )
    .map_err(|e| anyhow!("GUI failed: {e}"))
}
