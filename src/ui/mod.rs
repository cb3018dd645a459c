//! egui rendering of the dashboard charts.
//!
//! Nothing here computes data: every widget reads a [`ChartSlot`] from the
//! dashboard and either draws it or shows the placeholder message.

use std::collections::BTreeMap;

use eframe::egui::{self, Color32, RichText, Ui};

use crate::state::ChartSlot;

pub mod charts;
pub mod maps;
pub mod panels;

/// Height of every plot.
pub const CHART_HEIGHT: f32 = 320.0;

/// Unit label used on value axes.
pub const UNIT: &str = "Mt CO₂eq/yr";

/// Draw the empty-state box for a chart that could not be computed.
pub fn placeholder(ui: &mut Ui, message: &str) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_height(CHART_HEIGHT / 3.0);
        ui.set_width(ui.available_width());
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(RichText::new(message).italics().color(Color32::GRAY));
        });
    });
}

/// The chart content, or `None` after drawing its placeholder.
pub fn ready_or_placeholder<'a, T>(ui: &mut Ui, slot: &'a ChartSlot<T>) -> Option<&'a T> {
    if let ChartSlot::Placeholder(msg) = slot {
        placeholder(ui, msg);
    }
    slot.ready()
}

/// Label for an integer axis position that indexes `names`.
pub fn category_label(names: &[String], value: f64) -> String {
    if (value - value.round()).abs() > 1e-6 || value < 0.0 {
        return String::new();
    }
    names.get(value.round() as usize).cloned().unwrap_or_default()
}

/// Name → value pairs, largest value first, ties by name.
pub fn sorted_desc(values: &BTreeMap<String, f64>) -> Vec<(&str, f64)> {
    let mut rows: Vec<(&str, f64)> = values.iter().map(|(k, &v)| (k.as_str(), v)).collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    rows
}
