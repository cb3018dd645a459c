use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

/// Marks the selected country on every chart.
pub const HIGHLIGHT: Color32 = Color32::from_rgb(0x00, 0xFF, 0xAA);

/// Bars of the other countries in the top-emitters chart.
pub const EMITTER_BAR: Color32 = Color32::from_rgb(0xFF, 0xA5, 0x00);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

// ---------------------------------------------------------------------------
// Categorical colours: sector / country name → Color32
// ---------------------------------------------------------------------------

/// Maps category names (sectors, countries) to distinct colours.
#[derive(Debug, Clone)]
pub struct CategoryColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl CategoryColors {
    /// Build the mapping from the distinct names, in sorted order so a
    /// category keeps its colour across redraws.
    pub fn new<'a>(categories: impl IntoIterator<Item = &'a str>) -> Self {
        let unique: std::collections::BTreeSet<&str> = categories.into_iter().collect();
        let palette = generate_palette(unique.len());
        let mapping = unique
            .into_iter()
            .zip(palette)
            .map(|(name, c)| (name.to_string(), c))
            .collect();

        CategoryColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, category: &str) -> Color32 {
        self.mapping
            .get(category)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (name → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(name, c)| (name.clone(), *c))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Continuous scales for choropleths and bars
// ---------------------------------------------------------------------------

/// Piecewise-linear colour scale over `[0, 1]`, interpolated in linear RGB.
#[derive(Debug, Clone)]
pub struct ContinuousScale {
    stops: Vec<LinSrgb>,
}

impl ContinuousScale {
    fn from_hex(stops: &[(u8, u8, u8)]) -> Self {
        let stops: Vec<LinSrgb> = stops
            .iter()
            .map(|&(r, g, b)| Srgb::new(r, g, b).into_format::<f32>().into_linear())
            .collect();
        Self { stops }
    }

    /// Yellow → orange → red, for emission totals.
    pub fn yl_or_rd() -> Self {
        Self::from_hex(&[
            (0xFF, 0xFF, 0xCC),
            (0xFE, 0xD9, 0x76),
            (0xFD, 0x8D, 0x3C),
            (0xE3, 0x1A, 0x1C),
            (0x80, 0x00, 0x26),
        ])
    }

    /// Red → yellow → green from low to high, for sector change.
    pub fn red_yellow_green() -> Self {
        Self::from_hex(&[(0xFF, 0x00, 0x00), (0xFF, 0xFF, 0x00), (0x00, 0x80, 0x00)])
    }

    /// Dark green → light green → yellow → red, for LULUCF sink/source.
    pub fn sink_source() -> Self {
        Self::from_hex(&[
            (0x00, 0x64, 0x00),
            (0x90, 0xEE, 0x90),
            (0xFF, 0xFF, 0x00),
            (0xFF, 0x00, 0x00),
        ])
    }

    /// Colour at `t`, clamped to `[0, 1]`.
    pub fn at(&self, t: f64) -> Color32 {
        let Some(&first) = self.stops.first() else {
            return Color32::GRAY;
        };
        if self.stops.len() == 1 || !t.is_finite() {
            return to_color32(Srgb::from_linear(first));
        }
        let scaled = t.clamp(0.0, 1.0) * (self.stops.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(self.stops.len() - 2);
        let frac = (scaled - lower as f64) as f32;
        let mixed = self.stops[lower].mix(self.stops[lower + 1], frac);
        to_color32(Srgb::from_linear(mixed))
    }

    /// Colour of `value` on a linear `[min, max]` domain.
    pub fn map(&self, value: f64, min: f64, max: f64) -> Color32 {
        let span = max - min;
        if span.abs() < f64::EPSILON {
            return self.at(0.5);
        }
        self.at((value - min) / span)
    }

    /// Colour of `value` on a domain symmetric around zero, so that zero
    /// always lands in the middle of the scale.
    pub fn map_diverging(&self, value: f64, max_abs: f64) -> Color32 {
        if max_abs <= 0.0 {
            return self.at(0.5);
        }
        self.at(0.5 + value / (2.0 * max_abs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_size() {
        assert!(generate_palette(0).is_empty());
        assert_eq!(generate_palette(7).len(), 7);
    }

    #[test]
    fn test_category_colors_stable_and_distinct() {
        let a = CategoryColors::new(["Transport", "Power Industry", "Transport", "Waste"]);
        let b = CategoryColors::new(["Waste", "Power Industry", "Transport"]);
        assert_eq!(a.legend_entries().len(), 3);
        assert_eq!(a.color_for("Waste"), b.color_for("Waste"));
        assert_ne!(a.color_for("Waste"), a.color_for("Transport"));
        assert_eq!(a.color_for("Unknown"), Color32::GRAY);
    }

    #[test]
    fn test_scale_endpoints() {
        let scale = ContinuousScale::red_yellow_green();
        assert_eq!(scale.at(0.0), Color32::from_rgb(255, 0, 0));
        assert_eq!(scale.at(1.0), Color32::from_rgb(0, 128, 0));
        assert_eq!(scale.at(-3.0), scale.at(0.0));
        assert_eq!(scale.at(0.5), Color32::from_rgb(255, 255, 0));
    }

    #[test]
    fn test_diverging_zero_is_midpoint() {
        let scale = ContinuousScale::sink_source();
        assert_eq!(scale.map_diverging(0.0, 100.0), scale.at(0.5));
        assert_eq!(scale.map_diverging(-100.0, 100.0), scale.at(0.0));
        assert_eq!(scale.map(5.0, 5.0, 5.0), scale.at(0.5));
    }
}
