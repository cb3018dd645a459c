//! Application configuration from `ghg-explorer.toml`.
//!
//! # Example
//!
//! ```toml
//! [data]
//! totals = "data/GHG_totals_by_country.csv"
//! sectors = "data/GHG_by_sector_and_country.csv"
//! lulucf = "data/LULUCF_countries.xlsx"
//! lulucf_sheet = "LULUCF_countries"
//! excluded_countries = ["GLOBAL TOTAL", "WORLD"]
//!
//! [view]
//! default_country = "United States"
//! default_year = 2024
//! top_n = 10
//! window_years = 10
//! movers = 5
//! ```
//!
//! Every field is optional. Relative data paths are resolved against the
//! directory of the config file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::country::DEFAULT_EXCLUDED;
use crate::data::model::TableKind;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "GHG_EXPLORER_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "ghg-explorer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `[data]`: where the three sheets live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub totals: PathBuf,
    pub sectors: PathBuf,
    pub lulucf: PathBuf,
    /// Worksheet to read when the matching path is a workbook. Unset means
    /// the first worksheet.
    pub totals_sheet: Option<String>,
    pub sectors_sheet: Option<String>,
    pub lulucf_sheet: Option<String>,
    /// Aggregate rows dropped at load time, matched case-insensitively.
    pub excluded_countries: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            totals: "data/GHG_totals_by_country.csv".into(),
            sectors: "data/GHG_by_sector_and_country.csv".into(),
            lulucf: "data/LULUCF_countries.csv".into(),
            totals_sheet: None,
            sectors_sheet: None,
            lulucf_sheet: Some("LULUCF_countries".to_string()),
            excluded_countries: DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DataConfig {
    pub fn path(&self, kind: TableKind) -> &Path {
        match kind {
            TableKind::Totals => &self.totals,
            TableKind::Sectors => &self.sectors,
            TableKind::Lulucf => &self.lulucf,
        }
    }

    pub fn sheet(&self, kind: TableKind) -> Option<&str> {
        match kind {
            TableKind::Totals => self.totals_sheet.as_deref(),
            TableKind::Sectors => self.sectors_sheet.as_deref(),
            TableKind::Lulucf => self.lulucf_sheet.as_deref(),
        }
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.totals, &mut self.sectors, &mut self.lulucf] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// `[view]`: initial selection and chart sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    pub default_country: String,
    pub default_year: i32,
    /// Bars in the top-emitters chart and lines in the bump chart.
    pub top_n: usize,
    /// Trailing window of the sector-change chart, in years.
    pub window_years: u32,
    /// Sectors listed per direction in the sector-change chart.
    pub movers: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_country: "United States".to_string(),
            default_year: 2024,
            top_n: 10,
            window_years: 10,
            movers: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub data: DataConfig,
    pub view: ViewConfig,
}

impl AppConfig {
    /// Parse and validate TOML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; relative data paths become relative to it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let mut config = Self::parse(&text)?;
        if let Some(dir) = path.parent() {
            config.data.resolve_relative_to(dir);
        }
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `$GHG_EXPLORER_CONFIG` if set, else `./ghg-explorer.toml` if it
    /// exists, else built-in defaults.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }
        log::info!("No {DEFAULT_CONFIG_FILE} found, using defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.view.top_n == 0 {
            return Err(ConfigError::Validation("[view] top_n must be at least 1".into()));
        }
        if self.view.window_years == 0 {
            return Err(ConfigError::Validation(
                "[view] window_years must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.view.default_country, "United States");
        assert_eq!(config.view.top_n, 10);
        assert!(config
            .data
            .excluded_countries
            .iter()
            .any(|c| c == "GLOBAL TOTAL"));
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::parse(
            r#"
            [view]
            default_country = "Brazil"
            default_year = 2019
            "#,
        )
        .unwrap();
        assert_eq!(config.view.default_country, "Brazil");
        assert_eq!(config.view.default_year, 2019);
        assert_eq!(config.view.window_years, 10);
        assert_eq!(config.data, DataConfig::default());
    }

    #[test]
    fn test_workbook_sheets() {
        let config = AppConfig::default();
        assert_eq!(config.data.sheet(TableKind::Lulucf), Some("LULUCF_countries"));
        assert_eq!(config.data.sheet(TableKind::Totals), None);

        let config = AppConfig::parse("[data]\nsectors_sheet = \"GHG_by_sector\"\n").unwrap();
        assert_eq!(config.data.sheet(TableKind::Sectors), Some("GHG_by_sector"));
        assert_eq!(config.data.sheet(TableKind::Lulucf), Some("LULUCF_countries"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = AppConfig::parse("[view]\ncolour = \"red\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_validation() {
        let err = AppConfig::parse("[view]\ntop_n = 0\n").unwrap_err();
        assert!(err.to_string().contains("top_n"));
        let err = AppConfig::parse("[view]\nwindow_years = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ghg-explorer.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[data]\ntotals = \"sheets/totals.parquet\"\nlulucf = \"/abs/lulucf.csv\"").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.data.totals, dir.path().join("sheets/totals.parquet"));
        assert_eq!(config.data.lulucf, PathBuf::from("/abs/lulucf.csv"));
        assert_eq!(
            config.data.path(TableKind::Sectors),
            dir.path().join("data/GHG_by_sector_and_country.csv")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("here.toml"));
    }
}
