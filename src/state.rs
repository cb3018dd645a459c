use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::config::ViewConfig;
use crate::data::aggregate::{self, EmitterEntry, RankSeries, SectorMovers, YearSeries};
use crate::data::country::normalize_country;
use crate::data::error::QueryError;
use crate::data::model::{Datasets, TableKind};

// ---------------------------------------------------------------------------
// Chart slots
// ---------------------------------------------------------------------------

/// The last computed content of one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartSlot<T> {
    Ready(T),
    /// Shown instead of the chart; holds the user-facing reason.
    Placeholder(String),
}

impl<T> Default for ChartSlot<T> {
    fn default() -> Self {
        ChartSlot::Placeholder("Not computed yet".to_string())
    }
}

impl<T> From<Result<T, QueryError>> for ChartSlot<T> {
    fn from(result: Result<T, QueryError>) -> Self {
        match result {
            Ok(value) => ChartSlot::Ready(value),
            Err(e) => ChartSlot::Placeholder(e.to_string()),
        }
    }
}

impl<T> ChartSlot<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            ChartSlot::Ready(value) => Some(value),
            ChartSlot::Placeholder(_) => None,
        }
    }
}

/// Every chart on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chart {
    Trend,
    Sunburst,
    DominantSector,
    SectorMovers,
    LulucfSectors,
    GlobalMap,
    TopEmitters,
    DominantMap,
    RankBump,
    LulucfMap,
}

impl Chart {
    pub const ALL: [Chart; 10] = [
        Chart::Trend,
        Chart::Sunburst,
        Chart::DominantSector,
        Chart::SectorMovers,
        Chart::LulucfSectors,
        Chart::GlobalMap,
        Chart::TopEmitters,
        Chart::DominantMap,
        Chart::RankBump,
        Chart::LulucfMap,
    ];

    pub fn depends_on_country(self) -> bool {
        !matches!(self, Chart::GlobalMap | Chart::DominantMap | Chart::LulucfMap)
    }

    pub fn depends_on_year(self) -> bool {
        !matches!(self, Chart::Trend | Chart::LulucfSectors)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Charts {
    pub trend: ChartSlot<YearSeries>,
    pub sunburst: ChartSlot<BTreeMap<String, f64>>,
    pub dominant_sector: ChartSlot<(String, f64)>,
    pub sector_movers: ChartSlot<SectorMovers>,
    pub lulucf_sectors: ChartSlot<BTreeMap<String, YearSeries>>,
    pub global_map: ChartSlot<BTreeMap<String, f64>>,
    pub top_emitters: ChartSlot<Vec<EmitterEntry>>,
    pub dominant_map: ChartSlot<BTreeMap<String, String>>,
    pub rank_bump: ChartSlot<BTreeMap<String, RankSeries>>,
    pub lulucf_map: ChartSlot<BTreeMap<String, f64>>,
}

// ---------------------------------------------------------------------------
// Dashboard – the view controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub country: String,
    pub year: i32,
}

/// Selection state plus the charts derived from it.
///
/// The only mutations are [`Dashboard::set_country`] and
/// [`Dashboard::set_year`]; each recomputes exactly the charts that depend
/// on the changed variable. A failing chart becomes a placeholder and
/// leaves the others untouched.
pub struct Dashboard {
    datasets: Datasets,
    view: ViewConfig,
    selection: Selection,
    /// Selector options, largest emitter first.
    countries: Vec<String>,
    years: Option<RangeInclusive<i32>>,
    pub charts: Charts,
    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Dashboard {
    pub fn new(datasets: Datasets, view: ViewConfig) -> Self {
        let countries = match &datasets.totals {
            Some(totals) => aggregate::countries_by_emissions(totals),
            None => {
                let mut all: Vec<String> = datasets
                    .loaded()
                    .flat_map(|t| t.countries().map(str::to_string))
                    .collect();
                all.sort();
                all.dedup();
                all
            }
        };
        let years = datasets.year_range();

        let country = normalize_country(&view.default_country)
            .filter(|c| datasets.knows_country(c))
            .or_else(|| countries.first().cloned())
            .unwrap_or_else(|| view.default_country.clone());
        let year = match &years {
            Some(range) => view.default_year.clamp(*range.start(), *range.end()),
            None => view.default_year,
        };
        if year != view.default_year {
            log::info!("Default year {} clamped to {year}", view.default_year);
        }

        let status_message = (!datasets.load_errors.is_empty()).then(|| {
            datasets
                .load_errors
                .iter()
                .map(|(kind, msg)| format!("{kind}: {msg}"))
                .collect::<Vec<_>>()
                .join("; ")
        });

        let mut dashboard = Self {
            datasets,
            view,
            selection: Selection { country, year },
            countries,
            years,
            charts: Charts::default(),
            status_message,
        };
        dashboard.refresh(|_| true);
        dashboard
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn years(&self) -> Option<RangeInclusive<i32>> {
        self.years.clone()
    }

    pub fn view(&self) -> &ViewConfig {
        &self.view
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    /// Select a country and recompute the charts that depend on it.
    /// A blank name is ignored.
    pub fn set_country(&mut self, raw: &str) {
        let Some(country) = normalize_country(raw) else {
            log::debug!("Ignoring empty country selection");
            return;
        };
        if country == self.selection.country {
            return;
        }
        log::debug!("Country changed to {country}");
        self.selection.country = country;
        self.refresh(Chart::depends_on_country);
    }

    /// Select a year, clamped to the loaded span, and recompute the charts
    /// that depend on it.
    pub fn set_year(&mut self, year: i32) {
        let year = match &self.years {
            Some(range) => year.clamp(*range.start(), *range.end()),
            None => year,
        };
        if year == self.selection.year {
            return;
        }
        log::debug!("Year changed to {year}");
        self.selection.year = year;
        self.refresh(Chart::depends_on_year);
    }

    fn refresh(&mut self, affected: impl Fn(Chart) -> bool) {
        for chart in Chart::ALL.into_iter().filter(|&c| affected(c)) {
            self.refresh_chart(chart);
        }
    }

    fn refresh_chart(&mut self, chart: Chart) {
        match chart {
            Chart::Trend => self.charts.trend = self.trend().into(),
            Chart::Sunburst => self.charts.sunburst = self.sunburst().into(),
            Chart::DominantSector => self.charts.dominant_sector = self.dominant_sector().into(),
            Chart::SectorMovers => self.charts.sector_movers = self.sector_movers().into(),
            Chart::LulucfSectors => self.charts.lulucf_sectors = self.lulucf_sectors().into(),
            Chart::GlobalMap => self.charts.global_map = self.global_map().into(),
            Chart::TopEmitters => self.charts.top_emitters = self.top_emitters().into(),
            Chart::DominantMap => self.charts.dominant_map = self.dominant_map().into(),
            Chart::RankBump => self.charts.rank_bump = self.rank_bump().into(),
            Chart::LulucfMap => self.charts.lulucf_map = self.lulucf_map().into(),
        }
    }

    // -- per-chart queries --

    /// The selected country, if any loaded table knows it.
    fn known_country(&self) -> Result<&str, QueryError> {
        let country = self.selection.country.as_str();
        if self.datasets.knows_country(country) {
            Ok(country)
        } else {
            Err(QueryError::InvalidSelection {
                detail: format!("{country} is not present in any loaded table"),
            })
        }
    }

    fn trend(&self) -> Result<YearSeries, QueryError> {
        let country = self.known_country()?;
        let totals = self.datasets.table(TableKind::Totals)?;
        non_empty(aggregate::trend_series(totals, country), Vec::is_empty, || {
            format!("no emission totals for {country}")
        })
    }

    fn sunburst(&self) -> Result<BTreeMap<String, f64>, QueryError> {
        let country = self.known_country()?;
        let year = self.selection.year;
        let sectors = self.datasets.table(TableKind::Sectors)?;
        non_empty(
            aggregate::sector_breakdown(sectors, country, year),
            BTreeMap::is_empty,
            || format!("no sector data for {country} in {year}"),
        )
    }

    fn dominant_sector(&self) -> Result<(String, f64), QueryError> {
        let country = self.known_country()?;
        let sectors = self.datasets.table(TableKind::Sectors)?;
        aggregate::dominant_sector(sectors, country, self.selection.year)
    }

    fn sector_movers(&self) -> Result<SectorMovers, QueryError> {
        let country = self.known_country()?;
        let year = self.selection.year;
        let sectors = self.datasets.table(TableKind::Sectors)?;
        let movers = aggregate::top_moving_sectors(
            sectors,
            country,
            year,
            self.view.window_years,
            self.view.movers,
        );
        let from_year = movers.from_year;
        non_empty(movers, SectorMovers::is_empty, || {
            format!("no sector changes for {country} between {from_year} and {year}")
        })
    }

    fn lulucf_sectors(&self) -> Result<BTreeMap<String, YearSeries>, QueryError> {
        let country = self.known_country()?;
        let lulucf = self.datasets.table(TableKind::Lulucf)?;
        non_empty(
            aggregate::lulucf_sector_series(lulucf, country),
            BTreeMap::is_empty,
            || format!("no LULUCF data for {country}"),
        )
    }

    fn global_map(&self) -> Result<BTreeMap<String, f64>, QueryError> {
        let year = self.selection.year;
        let totals = self.datasets.table(TableKind::Totals)?;
        non_empty(aggregate::global_snapshot(totals, year), BTreeMap::is_empty, || {
            format!("no country totals in {year}")
        })
    }

    fn top_emitters(&self) -> Result<Vec<EmitterEntry>, QueryError> {
        let year = self.selection.year;
        let totals = self.datasets.table(TableKind::Totals)?;
        let selected = Some(self.selection.country.as_str());
        non_empty(
            aggregate::top_emitters(totals, year, self.view.top_n, selected),
            Vec::is_empty,
            || format!("no country totals in {year}"),
        )
    }

    fn dominant_map(&self) -> Result<BTreeMap<String, String>, QueryError> {
        let year = self.selection.year;
        let sectors = self.datasets.table(TableKind::Sectors)?;
        non_empty(
            aggregate::dominant_sector_map(sectors, year),
            BTreeMap::is_empty,
            || format!("no sector data in {year}"),
        )
    }

    fn rank_bump(&self) -> Result<BTreeMap<String, RankSeries>, QueryError> {
        let year = self.selection.year;
        let totals = self.datasets.table(TableKind::Totals)?;
        let Some(span) = totals.year_range() else {
            return Err(QueryError::NoData {
                what: "the totals table has no years".to_string(),
            });
        };
        let countries = aggregate::bump_chart_countries(
            totals,
            year,
            self.view.top_n,
            Some(self.selection.country.as_str()),
        );
        non_empty(
            aggregate::rank_trajectory(totals, &countries, span),
            BTreeMap::is_empty,
            || format!("no ranked countries in {year}"),
        )
    }

    fn lulucf_map(&self) -> Result<BTreeMap<String, f64>, QueryError> {
        let year = self.selection.year;
        let lulucf = self.datasets.table(TableKind::Lulucf)?;
        non_empty(aggregate::lulucf_snapshot(lulucf, year), BTreeMap::is_empty, || {
            format!("no LULUCF data in {year}")
        })
    }
}

/// Turn an empty container into a `NoData` error.
fn non_empty<T>(
    value: T,
    is_empty: impl Fn(&T) -> bool,
    what: impl FnOnce() -> String,
) -> Result<T, QueryError> {
    if is_empty(&value) {
        Err(QueryError::NoData { what: what() })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::model::{EmissionRecord, EmissionTable, Sector};

    fn table(kind: TableKind, rows: &[(&str, i32, Option<&str>, f64)]) -> Arc<EmissionTable> {
        Arc::new(EmissionTable::from_records(
            kind,
            rows.iter().map(|&(country, year, sector, value)| EmissionRecord {
                country: country.to_string(),
                year,
                sector: sector.map_or(Sector::Total, |s| Sector::Named(s.to_string())),
                value,
            }),
        ))
    }

    fn fixture() -> Datasets {
        Datasets {
            totals: Some(table(
                TableKind::Totals,
                &[
                    ("France", 2019, None, 420.0),
                    ("France", 2020, None, 400.0),
                    ("Germany", 2019, None, 380.0),
                    ("Germany", 2020, None, 350.0),
                    ("Italy", 2020, None, 200.0),
                ],
            )),
            sectors: Some(table(
                TableKind::Sectors,
                &[
                    ("France", 2020, Some("Transport"), 130.0),
                    ("France", 2020, Some("Power Industry"), 270.0),
                    ("Germany", 2020, Some("Power Industry"), 350.0),
                ],
            )),
            lulucf: Some(table(
                TableKind::Lulucf,
                &[("France", 2020, Some("Forest land"), -30.0)],
            )),
            load_errors: Vec::new(),
        }
    }

    fn view(country: &str, year: i32) -> ViewConfig {
        ViewConfig {
            default_country: country.to_string(),
            default_year: year,
            top_n: 1,
            ..ViewConfig::default()
        }
    }

    #[test]
    fn test_defaults_resolved() {
        let dashboard = Dashboard::new(fixture(), view("FRANCE", 2020));
        assert_eq!(
            dashboard.selection(),
            &Selection {
                country: "France".to_string(),
                year: 2020
            }
        );
        assert_eq!(dashboard.countries(), ["France", "Germany", "Italy"]);
        assert!(dashboard.charts.trend.ready().is_some());
        assert!(dashboard.charts.sunburst.ready().is_some());
        assert!(dashboard.status_message.is_none());
    }

    #[test]
    fn test_unknown_default_country_falls_back_to_top_emitter() {
        let dashboard = Dashboard::new(fixture(), view("United States", 2050));
        assert_eq!(dashboard.selection().country, "France");
        assert_eq!(dashboard.selection().year, 2020);
    }

    #[test]
    fn test_set_year_clamps_and_recomputes() {
        let mut dashboard = Dashboard::new(fixture(), view("France", 2020));
        dashboard.set_year(1900);
        assert_eq!(dashboard.selection().year, 2019);

        // No sector rows in 2019: those charts become placeholders.
        assert!(matches!(dashboard.charts.sunburst, ChartSlot::Placeholder(_)));
        assert!(matches!(dashboard.charts.dominant_sector, ChartSlot::Placeholder(_)));
        // The totals-based charts are still there.
        let snapshot = dashboard.charts.global_map.ready().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.contains_key("Italy"));
    }

    #[test]
    fn test_set_country_leaves_year_only_charts_alone() {
        let mut dashboard = Dashboard::new(fixture(), view("France", 2020));
        let map_before = dashboard.charts.global_map.clone();

        dashboard.set_country("italy");
        assert_eq!(dashboard.selection().country, "Italy");
        assert_eq!(dashboard.charts.global_map, map_before);
        assert_eq!(
            dashboard.charts.trend,
            ChartSlot::Ready(vec![(2020, 200.0)])
        );

        let top = dashboard.charts.top_emitters.ready().unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[1].country, "Italy");
        assert!(top[1].outside_top_k);

        // Italy has neither sector nor LULUCF rows.
        assert!(matches!(dashboard.charts.sunburst, ChartSlot::Placeholder(_)));
        assert!(matches!(dashboard.charts.lulucf_sectors, ChartSlot::Placeholder(_)));
    }

    #[test]
    fn test_unknown_country_is_invalid_selection() {
        let mut dashboard = Dashboard::new(fixture(), view("France", 2020));
        dashboard.set_country("Atlantis");

        match &dashboard.charts.trend {
            ChartSlot::Placeholder(msg) => assert!(msg.starts_with("Invalid selection")),
            ChartSlot::Ready(_) => panic!("expected a placeholder"),
        }
        // Cross-country charts still render.
        assert!(dashboard.charts.top_emitters.ready().is_some());
        assert!(dashboard.charts.lulucf_map.ready().is_some());
    }

    #[test]
    fn test_missing_table_isolated_to_its_charts() {
        let mut datasets = fixture();
        datasets.sectors = None;
        datasets.load_errors.push((TableKind::Sectors, "file not found".into()));

        let dashboard = Dashboard::new(datasets, view("France", 2020));
        assert_eq!(
            dashboard.charts.sunburst,
            ChartSlot::Placeholder("GHG by sector data is unavailable (failed to load)".into())
        );
        assert!(matches!(dashboard.charts.dominant_map, ChartSlot::Placeholder(_)));
        assert!(dashboard.charts.trend.ready().is_some());
        assert!(dashboard.charts.rank_bump.ready().is_some());
        assert!(dashboard
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("file not found")));
    }

    #[test]
    fn test_reselecting_current_values_keeps_slots() {
        let mut dashboard = Dashboard::new(fixture(), view("France", 2020));
        fn sentinel<T>() -> ChartSlot<T> {
            ChartSlot::Placeholder("sentinel".to_string())
        }
        dashboard.charts.trend = sentinel();
        dashboard.charts.global_map = sentinel();

        dashboard.set_country(" france ");
        dashboard.set_year(2020);
        // Clamps to 2020, the current year.
        dashboard.set_year(2035);

        assert_eq!(dashboard.charts.trend, sentinel());
        assert_eq!(dashboard.charts.global_map, sentinel());
        assert_eq!(dashboard.selection().year, 2020);
    }

    #[test]
    fn test_blank_country_keeps_selection_and_status() {
        let mut datasets = fixture();
        datasets.sectors = None;
        datasets.load_errors.push((TableKind::Sectors, "file not found".into()));
        let mut dashboard = Dashboard::new(datasets, view("France", 2020));
        let status = dashboard.status_message.clone();
        assert!(status.is_some());

        dashboard.set_country("   ");
        assert_eq!(dashboard.selection().country, "France");
        assert_eq!(dashboard.status_message, status);
    }

    #[test]
    fn test_rank_bump_includes_selected() {
        let mut dashboard = Dashboard::new(fixture(), view("France", 2020));
        dashboard.set_country("Italy");
        let bump = dashboard.charts.rank_bump.ready().unwrap();
        assert_eq!(bump.keys().collect::<Vec<_>>(), ["France", "Italy"]);
        assert_eq!(bump["Italy"], vec![(2019, None), (2020, Some(3))]);
    }

    #[test]
    fn test_no_tables_loaded() {
        let dashboard = Dashboard::new(Datasets::default(), ViewConfig::default());
        assert_eq!(dashboard.selection().year, 2024);
        assert!(matches!(dashboard.charts.trend, ChartSlot::Placeholder(_)));
        assert!(matches!(dashboard.charts.lulucf_map, ChartSlot::Placeholder(_)));
    }

    #[test]
    fn test_chart_dependencies() {
        assert!(!Chart::GlobalMap.depends_on_country());
        assert!(Chart::GlobalMap.depends_on_year());
        assert!(Chart::Trend.depends_on_country());
        assert!(!Chart::Trend.depends_on_year());
        assert!(Chart::TopEmitters.depends_on_country());
    }
}
