//! Derived series for every chart.
//!
//! All functions are pure: they borrow a loaded [`EmissionTable`], never
//! mutate it and return the same output for the same arguments.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use super::error::QueryError;
use super::model::{EmissionTable, Sector};

/// `(year, value)` pairs, years ascending.
pub type YearSeries = Vec<(i32, f64)>;

/// `(year, rank)` pairs; `None` when the country has no total that year.
pub type RankSeries = Vec<(i32, Option<u32>)>;

// ---------------------------------------------------------------------------
// Country views
// ---------------------------------------------------------------------------

/// Total emissions of `country` per year.
pub fn trend_series(totals: &EmissionTable, country: &str) -> YearSeries {
    totals
        .records(country)
        .iter()
        .filter(|r| r.sector == Sector::Total)
        .map(|r| (r.year, r.value))
        .collect()
}

/// Sector → value for one country and year. Zero values are omitted.
pub fn sector_breakdown(sectors: &EmissionTable, country: &str, year: i32) -> BTreeMap<String, f64> {
    sectors
        .records_in_year(country, year)
        .iter()
        .filter_map(|r| match &r.sector {
            Sector::Named(name) if r.value != 0.0 => Some((name.clone(), r.value)),
            _ => None,
        })
        .collect()
}

/// The sector with the largest value; ties go to the first name.
pub fn dominant_sector(
    sectors: &EmissionTable,
    country: &str,
    year: i32,
) -> Result<(String, f64), QueryError> {
    sector_breakdown(sectors, country, year)
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .ok_or_else(|| QueryError::NoData {
            what: format!("no sector data for {country} in {year}"),
        })
}

/// Country → dominant sector, for every country with sector data in `year`.
pub fn dominant_sector_map(sectors: &EmissionTable, year: i32) -> BTreeMap<String, String> {
    sectors
        .countries()
        .filter_map(|country| {
            dominant_sector(sectors, country, year)
                .ok()
                .map(|(sector, _)| (country.to_string(), sector))
        })
        .collect()
}

/// Change of one sector between the two ends of a window.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorChange {
    pub sector: String,
    pub start: f64,
    pub end: f64,
    /// `end - start`, in Mt CO₂eq/yr.
    pub change: f64,
    /// Relative to `|start|`; `None` when `start` is zero.
    pub percent_change: Option<f64>,
}

/// Largest increases and decreases over a trailing window.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorMovers {
    pub from_year: i32,
    pub to_year: i32,
    pub increasing: Vec<SectorChange>,
    pub decreasing: Vec<SectorChange>,
}

impl SectorMovers {
    pub fn is_empty(&self) -> bool {
        self.increasing.is_empty() && self.decreasing.is_empty()
    }
}

/// Sectors of `country` that moved the most between
/// `year_end - window_years` and `year_end`.
///
/// Sectors missing either endpoint are skipped. Each list is ordered by
/// absolute change descending, ties by sector name, and holds at most `k`.
pub fn top_moving_sectors(
    sectors: &EmissionTable,
    country: &str,
    year_end: i32,
    window_years: u32,
    k: usize,
) -> SectorMovers {
    let from_year = year_end.saturating_sub_unsigned(window_years);
    let start = sector_breakdown_with_zeros(sectors, country, from_year);
    let end = sector_breakdown_with_zeros(sectors, country, year_end);

    let mut increasing = Vec::new();
    let mut decreasing = Vec::new();
    for (sector, &end_value) in &end {
        let Some(&start_value) = start.get(sector) else {
            continue;
        };
        let change = end_value - start_value;
        let entry = SectorChange {
            sector: sector.to_string(),
            start: start_value,
            end: end_value,
            change,
            percent_change: (start_value != 0.0).then(|| change / start_value.abs() * 100.0),
        };
        match change.partial_cmp(&0.0) {
            Some(Ordering::Greater) => increasing.push(entry),
            Some(Ordering::Less) => decreasing.push(entry),
            _ => {}
        }
    }

    for list in [&mut increasing, &mut decreasing] {
        list.sort_by(|a, b| {
            b.change
                .abs()
                .total_cmp(&a.change.abs())
                .then_with(|| a.sector.cmp(&b.sector))
        });
        list.truncate(k);
    }

    SectorMovers {
        from_year,
        to_year: year_end,
        increasing,
        decreasing,
    }
}

/// Like [`sector_breakdown`] but keeps zero values, which are valid endpoints
/// for a change.
fn sector_breakdown_with_zeros<'a>(
    sectors: &'a EmissionTable,
    country: &str,
    year: i32,
) -> BTreeMap<&'a str, f64> {
    sectors
        .records_in_year(country, year)
        .iter()
        .filter_map(|r| match &r.sector {
            Sector::Named(name) => Some((name.as_str(), r.value)),
            Sector::Total => None,
        })
        .collect()
}

/// Sector → yearly LULUCF values of one country, for the stacked bar chart.
pub fn lulucf_sector_series(lulucf: &EmissionTable, country: &str) -> BTreeMap<String, YearSeries> {
    let mut series: BTreeMap<String, YearSeries> = BTreeMap::new();
    for rec in lulucf.records(country) {
        if let Sector::Named(name) = &rec.sector {
            series
                .entry(name.clone())
                .or_default()
                .push((rec.year, rec.value));
        }
    }
    series
}

// ---------------------------------------------------------------------------
// Cross-country views
// ---------------------------------------------------------------------------

/// Country totals in `year`, value descending, ties by country name.
fn ranked_totals(totals: &EmissionTable, year: i32) -> Vec<(&str, f64)> {
    let mut ranked: Vec<(&str, f64)> = totals
        .countries()
        .filter_map(|c| totals.value(c, year, &Sector::Total).map(|v| (c, v)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
}

/// Country → total in `year`. Countries without a value are absent, not zero.
pub fn global_snapshot(totals: &EmissionTable, year: i32) -> BTreeMap<String, f64> {
    totals
        .countries()
        .filter_map(|c| {
            totals
                .value(c, year, &Sector::Total)
                .map(|v| (c.to_string(), v))
        })
        .collect()
}

/// Country → net LULUCF (sum over its land-use sectors) in `year`.
/// The sign is kept: negative is a net sink, positive a net source.
pub fn lulucf_snapshot(lulucf: &EmissionTable, year: i32) -> BTreeMap<String, f64> {
    lulucf
        .countries()
        .filter_map(|c| {
            let records = lulucf.records_in_year(c, year);
            (!records.is_empty()).then(|| (c.to_string(), records.iter().map(|r| r.value).sum()))
        })
        .collect()
}

/// One bar of the top-emitters chart.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterEntry {
    pub country: String,
    pub value: f64,
    /// 1-based position in the full ranking for the year.
    pub rank: usize,
    /// Appended because it was requested, not because it made the top k.
    pub outside_top_k: bool,
}

/// The `k` largest emitters in `year`.
///
/// When `always_include` has a total that year but ranks below `k`, it is
/// appended as an extra entry flagged `outside_top_k`, so the result holds
/// at most `k + 1` entries.
pub fn top_emitters(
    totals: &EmissionTable,
    year: i32,
    k: usize,
    always_include: Option<&str>,
) -> Vec<EmitterEntry> {
    let ranked = ranked_totals(totals, year);
    let mut entries: Vec<EmitterEntry> = ranked
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, &(country, value))| EmitterEntry {
            country: country.to_string(),
            value,
            rank: i + 1,
            outside_top_k: false,
        })
        .collect();

    if let Some(selected) = always_include {
        if let Some(pos) = ranked.iter().position(|&(c, _)| c == selected) {
            if pos >= k {
                entries.push(EmitterEntry {
                    country: selected.to_string(),
                    value: ranked[pos].1,
                    rank: pos + 1,
                    outside_top_k: true,
                });
            }
        }
    }
    entries
}

/// Dense ranks (1 = highest) of every country with a total in `year`.
/// Equal totals share a rank.
fn dense_ranks(totals: &EmissionTable, year: i32) -> HashMap<&str, u32> {
    let mut ranks = HashMap::new();
    let mut rank = 0u32;
    let mut previous: Option<f64> = None;
    for (country, value) in ranked_totals(totals, year) {
        if previous != Some(value) {
            rank += 1;
            previous = Some(value);
        }
        ranks.insert(country, rank);
    }
    ranks
}

/// Per-year rank of each requested country among all countries, for the
/// bump chart. Ranks are computed independently for every year.
pub fn rank_trajectory(
    totals: &EmissionTable,
    countries: &[String],
    years: RangeInclusive<i32>,
) -> BTreeMap<String, RankSeries> {
    let mut trajectories: BTreeMap<String, RankSeries> = countries
        .iter()
        .map(|c| (c.clone(), Vec::new()))
        .collect();

    for year in years {
        let ranks = dense_ranks(totals, year);
        for (country, series) in trajectories.iter_mut() {
            series.push((year, ranks.get(country.as_str()).copied()));
        }
    }
    trajectories
}

/// Countries shown in the bump chart: the top `k` in `year`, plus the
/// selected country when it is known but not among them.
pub fn bump_chart_countries(
    totals: &EmissionTable,
    year: i32,
    k: usize,
    selected: Option<&str>,
) -> Vec<String> {
    let mut countries: Vec<String> = ranked_totals(totals, year)
        .into_iter()
        .take(k)
        .map(|(c, _)| c.to_string())
        .collect();
    if let Some(selected) = selected {
        if totals.contains_country(selected) && !countries.iter().any(|c| c == selected) {
            countries.push(selected.to_string());
        }
    }
    countries
}

/// Countries ordered by total at the latest year, largest first.
/// Countries without a value that year follow alphabetically.
pub fn countries_by_emissions(totals: &EmissionTable) -> Vec<String> {
    let Some(&latest) = totals.years().last() else {
        return Vec::new();
    };
    let mut ordered: Vec<String> = ranked_totals(totals, latest)
        .into_iter()
        .map(|(c, _)| c.to_string())
        .collect();
    let mut rest: Vec<String> = totals
        .countries()
        .filter(|c| totals.value(c, latest, &Sector::Total).is_none())
        .map(str::to_string)
        .collect();
    rest.sort();
    ordered.extend(rest);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{EmissionRecord, TableKind};

    fn totals(rows: &[(&str, i32, f64)]) -> EmissionTable {
        EmissionTable::from_records(
            TableKind::Totals,
            rows.iter().map(|&(country, year, value)| EmissionRecord {
                country: country.to_string(),
                year,
                sector: Sector::Total,
                value,
            }),
        )
    }

    fn by_sector(kind: TableKind, rows: &[(&str, i32, &str, f64)]) -> EmissionTable {
        EmissionTable::from_records(
            kind,
            rows.iter().map(|&(country, year, sector, value)| EmissionRecord {
                country: country.to_string(),
                year,
                sector: Sector::Named(sector.to_string()),
                value,
            }),
        )
    }

    fn europe() -> EmissionTable {
        totals(&[
            ("France", 2020, 400.0),
            ("Germany", 2020, 350.0),
            ("Italy", 2020, 200.0),
            ("France", 2019, 420.0),
            ("Germany", 2019, 380.0),
            ("Italy", 2019, 210.0),
            ("Spain", 2019, 300.0),
        ])
    }

    #[test]
    fn test_trend_sorted_without_duplicates() {
        let table = europe();
        for country in table.countries() {
            let series = trend_series(&table, country);
            assert!(series.windows(2).all(|w| w[0].0 < w[1].0), "{country}");
        }
        assert_eq!(trend_series(&table, "France"), vec![(2019, 420.0), (2020, 400.0)]);
    }

    #[test]
    fn test_trend_unknown_country_is_empty() {
        assert!(trend_series(&europe(), "Atlantis").is_empty());
    }

    #[test]
    fn test_sector_breakdown_omits_zero() {
        let sectors = by_sector(
            TableKind::Sectors,
            &[
                ("France", 2020, "Power Industry", 50.0),
                ("France", 2020, "Transport", 120.0),
                ("France", 2020, "Fuel Exploitation", 0.0),
                ("France", 2019, "Transport", 130.0),
            ],
        );
        let breakdown = sector_breakdown(&sectors, "France", 2020);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown["Transport"], 120.0);
        assert!(!breakdown.contains_key("Fuel Exploitation"));
    }

    #[test]
    fn test_sector_breakdown_consistent_with_total() {
        let totals = totals(&[("Chile", 2020, 110.0)]);
        let sectors = by_sector(
            TableKind::Sectors,
            &[
                ("Chile", 2020, "Power Industry", 35.5),
                ("Chile", 2020, "Transport", 30.25),
                ("Chile", 2020, "Agriculture", 44.25),
            ],
        );
        let sum: f64 = sector_breakdown(&sectors, "Chile", 2020).values().sum();
        let total = trend_series(&totals, "Chile")
            .into_iter()
            .find(|&(year, _)| year == 2020)
            .map(|(_, v)| v)
            .unwrap();
        assert!((sum - total).abs() < 1e-9);
    }

    #[test]
    fn test_dominant_sector() {
        let sectors = by_sector(
            TableKind::Sectors,
            &[
                ("India", 2020, "Power Industry", 1200.0),
                ("India", 2020, "Agriculture", 700.0),
                ("India", 2021, "Agriculture", 0.0),
            ],
        );
        assert_eq!(
            dominant_sector(&sectors, "India", 2020),
            Ok(("Power Industry".to_string(), 1200.0))
        );
        assert!(matches!(
            dominant_sector(&sectors, "India", 2021),
            Err(QueryError::NoData { .. })
        ));
        assert!(matches!(
            dominant_sector(&sectors, "Nepal", 2020),
            Err(QueryError::NoData { .. })
        ));
    }

    #[test]
    fn test_dominant_sector_errors_iff_breakdown_empty() {
        let sectors = by_sector(
            TableKind::Sectors,
            &[
                ("Peru", 2020, "Waste", 5.0),
                ("Peru", 2021, "Waste", 0.0),
                ("Chad", 2020, "Agriculture", 9.0),
            ],
        );
        for country in ["Peru", "Chad", "Mali"] {
            for year in 2019..=2021 {
                let empty = sector_breakdown(&sectors, country, year).is_empty();
                assert_eq!(dominant_sector(&sectors, country, year).is_err(), empty);
            }
        }
    }

    #[test]
    fn test_dominant_sector_tie_prefers_name() {
        let sectors = by_sector(
            TableKind::Sectors,
            &[("Peru", 2020, "Waste", 5.0), ("Peru", 2020, "Agriculture", 5.0)],
        );
        assert_eq!(dominant_sector(&sectors, "Peru", 2020).unwrap().0, "Agriculture");
    }

    #[test]
    fn test_dominant_sector_map_skips_countries_without_data() {
        let sectors = by_sector(
            TableKind::Sectors,
            &[
                ("Peru", 2020, "Waste", 5.0),
                ("Peru", 2020, "Agriculture", 8.0),
                ("Chad", 2019, "Agriculture", 9.0),
            ],
        );
        let map = dominant_sector_map(&sectors, 2020);
        assert_eq!(map.len(), 1);
        assert_eq!(map["Peru"], "Agriculture");
    }

    #[test]
    fn test_top_moving_sectors() {
        let sectors = by_sector(
            TableKind::Sectors,
            &[
                ("Japan", 2010, "Power Industry", 500.0),
                ("Japan", 2020, "Power Industry", 450.0),
                ("Japan", 2010, "Transport", 200.0),
                ("Japan", 2020, "Transport", 210.0),
                ("Japan", 2010, "Waste", 10.0),
                ("Japan", 2020, "Waste", 20.0),
                ("Japan", 2010, "Agriculture", 30.0),
                ("Japan", 2020, "Agriculture", 30.0),
                ("Japan", 2020, "Buildings", 90.0),
                ("Japan", 2010, "Industrial Combustion", 0.0),
                ("Japan", 2020, "Industrial Combustion", 4.0),
            ],
        );
        let movers = top_moving_sectors(&sectors, "Japan", 2020, 10, 5);
        assert_eq!(movers.from_year, 2010);

        // Transport and Waste both rose by 10: name breaks the tie.
        let inc: Vec<&str> = movers.increasing.iter().map(|c| c.sector.as_str()).collect();
        assert_eq!(inc, vec!["Transport", "Waste", "Industrial Combustion"]);
        assert_eq!(movers.increasing[1].percent_change, Some(100.0));
        assert_eq!(movers.increasing[2].percent_change, None);

        assert_eq!(movers.decreasing.len(), 1);
        assert_eq!(movers.decreasing[0].sector, "Power Industry");
        assert_eq!(movers.decreasing[0].change, -50.0);
        assert_eq!(movers.decreasing[0].percent_change, Some(-10.0));
    }

    #[test]
    fn test_top_moving_sectors_truncates_to_k() {
        let sectors = by_sector(
            TableKind::Sectors,
            &[
                ("Kenya", 2000, "A", 1.0),
                ("Kenya", 2010, "A", 5.0),
                ("Kenya", 2000, "B", 1.0),
                ("Kenya", 2010, "B", 3.0),
                ("Kenya", 2000, "C", 1.0),
                ("Kenya", 2010, "C", 2.0),
            ],
        );
        let movers = top_moving_sectors(&sectors, "Kenya", 2010, 10, 2);
        let inc: Vec<&str> = movers.increasing.iter().map(|c| c.sector.as_str()).collect();
        assert_eq!(inc, vec!["A", "B"]);
        assert!(movers.decreasing.is_empty());
        assert!(top_moving_sectors(&sectors, "Kenya", 2005, 10, 2).is_empty());
    }

    #[test]
    fn test_top_emitters_appends_selected_outside_top_k() {
        let top = top_emitters(&europe(), 2020, 2, Some("Italy"));
        let summary: Vec<(&str, f64, bool)> = top
            .iter()
            .map(|e| (e.country.as_str(), e.value, e.outside_top_k))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("France", 400.0, false),
                ("Germany", 350.0, false),
                ("Italy", 200.0, true)
            ]
        );
        assert_eq!(top[2].rank, 3);
    }

    #[test]
    fn test_top_emitters_selected_inside_top_k_not_duplicated() {
        let top = top_emitters(&europe(), 2020, 2, Some("Germany"));
        assert_eq!(top.len(), 2);
        assert!(top.iter().all(|e| !e.outside_top_k));
    }

    #[test]
    fn test_top_emitters_bounds_and_order() {
        let table = europe();
        for k in 0..5 {
            for selected in [None, Some("Spain"), Some("Italy"), Some("Atlantis")] {
                let top = top_emitters(&table, 2019, k, selected);
                assert!(top.len() <= k + 1);
                let ranked: Vec<f64> = top
                    .iter()
                    .filter(|e| !e.outside_top_k)
                    .map(|e| e.value)
                    .collect();
                assert!(ranked.len() <= k);
                assert!(ranked.windows(2).all(|w| w[0] >= w[1]));
            }
        }
    }

    #[test]
    fn test_top_emitters_tie_broken_by_name() {
        let table = totals(&[("Norway", 2020, 50.0), ("Austria", 2020, 50.0), ("Chile", 2020, 80.0)]);
        let names: Vec<String> = top_emitters(&table, 2020, 3, None)
            .into_iter()
            .map(|e| e.country)
            .collect();
        assert_eq!(names, vec!["Chile", "Austria", "Norway"]);
    }

    #[test]
    fn test_rank_trajectory() {
        let table = europe();
        let countries = vec!["Spain".to_string(), "Italy".to_string()];
        let ranks = rank_trajectory(&table, &countries, 2019..=2021);

        assert_eq!(ranks["Spain"], vec![(2019, Some(3)), (2020, None), (2021, None)]);
        assert_eq!(ranks["Italy"], vec![(2019, Some(4)), (2020, Some(3)), (2021, None)]);
    }

    #[test]
    fn test_rank_trajectory_is_idempotent() {
        let table = europe();
        let countries: Vec<String> = table.countries().map(str::to_string).collect();
        let first = rank_trajectory(&table, &countries, 2018..=2020);
        let second = rank_trajectory(&table, &countries, 2018..=2020);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rank_trajectory_dense_on_ties() {
        let table = totals(&[("A", 2020, 10.0), ("B", 2020, 10.0), ("C", 2020, 5.0)]);
        let countries = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let ranks = rank_trajectory(&table, &countries, 2020..=2020);
        assert_eq!(ranks["A"], vec![(2020, Some(1))]);
        assert_eq!(ranks["B"], vec![(2020, Some(1))]);
        assert_eq!(ranks["C"], vec![(2020, Some(2))]);
    }

    #[test]
    fn test_bump_chart_countries() {
        let table = europe();
        assert_eq!(
            bump_chart_countries(&table, 2020, 2, Some("Spain")),
            vec!["France", "Germany", "Spain"]
        );
        assert_eq!(
            bump_chart_countries(&table, 2020, 2, Some("France")),
            vec!["France", "Germany"]
        );
        assert_eq!(
            bump_chart_countries(&table, 2020, 2, Some("Atlantis")),
            vec!["France", "Germany"]
        );
    }

    #[test]
    fn test_global_snapshot_omits_absent_countries() {
        let table = totals(&[("France", 2023, 390.0), ("Spain", 2022, 280.0)]);
        let snapshot = global_snapshot(&table, 2023);
        assert_eq!(snapshot.get("France"), Some(&390.0));
        assert!(!snapshot.contains_key("Spain"));
    }

    #[test]
    fn test_lulucf_snapshot_preserves_sign() {
        let lulucf = by_sector(
            TableKind::Lulucf,
            &[
                ("Brazil", 2019, "Forest land", -120.0),
                ("Indonesia", 2019, "Forest land", -40.0),
                ("Indonesia", 2019, "Deforestation", 250.0),
                ("Chad", 2018, "Forest land", -3.0),
            ],
        );
        let snapshot = lulucf_snapshot(&lulucf, 2019);
        assert_eq!(snapshot["Brazil"], -120.0);
        assert_eq!(snapshot["Indonesia"], 210.0);
        assert!(!snapshot.contains_key("Chad"));
    }

    #[test]
    fn test_lulucf_sector_series() {
        let lulucf = by_sector(
            TableKind::Lulucf,
            &[
                ("Brazil", 2019, "Forest land", -120.0),
                ("Brazil", 2020, "Forest land", -110.0),
                ("Brazil", 2020, "Deforestation", 300.0),
            ],
        );
        let series = lulucf_sector_series(&lulucf, "Brazil");
        assert_eq!(series["Forest land"], vec![(2019, -120.0), (2020, -110.0)]);
        assert_eq!(series["Deforestation"], vec![(2020, 300.0)]);
    }

    #[test]
    fn test_countries_by_emissions() {
        let table = totals(&[
            ("Italy", 2020, 200.0),
            ("France", 2020, 400.0),
            ("Spain", 2019, 300.0),
            ("Austria", 2019, 60.0),
        ]);
        assert_eq!(
            countries_by_emissions(&table),
            vec!["France", "Italy", "Austria", "Spain"]
        );
    }
}
