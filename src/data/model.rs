use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use super::error::QueryError;

// ---------------------------------------------------------------------------
// TableKind – which source sheet a table came from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableKind {
    /// `GHG_totals_by_country`: one total per country and year.
    Totals,
    /// `GHG_by_sector_and_country`: one value per country, sector and year.
    Sectors,
    /// `LULUCF_countries`: land-use values, negative for net sinks.
    Lulucf,
}

impl TableKind {
    pub const ALL: [TableKind; 3] = [TableKind::Totals, TableKind::Sectors, TableKind::Lulucf];

    /// Identifier columns that must be present in the sheet header.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            TableKind::Totals => &["Country"],
            TableKind::Sectors | TableKind::Lulucf => &["Country", "Sector"],
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TableKind::Totals => "GHG totals",
            TableKind::Sectors => "GHG by sector",
            TableKind::Lulucf => "LULUCF",
        };
        write!(f, "{label}")
    }
}

// ---------------------------------------------------------------------------
// Sector
// ---------------------------------------------------------------------------

/// Either the country-wide aggregate or a named emission sector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sector {
    Total,
    Named(String),
}

impl Sector {
    pub fn name(&self) -> &str {
        match self {
            Sector::Total => "TOTAL",
            Sector::Named(name) => name,
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// EmissionRecord – one (country, year, sector) cell of a sheet
// ---------------------------------------------------------------------------

/// A single emission value in Mt CO₂eq/yr.
///
/// LULUCF rows share this shape; their value may be negative (net sink).
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionRecord {
    pub country: String,
    pub year: i32,
    pub sector: Sector,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// EmissionTable – the loaded, read-only sheet
// ---------------------------------------------------------------------------

/// Records grouped by country, each group ordered by year then sector.
///
/// Holds at most one record per (country, year, sector). Duplicate input
/// rows are merged by summation when the table is built.
#[derive(Debug, Clone)]
pub struct EmissionTable {
    kind: TableKind,
    by_country: BTreeMap<String, Vec<EmissionRecord>>,
    years: BTreeSet<i32>,
}

impl EmissionTable {
    /// Build the table, merging duplicate keys.
    pub fn from_records(kind: TableKind, records: impl IntoIterator<Item = EmissionRecord>) -> Self {
        let mut merged: BTreeMap<(String, i32, Sector), f64> = BTreeMap::new();
        let mut duplicates = 0usize;

        for rec in records {
            match merged.entry((rec.country, rec.year, rec.sector)) {
                Entry::Vacant(slot) => {
                    slot.insert(rec.value);
                }
                Entry::Occupied(mut slot) => {
                    *slot.get_mut() += rec.value;
                    duplicates += 1;
                }
            }
        }
        if duplicates > 0 {
            log::warn!("{kind}: merged {duplicates} duplicate rows by summation");
        }

        let mut by_country: BTreeMap<String, Vec<EmissionRecord>> = BTreeMap::new();
        let mut years = BTreeSet::new();
        // Key order is (country, year, sector), so each group comes out sorted.
        for ((country, year, sector), value) in merged {
            years.insert(year);
            by_country
                .entry(country.clone())
                .or_default()
                .push(EmissionRecord {
                    country,
                    year,
                    sector,
                    value,
                });
        }

        EmissionTable {
            kind,
            by_country,
            years,
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// All records of a country, years ascending. Empty for unknown countries.
    pub fn records(&self, country: &str) -> &[EmissionRecord] {
        self.by_country
            .get(country)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Records of a country for a single year.
    pub fn records_in_year(&self, country: &str, year: i32) -> &[EmissionRecord] {
        let records = self.records(country);
        let start = records.partition_point(|r| r.year < year);
        let end = records.partition_point(|r| r.year <= year);
        &records[start..end]
    }

    pub fn value(&self, country: &str, year: i32, sector: &Sector) -> Option<f64> {
        self.records_in_year(country, year)
            .iter()
            .find(|r| &r.sector == sector)
            .map(|r| r.value)
    }

    /// Country names in ascending order.
    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.by_country.keys().map(String::as_str)
    }

    pub fn contains_country(&self, country: &str) -> bool {
        self.by_country.contains_key(country)
    }

    pub fn years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    pub fn year_range(&self) -> Option<RangeInclusive<i32>> {
        let first = *self.years.first()?;
        let last = *self.years.last()?;
        Some(first..=last)
    }

    /// Number of countries.
    pub fn len(&self) -> usize {
        self.by_country.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_country.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.by_country.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Datasets – the three tables, each independently available
// ---------------------------------------------------------------------------

/// Shared read-only handles to whichever tables loaded successfully.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub totals: Option<Arc<EmissionTable>>,
    pub sectors: Option<Arc<EmissionTable>>,
    pub lulucf: Option<Arc<EmissionTable>>,
    /// Load failures, reported once in the UI.
    pub load_errors: Vec<(TableKind, String)>,
}

impl Datasets {
    pub fn slot(&self, kind: TableKind) -> Option<&Arc<EmissionTable>> {
        match kind {
            TableKind::Totals => self.totals.as_ref(),
            TableKind::Sectors => self.sectors.as_ref(),
            TableKind::Lulucf => self.lulucf.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, kind: TableKind) -> &mut Option<Arc<EmissionTable>> {
        match kind {
            TableKind::Totals => &mut self.totals,
            TableKind::Sectors => &mut self.sectors,
            TableKind::Lulucf => &mut self.lulucf,
        }
    }

    pub fn table(&self, kind: TableKind) -> Result<&EmissionTable, QueryError> {
        self.slot(kind)
            .map(Arc::as_ref)
            .ok_or(QueryError::Unavailable { table: kind })
    }

    pub fn loaded(&self) -> impl Iterator<Item = &EmissionTable> {
        TableKind::ALL
            .into_iter()
            .filter_map(|kind| self.slot(kind).map(Arc::as_ref))
    }

    /// Whether any loaded table mentions the country.
    pub fn knows_country(&self, country: &str) -> bool {
        self.loaded().any(|t| t.contains_country(country))
    }

    /// Union of the year spans of all loaded tables.
    pub fn year_range(&self) -> Option<RangeInclusive<i32>> {
        self.loaded()
            .filter_map(EmissionTable::year_range)
            .reduce(|a, b| (*a.start()).min(*b.start())..=(*a.end()).max(*b.end()))
    }
}
