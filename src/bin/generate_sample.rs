//! Writes synthetic EDGAR-style wide sheets for trying the explorer
//! without the real data.
//!
//! ```text
//! cargo run --bin generate_sample -- [OUT_DIR] [--parquet]
//! ```
//!
//! Produces `GHG_totals_by_country.csv`, `GHG_by_sector_and_country.csv`
//! and `LULUCF_countries.csv` in `OUT_DIR` (default `data`). With
//! `--parquet` the totals sheet is also written as Parquet.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const FIRST_YEAR: i32 = 1970;
const LAST_YEAR: i32 = 2024;

/// (name, ISO code, macro-region, 1970 total in Mt, yearly growth)
const COUNTRIES: [(&str, &str, &str, f64, f64); 12] = [
    ("China", "CHN", "Asia", 900.0, 0.055),
    ("United States", "USA", "North America", 5200.0, 0.004),
    ("India", "IND", "Asia", 420.0, 0.048),
    ("Russia", "RUS", "Europe", 2300.0, -0.002),
    ("Brazil", "BRA", "South America", 310.0, 0.03),
    ("Indonesia", "IDN", "Asia", 180.0, 0.045),
    ("Japan", "JPN", "Asia", 900.0, 0.003),
    ("Germany", "DEU", "Europe", 1200.0, -0.008),
    ("Iran", "IRN", "Middle East", 120.0, 0.05),
    ("Saudi Arabia", "SAU", "Middle East", 60.0, 0.06),
    ("France", "FRA", "Europe", 560.0, -0.006),
    ("Bosnia and Herzegovina", "BIH", "Europe", 25.0, 0.005),
];

const SECTORS: [&str; 8] = [
    "Agriculture",
    "Buildings",
    "Fuel Exploitation",
    "Industrial Combustion",
    "Power Industry",
    "Processes",
    "Transport",
    "Waste",
];

const LULUCF_SECTORS: [&str; 4] = ["Deforestation", "Forest land", "Organic soil", "Other land"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

fn years() -> impl Iterator<Item = i32> {
    FIRST_YEAR..=LAST_YEAR
}

/// One country's sheet rows: sector → yearly values.
struct CountrySeries {
    sectors: Vec<Vec<f64>>,
    lulucf: Vec<Vec<f64>>,
}

impl CountrySeries {
    fn totals(&self) -> Vec<f64> {
        let n = self.sectors.first().map_or(0, Vec::len);
        (0..n).map(|i| self.sectors.iter().map(|s| s[i]).sum()).collect()
    }
}

fn simulate(rng: &mut SimpleRng, base: f64, growth: f64) -> CountrySeries {
    let shares: Vec<f64> = SECTORS.iter().map(|_| rng.uniform(0.2, 1.0)).collect();
    let share_sum: f64 = shares.iter().sum();

    let sectors: Vec<Vec<f64>> = shares
        .iter()
        .map(|share| {
            // Each sector drifts around the country trend.
            let drift = rng.uniform(-0.015, 0.015);
            let mut level = base * share / share_sum;
            years()
                .map(|_| {
                    level *= 1.0 + growth + drift + rng.uniform(-0.02, 0.02);
                    level.max(0.0)
                })
                .collect()
        })
        .collect();

    let lulucf: Vec<Vec<f64>> = LULUCF_SECTORS
        .iter()
        .map(|&sector| {
            let scale = base * rng.uniform(0.01, 0.08);
            let sign = if sector == "Forest land" { -1.0 } else { 1.0 };
            years()
                .map(|_| sign * scale * rng.uniform(0.7, 1.3))
                .collect()
        })
        .collect();

    CountrySeries { sectors, lulucf }
}

fn year_header() -> impl Iterator<Item = String> {
    years().map(|y| y.to_string())
}

fn values_row(values: &[f64]) -> impl Iterator<Item = String> + '_ {
    values.iter().map(|v| format!("{v:.3}"))
}

fn write_totals(path: &Path, data: &[CountrySeries]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let header = ["EDGAR Country Code", "Country"].map(String::from);
    writer.write_record(header.into_iter().chain(year_header()))?;

    let mut world = vec![0.0; years().count()];
    for (&(name, code, ..), series) in COUNTRIES.iter().zip(data) {
        let totals = series.totals();
        for (acc, v) in world.iter_mut().zip(&totals) {
            *acc += v;
        }
        let ids = [code.to_string(), name.to_string()];
        writer.write_record(ids.into_iter().chain(values_row(&totals)))?;
    }
    // Aggregate row, dropped by the loader.
    let ids = [String::new(), "GLOBAL TOTAL".to_string()];
    writer.write_record(ids.into_iter().chain(values_row(&world)))?;
    writer.flush()?;
    Ok(())
}

fn write_sectors(path: &Path, data: &[CountrySeries]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let header = ["Sector", "EDGAR Country Code", "Country"].map(String::from);
    writer.write_record(header.into_iter().chain(year_header()))?;

    for (&(name, code, ..), series) in COUNTRIES.iter().zip(data) {
        for (sector, values) in SECTORS.iter().zip(&series.sectors) {
            let ids = [sector.to_string(), code.to_string(), name.to_string()];
            writer.write_record(ids.into_iter().chain(values_row(values)))?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_lulucf(path: &Path, data: &[CountrySeries]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let header = ["Macro-region", "Country", "Sector"].map(String::from);
    writer.write_record(header.into_iter().chain(year_header()))?;

    for (&(name, _, region, ..), series) in COUNTRIES.iter().zip(data) {
        for (sector, values) in LULUCF_SECTORS.iter().zip(&series.lulucf) {
            let ids = [region.to_string(), name.to_string(), sector.to_string()];
            writer.write_record(ids.into_iter().chain(values_row(values)))?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_totals_parquet(path: &Path, data: &[CountrySeries]) -> Result<()> {
    let mut fields = vec![Field::new("Country", DataType::Utf8, false)];
    fields.extend(year_header().map(|y| Field::new(y, DataType::Float64, true)));
    let schema = Arc::new(Schema::new(fields));

    let names: Vec<&str> = COUNTRIES.iter().map(|c| c.0).collect();
    let totals: Vec<Vec<f64>> = data.iter().map(CountrySeries::totals).collect();
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(names))];
    for i in 0..years().count() {
        let column: Float64Array = totals.iter().map(|t| t.get(i).copied()).collect();
        columns.push(Arc::new(column));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut out_dir = PathBuf::from("data");
    let mut parquet = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--parquet" => parquet = true,
            other => out_dir = PathBuf::from(other),
        }
    }
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let data: Vec<CountrySeries> = COUNTRIES
        .iter()
        .map(|&(_, _, _, base, growth)| simulate(&mut rng, base, growth))
        .collect();

    write_totals(&out_dir.join("GHG_totals_by_country.csv"), &data)?;
    write_sectors(&out_dir.join("GHG_by_sector_and_country.csv"), &data)?;
    write_lulucf(&out_dir.join("LULUCF_countries.csv"), &data)?;
    if parquet {
        write_totals_parquet(&out_dir.join("GHG_totals_by_country.parquet"), &data)?;
    }

    println!(
        "Wrote {} countries × {} years to {}",
        COUNTRIES.len(),
        years().count(),
        out_dir.display()
    );
    Ok(())
}
