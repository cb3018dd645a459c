use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::country::CountryNormalizer;
use super::error::LoadError;
use super::model::{Datasets, EmissionRecord, EmissionTable, Sector, TableKind};
use crate::config::DataConfig;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load all three sheets named in the config.
///
/// Each table is loaded independently: a failure is logged and recorded in
/// [`Datasets::load_errors`] while the remaining tables stay available.
pub fn load_all(config: &DataConfig) -> Datasets {
    let normalizer = CountryNormalizer::new(&config.excluded_countries);
    let mut datasets = Datasets::default();

    for kind in TableKind::ALL {
        match load_table_from_sheet(kind, config.path(kind), config.sheet(kind), &normalizer) {
            Ok(table) => *datasets.slot_mut(kind) = Some(Arc::new(table)),
            Err(e) => {
                let err = anyhow::Error::new(e);
                log::error!("Failed to load {kind}: {err:#}");
                datasets.load_errors.push((kind, format!("{err:#}")));
            }
        }
    }
    datasets
}

/// Load a single wide sheet.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one sheet row per line
/// * `.parquet` – string identifier columns, numeric year columns
/// * `.json`    – `[{ "Country": "...", "1990": 1.5, ... }, ...]`
/// * `.xlsx` / `.xls` / `.ods` – first worksheet, header in the first row
///
/// The header must contain the identifier columns of `kind` and at least one
/// all-digit year column; every other column is ignored. A sheet without a
/// single usable value is rejected as malformed.
pub fn load_table(
    kind: TableKind,
    path: &Path,
    normalizer: &CountryNormalizer,
) -> Result<EmissionTable, LoadError> {
    load_table_from_sheet(kind, path, None, normalizer)
}

/// Like [`load_table`], reading the worksheet `sheet` of a workbook.
///
/// A missing worksheet falls back to the first one with a warning. `sheet`
/// is ignored for the other formats.
pub fn load_table_from_sheet(
    kind: TableKind,
    path: &Path,
    sheet: Option<&str>,
    normalizer: &CountryNormalizer,
) -> Result<EmissionTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            table: kind,
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let sheet = match ext.as_str() {
        "csv" => read_csv(kind, path)?,
        "parquet" | "pq" => read_parquet(kind, path)?,
        "json" => read_json(kind, path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(kind, path, sheet)?,
        other => {
            return Err(LoadError::UnsupportedFormat {
                table: kind,
                extension: other.to_string(),
            })
        }
    };

    let layout = SheetLayout::resolve(kind, &sheet.headers)?;
    let mut collector = RowCollector::new(kind, layout, normalizer);
    for row in &sheet.rows {
        collector.push_row(row);
    }
    let table = collector.finish()?;

    log::info!(
        "Loaded {kind} from {}: {} countries, {} records",
        path.display(),
        table.len(),
        table.record_count()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Sheet layout – the explicit schema check
// ---------------------------------------------------------------------------

/// One raw cell before interpretation.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// Finite numeric value; text is parsed, anything else is `None`.
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(v) => *v,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Empty => return None,
        };
        value.is_finite().then_some(value)
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(v) => Some(v.to_string()),
            Cell::Empty => None,
        }
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

fn text_cell(s: &str) -> Cell {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(trimmed.to_string())
    }
}

/// Header row plus data rows, as read from disk.
struct RawSheet {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Positions of the identifier and year columns.
#[derive(Debug)]
struct SheetLayout {
    country: usize,
    sector: Option<usize>,
    years: Vec<(usize, i32)>,
}

impl SheetLayout {
    fn resolve(kind: TableKind, headers: &[String]) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
                LoadError::MissingColumn {
                    table: kind,
                    column: name.to_string(),
                }
            })
        };

        // Required columns are ordered Country, then Sector.
        let ids = kind
            .required_columns()
            .iter()
            .map(|&name| find(name))
            .collect::<Result<Vec<_>, _>>()?;
        let country = ids[0];
        let sector = ids.get(1).copied();

        let years: Vec<(usize, i32)> = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| parse_year(h).map(|year| (idx, year)))
            .collect();
        if years.is_empty() {
            return Err(LoadError::NoYearColumns { table: kind });
        }

        Ok(SheetLayout {
            country,
            sector,
            years,
        })
    }
}

fn parse_year(header: &str) -> Option<i32> {
    let h = header.trim();
    if h.is_empty() || !h.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    h.parse().ok()
}

// ---------------------------------------------------------------------------
// Row collection – wide rows → long records
// ---------------------------------------------------------------------------

struct RowCollector<'a> {
    kind: TableKind,
    layout: SheetLayout,
    normalizer: &'a CountryNormalizer,
    records: Vec<EmissionRecord>,
    rows_seen: usize,
    skipped_rows: usize,
    dropped_cells: usize,
}

impl<'a> RowCollector<'a> {
    fn new(kind: TableKind, layout: SheetLayout, normalizer: &'a CountryNormalizer) -> Self {
        Self {
            kind,
            layout,
            normalizer,
            records: Vec::new(),
            rows_seen: 0,
            skipped_rows: 0,
            dropped_cells: 0,
        }
    }

    fn push_row(&mut self, row: &[Cell]) {
        self.rows_seen += 1;
        let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY_CELL);

        let Some(country) = cell(self.layout.country)
            .as_text()
            .and_then(|raw| self.normalizer.canonical(&raw))
        else {
            self.skipped_rows += 1;
            return;
        };

        let sector = match self.layout.sector {
            None => Sector::Total,
            Some(idx) => match cell(idx).as_text() {
                Some(name) if !name.trim().is_empty() => Sector::Named(name.trim().to_string()),
                _ => {
                    self.skipped_rows += 1;
                    return;
                }
            },
        };

        for &(idx, year) in &self.layout.years {
            match cell(idx).as_f64() {
                Some(value) => self.records.push(EmissionRecord {
                    country: country.clone(),
                    year,
                    sector: sector.clone(),
                    value,
                }),
                None => self.dropped_cells += 1,
            }
        }
    }

    fn finish(self) -> Result<EmissionTable, LoadError> {
        if self.skipped_rows > 0 {
            log::warn!(
                "{}: skipped {} rows with a blank, aggregate or excluded country/sector",
                self.kind,
                self.skipped_rows
            );
        }
        if self.dropped_cells > 0 {
            log::debug!(
                "{}: dropped {} empty or non-numeric cells",
                self.kind,
                self.dropped_cells
            );
        }
        if self.records.is_empty() {
            let detail = if self.rows_seen == 0 {
                "sheet has no data rows".to_string()
            } else {
                format!(
                    "none of the {} data rows has a country and a numeric year value",
                    self.rows_seen
                )
            };
            return Err(malformed(self.kind, detail));
        }
        Ok(EmissionTable::from_records(self.kind, self.records))
    }
}

fn malformed(kind: TableKind, detail: impl Into<String>) -> LoadError {
    LoadError::Malformed {
        table: kind,
        detail: detail.into(),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(kind: TableKind, path: &Path) -> Result<RawSheet, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| malformed(kind, format!("reading CSV header: {e}")))?
        .iter()
        // Excel exports often start with a byte-order mark.
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| malformed(kind, format!("CSV row {}: {e}", row_no + 1)))?;
        rows.push(record.iter().map(text_cell).collect());
    }

    Ok(RawSheet { headers, rows })
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn read_json(kind: TableKind, path: &Path) -> Result<RawSheet, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
    let root: JsonValue =
        serde_json::from_str(&text).map_err(|e| malformed(kind, format!("parsing JSON: {e}")))?;

    let records = root
        .as_array()
        .ok_or_else(|| malformed(kind, "expected a top-level JSON array of records"))?;

    let mut objects = Vec::with_capacity(records.len());
    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| malformed(kind, format!("record {i} is not a JSON object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map_or(Cell::Empty, json_cell))
                .collect()
        })
        .collect();

    Ok(RawSheet { headers, rows })
}

fn json_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => text_cell(s),
        JsonValue::Number(n) => n.as_f64().map_or(Cell::Empty, Cell::Number),
        JsonValue::Null => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Works with files written by both Pandas (`df.to_parquet()`) and Polars,
/// including Polars' view-typed string columns.
fn read_parquet(kind: TableKind, path: &Path) -> Result<RawSheet, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| malformed(kind, format!("reading parquet metadata: {e}")))?;

    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| malformed(kind, format!("building parquet reader: {e}")))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch =
            batch_result.map_err(|e| malformed(kind, format!("reading parquet record batch: {e}")))?;
        for row in 0..batch.num_rows() {
            rows.push(batch.columns().iter().map(|col| arrow_cell(col, row)).collect());
        }
    }

    Ok(RawSheet { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &ArrayRef, row: usize) -> Cell {
    if col.is_null(row) {
        return Cell::Empty;
    }
    let cell = match col.data_type() {
        DataType::Utf8 => col.as_string_opt::<i32>().map(|a| text_cell(a.value(row))),
        DataType::LargeUtf8 => col.as_string_opt::<i64>().map(|a| text_cell(a.value(row))),
        DataType::Utf8View => col.as_string_view_opt().map(|a| text_cell(a.value(row))),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| Cell::Number(a.value(row))),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| Cell::Number(a.value(row) as f64)),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| Cell::Number(a.value(row) as f64)),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| Cell::Number(a.value(row) as f64)),
        _ => None,
    };
    cell.unwrap_or(Cell::Empty)
}

// ---------------------------------------------------------------------------
// Workbook reader (xlsx / xls / ods)
// ---------------------------------------------------------------------------

/// The EDGAR releases ship as Excel workbooks; the LULUCF data lives in a
/// named worksheet next to notes and metadata sheets.
fn read_workbook(kind: TableKind, path: &Path, sheet: Option<&str>) -> Result<RawSheet, LoadError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| malformed(kind, format!("opening workbook: {e}")))?;

    let names = workbook.sheet_names();
    let Some(first) = names.first().cloned() else {
        return Err(malformed(kind, "workbook has no worksheets"));
    };
    let name = match sheet {
        Some(wanted) if names.iter().any(|n| n == wanted) => wanted.to_string(),
        Some(wanted) => {
            log::warn!(
                "{kind}: no worksheet `{wanted}` in {}, reading `{first}` instead",
                path.display()
            );
            first
        }
        None => first,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| malformed(kind, format!("reading worksheet `{name}`: {e}")))?;
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|header| {
            header
                .iter()
                .map(|c| workbook_cell(c).as_text().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();
    let rows: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect();

    Ok(RawSheet { headers, rows })
}

/// Year headers are stored as numbers in most workbooks; `Cell::as_text`
/// renders `1990.0` back as `1990`.
fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::String(s) => text_cell(s),
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        _ => Cell::Empty,
    }
}
