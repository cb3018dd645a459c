use std::path::PathBuf;

use thiserror::Error;

use super::model::TableKind;

/// Raised while reading one of the source sheets.
///
/// A failed table only disables the charts built from it; the other tables
/// stay usable.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{table} file not found: `{}`", .path.display())]
    NotFound { table: TableKind, path: PathBuf },

    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("unsupported file extension for {table}: .{extension}")]
    UnsupportedFormat { table: TableKind, extension: String },

    #[error("{table} sheet is missing required column `{column}`")]
    MissingColumn { table: TableKind, column: String },

    #[error("{table} sheet has no year columns (expected headers like `1970`, `2024`)")]
    NoYearColumns { table: TableKind },

    #[error("{table} sheet is malformed: {detail}")]
    Malformed { table: TableKind, detail: String },
}

/// Raised by a single chart query. Never fatal for the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("No data: {what}")]
    NoData { what: String },

    #[error("Invalid selection: {detail}")]
    InvalidSelection { detail: String },

    #[error("{table} data is unavailable (failed to load)")]
    Unavailable { table: TableKind },
}
