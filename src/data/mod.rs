/// Data layer: core types, loading, and aggregation.
///
/// Architecture:
/// ```text
///  totals / sectors / LULUCF  (.csv / .parquet / .json)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  schema check, wide → long, country normalization
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ EmissionTable  │  country → records ordered by year (read-only)
///   └───────────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  trend, breakdown, rankings, snapshots
///   └───────────┘
/// ```

pub mod aggregate;
pub mod country;
pub mod error;
pub mod loader;
pub mod model;
