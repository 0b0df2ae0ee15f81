/// Data layer: core types, encodings, expressions and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  codec    │  bytes ⇄ TabularDataset
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ TabularDataset │  columns + rows of Value
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  expr::parse → bind → keep matching rows
///   └──────────┘
/// ```

pub mod codec;
pub mod expr;
pub mod filter;
pub mod format;
pub mod loader;
pub mod model;
