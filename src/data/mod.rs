/// Data layer: core types, loading, and derived views.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet  (file or URL)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read origin → Dataset (empty / diagnostic on failure)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  ordered columns, Vec<row>
///   └──────────┘
///        │   + FilterSelection
///        ▼
///   ┌──────────┐
///   │   view    │  group / select / mask → View or Empty
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod selection;
pub mod view;
