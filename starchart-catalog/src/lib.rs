//! Magnitude-tiled star catalogue for chart rendering.
//!
//! Objects are partitioned into a hierarchy of levels: bright objects on a
//! coarse sky grid, fainter ones on progressively finer grids. A chart of any
//! sky region and depth reads only the tiles its viewport touches, each
//! already sorted brightest first so scans stop as soon as they pass the
//! chart's faint limit.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`store::record`] | Fixed-size [`CatalogueRecord`](store::CatalogueRecord) codec |
//! | [`store::tiling`] | [`TilingScheme`](store::TilingScheme) levels and bin math |
//! | [`store::header`] | [`TileIndex`](store::TileIndex) header read/write |
//! | [`store::catalogue`] | [`CatalogueStore`](store::CatalogueStore) open/rebuild, tile reads |
//! | [`query::selector`] | Tile/viewport intersection |
//! | [`query::planner`] | Magnitude limits from an object budget |
//!
//! # Quick Start
//!
//! ```ignore
//! use starchart_catalog::query::{plan, MagnitudeRequest, Viewport};
//! use starchart_catalog::store::{CatalogueConfig, CatalogueStore};
//!
//! let store = CatalogueStore::new(CatalogueConfig::new("stars.txt.gz", "stars.bin"));
//! let mut handle = store.open()?; // builds stars.bin on first use
//!
//! let viewport = Viewport::equirectangular(1.46, 0.13, 0.2, 0.15);
//! let limits = plan(&mut handle, &viewport, &MagnitudeRequest::default())?;
//! ```
//!
//! # Binary Format
//!
//! A header (format version, record area offset, level and tile counts,
//! level start ids, per-tile record count and offset) followed by
//! 156-byte records grouped by tile in tile-id order. A file with another
//! format version or tiling is rebuilt from the text source on open.
//!
//! # Features
//!
//! - **`cli`** — Enables the `starchart-catalogue` maintenance binary.
//! - **`serde`** — Serialize/deserialize configuration types.

pub mod error;
pub mod query;
pub mod store;

pub use error::{CatalogueError, Result};
