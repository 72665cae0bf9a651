pub mod builder;
pub mod catalogue;
pub mod header;
pub mod record;
pub mod source;
pub mod tiling;

pub use builder::RebuildStats;
pub use catalogue::{CatalogueConfig, CatalogueHandle, CatalogueStore, TileScan};
pub use header::{TileIndex, TileInfo, FORMAT_VERSION};
pub use record::{CatalogueNumber, CatalogueRecord, NameField, RECORD_SIZE};
pub use tiling::{TileAddress, TileRect, TilingLevel, TilingScheme};
