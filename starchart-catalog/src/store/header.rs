//! Tile index stored at the front of a binary catalogue.
//!
//! Layout, little-endian and without padding:
//!
//! ```text
//! [format_version: i32]
//! [record_area_start: u64]
//! [level_count: i32]
//! [tile_count: i32]
//! [level_start_tile_id: i32 × level_count]
//! [tile_info: {record_count: i32, record_offset: i32} × tile_count]
//! [records ...]
//! ```
//!
//! `record_offset` counts records, not bytes, from `record_area_start`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;

use super::record::RECORD_SIZE;
use super::tiling::TilingScheme;
use crate::error::{CatalogueError, Result};

/// Version tag written by this crate. Files carrying another tag are rebuilt.
pub const FORMAT_VERSION: i32 = 3;

const FIXED_HEADER_SIZE: u64 = 4 + 8 + 4 + 4;
const TILE_INFO_SIZE: u64 = 8;

/// Where one tile's records live in the record area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileInfo {
    pub record_count: u32,
    /// First record of the tile, in records from the start of the record area.
    pub record_offset: u32,
}

/// Parsed catalogue header.
#[derive(Debug, Clone, PartialEq)]
pub struct TileIndex {
    pub format_version: i32,
    /// Byte offset of the first record.
    pub record_area_start: u64,
    pub level_start_ids: Vec<u32>,
    pub tiles: Vec<TileInfo>,
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_records();
        let occupied = self.tiles.iter().filter(|t| t.record_count > 0).count();
        writeln!(f, "Format version: {}", self.format_version)?;
        writeln!(f, "Levels: {}", self.level_count())?;
        writeln!(f, "Tiles: {} ({} occupied)", self.tile_count(), occupied)?;
        writeln!(f, "Total records: {}", total)?;
        writeln!(f, "Record area start: {}", self.record_area_start)?;
        write!(
            f,
            "Average records per tile: {:.1}",
            total as f64 / self.tile_count().max(1) as f64
        )
    }
}

impl TileIndex {
    /// Lays tiles out back to back in tile-id order from per-tile counts.
    pub fn from_counts(scheme: &TilingScheme, counts: &[u32]) -> Result<Self> {
        let expected = scheme.total_tiles() as usize;
        if counts.len() != expected {
            return Err(CatalogueError::invalid_tiling(format!(
                "{} tile counts supplied for a scheme of {} tiles",
                counts.len(),
                expected
            )));
        }

        let mut tiles = Vec::with_capacity(counts.len());
        let mut next: u64 = 0;
        for &count in counts {
            tiles.push(TileInfo {
                record_count: count,
                record_offset: next as u32,
            });
            next += count as u64;
            if next > i32::MAX as u64 {
                return Err(CatalogueError::capacity(
                    "records per catalogue",
                    i32::MAX as u64,
                ));
            }
        }

        Ok(Self {
            format_version: FORMAT_VERSION,
            record_area_start: encoded_len(scheme.level_count(), counts.len()),
            level_start_ids: scheme.level_start_ids(),
            tiles,
        })
    }

    pub fn level_count(&self) -> usize {
        self.level_start_ids.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn total_records(&self) -> u64 {
        self.tiles.iter().map(|t| t.record_count as u64).sum()
    }

    pub fn tile(&self, tile_id: u32) -> Result<TileInfo> {
        self.tiles
            .get(tile_id as usize)
            .copied()
            .ok_or(CatalogueError::TileOutOfRange {
                tile_id,
                tile_count: self.tiles.len() as u32,
            })
    }

    /// Byte position of the `index`-th record of a tile.
    pub fn record_position(&self, info: TileInfo, index: u32) -> u64 {
        self.record_area_start + (info.record_offset as u64 + index as u64) * RECORD_SIZE as u64
    }

    /// Byte length of a complete file described by this index.
    pub fn file_len(&self) -> u64 {
        self.record_area_start + self.total_records() * RECORD_SIZE as u64
    }

    /// Record count per level.
    pub fn level_record_counts(&self) -> Vec<u64> {
        let mut bounds = self.level_start_ids.clone();
        bounds.push(self.tiles.len() as u32);
        bounds
            .windows(2)
            .map(|w| {
                self.tiles[w[0] as usize..w[1] as usize]
                    .iter()
                    .map(|t| t.record_count as u64)
                    .sum()
            })
            .collect()
    }

    /// Fails with [`CatalogueError::FormatMismatch`] when the file was written
    /// with a different tiling.
    pub fn check_scheme(&self, scheme: &TilingScheme) -> Result<()> {
        let expected_starts = scheme.level_start_ids();
        if self.level_start_ids != expected_starts
            || self.tiles.len() != scheme.total_tiles() as usize
        {
            return Err(CatalogueError::format_mismatch(
                format!(
                    "{} levels / {} tiles",
                    expected_starts.len(),
                    scheme.total_tiles()
                ),
                format!("{} levels / {} tiles", self.level_count(), self.tile_count()),
            ));
        }
        Ok(())
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i32::<LittleEndian>(self.format_version)?;
        w.write_u64::<LittleEndian>(self.record_area_start)?;
        w.write_i32::<LittleEndian>(self.level_start_ids.len() as i32)?;
        w.write_i32::<LittleEndian>(self.tiles.len() as i32)?;
        for &start in &self.level_start_ids {
            w.write_i32::<LittleEndian>(start as i32)?;
        }
        for tile in &self.tiles {
            w.write_i32::<LittleEndian>(tile.record_count as i32)?;
            w.write_i32::<LittleEndian>(tile.record_offset as i32)?;
        }
        Ok(())
    }

    /// Reads and validates a header. `path` is only used in error messages.
    pub fn read_from<R: Read>(r: &mut R, path: &Path) -> Result<Self> {
        let io_err = |e: io::Error| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                CatalogueError::truncated("header ends early")
            } else {
                CatalogueError::io(path, e)
            }
        };

        let format_version = r.read_i32::<LittleEndian>().map_err(io_err)?;
        if format_version != FORMAT_VERSION {
            return Err(CatalogueError::format_mismatch(
                format!("version {}", FORMAT_VERSION),
                format!("version {}", format_version),
            ));
        }
        let record_area_start = r.read_u64::<LittleEndian>().map_err(io_err)?;
        let level_count = read_count(r, "level count").map_err(io_err)??;
        let tile_count = read_count(r, "tile count").map_err(io_err)??;

        // Grow as we go so a corrupt count hits EOF instead of a huge allocation.
        let mut level_start_ids = Vec::with_capacity(level_count.min(1024));
        for _ in 0..level_count {
            level_start_ids.push(read_count(r, "level start id").map_err(io_err)?? as u32);
        }
        let mut tiles = Vec::with_capacity(tile_count.min(1 << 16));
        for _ in 0..tile_count {
            let record_count = read_count(r, "record count").map_err(io_err)?? as u32;
            let record_offset = read_count(r, "record offset").map_err(io_err)?? as u32;
            tiles.push(TileInfo {
                record_count,
                record_offset,
            });
        }

        let index = Self {
            format_version,
            record_area_start,
            level_start_ids,
            tiles,
        };
        index.validate()?;
        Ok(index)
    }

    /// Checks that the tiles partition the record area and the record area
    /// begins after the header.
    pub fn validate(&self) -> Result<()> {
        let header_len = encoded_len(self.level_count(), self.tile_count());
        if self.record_area_start < header_len {
            return Err(CatalogueError::format_mismatch(
                format!("record area after byte {}", header_len),
                format!("record area at byte {}", self.record_area_start),
            ));
        }
        if self.level_start_ids.first().is_some_and(|&s| s != 0)
            || self.level_start_ids.windows(2).any(|w| w[0] > w[1])
            || self
                .level_start_ids
                .last()
                .is_some_and(|&s| s as usize > self.tile_count())
        {
            return Err(CatalogueError::format_mismatch(
                "ascending level start ids",
                format!("{:?}", self.level_start_ids),
            ));
        }
        let mut expected_offset: u64 = 0;
        for (tile_id, tile) in self.tiles.iter().enumerate() {
            if tile.record_offset as u64 != expected_offset {
                return Err(CatalogueError::format_mismatch(
                    format!("tile {} at record {}", tile_id, expected_offset),
                    format!("tile {} at record {}", tile_id, tile.record_offset),
                ));
            }
            expected_offset += tile.record_count as u64;
        }
        Ok(())
    }
}

/// Size in bytes of a header for the given level and tile counts.
pub fn encoded_len(level_count: usize, tile_count: usize) -> u64 {
    FIXED_HEADER_SIZE + 4 * level_count as u64 + TILE_INFO_SIZE * tile_count as u64
}

fn read_count<R: Read>(r: &mut R, what: &str) -> io::Result<Result<usize>> {
    let value = r.read_i32::<LittleEndian>()?;
    Ok(if value < 0 {
        Err(CatalogueError::format_mismatch(
            format!("non-negative {}", what),
            value,
        ))
    } else {
        Ok(value as usize)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tiling::TilingLevel;
    use std::io::Cursor;

    fn three_tile_scheme() -> TilingScheme {
        TilingScheme::new(vec![
            TilingLevel::new(5.0, 1, 1),
            TilingLevel::new(8.0, 1, 2),
        ])
        .unwrap()
    }

    #[test]
    fn test_prefix_sum_offsets() {
        let index = TileIndex::from_counts(&three_tile_scheme(), &[2, 0, 5]).unwrap();
        let offsets: Vec<u32> = index.tiles.iter().map(|t| t.record_offset).collect();
        assert_eq!(offsets, vec![0, 2, 2]);
        assert_eq!(index.total_records(), 7);
        assert_eq!(index.level_start_ids, vec![0, 1]);
        assert_eq!(index.record_area_start, 20 + 8 + 24);
    }

    #[test]
    fn test_record_position() {
        let index = TileIndex::from_counts(&three_tile_scheme(), &[2, 0, 5]).unwrap();
        let tile = index.tile(2).unwrap();
        assert_eq!(
            index.record_position(tile, 1),
            index.record_area_start + 3 * RECORD_SIZE as u64
        );
        assert_eq!(index.file_len(), index.record_area_start + 7 * RECORD_SIZE as u64);
    }

    #[test]
    fn test_header_written_and_read_back() {
        let index = TileIndex::from_counts(&three_tile_scheme(), &[2, 0, 5]).unwrap();
        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, index.record_area_start);

        let read = TileIndex::read_from(&mut Cursor::new(&buf), Path::new("mem")).unwrap();
        assert_eq!(read, index);
    }

    #[test]
    fn test_version_mismatch_detected() {
        let index = TileIndex::from_counts(&three_tile_scheme(), &[1, 1, 1]).unwrap();
        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        buf[0..4].copy_from_slice(&2i32.to_le_bytes());

        let err = TileIndex::read_from(&mut Cursor::new(&buf), Path::new("mem")).unwrap_err();
        assert!(matches!(err, CatalogueError::FormatMismatch { .. }));
        assert!(err.is_stale_file());
    }

    #[test]
    fn test_truncated_header() {
        let index = TileIndex::from_counts(&three_tile_scheme(), &[1, 1, 1]).unwrap();
        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 3);

        let err = TileIndex::read_from(&mut Cursor::new(&buf), Path::new("mem")).unwrap_err();
        assert!(matches!(err, CatalogueError::Truncated { .. }));
    }

    #[test]
    fn test_gap_in_offsets_rejected() {
        let mut index = TileIndex::from_counts(&three_tile_scheme(), &[2, 0, 5]).unwrap();
        index.tiles[2].record_offset = 3;
        assert!(index.validate().is_err());
    }

    #[test]
    fn test_scheme_mismatch() {
        let index = TileIndex::from_counts(&three_tile_scheme(), &[2, 0, 5]).unwrap();
        assert!(index.check_scheme(&three_tile_scheme()).is_ok());
        let err = index.check_scheme(&TilingScheme::default()).unwrap_err();
        assert!(err.is_stale_file());
    }

    #[test]
    fn test_count_overflow_is_capacity_error() {
        let scheme = three_tile_scheme();
        let err = TileIndex::from_counts(&scheme, &[i32::MAX as u32, 1, 0]).unwrap_err();
        assert!(matches!(err, CatalogueError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_level_record_counts() {
        let index = TileIndex::from_counts(&three_tile_scheme(), &[2, 0, 5]).unwrap();
        assert_eq!(index.level_record_counts(), vec![2, 5]);
    }

    #[test]
    fn test_display() {
        let index = TileIndex::from_counts(&three_tile_scheme(), &[2, 0, 5]).unwrap();
        let output = format!("{}", index);
        assert!(output.contains("Format version: 3"));
        assert!(output.contains("Tiles: 3 (2 occupied)"));
        assert!(output.contains("Total records: 7"));
    }
}
