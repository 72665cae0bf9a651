//! Catalogue store: owns the binary file, rebuilds it when stale, and reads
//! tiles back in brightness order.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::builder::{self, RebuildStats};
use super::header::TileIndex;
use super::record::{CatalogueRecord, RECORD_SIZE};
use super::tiling::TilingScheme;
use crate::error::{CatalogueError, Result};

/// Where a catalogue lives and how it is tiled.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueConfig {
    /// Text source, optionally gzipped.
    pub source_path: PathBuf,
    /// Tile-indexed binary file, created from the source on demand.
    pub binary_path: PathBuf,
    pub tiling: TilingScheme,
}

impl CatalogueConfig {
    pub fn new(source_path: impl Into<PathBuf>, binary_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            binary_path: binary_path.into(),
            tiling: TilingScheme::default(),
        }
    }

    pub fn with_tiling(mut self, tiling: TilingScheme) -> Self {
        self.tiling = tiling;
        self
    }
}

/// Entry point for catalogue access.
#[derive(Debug, Clone)]
pub struct CatalogueStore {
    config: CatalogueConfig,
}

impl CatalogueStore {
    pub fn new(config: CatalogueConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CatalogueConfig {
        &self.config
    }

    /// Opens the binary catalogue, rebuilding it first if it is missing,
    /// truncated, of another format version or tiled differently.
    ///
    /// # Errors
    /// Returns [`CatalogueError::RebuildFailed`] if the freshly rebuilt file
    /// still cannot be opened, and propagates I/O errors from the source.
    pub fn open(&self) -> Result<CatalogueHandle> {
        match self.open_existing() {
            Ok(handle) => Ok(handle),
            Err(e) if e.is_stale_file() => {
                info!(
                    path = %self.config.binary_path.display(),
                    reason = %e,
                    "binary catalogue unusable, rebuilding"
                );
                self.rebuild()?;
                self.open_existing().map_err(|e| {
                    CatalogueError::rebuild_failed(&self.config.binary_path, e.to_string())
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Unconditionally regenerates the binary file from the text source.
    pub fn rebuild(&self) -> Result<RebuildStats> {
        builder::rebuild(
            &self.config.source_path,
            &self.config.binary_path,
            &self.config.tiling,
        )
    }

    /// Opens the binary file without any rebuild attempt.
    pub fn open_existing(&self) -> Result<CatalogueHandle> {
        let path = &self.config.binary_path;
        let file = File::open(path).map_err(|e| CatalogueError::io(path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| CatalogueError::io(path, e))?
            .len();
        let mut reader = BufReader::new(file);
        let index = TileIndex::read_from(&mut reader, path)?;
        index.check_scheme(&self.config.tiling)?;
        if file_len < index.file_len() {
            return Err(CatalogueError::truncated(format!(
                "{} bytes, header describes {}",
                file_len,
                index.file_len()
            )));
        }
        debug!(
            path = %path.display(),
            records = index.total_records(),
            tiles = index.tile_count(),
            "opened binary catalogue"
        );
        Ok(CatalogueHandle {
            reader,
            path: path.clone(),
            index,
            tiling: self.config.tiling.clone(),
        })
    }
}

/// Open catalogue file. Reads seek the single underlying file, so a handle
/// must not be shared between concurrent readers.
#[derive(Debug)]
pub struct CatalogueHandle {
    reader: BufReader<File>,
    path: PathBuf,
    index: TileIndex,
    tiling: TilingScheme,
}

impl CatalogueHandle {
    pub fn index(&self) -> &TileIndex {
        &self.index
    }

    pub fn tiling(&self) -> &TilingScheme {
        &self.tiling
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the header from disk.
    pub fn read_header(&mut self) -> Result<TileIndex> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| CatalogueError::io(&self.path, e))?;
        TileIndex::read_from(&mut self.reader, &self.path)
    }

    /// All records of a tile, brightest first.
    pub fn read_tile(&mut self, tile_id: u32) -> Result<Vec<CatalogueRecord>> {
        let info = self.index.tile(tile_id)?;
        if info.record_count == 0 {
            return Ok(Vec::new());
        }
        self.seek_to(self.index.record_position(info, 0))?;
        let mut buf = vec![0u8; info.record_count as usize * RECORD_SIZE];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| CatalogueError::io(&self.path, e))?;
        Ok(buf.chunks_exact(RECORD_SIZE).map(CatalogueRecord::decode).collect())
    }

    /// Lazily reads a tile, brightest first.
    pub fn scan_tile(&mut self, tile_id: u32) -> Result<TileScan<'_>> {
        self.scan_tile_to(tile_id, f64::INFINITY)
    }

    /// Lazily reads a tile, stopping at the first record fainter than
    /// `mag_limit` without decoding it.
    pub fn scan_tile_to(&mut self, tile_id: u32, mag_limit: f64) -> Result<TileScan<'_>> {
        let info = self.index.tile(tile_id)?;
        if info.record_count > 0 {
            self.seek_to(self.index.record_position(info, 0))?;
        }
        Ok(TileScan {
            handle: self,
            remaining: info.record_count,
            mag_limit,
            buf: [0u8; RECORD_SIZE],
        })
    }

    fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(pos))
            .map_err(|e| CatalogueError::io(&self.path, e))?;
        Ok(())
    }
}

/// Iterator returned by [`CatalogueHandle::scan_tile`].
pub struct TileScan<'a> {
    handle: &'a mut CatalogueHandle,
    remaining: u32,
    mag_limit: f64,
    buf: [u8; RECORD_SIZE],
}

impl Iterator for TileScan<'_> {
    type Item = Result<CatalogueRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if let Err(e) = self.handle.reader.read_exact(&mut self.buf) {
            self.remaining = 0;
            return Some(Err(CatalogueError::io(&self.handle.path, e)));
        }
        self.remaining -= 1;
        if CatalogueRecord::peek_mag(&self.buf) > self.mag_limit {
            self.remaining = 0;
            return None;
        }
        Some(Ok(CatalogueRecord::decode(&self.buf)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::header::FORMAT_VERSION;
    use crate::store::tiling::TilingLevel;
    use std::fs;

    fn scheme() -> TilingScheme {
        TilingScheme::new(vec![
            TilingLevel::new(5.0, 1, 1),
            TilingLevel::new(8.0, 2, 2),
        ])
        .unwrap()
    }

    fn store_with_source(dir: &Path, lines: &str) -> CatalogueStore {
        let source = dir.join("stars.txt");
        fs::write(&source, lines).unwrap();
        CatalogueStore::new(
            CatalogueConfig::new(source, dir.join("stars.bin")).with_tiling(scheme()),
        )
    }

    const SOURCE: &str = "- - 1 10.0 10.0 1.0 - - -\n\
                          - - 2 20.0 20.0 2.5 - - -\n\
                          - - 3 30.0 30.0 4.0 - - -\n\
                          - - 4 10.0 10.0 7.5 - - -\n";

    #[test]
    fn test_open_builds_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_source(dir.path(), SOURCE);
        assert!(!store.config().binary_path.exists());

        let mut handle = store.open().unwrap();
        assert_eq!(handle.index().total_records(), 4);
        let tile = handle.read_tile(0).unwrap();
        let mags: Vec<f64> = tile.iter().map(|r| r.mag).collect();
        assert_eq!(mags, vec![1.0, 2.5, 4.0]);
    }

    #[test]
    fn test_open_rebuilds_on_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_source(dir.path(), SOURCE);
        store.open().unwrap();

        let path = &store.config().binary_path;
        let mut bytes = fs::read(path).unwrap();
        bytes[0..4].copy_from_slice(&(FORMAT_VERSION - 1).to_le_bytes());
        fs::write(path, &bytes).unwrap();
        assert!(store.open_existing().unwrap_err().is_stale_file());

        let mut handle = store.open().unwrap();
        assert_eq!(handle.read_header().unwrap().format_version, FORMAT_VERSION);
    }

    #[test]
    fn test_open_rebuilds_on_scheme_change() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_source(dir.path(), SOURCE);
        store.open().unwrap();

        let retiled = CatalogueStore::new(store.config().clone().with_tiling(
            TilingScheme::new(vec![TilingLevel::new(8.0, 1, 1)]).unwrap(),
        ));
        let handle = retiled.open().unwrap();
        assert_eq!(handle.index().tile_count(), 1);
        assert_eq!(handle.index().total_records(), 4);
    }

    #[test]
    fn test_open_rebuilds_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_source(dir.path(), SOURCE);
        store.open().unwrap();

        let path = &store.config().binary_path;
        let bytes = fs::read(path).unwrap();
        fs::write(path, &bytes[..bytes.len() - 10]).unwrap();

        let handle = store.open().unwrap();
        assert_eq!(handle.index().total_records(), 4);
        assert_eq!(fs::metadata(path).unwrap().len(), bytes.len() as u64);
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogueStore::new(CatalogueConfig::new(
            dir.path().join("absent.txt"),
            dir.path().join("absent.bin"),
        ));
        let err = store.open().unwrap_err();
        assert!(matches!(err, CatalogueError::Io { .. }));
    }

    #[test]
    fn test_scan_tile_stops_at_mag_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_source(dir.path(), SOURCE);
        let mut handle = store.open().unwrap();

        let scanned: Vec<f64> = handle
            .scan_tile_to(0, 2.5)
            .unwrap()
            .map(|r| r.unwrap().mag)
            .collect();
        assert_eq!(scanned, vec![1.0, 2.5]);

        let all = handle.scan_tile(0).unwrap().count();
        assert_eq!(all, 3);
    }

    #[test]
    fn test_read_tile_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_source(dir.path(), SOURCE);
        let mut handle = store.open().unwrap();
        let err = handle.read_tile(99).unwrap_err();
        assert!(matches!(
            err,
            CatalogueError::TileOutOfRange {
                tile_id: 99,
                tile_count: 5
            }
        ));
    }

    #[test]
    fn test_empty_tile_reads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_source(dir.path(), SOURCE);
        let mut handle = store.open().unwrap();
        assert!(handle.read_tile(1).unwrap().is_empty());
        assert_eq!(handle.scan_tile(1).unwrap().count(), 0);
    }
}
