//! Converts a text source into a tile-indexed binary catalogue.
//!
//! Two streaming passes over the source, so the catalogue never has to fit
//! in memory:
//! 1. Count records per tile and lay the tiles out by prefix sum
//! 2. Scatter every record to its slot in a memory-mapped output file
//!
//! Records keep their source order within a tile. The source must already be
//! sorted by magnitude for tiles to come out brightest first; the converter
//! only warns when it is not.

use memmap2::MmapMut;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::header::TileIndex;
use super::record::RECORD_SIZE;
use super::source::SourceRecords;
use super::tiling::TilingScheme;
use crate::error::{CatalogueError, Result};

/// Outcome of a rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildStats {
    pub records_written: u64,
    /// Records fainter than the faintest tiling level.
    pub too_faint: u64,
    pub malformed_lines: u64,
    /// Tiles whose records were not in non-decreasing magnitude order.
    pub unsorted_tiles: u64,
    pub tile_count: u32,
    pub empty_tiles: u32,
    pub max_tile_records: u32,
    pub file_size: u64,
    pub elapsed_secs: f64,
}

/// Rebuilds `output` from `source`. The file is written under a temporary
/// name and renamed into place only once complete.
pub fn rebuild(source: &Path, output: &Path, scheme: &TilingScheme) -> Result<RebuildStats> {
    let start = Instant::now();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CatalogueError::io(parent, e))?;
    }
    info!(
        source = %source.display(),
        output = %output.display(),
        levels = scheme.level_count(),
        tiles = scheme.total_tiles(),
        "rebuilding binary catalogue"
    );

    let (counts, too_faint, malformed_lines) = count_records_per_tile(source, scheme)?;
    let index = TileIndex::from_counts(scheme, &counts)?;
    info!(
        records = index.total_records(),
        too_faint,
        malformed_lines,
        "pass 1 complete: counted records per tile"
    );

    let temp_path = temp_path_for(output);
    let unsorted_tiles = match scatter_records(source, &temp_path, scheme, &index) {
        Ok(unsorted) => unsorted,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };
    fs::rename(&temp_path, output).map_err(|e| CatalogueError::io(output, e))?;
    info!("pass 2 complete: scattered records to tiles");

    let stats = RebuildStats {
        records_written: index.total_records(),
        too_faint,
        malformed_lines,
        unsorted_tiles,
        tile_count: counts.len() as u32,
        empty_tiles: counts.iter().filter(|&&c| c == 0).count() as u32,
        max_tile_records: counts.iter().copied().max().unwrap_or(0),
        file_size: index.file_len(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    info!(
        records = stats.records_written,
        empty_tiles = stats.empty_tiles,
        max_tile_records = stats.max_tile_records,
        file_size = stats.file_size,
        elapsed_secs = stats.elapsed_secs,
        "binary catalogue rebuilt"
    );
    Ok(stats)
}

fn temp_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn count_records_per_tile(source: &Path, scheme: &TilingScheme) -> Result<(Vec<u32>, u64, u64)> {
    let mut counts = vec![0u32; scheme.total_tiles() as usize];
    let mut too_faint = 0u64;
    let mut records = SourceRecords::open(source)?;
    for record in records.by_ref() {
        let record = record?;
        match scheme.locate(record.ra, record.dec, record.mag) {
            Some(addr) => {
                let count = &mut counts[addr.tile_id as usize];
                if *count >= i32::MAX as u32 {
                    return Err(CatalogueError::capacity(
                        "records per tile",
                        i32::MAX as u64,
                    ));
                }
                *count += 1;
            }
            None => too_faint += 1,
        }
    }
    if too_faint > 0 {
        debug!(too_faint, "dropped records fainter than every tiling level");
    }
    Ok((counts, too_faint, records.skipped()))
}

fn scatter_records(
    source: &Path,
    temp_path: &Path,
    scheme: &TilingScheme,
    index: &TileIndex,
) -> Result<u64> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| CatalogueError::io(temp_path, e))?;
    file.set_len(index.file_len())
        .map_err(|e| CatalogueError::io(temp_path, e))?;
    let mut mmap =
        unsafe { MmapMut::map_mut(&file) }.map_err(|e| CatalogueError::io(temp_path, e))?;

    let mut header = &mut mmap[..index.record_area_start as usize];
    index
        .write_to(&mut header)
        .map_err(|e| CatalogueError::io(temp_path, e))?;

    let mut written = vec![0u32; index.tile_count()];
    let mut faintest_so_far = vec![f64::NEG_INFINITY; index.tile_count()];
    let mut unsorted = vec![false; index.tile_count()];

    for record in SourceRecords::open(source)? {
        let record = record?;
        let Some(addr) = scheme.locate(record.ra, record.dec, record.mag) else {
            continue;
        };
        let tile = addr.tile_id as usize;
        let info = index.tile(addr.tile_id)?;
        if written[tile] >= info.record_count {
            return Err(CatalogueError::SourceChanged {
                tile_id: addr.tile_id,
                expected: info.record_count,
            });
        }

        if record.mag < faintest_so_far[tile] && !unsorted[tile] {
            unsorted[tile] = true;
            warn!(
                tile_id = addr.tile_id,
                mag = record.mag,
                previous = faintest_so_far[tile],
                "tile records not in magnitude order"
            );
        }
        faintest_so_far[tile] = faintest_so_far[tile].max(record.mag);

        let pos = index.record_position(info, written[tile]) as usize;
        record.encode(&mut mmap[pos..pos + RECORD_SIZE]);
        written[tile] += 1;
    }

    if let Some((tile_id, info)) = index
        .tiles
        .iter()
        .enumerate()
        .find(|(i, info)| written[*i] != info.record_count)
    {
        return Err(CatalogueError::SourceChanged {
            tile_id: tile_id as u32,
            expected: info.record_count,
        });
    }

    mmap.flush().map_err(|e| CatalogueError::io(temp_path, e))?;
    Ok(unsorted.iter().filter(|&&u| u).count() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::header::FORMAT_VERSION;
    use crate::store::record::CatalogueRecord;
    use crate::store::tiling::TilingLevel;
    use std::fs::File;
    use std::io::{BufReader, Seek, SeekFrom};

    fn two_level_scheme() -> TilingScheme {
        TilingScheme::new(vec![
            TilingLevel::new(5.0, 1, 1),
            TilingLevel::new(8.0, 2, 2),
        ])
        .unwrap()
    }

    #[test]
    fn test_rebuild_writes_header_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("stars.txt");
        let output = dir.path().join("stars.bin");
        fs::write(
            &source,
            "- - 1 10.0 10.0 1.0 - - -\n\
             - - 2 200.0 -10.0 6.0 - - -\n\
             - - 3 10.0 10.0 7.5 - - -\n\
             - - 4 10.0 10.0 9.0 - - -\n",
        )
        .unwrap();

        let stats = rebuild(&source, &output, &two_level_scheme()).unwrap();
        assert_eq!(stats.records_written, 3);
        assert_eq!(stats.too_faint, 1);
        assert_eq!(stats.tile_count, 5);
        assert_eq!(stats.unsorted_tiles, 0);
        assert!(!temp_path_for(&output).exists());

        let mut file = BufReader::new(File::open(&output).unwrap());
        let index = TileIndex::read_from(&mut file, &output).unwrap();
        assert_eq!(index.format_version, FORMAT_VERSION);
        assert_eq!(index.file_len(), fs::metadata(&output).unwrap().len());

        // ra 10°, dec +10° lands in the first RA column and upper Dec row
        let info = index.tile(1 + 2).unwrap();
        assert_eq!(info.record_count, 1);
        let mut buf = [0u8; RECORD_SIZE];
        let mut file = file.into_inner();
        file.seek(SeekFrom::Start(index.record_position(info, 0))).unwrap();
        std::io::Read::read_exact(&mut file, &mut buf).unwrap();
        assert_eq!(CatalogueRecord::decode(&buf).hip_number, 3);
    }

    #[test]
    fn test_unsorted_source_is_warned_not_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("stars.txt");
        let output = dir.path().join("stars.bin");
        fs::write(&source, "- - 1 10.0 10.0 4.0 - - -\n- - 2 11.0 10.0 2.0 - - -\n").unwrap();

        let stats = rebuild(&source, &output, &two_level_scheme()).unwrap();
        assert_eq!(stats.unsorted_tiles, 1);
    }

    #[test]
    fn test_missing_source_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("stars.bin");
        let err = rebuild(&dir.path().join("missing.txt"), &output, &two_level_scheme())
            .unwrap_err();
        assert!(matches!(err, CatalogueError::Io { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path_for(Path::new("/data/stars.bin")),
            PathBuf::from("/data/stars.bin.tmp")
        );
    }
}
