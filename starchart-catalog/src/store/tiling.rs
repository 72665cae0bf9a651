//! Magnitude-banded tiling hierarchy.
//!
//! The sky is cut into a stack of levels. Level 0 holds the brightest objects
//! on the coarsest grid; every later level is strictly fainter and at least as
//! finely divided. An object belongs to the first level whose faintest
//! magnitude is not brighter than its own, and within that level to the cell
//! holding its (RA, Dec).
//!
//! All bin arithmetic goes through [`TilingLevel::bin_of`] and
//! [`TilingLevel::tile_rect`], so the converter and the query side always
//! agree on tile boundaries.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::error::{CatalogueError, Result};

/// One resolution of the tiling hierarchy.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilingLevel {
    /// Faintest magnitude stored at this level.
    pub faintest_mag: f64,
    /// Number of cells along the RA axis.
    pub ra_bins: u32,
    /// Number of cells along the Dec axis.
    pub dec_bins: u32,
}

/// Angular extent of one tile, radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRect {
    pub ra_min: f64,
    pub ra_max: f64,
    pub dec_min: f64,
    pub dec_max: f64,
}

impl TileRect {
    /// Inclusive containment test, as used for tile/viewport intersection.
    pub fn contains(&self, ra: f64, dec: f64) -> bool {
        ra >= self.ra_min && ra <= self.ra_max && dec >= self.dec_min && dec <= self.dec_max
    }
}

impl TilingLevel {
    pub const fn new(faintest_mag: f64, ra_bins: u32, dec_bins: u32) -> Self {
        Self {
            faintest_mag,
            ra_bins,
            dec_bins,
        }
    }

    pub fn tile_count(&self) -> u32 {
        self.ra_bins * self.dec_bins
    }

    /// Grid cell holding (ra, dec). RA is wrapped into `[0, 2π)`; positions on
    /// the upper RA or Dec edge land in the last cell.
    pub fn bin_of(&self, ra: f64, dec: f64) -> (u32, u32) {
        let ra = ra.rem_euclid(TAU);
        let ra_bin = libm::floor(ra / TAU * self.ra_bins as f64);
        let dec_bin = libm::floor((dec / PI + 0.5) * self.dec_bins as f64);
        (
            clamp_bin(ra_bin, self.ra_bins),
            clamp_bin(dec_bin, self.dec_bins),
        )
    }

    /// Index of a cell within this level.
    pub fn tile_index(&self, ra_bin: u32, dec_bin: u32) -> u32 {
        dec_bin * self.ra_bins + ra_bin
    }

    /// Inverse of [`tile_index`](Self::tile_index).
    pub fn bins_of_index(&self, index: u32) -> (u32, u32) {
        (index % self.ra_bins, index / self.ra_bins)
    }

    /// Angular rectangle covered by a cell.
    pub fn tile_rect(&self, ra_bin: u32, dec_bin: u32) -> TileRect {
        let ra_width = TAU / self.ra_bins as f64;
        let dec_height = PI / self.dec_bins as f64;
        let ra_min = ra_bin as f64 * ra_width;
        let dec_min = (dec_bin as f64 / self.dec_bins as f64 - 0.5) * PI;
        // The last row and column end exactly on the pole and at 2π, where
        // clamped positions land.
        let ra_max = if ra_bin + 1 == self.ra_bins {
            TAU
        } else {
            ra_min + ra_width
        };
        let dec_max = if dec_bin + 1 == self.dec_bins {
            FRAC_PI_2
        } else {
            dec_min + dec_height
        };
        TileRect {
            ra_min,
            ra_max,
            dec_min,
            dec_max,
        }
    }
}

fn clamp_bin(bin: f64, bins: u32) -> u32 {
    if bin.is_nan() || bin < 0.0 {
        0
    } else {
        (bin as u32).min(bins.saturating_sub(1))
    }
}

/// Address of a tile: its level, grid cell and global id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub level: usize,
    pub ra_bin: u32,
    pub dec_bin: u32,
    pub tile_id: u32,
}

/// The ordered list of levels making up a catalogue's tiling.
///
/// Deserialized schemes go through [`TilingScheme::new`] and are rejected
/// the same way.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "TilingSchemeDef")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct TilingScheme {
    levels: Vec<TilingLevel>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct TilingSchemeDef {
    levels: Vec<TilingLevel>,
}

#[cfg(feature = "serde")]
impl TryFrom<TilingSchemeDef> for TilingScheme {
    type Error = CatalogueError;

    fn try_from(def: TilingSchemeDef) -> Result<Self> {
        Self::new(def.levels)
    }
}

impl TryFrom<Vec<TilingLevel>> for TilingScheme {
    type Error = CatalogueError;

    fn try_from(levels: Vec<TilingLevel>) -> Result<Self> {
        Self::new(levels)
    }
}

impl Default for TilingScheme {
    fn default() -> Self {
        Self {
            levels: vec![
                TilingLevel::new(6.5, 1, 1),
                TilingLevel::new(8.5, 5, 10),
                TilingLevel::new(10.2, 10, 20),
                TilingLevel::new(12.0, 20, 40),
                TilingLevel::new(13.0, 40, 80),
                TilingLevel::new(14.0, 80, 160),
            ],
        }
    }
}

impl TilingScheme {
    /// Builds a scheme, rejecting levels that are empty, not strictly
    /// fainter than their predecessor, or coarser than it.
    pub fn new(levels: Vec<TilingLevel>) -> Result<Self> {
        if levels.is_empty() {
            return Err(CatalogueError::invalid_tiling("no levels defined"));
        }
        for (i, level) in levels.iter().enumerate() {
            if level.ra_bins == 0 || level.dec_bins == 0 {
                return Err(CatalogueError::invalid_tiling(format!(
                    "level {} has an empty grid ({}×{})",
                    i, level.ra_bins, level.dec_bins
                )));
            }
            if !level.faintest_mag.is_finite() {
                return Err(CatalogueError::invalid_tiling(format!(
                    "level {} has a non-finite magnitude limit",
                    i
                )));
            }
            if i > 0 {
                let prev = &levels[i - 1];
                if level.faintest_mag <= prev.faintest_mag {
                    return Err(CatalogueError::invalid_tiling(format!(
                        "level {} (mag {}) is not fainter than level {} (mag {})",
                        i,
                        level.faintest_mag,
                        i - 1,
                        prev.faintest_mag
                    )));
                }
                if level.ra_bins < prev.ra_bins || level.dec_bins < prev.dec_bins {
                    return Err(CatalogueError::invalid_tiling(format!(
                        "level {} is coarser than level {}",
                        i,
                        i - 1
                    )));
                }
            }
        }
        let total: u64 = levels.iter().map(|l| l.ra_bins as u64 * l.dec_bins as u64).sum();
        if total > i32::MAX as u64 {
            return Err(CatalogueError::capacity("tiles per catalogue", i32::MAX as u64));
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[TilingLevel] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> &TilingLevel {
        &self.levels[level]
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Faintest magnitude stored anywhere in the catalogue.
    pub fn faintest_mag(&self) -> f64 {
        self.levels.last().map_or(f64::NEG_INFINITY, |l| l.faintest_mag)
    }

    /// Global tile id of the first tile of every level.
    pub fn level_start_ids(&self) -> Vec<u32> {
        let mut starts = Vec::with_capacity(self.levels.len());
        let mut next = 0;
        for level in &self.levels {
            starts.push(next);
            next += level.tile_count();
        }
        starts
    }

    pub fn total_tiles(&self) -> u32 {
        self.levels.iter().map(TilingLevel::tile_count).sum()
    }

    /// First (coarsest) level able to hold an object of magnitude `mag`.
    pub fn level_for_magnitude(&self, mag: f64) -> Option<usize> {
        self.levels.iter().position(|l| mag <= l.faintest_mag)
    }

    /// Where an object at (ra, dec, mag) is stored, or `None` when it is
    /// fainter than every level.
    pub fn locate(&self, ra: f64, dec: f64, mag: f64) -> Option<TileAddress> {
        let level = self.level_for_magnitude(mag)?;
        let (ra_bin, dec_bin) = self.levels[level].bin_of(ra, dec);
        Some(self.address(level, ra_bin, dec_bin))
    }

    pub fn address(&self, level: usize, ra_bin: u32, dec_bin: u32) -> TileAddress {
        let start: u32 = self.levels[..level].iter().map(TilingLevel::tile_count).sum();
        TileAddress {
            level,
            ra_bin,
            dec_bin,
            tile_id: start + self.levels[level].tile_index(ra_bin, dec_bin),
        }
    }

    /// Every tile of one level, in tile-id order.
    pub fn tiles_in_level(&self, level: usize) -> impl Iterator<Item = TileAddress> + '_ {
        let grid = self.levels[level];
        (0..grid.tile_count()).map(move |index| {
            let (ra_bin, dec_bin) = grid.bins_of_index(index);
            self.address(level, ra_bin, dec_bin)
        })
    }
}
