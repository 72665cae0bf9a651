//! Which tiles a viewport can see.
//!
//! Projections are non-linear, so a tile's sky rectangle need not map to a
//! convex region of the chart. A tile is selected when any of these hold:
//!
//! 1. the field centre lies inside the tile;
//! 2. a corner of the plot area, inverse-projected, lies inside the tile;
//! 3. a corner of the tile, projected, lands finite and inside the plot area.
//!
//! This samples only corners and the centre. A tile that crosses the field
//! without containing any sample point (a thin tile passing between the
//! corners of a large field, say) is missed. Magnitude budgets and object
//! counts downstream are tuned against this sampling, so it is not an exact
//! polygon intersection.
//!
//! The field centre's RA is wrapped into `[0, 2π)` before the containment
//! test, like the inverse-projected corners. A centre given outside that
//! range (say `2π + 0.1`) therefore selects the tile holding its wrapped
//! position rather than no tile at all.

use std::f64::consts::TAU;
use std::ops::Range;

use super::viewport::{SkyProjection, Viewport};
use crate::store::tiling::{TileAddress, TileRect, TilingLevel, TilingScheme};

/// Tests whether one tile intersects the viewport.
pub fn tile_intersects_viewport<P: SkyProjection>(
    level: &TilingLevel,
    ra_bin: u32,
    dec_bin: u32,
    viewport: &Viewport<P>,
) -> bool {
    rect_intersects_viewport(&level.tile_rect(ra_bin, dec_bin), viewport)
}

/// Same test for an arbitrary sky rectangle.
pub fn rect_intersects_viewport<P: SkyProjection>(rect: &TileRect, viewport: &Viewport<P>) -> bool {
    if rect.contains(viewport.centre_ra.rem_euclid(TAU), viewport.centre_dec) {
        return true;
    }

    let field_corner_inside = viewport.bounds.corners().iter().any(|&(x, y)| {
        let (ra, dec) = viewport.projection.inverse_project(x, y);
        ra.is_finite() && dec.is_finite() && rect.contains(ra.rem_euclid(TAU), dec)
    });
    if field_corner_inside {
        return true;
    }

    [
        (rect.ra_min, rect.dec_min),
        (rect.ra_max, rect.dec_min),
        (rect.ra_min, rect.dec_max),
        (rect.ra_max, rect.dec_max),
    ]
    .iter()
    .any(|&(ra, dec)| {
        let (x, y) = viewport.projection.project(ra, dec);
        viewport.bounds.contains(x, y)
    })
}

/// Tiles of one level that intersect the viewport, in tile-id order.
pub fn visible_tiles<P: SkyProjection>(
    scheme: &TilingScheme,
    level: usize,
    viewport: &Viewport<P>,
) -> Vec<TileAddress> {
    let grid = scheme.level(level);
    scheme
        .tiles_in_level(level)
        .filter(|t| tile_intersects_viewport(grid, t.ra_bin, t.dec_bin, viewport))
        .collect()
}

/// Levels that can hold objects at least as bright as `mag_limit`: level 0,
/// then every level whose predecessor stops short of the limit.
pub fn levels_to_scan(scheme: &TilingScheme, mag_limit: f64) -> Range<usize> {
    let levels = scheme.levels();
    let end = (1..levels.len())
        .find(|&i| levels[i - 1].faintest_mag >= mag_limit)
        .unwrap_or(levels.len());
    0..end
}
