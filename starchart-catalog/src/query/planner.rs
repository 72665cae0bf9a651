//! Magnitude budget planning.
//!
//! A chart asks for between `min_objects` and `max_objects` objects. The
//! planner histograms the magnitudes of objects that actually land on the
//! chart, reading only tiles the viewport can see, and picks the faint
//! cutoff (`mag_min`) that keeps the count inside that band. It also raises
//! the bright end of the symbol-size scale (`mag_max`) when the field has
//! very few bright objects.
//!
//! Magnitudes follow the astronomical convention: larger is fainter.

use tracing::debug;

use super::selector::{levels_to_scan, visible_tiles};
use super::viewport::{SkyProjection, Viewport};
use crate::error::{CatalogueError, Result};
use crate::store::catalogue::CatalogueHandle;

/// Brightest magnitude the catalogue is assumed to hold.
pub const CATALOGUE_MAG_BRIGHTEST: f64 = -2.0;
/// Faintest magnitude a chart may request.
pub const CATALOGUE_MAG_FAINTEST: f64 = 14.0;
/// Upper bound on histogram length, whatever the step.
pub const MAX_HISTOGRAM_BINS: usize = 128;
/// Finest step whose histogram still spans the catalogue range.
pub const MIN_MAG_STEP: f64 =
    (CATALOGUE_MAG_FAINTEST - CATALOGUE_MAG_BRIGHTEST) / MAX_HISTOGRAM_BINS as f64;

/// Fewer objects than this brighter than a magnitude stretches the size scale.
const SPARSE_BRIGHT_COUNT: u64 = 4;
/// Slack on the object budgets while deciding how deep to read.
const LEVEL_SCAN_SLACK: u64 = 10;

/// What a chart asks the planner for.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeRequest {
    /// Initial faint limit.
    pub mag_min: f64,
    /// Initial bright end of the symbol-size scale.
    pub mag_max: f64,
    pub min_objects: u32,
    pub max_objects: u32,
    /// Histogram bin width, magnitudes.
    pub mag_step: f64,
}

impl Default for MagnitudeRequest {
    fn default() -> Self {
        Self {
            mag_min: 6.0,
            mag_max: 0.0,
            min_objects: 0,
            max_objects: 1693,
            mag_step: 0.5,
        }
    }
}

impl MagnitudeRequest {
    fn validate(&self) -> Result<()> {
        if !(self.mag_step.is_finite() && self.mag_step > 0.0) {
            return Err(CatalogueError::invalid_request(format!(
                "magnitude step must be positive, got {}",
                self.mag_step
            )));
        }
        if self.mag_step < MIN_MAG_STEP {
            return Err(CatalogueError::invalid_request(format!(
                "magnitude step {} is finer than {}, the histogram would not reach magnitude {}",
                self.mag_step, MIN_MAG_STEP, CATALOGUE_MAG_FAINTEST
            )));
        }
        if self.min_objects > self.max_objects {
            return Err(CatalogueError::invalid_request(format!(
                "min_objects {} exceeds max_objects {}",
                self.min_objects, self.max_objects
            )));
        }
        if self.mag_min.is_nan() || self.mag_max.is_nan() {
            return Err(CatalogueError::invalid_request("magnitude limits are NaN"));
        }
        Ok(())
    }

    /// Limits clamped into the catalogue's magnitude range.
    pub fn clamped(&self) -> MagnitudeLimits {
        let clamp = |m: f64| m.clamp(CATALOGUE_MAG_BRIGHTEST, CATALOGUE_MAG_FAINTEST);
        MagnitudeLimits {
            mag_min: clamp(self.mag_min),
            mag_max: clamp(self.mag_max),
        }
    }
}

/// Planner output.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeLimits {
    /// Faintest magnitude to draw.
    pub mag_min: f64,
    /// Magnitude drawn at the largest symbol size.
    pub mag_max: f64,
}

/// Object counts per magnitude interval, brightest bin first.
#[derive(Debug, Clone, PartialEq)]
pub struct MagnitudeHistogram {
    /// Bright edge of bin 0.
    pub brightest: f64,
    pub step: f64,
    pub counts: Vec<u64>,
}

impl MagnitudeHistogram {
    /// Empty histogram covering the catalogue range at the given step.
    pub fn new(step: f64) -> Self {
        let span = libm::floor((CATALOGUE_MAG_FAINTEST - CATALOGUE_MAG_BRIGHTEST) / step) as usize;
        Self {
            brightest: CATALOGUE_MAG_BRIGHTEST,
            step,
            counts: vec![0; (span + 1).min(MAX_HISTOGRAM_BINS)],
        }
    }

    pub fn from_counts(brightest: f64, step: f64, counts: Vec<u64>) -> Self {
        Self {
            brightest,
            step,
            counts,
        }
    }

    /// Bin for a magnitude. Brighter than bin 0 and fainter than the last
    /// bin are folded into the end bins.
    pub fn bin_of(&self, mag: f64) -> usize {
        let bin = libm::floor((mag - self.brightest) / self.step);
        if bin.is_nan() || bin < 0.0 {
            0
        } else {
            (bin as usize).min(self.counts.len().saturating_sub(1))
        }
    }

    pub fn add(&mut self, mag: f64) {
        if self.counts.is_empty() {
            return;
        }
        let bin = self.bin_of(mag);
        self.counts[bin] += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Bright edge of bin `k`.
    pub fn lower_edge(&self, k: usize) -> f64 {
        self.brightest + k as f64 * self.step
    }

    /// Faint edge of bin `k`.
    pub fn upper_edge(&self, k: usize) -> f64 {
        self.lower_edge(k) + self.step
    }
}

/// Walks the histogram from bright to faint and settles the limits.
///
/// `mag_min` is pushed out to the bright edge of every bin that starts while
/// fewer than `min_objects` have been counted. Once the running count passes
/// `max_objects`, `mag_min` is capped at the bright edge of the bin that
/// overflowed and the walk stops. `mag_max` moves to the faint edge of the
/// last bin by which fewer than four objects had been seen, if that is
/// fainter than the requested value.
pub fn limits_from_histogram(
    histogram: &MagnitudeHistogram,
    start: MagnitudeLimits,
    min_objects: u32,
    max_objects: u32,
) -> MagnitudeLimits {
    let mut mag_min = start.mag_min;
    let mut new_mag_max = histogram.brightest;
    let mut running = 0u64;

    for (k, &count) in histogram.counts.iter().enumerate() {
        let before = running;
        running += count;
        debug!(
            brighter_than = histogram.upper_edge(k),
            cumulative = running,
            "magnitude histogram"
        );

        if running < SPARSE_BRIGHT_COUNT {
            new_mag_max = histogram.upper_edge(k);
        }
        if before < min_objects as u64 && histogram.lower_edge(k) > mag_min {
            mag_min = histogram.lower_edge(k);
        }
        if running > max_objects as u64 {
            mag_min = mag_min.min(histogram.lower_edge(k));
            debug!(mag_min, cumulative = running, "truncating at object budget");
            break;
        }
    }

    MagnitudeLimits {
        mag_min,
        mag_max: start.mag_max.max(new_mag_max),
    }
}

/// Histograms the visible objects for a request.
///
/// Levels are read coarse to fine while they can still matter: the first
/// level always, later ones while the previous level stops short of the
/// requested faint limit or too few objects have been found, and never once
/// the count is well past `max_objects`.
pub fn build_histogram<P: SkyProjection>(
    handle: &mut CatalogueHandle,
    viewport: &Viewport<P>,
    request: &MagnitudeRequest,
) -> Result<MagnitudeHistogram> {
    request.validate()?;
    let start = request.clamped();
    let scheme = handle.tiling().clone();
    let mut histogram = MagnitudeHistogram::new(request.mag_step);
    let mut included = 0u64;

    for level in 0..scheme.level_count() {
        let needed = level == 0
            || scheme.level(level - 1).faintest_mag < start.mag_min
            || included < request.min_objects as u64 + LEVEL_SCAN_SLACK;
        if !needed || included >= request.max_objects as u64 + LEVEL_SCAN_SLACK {
            break;
        }

        for tile in visible_tiles(&scheme, level, viewport) {
            for record in handle.read_tile(tile.tile_id)? {
                if viewport.project_visible(record.ra, record.dec).is_none() {
                    continue;
                }
                histogram.add(record.mag);
                included += 1;
            }
        }
    }

    debug!(included, bins = histogram.counts.len(), "built magnitude histogram");
    Ok(histogram)
}

/// Chooses magnitude limits for a viewport.
pub fn plan<P: SkyProjection>(
    handle: &mut CatalogueHandle,
    viewport: &Viewport<P>,
    request: &MagnitudeRequest,
) -> Result<MagnitudeLimits> {
    let histogram = build_histogram(handle, viewport, request)?;
    Ok(limits_from_histogram(
        &histogram,
        request.clamped(),
        request.min_objects,
        request.max_objects,
    ))
}

/// What a chart will contain down to a faint limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSurvey {
    pub count: u64,
    /// `None` when the field is empty.
    pub brightest: Option<f64>,
    pub faintest: Option<f64>,
}

/// Counts the visible objects no fainter than `mag_min` and their magnitude
/// range, scanning tiles only as far as the limit.
pub fn survey<P: SkyProjection>(
    handle: &mut CatalogueHandle,
    viewport: &Viewport<P>,
    mag_min: f64,
) -> Result<FieldSurvey> {
    let scheme = handle.tiling().clone();
    let mut result = FieldSurvey {
        count: 0,
        brightest: None,
        faintest: None,
    };

    for level in levels_to_scan(&scheme, mag_min) {
        for tile in visible_tiles(&scheme, level, viewport) {
            for record in handle.scan_tile_to(tile.tile_id, mag_min)? {
                let record = record?;
                if viewport.project_visible(record.ra, record.dec).is_none() {
                    continue;
                }
                result.count += 1;
                result.brightest = Some(result.brightest.map_or(record.mag, |b| b.min(record.mag)));
                result.faintest = Some(result.faintest.map_or(record.mag, |f| f.max(record.mag)));
            }
        }
    }
    Ok(result)
}
