//! Field of view and the projection collaborator.
//!
//! The catalogue never does coordinate-system math itself. Charts supply a
//! [`SkyProjection`] mapping (RA, Dec) to plot coordinates and back; the
//! [`Equirectangular`] projection here is a minimal reference used by tests
//! and the maintenance tool.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Forward and inverse mapping between sky and plot coordinates.
///
/// Points that cannot be projected map to non-finite coordinates.
pub trait SkyProjection {
    fn project(&self, ra: f64, dec: f64) -> (f64, f64);
    fn inverse_project(&self, x: f64, y: f64) -> (f64, f64);
}

impl<P: SkyProjection + ?Sized> SkyProjection for &P {
    fn project(&self, ra: f64, dec: f64) -> (f64, f64) {
        (**self).project(ra, dec)
    }

    fn inverse_project(&self, x: f64, y: f64) -> (f64, f64) {
        (**self).inverse_project(x, y)
    }
}

/// Axis-aligned plot-coordinate rectangle of the chart area.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PlotBounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Inclusive test; non-finite points are never inside.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x.is_finite()
            && y.is_finite()
            && x >= self.x_min
            && x <= self.x_max
            && y >= self.y_min
            && y <= self.y_max
    }

    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.x_min, self.y_min),
            (self.x_max, self.y_min),
            (self.x_min, self.y_max),
            (self.x_max, self.y_max),
        ]
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// What a chart displays: plot bounds, the sky position at their centre and
/// the projection between the two.
#[derive(Debug, Clone)]
pub struct Viewport<P> {
    pub bounds: PlotBounds,
    /// Right ascension of the field centre, radians.
    pub centre_ra: f64,
    /// Declination of the field centre, radians.
    pub centre_dec: f64,
    pub projection: P,
}

impl<P: SkyProjection> Viewport<P> {
    pub fn new(bounds: PlotBounds, centre_ra: f64, centre_dec: f64, projection: P) -> Self {
        Self {
            bounds,
            centre_ra,
            centre_dec,
            projection,
        }
    }

    /// Plot position of a sky position, or `None` if it falls off the chart.
    pub fn project_visible(&self, ra: f64, dec: f64) -> Option<(f64, f64)> {
        let (x, y) = self.projection.project(ra, dec);
        self.bounds.contains(x, y).then_some((x, y))
    }
}

impl Viewport<Equirectangular> {
    /// Equirectangular field of the given half-extents (radians) around a centre.
    pub fn equirectangular(centre_ra: f64, centre_dec: f64, half_width: f64, half_height: f64) -> Self {
        Self::new(
            PlotBounds::new(-half_width, half_width, -half_height, half_height),
            centre_ra,
            centre_dec,
            Equirectangular::new(centre_ra, centre_dec),
        )
    }
}

/// Plate carrée projection centred on (ra0, dec0).
///
/// `x` is the RA offset wrapped into `(-π, π]`, `y` the Dec offset, both in
/// radians.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    pub ra0: f64,
    pub dec0: f64,
}

impl Equirectangular {
    pub fn new(ra0: f64, dec0: f64) -> Self {
        Self { ra0, dec0 }
    }
}

impl SkyProjection for Equirectangular {
    fn project(&self, ra: f64, dec: f64) -> (f64, f64) {
        let mut x = (ra - self.ra0).rem_euclid(TAU);
        if x > PI {
            x -= TAU;
        }
        (x, dec - self.dec0)
    }

    fn inverse_project(&self, x: f64, y: f64) -> (f64, f64) {
        let dec = y + self.dec0;
        if !dec.is_finite() || dec.abs() > FRAC_PI_2 {
            return (f64::NAN, f64::NAN);
        }
        ((x + self.ra0).rem_euclid(TAU), dec)
    }
}
