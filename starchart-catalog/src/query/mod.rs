//! Viewport queries over an open catalogue.
//!
//! - [`viewport`]: plot bounds, the projection collaborator, a reference projection
//! - [`selector`]: which tiles of a level a viewport can see
//! - [`planner`]: magnitude limits from an object budget, field survey

pub mod planner;
pub mod selector;
pub mod viewport;

pub use planner::{
    build_histogram, limits_from_histogram, plan, survey, FieldSurvey, MagnitudeHistogram,
    MagnitudeLimits, MagnitudeRequest,
};
pub use selector::{levels_to_scan, tile_intersects_viewport, visible_tiles};
pub use viewport::{Equirectangular, PlotBounds, SkyProjection, Viewport};
