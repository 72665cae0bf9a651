//! Symbol drawing and collision-avoiding label placement for star charts.
//!
//! Objects read from a [`starchart_catalog`] store are drawn as symbols
//! whose size follows their brightness. Every symbol reserves its footprint
//! in an [`ExclusionRegistry`], and every label is queued in a
//! [`LabelEngine`] and placed afterwards in priority order, so the
//! brightest objects claim space first and no label covers a symbol or
//! another label.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`geometry`] | [`Rect`] exclusion regions, [`PlotFrame`] plot/canvas mapping |
//! | [`backend`] | [`DrawingBackend`] and [`TextMeasurer`] collaborators |
//! | [`exclusion`] | [`ExclusionRegistry`] |
//! | [`labels`] | [`LabelRequest`], [`LabelEngine`] |
//! | [`objects`] | [`ObjectRenderer`], symbol sizing, label settings |
//!
//! # Rendering a chart
//!
//! ```ignore
//! let limits = plan(&mut handle, &viewport, &MagnitudeRequest::default())?;
//! let frame = PlotFrame::new(viewport.bounds, 1600.0, 1200.0, 200.0);
//! let mut engine = LabelEngine::new(frame);
//!
//! let renderer = ObjectRenderer::default();
//! renderer.render(&mut handle, &viewport, &limits, &mut engine, &mut backend)?;
//! engine.flush(&mut backend)?;
//! // tick labels go through engine.place_now(..) here
//! engine.reset();
//! ```
//!
//! # Features
//!
//! - **`serde`** — Serialize/deserialize settings and geometry types.

pub mod backend;
pub mod error;
pub mod exclusion;
pub mod geometry;
pub mod labels;
pub mod objects;

pub use backend::{Colour, DrawingBackend, FontSpec, FontStyle, FontWeight, TextExtents, TextMeasurer};
pub use error::{RenderError, Result};
pub use exclusion::ExclusionRegistry;
pub use geometry::{PlotFrame, Rect};
pub use labels::{HAlign, LabelEngine, LabelPhase, LabelPosition, LabelRequest, PlacementSummary, VAlign};
pub use objects::{ObjectRenderer, RenderSummary, StarLabelSettings, SymbolSettings};
