//! Priority-ordered label placement.
//!
//! Labels are collected while a chart's objects are drawn and placed in one
//! pass afterwards, most important first, so that a crowded patch of faint
//! objects cannot take the space a bright object's name needs. Each label
//! offers candidate positions in order of preference; the first one that
//! stays on the chart and clears every exclusion region wins, and a label
//! with no surviving candidate is dropped.
//!
//! ```text
//! Buffering --flush--> Placing --> Drained --reset--> Buffering
//! ```
//!
//! After [`LabelEngine::flush`] the exclusion registry keeps the placed
//! boxes, so annotations drawn later with [`LabelEngine::place_now`] (axis
//! ticks, cardinal points) still avoid them.

use std::f64::consts::PI;

use tracing::debug;

use crate::backend::{Colour, DrawingBackend, FontSpec, TextMeasurer};
use crate::error::{RenderError, Result};
use crate::exclusion::{ExclusionRegistry, DEFAULT_EXCLUSION_CAPACITY};
use crate::geometry::{PlotFrame, Rect};

pub const DEFAULT_LABEL_CAPACITY: usize = 65_536;

/// Margin around a label, as a fraction of its size, when it shares its
/// object with other labels.
const MULTIPLE_LABEL_MARGIN: f64 = 0.01;
const SINGLE_LABEL_MARGIN: f64 = 0.07;
/// Vertical margins are this much larger than horizontal ones.
const VERTICAL_MARGIN_FACTOR: f64 = 2.3;

/// Radius of the circle the halo copies are drawn around, mm.
const HALO_OFFSET_MM: f64 = 0.2;
const HALO_COPIES: u32 = 12;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    /// Text starts at the anchor.
    Left,
    Centre,
    /// Text ends at the anchor.
    Right,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// One candidate position: a plot-space anchor, the text alignment relative
/// to it, and a pixel offset applied after alignment.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPosition {
    pub x: f64,
    pub y: f64,
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl LabelPosition {
    pub fn new(x: f64, y: f64, h_align: HAlign, v_align: VAlign) -> Self {
        Self {
            x,
            y,
            h_align,
            v_align,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn with_offset(mut self, offset_x: f64, offset_y: f64) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.offset_x.is_finite() && self.offset_y.is_finite()
    }
}

/// A label waiting to be placed.
///
/// `priority` orders placement, lowest first. Labels with `priority >= 0`
/// must fit on the chart without covering anything; labels with
/// `priority >= -1` reserve their box once placed. Anything lower is drawn
/// unconditionally and leaves no trace in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRequest {
    pub text: String,
    pub colour: Colour,
    pub positions: Vec<LabelPosition>,
    /// The object carries several labels; they pack with a tighter margin.
    pub multiple_labels: bool,
    pub font: FontSpec,
    /// Extra margin, as a multiple of the default.
    pub extra_margin: f64,
    pub priority: f64,
    /// Halo colour drawn behind the text, if any.
    pub background: Option<Colour>,
}

impl LabelRequest {
    pub fn new(text: impl Into<String>, colour: Colour, font: FontSpec, priority: f64) -> Self {
        Self {
            text: text.into(),
            colour,
            positions: Vec::new(),
            multiple_labels: false,
            font,
            extra_margin: 0.0,
            priority,
            background: None,
        }
    }

    pub fn with_position(mut self, position: LabelPosition) -> Self {
        self.positions.push(position);
        self
    }

    pub fn with_positions(mut self, positions: impl IntoIterator<Item = LabelPosition>) -> Self {
        self.positions.extend(positions);
        self
    }

    pub fn multiple(mut self, multiple_labels: bool) -> Self {
        self.multiple_labels = multiple_labels;
        self
    }

    pub fn with_extra_margin(mut self, extra_margin: f64) -> Self {
        self.extra_margin = extra_margin;
        self
    }

    pub fn with_background(mut self, background: Colour) -> Self {
        self.background = Some(background);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPhase {
    Buffering,
    Placing,
    Drained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlacementSummary {
    pub placed: usize,
    pub dropped: usize,
}

/// Where an accepted candidate goes.
#[derive(Debug, Clone, Copy)]
struct Placement {
    origin_x: f64,
    origin_y: f64,
    footprint: Rect,
}

/// Label buffer and exclusion registry for one chart at a time.
#[derive(Debug, Clone)]
pub struct LabelEngine {
    frame: PlotFrame,
    registry: ExclusionRegistry,
    buffer: Vec<LabelRequest>,
    capacity: usize,
    phase: LabelPhase,
}

impl LabelEngine {
    pub fn new(frame: PlotFrame) -> Self {
        Self::with_capacities(frame, DEFAULT_LABEL_CAPACITY, DEFAULT_EXCLUSION_CAPACITY)
    }

    pub fn with_capacities(frame: PlotFrame, labels: usize, regions: usize) -> Self {
        Self {
            frame,
            registry: ExclusionRegistry::with_capacity(regions),
            buffer: Vec::new(),
            capacity: labels,
            phase: LabelPhase::Buffering,
        }
    }

    pub fn frame(&self) -> &PlotFrame {
        &self.frame
    }

    pub fn registry(&self) -> &ExclusionRegistry {
        &self.registry
    }

    /// Direct access for symbols and other drawn marks that must block labels.
    pub fn registry_mut(&mut self) -> &mut ExclusionRegistry {
        &mut self.registry
    }

    pub fn phase(&self) -> LabelPhase {
        self.phase
    }

    /// Requests waiting for [`flush`](Self::flush).
    pub fn pending(&self) -> &[LabelRequest] {
        &self.buffer
    }

    /// Queues a label. No geometry is evaluated until the flush.
    pub fn submit(&mut self, request: LabelRequest) -> Result<()> {
        if self.phase != LabelPhase::Buffering {
            return Err(RenderError::LabelsAlreadyPlaced);
        }
        if self.buffer.len() >= self.capacity {
            return Err(RenderError::LabelCapacity { limit: self.capacity });
        }
        self.buffer.push(request);
        Ok(())
    }

    /// Places every buffered label in ascending priority order and draws
    /// the ones that fit. Requests of equal priority keep submission order.
    ///
    /// An `Err` (the registry filling up) stops placement part way: labels
    /// not yet placed are discarded and the engine stays in
    /// [`LabelPhase::Placing`] until [`reset`](Self::reset).
    pub fn flush<B: DrawingBackend>(&mut self, backend: &mut B) -> Result<PlacementSummary> {
        if self.phase != LabelPhase::Buffering {
            return Err(RenderError::LabelsAlreadyPlaced);
        }
        self.phase = LabelPhase::Placing;

        let mut requests = std::mem::take(&mut self.buffer);
        requests.sort_by(|a, b| a.priority.total_cmp(&b.priority));

        let mut summary = PlacementSummary::default();
        for request in &requests {
            if self.place(backend, request)? {
                summary.placed += 1;
            } else {
                summary.dropped += 1;
            }
        }

        self.phase = LabelPhase::Drained;
        debug!(
            placed = summary.placed,
            dropped = summary.dropped,
            regions = self.registry.len(),
            "placed buffered labels"
        );
        Ok(summary)
    }

    /// Places and draws one label immediately, against whatever the
    /// registry holds now. Returns whether it was drawn.
    pub fn place_now<B: DrawingBackend>(&mut self, backend: &mut B, request: &LabelRequest) -> Result<bool> {
        self.place(backend, request)
    }

    /// Forgets buffered labels and every exclusion region, ready for the
    /// next chart.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.registry.clear();
        self.phase = LabelPhase::Buffering;
    }

    fn place<B: DrawingBackend>(&mut self, backend: &mut B, request: &LabelRequest) -> Result<bool> {
        let Some(placement) = self.choose_position(&*backend, request) else {
            return Ok(false);
        };

        if request.priority >= -1.0 {
            self.registry.add(placement.footprint)?;
        }

        if let Some(background) = request.background {
            let offset = self.frame.mm(HALO_OFFSET_MM);
            for k in 0..HALO_COPIES {
                let theta = k as f64 * 2.0 * PI / HALO_COPIES as f64;
                backend.draw_text(
                    &request.text,
                    placement.origin_x + offset * theta.sin(),
                    placement.origin_y + offset * theta.cos(),
                    &request.font,
                    background,
                );
            }
        }
        backend.draw_text(
            &request.text,
            placement.origin_x,
            placement.origin_y,
            &request.font,
            request.colour,
        );
        Ok(true)
    }

    fn choose_position<M: TextMeasurer + ?Sized>(&self, measurer: &M, request: &LabelRequest) -> Option<Placement> {
        request.positions.iter().find_map(|pos| {
            if !pos.is_finite() {
                return None;
            }
            let placement = self.candidate(measurer, request, pos);
            if request.priority >= 0.0
                && (!placement.footprint.inside(&self.frame.bounds) || self.registry.overlaps(&placement.footprint))
            {
                return None;
            }
            Some(placement)
        })
    }

    fn candidate<M: TextMeasurer + ?Sized>(
        &self,
        measurer: &M,
        request: &LabelRequest,
        pos: &LabelPosition,
    ) -> Placement {
        let extents = measurer.measure_text(&request.text, &request.font);
        let (mut x, mut y) = self.frame.to_canvas(pos.x, pos.y);

        x -= match pos.h_align {
            HAlign::Right => extents.width + extents.x_bearing,
            HAlign::Centre => extents.width / 2.0 + extents.x_bearing,
            HAlign::Left => extents.x_bearing,
        };
        y -= match pos.v_align {
            VAlign::Top => extents.height + extents.y_bearing,
            VAlign::Middle => extents.height / 2.0 + extents.y_bearing,
            VAlign::Bottom => extents.y_bearing,
        };
        x += pos.offset_x;
        y += pos.offset_y;

        let (x0, y0) = self.frame.to_plot(x, y);
        let (x1, y1) = self.frame.to_plot(x + extents.width, y - extents.height);
        let tight = Rect::from_corners(x0, y0, x1, y1);

        let margin = if request.multiple_labels {
            MULTIPLE_LABEL_MARGIN
        } else {
            SINGLE_LABEL_MARGIN
        };
        let scale = request.extra_margin + 1.0;
        let footprint = tight.expand(
            margin * tight.width() * scale,
            margin * tight.height() * VERTICAL_MARGIN_FACTOR * scale,
        );

        Placement {
            origin_x: x,
            origin_y: y,
            footprint,
        }
    }
}
