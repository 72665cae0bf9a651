//! Plot-space rectangles and the mapping between plot and canvas coordinates.
//!
//! Plot coordinates are whatever the chart's projection produces (radians
//! for the reference projection). Canvas coordinates are device pixels with
//! the origin at the top-left of the page; the plot area sits inside the
//! page at a pixel offset.

use starchart_catalog::query::PlotBounds;

/// Axis-aligned rectangle in plot coordinates.
///
/// Every exclusion region and label footprint is one of these.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Rect {
    /// Rectangle spanning two opposite corners given in any order.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x_min: x0.min(x1),
            x_max: x0.max(x1),
            y_min: y0.min(y1),
            y_max: y0.max(y1),
        }
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x_max > other.x_min
            && self.x_min < other.x_max
            && self.y_max > other.y_min
            && self.y_min < other.y_max
    }

    /// Grows the rectangle by `dx` on the left and right and `dy` on the top
    /// and bottom.
    pub fn expand(&self, dx: f64, dy: f64) -> Self {
        Self {
            x_min: self.x_min - dx,
            x_max: self.x_max + dx,
            y_min: self.y_min - dy,
            y_max: self.y_max + dy,
        }
    }

    /// True when the whole rectangle lies within the plot bounds.
    pub fn inside(&self, bounds: &PlotBounds) -> bool {
        self.x_min >= bounds.x_min
            && self.x_max <= bounds.x_max
            && self.y_min >= bounds.y_min
            && self.y_max <= bounds.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// Placement of the plot area on the canvas.
///
/// `y` is not flipped: plot `y_min` maps to the top edge of the plot area.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotFrame {
    pub bounds: PlotBounds,
    /// Width of the plot area, pixels.
    pub width_px: f64,
    /// Height of the plot area, pixels.
    pub height_px: f64,
    /// Canvas position of the plot area's top-left corner, pixels.
    pub offset_x: f64,
    pub offset_y: f64,
    /// Canvas resolution, pixels per inch.
    pub dpi: f64,
}

impl PlotFrame {
    pub fn new(bounds: PlotBounds, width_px: f64, height_px: f64, dpi: f64) -> Self {
        Self {
            bounds,
            width_px,
            height_px,
            offset_x: 0.0,
            offset_y: 0.0,
            dpi,
        }
    }

    pub fn with_offset(mut self, offset_x: f64, offset_y: f64) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    pub fn to_canvas(&self, x: f64, y: f64) -> (f64, f64) {
        let b = &self.bounds;
        (
            (x - b.x_min) / b.width() * self.width_px + self.offset_x,
            (y - b.y_min) / b.height() * self.height_px + self.offset_y,
        )
    }

    pub fn to_plot(&self, canvas_x: f64, canvas_y: f64) -> (f64, f64) {
        let b = &self.bounds;
        (
            (canvas_x - self.offset_x) / self.width_px * b.width() + b.x_min,
            (canvas_y - self.offset_y) / self.height_px * b.height() + b.y_min,
        )
    }

    /// Plot-space rectangle covering a canvas-space square of half-size
    /// `half` around a canvas point.
    pub fn canvas_square(&self, canvas_x: f64, canvas_y: f64, half: f64) -> Rect {
        let (x0, y0) = self.to_plot(canvas_x - half, canvas_y - half);
        let (x1, y1) = self.to_plot(canvas_x + half, canvas_y + half);
        Rect::from_corners(x0, y0, x1, y1)
    }

    /// Length in millimetres, as pixels.
    pub fn mm(&self, millimetres: f64) -> f64 {
        millimetres / 25.4 * self.dpi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn frame() -> PlotFrame {
        PlotFrame::new(PlotBounds::new(-1.0, 1.0, -0.5, 0.5), 800.0, 400.0, 200.0)
            .with_offset(50.0, 20.0)
    }

    #[test]
    fn test_rect_from_corners_orders_edges() {
        let r = Rect::from_corners(3.0, -1.0, 1.0, 2.0);
        assert_eq!(r, Rect { x_min: 1.0, x_max: 3.0, y_min: -1.0, y_max: 2.0 });
    }

    #[test]
    fn test_overlap_is_strict_and_symmetric() {
        let a = Rect::from_corners(0.0, 0.0, 1.0, 1.0);
        let touching = Rect::from_corners(1.0, 0.0, 2.0, 1.0);
        let crossing = Rect::from_corners(0.5, 0.5, 1.5, 1.5);
        assert!(!a.overlaps(&touching));
        assert!(!touching.overlaps(&a));
        assert!(a.overlaps(&crossing));
        assert!(crossing.overlaps(&a));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_canvas_mapping() {
        let f = frame();
        let (cx, cy) = f.to_canvas(-1.0, -0.5);
        assert_abs_diff_eq!(cx, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(cy, 20.0, epsilon = 1e-9);

        let (cx, cy) = f.to_canvas(0.0, 0.25);
        assert_abs_diff_eq!(cx, 450.0, epsilon = 1e-9);
        assert_abs_diff_eq!(cy, 320.0, epsilon = 1e-9);

        let (x, y) = f.to_plot(cx, cy);
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_canvas_square_and_inside() {
        let f = frame();
        let (cx, cy) = f.to_canvas(0.0, 0.0);
        let r = f.canvas_square(cx, cy, 4.0);
        assert_abs_diff_eq!(r.width(), 0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(r.height(), 0.02, epsilon = 1e-12);
        assert!(r.inside(&f.bounds));
        assert!(!r.expand(1.0, 0.0).inside(&f.bounds));
    }

    #[test]
    fn test_mm_to_pixels() {
        assert_abs_diff_eq!(frame().mm(25.4), 200.0, epsilon = 1e-12);
    }
}
