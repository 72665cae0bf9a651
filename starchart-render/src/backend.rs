//! Drawing collaborators.
//!
//! The engine never rasterises anything itself. A chart supplies a
//! [`DrawingBackend`] that can measure text and paint circles and strings
//! in canvas pixels.

/// RGB colour with components in `[0, 1]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colour {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Colour {
    pub const BLACK: Colour = Colour::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Colour = Colour::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// Font request for one label.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    /// Font size, pixels.
    pub size: f64,
    pub weight: FontWeight,
    pub style: FontStyle,
}

impl FontSpec {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            weight: FontWeight::Normal,
            style: FontStyle::Normal,
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = FontWeight::Bold;
        self
    }

    pub fn italic(mut self) -> Self {
        self.style = FontStyle::Italic;
        self
    }
}

/// Ink extents of a string, pixels.
///
/// The bearings are measured from the text origin (left end of the
/// baseline) to the top-left of the ink, so `y_bearing` is negative for
/// text that sits above the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextExtents {
    pub width: f64,
    pub height: f64,
    pub x_bearing: f64,
    pub y_bearing: f64,
}

pub trait TextMeasurer {
    fn measure_text(&self, text: &str, font: &FontSpec) -> TextExtents;
}

pub trait DrawingBackend: TextMeasurer {
    /// Fills a circle centred on a canvas point.
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64, colour: Colour);

    /// Draws `text` with its origin at a canvas point.
    fn draw_text(&mut self, text: &str, x: f64, y: f64, font: &FontSpec, colour: Colour);
}
