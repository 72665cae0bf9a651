//! Drawing catalogue objects: symbols sized by brightness, footprints that
//! block labels, and name labels queued for placement.

use starchart_catalog::query::{
    levels_to_scan, survey, visible_tiles, MagnitudeLimits, SkyProjection, Viewport,
};
use starchart_catalog::store::{CatalogueHandle, CatalogueNumber, CatalogueRecord, NameField};
use tracing::{debug, info};

use crate::backend::{Colour, DrawingBackend, FontSpec};
use crate::error::{RenderError, Result};
use crate::labels::{HAlign, LabelEngine, LabelPosition, LabelRequest, VAlign};

/// Radius scale at `mag_max`, before `size_norm`.
const SYMBOL_BASE_SIZE: f64 = 18.64;
/// Converts the scaled size to inches.
const SYMBOL_INCHES_PER_UNIT: f64 = 0.75 * 3.0 / 72.0 * 0.001_455_208_3 * 60.0;

/// Gap between a symbol's edge and its label, mm.
const LABEL_GAP_MM: f64 = 0.75;
/// Label font size at unit scaling, mm.
const LABEL_FONT_MM: f64 = 2.0;
const STAR_LABEL_FONT_FACTOR: f64 = 1.2;
/// Magnitude labels sort just ahead of the object's other labels.
const MAGNITUDE_LABEL_PRIORITY_BIAS: f64 = 1e-6;

/// How symbol radius follows magnitude.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolSettings {
    pub colour: Colour,
    /// Overall size multiplier.
    pub size_norm: f64,
    /// Radius ratio between objects one `mag_step` apart.
    pub alpha: f64,
    pub mag_step: f64,
    /// A magnitude key is drawn, so objects brighter than `mag_max` keep
    /// growing instead of being clamped to its size.
    pub magnitude_key: bool,
    /// Largest symbol radius permitted on a chart, mm.
    pub max_radius_mm: f64,
}

impl Default for SymbolSettings {
    fn default() -> Self {
        Self {
            colour: Colour::WHITE,
            size_norm: 0.4,
            alpha: 1.172_793_2,
            mag_step: 0.5,
            magnitude_key: false,
            max_radius_mm: 1.6,
        }
    }
}

impl SymbolSettings {
    /// Symbol radius in inches for an object of magnitude `mag` on a chart
    /// whose size scale is anchored at `mag_max`.
    pub fn radius_inches(&self, mag: f64, mag_max: f64) -> f64 {
        let mut steps = (mag_max - mag) / self.mag_step;
        if !self.magnitude_key && steps > 0.0 {
            steps = 0.0;
        }
        self.size_norm * SYMBOL_BASE_SIZE * libm::pow(self.alpha, steps) * SYMBOL_INCHES_PER_UNIT
    }

    pub fn radius_mm(&self, mag: f64, mag_max: f64) -> f64 {
        self.radius_inches(mag, mag_max) * 25.4
    }

    /// Scales `size_norm` down so the brightest object's symbol is no larger
    /// than `max_radius_mm`. Returns the resulting largest radius, mm.
    pub fn fit_to_field(&mut self, brightest: f64, mag_max: f64) -> f64 {
        let largest = self.radius_mm(brightest, mag_max);
        if largest <= self.max_radius_mm {
            return largest;
        }
        info!(
            from_mm = largest,
            to_mm = self.max_radius_mm,
            "reducing size of largest symbol on chart"
        );
        self.size_norm *= self.max_radius_mm / largest;
        self.radius_mm(brightest, mag_max)
    }

    fn validate(&self) -> Result<()> {
        if !(self.mag_step > 0.0) || !(self.alpha > 0.0) || !(self.size_norm > 0.0) {
            return Err(RenderError::invalid_settings(
                "symbol size_norm, alpha and mag_step must be positive",
            ));
        }
        Ok(())
    }
}

/// Which labels to attach to drawn objects.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarLabelSettings {
    pub colour: Colour,
    /// Objects at or fainter than this are never labelled.
    pub label_mag_limit: f64,
    /// Label budget for the whole chart.
    pub max_labels: usize,
    pub proper_names: bool,
    pub bayer_letters: bool,
    pub flamsteed_numbers: bool,
    pub variable_ids: bool,
    pub catalogue_numbers: bool,
    pub catalogue: CatalogueNumber,
    pub magnitudes: bool,
    /// Submit every enabled label; otherwise only the first.
    pub allow_multiple_labels: bool,
    pub font_scale: f64,
    pub background: Option<Colour>,
}

impl Default for StarLabelSettings {
    fn default() -> Self {
        Self {
            colour: Colour::WHITE,
            label_mag_limit: 9999.0,
            max_labels: 1000,
            proper_names: true,
            bayer_letters: false,
            flamsteed_numbers: false,
            variable_ids: false,
            catalogue_numbers: false,
            catalogue: CatalogueNumber::Hipparcos,
            magnitudes: false,
            allow_multiple_labels: false,
            font_scale: 1.0,
            background: None,
        }
    }
}

impl StarLabelSettings {
    /// Label texts for one object in submission order, with their priorities.
    pub fn label_texts(&self, record: &CatalogueRecord) -> Vec<(String, f64)> {
        let mut texts = Vec::new();

        if self.proper_names {
            if let Some(name) = record.name(NameField::ProperName) {
                if !same_letters(name, &record.bayer_designation) {
                    texts.push((name.replace('_', " "), record.mag));
                }
            }
        }
        if self.bayer_letters {
            if let Some(letter) = record.name(NameField::BayerLetter) {
                texts.push((letter.to_string(), record.mag));
            }
        }
        if self.flamsteed_numbers {
            if let Some(number) = record.name(NameField::FlamsteedNumber) {
                texts.push((number.to_string(), record.mag));
            }
        }
        if self.variable_ids {
            if let Some(id) = record.name(NameField::VariableId) {
                texts.push((id.replace('_', " "), record.mag));
            }
        }
        if self.catalogue_numbers {
            if let Some(number) = record.catalogue_number(self.catalogue) {
                texts.push((format!("{}{}", self.catalogue.prefix(), number), record.mag));
            }
        }
        if self.magnitudes {
            texts.push((
                format!("{:.1}", record.mag),
                record.mag - MAGNITUDE_LABEL_PRIORITY_BIAS,
            ));
        }

        if !self.allow_multiple_labels {
            texts.truncate(1);
        }
        texts
    }
}

/// Compares two designations on their ASCII letters alone.
fn same_letters(a: &str, b: &str) -> bool {
    let letters = |s: &str| s.chars().filter(|c| c.is_ascii_alphabetic()).collect::<String>();
    letters(a) == letters(b)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderSummary {
    pub objects_drawn: u64,
    pub labels_submitted: usize,
    pub brightest: Option<f64>,
    pub faintest: Option<f64>,
    /// Radius of the brightest object's symbol, mm.
    pub largest_radius_mm: f64,
}

/// Draws the objects of one chart and queues their labels.
#[derive(Debug, Clone, Default)]
pub struct ObjectRenderer {
    pub symbols: SymbolSettings,
    pub labels: StarLabelSettings,
}

impl ObjectRenderer {
    pub fn new(symbols: SymbolSettings, labels: StarLabelSettings) -> Self {
        Self { symbols, labels }
    }

    /// Draws every visible object no fainter than `limits.mag_min`.
    ///
    /// The field is surveyed first so the brightest symbol can be capped at
    /// `max_radius_mm`. Symbols are drawn and their footprints registered
    /// immediately; labels are submitted to `engine` and placed when the
    /// caller flushes it.
    pub fn render<P: SkyProjection, B: DrawingBackend>(
        &self,
        handle: &mut CatalogueHandle,
        viewport: &Viewport<P>,
        limits: &MagnitudeLimits,
        engine: &mut LabelEngine,
        backend: &mut B,
    ) -> Result<RenderSummary> {
        self.symbols.validate()?;
        let frame = *engine.frame();
        if frame.bounds != viewport.bounds {
            return Err(RenderError::invalid_settings(
                "label engine frame and viewport have different plot bounds",
            ));
        }

        let field = survey(handle, viewport, limits.mag_min)?;
        let mut symbols = self.symbols;
        let largest_radius_mm = match field.brightest {
            Some(brightest) => symbols.fit_to_field(brightest, limits.mag_max),
            None => 0.0,
        };

        let font = FontSpec::new(frame.mm(LABEL_FONT_MM) * STAR_LABEL_FONT_FACTOR * self.labels.font_scale);
        let label_gap = frame.mm(LABEL_GAP_MM);
        let mut summary = RenderSummary {
            brightest: field.brightest,
            faintest: field.faintest,
            largest_radius_mm,
            ..RenderSummary::default()
        };
        let mut labelled = 0usize;

        let scheme = handle.tiling().clone();
        for level in levels_to_scan(&scheme, limits.mag_min) {
            for tile in visible_tiles(&scheme, level, viewport) {
                for record in handle.scan_tile_to(tile.tile_id, limits.mag_min)? {
                    let record = record?;
                    let Some((x, y)) = viewport.project_visible(record.ra, record.dec) else {
                        continue;
                    };

                    let radius = symbols.radius_inches(record.mag, limits.mag_max) * frame.dpi;
                    let (cx, cy) = frame.to_canvas(x, y);
                    backend.fill_circle(cx, cy, radius, symbols.colour);
                    engine.registry_mut().add(frame.canvas_square(cx, cy, radius))?;
                    summary.objects_drawn += 1;

                    if record.mag >= self.labels.label_mag_limit || labelled >= self.labels.max_labels {
                        continue;
                    }
                    let texts = self.labels.label_texts(&record);
                    let multiple = texts.len() > 1;
                    let offset = radius + label_gap;
                    for (text, priority) in texts {
                        let mut request = LabelRequest::new(text, self.labels.colour, font, priority)
                            .multiple(multiple)
                            .with_positions([
                                LabelPosition::new(x, y, HAlign::Left, VAlign::Middle).with_offset(offset, 0.0),
                                LabelPosition::new(x, y, HAlign::Right, VAlign::Middle).with_offset(-offset, 0.0),
                            ]);
                        request.background = self.labels.background;
                        engine.submit(request)?;
                        labelled += 1;
                        summary.labels_submitted += 1;
                    }
                }
            }
        }

        debug!(
            objects = summary.objects_drawn,
            labels = summary.labels_submitted,
            brightest = ?summary.brightest,
            faintest = ?summary.faintest,
            largest_radius_mm = summary.largest_radius_mm,
            "rendered catalogue objects"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn star(mag: f64) -> CatalogueRecord {
        CatalogueRecord {
            mag,
            ..CatalogueRecord::default()
        }
    }

    #[test]
    fn test_radius_clamped_brighter_than_mag_max() {
        let settings = SymbolSettings::default();
        let at_max = settings.radius_inches(0.0, 0.0);
        assert_abs_diff_eq!(at_max, 0.4 * 18.64 * SYMBOL_INCHES_PER_UNIT, epsilon = 1e-15);
        assert_abs_diff_eq!(settings.radius_inches(-1.5, 0.0), at_max, epsilon = 1e-15);

        let keyed = SymbolSettings {
            magnitude_key: true,
            ..settings
        };
        assert_abs_diff_eq!(keyed.radius_inches(-0.5, 0.0), at_max * 1.172_793_2, epsilon = 1e-15);
    }

    #[test]
    fn test_radius_shrinks_with_magnitude() {
        let settings = SymbolSettings::default();
        let bright = settings.radius_inches(1.0, 0.0);
        let faint = settings.radius_inches(1.5, 0.0);
        assert_abs_diff_eq!(bright / faint, 1.172_793_2, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_to_field_caps_largest_radius() {
        let mut settings = SymbolSettings {
            max_radius_mm: 0.2,
            ..SymbolSettings::default()
        };
        let before = settings.radius_mm(0.0, 0.0);
        assert!(before > 0.2);
        let after = settings.fit_to_field(0.0, 0.0);
        assert_abs_diff_eq!(after, 0.2, epsilon = 1e-12);
        assert!(settings.size_norm < 0.4);

        let mut roomy = SymbolSettings::default();
        roomy.fit_to_field(0.0, 0.0);
        assert_eq!(roomy.size_norm, 0.4);
    }

    #[test]
    fn test_proper_name_suppressed_when_it_matches_designation() {
        let settings = StarLabelSettings::default();
        let mut record = star(0.0);
        record.proper_name = "Alpha_Lyr".into();
        record.bayer_designation = "Alpha Lyr".into();
        assert!(settings.label_texts(&record).is_empty());

        record.proper_name = "Vega_Star".into();
        let texts = settings.label_texts(&record);
        assert_eq!(texts, vec![("Vega Star".to_string(), 0.0)]);
    }

    #[test]
    fn test_label_order_and_single_label_rule() {
        let mut settings = StarLabelSettings {
            bayer_letters: true,
            catalogue_numbers: true,
            magnitudes: true,
            ..StarLabelSettings::default()
        };
        let mut record = star(1.18);
        record.proper_name = "Rigel".into();
        record.bayer_letter = "β".into();
        record.hip_number = 24436;

        let texts = settings.label_texts(&record);
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].0, "Rigel");

        settings.allow_multiple_labels = true;
        let texts: Vec<String> = settings.label_texts(&record).into_iter().map(|t| t.0).collect();
        assert_eq!(texts, ["Rigel", "β", "HIP24436", "1.2"]);

        let priorities: Vec<f64> = settings.label_texts(&record).into_iter().map(|t| t.1).collect();
        assert!(priorities[3] < priorities[0]);
    }

    #[test]
    fn test_missing_catalogue_number_is_skipped() {
        let settings = StarLabelSettings {
            proper_names: false,
            catalogue_numbers: true,
            catalogue: CatalogueNumber::HarvardRevised,
            magnitudes: true,
            ..StarLabelSettings::default()
        };
        let texts = settings.label_texts(&star(3.04));
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].0, "3.0");
    }
}
