use std::path::Path;

use starchart_catalog::query::{MagnitudeLimits, PlotBounds, Viewport};
use starchart_catalog::store::{CatalogueConfig, CatalogueHandle, CatalogueStore};
use starchart_render::{
    Colour, DrawingBackend, FontSpec, HAlign, LabelEngine, LabelPosition, LabelRequest, ObjectRenderer,
    PlotFrame, RenderError, StarLabelSettings, TextExtents, TextMeasurer, VAlign,
};

/// Belt and shoulders of Orion, two faint field stars and one object far
/// outside the chart, brightest first.
const ORION: &str = "\
- - 91262 279.234 38.783 0.03 0.00 - - - Alpha_Lyr Vega - -
- - 24436 78.634 -8.202 0.13 -0.03 - - β Beta_Ori Rigel - 19
- - 27989 88.793 7.407 0.42 1.50 - - α Alpha_Ori Betelgeuse - 58
- - 25336 81.283 6.350 1.64 -0.22 - - γ Gamma_Ori Bellatrix - 24
- - 26311 84.053 -1.202 1.69 -0.18 - - ε Epsilon_Ori Alnilam - 46
- - 26727 85.190 -1.943 1.77 -0.21 - - ζ Zeta_Ori Alnitak - 50
- - 27366 86.939 -9.670 2.07 -0.17 - - κ Kappa_Ori Saiph - 53
- - 25930 83.002 -0.299 2.23 -0.22 - - δ Delta_Ori Mintaka - 34
- - - 80.000 2.000 7.00 0.60 - - - - - - -
- - - 87.000 -5.000 7.10 0.60 - - - - - - -
";

const VISIBLE_OBJECTS: usize = 9;
const NAMED_OBJECTS: usize = 7;

#[derive(Default)]
struct RecordingBackend {
    circles: Vec<(f64, f64, f64)>,
    texts: Vec<(String, f64, f64)>,
}

impl TextMeasurer for RecordingBackend {
    fn measure_text(&self, text: &str, font: &FontSpec) -> TextExtents {
        TextExtents {
            width: 0.6 * font.size * text.chars().count() as f64,
            height: font.size,
            x_bearing: 0.0,
            y_bearing: -font.size,
        }
    }
}

impl DrawingBackend for RecordingBackend {
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64, _colour: Colour) {
        self.circles.push((x, y, radius));
    }

    fn draw_text(&mut self, text: &str, x: f64, y: f64, _font: &FontSpec, _colour: Colour) {
        self.texts.push((text.to_string(), x, y));
    }
}

fn open_catalogue(dir: &Path) -> CatalogueHandle {
    let source = dir.join("orion.txt");
    std::fs::write(&source, ORION).unwrap();
    CatalogueStore::new(CatalogueConfig::new(source, dir.join("orion.bin")))
        .open()
        .unwrap()
}

fn orion_viewport() -> Viewport<starchart_catalog::query::Equirectangular> {
    Viewport::equirectangular(83.8f64.to_radians(), (-1.0f64).to_radians(), 0.2, 0.2)
}

fn limits() -> MagnitudeLimits {
    MagnitudeLimits {
        mag_min: 7.5,
        mag_max: 0.0,
    }
}

#[test]
fn test_render_draws_visible_objects_and_places_labels() {
    let dir = tempfile::tempdir().unwrap();
    let mut handle = open_catalogue(dir.path());
    let viewport = orion_viewport();
    let mut engine = LabelEngine::new(PlotFrame::new(viewport.bounds, 1000.0, 1000.0, 200.0));
    let mut backend = RecordingBackend::default();

    let summary = ObjectRenderer::default()
        .render(&mut handle, &viewport, &limits(), &mut engine, &mut backend)
        .unwrap();
    assert_eq!(summary.objects_drawn as usize, VISIBLE_OBJECTS);
    assert_eq!(summary.labels_submitted, NAMED_OBJECTS);
    assert_eq!(summary.brightest, Some(0.13));
    assert_eq!(summary.faintest, Some(7.1));
    assert_eq!(backend.circles.len(), VISIBLE_OBJECTS);
    assert_eq!(engine.registry().len(), VISIBLE_OBJECTS);
    assert!(backend.texts.is_empty());

    let placement = engine.flush(&mut backend).unwrap();
    assert_eq!(placement.placed + placement.dropped, NAMED_OBJECTS);
    assert_eq!(backend.texts.len(), placement.placed);
    assert_eq!(backend.texts[0].0, "Rigel");
    assert!(backend.texts.iter().all(|(text, _, _)| text != "Vega"));

    let regions = engine.registry().regions();
    assert_eq!(regions.len(), VISIBLE_OBJECTS + placement.placed);
    let (symbols, labels) = regions.split_at(VISIBLE_OBJECTS);
    for (i, label) in labels.iter().enumerate() {
        assert!(label.inside(&viewport.bounds));
        assert!(symbols.iter().all(|s| !s.overlaps(label)));
        assert!(labels[i + 1..].iter().all(|other| !other.overlaps(label)));
    }
}

#[test]
fn test_tick_label_after_flush_avoids_placed_marks() {
    let dir = tempfile::tempdir().unwrap();
    let mut handle = open_catalogue(dir.path());
    let viewport = orion_viewport();
    let mut engine = LabelEngine::new(PlotFrame::new(viewport.bounds, 1000.0, 1000.0, 200.0));
    let mut backend = RecordingBackend::default();

    ObjectRenderer::default()
        .render(&mut handle, &viewport, &limits(), &mut engine, &mut backend)
        .unwrap();
    engine.flush(&mut backend).unwrap();

    // centred on Rigel's symbol
    let (x, y) = viewport
        .project_visible(78.634f64.to_radians(), (-8.202f64).to_radians())
        .unwrap();
    let tick = LabelRequest::new("5h", Colour::WHITE, FontSpec::new(12.0), 0.0)
        .with_position(LabelPosition::new(x, y, HAlign::Centre, VAlign::Middle));
    assert!(!engine.place_now(&mut backend, &tick).unwrap());

    let corner = LabelRequest::new("5h", Colour::WHITE, FontSpec::new(12.0), 0.0).with_position(
        LabelPosition::new(viewport.bounds.x_min, viewport.bounds.y_min, HAlign::Left, VAlign::Top)
            .with_offset(10.0, 30.0),
    );
    assert!(engine.place_now(&mut backend, &corner).unwrap());

    engine.reset();
    assert!(engine.registry().is_empty());
}

#[test]
fn test_label_budget_limits_submissions() {
    let dir = tempfile::tempdir().unwrap();
    let mut handle = open_catalogue(dir.path());
    let viewport = orion_viewport();
    let mut engine = LabelEngine::new(PlotFrame::new(viewport.bounds, 1000.0, 1000.0, 200.0));
    let mut backend = RecordingBackend::default();

    let renderer = ObjectRenderer {
        labels: StarLabelSettings {
            max_labels: 2,
            ..StarLabelSettings::default()
        },
        ..ObjectRenderer::default()
    };
    let summary = renderer
        .render(&mut handle, &viewport, &limits(), &mut engine, &mut backend)
        .unwrap();
    assert_eq!(summary.objects_drawn as usize, VISIBLE_OBJECTS);
    assert_eq!(summary.labels_submitted, 2);
    assert_eq!(engine.pending().len(), 2);
}

#[test]
fn test_faint_limit_stops_tile_scans() {
    let dir = tempfile::tempdir().unwrap();
    let mut handle = open_catalogue(dir.path());
    let viewport = orion_viewport();
    let mut engine = LabelEngine::new(PlotFrame::new(viewport.bounds, 1000.0, 1000.0, 200.0));
    let mut backend = RecordingBackend::default();

    let bright_only = MagnitudeLimits {
        mag_min: 1.7,
        mag_max: 0.0,
    };
    let summary = ObjectRenderer::default()
        .render(&mut handle, &viewport, &bright_only, &mut engine, &mut backend)
        .unwrap();
    // Rigel, Betelgeuse, Bellatrix, Alnilam
    assert_eq!(summary.objects_drawn, 4);
    assert_eq!(summary.faintest, Some(1.69));
}

#[test]
fn test_mismatched_frame_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut handle = open_catalogue(dir.path());
    let viewport = orion_viewport();
    let frame = PlotFrame::new(PlotBounds::new(-1.0, 1.0, -1.0, 1.0), 1000.0, 1000.0, 200.0);
    let mut engine = LabelEngine::new(frame);
    let mut backend = RecordingBackend::default();

    let err = ObjectRenderer::default()
        .render(&mut handle, &viewport, &limits(), &mut engine, &mut backend)
        .unwrap_err();
    assert!(matches!(err, RenderError::InvalidSettings { .. }));
    assert!(backend.circles.is_empty());
}
