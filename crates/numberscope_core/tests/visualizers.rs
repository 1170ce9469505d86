//! Integration tests for the visualizers, driven frame by frame against a
//! recording surface.

use numberscope_core::Registry;
use numberscope_core::color::Color;
use numberscope_core::params::RawParams;
use numberscope_core::sequence::Sequence;
use numberscope_core::surface::{DrawCommand, RecordingSurface, Surface, SvgSurface};
use numberscope_core::visualizer::{Animation, Frame, Phase, Visualizer};
use std::sync::Arc;

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn raw(pairs: &[(&str, &str)]) -> RawParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn sequence(kind: &str, params: &[(&str, &str)]) -> Arc<dyn Sequence> {
    let mut seq = Registry::standard()
        .create_sequence(kind)
        .unwrap_or_else(|e| panic!("no sequence '{kind}': {e}"));
    assert!(seq.validate(&raw(params)).is_valid());
    seq.initialize().expect("initialize failed");
    Arc::from(seq)
}

/// Validated and bound, but not yet set up.
fn bound(
    kind: &str,
    params: &[(&str, &str)],
    seq: Arc<dyn Sequence>,
    surface: Box<dyn Surface>,
) -> Box<dyn Visualizer> {
    let mut viz = Registry::standard()
        .create_visualizer(kind)
        .unwrap_or_else(|e| panic!("no visualizer '{kind}': {e}"));
    let status = viz.validate(&raw(params));
    assert!(status.is_valid(), "'{kind}' rejected {params:?}: {:?}", status.errors);
    viz.initialize(surface, seq)
        .unwrap_or_else(|e| panic!("initialize '{kind}' failed: {e}"));
    viz
}

fn commands(viz: &dyn Visualizer) -> Vec<DrawCommand> {
    viz.surface()
        .and_then(|s| s.as_any().downcast_ref::<RecordingSurface>())
        .map(|s| s.commands().to_vec())
        .expect("not a recording surface")
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

#[test]
fn every_visualizer_finishes_on_a_short_sequence() {
    let registry = Registry::standard();
    for entry in registry.visualizers() {
        let seq = sequence("Explicit Terms", &[("terms", "0 1 2 3 4 5 6 7 8 9")]);
        let params: &[(&str, &str)] = match entry.name {
            "Differences" => &[("n", "10"), ("levels", "3")],
            _ => &[],
        };
        let viz = bound(
            entry.name,
            params,
            seq.clone(),
            Box::new(RecordingSurface::new(40.0, 40.0)),
        );
        let mut animation = Animation::new(viz, seq).with_max_frames(500);
        let frames = animation
            .run()
            .unwrap_or_else(|e| panic!("'{}' failed: {e}", entry.name));
        assert!(frames < 500, "'{}' never stopped", entry.name);
        assert_eq!(animation.visualizer().phase(), Phase::Stopped);
    }
}

#[test]
fn draw_after_stop_is_a_no_op() {
    let seq = sequence("Explicit Terms", &[("terms", "1 2 3")]);
    let mut viz = bound(
        "Shift Compare",
        &[],
        seq,
        Box::new(RecordingSurface::new(3.0, 3.0)),
    );
    viz.setup().unwrap();
    assert_eq!(viz.draw(), Ok(Frame::Stopped));
    let drawn = commands(viz.as_ref()).len();
    assert_eq!(viz.draw(), Ok(Frame::Stopped));
    assert_eq!(commands(viz.as_ref()).len(), drawn);
}

#[test]
fn detach_returns_the_surface() {
    let seq = sequence("Natural Numbers", &[]);
    let mut viz = bound(
        "Mod Fill",
        &[("modDimension", "5")],
        seq,
        Box::new(RecordingSurface::new(20.0, 20.0)),
    );
    viz.setup().unwrap();
    viz.draw().unwrap();
    let surface = viz.detach().expect("surface");
    assert_eq!(viz.phase(), Phase::Constructed);
    assert!(!viz.is_valid());
    assert!(surface.as_any().downcast_ref::<RecordingSurface>().is_some());
}

// ─── Formula Grid ─────────────────────────────────────────────────────────────

#[test]
fn formula_grid_skips_false_cells() {
    let seq = sequence("Natural Numbers", &[("includeZero", "true")]);
    let mut viz = bound(
        "Formula Grid",
        &[("dimensions", "3 3"), ("fillFormula", "if(isPrime(a), red, false)")],
        seq,
        Box::new(RecordingSurface::new(30.0, 30.0)),
    );
    viz.setup().unwrap();
    assert_eq!(viz.draw(), Ok(Frame::Stopped));
    let red = Color::named("red");
    let filled: Vec<_> = commands(viz.as_ref())
        .into_iter()
        .filter_map(|c| match c {
            DrawCommand::Rect { x, y, style, .. } => {
                assert_eq!(style.fill, red);
                Some((x, y))
            }
            _ => None,
        })
        .collect();
    // Primes among 0..9: 2, 3, 5, 7.
    assert_eq!(
        filled,
        vec![(20.0, 0.0), (0.0, 10.0), (20.0, 10.0), (10.0, 20.0)]
    );
}

#[test]
fn formula_grid_reads_other_entries() {
    let seq = sequence("Explicit Terms", &[("terms", "5 6 7 8")]);
    let mut viz = bound(
        "Formula Grid",
        &[("dimensions", "1 4"), ("fillFormula", "{text: A(M) - a}")],
        seq,
        Box::new(RecordingSurface::new(40.0, 10.0)),
    );
    viz.setup().unwrap();
    viz.draw().unwrap();
    let texts: Vec<_> = commands(viz.as_ref())
        .into_iter()
        .filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["3", "2", "1", "0"]);
}

// ─── Rendering ────────────────────────────────────────────────────────────────

#[test]
fn turtle_renders_to_svg() {
    let seq = sequence("Explicit Terms", &[("terms", "0 1 0 1 0 1")]);
    let viz = bound(
        "Turtle",
        &[("domain", "0 1"), ("turns", "0 90"), ("steps", "10 10"), ("speed", "0")],
        seq.clone(),
        Box::new(SvgSurface::new(100.0, 100.0)),
    );
    let mut animation = Animation::new(viz, seq);
    assert_eq!(animation.run(), Ok(1));
    let svg = animation
        .visualizer()
        .surface()
        .and_then(|s| s.as_any().downcast_ref::<SvgSurface>())
        .map(SvgSurface::to_svg)
        .expect("svg surface");
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("<line").count(), 6);
}
