use super::{DrawContext, Frame, VisualizerError, VisualizerKind};
use crate::color::Color;
use crate::params::positive;
use crate::surface::PixelImage;
use crate::types::Element;
use num::Integer;

#[derive(Params)]
pub struct ShiftCompareParams {
    #[param(
        rename = "mod",
        display = "Modulo",
        description = "Modulus used to compare sequence elements",
        default = "2",
        required,
        validate = positive
    )]
    modulus: Element,
}

/// Pixel (x, y) is white when a(x) and a(y) are congruent modulo the chosen
/// modulus, black otherwise.
#[derive(Kind)]
#[kind(
    "Shift Compare",
    "Grid showing which pairs of entries are congruent modulo a fixed modulus"
)]
pub struct ShiftCompare {
    modulus: Element,
    image: PixelImage,
}

impl VisualizerKind for ShiftCompare {
    type Params = ShiftCompareParams;

    fn create(params: Self::Params) -> Self {
        Self {
            modulus: params.modulus,
            image: PixelImage::new(0, 0, Color::BLACK),
        }
    }

    fn setup(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), VisualizerError> {
        let width = ctx.surface.width().max(0.0) as usize;
        let height = ctx.surface.height().max(0.0) as usize;
        self.image = PixelImage::new(width, height, Color::BLACK);
        Ok(())
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<Frame, VisualizerError> {
        let first = ctx.sequence.first();
        let size = self.image.width.max(self.image.height) as i64;
        let mut end = first.saturating_add(size - 1);
        if let Some(last) = ctx.sequence.last() {
            end = end.min(last);
        }
        let residues = (first..=end)
            .map(|i| {
                ctx.sequence
                    .get_element(i)
                    .map(|a| a.mod_floor(&self.modulus))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (y, a) in residues.iter().enumerate().take(self.image.height) {
            for (x, b) in residues.iter().enumerate().take(self.image.width) {
                let color = if a == b { Color::WHITE } else { Color::BLACK };
                self.image.set(x, y, color);
            }
        }
        ctx.surface.image(&self.image);
        Ok(Frame::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RawParams;
    use crate::sequence::{Configured, ExplicitTerms, Sequence};
    use crate::surface::RecordingSurface;
    use crate::visualizer::{Visualization, Visualizer};
    use std::sync::Arc;

    fn raw(pairs: &[(&str, &str)]) -> RawParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn congruent_pairs_are_white() {
        let mut seq = Configured::<ExplicitTerms>::new();
        seq.validate(&raw(&[("terms", "1 2 3 5")]));
        seq.initialize().unwrap();
        let sequence: Arc<dyn Sequence> = Arc::new(seq);

        let mut viz = Visualization::<ShiftCompare>::new();
        assert!(viz.validate(&raw(&[("mod", "2")])).is_valid());
        viz.initialize(Box::new(RecordingSurface::new(4.0, 4.0)), sequence)
            .unwrap();
        viz.setup().unwrap();
        assert_eq!(viz.draw(), Ok(Frame::Stopped));

        let image = viz
            .surface()
            .and_then(|s| s.as_any().downcast_ref::<RecordingSurface>())
            .and_then(RecordingSurface::last_image)
            .unwrap();
        assert_eq!(image.get(0, 2), Some(Color::WHITE));
        assert_eq!(image.get(0, 1), Some(Color::BLACK));
        assert_eq!(image.get(3, 3), Some(Color::WHITE));
        assert_eq!(image.get(1, 3), Some(Color::BLACK));
    }

    #[test]
    fn residues_of_huge_entries_compare_exactly() {
        let mut seq = Configured::<ExplicitTerms>::new();
        let terms = "100000000000000000000000000000001 3 100000000000000000000000000000000";
        assert!(seq.validate(&raw(&[("terms", terms)])).is_valid());
        seq.initialize().unwrap();
        let sequence: Arc<dyn Sequence> = Arc::new(seq);

        let mut viz = Visualization::<ShiftCompare>::new();
        assert!(viz.validate(&raw(&[("mod", "2")])).is_valid());
        viz.initialize(Box::new(RecordingSurface::new(3.0, 3.0)), sequence)
            .unwrap();
        viz.setup().unwrap();
        assert_eq!(viz.draw(), Ok(Frame::Stopped));

        let image = viz
            .surface()
            .and_then(|s| s.as_any().downcast_ref::<RecordingSurface>())
            .and_then(RecordingSurface::last_image)
            .unwrap();
        assert_eq!(image.get(0, 1), Some(Color::WHITE));
        assert_eq!(image.get(0, 2), Some(Color::BLACK));
    }

    #[test]
    fn modulus_must_be_positive() {
        let mut viz = Visualization::<ShiftCompare>::new();
        assert!(!viz.validate(&raw(&[("mod", "0")])).is_valid());
    }
}
