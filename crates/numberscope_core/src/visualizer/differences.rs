use super::{DrawContext, Frame, VisualizerError, VisualizerKind};
use crate::color::Color;
use crate::params::{non_negative, positive};
use crate::sequence::Sequence;
use crate::types::Element;
use crate::validation::ValidationStatus;

const FONT_SIZE: f64 = 20.0;
const X_DELTA: f64 = 50.0;
const Y_DELTA: f64 = 50.0;
const ORIGIN: f64 = 30.0;

#[derive(Params)]
pub struct DifferencesParams {
    #[param(
        display = "Elements in top row",
        description = "Number of terms shown in the top row",
        default = "20",
        required,
        validate = positive
    )]
    n: i64,
    #[param(
        display = "Number of rows",
        description = "If zero, defaults to the length of the top row",
        default = "5",
        validate = non_negative
    )]
    levels: i64,
}

/// A row of entries, then rows of differences of the row above, drawn as a
/// pyramid.
#[derive(Kind)]
#[kind(
    "Differences",
    "Produces a table of differences between consecutive terms, potentially iterated several times"
)]
pub struct Differences {
    n: i64,
    levels: i64,
}

impl Differences {
    fn rows(&self, sequence: &dyn Sequence) -> Result<Vec<Vec<Element>>, VisualizerError> {
        let first = sequence.first();
        let mut end = first.saturating_add(self.n - 1);
        if let Some(last) = sequence.last() {
            end = end.min(last);
        }
        let available = (i128::from(end) - i128::from(first) + 1).max(0);
        let levels = i128::from(self.levels).min(available) as usize;
        let mut row = (first..=end)
            .map(|i| sequence.get_element(i))
            .collect::<Result<Vec<_>, _>>()?;
        let mut rows = Vec::with_capacity(levels);
        for _ in 0..levels {
            let next = row.windows(2).map(|pair| &pair[1] - &pair[0]).collect();
            rows.push(std::mem::replace(&mut row, next));
        }
        Ok(rows)
    }
}

impl VisualizerKind for Differences {
    type Params = DifferencesParams;

    fn check(params: &Self::Params, status: &mut ValidationStatus) {
        status.forbid(
            params.n < params.levels,
            "Number of rows cannot exceed length of first row",
        );
    }

    fn create(params: Self::Params) -> Self {
        let levels = if params.levels == 0 {
            params.n
        } else {
            params.levels
        };
        Self {
            n: params.n,
            levels,
        }
    }

    fn bind(
        &mut self,
        sequence: &dyn Sequence,
        _status: &mut ValidationStatus,
    ) -> Result<(), VisualizerError> {
        match sequence.len() {
            Some(len) if len < self.levels as u64 => Err(VisualizerError::Configuration(format!(
                "Sequence {} has too few entries for {} levels",
                sequence.name(),
                self.levels
            ))),
            _ => Ok(()),
        }
    }

    fn setup(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), VisualizerError> {
        ctx.surface.background(Color::BLACK);
        Ok(())
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<Frame, VisualizerError> {
        let rows = self.rows(ctx.sequence)?;
        ctx.surface.background(Color::BLACK);
        ctx.surface.no_stroke();
        let mut first_x = ORIGIN;
        for (i, row) in rows.iter().enumerate() {
            ctx.surface
                .fill(Some(Color::rainbow(i as f64 * 60.0).with_alpha(0.8)));
            for (j, value) in row.iter().enumerate() {
                ctx.surface.text(
                    &value.to_string(),
                    first_x + j as f64 * X_DELTA,
                    ORIGIN + i as f64 * Y_DELTA,
                    FONT_SIZE,
                );
            }
            // Each row starts half an entry further right.
            first_x += X_DELTA / 2.0;
        }
        Ok(Frame::Stopped)
    }
}
