use super::{DrawContext, Frame, VisualizerError, VisualizerKind};
use crate::color::Color;
use crate::params::{non_negative, positive};
use crate::sequence::Sequence;
use crate::types::Element;
use crate::validation::ValidationStatus;
use std::collections::HashMap;
use std::f64::consts::PI;
use tracing::debug;

/// Steps drawn at once for an infinite sequence with no growth.
pub const MAX_STATIC_STEPS: i64 = 10_000;

/// Folding rates are in units of 1/FOLD_DENOMINATOR degree per frame.
const FOLD_DENOMINATOR: f64 = 100_000.0;

#[derive(Params)]
pub struct TurtleParams {
    #[param(
        display = "Sequence Domain",
        description = "Values to interpret as rules; sequence values not listed here are ignored",
        default = "0 1 2 3 4",
        required
    )]
    domain: Vec<Element>,
    #[param(
        display = "Turning angles",
        description = "Angles in degrees, in order corresponding to the domain",
        default = "30 45 60 90 120",
        required
    )]
    turns: Vec<f64>,
    #[param(
        display = "Step lengths",
        description = "Step lengths in pixels, in order corresponding to the domain",
        default = "20 20 20 20 20",
        required
    )]
    steps: Vec<f64>,
    #[param(display = "Turn on protein folding animation", default = "false")]
    fold_controls: bool,
    #[param(
        display = "Folding rates",
        description = "Angle increments per frame in units of 0.00001 degree, \
                       in order corresponding to the domain",
        default = "0 0 0 0 0",
        visible_if = "foldControls",
        visible_value = "true"
    )]
    folds: Vec<f64>,
    #[param(
        display = "Turtle speed",
        description = "How many more steps to show per frame; 0 draws the whole path at once",
        default = "1",
        validate = non_negative
    )]
    speed: i64,
    #[param(display = "Stroke Width", default = "1", validate = positive)]
    stroke_weight: i64,
    #[param(display = "Background Color", default = "#6b1a1a", required)]
    bg_color: Color,
    #[param(display = "Stroke Color", default = "#c98787", required)]
    stroke_color: Color,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Rule {
    /// Radians.
    turn: f64,
    step: f64,
    /// Units of 1/FOLD_DENOMINATOR degree per frame.
    fold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pose {
    x: f64,
    y: f64,
    heading: f64,
}

/// Reads the sequence as instructions for a turtle: each entry selects a
/// turn angle and a step length.
#[derive(Kind)]
#[kind(
    "Turtle",
    "Use a sequence to steer a virtual turtle that leaves a visible trail"
)]
pub struct Turtle {
    rules: HashMap<Element, Rule>,
    folding: bool,
    speed: i64,
    stroke_weight: f64,
    bg_color: Color,
    stroke_color: Color,
    /// Total steps, or `None` to keep growing.
    path_length: Option<i64>,
    origin: Pose,
    pose: Pose,
    /// Steps drawn so far.
    drawn: i64,
}

fn fit_rule_length(values: &[f64], len: usize, label: &str, status: &mut ValidationStatus) {
    if values.len() > len {
        status.add_warning(format!(
            "More entries ({}) in {label} than in domain ({len}); ignoring extras.",
            values.len()
        ));
    } else if values.len() < len {
        status.add_warning(format!(
            "Fewer entries ({}) in {label} than in domain ({len}); using trivial behaviour for missing terms.",
            values.len()
        ));
    }
}

impl Turtle {
    fn rule(&self, value: &Element) -> Rule {
        self.rules.get(value).copied().unwrap_or_default()
    }

    /// Moves `pose` by one entry; `frame` scales the folding increments.
    fn advance(&self, pose: Pose, value: &Element, frame: u64) -> Pose {
        let rule = self.rule(value);
        let fold = (frame as f64 * rule.fold).rem_euclid(360.0 * FOLD_DENOMINATOR) / FOLD_DENOMINATOR;
        let heading = pose.heading + rule.turn + fold.to_radians();
        Pose {
            x: pose.x + heading.cos() * rule.step,
            y: pose.y + heading.sin() * rule.step,
            heading,
        }
    }

    fn segment(ctx: &mut DrawContext<'_>, from: Pose, to: Pose) {
        ctx.surface.line(from.x, from.y, to.x, to.y);
    }

    fn target_length(&self) -> i64 {
        match (self.speed, self.path_length) {
            (0, Some(total)) => total,
            (speed, Some(total)) => (self.drawn + speed).min(total),
            (speed, None) => self.drawn + speed,
        }
    }

    fn draw_growing(&mut self, ctx: &mut DrawContext<'_>) -> Result<Frame, VisualizerError> {
        let target = self.target_length();
        let first = ctx.sequence.first();
        while self.drawn < target {
            let value = ctx.sequence.get_element(first.saturating_add(self.drawn))?;
            let next = self.advance(self.pose, &value, 0);
            Self::segment(ctx, self.pose, next);
            self.pose = next;
            self.drawn += 1;
        }
        if self.path_length.is_some_and(|total| self.drawn >= total) {
            debug!(steps = self.drawn, "turtle path complete");
            return Ok(Frame::Stopped);
        }
        Ok(Frame::Continue)
    }

    /// Redraws the whole path with the turn angles bent by the frame count.
    fn draw_folding(&mut self, ctx: &mut DrawContext<'_>) -> Result<Frame, VisualizerError> {
        let target = self.target_length();
        let first = ctx.sequence.first();
        let values = (first..first.saturating_add(target))
            .map(|i| ctx.sequence.get_element(i))
            .collect::<Result<Vec<_>, _>>()?;
        ctx.surface.background(self.bg_color);
        let mut pose = self.origin;
        for value in &values {
            let next = self.advance(pose, value, ctx.frame);
            Self::segment(ctx, pose, next);
            pose = next;
        }
        self.pose = pose;
        self.drawn = target;
        Ok(Frame::Continue)
    }
}

impl VisualizerKind for Turtle {
    type Params = TurtleParams;

    fn check(params: &Self::Params, status: &mut ValidationStatus) {
        let len = params.domain.len();
        fit_rule_length(&params.turns, len, "Turning angles", status);
        fit_rule_length(&params.steps, len, "Step lengths", status);
        if params.fold_controls {
            fit_rule_length(&params.folds, len, "Folding rates", status);
        }
    }

    fn create(params: Self::Params) -> Self {
        let at = |values: &[f64], i: usize| values.get(i).copied().unwrap_or(0.0);
        let rules: HashMap<Element, Rule> = params
            .domain
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let fold = if params.fold_controls {
                    at(&params.folds, i)
                } else {
                    0.0
                };
                let rule = Rule {
                    turn: at(&params.turns, i) * PI / 180.0,
                    step: at(&params.steps, i),
                    fold,
                };
                (value.clone(), rule)
            })
            .collect();
        let folding = rules.values().any(|rule| rule.fold != 0.0);
        let origin = Pose {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
        };
        Self {
            rules,
            folding,
            speed: params.speed,
            stroke_weight: params.stroke_weight as f64,
            bg_color: params.bg_color,
            stroke_color: params.stroke_color,
            path_length: None,
            origin,
            pose: origin,
            drawn: 0,
        }
    }

    fn bind(
        &mut self,
        sequence: &dyn Sequence,
        status: &mut ValidationStatus,
    ) -> Result<(), VisualizerError> {
        self.path_length = sequence
            .len()
            .map(|len| i64::try_from(len).unwrap_or(i64::MAX));
        if self.path_length.is_none() && self.speed == 0 {
            status.add_warning(format!(
                "To draw without growth, the sequence must be finite; showing only {MAX_STATIC_STEPS} terms."
            ));
            self.path_length = Some(MAX_STATIC_STEPS);
        }
        Ok(())
    }

    fn setup(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), VisualizerError> {
        self.origin = Pose {
            x: ctx.surface.width() / 2.0,
            y: ctx.surface.height() / 2.0,
            heading: 0.0,
        };
        self.pose = self.origin;
        self.drawn = 0;
        ctx.surface.background(self.bg_color);
        ctx.surface.stroke(Some(self.stroke_color));
        ctx.surface.stroke_weight(self.stroke_weight);
        Ok(())
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<Frame, VisualizerError> {
        if self.folding {
            self.draw_folding(ctx)
        } else {
            self.draw_growing(ctx)
        }
    }
}
