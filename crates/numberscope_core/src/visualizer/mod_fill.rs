use super::{DrawContext, Frame, VisualizerError, VisualizerKind};
use crate::color::Color;
use crate::formula::Formula;
use crate::params::{ParamValue, positive, unit_interval};
use crate::types::{Element, to_f64};
use num::Integer;
use tracing::debug;

/// Inputs of the opacity and highlight formulas.
pub const MOD_FILL_SYMBOLS: &[&str] = &["n", "a", "m"];

fn nontrivial_formula(value: &ParamValue) -> bool {
    matches!(value, ParamValue::Formula(f) if !matches!(f.source(), "" | "0" | "false"))
}

#[derive(Params)]
pub struct ModFillParams {
    #[param(
        display = "Highest modulus shown",
        description = "Number of columns, which is the largest modulus considered",
        default = "150",
        required,
        validate = positive
    )]
    mod_dimension: i64,
    #[param(display = "Background color", default = "#FFFFFF", required)]
    background_color: Color,
    #[param(
        display = "Fill color",
        description = "The color used to fill each cell by default",
        default = "#000000",
        required
    )]
    fill_color: Color,
    #[param(
        display = "Opacity",
        description = "Opacity of each new rectangle, between 0 (transparent) and 1 (solid). \
                       May use n (index), a (entry) and m (modulus).",
        default = "1",
        symbols = MOD_FILL_SYMBOLS
    )]
    alpha: Formula,
    #[param(
        rename = "aspectRatio",
        display = "Square canvas",
        description = "Use a square region of the canvas",
        default = "false"
    )]
    square_canvas: bool,
    #[param(
        display = "Highlighting",
        description = "When odd (or true), the residue of a(n) is drawn in the highlight \
                       color. May use n (index), a (entry) and m (modulus).",
        default = "false",
        symbols = MOD_FILL_SYMBOLS
    )]
    highlight_formula: Formula,
    #[param(
        display = "Highlight color",
        default = "#c98787",
        required,
        visible_if = "highlightFormula",
        visible_predicate = nontrivial_formula
    )]
    high_color: Color,
    #[param(
        display = "Highlight opacity",
        description = "Opacity of highlighted rectangles; the Opacity formula is used when blank",
        symbols = MOD_FILL_SYMBOLS,
        visible_if = "highlightFormula",
        visible_predicate = nontrivial_formula
    )]
    alpha_high: Formula,
    #[param(
        display = "Sunzi effect",
        description = "Opacity of the background painted between terms. 0 has no effect, \
                       1 blanks the canvas so only one term shows, small values fade history.",
        default = "0",
        validate = unit_interval
    )]
    sunzi: f64,
}

/// Columns of residues: the m-th column has m cells, and the cell of
/// `a(n) mod m` is filled for every entry in turn.
#[derive(Kind)]
#[kind("Mod Fill", "An array showing which residues occur, for each modulus")]
pub struct ModFill {
    params: ModFillParams,
    columns: i64,
    width: f64,
    height: f64,
    rect_width: f64,
    rect_height: f64,
    fade: Color,
    next: i64,
}

impl ModFill {
    fn draw_residues(
        &self,
        ctx: &mut DrawContext<'_>,
        n: i64,
        value: Element,
    ) -> Result<(), VisualizerError> {
        let p = &self.params;
        let mut x = 0.0;
        for m in 1..=self.columns {
            let scope = [("n", n as f64), ("a", to_f64(&value)), ("m", m as f64)];
            let high = p.highlight_formula.evaluate(&scope)?.is_truthy();
            let (color, alpha) = if high && !p.alpha_high.is_empty() {
                (p.high_color, &p.alpha_high)
            } else if high {
                (p.high_color, &p.alpha)
            } else {
                (p.fill_color, &p.alpha)
            };
            let opacity = alpha.evaluate_number(&scope)?;
            ctx.surface.fill(Some(color.with_alpha(opacity)));
            let residue = value.mod_floor(&Element::from(m));
            let y = self.height - (to_f64(&residue) + 1.0) * self.rect_height;
            ctx.surface.rect(x, y, self.rect_width, self.rect_height);
            x += self.rect_width;
        }
        Ok(())
    }
}

impl VisualizerKind for ModFill {
    type Params = ModFillParams;

    fn create(params: Self::Params) -> Self {
        Self {
            params,
            columns: 1,
            width: 0.0,
            height: 0.0,
            rect_width: 0.0,
            rect_height: 0.0,
            fade: Color::TRANSPARENT,
            next: 0,
        }
    }

    fn setup(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), VisualizerError> {
        let (mut width, mut height) = (ctx.surface.width(), ctx.surface.height());
        if self.params.square_canvas {
            width = width.min(height);
            height = width;
        }
        // Columns narrower than 1/16 of a pixel are invisible.
        let max_modulus = ((16.0 * width.min(height)) as i64).max(1);
        if self.params.mod_dimension > max_modulus {
            ctx.status.add_warning(format!(
                "Highest modulus shown: running with maximum modulus {max_modulus}, since {} will not fit on screen",
                self.params.mod_dimension
            ));
            self.columns = max_modulus;
        } else {
            self.columns = self.params.mod_dimension;
        }
        self.width = width;
        self.height = height;
        self.rect_width = width / self.columns as f64;
        self.rect_height = height / self.columns as f64;
        self.fade = self.params.background_color.with_alpha(self.params.sunzi);
        self.next = ctx.sequence.first();

        ctx.surface.no_stroke();
        ctx.surface.background(self.params.background_color);
        Ok(())
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<Frame, VisualizerError> {
        if ctx.sequence.last().is_some_and(|last| self.next > last) {
            debug!(index = self.next, "mod fill reached the end of the sequence");
            return Ok(Frame::Stopped);
        }
        let value = ctx.sequence.get_element(self.next)?;
        if self.params.sunzi > 0.0 {
            ctx.surface.fill(Some(self.fade));
            ctx.surface.rect(0.0, 0.0, self.width, self.height);
        }
        self.draw_residues(ctx, self.next, value)?;
        self.next += 1;
        Ok(Frame::Continue)
    }
}
