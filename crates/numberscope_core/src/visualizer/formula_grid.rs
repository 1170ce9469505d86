//! Formula Grid: fills the cells of a grid, in a chosen order, with shapes
//! and colors computed by a user formula.
//!
//! Every formula sees the same symbols:
//!
//! | symbol    | meaning                                              |
//! |-----------|------------------------------------------------------|
//! | `k`       | serial number of the cell, from 1                    |
//! | `x`, `y`  | column and row of the cell, from 1                   |
//! | `s`       | position of the cell along the spiral, from 1        |
//! | `r`, `c`  | number of rows and columns                           |
//! | `m`, `M`  | first and last index of the sequence                 |
//! | `n`, `a`  | current index (`m + k - 1`) and its entry            |
//! | `f`       | frame number                                         |
//! | `A(i)`    | entry `i` of the sequence                            |
//! | `spiralX(k)`, `spiralY(k)` | cell visited at step `k` of the spiral |
//!
//! The fill formula yields a color, an array of colors to overlay, or a map
//! from shape names to colors. A zero or `false` color draws nothing.

use super::{DrawContext, Frame, VisualizerError, VisualizerKind};
use crate::color::Color;
use crate::formula::{Formula, FormulaScope, FormulaValue};
use crate::params::{ParamValue, positive};
use crate::sequence::{Sequence, SequenceError};
use crate::spiral;
use crate::types::to_f64;
use crate::validation::ValidationStatus;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::debug;

pub const GRID_SYMBOLS: &[&str] = &[
    "x", "y", "s", "r", "c", "k", "m", "M", "n", "a", "f", "A", "spiralX", "spiralY",
];

lazy_static! {
    static ref RE_ASPECT: Regex = Regex::new(r"^\d*(\.\d*)?$").unwrap();
    static ref RE_INSET_SHAPE: Regex = Regex::new(r"square|circle").unwrap();
    static ref BY_ROWS_PATH: Formula = Formula::compile("[x, y]", GRID_SYMBOLS).unwrap();
    static ref SPIRAL_PATH: Formula =
        Formula::compile("[spiralX(k), spiralY(k)]", GRID_SYMBOLS).unwrap();
    static ref TRIANGLE_PATH: Formula = Formula::compile(
        "[ceil(c/2) - invTriangular(k-1) + 2*(k - triangular(invTriangular(k-1)) - 1), \
         invTriangular(k-1) + 1]",
        GRID_SYMBOLS
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ParamEnum)]
pub enum FillOrder {
    ByRows,
    Spiral,
    Triangle,
    Custom,
}

fn check_dimensions(value: &ParamValue, status: &mut ValidationStatus) {
    let ParamValue::NumberArray(dimensions) = value else {
        return;
    };
    status.forbid(
        dimensions.len() > 2,
        "Just number of rows and number of columns may be specified",
    );
    status.mandate(
        dimensions.iter().all(|d| *d > 0.0),
        "Each dimension must be positive",
    );
    status.mandate(
        dimensions.iter().all(|d| d.fract() == 0.0),
        "Each dimension must be an integer",
    );
}

fn check_aspect(value: &ParamValue, status: &mut ValidationStatus) {
    let ParamValue::Text(aspect) = value else {
        return;
    };
    status.mandate(
        parse_aspect(aspect).is_some(),
        "Must be a positive number or the letter `r`",
    );
}

/// Cell width over height; blank means 1 and `r` means 1/√3.
fn parse_aspect(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(1.0);
    }
    if text.starts_with(['r', 'R']) {
        return Some(1.0 / 3f64.sqrt());
    }
    if !RE_ASPECT.is_match(text) {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| *v > 0.0)
}

fn uses_inset(value: &ParamValue) -> bool {
    matches!(value, ParamValue::Formula(f) if RE_INSET_SHAPE.is_match(f.source()))
}

#[derive(Params)]
pub struct FormulaGridParams {
    #[param(
        display = "Dimensions",
        description = "Number of rows, or number of rows and number of columns, to divide \
                       the canvas into. If unspecified, as much of the sequence as reasonably \
                       fits is shown.",
        validate = check_dimensions
    )]
    dimensions: Vec<f64>,
    #[param(
        display = "Cell aspect",
        description = "Cell aspect ratio (width/height). If unspecified, the grid fills the \
                       canvas. Use `r` to make hexagons and triangles regular.",
        validate = check_aspect
    )]
    aspect: String,
    #[param(display = "Fill order", default = "ByRows", required)]
    fill_order: FillOrder,
    #[param(
        display = "Path formula",
        description = "Coordinates [x, y] of the k-th cell filled; x, y and s are computed \
                       as if filling by rows",
        default = "[x, y]",
        symbols = GRID_SYMBOLS,
        visible_if = "fillOrder",
        visible_value = "Custom"
    )]
    path_formula: Formula,
    #[param(display = "Background color", default = "#FFFFFF", required)]
    background_color: Color,
    #[param(
        display = "Speed",
        description = "Cells filled per animation frame",
        default = "32",
        validate = positive
    )]
    speed: i64,
    #[param(
        display = "Fill formula",
        description = "A color, an array of colors, or a map from shape names (rectangle, \
                       square, ellipse, circle, hexagon, triangle, text, mouseover) to colors",
        default = "a",
        symbols = GRID_SYMBOLS,
        required
    )]
    fill_formula: Formula,
    #[param(
        display = "Inset formula",
        description = "Size of the circle and square shapes as a multiple of the short side \
                       of a cell",
        default = "0.6",
        symbols = GRID_SYMBOLS,
        visible_if = "fillFormula",
        visible_predicate = uses_inset
    )]
    inset: Formula,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Rectangle,
    Square,
    Ellipse,
    Circle,
    Hexagon,
    Triangle,
    Text,
    Mouseover,
}

impl Shape {
    fn from_key(key: &str) -> Option<Shape> {
        Some(match key {
            "rectangle" => Shape::Rectangle,
            "square" => Shape::Square,
            "ellipse" => Shape::Ellipse,
            "circle" => Shape::Circle,
            "hexagon" => Shape::Hexagon,
            "triangle" => Shape::Triangle,
            "text" => Shape::Text,
            "mouseover" => Shape::Mouseover,
            _ => return None,
        })
    }
}

/// Pixel geometry of one cell.
#[derive(Debug, Clone, Copy)]
struct Cell {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    min: f64,
}

impl Cell {
    fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Symbol bindings for one cell. Sequence failures inside `A(..)` are kept
/// aside and reported once evaluation returns; an index outside the sequence
/// reads as NaN and only warns.
struct GridScope<'a> {
    sequence: &'a dyn Sequence,
    rows: u64,
    cols: u64,
    x: f64,
    y: f64,
    s: f64,
    k: f64,
    n: f64,
    a: f64,
    frame: f64,
    error: RefCell<Option<SequenceError>>,
    outside: RefCell<Option<i64>>,
}

impl GridScope<'_> {
    /// Fails with the first sequence error met while evaluating, and turns
    /// the first out-of-range lookup into a warning.
    fn settle(&self, status: &mut ValidationStatus) -> Result<(), SequenceError> {
        if let Some(n) = self.outside.borrow_mut().take() {
            let warning = format!("A({n}) is outside the sequence; treating it as NaN.");
            if !status.warnings.contains(&warning) {
                status.add_warning(warning);
            }
        }
        match self.error.borrow_mut().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn spiral_position(&self, k: f64) -> Option<(u64, u64)> {
        if !k.is_finite() || k < 1.0 {
            return None;
        }
        spiral::position(k as u64 - 1, self.rows, self.cols)
    }

    fn place(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.s = spiral_serial(x, y, self.rows, self.cols);
    }
}

impl FormulaScope for GridScope<'_> {
    fn variable(&self, name: &str) -> Option<f64> {
        match name {
            "x" => Some(self.x),
            "y" => Some(self.y),
            "s" => Some(self.s),
            "r" => Some(self.rows as f64),
            "c" => Some(self.cols as f64),
            "k" => Some(self.k),
            "m" => Some(self.sequence.first() as f64),
            "M" => Some(self.sequence.last().map_or(f64::INFINITY, |last| last as f64)),
            "n" => Some(self.n),
            "a" => Some(self.a),
            "f" => Some(self.frame),
            _ => None,
        }
    }

    fn call(&self, name: &str, args: &[f64]) -> Option<f64> {
        match (name, args) {
            ("A", [index]) => match self.sequence.get_element(*index as i64) {
                Ok(value) => Some(to_f64(&value)),
                Err(SequenceError::OutOfRange { n, .. }) => {
                    self.outside.borrow_mut().get_or_insert(n);
                    Some(f64::NAN)
                }
                Err(e) => {
                    self.error.borrow_mut().get_or_insert(e);
                    Some(f64::NAN)
                }
            },
            ("spiralX", [k]) => self.spiral_position(*k).map(|(x, _)| x as f64),
            ("spiralY", [k]) => self.spiral_position(*k).map(|(_, y)| y as f64),
            _ => None,
        }
    }
}

/// 1-based spiral serial number of a cell, or 0 off the grid.
fn spiral_serial(x: f64, y: f64, rows: u64, cols: u64) -> f64 {
    if x < 1.0 || y < 1.0 {
        return 0.0;
    }
    spiral::index(x as u64, y as u64, rows, cols).map_or(0.0, |i| (i + 1) as f64)
}

fn grid_position(value: &FormulaValue) -> Option<(f64, f64)> {
    match value {
        FormulaValue::List(items) => match items.as_slice() {
            [x, y] => Some((x.as_number()?, y.as_number()?)),
            _ => None,
        },
        FormulaValue::Shapes(entries) => {
            let coordinate = |key: &str| {
                entries
                    .iter()
                    .find(|(k, _)| k == key)
                    .and_then(|(_, v)| v.as_number())
            };
            Some((coordinate("x")?, coordinate("y")?))
        }
        FormulaValue::Number(_) => None,
    }
}

/// Splits a fill value into the shapes to draw. Anything that is not a map
/// of known shape names fills the whole cell.
fn shapes_of(value: FormulaValue) -> Vec<(Shape, FormulaValue)> {
    if let FormulaValue::Shapes(entries) = &value {
        let shapes: Option<Vec<_>> = entries
            .iter()
            .map(|(key, v)| Some((Shape::from_key(key)?, v.clone())))
            .collect();
        if let Some(shapes) = shapes {
            return shapes;
        }
    }
    vec![(Shape::Rectangle, value)]
}

#[derive(Kind)]
#[kind(
    "Formula Grid",
    "Fill the cells of a grid using shapes and colors determined by a formula"
)]
pub struct FormulaGrid {
    order: FillOrder,
    path: Formula,
    fill: Formula,
    inset: Formula,
    dimensions: Vec<f64>,
    aspect: Option<f64>,
    background: Color,
    speed: i64,
    rows: u64,
    cols: u64,
    cell_width: f64,
    cell_height: f64,
    cell_min: f64,
    /// Serial number of the next cell, from 1.
    index: i64,
    hover: HashMap<(u64, u64), String>,
}

impl FormulaGrid {
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn columns(&self) -> u64 {
        self.cols
    }

    /// Text recorded by a `mouseover` shape for cell `(x, y)`.
    pub fn hover_text(&self, x: u64, y: u64) -> Option<&str> {
        self.hover.get(&(x, y)).map(String::as_str)
    }

    /// Chooses the grid size and cell geometry for a canvas of the given size.
    fn lay_out(&mut self, width: f64, height: f64, len: Option<u64>) {
        let aspect = self.aspect.unwrap_or(1.0);
        match *self.dimensions.as_slice() {
            [rows, cols] => {
                self.rows = rows as u64;
                self.cols = cols as u64;
                if let Some(aspect) = self.aspect {
                    self.cell_height = (height / rows).min(width / (cols * aspect));
                    self.cell_width = aspect * self.cell_height;
                } else {
                    self.cell_width = width / cols;
                    self.cell_height = height / rows;
                }
            }
            [rows] => {
                self.rows = rows as u64;
                self.cell_height = height / rows;
                self.cell_width = aspect * self.cell_height;
                self.cols = ((width / self.cell_width).floor() as u64).max(1);
            }
            _ => {
                let columns_per_row = width / height / aspect;
                let entries = match len {
                    Some(len) => len as f64,
                    None => ((height / 8.0).powi(2) * columns_per_row).floor(),
                };
                self.rows = ((entries / columns_per_row).sqrt().floor() as u64).max(1);
                self.cell_height = height / self.rows as f64;
                self.cell_width = aspect * self.cell_height;
                if self.cell_width.min(self.cell_height) < 0.5 {
                    if aspect < 1.0 {
                        self.cell_width = 1.0;
                        self.cell_height = 1.0 / aspect;
                    } else {
                        self.cell_height = 1.0;
                        self.cell_width = aspect;
                    }
                    self.rows = ((height / self.cell_height).floor() as u64).max(1);
                }
                self.cols = ((width / self.cell_width).floor() as u64).max(1);
            }
        }
        self.cell_min = self.cell_width.min(self.cell_height);
    }

    fn cell(&self, x: f64, y: f64) -> Cell {
        Cell {
            x: (x - 1.0) * self.cell_width,
            y: (y - 1.0) * self.cell_height,
            width: self.cell_width,
            height: self.cell_height,
            min: self.cell_min,
        }
    }

    /// Fills the next cell along the path.
    fn fill_next(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), VisualizerError> {
        let k = self.index;
        let first = ctx.sequence.first();
        let n = first
            .checked_add(k - 1)
            .ok_or(SequenceError::IndexOverflow { n: first })?;
        let a = ctx.sequence.get_element(n)?;
        let cols = self.cols as i64;
        let mut scope = GridScope {
            sequence: ctx.sequence,
            rows: self.rows,
            cols: self.cols,
            x: 0.0,
            y: 0.0,
            s: 0.0,
            k: k as f64,
            n: n as f64,
            a: to_f64(&a),
            frame: ctx.frame as f64,
            error: RefCell::new(None),
            outside: RefCell::new(None),
        };
        scope.place(((k - 1) % cols + 1) as f64, ((k - 1) / cols + 1) as f64);

        let position = self.path.evaluate(&scope);
        scope.settle(ctx.status)?;
        let position = position?;
        let (x, y) = grid_position(&position).ok_or_else(|| {
            VisualizerError::Configuration(
                "Path formula: must return [x, y] or {x: .., y: ..}".to_string(),
            )
        })?;
        if x < 1.0 || x > self.cols as f64 || y < 1.0 || y > self.rows as f64 {
            return Ok(());
        }
        scope.place(x, y);

        let value = self.fill.evaluate(&scope);
        scope.settle(ctx.status)?;
        let value = value?;
        let cell = self.cell(x, y);
        let mut latest = self.background;
        for (shape, paint) in shapes_of(value) {
            match shape {
                Shape::Mouseover => {
                    self.hover.insert((x as u64, y as u64), paint.to_text());
                    continue;
                }
                Shape::Text => {
                    ctx.surface.fill(Some(latest.contrasting_text()));
                }
                _ => {
                    let Some(color) = paint.to_color() else {
                        latest = Color::TRANSPARENT;
                        continue;
                    };
                    latest = color;
                    ctx.surface.fill(Some(color));
                }
            }
            let inset = match shape {
                Shape::Square | Shape::Circle => {
                    let inset = self.inset.evaluate_number(&scope);
                    scope.settle(ctx.status)?;
                    inset?
                }
                _ => 1.0,
            };
            draw_shape(ctx, shape, &cell, (x, y), inset, &paint);
        }
        Ok(())
    }
}

fn draw_shape(
    ctx: &mut DrawContext<'_>,
    shape: Shape,
    cell: &Cell,
    (x, y): (f64, f64),
    inset: f64,
    paint: &FormulaValue,
) {
    let Cell {
        x: cx,
        y: cy,
        width: cw,
        height: ch,
        min: cm,
    } = *cell;
    let (mid_x, mid_y) = cell.center();
    match shape {
        Shape::Rectangle => ctx.surface.rect(cx, cy, cw, ch),
        Shape::Square => {
            let side = cm * inset;
            ctx.surface
                .rect(cx + (cw - side) / 2.0, cy + (ch - side) / 2.0, side, side);
        }
        Shape::Ellipse => ctx.surface.ellipse(mid_x, mid_y, cw, ch),
        Shape::Circle => ctx.surface.circle(mid_x, mid_y, cm * inset),
        // Twice as wide and 4/3 as tall as the cell it circumscribes.
        Shape::Hexagon => ctx.surface.polygon(&[
            (cx + cw / 2.0, cy - ch / 6.0),
            (cx + 1.5 * cw, cy + ch / 6.0),
            (cx + 1.5 * cw, cy + 5.0 * ch / 6.0),
            (cx + cw / 2.0, cy + 7.0 * ch / 6.0),
            (cx - cw / 2.0, cy + 5.0 * ch / 6.0),
            (cx - cw / 2.0, cy + ch / 6.0),
        ]),
        Shape::Triangle => {
            let same_parity = (x as i64).rem_euclid(2) == (y as i64).rem_euclid(2);
            let base = if same_parity { cy + ch } else { cy };
            let peak = 2.0 * cy + ch - base;
            ctx.surface
                .triangle((cx - cw / 2.0, base), (cx + cw / 2.0, peak), (cx + 1.5 * cw, base));
        }
        Shape::Text => {
            let text = paint.to_text();
            let size = ch / if text.chars().count() > 4 { 4.0 } else { 2.0 };
            ctx.surface.text(&text, mid_x, mid_y, size);
        }
        Shape::Mouseover => {}
    }
}

impl VisualizerKind for FormulaGrid {
    type Params = FormulaGridParams;

    fn create(params: Self::Params) -> Self {
        let path = match params.fill_order {
            FillOrder::ByRows => BY_ROWS_PATH.clone(),
            FillOrder::Spiral => SPIRAL_PATH.clone(),
            FillOrder::Triangle => TRIANGLE_PATH.clone(),
            FillOrder::Custom => params.path_formula,
        };
        let aspect = if params.aspect.trim().is_empty() {
            None
        } else {
            parse_aspect(&params.aspect)
        };
        Self {
            order: params.fill_order,
            path,
            fill: params.fill_formula,
            inset: params.inset,
            dimensions: params.dimensions,
            aspect,
            background: params.background_color,
            speed: params.speed,
            rows: 1,
            cols: 1,
            cell_width: 0.0,
            cell_height: 0.0,
            cell_min: 0.0,
            index: 1,
            hover: HashMap::new(),
        }
    }

    fn setup(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), VisualizerError> {
        self.lay_out(ctx.surface.width(), ctx.surface.height(), ctx.sequence.len());
        debug!(
            rows = self.rows,
            columns = self.cols,
            order = self.order.option_name(),
            "formula grid laid out"
        );
        self.index = 1;
        self.hover.clear();
        ctx.surface.no_stroke();
        ctx.surface.background(self.background);
        Ok(())
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<Frame, VisualizerError> {
        for _ in 0..self.speed {
            let filled = self.order != FillOrder::Custom
                && self.index as u64 > self.rows.saturating_mul(self.cols);
            let exhausted = ctx
                .sequence
                .last()
                .is_some_and(|last| ctx.sequence.first().saturating_add(self.index - 1) > last);
            if filled || exhausted {
                return Ok(Frame::Stopped);
            }
            self.fill_next(ctx)?;
            self.index += 1;
        }
        Ok(Frame::Continue)
    }
}
