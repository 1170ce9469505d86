//! Grid: lays the sequence out along an Ulam spiral or in rows and colors
//! each cell by the number-theoretic properties its entry has.
//!
//! Up to [`MAX_PROPERTIES`] properties can be highlighted at once. Each one
//! either fills the whole cell or a box in its middle; among properties with
//! the same display, the later one wins.

use super::{DrawContext, Frame, VisualizerError, VisualizerKind};
use crate::color::Color;
use crate::factor::{Factorization, divisor_sum, simple_factor};
use crate::params::{
    ParamError, ParamField, ParamKind, ParamSchema, ParamSet, ParamValue, Settings, VisibleWhen,
    Visibility, positive,
};
use crate::sequence::SequenceError;
use crate::types::Element;
use num::{Integer, One, Signed, Zero};
use tracing::debug;

pub const MAX_PROPERTIES: usize = 12;

/// Cells drawn when entries are shown as text.
pub const MAX_LABELLED_CELLS: i64 = 400;

const RED: Color = Color::rgb(0xff, 0x57, 0x33);
const ORANGE: Color = Color::rgb(0xff, 0x9d, 0x33);
const YELLOW: Color = Color::rgb(0xe6, 0xff, 0x33);
const GREEN: Color = Color::rgb(0x14, 0xcd, 0x33);
const BLUE: Color = Color::rgb(0x33, 0x88, 0xff);
const PURPLE: Color = Color::rgb(0x88, 0x14, 0xcd);

const RAINBOW: [Color; 10] = [
    Color::rgb(0xff, 0x00, 0x00),
    Color::rgb(0xff, 0x67, 0x00),
    Color::rgb(0xff, 0xe0, 0x00),
    Color::rgb(0x51, 0xff, 0x00),
    Color::rgb(0x00, 0xf4, 0xe8),
    Color::rgb(0x00, 0xb1, 0xff),
    Color::rgb(0x00, 0x55, 0xff),
    Color::rgb(0xc0, 0x00, 0xff),
    Color::rgb(0xff, 0x00, 0xf9),
    Color::rgb(0xff, 0x00, 0x80),
];

/// `property{i}`, `prop{i}Vis`, `prop{i}Color`, `prop{i}Aux` and the
/// defaults of the last three.
struct Slot {
    names: [&'static str; 4],
    title: &'static str,
    display: &'static str,
    color: &'static str,
}

const SLOTS: [Slot; MAX_PROPERTIES] = [
    Slot { names: ["property0", "prop0Vis", "prop0Color", "prop0Aux"], title: "Property 1", display: "FillCell", color: "#ff5733" },
    Slot { names: ["property1", "prop1Vis", "prop1Color", "prop1Aux"], title: "Property 2", display: "BoxInCell", color: "#ff9d33" },
    Slot { names: ["property2", "prop2Vis", "prop2Color", "prop2Aux"], title: "Property 3", display: "FillCell", color: "#e6ff33" },
    Slot { names: ["property3", "prop3Vis", "prop3Color", "prop3Aux"], title: "Property 4", display: "FillCell", color: "#14cd33" },
    Slot { names: ["property4", "prop4Vis", "prop4Color", "prop4Aux"], title: "Property 5", display: "FillCell", color: "#3388ff" },
    Slot { names: ["property5", "prop5Vis", "prop5Color", "prop5Aux"], title: "Property 6", display: "FillCell", color: "#8814cd" },
    Slot { names: ["property6", "prop6Vis", "prop6Color", "prop6Aux"], title: "Property 7", display: "FillCell", color: "#00ffff" },
    Slot { names: ["property7", "prop7Vis", "prop7Color", "prop7Aux"], title: "Property 8", display: "FillCell", color: "#ff00ff" },
    Slot { names: ["property8", "prop8Vis", "prop8Color", "prop8Aux"], title: "Property 9", display: "FillCell", color: "#9bbf30" },
    Slot { names: ["property9", "prop9Vis", "prop9Color", "prop9Aux"], title: "Property 10", display: "FillCell", color: "#7f00ff" },
    Slot { names: ["property10", "prop10Vis", "prop10Color", "prop10Aux"], title: "Property 11", display: "FillCell", color: "#ffdb58" },
    Slot { names: ["property11", "prop11Vis", "prop11Color", "prop11Aux"], title: "Property 12", display: "FillCell", color: "#808080" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ParamEnum)]
pub enum Preset {
    Custom,
    Primes,
    AbundantNumbers,
    AbundantNumbersAndPrimes,
    PolygonalNumbers,
    ColorByLastDigit1,
    ColorByLastDigit2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ParamEnum)]
pub enum PathType {
    Spiral,
    Rows,
    /// Rows that each restart at the first index, adding the row number
    /// to the entries.
    RowsAugment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ParamEnum)]
pub enum Property {
    None,
    Prime,
    Negative,
    Even,
    Odd,
    DivisibleBy,
    LastDigitIs,
    PolygonalNumber,
    SumOfTwoSquares,
    Abundant,
    Perfect,
    Deficient,
    SemiPrime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ParamEnum)]
pub enum CellStyle {
    FillCell,
    BoxInCell,
}

impl Property {
    fn needs_factors(self) -> bool {
        matches!(
            self,
            Property::Prime
                | Property::SumOfTwoSquares
                | Property::SemiPrime
                | Property::Abundant
                | Property::Perfect
                | Property::Deficient
        )
    }

    fn takes_aux(self) -> bool {
        matches!(
            self,
            Property::DivisibleBy | Property::LastDigitIs | Property::PolygonalNumber
        )
    }

    fn holds_for_value(self, value: &Element, aux: &Element) -> bool {
        match self {
            Property::Negative => value.is_negative(),
            Property::Even => value.is_even(),
            Property::Odd => value.is_odd(),
            Property::DivisibleBy if aux.is_zero() => value.is_zero(),
            Property::DivisibleBy => (value % aux).is_zero(),
            Property::LastDigitIs => {
                let digit = value % Element::from(10);
                if value.is_negative() { digit == -aux } else { &digit == aux }
            }
            Property::PolygonalNumber => is_polygonal(value, aux),
            _ => false,
        }
    }

    /// Properties read off the factorization of `value`.
    fn holds_for_factors(self, value: &Element, factors: &Factorization) -> bool {
        let powers: Vec<u32> = factors.iter().map(|(_, power)| *power).collect();
        let negative = factors.first().is_some_and(|(p, _)| *p == -Element::one());
        let positive_part = if negative { &powers[1..] } else { &powers[..] };
        match self {
            Property::Prime => {
                factors.iter().all(|(p, _)| !p.is_zero()) && positive_part == [1]
            }
            Property::SemiPrime => {
                factors.iter().all(|(p, _)| !p.is_zero())
                    && (positive_part == [2] || positive_part == [1, 1])
            }
            Property::SumOfTwoSquares => {
                // No prime 3 mod 4 to an odd power.
                let (three, four) = (Element::from(3), Element::from(4));
                !negative
                    && !factors
                        .iter()
                        .any(|(p, power)| p.mod_floor(&four) == three && power % 2 == 1)
            }
            Property::Abundant | Property::Perfect | Property::Deficient => {
                let size = value.abs();
                // 0 counts as abundant.
                let proper = if size.is_zero() {
                    Element::one()
                } else {
                    divisor_sum(factors) - &size
                };
                match self {
                    Property::Abundant => proper > size,
                    Property::Perfect => value > &Element::one() && proper == size,
                    _ => proper < size,
                }
            }
            _ => false,
        }
    }
}

/// Whether `value` dots make a regular polygon with `sides` sides, that is,
/// `value` is `((sides - 2) i^2 - (sides - 4) i) / 2` for some `i >= 1`.
fn is_polygonal(value: &Element, sides: &Element) -> bool {
    if value.is_negative() || sides < &Element::from(2) {
        return false;
    }
    let two = Element::from(2);
    let dots = |i: &Element| (sides - &two) * (i * (i - Element::one())) / &two + i;
    let (mut low, mut high) = (Element::one(), value.clone() + Element::one());
    while low < high {
        let mid: Element = (&low + &high) / &two;
        if &dots(&mid) < value {
            low = mid + Element::one();
        } else {
            high = mid;
        }
    }
    &dots(&low) == value
}

fn chosen(value: &ParamValue) -> bool {
    !value.to_raw().eq_ignore_ascii_case(Property::None.option_name())
}

fn takes_aux(value: &ParamValue) -> bool {
    Property::from_value(value).is_some_and(Property::takes_aux)
}

#[derive(Params)]
pub struct GridLayout {
    #[param(
        display = "Presets",
        description = "If a preset is selected, the properties below no longer apply",
        default = "Custom",
        required
    )]
    preset: Preset,
    #[param(
        display = "Grid cells",
        description = "Rounded down to a square; display slows down over 10,000 cells",
        default = "4096",
        required,
        validate = positive
    )]
    amount_of_numbers: i64,
    #[param(display = "Starting Index", default = "0", required)]
    starting_index: i64,
    #[param(display = "Path in grid", default = "Spiral", required)]
    path_type: PathType,
    #[param(
        display = "Show numbers",
        description = "When true, the grid is limited to 400 cells",
        default = "false"
    )]
    show_numbers: bool,
    #[param(
        display = "Number color",
        default = "#ffffff",
        visible_if = "showNumbers",
        visible_value = "true"
    )]
    number_color: Color,
    #[param(display = "Background color", default = "#000000", required)]
    background_color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySetting {
    pub property: Property,
    pub display: CellStyle,
    pub color: Color,
    pub aux: Element,
}

impl PropertySetting {
    fn new(property: Property, color: Color) -> Self {
        Self {
            property,
            display: CellStyle::FillCell,
            color,
            aux: Element::from(3),
        }
    }

    fn with_aux(mut self, aux: i64) -> Self {
        self.aux = Element::from(aux);
        self
    }

    fn boxed(mut self) -> Self {
        self.display = CellStyle::BoxInCell;
        self
    }
}

/// The shared layout settings followed by the property slots.
pub struct GridParams {
    layout: GridLayout,
    properties: Vec<PropertySetting>,
}

fn entry(
    name: &'static str,
    kind: ParamKind,
    display_name: &'static str,
    default: &'static str,
    options: &'static [&'static str],
    visibility: Option<Visibility>,
) -> ParamSchema {
    ParamSchema {
        name,
        kind,
        display_name,
        description: "",
        default,
        required: false,
        validate: None,
        visibility,
        options,
        symbols: &[],
    }
}

fn slot_schema(index: usize, slot: &Slot) -> [ParamSchema; 4] {
    let [property, style, color, aux] = slot.names;
    let when = |dependency: &'static str, predicate: fn(&ParamValue) -> bool| {
        Some(Visibility {
            dependency,
            when: VisibleWhen::Predicate(predicate),
        })
    };
    // Each slot appears once the one before it is in use.
    let after_previous = match index.checked_sub(1) {
        Some(previous) => when(SLOTS[previous].names[0], chosen),
        None => None,
    };
    let first_default = if index == 0 { "Prime" } else { "None" };
    [
        entry(
            property,
            Property::KIND,
            slot.title,
            first_default,
            Property::OPTIONS,
            after_previous,
        ),
        entry(
            style,
            CellStyle::KIND,
            "Display",
            slot.display,
            CellStyle::OPTIONS,
            when(property, chosen),
        ),
        entry(color, Color::KIND, "Color", slot.color, &[], when(property, chosen)),
        ParamSchema {
            description: "Divisor, final digit or number of sides, as the property needs",
            ..entry(
                aux,
                <Element as ParamField>::KIND,
                "Auxiliary value",
                "3",
                &[],
                when(property, takes_aux),
            )
        },
    ]
}

impl ParamSet for GridParams {
    fn schema() -> Vec<ParamSchema> {
        let mut schema = GridLayout::schema();
        for (index, slot) in SLOTS.iter().enumerate() {
            schema.extend(slot_schema(index, slot));
        }
        schema
    }

    fn from_settings(settings: &Settings) -> Result<Self, ParamError> {
        let layout = GridLayout::from_settings(settings)?;
        let properties = SLOTS
            .iter()
            .map(|slot| {
                let [property, style, color, aux] = slot.names;
                Ok(PropertySetting {
                    property: settings.field(property)?,
                    display: settings.field(style)?,
                    color: settings.field(color)?,
                    aux: settings.field(aux)?,
                })
            })
            .collect::<Result<Vec<_>, ParamError>>()?;
        Ok(Self { layout, properties })
    }
}

/// Background and properties a preset stands for.
fn preset_properties(preset: Preset) -> Option<(Color, Vec<PropertySetting>)> {
    let by_last_digit = |boxed_odd: bool| -> Vec<PropertySetting> {
        RAINBOW
            .iter()
            .enumerate()
            .map(|(digit, color)| {
                let setting = PropertySetting::new(Property::LastDigitIs, *color)
                    .with_aux(digit as i64);
                if boxed_odd && digit % 2 == 1 { setting.boxed() } else { setting }
            })
            .collect()
    };
    let settings = match preset {
        Preset::Custom => return None,
        Preset::Primes => (Color::BLACK, vec![PropertySetting::new(Property::Prime, RED)]),
        Preset::AbundantNumbers => (
            Color::WHITE,
            vec![PropertySetting::new(Property::Abundant, Color::BLACK)],
        ),
        Preset::AbundantNumbersAndPrimes => (
            Color::WHITE,
            vec![
                PropertySetting::new(Property::Prime, RED),
                PropertySetting::new(Property::Abundant, Color::BLACK),
            ],
        ),
        Preset::PolygonalNumbers => (
            Color::BLACK,
            [RED, ORANGE, YELLOW, GREEN, BLUE, PURPLE]
                .into_iter()
                .zip(3..)
                .map(|(color, sides)| {
                    PropertySetting::new(Property::PolygonalNumber, color).with_aux(sides)
                })
                .collect(),
        ),
        Preset::ColorByLastDigit1 => (Color::BLACK, by_last_digit(false)),
        Preset::ColorByLastDigit2 => (Color::BLACK, by_last_digit(true)),
    };
    Some(settings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Right,
    Up,
    Left,
    Down,
    NewRow,
}

impl Direction {
    fn turned_left(self) -> Self {
        match self {
            Direction::Right => Direction::Up,
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down | Direction::NewRow => Direction::Right,
        }
    }
}

/// Walks the cells of a `side` by `side` grid in path order.
struct Walk {
    path: PathType,
    side: i64,
    x: i64,
    y: i64,
    direction: Direction,
    /// Spiral step at which to turn next.
    turn_at: i64,
    run: i64,
    grow_run: bool,
}

impl Walk {
    fn new(path: PathType, side: i64) -> Self {
        let (x, y) = match path {
            PathType::Spiral if side % 2 == 1 => ((side - 1) / 2, (side - 1) / 2),
            PathType::Spiral => (side / 2 - 1, side / 2),
            _ => (0, 0),
        };
        Self {
            path,
            side,
            x,
            y,
            direction: Direction::Right,
            turn_at: 1,
            run: 1,
            grow_run: true,
        }
    }

    fn starts_row(&self) -> bool {
        self.direction == Direction::NewRow
    }

    /// Moves past the cell visited at `step` (0-based).
    fn advance(&mut self, step: i64) {
        match self.path {
            PathType::Spiral => {
                if step == self.turn_at {
                    self.turn_at += self.run;
                    if self.grow_run {
                        self.run += 1;
                    }
                    self.grow_run = !self.grow_run;
                    self.direction = self.direction.turned_left();
                }
            }
            PathType::Rows | PathType::RowsAugment => {
                self.direction = if (step + 1) % self.side == 0 {
                    Direction::NewRow
                } else {
                    Direction::Right
                };
            }
        }
        match self.direction {
            Direction::Right => self.x += 1,
            Direction::Up => self.y -= 1,
            Direction::Left => self.x -= 1,
            Direction::Down => self.y += 1,
            Direction::NewRow => {
                self.x = 0;
                self.y += 1;
            }
        }
    }
}

/// Puts entries in a square grid, highlighting cells by their properties.
#[derive(Kind)]
#[kind(
    "Grid",
    "Puts numbers in a grid, highlighting cells based on various properties"
)]
pub struct Grid {
    layout: GridLayout,
    background: Color,
    properties: Vec<PropertySetting>,
    /// Cells per side, settled at setup.
    side: i64,
    scale: f64,
}

impl Grid {
    pub fn side(&self) -> i64 {
        self.side
    }

    /// Properties in effect once the preset is applied.
    pub fn properties(&self) -> &[PropertySetting] {
        &self.properties
    }

    fn first_index(&self, ctx: &DrawContext<'_>) -> i64 {
        self.layout.starting_index.max(ctx.sequence.first())
    }

    /// Whether `property` holds for the entry drawn at index `n`.
    fn holds(
        setting: &PropertySetting,
        ctx: &mut DrawContext<'_>,
        n: i64,
        value: &Element,
        augmented: bool,
    ) -> Result<bool, VisualizerError> {
        let property = setting.property;
        if !property.needs_factors() {
            return Ok(property.holds_for_value(value, &setting.aux));
        }
        let factors = if augmented {
            simple_factor(value)
        } else {
            ctx.sequence.get_factors(n)?
        };
        match factors {
            Some(factors) => Ok(property.holds_for_factors(value, &factors)),
            None => {
                let warning = format!(
                    "Factorization needed to test {} for {value} is unavailable; \
                     treating the property as absent.",
                    property.option_name()
                );
                if !ctx.status.warnings.contains(&warning) {
                    ctx.status.add_warning(warning);
                }
                Ok(false)
            }
        }
    }

    /// Fill color of the last property with the given display that holds.
    fn cell_color(
        &self,
        display: CellStyle,
        ctx: &mut DrawContext<'_>,
        n: i64,
        value: &Element,
        augmented: bool,
    ) -> Result<Option<Color>, VisualizerError> {
        let mut color = None;
        for setting in self
            .properties
            .iter()
            .filter(|s| s.property != Property::None && s.display == display)
        {
            if Self::holds(setting, ctx, n, value, augmented)? {
                color = Some(setting.color);
            }
        }
        Ok(color)
    }
}

impl VisualizerKind for Grid {
    type Params = GridParams;

    fn create(params: Self::Params) -> Self {
        let (background, properties) = match preset_properties(params.layout.preset) {
            Some(preset) => preset,
            None => (params.layout.background_color, params.properties),
        };
        Self {
            layout: params.layout,
            background,
            properties,
            side: 0,
            scale: 0.0,
        }
    }

    fn setup(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), VisualizerError> {
        let mut cells = self.layout.amount_of_numbers;
        if self.layout.show_numbers {
            cells = cells.min(MAX_LABELLED_CELLS);
        }
        if let Some(last) = ctx.sequence.last() {
            let available = i128::from(last) - i128::from(self.first_index(ctx)) + 1;
            cells = cells.min(available.clamp(0, i128::from(i64::MAX)) as i64);
        }
        self.side = cells.max(0).isqrt();
        self.scale = if self.side > 0 {
            ctx.surface.width() / self.side as f64
        } else {
            0.0
        };
        debug!(
            side = self.side,
            path = self.layout.path_type.option_name(),
            properties = self.properties.iter().filter(|s| s.property != Property::None).count(),
            "grid laid out"
        );
        ctx.surface.background(self.background);
        ctx.surface.no_stroke();
        Ok(())
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<Frame, VisualizerError> {
        let start = self.first_index(ctx);
        let augmenting = self.layout.path_type == PathType::RowsAugment;
        let mut walk = Walk::new(self.layout.path_type, self.side);
        let mut n = start;
        let mut augment = Element::zero();
        for step in 0..self.side * self.side {
            if augmenting && walk.starts_row() {
                n = start;
                augment += 1;
            }
            let value = ctx.sequence.get_element(n)? + &augment;
            let augmented = !augment.is_zero();
            let (x, y) = (walk.x as f64 * self.scale, walk.y as f64 * self.scale);
            if let Some(color) = self.cell_color(CellStyle::FillCell, ctx, n, &value, augmented)? {
                ctx.surface.fill(Some(color));
                ctx.surface.rect(x, y, self.scale, self.scale);
            }
            if let Some(color) = self.cell_color(CellStyle::BoxInCell, ctx, n, &value, augmented)? {
                let inset = self.scale / 4.0;
                ctx.surface.fill(Some(color));
                ctx.surface
                    .rect(x + inset, y + inset, self.scale / 2.0, self.scale / 2.0);
            }
            if self.layout.show_numbers {
                ctx.surface.fill(Some(self.layout.number_color));
                ctx.surface
                    .text(&value.to_string(), x, y + 0.75 * self.scale, self.scale / 3.0);
            }
            n = n
                .checked_add(1)
                .ok_or(SequenceError::IndexOverflow { n })?;
            walk.advance(step);
        }
        Ok(Frame::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RawParams;
    use crate::sequence::{Configured, ExplicitTerms, Naturals, Sequence};
    use crate::surface::{DrawCommand, RecordingSurface};
    use crate::visualizer::{Visualization, Visualizer};
    use std::sync::Arc;

    fn raw(pairs: &[(&str, &str)]) -> RawParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn naturals() -> Arc<dyn Sequence> {
        let mut seq = Configured::<Naturals>::new();
        seq.validate(&RawParams::new());
        seq.initialize().unwrap();
        Arc::new(seq)
    }

    fn terms(list: &str) -> Arc<dyn Sequence> {
        let mut seq = Configured::<ExplicitTerms>::new();
        assert!(seq.validate(&raw(&[("terms", list)])).is_valid());
        seq.initialize().unwrap();
        Arc::new(seq)
    }

    fn drawn(params: &[(&str, &str)], sequence: Arc<dyn Sequence>, size: f64) -> Visualization<Grid> {
        let mut viz = Visualization::<Grid>::new();
        let status = viz.validate(&raw(params));
        assert!(status.is_valid(), "{:?}", status.errors);
        viz.initialize(Box::new(RecordingSurface::new(size, size)), sequence)
            .unwrap();
        viz.setup().unwrap();
        assert_eq!(viz.draw(), Ok(Frame::Stopped));
        viz
    }

    /// Filled rectangles as (x, y, side, color).
    fn rects(viz: &Visualization<Grid>) -> Vec<(f64, f64, f64, Option<Color>)> {
        viz.surface()
            .and_then(|s| s.as_any().downcast_ref::<RecordingSurface>())
            .unwrap()
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Rect { x, y, w, style, .. } => Some((*x, *y, *w, style.fill)),
                _ => None,
            })
            .collect()
    }

    fn spiral_cells(side: i64) -> Vec<(i64, i64)> {
        let mut walk = Walk::new(PathType::Spiral, side);
        (0..side * side)
            .map(|step| {
                let cell = (walk.x, walk.y);
                walk.advance(step);
                cell
            })
            .collect()
    }

    #[test]
    fn spiral_turns_left_from_the_center() {
        assert_eq!(
            spiral_cells(3),
            vec![(1, 1), (2, 1), (2, 0), (1, 0), (0, 0), (0, 1), (0, 2), (1, 2), (2, 2)]
        );
        let mut even = spiral_cells(4);
        assert_eq!(&even[..3], &[(1, 2), (2, 2), (2, 1)]);
        even.sort();
        even.dedup();
        assert_eq!(even.len(), 16);
        assert!(even.iter().all(|&(x, y)| (0..4).contains(&x) && (0..4).contains(&y)));
    }

    #[test]
    fn ulam_spiral_marks_primes() {
        let viz = drawn(&[("amountOfNumbers", "9"), ("property1", "None")], naturals(), 30.0);
        let red = Color::parse("#ff5733");
        // 2, 3, 5 and 7 sit right, top right, top left and bottom left of 1.
        let marked: Vec<_> = rects(&viz).into_iter().map(|(x, y, _, c)| (x, y, c)).collect();
        assert_eq!(
            marked,
            vec![
                (20.0, 10.0, red),
                (20.0, 0.0, red),
                (0.0, 0.0, red),
                (0.0, 20.0, red)
            ]
        );
    }

    #[test]
    fn cell_count_rounds_down_to_a_square() {
        let viz = drawn(&[("amountOfNumbers", "4096")], terms("1 2 3 4 5 6 7 8 9 10 11 12"), 30.0);
        assert_eq!(viz.kind().map(Grid::side), Some(3));
        let labelled = drawn(
            &[("amountOfNumbers", "4096"), ("showNumbers", "true")],
            naturals(),
            400.0,
        );
        assert_eq!(labelled.kind().map(Grid::side), Some(20));
    }

    #[test]
    fn rows_augment_restarts_each_row() {
        let params = [
            ("amountOfNumbers", "4"),
            ("pathType", "RowsAugment"),
            ("property0", "Even"),
            ("property1", "None"),
        ];
        // Rows read 1 2 then 1+1 2+1.
        let viz = drawn(&params, terms("1 2 3 4"), 20.0);
        let marked: Vec<_> = rects(&viz).into_iter().map(|(x, y, _, _)| (x, y)).collect();
        assert_eq!(marked, vec![(10.0, 0.0), (0.0, 10.0)]);
    }

    #[test]
    fn boxes_sit_inside_filled_cells() {
        let params = [
            ("amountOfNumbers", "1"),
            ("property0", "Odd"),
            ("property1", "DivisibleBy"),
            ("prop1Aux", "5"),
        ];
        let viz = drawn(&params, terms("15"), 40.0);
        let shapes: Vec<_> = rects(&viz).into_iter().map(|(x, y, w, _)| (x, y, w)).collect();
        assert_eq!(shapes, vec![(0.0, 0.0, 40.0), (10.0, 10.0, 20.0)]);
    }

    #[test]
    fn presets_replace_the_custom_properties() {
        let viz = drawn(&[("preset", "ColorByLastDigit2"), ("property0", "Negative")], naturals(), 64.0);
        let grid = viz.kind().unwrap();
        assert_eq!(grid.properties().len(), 10);
        assert_eq!(grid.properties()[3].display, CellStyle::BoxInCell);
        assert_eq!(grid.properties()[4].aux, Element::from(4));
        let abundant = drawn(&[("preset", "AbundantNumbers")], naturals(), 64.0);
        assert_eq!(abundant.kind().map(|g| g.background), Some(Color::WHITE));
    }

    #[test]
    fn value_properties() {
        let e = Element::from;
        let digit = |v: i64, d: i64| Property::LastDigitIs.holds_for_value(&e(v), &e(d));
        assert!(digit(123, 3) && digit(-47, 7) && !digit(-47, 3));
        assert!(Property::DivisibleBy.holds_for_value(&e(-12), &e(4)));
        assert!(!Property::DivisibleBy.holds_for_value(&e(5), &e(0)));
        assert!(Property::Odd.holds_for_value(&e(-3), &e(3)));
        let triangular: Vec<i64> = (0..30).filter(|v| is_polygonal(&e(*v), &e(3))).collect();
        assert_eq!(triangular, vec![1, 3, 6, 10, 15, 21, 28]);
        let pentagonal: Vec<i64> = (0..40).filter(|v| is_polygonal(&e(*v), &e(5))).collect();
        assert_eq!(pentagonal, vec![1, 5, 12, 22, 35]);
    }

    #[test]
    fn factor_properties() {
        let holds = |property: Property, v: i64| {
            let value = Element::from(v);
            let factors = simple_factor(&value).unwrap();
            property.holds_for_factors(&value, &factors)
        };
        let matching = |property: Property| -> Vec<i64> {
            (-10..=30).filter(|v| holds(property, *v)).collect()
        };
        assert_eq!(matching(Property::Prime), vec![-7, -5, -3, -2, 2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert_eq!(
            matching(Property::SemiPrime),
            vec![-10, -9, -6, -4, 4, 6, 9, 10, 14, 15, 21, 22, 25, 26]
        );
        assert_eq!(
            matching(Property::SumOfTwoSquares),
            vec![0, 1, 2, 4, 5, 8, 9, 10, 13, 16, 17, 18, 20, 25, 26, 29]
        );
        assert_eq!(matching(Property::Perfect), vec![6, 28]);
        assert_eq!(matching(Property::Abundant), vec![0, 12, 18, 20, 24, 30]);
        assert!(holds(Property::Deficient, -7) && !holds(Property::Deficient, 0));
    }

    #[test]
    fn unavailable_factorizations_warn() {
        // 2 * 1013 * 1019 has a cofactor beyond trial division.
        let params = [("amountOfNumbers", "1"), ("property1", "None")];
        let mut viz = Visualization::<Grid>::new();
        assert!(viz.validate(&raw(&params)).is_valid());
        viz.initialize(Box::new(RecordingSurface::new(10.0, 10.0)), terms("2064494"))
            .unwrap();
        viz.setup().unwrap();
        assert_eq!(viz.draw(), Ok(Frame::Stopped));
        assert!(rects(&viz).is_empty());
        assert_eq!(viz.status().warnings.len(), 1);
        assert!(viz.status().warnings[0].contains("Prime for 2064494"));
    }

    #[test]
    fn aux_only_shows_for_properties_that_use_it() {
        let schema = GridParams::schema();
        let aux = schema.iter().find(|p| p.name == "prop0Aux").unwrap();
        let settings = |property: &str| {
            crate::params::resolve(&schema, &raw(&[("property0", property)])).0
        };
        assert!(!aux.is_visible(&settings("Prime")));
        assert!(aux.is_visible(&settings("PolygonalNumber")));
        let second = schema.iter().find(|p| p.name == "property1").unwrap();
        assert!(!second.is_visible(&settings("None")));
    }
}
