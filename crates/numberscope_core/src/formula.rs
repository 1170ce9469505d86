//! User formulas, compiled once against a closed list of symbols.
//!
//! Scalar expressions are handed to `fasteval`. On top of that a formula may
//! be a bracketed array `[a, b]` or a shape map `{circle: a, text: b}` whose
//! entries are themselves formulas. Every identifier must be a declared
//! symbol, a builtin or helper function, or a color name; anything else is a
//! compile error.

use crate::color::Color;
use crate::math;
use fasteval::{Compiler, Evaler};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

lazy_static! {
    static ref RE_IDENT: Regex = Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").unwrap();
    static ref RE_KEY: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Functions the evaluation engine provides itself.
const BUILTINS: &[&str] = &[
    "int", "ceil", "floor", "abs", "sign", "log", "round", "min", "max", "e", "pi", "sin", "cos",
    "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "asinh", "acosh", "atanh",
];

/// Functions and constants available to every formula.
const HELPERS: &[&str] = &[
    "sqrt",
    "if",
    "triangular",
    "invTriangular",
    "isPrime",
    "rgb",
    "rgba",
    "grey",
    "gray",
    "rainbow",
    "true",
    "false",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("unknown symbol(s): {}", .0.join(", "))]
    UnknownSymbols(Vec<String>),
    #[error("could not parse {text:?}: {message}")]
    Parse { text: String, message: String },
    #[error("{0}")]
    Structure(String),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error("expected a single number")]
    NotANumber,
}

/// Result of evaluating a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    List(Vec<FormulaValue>),
    Shapes(Vec<(String, FormulaValue)>),
}

impl FormulaValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric truthiness: a number is true when it is odd after rounding,
    /// so both `1` and comparison results count.
    pub fn is_truthy(&self) -> bool {
        match self {
            FormulaValue::Number(v) => v.is_finite() && (v.round() as i64).rem_euclid(2) == 1,
            FormulaValue::List(items) => !items.is_empty(),
            FormulaValue::Shapes(shapes) => !shapes.is_empty(),
        }
    }

    /// Color of a fill value: a number converts directly and a list
    /// overlays its layers in order onto transparent.
    pub fn to_color(&self) -> Option<Color> {
        match self {
            FormulaValue::Number(v) => Color::from_formula_value(*v),
            FormulaValue::List(layers) => {
                let mut drawn = false;
                let mut color = Color::TRANSPARENT;
                for layer in layers {
                    if let Some(top) = layer.to_color() {
                        color = color.overlay(top);
                        drawn = true;
                    }
                }
                drawn.then_some(color)
            }
            FormulaValue::Shapes(_) => None,
        }
    }

    /// Text rendering used by the `text` and `mouseover` shapes.
    pub fn to_text(&self) -> String {
        match self {
            FormulaValue::Number(v) => format_number(*v),
            FormulaValue::List(items) => items.iter().map(FormulaValue::to_text).collect(),
            FormulaValue::Shapes(shapes) => shapes
                .iter()
                .map(|(key, value)| format!("{key}: {}", value.to_text()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Variables and extra functions visible while evaluating.
pub trait FormulaScope {
    fn variable(&self, name: &str) -> Option<f64>;

    fn call(&self, _name: &str, _args: &[f64]) -> Option<f64> {
        None
    }
}

impl<'a> FormulaScope for [(&'a str, f64)] {
    fn variable(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

impl<'a, const N: usize> FormulaScope for [(&'a str, f64); N] {
    fn variable(&self, name: &str) -> Option<f64> {
        self.as_slice().variable(name)
    }
}

struct Leaf {
    slab: fasteval::Slab,
    instruction: fasteval::Instruction,
}

enum Node {
    Empty,
    Leaf(Leaf),
    List(Vec<Node>),
    Shapes(Vec<(String, Node)>),
}

struct Compiled {
    source: String,
    root: Node,
    free: Vec<&'static str>,
}

/// A compiled formula. Clones share the compiled form.
#[derive(Clone)]
pub struct Formula {
    inner: Arc<Compiled>,
}

impl Formula {
    pub fn compile(source: &str, symbols: &'static [&'static str]) -> Result<Formula, FormulaError> {
        let mut unknown = BTreeSet::new();
        let mut used = BTreeSet::new();
        let root = parse_node(source.trim(), symbols, &mut unknown, &mut used, true)?;
        if !unknown.is_empty() {
            return Err(FormulaError::UnknownSymbols(unknown.into_iter().collect()));
        }
        let free = symbols.iter().copied().filter(|s| used.contains(*s)).collect();
        Ok(Formula {
            inner: Arc::new(Compiled {
                source: source.trim().to_string(),
                root,
                free,
            }),
        })
    }

    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.inner.root, Node::Empty)
    }

    /// Declared symbols the formula actually mentions.
    pub fn free_variables(&self) -> &[&'static str] {
        &self.inner.free
    }

    pub fn uses(&self, symbol: &str) -> bool {
        self.inner.free.iter().any(|s| *s == symbol)
    }

    pub fn evaluate<S: FormulaScope + ?Sized>(&self, scope: &S) -> Result<FormulaValue, FormulaError> {
        evaluate_node(&self.inner.root, scope)
    }

    /// Evaluates a formula that must produce a single number. An empty
    /// formula yields zero.
    pub fn evaluate_number<S: FormulaScope + ?Sized>(&self, scope: &S) -> Result<f64, FormulaError> {
        self.evaluate(scope)?
            .as_number()
            .ok_or(FormulaError::NotANumber)
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.source() == other.source()
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Formula").field(&self.source()).finish()
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source())
    }
}

fn is_known(name: &str, symbols: &[&str]) -> bool {
    symbols.contains(&name)
        || BUILTINS.contains(&name)
        || HELPERS.contains(&name)
        || Color::named(name).is_some()
}

/// Index of the bracket closing the one at position 0, if any.
fn matching_close(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn enclosed(text: &str, open: char, close: char) -> Option<&str> {
    if !text.starts_with(open) || !text.ends_with(close) {
        return None;
    }
    (matching_close(text)? == text.len() - close.len_utf8())
        .then(|| &text[open.len_utf8()..text.len() - close.len_utf8()])
}

/// Splits at `separator` occurrences outside any brackets.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn parse_node(
    text: &str,
    symbols: &'static [&'static str],
    unknown: &mut BTreeSet<String>,
    used: &mut BTreeSet<String>,
    top: bool,
) -> Result<Node, FormulaError> {
    let text = text.trim();
    if text.is_empty() {
        if top {
            return Ok(Node::Empty);
        }
        return Err(FormulaError::Structure("empty entry".to_string()));
    }
    if let Some(inner) = enclosed(text, '[', ']') {
        let items = split_top_level(inner, ',')
            .into_iter()
            .map(|item| parse_node(item, symbols, unknown, used, false))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Node::List(items));
    }
    if let Some(inner) = enclosed(text, '{', '}') {
        let mut shapes = Vec::new();
        for entry in split_top_level(inner, ',') {
            if entry.trim().is_empty() {
                continue;
            }
            let parts = split_top_level(entry, ':');
            let [key, value] = parts.as_slice() else {
                return Err(FormulaError::Structure(format!(
                    "expected `key: value` in {:?}",
                    entry.trim()
                )));
            };
            let key = key.trim();
            if !RE_KEY.is_match(key) {
                return Err(FormulaError::Structure(format!("invalid key {key:?}")));
            }
            let node = parse_node(value, symbols, unknown, used, false)?;
            shapes.push((key.to_string(), node));
        }
        return Ok(Node::Shapes(shapes));
    }
    for ident in RE_IDENT.find_iter(text) {
        let name = ident.as_str();
        if symbols.contains(&name) {
            used.insert(name.to_string());
        } else if !is_known(name, symbols) {
            unknown.insert(name.to_string());
        }
    }
    let mut slab = fasteval::Slab::new();
    let parser = fasteval::Parser::new();
    let instruction = match parser.parse(text, &mut slab.ps) {
        Ok(expression) => expression.from(&slab.ps).compile(&slab.ps, &mut slab.cs),
        Err(e) => {
            return Err(FormulaError::Parse {
                text: text.to_string(),
                message: e.to_string(),
            });
        }
    };
    Ok(Node::Leaf(Leaf { slab, instruction }))
}

fn evaluate_node<S: FormulaScope + ?Sized>(node: &Node, scope: &S) -> Result<FormulaValue, FormulaError> {
    match node {
        Node::Empty => Ok(FormulaValue::Number(0.0)),
        Node::Leaf(leaf) => evaluate_leaf(leaf, scope).map(FormulaValue::Number),
        Node::List(items) => items
            .iter()
            .map(|item| evaluate_node(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(FormulaValue::List),
        Node::Shapes(shapes) => shapes
            .iter()
            .map(|(key, item)| Ok((key.clone(), evaluate_node(item, scope)?)))
            .collect::<Result<Vec<_>, _>>()
            .map(FormulaValue::Shapes),
    }
}

fn evaluate_leaf<S: FormulaScope + ?Sized>(leaf: &Leaf, scope: &S) -> Result<f64, FormulaError> {
    if let fasteval::IConst(c) = &leaf.instruction {
        return Ok(*c);
    }
    let mut callback = |name: &str, args: Vec<f64>| -> Option<f64> {
        if args.is_empty() {
            if let Some(value) = scope.variable(name) {
                return Some(value);
            }
        }
        scope.call(name, &args).or_else(|| helper(name, &args))
    };
    leaf.instruction
        .eval(&leaf.slab, &mut callback)
        .map_err(|e| FormulaError::Evaluation(e.to_string()))
}

fn flag(condition: bool) -> f64 {
    if condition { 1.0 } else { 0.0 }
}

fn byte(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn helper(name: &str, args: &[f64]) -> Option<f64> {
    let arg = |i: usize| args.get(i).copied();
    let packed = |color: Color| f64::from(color.to_argb());
    match name {
        "true" => Some(1.0),
        "false" => Some(0.0),
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "sqrt" => Some(arg(0)?.sqrt()),
        "if" => {
            let truthy = arg(0)? != 0.0;
            if truthy { arg(1) } else { arg(2) }
        }
        "triangular" => Some(math::triangular(arg(0)?)),
        "invTriangular" => Some(math::inv_triangular(arg(0)?)),
        "isPrime" => Some(flag(math::is_prime(arg(0)?))),
        "rgb" => Some(packed(Color::rgb(byte(arg(0)?), byte(arg(1)?), byte(arg(2)?)))),
        "rgba" => Some(packed(
            Color::rgb(byte(arg(0)?), byte(arg(1)?), byte(arg(2)?)).with_alpha(arg(3)?),
        )),
        "grey" | "gray" if !args.is_empty() => Some(packed(Color::grey(arg(0)?))),
        "rainbow" => Some(packed(Color::rainbow(arg(0)?))),
        _ if args.is_empty() => Color::named(name).map(packed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XY: &[&str] = &["x", "y"];

    #[test]
    fn scalar_evaluation() {
        let f = Formula::compile("x^2 + y", XY).unwrap();
        assert_eq!(f.evaluate_number(&[("x", 3.0), ("y", 1.0)]).unwrap(), 10.0);
        assert_eq!(f.free_variables(), &["x", "y"]);
    }

    #[test]
    fn unknown_symbols_are_rejected() {
        let err = Formula::compile("x + zed * q", XY).unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnknownSymbols(vec!["q".to_string(), "zed".to_string()])
        );
    }

    #[test]
    fn helpers_and_colors() {
        let f = Formula::compile("if(isPrime(x), red, black)", XY).unwrap();
        let red = f.evaluate(&[("x", 7.0), ("y", 0.0)]).unwrap();
        assert_eq!(red.to_color(), Some(Color::rgb(255, 0, 0)));
        let black = f.evaluate(&[("x", 8.0), ("y", 0.0)]).unwrap();
        assert_eq!(black.to_color(), Some(Color::BLACK));
        let t = Formula::compile("triangular(x) + invTriangular(y)", XY).unwrap();
        assert_eq!(t.evaluate_number(&[("x", 4.0), ("y", 10.0)]).unwrap(), 14.0);
    }

    #[test]
    fn false_draws_nothing() {
        let f = Formula::compile("false", XY).unwrap();
        assert_eq!(f.evaluate(&[("x", 1.0), ("y", 1.0)]).unwrap().to_color(), None);
    }

    #[test]
    fn arrays_overlay_colors() {
        let f = Formula::compile("[blue, rgba(255, 0, 0, 0.5)]", XY).unwrap();
        let value = f.evaluate(&[("x", 0.0), ("y", 0.0)]).unwrap();
        let color = value.to_color().unwrap();
        assert_eq!(color.a, 255);
        assert!(color.r > 120 && color.b > 120);
    }

    #[test]
    fn shape_maps() {
        let f = Formula::compile("{circle: [x, y], text: x + y}", XY).unwrap();
        let value = f.evaluate(&[("x", 2.0), ("y", 5.0)]).unwrap();
        assert_eq!(
            value,
            FormulaValue::Shapes(vec![
                (
                    "circle".to_string(),
                    FormulaValue::List(vec![FormulaValue::Number(2.0), FormulaValue::Number(5.0)])
                ),
                ("text".to_string(), FormulaValue::Number(7.0)),
            ])
        );
        assert_eq!(value.to_text(), "circle: 25, text: 7");
    }

    #[test]
    fn empty_formula() {
        let f = Formula::compile("  ", XY).unwrap();
        assert!(f.is_empty());
        assert_eq!(f.evaluate_number(&[("x", 1.0)]).unwrap(), 0.0);
        assert!(Formula::compile("[x, ]", XY).is_err());
    }

    #[test]
    fn parse_errors_are_reported() {
        assert!(matches!(
            Formula::compile("x +* y", XY),
            Err(FormulaError::Parse { .. })
        ));
    }

    #[test]
    fn equality_is_by_source() {
        let a = Formula::compile("x + 1", XY).unwrap();
        let b = Formula::compile(" x + 1 ", XY).unwrap();
        assert_eq!(a, b);
    }
}
