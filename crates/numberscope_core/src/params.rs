//! Declarative parameters.
//!
//! Every sequence and visualizer kind describes its settings with a list of
//! [`ParamSchema`] entries (normally generated by `#[derive(Params)]`).
//! [`resolve`] turns the raw strings a user typed into typed [`Settings`],
//! collecting every problem into a [`ValidationStatus`] rather than stopping
//! at the first one.

use crate::color::Color;
use crate::formula::Formula;
use crate::types::Element;
use crate::validation::ValidationStatus;
use num::{FromPrimitive, ToPrimitive};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::debug;

lazy_static! {
    static ref RE_LIST_SEPARATOR: Regex = Regex::new(r"[\s,]+").unwrap();
}

/// Raw user input: parameter name to the string typed for it.
pub type RawParams = BTreeMap<String, String>;

/// Per-parameter validation rule.
pub type Rule = fn(&ParamValue, &mut ValidationStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ParamKind {
    Text,
    Number,
    Integer,
    /// An integer, or `Infinity` (also the value of a blank entry).
    ExtendedInteger,
    Boolean,
    Color,
    Enum,
    Formula,
    NumberArray,
    IntegerArray,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Number(f64),
    Integer(Element),
    /// `None` stands for infinity.
    ExtendedInteger(Option<Element>),
    Boolean(bool),
    Color(Color),
    Enum(String),
    Formula(Formula),
    NumberArray(Vec<f64>),
    IntegerArray(Vec<Element>),
}

impl ParamValue {
    /// The raw string that resolves back to this value.
    pub fn to_raw(&self) -> String {
        match self {
            ParamValue::Text(s) | ParamValue::Enum(s) => s.clone(),
            ParamValue::Number(v) => v.to_string(),
            ParamValue::Integer(v) => v.to_string(),
            ParamValue::ExtendedInteger(Some(v)) => v.to_string(),
            ParamValue::ExtendedInteger(None) => "Infinity".to_string(),
            ParamValue::Boolean(b) => b.to_string(),
            ParamValue::Color(c) => c.to_hex(),
            ParamValue::Formula(f) => f.source().to_string(),
            ParamValue::NumberArray(vs) => join(vs),
            ParamValue::IntegerArray(vs) => join(vs),
        }
    }

    /// Numeric view of scalar values, used by the shared rules.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Integer(v) => v.to_f64(),
            ParamValue::ExtendedInteger(v) => v.as_ref().map_or(Some(f64::INFINITY), |v| v.to_f64()),
            _ => None,
        }
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone, Copy)]
pub enum VisibleWhen {
    Equals(&'static str),
    Predicate(fn(&ParamValue) -> bool),
}

/// A parameter only applies (and is only validated) when its dependency
/// satisfies the condition.
#[derive(Debug, Clone, Copy)]
pub struct Visibility {
    pub dependency: &'static str,
    pub when: VisibleWhen,
}

#[derive(Debug, Clone)]
pub struct ParamSchema {
    pub name: &'static str,
    pub kind: ParamKind,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Raw default, coerced exactly like user input.
    pub default: &'static str,
    pub required: bool,
    pub validate: Option<Rule>,
    pub visibility: Option<Visibility>,
    pub options: &'static [&'static str],
    pub symbols: &'static [&'static str],
}

impl ParamSchema {
    pub fn is_visible(&self, settings: &Settings) -> bool {
        let Some(visibility) = &self.visibility else {
            return true;
        };
        let Some(value) = settings.get(visibility.dependency) else {
            return false;
        };
        match visibility.when {
            VisibleWhen::Equals(expected) => value.to_raw().eq_ignore_ascii_case(expected),
            VisibleWhen::Predicate(predicate) => predicate(value),
        }
    }

    pub fn describe(&self) -> ParamDescriptor {
        ParamDescriptor {
            name: self.name.to_string(),
            kind: self.kind,
            display_name: self.display_name.to_string(),
            description: self.description.to_string(),
            default: self.default.to_string(),
            required: self.required,
            options: self.options.iter().map(|s| s.to_string()).collect(),
            symbols: self.symbols.iter().map(|s| s.to_string()).collect(),
            visible_if: self.visibility.map(|v| v.dependency.to_string()),
        }
    }

    fn empty_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::Text => ParamValue::Text(String::new()),
            ParamKind::Number => ParamValue::Number(0.0),
            ParamKind::Integer => ParamValue::Integer(Element::default()),
            ParamKind::ExtendedInteger => ParamValue::ExtendedInteger(None),
            ParamKind::Boolean => ParamValue::Boolean(false),
            ParamKind::Color => ParamValue::Color(Color::BLACK),
            ParamKind::Enum => {
                ParamValue::Enum(self.options.first().map(|s| s.to_string()).unwrap_or_default())
            }
            ParamKind::Formula => match Formula::compile("", self.symbols) {
                Ok(f) => ParamValue::Formula(f),
                Err(_) => ParamValue::Text(String::new()),
            },
            ParamKind::NumberArray => ParamValue::NumberArray(Vec::new()),
            ParamKind::IntegerArray => ParamValue::IntegerArray(Vec::new()),
        }
    }

    fn coerce(&self, raw: &str) -> Result<ParamValue, String> {
        match self.kind {
            ParamKind::Text => Ok(ParamValue::Text(raw.to_string())),
            ParamKind::Number => parse_number(raw).map(ParamValue::Number),
            ParamKind::Integer => parse_integer(raw).map(ParamValue::Integer),
            ParamKind::ExtendedInteger => parse_extended_integer(raw).map(ParamValue::ExtendedInteger),
            ParamKind::Boolean => parse_bool(raw).map(ParamValue::Boolean),
            ParamKind::Color => Color::parse(raw)
                .map(ParamValue::Color)
                .ok_or_else(|| format!("{raw:?} is not a color like #RRGGBB")),
            ParamKind::Enum => self.parse_option(raw).map(ParamValue::Enum),
            ParamKind::Formula => Formula::compile(raw, self.symbols)
                .map(ParamValue::Formula)
                .map_err(|e| e.to_string()),
            ParamKind::NumberArray => split_list(raw)
                .map(parse_number)
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::NumberArray),
            ParamKind::IntegerArray => split_list(raw)
                .map(parse_integer)
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::IntegerArray),
        }
    }

    fn parse_option(&self, raw: &str) -> Result<String, String> {
        if let Some(option) = self.options.iter().find(|o| o.eq_ignore_ascii_case(raw)) {
            return Ok(option.to_string());
        }
        raw.parse::<usize>()
            .ok()
            .and_then(|i| self.options.get(i))
            .map(|o| o.to_string())
            .ok_or_else(|| format!("{raw:?} is not one of {}", self.options.join(", ")))
    }
}

/// Serializable view of a schema entry, for tooling and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub display_name: String,
    pub description: String,
    pub default: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub symbols: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub visible_if: Option<String>,
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    RE_LIST_SEPARATOR.split(raw.trim()).filter(|s| !s.is_empty())
}

fn parse_number(raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("{raw:?} is not a number")),
    }
}

/// Largest magnitude at which every integral `f64` is exact.
const EXACT_F64: f64 = 9_007_199_254_740_992.0;

fn parse_integer(raw: &str) -> Result<Element, String> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<Element>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.abs() <= EXACT_F64 => {
            Element::from_f64(v).ok_or_else(|| format!("{raw:?} is not an integer"))
        }
        _ => Err(format!("{raw:?} is not an integer")),
    }
}

fn parse_extended_integer(raw: &str) -> Result<Option<Element>, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "infinity" | "+infinity" | "inf" | "\u{221e}" => Ok(None),
        _ => parse_integer(raw).map(Some),
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("{raw:?} is not true or false")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("setting {0} is missing")]
    Missing(&'static str),
    #[error("setting {name} does not hold a {expected:?} value")]
    WrongKind {
        name: &'static str,
        expected: ParamKind,
    },
}

/// Resolved settings, in schema order. Always holds every schema name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    entries: Vec<(&'static str, ParamValue)>,
}

impl Settings {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Typed access to one setting.
    pub fn field<T: ParamField>(&self, name: &'static str) -> Result<T, ParamError> {
        let value = self.get(name).ok_or(ParamError::Missing(name))?;
        T::from_value(value).ok_or(ParamError::WrongKind {
            name,
            expected: T::KIND,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set(&mut self, name: &'static str, value: ParamValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }
}

/// A Rust type that can be read out of a resolved setting.
pub trait ParamField: Sized {
    const KIND: ParamKind;
    const OPTIONS: &'static [&'static str] = &[];

    fn from_value(value: &ParamValue) -> Option<Self>;
}

/// A settings struct with a schema, usually derived with `#[derive(Params)]`.
pub trait ParamSet: Sized {
    fn schema() -> Vec<ParamSchema>;
    fn from_settings(settings: &Settings) -> Result<Self, ParamError>;
}

impl ParamField for String {
    const KIND: ParamKind = ParamKind::Text;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl ParamField for f64 {
    const KIND: ParamKind = ParamKind::Number;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl ParamField for Element {
    const KIND: ParamKind = ParamKind::Integer;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Integer(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl ParamField for i64 {
    const KIND: ParamKind = ParamKind::Integer;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Integer(v) => v.to_i64(),
            _ => None,
        }
    }
}

/// An index bound where `None` means unbounded.
impl ParamField for Option<i64> {
    const KIND: ParamKind = ParamKind::ExtendedInteger;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::ExtendedInteger(Some(v)) => v.to_i64().map(Some),
            ParamValue::ExtendedInteger(None) => Some(None),
            _ => None,
        }
    }
}

impl ParamField for bool {
    const KIND: ParamKind = ParamKind::Boolean;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl ParamField for Color {
    const KIND: ParamKind = ParamKind::Color;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Color(c) => Some(*c),
            _ => None,
        }
    }
}

impl ParamField for Formula {
    const KIND: ParamKind = ParamKind::Formula;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Formula(f) => Some(f.clone()),
            _ => None,
        }
    }
}

impl ParamField for Vec<f64> {
    const KIND: ParamKind = ParamKind::NumberArray;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::NumberArray(vs) => Some(vs.clone()),
            _ => None,
        }
    }
}

impl ParamField for Vec<Element> {
    const KIND: ParamKind = ParamKind::IntegerArray;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::IntegerArray(vs) => Some(vs.clone()),
            _ => None,
        }
    }
}

/// Turns raw strings into typed settings.
///
/// Absent or blank inputs take the entry's default. A required entry left
/// without a value is reported as missing. Rules run only for entries whose
/// visibility condition holds, and every failure is reported. The returned
/// settings always contain every schema name.
pub fn resolve(schema: &[ParamSchema], raw: &RawParams) -> (Settings, ValidationStatus) {
    let mut settings = Settings::default();
    let mut status = ValidationStatus::ok();
    let mut unresolved: HashSet<&'static str> = HashSet::new();

    for entry in schema {
        let supplied = raw
            .get(entry.name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());
        let source = supplied.unwrap_or(entry.default).trim();

        if source.is_empty() {
            if entry.required {
                status.add_error(format!("{}: missing required setting", entry.display_name));
                unresolved.insert(entry.name);
            }
            settings.set(entry.name, entry.empty_value());
            continue;
        }

        match entry.coerce(source) {
            Ok(value) => settings.set(entry.name, value),
            Err(message) => {
                status.add_error(format!("{}: {}", entry.display_name, message));
                unresolved.insert(entry.name);
                settings.set(entry.name, entry.empty_value());
            }
        }
    }

    for entry in schema {
        if unresolved.contains(entry.name) || !entry.is_visible(&settings) {
            continue;
        }
        let (Some(rule), Some(value)) = (entry.validate, settings.get(entry.name)) else {
            continue;
        };
        let mut rule_status = ValidationStatus::ok();
        rule(value, &mut rule_status);
        status.merge_labeled(entry.display_name, rule_status);
    }

    for name in raw.keys() {
        if !schema.iter().any(|entry| entry.name == name.as_str()) {
            status.add_warning(format!("ignoring unknown setting {name}"));
        }
    }

    if !status.is_valid() {
        debug!(errors = ?status.errors, "parameter resolution failed");
    }
    (settings, status)
}

/// Raw strings that resolve back to `settings`.
pub fn encode(settings: &Settings) -> Vec<(String, String)> {
    settings
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_raw()))
        .collect()
}

/// Names that occur more than once in a schema.
pub fn duplicate_names(schema: &[ParamSchema]) -> Vec<&'static str> {
    let mut seen = HashSet::new();
    schema
        .iter()
        .filter(|entry| !seen.insert(entry.name))
        .map(|entry| entry.name)
        .collect()
}

pub fn positive(value: &ParamValue, status: &mut ValidationStatus) {
    status.mandate(value.as_f64().is_some_and(|v| v > 0.0), "must be positive");
}

pub fn non_negative(value: &ParamValue, status: &mut ValidationStatus) {
    status.mandate(value.as_f64().is_some_and(|v| v >= 0.0), "must not be negative");
}

pub fn unit_interval(value: &ParamValue, status: &mut ValidationStatus) {
    status.mandate(
        value.as_f64().is_some_and(|v| (0.0..=1.0).contains(&v)),
        "must be between 0 and 1",
    );
}
