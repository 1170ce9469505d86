use super::{ElementCache, SequenceError, SequenceKind, Storage};
use crate::formula::Formula;
use crate::types::Element;
use num::FromPrimitive;

pub const FORMULA_SYMBOLS: &[&str] = &["n"];

#[derive(Params)]
pub struct FormulaParams {
    #[param(
        display = "Formula",
        description = "An expression in n giving the n-th entry",
        default = "n",
        required,
        symbols = FORMULA_SYMBOLS
    )]
    formula: Formula,
}

/// Entries are the floor of the formula's value; NaN becomes 0 and an
/// infinite value is an evaluation error.
#[derive(Kind)]
#[kind("Formula", "A sequence defined by a formula in n")]
pub struct FormulaSequence {
    formula: Formula,
}

impl SequenceKind for FormulaSequence {
    type Params = FormulaParams;

    const STORAGE: Storage = Storage::Direct;

    fn build(params: Self::Params) -> Self {
        Self {
            formula: params.formula,
        }
    }

    fn name(&self) -> String {
        format!("Formula: {}", self.formula.source())
    }

    fn calculate(&self, n: i64, _known: &ElementCache) -> Result<Element, SequenceError> {
        let value = self
            .formula
            .evaluate_number(&[("n", n as f64)])
            .map_err(|e| SequenceError::Evaluation {
                n,
                message: e.to_string(),
            })?;
        if value.is_nan() {
            return Ok(Element::default());
        }
        Element::from_f64(value.floor()).ok_or_else(|| SequenceError::Evaluation {
            n,
            message: format!("{value} is not a finite number"),
        })
    }
}
