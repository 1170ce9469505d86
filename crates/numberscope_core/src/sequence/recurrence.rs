use super::{ElementCache, SequenceError, SequenceKind};
use crate::math::reduce;
use crate::params::non_negative;
use crate::types::Element;
use crate::validation::ValidationStatus;
use num::{Signed, Zero};

/// `a(n) = c0*a(n-1) + c1*a(n-2) + ... + c(k-1)*a(n-k)` after `k` seeds,
/// optionally reduced modulo `m` at every step.
struct Recurrence {
    coefficients: Vec<Element>,
    seeds: Vec<Element>,
    modulus: Option<Element>,
}

impl Recurrence {
    fn new(coefficients: Vec<Element>, seeds: Vec<Element>, modulus: Element) -> Self {
        let modulus = modulus.is_positive().then_some(modulus);
        Self {
            coefficients: coefficients
                .into_iter()
                .map(|c| reduce(c, modulus.as_ref()))
                .collect(),
            seeds: seeds
                .into_iter()
                .map(|s| reduce(s, modulus.as_ref()))
                .collect(),
            modulus,
        }
    }

    fn suffix(&self) -> String {
        match &self.modulus {
            Some(m) => format!(" (mod {m})"),
            None => String::new(),
        }
    }

    fn term(&self, n: i64, known: &ElementCache) -> Result<Element, SequenceError> {
        if let Some(seed) = usize::try_from(n).ok().and_then(|i| self.seeds.get(i)) {
            return Ok(seed.clone());
        }
        let mut sum = Element::zero();
        for (j, coefficient) in self.coefficients.iter().enumerate() {
            let previous = known.value(n - 1 - j as i64)?;
            sum = reduce(sum + coefficient * previous, self.modulus.as_ref());
        }
        Ok(sum)
    }
}

#[derive(Params)]
pub struct LinearRecurrenceParams {
    #[param(
        display = "Coefficients",
        description = "c0 c1 ... so that a(n) = c0*a(n-1) + c1*a(n-2) + ...",
        default = "1 1",
        required
    )]
    coefficients: Vec<Element>,
    #[param(
        display = "Seeds",
        description = "Initial values a(0) a(1) ..., one per coefficient",
        default = "0 1",
        required
    )]
    seeds: Vec<Element>,
    #[param(
        display = "Modulus",
        description = "Reduce every entry modulo this number; 0 for no reduction",
        default = "0",
        validate = non_negative
    )]
    modulus: Element,
}

#[derive(Kind)]
#[kind("Linear Recurrence", "A sequence defined by a homogeneous linear recurrence")]
pub struct LinearRecurrence {
    recurrence: Recurrence,
}

impl SequenceKind for LinearRecurrence {
    type Params = LinearRecurrenceParams;

    fn check(params: &Self::Params, status: &mut ValidationStatus) {
        status.forbid(
            params.coefficients.is_empty(),
            "Coefficients: at least one coefficient is needed",
        );
        status.mandate(
            params.seeds.len() == params.coefficients.len(),
            "Seeds: there must be exactly one seed per coefficient",
        );
    }

    fn build(params: Self::Params) -> Self {
        Self {
            recurrence: Recurrence::new(params.coefficients, params.seeds, params.modulus),
        }
    }

    fn name(&self) -> String {
        let coefficients = self
            .recurrence
            .coefficients
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("Linear recurrence [{coefficients}]{}", self.recurrence.suffix())
    }

    fn calculate(&self, n: i64, known: &ElementCache) -> Result<Element, SequenceError> {
        self.recurrence.term(n, known)
    }
}

#[derive(Params)]
pub struct LucasParams {
    #[param(
        display = "Modulus",
        description = "Reduce every entry modulo this number; 0 for no reduction",
        default = "0",
        validate = non_negative
    )]
    modulus: Element,
}

#[derive(Kind)]
#[kind("Lucas Numbers", "L(0) = 2, L(1) = 1, L(n) = L(n-1) + L(n-2)")]
pub struct Lucas {
    recurrence: Recurrence,
}

impl SequenceKind for Lucas {
    type Params = LucasParams;

    fn build(params: Self::Params) -> Self {
        Self {
            recurrence: Recurrence::new(
                vec![Element::from(1), Element::from(1)],
                vec![Element::from(2), Element::from(1)],
                params.modulus,
            ),
        }
    }

    fn name(&self) -> String {
        format!("Lucas numbers{}", self.recurrence.suffix())
    }

    fn calculate(&self, n: i64, known: &ElementCache) -> Result<Element, SequenceError> {
        self.recurrence.term(n, known)
    }
}
