use super::{ElementCache, SequenceError, SequenceKind};
use crate::math::{gcd, mod_inverse, reduce};
use crate::params::non_negative;
use crate::types::Element;
use crate::validation::ValidationStatus;
use num::{Integer, One, Signed, Zero};

#[derive(Params)]
pub struct EllipticParams {
    #[param(display = "W1", default = "1", required)]
    w1: Element,
    #[param(display = "W2", default = "1", required)]
    w2: Element,
    #[param(display = "W3", default = "-1", required)]
    w3: Element,
    #[param(display = "W4", default = "1", required)]
    w4: Element,
    #[param(
        display = "Modulus",
        description = "Reduce every entry modulo this number; 0 for no reduction",
        default = "0",
        validate = non_negative
    )]
    modulus: Element,
}

/// Elliptic divisibility sequence from its first four terms, using
///
/// `W(2k+1) W(1)^3 = W(k+2) W(k)^3 - W(k-1) W(k+1)^3`
/// `W(2k) W(2) W(1)^2 = W(k) (W(k+2) W(k-1)^2 - W(k-2) W(k+1)^2)`
#[derive(Kind)]
#[kind(
    "Elliptic Divisibility",
    "A sequence satisfying the elliptic divisibility recurrence, from W1 through W4"
)]
pub struct EllipticDivisibility {
    initial: [Element; 5],
    modulus: Option<Element>,
    /// Inverses of `W1^3` and `W2 W1^2` modulo the modulus.
    inverses: Option<(Element, Element)>,
}

impl EllipticDivisibility {
    fn odd_divisor(&self) -> Element {
        let w1 = &self.initial[1];
        w1 * w1 * w1
    }

    fn even_divisor(&self) -> Element {
        let (w1, w2) = (&self.initial[1], &self.initial[2]);
        w2 * w1 * w1
    }

    /// Numerator of the duplication formula for `W(n)`, before division.
    fn numerator(n: i64, known: &ElementCache) -> Result<Element, SequenceError> {
        let w = |i: i64| known.value(i);
        let k = n / 2;
        if n % 2 == 1 {
            let (a, b) = (w(k)?, w(k + 1)?);
            Ok(w(k + 2)? * &a * &a * &a - w(k - 1)? * &b * &b * &b)
        } else {
            let (a, b) = (w(k - 1)?, w(k + 1)?);
            Ok(w(k)? * (w(k + 2)? * &a * &a - w(k - 2)? * &b * &b))
        }
    }

    fn modular(&self, n: i64, m: &Element, known: &ElementCache) -> Result<Element, SequenceError> {
        let Some((inv_odd, inv_even)) = &self.inverses else {
            return Err(SequenceError::Evaluation {
                n,
                message: "W1 and W2 must be invertible modulo the modulus".to_string(),
            });
        };
        let inverse = if n % 2 == 1 { inv_odd } else { inv_even };
        Ok((Self::numerator(n, known)?.mod_floor(m) * inverse).mod_floor(m))
    }

    fn exact(&self, n: i64, known: &ElementCache) -> Result<Element, SequenceError> {
        let numerator = Self::numerator(n, known)?;
        let divisor = if n % 2 == 1 {
            self.odd_divisor()
        } else {
            self.even_divisor()
        };
        let (quotient, remainder) = numerator.div_rem(&divisor);
        if !remainder.is_zero() {
            return Err(SequenceError::NonIntegral { n });
        }
        Ok(quotient)
    }
}

impl SequenceKind for EllipticDivisibility {
    type Params = EllipticParams;

    fn check(params: &Self::Params, status: &mut ValidationStatus) {
        status.forbid(params.w1.is_zero(), "W1: must not be zero");
        status.forbid(params.w2.is_zero(), "W2: must not be zero");
        if params.modulus.is_positive() && !params.w1.is_zero() && !params.w2.is_zero() {
            status.mandate(
                gcd(&params.w1, &params.modulus).is_one() && gcd(&params.w2, &params.modulus).is_one(),
                "Modulus: must be coprime to W1 and W2",
            );
        }
    }

    fn build(params: Self::Params) -> Self {
        let modulus = params.modulus.is_positive().then_some(params.modulus);
        let initial = [Element::zero(), params.w1, params.w2, params.w3, params.w4]
            .map(|w| reduce(w, modulus.as_ref()));
        let inverses = modulus.as_ref().and_then(|m| {
            let w1 = &initial[1];
            let w1_squared = (w1 * w1).mod_floor(m);
            let odd = mod_inverse(&(&w1_squared * w1), m)?;
            let even = mod_inverse(&(&w1_squared * &initial[2]), m)?;
            Some((odd, even))
        });
        Self {
            initial,
            modulus,
            inverses,
        }
    }

    fn name(&self) -> String {
        let [_, w1, w2, w3, w4] = &self.initial;
        match &self.modulus {
            Some(m) => format!("Elliptic divisibility {w1}, {w2}, {w3}, {w4} (mod {m})"),
            None => format!("Elliptic divisibility {w1}, {w2}, {w3}, {w4}"),
        }
    }

    fn calculate(&self, n: i64, known: &ElementCache) -> Result<Element, SequenceError> {
        if let Some(value) = usize::try_from(n).ok().and_then(|i| self.initial.get(i)) {
            return Ok(value.clone());
        }
        match &self.modulus {
            Some(m) => self.modular(n, m, known),
            None => self.exact(n, known),
        }
    }
}
