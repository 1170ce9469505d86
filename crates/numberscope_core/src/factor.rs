//! Factorization of sequence entries by trial division.
//!
//! Good for every value up to `1009² - 1` and for larger values whose
//! cofactor after dividing out the primes below 1009 is small. Anything else
//! is reported as unknown rather than guessed.

use crate::types::Element;
use num::{Integer, One, Signed, Zero};

lazy_static! {
    static ref SMALL_PRIMES: Vec<u32> = primes_below(1009);
}

/// A cofactor below this that survives trial division is prime.
const SURE_LIMIT: u64 = 1009 * 1009;

/// `(prime, exponent)` pairs in increasing order. A negative value starts with
/// `(-1, 1)`, zero factors as `[(0, 1)]` and one as the empty list.
pub type Factorization = Vec<(Element, u32)>;

fn primes_below(bound: u32) -> Vec<u32> {
    let mut composite = vec![false; bound as usize];
    let mut primes = Vec::new();
    for p in 2..bound {
        if composite[p as usize] {
            continue;
        }
        primes.push(p);
        for multiple in (p * p..bound).step_by(p as usize) {
            composite[multiple as usize] = true;
        }
    }
    primes
}

/// Factors `value`, or `None` when it has a prime factor too large to find.
pub fn simple_factor(value: &Element) -> Option<Factorization> {
    if value.is_zero() {
        return Some(vec![(Element::zero(), 1)]);
    }
    let mut factors = Vec::new();
    if value.is_negative() {
        factors.push((Element::from(-1), 1));
    }
    let mut rest = value.abs();
    for &p in SMALL_PRIMES.iter() {
        if rest.is_one() {
            break;
        }
        let p = Element::from(p);
        let mut power = 0;
        loop {
            let (quotient, remainder) = rest.div_rem(&p);
            if !remainder.is_zero() {
                break;
            }
            rest = quotient;
            power += 1;
        }
        if power > 0 {
            factors.push((p, power));
        }
    }
    if rest.is_one() {
        return Some(factors);
    }
    if rest < Element::from(SURE_LIMIT) {
        factors.push((rest, 1));
        return Some(factors);
    }
    None
}

/// Sum of all positive divisors of `|value|` for a nonzero value.
pub fn divisor_sum(factors: &Factorization) -> Element {
    factors
        .iter()
        .filter(|(p, _)| p.is_positive())
        .map(|(p, power)| {
            // 1 + p + ... + p^power
            let mut term = Element::one();
            let mut sum = Element::one();
            for _ in 0..*power {
                term *= p;
                sum += &term;
            }
            sum
        })
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factored(v: i64) -> Option<Vec<(i64, u32)>> {
        simple_factor(&Element::from(v)).map(|f| {
            f.into_iter()
                .map(|(p, e)| (i64::try_from(p).unwrap(), e))
                .collect()
        })
    }

    #[test]
    fn small_values() {
        assert_eq!(factored(0), Some(vec![(0, 1)]));
        assert_eq!(factored(1), Some(vec![]));
        assert_eq!(factored(-1), Some(vec![(-1, 1)]));
        assert_eq!(factored(360), Some(vec![(2, 3), (3, 2), (5, 1)]));
        assert_eq!(factored(-49), Some(vec![(-1, 1), (7, 2)]));
        assert_eq!(factored(1009), Some(vec![(1009, 1)]));
    }

    #[test]
    fn large_cofactors_are_unknown() {
        assert_eq!(factored(1009 * 1009), None);
        assert_eq!(factored(2 * 1013 * 1019), None);
        assert_eq!(factored(1 << 40), Some(vec![(2, 40)]));
    }

    #[test]
    fn divisor_sums() {
        let sum = |v: i64| divisor_sum(&simple_factor(&Element::from(v)).unwrap());
        assert_eq!(sum(1), Element::from(1));
        assert_eq!(sum(12), Element::from(28));
        assert_eq!(sum(-12), Element::from(28));
        assert_eq!(sum(28), Element::from(56));
    }
}
