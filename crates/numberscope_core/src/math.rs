use crate::types::Element;
use num::{Integer, One, Signed, Zero};

/// `n(n+1)/2`.
pub fn triangular(n: f64) -> f64 {
    n * (n + 1.0) / 2.0
}

/// Largest `t` with `triangular(t) <= x`.
pub fn inv_triangular(x: f64) -> f64 {
    (((8.0 * x + 1.0).sqrt() - 1.0) / 2.0).floor()
}

pub fn is_prime(n: f64) -> bool {
    if n.fract() != 0.0 || n < 2.0 || !n.is_finite() {
        return false;
    }
    let n = n as u64;
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3u64;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

pub fn gcd(a: &Element, b: &Element) -> Element {
    a.gcd(b)
}

/// Inverse of `a` modulo `m` (`m > 0`), when `gcd(a, m) = 1`.
pub fn mod_inverse(a: &Element, m: &Element) -> Option<Element> {
    if !m.is_positive() {
        return None;
    }
    if m.is_one() {
        return Some(Element::zero());
    }
    let extended = a.mod_floor(m).extended_gcd(m);
    extended.gcd.is_one().then(|| extended.x.mod_floor(m))
}

/// Reduces into `[0, m)` when a modulus is in effect.
pub fn reduce(value: Element, modulus: Option<&Element>) -> Element {
    match modulus {
        Some(m) => value.mod_floor(m),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(v: i64) -> Element {
        Element::from(v)
    }

    #[test]
    fn triangular_numbers() {
        assert_eq!(triangular(4.0), 10.0);
        assert_eq!(inv_triangular(10.0), 4.0);
        assert_eq!(inv_triangular(9.0), 3.0);
        assert_eq!(inv_triangular(0.0), 0.0);
    }

    #[test]
    fn primes() {
        let primes: Vec<u32> = (0..30).filter(|&n| is_prime(f64::from(n))).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(!is_prime(7.5));
    }

    #[test]
    fn modular_inverse() {
        assert_eq!(mod_inverse(&e(3), &e(7)), Some(e(5)));
        assert_eq!(mod_inverse(&e(-1), &e(7)), Some(e(6)));
        assert_eq!(mod_inverse(&e(2), &e(4)), None);
        assert_eq!(mod_inverse(&e(5), &e(1)), Some(e(0)));
        assert_eq!(gcd(&e(-12), &e(18)), e(6));
        assert_eq!(reduce(e(-3), Some(&e(7))), e(4));
    }
}
