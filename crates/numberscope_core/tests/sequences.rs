//! Integration tests for the sequence kinds, built through the registry
//! exactly as a host would.

use numberscope_core::params::RawParams;
use numberscope_core::sequence::{Sequence, SequenceError};
use numberscope_core::{ContractError, Element, Registry};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn raw(pairs: &[(&str, &str)]) -> RawParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Create, validate and initialize a sequence by registry name.
fn ready(kind: &str, params: &[(&str, &str)]) -> Box<dyn Sequence> {
    let mut seq = Registry::standard()
        .create_sequence(kind)
        .unwrap_or_else(|e| panic!("no sequence '{kind}': {e}"));
    let status = seq.validate(&raw(params));
    assert!(status.is_valid(), "'{kind}' rejected {params:?}: {:?}", status.errors);
    seq.initialize()
        .unwrap_or_else(|e| panic!("initialize '{kind}' failed: {e}"));
    seq
}

fn take(seq: &dyn Sequence, count: i64) -> Vec<Element> {
    (seq.first()..seq.first() + count)
        .map(|n| seq.get_element(n).unwrap_or_else(|e| panic!("a({n}): {e}")))
        .collect()
}

fn ints(values: &[i64]) -> Vec<Element> {
    values.iter().copied().map(Element::from).collect()
}

// ─── Recurrences ──────────────────────────────────────────────────────────────

#[test]
fn fibonacci_from_linear_recurrence() {
    let seq = ready("Linear Recurrence", &[("coefficients", "1 1"), ("seeds", "0 1")]);
    assert_eq!(take(seq.as_ref(), 8), ints(&[0, 1, 1, 2, 3, 5, 8, 13]));
}

#[test]
fn modular_entries_stay_in_range() {
    let seq = ready(
        "Linear Recurrence",
        &[("coefficients", "3 -7 2"), ("seeds", "5 -4 11"), ("modulus", "9")],
    );
    let range = Element::from(0)..Element::from(9);
    for value in take(seq.as_ref(), 300) {
        assert!(range.contains(&value), "{value} escaped mod 9");
    }
}

#[test]
fn lucas_numbers() {
    let seq = ready("Lucas Numbers", &[]);
    assert_eq!(take(seq.as_ref(), 6), ints(&[2, 1, 3, 4, 7, 11]));
}

#[test]
fn mismatched_seeds_fail_validation() {
    let registry = Registry::standard();
    let mut seq = registry.create_sequence("Linear Recurrence").unwrap();
    let status = seq.validate(&raw(&[("coefficients", "1 1 1"), ("seeds", "0 1")]));
    assert!(!status.is_valid());
    assert_eq!(
        seq.initialize(),
        Err(ContractError::NotValidated {
            operation: "initialize"
        })
    );
}

#[test]
fn entries_past_machine_integers_stay_exact() {
    let seq = ready("Linear Recurrence", &[("coefficients", "1 1"), ("seeds", "0 1")]);
    assert_eq!(
        seq.get_element(100).map(|v| v.to_string()),
        Ok("354224848179261915075".to_string())
    );
    let fast = ready("Linear Recurrence", &[("coefficients", "1000000 0"), ("seeds", "1 1")]);
    assert!((0..40).all(|n| fast.get_element(n).is_ok()));
}

// ─── Simple kinds ─────────────────────────────────────────────────────────────

#[test]
fn naturals_with_and_without_zero() {
    let with = ready("Natural Numbers", &[("includeZero", "true")]);
    assert_eq!(take(with.as_ref(), 4), ints(&[0, 1, 2, 3]));
    let without = ready("Natural Numbers", &[]);
    assert_eq!(take(without.as_ref(), 4), ints(&[1, 2, 3, 4]));
}

#[test]
fn constant_everywhere() {
    let seq = ready("Constant Sequence", &[("constant", "7")]);
    for n in [-5, 0, 1, 1_000_000] {
        assert_eq!(seq.get_element(n), Ok(Element::from(7)));
    }
}

#[test]
fn formula_sequence() {
    let seq = ready("Formula", &[("formula", "n^2 + 1")]);
    assert_eq!(take(seq.as_ref(), 4), ints(&[1, 2, 5, 10]));
}

#[test]
fn index_window_narrows_any_kind() {
    let seq = ready("Formula", &[("formula", "n^2"), ("first", "3"), ("length", "4")]);
    assert_eq!((seq.first(), seq.last()), (3, Some(6)));
    assert_eq!(take(seq.as_ref(), 4), ints(&[9, 16, 25, 36]));
    assert!(matches!(seq.get_element(7), Err(SequenceError::OutOfRange { .. })));
}

#[test]
fn far_entries_of_cached_kinds_are_refused() {
    let seq = ready("Random Integers in Range", &[]);
    assert!(matches!(
        seq.get_element(1_000_000_000),
        Err(SequenceError::TooFar { n: 1_000_000_000, .. })
    ));
}

#[test]
fn huge_first_index_is_rejected() {
    let mut seq = Registry::standard().create_sequence("Explicit Terms").unwrap();
    let status = seq.validate(&raw(&[("terms", "1 2 3"), ("firstIndex", "9223372036854775807")]));
    assert!(!status.is_valid());
}

#[test]
fn finite_range_is_enforced() {
    let seq = ready("Explicit Terms", &[("terms", "4 8 15 16 23 42"), ("firstIndex", "1")]);
    assert_eq!(seq.len(), Some(6));
    assert_eq!(seq.get_element(6), Ok(Element::from(42)));
    assert!(matches!(seq.get_element(7), Err(SequenceError::OutOfRange { .. })));
    assert!(matches!(seq.get_element(0), Err(SequenceError::OutOfRange { .. })));
}

// ─── Caching ──────────────────────────────────────────────────────────────────

#[test]
fn reads_are_idempotent() {
    let seq = ready("Random Integers in Range", &[("min", "-3"), ("max", "3")]);
    let first_pass: Vec<_> = (0..500).map(|n| seq.get_element(n)).collect();
    let second_pass: Vec<_> = (0..500).rev().map(|n| seq.get_element(n)).collect();
    let range = Element::from(-3)..=Element::from(3);
    assert!(first_pass.iter().all(|r| matches!(r, Ok(v) if range.contains(v))));
    assert_eq!(first_pass, second_pass.into_iter().rev().collect::<Vec<_>>());
}

#[test]
fn seeded_random_is_reproducible() {
    let a = ready("Random Integers in Range", &[("seed", "42")]);
    let b = ready("Random Integers in Range", &[("seed", "42")]);
    assert_eq!(take(a.as_ref(), 50), take(b.as_ref(), 50));
}

#[test]
fn reads_before_initialize_are_not_ready() {
    let mut seq = Registry::standard().create_sequence("Lucas Numbers").unwrap();
    assert_eq!(seq.get_element(0), Err(SequenceError::NotReady));
    seq.validate(&RawParams::new());
    assert_eq!(seq.get_element(0), Err(SequenceError::NotReady));
    seq.initialize().unwrap();
    assert_eq!(seq.get_element(0), Ok(Element::from(2)));
}
