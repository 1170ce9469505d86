use super::{ElementCache, SequenceError, SequenceKind};
use crate::params::ParamValue;
use crate::types::Element;
use crate::validation::ValidationStatus;
use num::bigint::RandBigInt;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn seed_is_integer(value: &ParamValue, status: &mut ValidationStatus) {
    if let ParamValue::Text(text) = value {
        status.mandate(
            text.trim().is_empty() || text.trim().parse::<u64>().is_ok(),
            "must be empty or a nonnegative integer",
        );
    }
}

#[derive(Params)]
pub struct RandomParams {
    #[param(display = "Minimum", description = "Smallest value attainable", default = "0", required)]
    min: Element,
    #[param(display = "Maximum", description = "Largest value attainable", default = "9", required)]
    max: Element,
    #[param(
        display = "Seed",
        description = "Seed for reproducible draws; leave empty for fresh randomness",
        validate = seed_is_integer
    )]
    seed: String,
}

/// Independent uniform draws. Entries are cached, so each index is drawn
/// exactly once and rereads are stable.
#[derive(Kind)]
#[kind(
    "Random Integers in Range",
    "A sequence of integers chosen independently and uniformly from a range"
)]
pub struct RandomSequence {
    min: Element,
    max: Element,
    rng: Mutex<StdRng>,
}

impl SequenceKind for RandomSequence {
    type Params = RandomParams;

    fn check(params: &Self::Params, status: &mut ValidationStatus) {
        status.forbid(
            params.max < params.min,
            "Maximum: cannot be less than the minimum",
        );
    }

    fn build(params: Self::Params) -> Self {
        let rng = match params.seed.trim().parse::<u64>() {
            Ok(seed) => StdRng::seed_from_u64(seed),
            Err(_) => StdRng::from_entropy(),
        };
        Self {
            min: params.min,
            max: params.max,
            rng: Mutex::new(rng),
        }
    }

    fn name(&self) -> String {
        format!("Random integers {} to {}", self.min, self.max)
    }

    fn calculate(&self, _n: i64, _known: &ElementCache) -> Result<Element, SequenceError> {
        let bound = &self.max + Element::from(1);
        Ok(self.rng.lock().gen_bigint_range(&self.min, &bound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RawParams;
    use crate::sequence::{Configured, Sequence};

    fn random(pairs: &[(&str, &str)]) -> Configured<RandomSequence> {
        let mut seq = Configured::<RandomSequence>::new();
        let raw: RawParams = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let status = seq.validate(&raw);
        assert!(status.is_valid(), "{status:?}");
        seq.initialize().unwrap();
        seq
    }

    #[test]
    fn draws_stay_in_range_and_are_stable() {
        let seq = random(&[("min", "-3"), ("max", "3")]);
        let first: Vec<Element> = (0..500).map(|n| seq.get_element(n).unwrap()).collect();
        let range = Element::from(-3)..=Element::from(3);
        assert!(first.iter().all(|v| range.contains(v)));
        let again: Vec<Element> = (0..500).map(|n| seq.get_element(n).unwrap()).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn seeded_draws_repeat() {
        let a = random(&[("seed", "42")]);
        let b = random(&[("seed", "42")]);
        let read = |s: &Configured<RandomSequence>| -> Vec<Element> {
            (0..50).map(|n| s.get_element(n).unwrap()).collect()
        };
        assert_eq!(read(&a), read(&b));
    }

    #[test]
    fn far_indices_are_refused_without_filling() {
        let seq = random(&[("seed", "7")]);
        assert!(matches!(
            seq.get_element(1_000_000_000),
            Err(SequenceError::TooFar { n: 1_000_000_000, .. })
        ));
        assert_eq!(seq.cached_len(), 0);
        assert!(seq.get_element(10).is_ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut seq = Configured::<RandomSequence>::new();
        let raw: RawParams = [("min", "5"), ("max", "1")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let status = seq.validate(&raw);
        assert_eq!(
            status.errors,
            vec!["Maximum: cannot be less than the minimum".to_string()]
        );
    }
}
