use super::{ElementCache, SequenceError, SequenceKind, Storage};
use crate::types::Element;
use crate::validation::ValidationStatus;

#[derive(Params)]
pub struct TermsParams {
    #[param(
        display = "Terms",
        description = "The entries, separated by spaces or commas",
        default = "1 1 2 3 5 8 13 21",
        required
    )]
    terms: Vec<Element>,
    #[param(display = "First Index", description = "Index of the first entry", default = "0")]
    first_index: i64,
}

/// A finite sequence given by an explicit list of entries.
#[derive(Kind)]
#[kind("Explicit Terms", "A finite sequence listing its entries explicitly")]
pub struct ExplicitTerms {
    terms: Vec<Element>,
    first: i64,
}

impl SequenceKind for ExplicitTerms {
    type Params = TermsParams;

    const STORAGE: Storage = Storage::Direct;

    fn check(params: &Self::Params, status: &mut ValidationStatus) {
        status.forbid(params.terms.is_empty(), "Terms: at least one entry is needed");
        let last = i64::try_from(params.terms.len())
            .ok()
            .and_then(|len| params.first_index.checked_add(len - 1));
        status.forbid(
            last.is_none(),
            format!("First Index: the last entry's index would pass {}", i64::MAX),
        );
    }

    fn build(params: Self::Params) -> Self {
        Self {
            terms: params.terms,
            first: params.first_index,
        }
    }

    fn name(&self) -> String {
        format!("{} explicit terms", self.terms.len())
    }

    fn first(&self) -> i64 {
        self.first
    }

    fn last(&self) -> Option<i64> {
        // check() guarantees the exact value fits
        Some(self.first.saturating_add(self.terms.len() as i64 - 1))
    }

    fn calculate(&self, n: i64, _known: &ElementCache) -> Result<Element, SequenceError> {
        n.checked_sub(self.first)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.terms.get(i))
            .cloned()
            .ok_or(SequenceError::OutOfRange {
                n,
                first: self.first,
                last: self.last(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RawParams;
    use crate::sequence::{Configured, Sequence};

    #[test]
    fn finite_range() {
        let mut seq = Configured::<ExplicitTerms>::new();
        let raw: RawParams = [("terms", "4 8 15 16 23"), ("firstIndex", "1")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(seq.validate(&raw).is_valid());
        seq.initialize().unwrap();
        assert_eq!(seq.first(), 1);
        assert_eq!(seq.last(), Some(5));
        assert_eq!(seq.len(), Some(5));
        assert_eq!(seq.get_element(1), Ok(Element::from(4)));
        assert_eq!(seq.get_element(5), Ok(Element::from(23)));
        for n in [0, 6] {
            assert_eq!(
                seq.get_element(n),
                Err(SequenceError::OutOfRange {
                    n,
                    first: 1,
                    last: Some(5)
                })
            );
        }
    }

    #[test]
    fn first_index_near_the_top_of_the_range() {
        let raw = |first: &str| -> RawParams {
            [("terms", "1 2 3"), ("firstIndex", first)]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        let mut seq = Configured::<ExplicitTerms>::new();
        let status = seq.validate(&raw("9223372036854775807"));
        assert!(!status.is_valid());
        assert!(status.errors[0].starts_with("First Index:"), "{:?}", status);
        assert!(seq.initialize().is_err());

        assert!(seq.validate(&raw("9223372036854775805")).is_valid());
        seq.initialize().unwrap();
        assert_eq!(seq.last(), Some(i64::MAX));
        assert_eq!(seq.len(), Some(3));
        assert_eq!(seq.get_element(i64::MAX), Ok(Element::from(3)));
        assert!(seq.get_element(i64::MIN).is_err());
    }
}
