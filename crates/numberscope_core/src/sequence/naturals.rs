use super::{ElementCache, SequenceError, SequenceKind, Storage};
use crate::types::Element;
use num::Zero;

#[derive(Params)]
pub struct NaturalsParams {
    #[param(
        display = "Include Zero",
        description = "Whether the sequence starts at 0 instead of 1",
        default = "false"
    )]
    include_zero: bool,
}

#[derive(Kind)]
#[kind("Natural Numbers", "A sequence of the natural numbers")]
pub struct Naturals {
    offset: Element,
}

impl SequenceKind for Naturals {
    type Params = NaturalsParams;

    const STORAGE: Storage = Storage::Direct;

    fn build(params: Self::Params) -> Self {
        Self {
            offset: Element::from(u8::from(!params.include_zero)),
        }
    }

    fn name(&self) -> String {
        if self.offset.is_zero() {
            "Nonnegative Integers".to_string()
        } else {
            "Positive Integers".to_string()
        }
    }

    fn calculate(&self, n: i64, _known: &ElementCache) -> Result<Element, SequenceError> {
        Ok(Element::from(n) + &self.offset)
    }
}
