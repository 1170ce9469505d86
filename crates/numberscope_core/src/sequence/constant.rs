use super::{ElementCache, SequenceError, SequenceKind, Storage};
use crate::types::Element;

#[derive(Params)]
pub struct ConstantParams {
    #[param(display = "Constant Value", default = "0", required)]
    constant: Element,
}

#[derive(Kind)]
#[kind("Constant Sequence", "A sequence with the same value for every index")]
pub struct Constant {
    value: Element,
}

impl SequenceKind for Constant {
    type Params = ConstantParams;

    const STORAGE: Storage = Storage::Direct;

    fn build(params: Self::Params) -> Self {
        Self {
            value: params.constant,
        }
    }

    fn name(&self) -> String {
        format!("Constant = {}", self.value)
    }

    // Every index, negative ones included, maps to the constant.
    fn contains(&self, _n: i64) -> bool {
        true
    }

    fn calculate(&self, _n: i64, _known: &ElementCache) -> Result<Element, SequenceError> {
        Ok(self.value.clone())
    }
}
