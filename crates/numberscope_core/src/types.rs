use num::{BigInt, ToPrimitive};
use thiserror::Error;

/// Value type of sequence entries: an arbitrary precision integer, so entries
/// never overflow. Conversion to `f64` happens only where values are drawn.
pub type Element = BigInt;

/// Lossy view of an entry for drawing and formulas. Values beyond the `f64`
/// range become infinite.
pub fn to_f64(value: &Element) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Static identity shared by every sequence and visualizer kind.
pub trait KindInfo {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;
}

/// Lifecycle misuse: an operation was invoked in a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("{operation} requires a successful validate first")]
    NotValidated { operation: &'static str },
    #[error("{operation} called while {phase}")]
    OutOfOrder {
        operation: &'static str,
        phase: &'static str,
    },
}
