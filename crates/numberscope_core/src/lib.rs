//! Numberscope core library
//!
//! The engine behind the Numberscope integer sequence explorer: sequences with
//! an on-demand element cache, visualizers driven frame by frame against an
//! abstract drawing surface, schema-driven parameter resolution, the formula
//! evaluator, and the registry and specimen encoding that tie them together.
//! It is a pure library; windowing and persistence belong to the host.

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate numberscope_derive;

extern crate parking_lot;
extern crate serde;
extern crate serde_json;

pub mod color;
pub mod factor;
pub mod formula;
pub mod math;
pub mod params;
pub mod registry;
pub mod sequence;
pub mod specimen;
pub mod spiral;
pub mod surface;
pub mod types;
pub mod validation;
pub mod visualizer;

// Re-export commonly used items
pub use registry::Registry;
pub use specimen::Specimen;

pub use types::{ContractError, Element, KindInfo};
pub use validation::ValidationStatus;
