//! Writes the parameter schemas of every registered kind as JSON, for the
//! web front end and other tooling.
//!
//! Usage: `generate-schemas [OUTPUT]` (stdout when no path is given).

use numberscope_core::Registry;
use numberscope_core::registry::KindDescriptor;
use serde_json::json;
use std::error::Error;
use std::fs;

fn main() -> Result<(), Box<dyn Error>> {
    let registry = Registry::standard();
    let document = json!({
        "kinds": registry.describe(),
        "descriptorSchema": schemars::schema_for!(KindDescriptor),
    });
    let text = serde_json::to_string_pretty(&document)?;
    match std::env::args().nth(1) {
        Some(path) => {
            fs::write(&path, text + "\n")?;
            eprintln!("wrote schemas for {} kinds to {path}", registry.describe().len());
        }
        None => println!("{text}"),
    }
    Ok(())
}
