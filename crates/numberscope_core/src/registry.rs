//! Name to factory lookup for every sequence and visualizer kind.

use crate::params::{ParamDescriptor, ParamSchema, ParamSet};
use crate::sequence::{
    Configured, Constant, EllipticDivisibility, ExplicitTerms, FormulaSequence, LinearRecurrence,
    Lucas, Naturals, RandomSequence, RemoteSequence, Sequence, SequenceKind, ValueFetcher,
    remote::RemoteParams,
};
use crate::visualizer::{
    Differences, FormulaGrid, Grid, ModFill, ShiftCompare, Turtle, Visualization, Visualizer,
    VisualizerKind,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub type SequenceFactory = Arc<dyn Fn() -> Box<dyn Sequence> + Send + Sync>;
pub type VisualizerFactory = Arc<dyn Fn() -> Box<dyn Visualizer> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{category} {name:?} is already registered")]
    Duplicate {
        category: &'static str,
        name: &'static str,
    },
    #[error("no {category} named {name:?}")]
    Unknown {
        category: &'static str,
        name: String,
    },
}

#[derive(Clone)]
pub struct SequenceEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: fn() -> Vec<ParamSchema>,
    pub factory: SequenceFactory,
}

#[derive(Clone)]
pub struct VisualizerEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: fn() -> Vec<ParamSchema>,
    pub factory: VisualizerFactory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Sequence,
    Visualizer,
}

/// Serializable summary of a registered kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KindDescriptor {
    pub name: String,
    pub category: Category,
    pub description: String,
    pub params: Vec<ParamDescriptor>,
}

#[derive(Clone, Default)]
pub struct Registry {
    sequences: BTreeMap<&'static str, SequenceEntry>,
    visualizers: BTreeMap<&'static str, VisualizerEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in kind. Remote sequences need a fetcher and are added
    /// with [`Registry::install_remote`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.install_standard();
        registry
    }

    fn install_standard(&mut self) {
        let installed = [
            self.install_sequence::<Naturals>(),
            self.install_sequence::<Constant>(),
            self.install_sequence::<LinearRecurrence>(),
            self.install_sequence::<Lucas>(),
            self.install_sequence::<EllipticDivisibility>(),
            self.install_sequence::<FormulaSequence>(),
            self.install_sequence::<RandomSequence>(),
            self.install_sequence::<ExplicitTerms>(),
            self.install_visualizer::<ModFill>(),
            self.install_visualizer::<Differences>(),
            self.install_visualizer::<Turtle>(),
            self.install_visualizer::<ShiftCompare>(),
            self.install_visualizer::<FormulaGrid>(),
            self.install_visualizer::<Grid>(),
        ];
        debug_assert!(installed.iter().all(Result::is_ok));
        debug!(
            sequences = self.sequences.len(),
            visualizers = self.visualizers.len(),
            "registry populated"
        );
    }

    pub fn install_sequence<K: SequenceKind>(&mut self) -> Result<(), RegistryError> {
        self.add_sequence(SequenceEntry {
            name: K::NAME,
            description: K::DESCRIPTION,
            schema: K::Params::schema,
            factory: Arc::new(|| Box::new(Configured::<K>::new()) as Box<dyn Sequence>),
        })
    }

    pub fn install_visualizer<K: VisualizerKind>(&mut self) -> Result<(), RegistryError> {
        self.add_visualizer(VisualizerEntry {
            name: K::NAME,
            description: K::DESCRIPTION,
            schema: K::Params::schema,
            factory: Arc::new(|| Box::new(Visualization::<K>::new()) as Box<dyn Visualizer>),
        })
    }

    /// Adds the remote sequence kind, fetching through `fetcher`.
    pub fn install_remote(&mut self, fetcher: Arc<dyn ValueFetcher>) -> Result<(), RegistryError> {
        self.add_sequence(SequenceEntry {
            name: RemoteSequence::NAME,
            description: RemoteSequence::DESCRIPTION,
            schema: RemoteParams::schema,
            factory: Arc::new(move || {
                Box::new(RemoteSequence::new(fetcher.clone())) as Box<dyn Sequence>
            }),
        })
    }

    pub fn add_sequence(&mut self, entry: SequenceEntry) -> Result<(), RegistryError> {
        if self.sequences.contains_key(entry.name) {
            return Err(RegistryError::Duplicate {
                category: "sequence",
                name: entry.name,
            });
        }
        self.sequences.insert(entry.name, entry);
        Ok(())
    }

    pub fn add_visualizer(&mut self, entry: VisualizerEntry) -> Result<(), RegistryError> {
        if self.visualizers.contains_key(entry.name) {
            return Err(RegistryError::Duplicate {
                category: "visualizer",
                name: entry.name,
            });
        }
        self.visualizers.insert(entry.name, entry);
        Ok(())
    }

    pub fn sequence(&self, name: &str) -> Option<&SequenceEntry> {
        self.sequences.get(name)
    }

    pub fn visualizer(&self, name: &str) -> Option<&VisualizerEntry> {
        self.visualizers.get(name)
    }

    pub fn create_sequence(&self, name: &str) -> Result<Box<dyn Sequence>, RegistryError> {
        self.sequence(name)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| RegistryError::Unknown {
                category: "sequence",
                name: name.to_string(),
            })
    }

    pub fn create_visualizer(&self, name: &str) -> Result<Box<dyn Visualizer>, RegistryError> {
        self.visualizer(name)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| RegistryError::Unknown {
                category: "visualizer",
                name: name.to_string(),
            })
    }

    pub fn sequences(&self) -> impl Iterator<Item = &SequenceEntry> {
        self.sequences.values()
    }

    pub fn visualizers(&self) -> impl Iterator<Item = &VisualizerEntry> {
        self.visualizers.values()
    }

    pub fn describe(&self) -> Vec<KindDescriptor> {
        let describe = |name: &str, category, description: &str, schema: fn() -> Vec<ParamSchema>| {
            KindDescriptor {
                name: name.to_string(),
                category,
                description: description.to_string(),
                params: schema().iter().map(ParamSchema::describe).collect(),
            }
        };
        self.sequences()
            .map(|e| describe(e.name, Category::Sequence, e.description, e.schema))
            .chain(
                self.visualizers()
                    .map(|e| describe(e.name, Category::Visualizer, e.description, e.schema)),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::duplicate_names;

    #[test]
    fn standard_kinds_are_registered() {
        let registry = Registry::standard();
        assert_eq!(registry.sequences().count(), 8);
        assert_eq!(registry.visualizers().count(), 6);
        let seq = registry.create_sequence("Natural Numbers").unwrap();
        assert_eq!(seq.kind_name(), "Natural Numbers");
        let viz = registry.create_visualizer("Mod Fill").unwrap();
        assert_eq!(viz.kind_name(), "Mod Fill");
        assert!(matches!(
            registry.create_visualizer("Nope"),
            Err(RegistryError::Unknown { .. })
        ));
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut registry = Registry::standard();
        assert_eq!(
            registry.install_sequence::<Naturals>(),
            Err(RegistryError::Duplicate {
                category: "sequence",
                name: "Natural Numbers"
            })
        );
    }

    #[test]
    fn parameter_names_are_unique_per_kind() {
        let registry = Registry::standard();
        for entry in registry.sequences() {
            assert!(duplicate_names(&(entry.schema)()).is_empty(), "{}", entry.name);
        }
        for entry in registry.visualizers() {
            assert!(duplicate_names(&(entry.schema)()).is_empty(), "{}", entry.name);
        }
    }

    #[test]
    fn factories_build_fresh_instances() {
        let registry = Registry::standard();
        let a = registry.create_sequence("Lucas Numbers").unwrap();
        let b = registry.create_sequence("Lucas Numbers").unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn descriptors_cover_every_kind() {
        let descriptors = Registry::standard().describe();
        assert_eq!(descriptors.len(), 14);
        let grid = descriptors.iter().find(|d| d.name == "Formula Grid").unwrap();
        assert_eq!(grid.category, Category::Visualizer);
        assert!(grid.params.iter().any(|p| p.name == "fillFormula"));
    }
}
