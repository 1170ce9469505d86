//! Specimens: a named pairing of a configured sequence with a configured
//! visualizer, as stored in galleries and shared as URL query strings.
//!
//! The query layout is `name=..&viz=<kind>&<visualizer settings>&seq=<kind>&<sequence settings>`.
//! Settings belong to whichever of `viz` and `seq` precedes them. A
//! `frames` cap and a `randomSeed` are also understood when reading, though
//! never written unless set.

use crate::params::{RawParams, encode};
use crate::registry::{Registry, RegistryError};
use crate::sequence::Sequence;
use crate::surface::Surface;
use crate::types::ContractError;
use crate::visualizer::{Animation, Visualizer, VisualizerError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use url::form_urlencoded;

const NAME_KEY: &str = "name";
const VIZ_KEY: &str = "viz";
const SEQ_KEY: &str = "seq";
const FRAMES_KEY: &str = "frames";
const SEED_KEY: &str = "randomSeed";

/// Sequence setting that receives a `randomSeed` from the query.
const SEED_PARAM: &str = "seed";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecimenError {
    #[error("specimen query has no {0} kind")]
    MissingKind(&'static str),
    #[error("invalid frame count {0:?}")]
    Frames(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{part} settings are invalid: {}", .errors.join("; "))]
    Invalid {
        part: &'static str,
        errors: Vec<String>,
    },
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Visualizer(#[from] VisualizerError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specimen {
    pub name: String,
    pub sequence_kind: String,
    #[serde(default)]
    pub sequence_params: RawParams,
    pub visualizer_kind: String,
    #[serde(default)]
    pub visualizer_params: RawParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Lead,
    Visualizer,
    Sequence,
}

impl Specimen {
    pub fn new(
        name: impl Into<String>,
        visualizer_kind: impl Into<String>,
        sequence_kind: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            visualizer_kind: visualizer_kind.into(),
            sequence_kind: sequence_kind.into(),
            ..Self::default()
        }
    }

    /// Records the current settings of a live pairing.
    pub fn capture(
        name: impl Into<String>,
        visualizer: &dyn Visualizer,
        sequence: &dyn Sequence,
    ) -> Self {
        Self {
            name: name.into(),
            visualizer_kind: visualizer.kind_name().to_string(),
            visualizer_params: encode(visualizer.settings()).into_iter().collect(),
            sequence_kind: sequence.kind_name().to_string(),
            sequence_params: encode(sequence.settings()).into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair(NAME_KEY, &self.name);
        query.append_pair(VIZ_KEY, &self.visualizer_kind);
        query.extend_pairs(&self.visualizer_params);
        query.append_pair(SEQ_KEY, &self.sequence_kind);
        query.extend_pairs(&self.sequence_params);
        if let Some(frames) = self.frames {
            query.append_pair(FRAMES_KEY, &frames.to_string());
        }
        if let Some(seed) = &self.random_seed {
            query.append_pair(SEED_KEY, seed);
        }
        query.finish()
    }

    pub fn from_query(query: &str) -> Result<Self, SpecimenError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut specimen = Specimen::default();
        let (mut saw_viz, mut saw_seq) = (false, false);
        let mut section = Section::Lead;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                NAME_KEY if section == Section::Lead => specimen.name = value.into_owned(),
                VIZ_KEY if !saw_viz => {
                    specimen.visualizer_kind = value.into_owned();
                    saw_viz = true;
                    section = Section::Visualizer;
                }
                SEQ_KEY if !saw_seq => {
                    specimen.sequence_kind = value.into_owned();
                    saw_seq = true;
                    section = Section::Sequence;
                }
                FRAMES_KEY => {
                    let frames = value
                        .parse::<u64>()
                        .map_err(|_| SpecimenError::Frames(value.to_string()))?;
                    specimen.frames = Some(frames);
                }
                SEED_KEY => specimen.random_seed = Some(value.into_owned()),
                _ => match section {
                    Section::Lead => debug!(key = %key, "ignoring query key before viz"),
                    Section::Visualizer => {
                        specimen
                            .visualizer_params
                            .insert(key.into_owned(), value.into_owned());
                    }
                    Section::Sequence => {
                        specimen
                            .sequence_params
                            .insert(key.into_owned(), value.into_owned());
                    }
                },
            }
        }
        if specimen.visualizer_kind.is_empty() {
            return Err(SpecimenError::MissingKind("visualizer"));
        }
        if specimen.sequence_kind.is_empty() {
            return Err(SpecimenError::MissingKind("sequence"));
        }
        Ok(specimen)
    }

    /// Builds, validates and binds both halves, returning an animation ready
    /// to [`prepare`](Animation::prepare) and run.
    pub fn instantiate(
        &self,
        registry: &Registry,
        surface: Box<dyn Surface>,
    ) -> Result<Animation, SpecimenError> {
        let mut sequence = registry.create_sequence(&self.sequence_kind)?;
        let mut sequence_params = self.sequence_params.clone();
        if let Some(seed) = &self.random_seed {
            if sequence.schema().iter().any(|p| p.name == SEED_PARAM) {
                sequence_params
                    .entry(SEED_PARAM.to_string())
                    .or_insert_with(|| seed.clone());
            }
        }
        let status = sequence.validate(&sequence_params);
        if !status.is_valid() {
            return Err(SpecimenError::Invalid {
                part: "sequence",
                errors: status.errors,
            });
        }
        sequence.initialize()?;
        let sequence: Arc<dyn Sequence> = Arc::from(sequence);

        let mut visualizer = registry.create_visualizer(&self.visualizer_kind)?;
        let status = visualizer.validate(&self.visualizer_params);
        if !status.is_valid() {
            return Err(SpecimenError::Invalid {
                part: "visualizer",
                errors: status.errors,
            });
        }
        visualizer.initialize(surface, sequence.clone())?;
        debug!(specimen = %self.name, "specimen instantiated");

        let animation = Animation::new(visualizer, sequence);
        Ok(match self.frames {
            Some(frames) => animation.with_max_frames(frames),
            None => animation,
        })
    }
}
