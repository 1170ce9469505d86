//! Visualizers.
//!
//! A visualizer draws a bound [`Sequence`] onto a [`Surface`], one frame per
//! [`Visualizer::draw`] call. Kinds implement [`VisualizerKind`]; the
//! [`Visualization`] wrapper owns the settings, the bound surface and
//! sequence, and enforces the lifecycle
//! `Constructed → Validated → Initialized → SetUp → Drawing → Stopped`.

pub mod differences;
pub mod formula_grid;
pub mod grid;
pub mod mod_fill;
pub mod shift_compare;
pub mod turtle;

pub use differences::Differences;
pub use formula_grid::{FillOrder, FormulaGrid};
pub use grid::Grid;
pub use mod_fill::ModFill;
pub use shift_compare::ShiftCompare;
pub use turtle::Turtle;

use crate::formula::FormulaError;
use crate::params::{ParamSchema, ParamSet, RawParams, Settings, resolve};
use crate::sequence::{FetchError, Sequence, SequenceError};
use crate::surface::Surface;
use crate::types::{ContractError, KindInfo};
use crate::validation::ValidationStatus;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VisualizerError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error(transparent)]
    Formula(#[from] FormulaError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error("{0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Constructed,
    Validated,
    Initialized,
    SetUp,
    Drawing,
    Stopped,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Constructed => "constructed",
            Phase::Validated => "validated",
            Phase::Initialized => "initialized",
            Phase::SetUp => "set up",
            Phase::Drawing => "drawing",
            Phase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Frame {
    /// More frames to come.
    Continue,
    /// The sequence was not ready; nothing advanced, try again next frame.
    Waiting,
    /// The loop is over; further draws do nothing.
    Stopped,
}

pub trait Visualizer: Send {
    /// Registry name of the kind.
    fn kind_name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Vec<ParamSchema>;
    fn settings(&self) -> &Settings;
    /// Result of the last validation, plus warnings raised while binding
    /// and setting up.
    fn status(&self) -> &ValidationStatus;
    fn is_valid(&self) -> bool;
    fn phase(&self) -> Phase;

    fn validate(&mut self, raw: &RawParams) -> ValidationStatus;
    fn initialize(
        &mut self,
        surface: Box<dyn Surface>,
        sequence: Arc<dyn Sequence>,
    ) -> Result<(), VisualizerError>;
    /// One-time geometry and state computation. Calling it again restarts
    /// the drawing from the beginning.
    fn setup(&mut self) -> Result<(), VisualizerError>;
    fn draw(&mut self) -> Result<Frame, VisualizerError>;
    fn stop(&mut self);
    /// Releases the surface and sequence, returning to `Constructed`.
    fn detach(&mut self) -> Option<Box<dyn Surface>>;

    fn surface(&self) -> Option<&dyn Surface>;
}

/// What a kind sees while setting up and drawing.
pub struct DrawContext<'a> {
    pub surface: &'a mut dyn Surface,
    pub sequence: &'a dyn Sequence,
    /// Frames drawn since the last setup, counting the current one.
    pub frame: u64,
    /// Collects warnings for the user.
    pub status: &'a mut ValidationStatus,
}

/// A concrete visualizer, wrapped by [`Visualization`].
pub trait VisualizerKind: KindInfo + Send + Sized + 'static {
    type Params: ParamSet + Send;

    /// Cross-field rules beyond the per-parameter ones.
    fn check(_params: &Self::Params, _status: &mut ValidationStatus) {}

    fn create(params: Self::Params) -> Self;

    /// Checks that depend on the bound sequence.
    fn bind(
        &mut self,
        _sequence: &dyn Sequence,
        _status: &mut ValidationStatus,
    ) -> Result<(), VisualizerError> {
        Ok(())
    }

    fn setup(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), VisualizerError>;

    /// Draws one frame. Returning `Frame::Stopped` ends the loop.
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<Frame, VisualizerError>;
}

/// Lifecycle wrapper for a [`VisualizerKind`].
pub struct Visualization<K: VisualizerKind> {
    settings: Settings,
    status: ValidationStatus,
    validated: Option<K::Params>,
    kind: Option<K>,
    phase: Phase,
    surface: Option<Box<dyn Surface>>,
    sequence: Option<Arc<dyn Sequence>>,
    frame: u64,
}

impl<K: VisualizerKind> Default for Visualization<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: VisualizerKind> Visualization<K> {
    pub fn new() -> Self {
        let (settings, _) = resolve(&K::Params::schema(), &RawParams::new());
        Self {
            settings,
            status: ValidationStatus::error("not validated yet"),
            validated: None,
            kind: None,
            phase: Phase::Constructed,
            surface: None,
            sequence: None,
            frame: 0,
        }
    }

    pub fn kind(&self) -> Option<&K> {
        self.kind.as_ref()
    }

    fn out_of_order(&self, operation: &'static str) -> VisualizerError {
        ContractError::OutOfOrder {
            operation,
            phase: self.phase.as_str(),
        }
        .into()
    }

    /// Creates the kind from the validated settings and checks it against
    /// the bound sequence.
    fn bind(&mut self) -> Result<(), VisualizerError> {
        let (Some(sequence), Some(params)) = (&self.sequence, self.validated.take()) else {
            return Err(ContractError::NotValidated {
                operation: "initialize",
            }
            .into());
        };
        let mut kind = K::create(params);
        let mut status = ValidationStatus::ok();
        let bound = kind.bind(sequence.as_ref(), &mut status);
        self.status.merge(status);
        bound?;
        debug!(visualizer = K::NAME, sequence = %sequence.name(), "visualizer initialized");
        self.kind = Some(kind);
        self.phase = Phase::Initialized;
        Ok(())
    }

    fn run<T>(
        &mut self,
        operation: &'static str,
        step: impl FnOnce(&mut K, &mut DrawContext<'_>) -> Result<T, VisualizerError>,
    ) -> Result<T, VisualizerError> {
        let phase = self.phase.as_str();
        let (Some(kind), Some(surface), Some(sequence)) =
            (&mut self.kind, &mut self.surface, &self.sequence)
        else {
            return Err(ContractError::OutOfOrder { operation, phase }.into());
        };
        let mut ctx = DrawContext {
            surface: &mut **surface,
            sequence: sequence.as_ref(),
            frame: self.frame,
            status: &mut self.status,
        };
        step(kind, &mut ctx)
    }
}

impl<K: VisualizerKind> Visualizer for Visualization<K> {
    fn kind_name(&self) -> &'static str {
        K::NAME
    }

    fn description(&self) -> &'static str {
        K::DESCRIPTION
    }

    fn schema(&self) -> Vec<ParamSchema> {
        K::Params::schema()
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn status(&self) -> &ValidationStatus {
        &self.status
    }

    fn is_valid(&self) -> bool {
        self.status.is_valid()
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    /// Re-validating a bound visualizer rebinds it with the new settings;
    /// it must then be set up again.
    fn validate(&mut self, raw: &RawParams) -> ValidationStatus {
        let (settings, mut status) = resolve(&K::Params::schema(), raw);
        self.settings = settings;
        self.validated = None;
        self.kind = None;
        if status.is_valid() {
            match K::Params::from_settings(&self.settings) {
                Ok(params) => {
                    K::check(&params, &mut status);
                    if status.is_valid() {
                        self.validated = Some(params);
                    }
                }
                Err(e) => status.add_error(e.to_string()),
            }
        }
        self.status = status;
        if !self.status.is_valid() {
            debug!(visualizer = K::NAME, errors = ?self.status.errors, "visualizer settings rejected");
            self.phase = Phase::Constructed;
            return self.status.clone();
        }
        self.phase = Phase::Validated;
        if self.surface.is_some() && self.sequence.is_some() {
            if let Err(e) = self.bind() {
                self.status.add_error(e.to_string());
                self.phase = Phase::Constructed;
            }
        }
        self.status.clone()
    }

    fn initialize(
        &mut self,
        surface: Box<dyn Surface>,
        sequence: Arc<dyn Sequence>,
    ) -> Result<(), VisualizerError> {
        match self.phase {
            Phase::Validated => {}
            Phase::Constructed => {
                return Err(ContractError::NotValidated {
                    operation: "initialize",
                }
                .into());
            }
            _ => return Err(self.out_of_order("initialize")),
        }
        self.surface = Some(surface);
        self.sequence = Some(sequence);
        if let Err(e) = self.bind() {
            self.status.add_error(e.to_string());
            self.phase = Phase::Constructed;
            return Err(e);
        }
        Ok(())
    }

    fn setup(&mut self) -> Result<(), VisualizerError> {
        if matches!(self.phase, Phase::Constructed | Phase::Validated) {
            return Err(self.out_of_order("setup"));
        }
        self.frame = 0;
        self.run("setup", |kind, ctx| kind.setup(ctx))?;
        self.phase = Phase::SetUp;
        Ok(())
    }

    fn draw(&mut self) -> Result<Frame, VisualizerError> {
        match self.phase {
            Phase::SetUp | Phase::Drawing => {}
            Phase::Stopped => return Ok(Frame::Stopped),
            _ => return Err(self.out_of_order("draw")),
        }
        self.frame += 1;
        match self.run("draw", |kind, ctx| kind.draw(ctx)) {
            Ok(Frame::Stopped) => {
                debug!(visualizer = K::NAME, frame = self.frame, "visualizer stopped");
                self.phase = Phase::Stopped;
                Ok(Frame::Stopped)
            }
            Ok(frame) => {
                self.phase = Phase::Drawing;
                Ok(frame)
            }
            Err(VisualizerError::Sequence(SequenceError::NotReady)) => {
                self.frame -= 1;
                Ok(Frame::Waiting)
            }
            Err(e) => Err(e),
        }
    }

    fn stop(&mut self) {
        if !matches!(self.phase, Phase::Constructed | Phase::Validated) {
            self.phase = Phase::Stopped;
        }
    }

    fn detach(&mut self) -> Option<Box<dyn Surface>> {
        self.kind = None;
        self.validated = None;
        self.sequence = None;
        self.status = ValidationStatus::error("not validated yet");
        self.phase = Phase::Constructed;
        self.surface.take()
    }

    fn surface(&self) -> Option<&dyn Surface> {
        self.surface.as_deref()
    }
}

/// Host-side frame loop: sets the visualizer up once the sequence is ready
/// and draws until it stops or the frame cap is reached.
pub struct Animation {
    visualizer: Box<dyn Visualizer>,
    sequence: Arc<dyn Sequence>,
    max_frames: u64,
    frames: u64,
}

impl Animation {
    pub const DEFAULT_MAX_FRAMES: u64 = 10_000;

    pub fn new(visualizer: Box<dyn Visualizer>, sequence: Arc<dyn Sequence>) -> Self {
        Self {
            visualizer,
            sequence,
            max_frames: Self::DEFAULT_MAX_FRAMES,
            frames: 0,
        }
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn visualizer(&self) -> &dyn Visualizer {
        self.visualizer.as_ref()
    }

    pub fn visualizer_mut(&mut self) -> &mut dyn Visualizer {
        self.visualizer.as_mut()
    }

    pub fn sequence(&self) -> &Arc<dyn Sequence> {
        &self.sequence
    }

    /// Frames requested so far, including waiting ones.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Awaits the sequence's asynchronous preparation, if it has one.
    pub async fn prepare(&self) -> Result<(), FetchError> {
        match self.sequence.load() {
            Some(load) => load.await,
            None => Ok(()),
        }
    }

    pub fn step(&mut self) -> Result<Frame, VisualizerError> {
        if self.frames >= self.max_frames {
            if self.visualizer.phase() != Phase::Stopped {
                debug!(frames = self.frames, "frame cap reached");
                self.visualizer.stop();
            }
            return Ok(Frame::Stopped);
        }
        self.frames += 1;
        if self.visualizer.phase() == Phase::Initialized {
            if !self.sequence.is_ready() {
                return Ok(Frame::Waiting);
            }
            self.visualizer.setup()?;
        }
        self.visualizer.draw()
    }

    /// Steps until the visualizer stops; returns the number of frames used.
    pub fn run(&mut self) -> Result<u64, VisualizerError> {
        while self.step()? != Frame::Stopped {}
        Ok(self.frames)
    }

    pub fn into_parts(self) -> (Box<dyn Visualizer>, Arc<dyn Sequence>) {
        (self.visualizer, self.sequence)
    }
}
