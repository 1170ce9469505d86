//! Integer sequences.
//!
//! Every sequence is reached through the object safe [`Sequence`] trait. The
//! built-in kinds only describe their parameters and how to compute one entry
//! ([`SequenceKind`]); [`Configured`] supplies the shared lifecycle
//! (validate, initialize, read) and the on-demand element cache.

pub mod cache;
pub mod constant;
pub mod elliptic;
pub mod formula;
pub mod naturals;
pub mod random;
pub mod recurrence;
pub mod remote;
pub mod terms;

pub use cache::{CACHE_BLOCK, CACHE_LIMIT, ElementCache};
pub use constant::Constant;
pub use elliptic::EllipticDivisibility;
pub use formula::FormulaSequence;
pub use naturals::Naturals;
pub use random::RandomSequence;
pub use recurrence::{LinearRecurrence, Lucas};
pub use remote::{BoxFuture, FetchError, RemoteSequence, ValueFetcher};
pub use terms::ExplicitTerms;

use crate::factor::{Factorization, simple_factor};
use crate::params::{ParamSchema, ParamSet, RawParams, Settings, resolve};
use crate::types::{ContractError, Element, KindInfo};
use crate::validation::ValidationStatus;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("index {n} is out of range (first {first}, last {})", .last.map_or("none".to_string(), |l| l.to_string()))]
    OutOfRange {
        n: i64,
        first: i64,
        last: Option<i64>,
    },
    #[error("sequence is not ready")]
    NotReady,
    #[error("index arithmetic for entry {n} leaves the 64-bit index range")]
    IndexOverflow { n: i64 },
    #[error("entry {n} is beyond the largest cacheable index {limit}")]
    TooFar { n: i64, limit: i64 },
    #[error("entry {n} is not an integer")]
    NonIntegral { n: i64 },
    #[error("could not compute entry {n}: {message}")]
    Evaluation { n: i64, message: String },
    #[error("entry {0} was needed before it was computed")]
    Uncached(i64),
}

/// Process-wide numeric identity of a sequence instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SequenceId(u64);

static NEXT_SEQUENCE_ID: AtomicU64 = AtomicU64::new(1);

impl SequenceId {
    pub fn next() -> Self {
        SequenceId(NEXT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait Sequence: Send + Sync {
    fn id(&self) -> SequenceId;
    /// Registry name of the kind.
    fn kind_name(&self) -> &'static str;
    /// Display name; may reflect the current settings.
    fn name(&self) -> String;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Vec<ParamSchema>;
    fn settings(&self) -> &Settings;

    fn validate(&mut self, raw: &RawParams) -> ValidationStatus;
    fn is_valid(&self) -> bool;
    fn initialize(&mut self) -> Result<(), ContractError>;
    fn is_ready(&self) -> bool;

    fn first(&self) -> i64;
    /// Last valid index, or `None` for an infinite sequence.
    fn last(&self) -> Option<i64>;

    fn is_finite(&self) -> bool {
        self.last().is_some()
    }

    /// Number of entries, when finite.
    fn len(&self) -> Option<u64> {
        self.last()
            .map(|last| u64::try_from(i128::from(last) - i128::from(self.first()) + 1).unwrap_or(0))
    }

    fn get_element(&self, n: i64) -> Result<Element, SequenceError>;

    /// Prime factorization of entry `n`; `Ok(None)` when the entry cannot be
    /// factored.
    fn get_factors(&self, n: i64) -> Result<Option<Factorization>, SequenceError> {
        self.get_element(n).map(|value| simple_factor(&value))
    }

    /// Asynchronous preparation the host must await before entries are
    /// available. Most sequences need none.
    fn load(&self) -> Option<BoxFuture<'_, Result<(), FetchError>>> {
        None
    }
}

/// Whether a kind's entries are memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Entries are computed in index order and kept; `calculate` sees the
    /// earlier ones and runs once per index.
    Cached,
    /// Entries are cheap and independent; `calculate` runs on every read.
    Direct,
}

/// A concrete sequence family, wrapped by [`Configured`].
pub trait SequenceKind: KindInfo + Send + Sync + Sized + 'static {
    type Params: ParamSet + Send + Sync;

    const STORAGE: Storage = Storage::Cached;

    /// Cross-field rules beyond the per-parameter ones.
    fn check(_params: &Self::Params, _status: &mut ValidationStatus) {}

    fn build(params: Self::Params) -> Self;

    fn name(&self) -> String {
        Self::NAME.to_string()
    }

    fn first(&self) -> i64 {
        0
    }

    fn last(&self) -> Option<i64> {
        None
    }

    fn contains(&self, n: i64) -> bool {
        n >= self.first() && self.last().is_none_or(|last| n <= last)
    }

    fn calculate(&self, n: i64, known: &ElementCache) -> Result<Element, SequenceError>;

    /// Factorization of entry `n` whose value is `value`.
    fn factor(&self, _n: i64, value: &Element) -> Option<Factorization> {
        simple_factor(value)
    }
}

/// Index window every sequence accepts next to its own parameters. Blank
/// entries leave the kind's own range in place.
#[derive(Debug, Clone, Default, PartialEq, Params)]
pub struct Window {
    #[param(
        display = "First index",
        description = "first index of the sequence to use; blank for the first available"
    )]
    first: Option<i64>,
    #[param(
        display = "Last index",
        description = "last index of the sequence to use; blank or Infinity for the last available"
    )]
    last: Option<i64>,
    #[param(
        display = "Number of terms",
        description = "number of entries to use, counted from the first index"
    )]
    length: Option<i64>,
}

impl Window {
    pub(crate) fn first(&self, available: i64) -> i64 {
        self.first.map_or(available, |first| first.max(available))
    }

    fn own_last(&self, available_first: i64) -> Option<i64> {
        self.last.or_else(|| {
            self.length
                .map(|length| self.first(available_first).saturating_add(length - 1))
        })
    }

    pub(crate) fn last(&self, available_first: i64, available_last: Option<i64>) -> Option<i64> {
        match (self.own_last(available_first), available_last) {
            (Some(window), Some(available)) => Some(window.min(available)),
            (window, available) => window.or(available),
        }
    }

    pub(crate) fn admits(&self, n: i64, available_first: i64) -> bool {
        self.first.is_none_or(|first| n >= first)
            && self.own_last(available_first).is_none_or(|last| n <= last)
    }

    /// Checks the window against the kind's available range.
    pub(crate) fn check(
        &self,
        available_first: i64,
        available_last: Option<i64>,
        status: &mut ValidationStatus,
    ) {
        let first = self.first(available_first);
        if self.first.is_some_and(|first| first < available_first) {
            status.add_error(format!("First index available is {available_first}."));
        }
        let last = match (self.last, self.length) {
            (last, Some(length)) if length < 1 => {
                status.add_error("Number of terms must be positive.");
                last
            }
            (None, Some(length)) => {
                let last = first.checked_add(length - 1);
                status.forbid(last.is_none(), "Number of terms runs past the largest index.");
                last
            }
            (Some(last), Some(length)) => {
                status.forbid(
                    first.checked_add(length - 1) != Some(last),
                    "Number of terms disagrees with the first and last index.",
                );
                Some(last)
            }
            (last, None) => last,
        };
        if let Some(last) = last {
            status.forbid(last < first, "Last index comes before the first index.");
        }
        if let Some(available) = available_last {
            status.forbid(first > available, format!("Last index available is {available}."));
            if last.is_some_and(|last| last > available) {
                match self.length {
                    Some(_) if self.last.is_none() => status.add_error(format!(
                        "There are only {} terms available.",
                        i128::from(available) - i128::from(first) + 1
                    )),
                    _ => status.add_error(format!("Last index available is {available}.")),
                }
            }
        }
    }
}

/// Lifecycle and cache for a [`SequenceKind`].
pub struct Configured<K: SequenceKind> {
    id: SequenceId,
    settings: Settings,
    status: ValidationStatus,
    validated: Option<(K, Window)>,
    kind: Option<K>,
    window: Window,
    cache: Mutex<ElementCache>,
    factors: Mutex<HashMap<i64, Option<Factorization>>>,
}

impl<K: SequenceKind> Default for Configured<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SequenceKind> Configured<K> {
    pub fn new() -> Self {
        let (settings, _) = resolve(&Self::full_schema(), &RawParams::new());
        Self {
            id: SequenceId::next(),
            settings,
            status: ValidationStatus::error("not validated yet"),
            validated: None,
            kind: None,
            window: Window::default(),
            cache: Mutex::new(ElementCache::default()),
            factors: Mutex::new(HashMap::new()),
        }
    }

    /// The kind's own parameters followed by the [`Window`].
    fn full_schema() -> Vec<ParamSchema> {
        let mut schema = K::Params::schema();
        schema.extend(Window::schema());
        schema
    }

    /// Number of memoized entries.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn kind(&self) -> Option<&K> {
        self.kind.as_ref()
    }

    fn out_of_range(&self, n: i64) -> SequenceError {
        SequenceError::OutOfRange {
            n,
            first: self.first(),
            last: self.last(),
        }
    }

    fn read_cached(&self, kind: &K, n: i64) -> Result<Element, SequenceError> {
        let mut cache = self.cache.lock();
        if let Some(value) = cache.get(n) {
            return Ok(value.clone());
        }
        if cache.next_index().is_none_or(|next| n < next) {
            return Err(self.out_of_range(n));
        }
        let target = cache.growth_target(n, self.last())?;
        trace!(
            sequence = K::NAME,
            from = ?cache.next_index(),
            to = target,
            "extending element cache"
        );
        if let Err(e) = cache.fill_to(target, |i, known| kind.calculate(i, known)) {
            debug!(sequence = K::NAME, error = %e, "cache fill stopped early");
            if cache.get(n).is_none() {
                return Err(e);
            }
        }
        cache.value(n)
    }
}

impl<K: SequenceKind> Sequence for Configured<K> {
    fn id(&self) -> SequenceId {
        self.id
    }

    fn kind_name(&self) -> &'static str {
        K::NAME
    }

    fn name(&self) -> String {
        match &self.kind {
            Some(kind) => kind.name(),
            None => K::NAME.to_string(),
        }
    }

    fn description(&self) -> &'static str {
        K::DESCRIPTION
    }

    fn schema(&self) -> Vec<ParamSchema> {
        Self::full_schema()
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn validate(&mut self, raw: &RawParams) -> ValidationStatus {
        let (settings, mut status) = resolve(&Self::full_schema(), raw);
        self.settings = settings;
        self.validated = None;
        self.kind = None;
        if status.is_valid() {
            let parsed = K::Params::from_settings(&self.settings)
                .and_then(|params| Ok((params, Window::from_settings(&self.settings)?)));
            match parsed {
                Ok((params, window)) => {
                    K::check(&params, &mut status);
                    if status.is_valid() {
                        let kind = K::build(params);
                        window.check(kind.first(), kind.last(), &mut status);
                        if status.is_valid() {
                            self.validated = Some((kind, window));
                        }
                    }
                }
                Err(e) => status.add_error(e.to_string()),
            }
        }
        if !status.is_valid() {
            debug!(sequence = K::NAME, errors = ?status.errors, "sequence settings rejected");
        }
        self.status = status.clone();
        status
    }

    fn is_valid(&self) -> bool {
        self.status.is_valid()
    }

    fn initialize(&mut self) -> Result<(), ContractError> {
        if self.kind.is_some() {
            return Ok(());
        }
        let (kind, window) = self.validated.take().ok_or(ContractError::NotValidated {
            operation: "initialize",
        })?;
        *self.cache.lock() = ElementCache::new(kind.first());
        self.factors.lock().clear();
        debug!(sequence = K::NAME, id = %self.id, name = %kind.name(), "sequence initialized");
        self.kind = Some(kind);
        self.window = window;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.kind.is_some()
    }

    fn first(&self) -> i64 {
        self.kind.as_ref().map_or(0, |k| self.window.first(k.first()))
    }

    fn last(&self) -> Option<i64> {
        self.kind
            .as_ref()
            .and_then(|k| self.window.last(k.first(), k.last()))
    }

    fn get_element(&self, n: i64) -> Result<Element, SequenceError> {
        let Some(kind) = &self.kind else {
            return Err(SequenceError::NotReady);
        };
        if !self.window.admits(n, kind.first()) || !kind.contains(n) {
            return Err(self.out_of_range(n));
        }
        match K::STORAGE {
            Storage::Direct => kind.calculate(n, &ElementCache::new(n)),
            Storage::Cached => self.read_cached(kind, n),
        }
    }

    fn get_factors(&self, n: i64) -> Result<Option<Factorization>, SequenceError> {
        let value = self.get_element(n)?;
        let Some(kind) = &self.kind else {
            return Err(SequenceError::NotReady);
        };
        if let Some(factors) = self.factors.lock().get(&n) {
            return Ok(factors.clone());
        }
        let factors = kind.factor(n, &value);
        if factors.is_none() {
            trace!(sequence = K::NAME, n, "entry too large to factor");
        }
        self.factors.lock().insert(n, factors.clone());
        Ok(factors)
    }
}
