//! Sequences whose entries come from an external source, such as the OEIS.
//!
//! The entries are fetched once, asynchronously, through a [`ValueFetcher`].
//! Until the fetch completes every read reports [`SequenceError::NotReady`].
//! Each new configuration starts a new generation, and a fetch that finishes
//! for an older generation is dropped.

use super::{Sequence, SequenceError, SequenceId, Window};
use crate::params::{ParamSchema, ParamSet, RawParams, Settings, positive, resolve};
use crate::types::{ContractError, Element};
use crate::validation::ValidationStatus;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no data found for {0}")]
    NotFound(String),
    #[error("fetch failed: {0}")]
    Failed(String),
    #[error("malformed data: {0}")]
    Malformed(String),
    #[error("an earlier fetch failed: {0}")]
    PreviouslyFailed(String),
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Entries delivered by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTerms {
    /// Index of the first entry.
    pub first: i64,
    pub values: Vec<Element>,
    /// Human readable name, when the source provides one.
    pub name: Option<String>,
}

pub trait ValueFetcher: Send + Sync {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<RemoteTerms, FetchError>>;
}

#[derive(Params)]
pub struct RemoteParams {
    #[param(
        display = "Sequence",
        description = "Identifier of the sequence to fetch, such as A000045",
        default = "A000045",
        required
    )]
    key: String,
    #[param(
        display = "Limit",
        description = "Keep at most this many entries",
        default = "10000",
        validate = positive
    )]
    limit: i64,
}

#[derive(Debug, Clone, PartialEq)]
enum LoadPhase {
    Idle,
    Loading,
    Loaded(RemoteTerms),
    Failed(String),
}

#[derive(Debug)]
struct LoadState {
    generation: u64,
    phase: LoadPhase,
}

pub struct RemoteSequence {
    id: SequenceId,
    fetcher: Arc<dyn ValueFetcher>,
    settings: Settings,
    status: ValidationStatus,
    validated: Option<(RemoteParams, Window)>,
    params: Option<RemoteParams>,
    window: Window,
    state: Mutex<LoadState>,
}

impl RemoteSequence {
    pub const NAME: &'static str = "OEIS Sequence";
    pub const DESCRIPTION: &'static str = "A sequence fetched from an external source by identifier";

    pub fn new(fetcher: Arc<dyn ValueFetcher>) -> Self {
        let (settings, _) = resolve(&Self::full_schema(), &RawParams::new());
        Self {
            id: SequenceId::next(),
            fetcher,
            settings,
            status: ValidationStatus::error("not validated yet"),
            validated: None,
            params: None,
            window: Window::default(),
            state: Mutex::new(LoadState {
                generation: 0,
                phase: LoadPhase::Idle,
            }),
        }
    }

    fn full_schema() -> Vec<ParamSchema> {
        let mut schema = RemoteParams::schema();
        schema.extend(Window::schema());
        schema
    }

    /// Abandons any fetch in flight; its result will be ignored.
    pub fn discard(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.phase = LoadPhase::Idle;
    }

    /// Message of the fetch failure, if the last fetch failed.
    pub fn failure(&self) -> Option<String> {
        match &self.state.lock().phase {
            LoadPhase::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state.lock().phase, LoadPhase::Loading)
    }

    /// Starts fetching. The generation is captured now, so a [`discard`]
    /// or reconfiguration before the returned future completes makes it a
    /// no-op.
    ///
    /// [`discard`]: RemoteSequence::discard
    pub fn start_load(&self) -> BoxFuture<'_, Result<(), FetchError>> {
        let Some(params) = &self.params else {
            let error = ContractError::OutOfOrder {
                operation: "load",
                phase: "uninitialized",
            };
            return Box::pin(std::future::ready(Err(error.into())));
        };
        let generation = {
            let mut state = self.state.lock();
            match &state.phase {
                LoadPhase::Loaded(_) => return Box::pin(std::future::ready(Ok(()))),
                LoadPhase::Failed(message) => {
                    let error = FetchError::PreviouslyFailed(message.clone());
                    return Box::pin(std::future::ready(Err(error)));
                }
                LoadPhase::Idle | LoadPhase::Loading => {}
            }
            state.phase = LoadPhase::Loading;
            state.generation
        };
        debug!(key = %params.key, generation, "fetching remote sequence");
        Box::pin(async move {
            let result = self.fetcher.fetch(&params.key).await;
            self.finish(generation, params, result)
        })
    }

    fn finish(
        &self,
        generation: u64,
        params: &RemoteParams,
        result: Result<RemoteTerms, FetchError>,
    ) -> Result<(), FetchError> {
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(key = %params.key, generation, "discarding stale fetch");
            return Ok(());
        }
        match result {
            Ok(mut terms) => {
                let limit = usize::try_from(params.limit).unwrap_or(usize::MAX);
                terms.values.truncate(limit);
                debug!(key = %params.key, entries = terms.values.len(), "remote sequence loaded");
                state.phase = LoadPhase::Loaded(terms);
                Ok(())
            }
            Err(e) => {
                warn!(key = %params.key, error = %e, "remote sequence fetch failed");
                state.phase = LoadPhase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn loaded_range(&self) -> Option<(i64, i64)> {
        match &self.state.lock().phase {
            LoadPhase::Loaded(terms) => Some((
                terms.first,
                terms.first.saturating_add(terms.values.len() as i64 - 1),
            )),
            _ => None,
        }
    }
}

impl Sequence for RemoteSequence {
    fn id(&self) -> SequenceId {
        self.id
    }

    fn kind_name(&self) -> &'static str {
        Self::NAME
    }

    fn name(&self) -> String {
        if let LoadPhase::Loaded(RemoteTerms {
            name: Some(name), ..
        }) = &self.state.lock().phase
        {
            return name.clone();
        }
        match &self.params {
            Some(params) => format!("OEIS {}", params.key),
            None => Self::NAME.to_string(),
        }
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
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
        self.params = None;
        self.discard();
        if status.is_valid() {
            let parsed = RemoteParams::from_settings(&self.settings)
                .and_then(|params| Ok((params, Window::from_settings(&self.settings)?)));
            match parsed {
                // The available range is only known after the fetch.
                Ok((params, window)) => {
                    window.check(i64::MIN, None, &mut status);
                    if status.is_valid() {
                        self.validated = Some((params, window));
                    }
                }
                Err(e) => status.add_error(e.to_string()),
            }
        }
        self.status = status.clone();
        status
    }

    fn is_valid(&self) -> bool {
        self.status.is_valid()
    }

    fn initialize(&mut self) -> Result<(), ContractError> {
        if self.params.is_some() {
            return Ok(());
        }
        let (params, window) = self.validated.take().ok_or(ContractError::NotValidated {
            operation: "initialize",
        })?;
        self.params = Some(params);
        self.window = window;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        matches!(self.state.lock().phase, LoadPhase::Loaded(_))
    }

    fn first(&self) -> i64 {
        self.window
            .first(self.loaded_range().map_or(0, |(first, _)| first))
    }

    fn last(&self) -> Option<i64> {
        self.loaded_range()
            .and_then(|(first, last)| self.window.last(first, Some(last)))
    }

    fn get_element(&self, n: i64) -> Result<Element, SequenceError> {
        let (first, last) = self.loaded_range().ok_or(SequenceError::NotReady)?;
        let out_of_range = SequenceError::OutOfRange {
            n,
            first: self.window.first(first),
            last: self.window.last(first, Some(last)),
        };
        if !self.window.admits(n, first) {
            return Err(out_of_range);
        }
        let state = self.state.lock();
        let LoadPhase::Loaded(terms) = &state.phase else {
            return Err(SequenceError::NotReady);
        };
        n.checked_sub(terms.first)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| terms.values.get(i))
            .cloned()
            .ok_or(out_of_range)
    }

    fn load(&self) -> Option<BoxFuture<'_, Result<(), FetchError>>> {
        Some(self.start_load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<RemoteTerms, FetchError>);

    impl ValueFetcher for Fixed {
        fn fetch<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<RemoteTerms, FetchError>> {
            Box::pin(std::future::ready(self.0.clone()))
        }
    }

    fn fibonacci() -> RemoteTerms {
        RemoteTerms {
            first: 0,
            values: [0, 1, 1, 2, 3, 5, 8, 13].map(Element::from).to_vec(),
            name: Some("Fibonacci numbers".to_string()),
        }
    }

    fn configured(fetcher: Fixed) -> RemoteSequence {
        let mut seq = RemoteSequence::new(Arc::new(fetcher));
        assert!(seq.validate(&RawParams::new()).is_valid());
        seq.initialize().unwrap();
        seq
    }

    #[tokio::test]
    async fn not_ready_until_loaded() {
        let seq = configured(Fixed(Ok(fibonacci())));
        assert_eq!(seq.get_element(0), Err(SequenceError::NotReady));
        seq.load().unwrap().await.unwrap();
        assert!(seq.is_ready());
        assert_eq!(seq.get_element(7), Ok(Element::from(13)));
        assert_eq!(seq.last(), Some(7));
        assert_eq!(seq.name(), "Fibonacci numbers");
    }

    #[tokio::test]
    async fn window_narrows_the_fetched_range() {
        let mut seq = RemoteSequence::new(Arc::new(Fixed(Ok(fibonacci()))));
        let raw: RawParams = [("first", "2"), ("length", "3")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(seq.validate(&raw).is_valid());
        seq.initialize().unwrap();
        seq.load().unwrap().await.unwrap();
        assert_eq!((seq.first(), seq.last()), (2, Some(4)));
        assert_eq!(seq.get_element(4), Ok(Element::from(3)));
        assert!(matches!(
            seq.get_element(5),
            Err(SequenceError::OutOfRange { first: 2, last: Some(4), .. })
        ));
    }

    #[tokio::test]
    async fn discarded_fetch_is_ignored() {
        let seq = configured(Fixed(Ok(fibonacci())));
        let pending = seq.start_load();
        seq.discard();
        pending.await.unwrap();
        assert!(!seq.is_ready());
        assert_eq!(seq.get_element(0), Err(SequenceError::NotReady));
    }

    #[tokio::test]
    async fn failure_is_permanent() {
        let seq = configured(Fixed(Err(FetchError::NotFound("A000045".to_string()))));
        assert!(seq.start_load().await.is_err());
        assert_eq!(seq.failure().as_deref(), Some("no data found for A000045"));
        assert!(matches!(
            seq.start_load().await,
            Err(FetchError::PreviouslyFailed(_))
        ));
        assert_eq!(seq.get_element(0), Err(SequenceError::NotReady));
    }

    #[tokio::test]
    async fn load_before_initialize_is_refused() {
        let seq = RemoteSequence::new(Arc::new(Fixed(Ok(fibonacci()))));
        assert!(matches!(
            seq.start_load().await,
            Err(FetchError::Contract(_))
        ));
    }
}
