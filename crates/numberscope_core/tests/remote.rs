//! Remote sequences driven through the registry and an animation.

use numberscope_core::{Element, Registry};
use numberscope_core::params::RawParams;
use numberscope_core::sequence::remote::RemoteTerms;
use numberscope_core::sequence::{BoxFuture, FetchError, ValueFetcher};
use numberscope_core::specimen::Specimen;
use numberscope_core::surface::RecordingSurface;
use numberscope_core::visualizer::{Frame, Phase};
use parking_lot::Mutex;
use std::sync::Arc;

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Serves a fixed table and records the keys it was asked for.
#[derive(Default)]
struct Table {
    requests: Mutex<Vec<String>>,
}

impl ValueFetcher for Table {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<RemoteTerms, FetchError>> {
        self.requests.lock().push(key.to_string());
        let result = match key {
            "A000045" => Ok(RemoteTerms {
                first: 0,
                values: [0, 1, 1, 2, 3, 5, 8, 13, 21, 34].map(Element::from).to_vec(),
                name: Some("Fibonacci numbers".to_string()),
            }),
            "A000040" => Ok(RemoteTerms {
                first: 1,
                values: [2, 3, 5, 7, 11].map(Element::from).to_vec(),
                name: None,
            }),
            other => Err(FetchError::NotFound(other.to_string())),
        };
        Box::pin(async move {
            tokio::task::yield_now().await;
            result
        })
    }
}

fn registry(table: Arc<Table>) -> Registry {
    let mut registry = Registry::standard();
    registry.install_remote(table).expect("remote kind installed once");
    registry
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn animation_waits_for_the_fetch() {
    let table = Arc::new(Table::default());
    let registry = registry(table.clone());
    let specimen = Specimen::from_query("name=fib&viz=Mod+Fill&modDimension=4&seq=OEIS+Sequence")
        .expect("query parses");
    let mut animation = specimen
        .instantiate(&registry, Box::new(RecordingSurface::new(40.0, 40.0)))
        .expect("instantiate");

    assert_eq!(animation.step(), Ok(Frame::Waiting));
    assert_eq!(animation.visualizer().phase(), Phase::Initialized);

    animation.prepare().await.expect("fetch succeeds");
    assert_eq!(animation.sequence().name(), "Fibonacci numbers");
    assert_eq!(animation.run(), Ok(12));
    assert_eq!(animation.visualizer().phase(), Phase::Stopped);
    assert_eq!(*table.requests.lock(), vec!["A000045".to_string()]);
}

#[tokio::test]
async fn offset_and_limit_are_respected() {
    let registry = registry(Arc::new(Table::default()));
    let mut seq = registry.create_sequence("OEIS Sequence").unwrap();
    let status = seq.validate(
        &[("key", "A000040"), ("limit", "3")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<RawParams>(),
    );
    assert!(status.is_valid());
    seq.initialize().unwrap();
    seq.load().expect("remote sequences load").await.unwrap();
    assert_eq!(seq.first(), 1);
    assert_eq!(seq.last(), Some(3));
    assert_eq!(seq.get_element(3), Ok(Element::from(5)));
    assert!(seq.get_element(4).is_err());
    assert_eq!(seq.name(), "OEIS A000040");
}

#[tokio::test]
async fn unknown_key_fails_the_preparation() {
    let registry = registry(Arc::new(Table::default()));
    let specimen =
        Specimen::from_query("viz=Shift+Compare&seq=OEIS+Sequence&key=A999999").unwrap();
    let mut animation = specimen
        .instantiate(&registry, Box::new(RecordingSurface::new(8.0, 8.0)))
        .unwrap();
    assert_eq!(
        animation.prepare().await,
        Err(FetchError::NotFound("A999999".to_string()))
    );
    assert_eq!(animation.step(), Ok(Frame::Waiting));
}

#[test]
fn remote_kind_installs_once() {
    let mut registry = registry(Arc::new(Table::default()));
    assert!(registry.install_remote(Arc::new(Table::default())).is_err());
    assert_eq!(registry.sequences().count(), 9);
}
