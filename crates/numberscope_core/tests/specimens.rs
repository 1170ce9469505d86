//! Specimens read from shared URLs and stored galleries.

use numberscope_core::specimen::{Specimen, SpecimenError};
use numberscope_core::surface::RecordingSurface;
use numberscope_core::{Element, Registry};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn first_terms(specimen: &Specimen, count: i64) -> Vec<Element> {
    let animation = specimen
        .instantiate(&Registry::standard(), Box::new(RecordingSurface::new(10.0, 10.0)))
        .unwrap_or_else(|e| panic!("{}: {e}", specimen.name));
    let sequence = animation.sequence();
    (0..count)
        .map(|n| sequence.get_element(n).expect("element"))
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn random_seed_reaches_the_sequence() {
    let query = "name=dice&viz=Turtle&seq=Random+Integers+in+Range&min=1&max=6&randomSeed=12345";
    let specimen = Specimen::from_query(query).unwrap();
    let again = Specimen::from_query(query).unwrap();
    let terms = first_terms(&specimen, 20);
    assert_eq!(terms, first_terms(&again, 20));
    let die = Element::from(1)..=Element::from(6);
    assert!(terms.iter().all(|t| die.contains(t)));
}

#[test]
fn explicit_seed_wins_over_random_seed() {
    let mut specimen =
        Specimen::from_query("viz=Turtle&seq=Random+Integers+in+Range&seed=1&randomSeed=2")
            .unwrap();
    let with_both = first_terms(&specimen, 10);
    specimen.random_seed = None;
    assert_eq!(with_both, first_terms(&specimen, 10));
}

#[test]
fn unknown_kinds_are_reported() {
    let specimen = Specimen::from_query("viz=Bogus&seq=Formula").unwrap();
    let err = specimen
        .instantiate(&Registry::standard(), Box::new(RecordingSurface::new(1.0, 1.0)))
        .err()
        .expect("unknown visualizer");
    assert!(matches!(err, SpecimenError::Registry(_)));
    assert_eq!(err.to_string(), "no visualizer named \"Bogus\"");
}

#[test]
fn galleries_are_json_lists() {
    let json = r#"[
        {
            "name": "Primes by six",
            "sequenceKind": "Formula",
            "sequenceParams": {"formula": "6*n + 1"},
            "visualizerKind": "Mod Fill",
            "visualizerParams": {"modDimension": "6"},
            "frames": 40
        },
        {
            "name": "Bare",
            "sequenceKind": "Natural Numbers",
            "visualizerKind": "Differences"
        }
    ]"#;
    let gallery: Vec<Specimen> = serde_json::from_str(json).unwrap();
    assert_eq!(gallery.len(), 2);
    assert_eq!(gallery[0].frames, Some(40));
    assert!(gallery[1].sequence_params.is_empty());
    for specimen in &gallery {
        let reparsed = Specimen::from_query(&specimen.to_query()).unwrap();
        assert_eq!(&reparsed, specimen);
        let mut animation = specimen
            .instantiate(&Registry::standard(), Box::new(RecordingSurface::new(60.0, 60.0)))
            .unwrap();
        assert!(animation.run().unwrap() <= 40);
    }
}
