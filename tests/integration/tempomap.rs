//! Tempo-map integration tests: grammar, round-trips, joining.

use tactus::{BeatType, EmphasisMode, Error, Tempo, TempoMap};

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::*;

/// Every surface feature of the grammar in one file.
#[test]
fn test_parse_full_grammar() {
    let map = test_map(
        "# session warm-up\n\
         count: 2 4/4 90 xxxx 0.66\n\
         verse: 8 4/4 120\n\
         build: 4 4/4 120-140\n\
         swing: 1 4/4 [110,150,110,150]\n\
         odd: 3 7/8 160 Xx.x.x. 0.9\n\
         out: * 2/2 70\n",
    );

    assert_eq!(map.len(), 6);
    assert_eq!(map[0].volume, 0.66);
    assert_eq!(
        map[2].tempo,
        Tempo::Ramp {
            from: 120.0,
            to: 140.0
        }
    );
    assert_eq!(map[3].tempo, Tempo::PerBeat(vec![110.0, 150.0, 110.0, 150.0]));
    assert_eq!((map[4].beats, map[4].denom), (7, 8));
    assert_eq!(map[4].pattern.len(), 7);
    assert_eq!(map[5].bars, None);
}

#[test]
fn test_dump_parse_round_trip() {
    let sources = [
        "* 120",
        "4 3/4 90.25 Xx. 0.8",
        "a: 2 4/4 60-120\nb: * 4/4 132",
        "1 2/4 [66.6,133.3]",
        "x: 1 1/1 42 .",
    ];
    for source in sources {
        let map = test_map(source);
        let reparsed = TempoMap::from_text(&map.dump())
            .unwrap_or_else(|e| panic!("dump of {:?} should reparse: {}", source, e));
        assert_eq!(map, reparsed, "round trip of {:?}", source);
    }
}

#[test]
fn test_cmdline_shorthand_equals_infinite_map() {
    let shorthand = TempoMap::from_cmdline("120").unwrap();
    let explicit = test_map("* 4/4 120");
    assert_eq!(shorthand, explicit);
}

#[test]
fn test_join_preserves_labels_and_order() {
    let head = test_map("a: 2 4/4 100\nb: 2 4/4 110");
    let tail = test_map("c: * 4/4 120");
    let joined = TempoMap::join(&head, &tail).unwrap();

    let labels: Vec<_> = joined
        .entries()
        .iter()
        .map(|e| e.label.as_deref().unwrap())
        .collect();
    assert_eq!(labels, vec!["a", "b", "c"]);
}

#[test]
fn test_join_rechecks_label_uniqueness() {
    let head = test_map("a: 2 4/4 100");
    let tail = test_map("a: * 4/4 120");
    assert!(matches!(
        TempoMap::join(&head, &tail),
        Err(Error::DuplicateLabel(_))
    ));
}

#[test]
fn test_parse_error_reports_location() {
    let result = TempoMap::from_text("* 120\n2 4/4 bogus\n");
    match result {
        Err(Error::Parse { line, column, .. }) => {
            assert_eq!(line, 2);
            assert_eq!(column, 7);
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_infinite_entry_must_be_last() {
    assert!(matches!(
        TempoMap::from_text("* 4/4 120\n2 4/4 100"),
        Err(Error::InfiniteNotLast)
    ));
}

#[test]
fn test_emphasis_override_round_trips_through_dump() {
    let map = test_map("2 4/4 120 X.x.").with_emphasis(EmphasisMode::All);
    assert_eq!(map[0].pattern, vec![BeatType::Emphasis; 4]);

    let reparsed = TempoMap::from_text(&map.dump()).unwrap();
    assert_eq!(map, reparsed);
}
