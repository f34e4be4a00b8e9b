//! Engine integration tests: window-driven click scheduling through the
//! full metronome path (position -> engine -> sink/mixer).

use std::sync::Arc;

use tactus::{
    AtomicFlag, AtomicFloat, ClickSounds, EmphasisMode, Metronome, MetronomeConfig, MetronomeMap,
    Mixer, Position, Preroll, TransportInfo,
};

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::*;

#[test]
fn test_click_schedule_is_window_size_invariant() {
    let text = "count: 2 4/4 90 xxxx 0.66\n2 4/4 60-120\n* 4/4 132 Xx.x";
    let config = MetronomeConfig::default();

    let (mut reference, sounds) = test_engine(text, &config);
    let mut expected = RecordingSink::new(&sounds);
    run_windows(&mut reference, &mut expected, 0, 1_500_000, 1_500_000);
    assert!(!expected.events.is_empty());

    for window in [48, TEST_WINDOW, 4096, 96_000] {
        let (mut engine, sounds) = test_engine(text, &config);
        let mut sink = RecordingSink::new(&sounds);
        run_windows(&mut engine, &mut sink, 0, 1_500_000, window);
        assert_eq!(expected.events, sink.events, "window size {}", window);
    }
}

#[test]
fn test_preroll_count_in_end_to_end() {
    let config = MetronomeConfig::default();
    let mut pos = Position::new(Arc::new(test_map("* 4/4 120")), 1.0, TEST_SAMPLE_RATE);
    pos.add_preroll(Preroll::TwoBeats).unwrap();

    let sounds = ClickSounds::synthesize(TEST_SAMPLE_RATE, 1200.0, 1000.0);
    let mut engine = MetronomeMap::new(
        pos,
        sounds.clone(),
        &config,
        Arc::new(AtomicFlag::new(true)),
        Arc::new(TransportInfo::new(true)),
    );
    let mut sink = RecordingSink::new(&sounds);
    run_windows(&mut engine, &mut sink, 0, 96_000, TEST_WINDOW);

    // Two normal count-in clicks at reduced volume, then the downbeat.
    assert_eq!(sink.frames()[..3], [0, 24_000, 48_000]);
    assert!(!sink.events[0].emphasis);
    assert_eq!(sink.events[0].volume, 0.66);
    assert!(!sink.events[1].emphasis);
    assert!(sink.events[2].emphasis);
    assert_eq!(sink.events[2].volume, 1.0);
}

#[test]
fn test_emphasis_override_flattens_accents() {
    let config = MetronomeConfig::default();
    let map = test_map("* 4/4 120").with_emphasis(EmphasisMode::None);
    let pos = Position::new(Arc::new(map), 1.0, TEST_SAMPLE_RATE);

    let sounds = ClickSounds::synthesize(TEST_SAMPLE_RATE, 1200.0, 1000.0);
    let mut engine = MetronomeMap::new(
        pos,
        sounds.clone(),
        &config,
        Arc::new(AtomicFlag::new(true)),
        Arc::new(TransportInfo::new(true)),
    );
    let mut sink = RecordingSink::new(&sounds);
    run_windows(&mut engine, &mut sink, 0, 96_000, TEST_WINDOW);

    assert_eq!(sink.events.len(), 4);
    assert!(sink.events.iter().all(|e| !e.emphasis));
}

#[test]
fn test_tempo_multiplier_doubles_click_rate() {
    let text = "* 4/4 120";
    let config = MetronomeConfig::default();
    let (mut engine, sounds) = test_engine(text, &config);
    let mut sink = RecordingSink::new(&sounds);
    run_windows(&mut engine, &mut sink, 0, 96_000, TEST_WINDOW);
    let normal_count = sink.events.len();

    let config = MetronomeConfig {
        tempo_multiplier: 2.0,
        ..Default::default()
    };
    let (mut engine, sounds) = test_engine(text, &config);
    let mut sink = RecordingSink::new(&sounds);
    run_windows(&mut engine, &mut sink, 0, 96_000, TEST_WINDOW);

    assert_eq!(sink.events.len(), normal_count * 2);
    assert_eq!(sink.frames()[1], 12_000);
}

#[test]
fn test_finite_map_plays_out_and_stops() {
    let config = MetronomeConfig::default();
    let (mut engine, sounds) = test_engine("2 4/4 120", &config);
    let mut sink = RecordingSink::new(&sounds);

    run_windows(&mut engine, &mut sink, 0, 400_000, TEST_WINDOW);

    assert_eq!(sink.events.len(), 8, "eight beats, then silence");
    assert!(engine.finished());
}

#[test]
fn test_engine_drives_mixer_voices() {
    // Full audio path: engine clicks scheduled into the real mixer and
    // rendered into a mono buffer.
    let config = MetronomeConfig::default();
    let (mut engine, _sounds) = test_engine("* 4/4 120", &config);
    let mut mixer = Mixer::new(Arc::new(AtomicFloat::new(1.0)));

    let mut rendered = vec![0.0f32; 48_000];
    for (i, window) in rendered.chunks_mut(4800).enumerate() {
        engine.process(i as u64 * 4800, 4800, &mut mixer);
        mixer.mix_into(window);
    }

    // Click onsets reach audible level shortly after each beat...
    assert!(rendered[30].abs() > 0.1);
    assert!(rendered[24_030].abs() > 0.1);
    // ...and the gaps between click tails stay silent.
    assert_eq!(rendered[12_000], 0.0);
    assert_eq!(rendered[40_000], 0.0);
}

#[test]
fn test_silent_pattern_never_reaches_the_sink() {
    let config = MetronomeConfig::default();
    let (mut engine, sounds) = test_engine("* 4/4 120 X...", &config);
    let mut sink = RecordingSink::new(&sounds);

    run_windows(&mut engine, &mut sink, 0, 192_000, TEST_WINDOW);

    assert_eq!(sink.frames(), vec![0, 96_000]);
    assert!(sink.events.iter().all(|e| e.emphasis));
}
