//! Position integration tests: the frame-domain cursor under constant,
//! ramped and per-beat tempi at 48 kHz.

use std::sync::Arc;

use tactus::{BeatType, Position, Preroll, TempoMap};

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::*;

fn tick_frames(pos: &mut Position, n: usize) -> Vec<u64> {
    (0..n)
        .map(|_| {
            pos.advance();
            pos.tick().frame
        })
        .collect()
}

#[test]
fn test_simple_infinite_map() {
    let mut pos = test_position("* 120");

    pos.advance();
    let first = pos.tick();
    assert_eq!(
        (first.frame, first.beat_type, first.volume),
        (0, BeatType::Emphasis, 1.0)
    );

    pos.advance();
    assert_eq!(pos.tick().frame, 24000);

    // Emphasis falls on every fourth beat.
    let mut pos = test_position("* 120");
    for i in 0..12 {
        pos.advance();
        let expected = if i % 4 == 0 {
            BeatType::Emphasis
        } else {
            BeatType::Normal
        };
        assert_eq!(pos.tick().beat_type, expected, "beat {}", i);
    }
}

#[test]
fn test_section_chain_duration() {
    // 4 bars of 4/4 at 60 then at 120: 768000 + 384000 frames.
    let mut pos = test_position("4 4/4 60\n4 4/4 120");
    let frames = tick_frames(&mut pos, 32);
    assert_eq!(frames[0], 0);
    assert_eq!(frames[16], 768_000);
    assert_eq!(*frames.last().unwrap(), 1_152_000 - 24_000);

    pos.advance();
    assert!(pos.end());
    assert_eq!(pos.tick().frame, 1_152_000);
    assert_eq!(pos.tick().beat_type, BeatType::Silent);
}

#[test]
fn test_locate_around_section_boundary() {
    let mut pos = test_position("4 4/4 60\n4 4/4 120");

    // A tick lies exactly at the boundary frame; it belongs to the
    // second section and is replayed because the hit is exact.
    pos.locate(768_000);
    assert_eq!(pos.location(), (1, 0, 0));
    pos.advance();
    assert_eq!(pos.tick().frame, 768_000);

    // One frame later the same tick is the last one at or before the
    // target, but no longer exact.
    pos.locate(768_001);
    assert_eq!(pos.location(), (1, 0, 0));
    pos.advance();
    assert_eq!(pos.tick().frame, 792_000);

    // Just before the boundary the cursor stays in the first section.
    pos.locate(767_999);
    assert_eq!(pos.location(), (0, 3, 3));
    assert_eq!(pos.bar_total(), 3);
}

#[test]
fn test_ramp_matches_log_mean_formula() {
    // 2 bars of 4/4 ramping 60->120: total seconds = 8 * 240 / (avg * 4)
    // with avg the logarithmic mean of the endpoints.
    let mut pos = test_position("2 4/4 60-120\n* 4/4 120");

    let avg = (60.0f64 - 120.0) / (60.0f64.ln() - 120.0f64.ln());
    let expected = 8.0 * 240.0 / (avg * 4.0) * TEST_SAMPLE_RATE as f64;

    let frames = tick_frames(&mut pos, 9);
    // Tick 8 falls at the exact end of the ramp section.
    assert!(
        (frames[8] as f64 - expected).abs() <= 1.0,
        "section end {} vs formula {}",
        frames[8],
        expected
    );
}

#[test]
fn test_ramp_beats_shorten_monotonically() {
    let mut pos = test_position("2 4/4 60-120");
    let frames = tick_frames(&mut pos, 8);
    let gaps: Vec<u64> = frames.windows(2).map(|w| w[1] - w[0]).collect();
    for pair in gaps.windows(2) {
        assert!(pair[1] < pair[0], "beats must get shorter: {:?}", gaps);
    }
}

#[test]
fn test_per_beat_tick_spacing() {
    let mut pos = test_position("1 4/4 [60,60,120,120]");
    let frames = tick_frames(&mut pos, 4);
    let gaps: Vec<u64> = frames.windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(gaps, vec![48000, 48000, 24000]);

    pos.advance();
    assert!(pos.end());
    assert_eq!(pos.tick().frame, 144_000);
}

#[test]
fn test_start_label_trims_leading_sections() {
    let map = Arc::new(test_map("intro: 1 4/4 100\nmain: * 4/4 120"));
    let mut pos = Position::new(map, 1.0, TEST_SAMPLE_RATE);
    pos.set_start_label("main").unwrap();

    pos.advance();
    assert_eq!(pos.tick().frame, 0);
    assert_eq!(pos.current_tempo(), 120.0);

    // The map is now infinite: it never ends.
    for _ in 0..64 {
        pos.advance();
    }
    assert!(!pos.end());
}

#[test]
fn test_two_beat_preroll_scenario() {
    let mut pos = test_position("* 4/4 120");
    pos.add_preroll(Preroll::TwoBeats).unwrap();

    pos.advance();
    let t0 = pos.tick();
    pos.advance();
    let t1 = pos.tick();
    pos.advance();
    let t2 = pos.tick();

    assert_eq!((t0.frame, t0.beat_type, t0.volume), (0, BeatType::Normal, 0.66));
    assert_eq!(
        (t1.frame, t1.beat_type, t1.volume),
        (24000, BeatType::Normal, 0.66)
    );
    assert_eq!(
        (t2.frame, t2.beat_type, t2.volume),
        (48000, BeatType::Emphasis, 1.0)
    );
}

#[test]
fn test_locate_consistency_across_tempo_kinds() {
    let text = "2 4/4 60\n2 4/4 60-120\n1 4/4 [60,60,120,120]\n* 3/4 90";
    let mut probe = test_position(text);
    for f in (0..2_000_000u64).step_by(37_507) {
        probe.locate(f);
        let tick = probe.tick();
        assert!(tick.frame <= f, "tick {} past target {}", tick.frame, f);
        assert!(
            probe.next_frame() > f as f64 || tick.frame == f,
            "no tick may hide in ({}, {}]",
            tick.frame,
            f
        );
    }
}

#[test]
fn test_locate_then_advance_never_goes_backwards() {
    let mut pos = test_position("2 4/4 60-120\n* 4/4 120");
    for f in [1u64, 10_000, 123_456, 500_000] {
        pos.locate(f);
        pos.advance();
        let first = pos.tick().frame;
        assert!(first >= f, "locate({}) then advance gave {}", f, first);
        pos.advance();
        let second = pos.tick().frame;
        assert!(second > first, "ticks after locate({}) must ascend", f);
    }
}

#[test]
fn test_multiplier_halves_distances() {
    let map = Arc::new(test_map("* 4/4 120"));
    let mut normal = Position::new(Arc::clone(&map), 1.0, TEST_SAMPLE_RATE);
    let mut double = Position::new(map, 2.0, TEST_SAMPLE_RATE);

    let a = tick_frames(&mut normal, 8);
    let b = tick_frames(&mut double, 8);
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(*x, 2 * y);
    }
}

#[test]
fn test_samplerate_doubles_distances() {
    let map = Arc::new(test_map("2 4/4 60-120"));
    let mut low = Position::new(Arc::clone(&map), 1.0, 48000);
    let mut high = Position::new(map, 1.0, 96000);

    for _ in 0..8 {
        low.advance();
        high.advance();
        assert!((high.dist_to_next() - 2.0 * low.dist_to_next()).abs() < 1e-9);
    }
}
