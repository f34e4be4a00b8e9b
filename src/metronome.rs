//! Map-driven metronome engine.
//!
//! [`MetronomeMap`] consumes consecutive frame windows from the audio
//! boundary, pulls due ticks from its [`Position`] and turns them into
//! click playback requests. All of its state is owned by the realtime
//! thread; control happens through shared atomics and the command
//! channel in [`crate::callback`].

use std::sync::Arc;

use crate::click::ClickSounds;
use crate::config::MetronomeConfig;
use crate::lockfree::AtomicFlag;
use crate::mixer::ClickSink;
use crate::position::Position;
use crate::tempomap::BeatType;
use crate::transport::{TransportInfo, TICKS_PER_BEAT};

/// Capability contract the audio boundary drives once per callback.
pub trait Metronome: Send {
    /// Handle the frame window `[start, start + nframes)`.
    fn process(&mut self, start: u64, nframes: u32, sink: &mut dyn ClickSink);
}

/// Metronome playing a click track from a predefined tempo map.
pub struct MetronomeMap {
    pos: Position,
    /// Whether the cursor is in sync with the frame clock; cleared on
    /// seeks and while inactive so the next window relocates.
    located: bool,
    sounds: ClickSounds,
    gain_emphasis: f32,
    gain_normal: f32,
    active: Arc<AtomicFlag>,
    transport: Arc<TransportInfo>,
    transport_enabled: bool,
    transport_master: bool,
}

impl MetronomeMap {
    pub fn new(
        pos: Position,
        sounds: ClickSounds,
        config: &MetronomeConfig,
        active: Arc<AtomicFlag>,
        transport: Arc<TransportInfo>,
    ) -> Self {
        Self {
            pos,
            located: false,
            sounds,
            gain_emphasis: config.volume_emphasis,
            gain_normal: config.volume_normal,
            active,
            transport,
            transport_enabled: config.transport_enabled,
            transport_master: config.transport_master,
        }
    }

    /// Force a relocation at the start of the next processed window.
    pub fn relocate(&mut self) {
        self.located = false;
    }

    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// True once the cursor has passed the end of a finite map.
    pub fn finished(&self) -> bool {
        self.pos.end()
    }

    fn publish_position(&self, window_end: u64) {
        let (_, _, beat) = self.pos.location();
        let dist = self.pos.dist_to_next();
        let ticks = if dist.is_finite() && dist > 0.0 {
            let elapsed = (window_end as f64 - self.pos.tick().frame as f64) / dist;
            (elapsed.clamp(0.0, 1.0) * TICKS_PER_BEAT as f64) as u32
        } else {
            0
        };
        self.transport
            .publish(self.pos.bar_total(), beat, ticks, self.pos.current_tempo());
    }
}

impl Metronome for MetronomeMap {
    fn process(&mut self, start: u64, nframes: u32, sink: &mut dyn ClickSink) {
        let end = start + nframes as u64;

        if !self.active.get() || (self.transport_enabled && !self.transport.rolling()) {
            // Zero-work window; rejoin the frame clock when resumed.
            self.located = false;
            return;
        }

        if !self.located {
            self.pos.locate(start);
            self.located = true;
        }

        // The cursor rests on the last emitted tick; step it through every
        // tick that falls inside this window.
        while self.pos.next_frame() < end as f64 {
            self.pos.advance();
            if self.pos.end() {
                break;
            }
            let tick = self.pos.tick();
            debug_assert!(tick.frame >= start);
            if tick.beat_type == BeatType::Silent {
                continue;
            }
            let (chunk, gain) = match tick.beat_type {
                BeatType::Emphasis => (&self.sounds.emphasis, self.gain_emphasis),
                _ => (&self.sounds.normal, self.gain_normal),
            };
            sink.play(chunk, (tick.frame - start) as u32, tick.volume * gain);
        }

        self.transport.set_finished(self.pos.end());
        if self.transport_master {
            self.publish_position(end);
        }
    }
}
