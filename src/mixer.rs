//! Fixed-capacity click mixer for the realtime thread.

use std::sync::Arc;

use crate::click::AudioChunk;
use crate::lockfree::AtomicFloat;

/// Number of simultaneously sounding clicks. A ninth click overwrites
/// the oldest slot.
pub const MAX_VOICES: usize = 8;

/// Where the metronome engine sends its clicks.
///
/// The realtime implementation is [`Mixer`]; tests substitute recording
/// sinks.
pub trait ClickSink {
    /// Schedule `chunk` to start `offset` frames into the current window.
    fn play(&mut self, chunk: &Arc<AudioChunk>, offset: u32, volume: f32);
}

#[derive(Default)]
struct Voice {
    chunk: Option<Arc<AudioChunk>>,
    offset: u32,
    pos: u32,
    volume: f32,
}

/// Additive mixer over a ring of [`MAX_VOICES`] voices.
///
/// Owned exclusively by the realtime thread; `play` and `mix_into` run
/// without allocation or locking. The master volume is shared with the
/// control thread through an atomic.
pub struct Mixer {
    voices: [Voice; MAX_VOICES],
    next: usize,
    master: Arc<AtomicFloat>,
}

impl Mixer {
    pub fn new(master: Arc<AtomicFloat>) -> Self {
        Self {
            voices: Default::default(),
            next: 0,
            master,
        }
    }

    /// Add every active voice into `buffer`, advancing voice positions
    /// and releasing voices that have played out.
    pub fn mix_into(&mut self, buffer: &mut [f32]) {
        let nframes = buffer.len() as u32;
        let master = self.master.get();

        for voice in &mut self.voices {
            let Some(chunk) = &voice.chunk else {
                continue;
            };
            debug_assert!(voice.offset < nframes || nframes == 0);

            let offset = voice.offset.min(nframes);
            let len = (nframes - offset).min(chunk.len() - voice.pos);
            let gain = voice.volume * master;

            let src = &chunk.samples()[voice.pos as usize..(voice.pos + len) as usize];
            let dest = &mut buffer[offset as usize..(offset + len) as usize];
            for (d, s) in dest.iter_mut().zip(src) {
                *d += s * gain;
            }

            voice.pos += nframes - offset;
            voice.offset = 0;
            if voice.pos >= chunk.len() {
                voice.chunk = None;
            }
        }
    }

    /// True if any voice is still sounding.
    pub fn active(&self) -> bool {
        self.voices.iter().any(|v| v.chunk.is_some())
    }
}

impl ClickSink for Mixer {
    fn play(&mut self, chunk: &Arc<AudioChunk>, offset: u32, volume: f32) {
        self.voices[self.next] = Voice {
            chunk: Some(Arc::clone(chunk)),
            offset,
            pos: 0,
            volume,
        };
        self.next = (self.next + 1) % MAX_VOICES;
    }
}
