//! Click sounds: immutable sample chunks and their synthesis.

use std::sync::Arc;

/// Immutable mono audio data. Chunks are loaded or synthesized on the
/// control thread and shared with the callback as opaque handles.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    samples: Vec<f32>,
    samplerate: u32,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, samplerate: u32) -> Self {
        Self {
            samples,
            samplerate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> u32 {
        self.samples.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samplerate(&self) -> u32 {
        self.samplerate
    }
}

/// The two click chunks the engine plays.
#[derive(Clone)]
pub struct ClickSounds {
    pub emphasis: Arc<AudioChunk>,
    pub normal: Arc<AudioChunk>,
}

impl ClickSounds {
    /// Synthesize the emphasis/normal pair: a short sine burst with a
    /// 1 ms attack, sustain to 20 ms and release to 30 ms.
    pub fn synthesize(samplerate: u32, freq_emphasis: f32, freq_normal: f32) -> Self {
        Self {
            emphasis: Arc::new(generate_click(samplerate, freq_emphasis)),
            normal: Arc::new(generate_click(samplerate, freq_normal)),
        }
    }
}

const CLICK_DURATION: f64 = 0.03;
const ATTACK_END: f64 = 0.001;
const SUSTAIN_END: f64 = 0.02;

fn generate_click(samplerate: u32, freq: f32) -> AudioChunk {
    let num_samples = (samplerate as f64 * CLICK_DURATION) as usize;

    let samples = (0..num_samples)
        .map(|i| {
            let t = i as f64 / samplerate as f64;
            let env = if t < ATTACK_END {
                t / ATTACK_END
            } else if t < SUSTAIN_END {
                1.0
            } else {
                1.0 - (t - SUSTAIN_END) / (CLICK_DURATION - SUSTAIN_END)
            };
            let phase = 2.0 * std::f64::consts::PI * freq as f64 * t;
            (phase.sin() * env) as f32
        })
        .collect();

    AudioChunk::new(samples, samplerate)
}
