//! Transport state shared between the engine and its observers.
//!
//! The realtime engine publishes its musical position through plain
//! atomics once per callback; control-side observers (UI, host sync)
//! read a consistent-enough snapshot without locks.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::lockfree::{AtomicFlag, AtomicFloat};

/// Resolution of the published beat subdivision.
pub const TICKS_PER_BEAT: u32 = 1920;

/// Lock-free transport cell. One writer (the realtime engine), any
/// number of readers.
#[derive(Default)]
pub struct TransportInfo {
    rolling: AtomicFlag,
    finished: AtomicFlag,
    bar: AtomicU64,
    beat: AtomicU32,
    ticks: AtomicU32,
    tempo: AtomicFloat,
}

/// Point-in-time copy of the published transport state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSnapshot {
    pub rolling: bool,
    pub finished: bool,
    /// Bars elapsed since frame 0.
    pub bar: u64,
    /// Beat within the current bar.
    pub beat: u32,
    /// Subdivision within the beat, out of [`TICKS_PER_BEAT`].
    pub ticks: u32,
    /// Instantaneous tempo in BPM.
    pub tempo: f32,
}

impl TransportInfo {
    pub fn new(rolling: bool) -> Self {
        Self {
            rolling: AtomicFlag::new(rolling),
            ..Default::default()
        }
    }

    pub fn rolling(&self) -> bool {
        self.rolling.get()
    }

    pub fn set_rolling(&self, rolling: bool) {
        self.rolling.set(rolling);
    }

    pub fn finished(&self) -> bool {
        self.finished.get()
    }

    pub(crate) fn set_finished(&self, finished: bool) {
        self.finished.set(finished);
    }

    /// Publish the current position; called from the realtime thread.
    pub(crate) fn publish(&self, bar: u64, beat: u32, ticks: u32, tempo: f32) {
        self.bar.store(bar, Ordering::Relaxed);
        self.beat.store(beat, Ordering::Relaxed);
        self.ticks.store(ticks, Ordering::Relaxed);
        self.tempo.set(tempo);
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            rolling: self.rolling.get(),
            finished: self.finished.get(),
            bar: self.bar.load(Ordering::Relaxed),
            beat: self.beat.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            tempo: self.tempo.get(),
        }
    }
}
