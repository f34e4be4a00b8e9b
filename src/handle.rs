//! Fluent control handle for the running metronome.

use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::callback::EngineCommand;
use crate::lockfree::{AtomicFlag, AtomicFloat};
use crate::transport::{TransportInfo, TransportSnapshot};

/// Control surface over the realtime engine.
///
/// Created via `system.metronome()`. All methods are lock-free; they
/// flip shared atomics or enqueue commands the callback drains.
///
/// # Example
/// ```ignore
/// system.metronome()
///     .volume(0.7)
///     .start();
/// ```
#[derive(Clone)]
pub struct MetronomeHandle {
    active: Arc<AtomicFlag>,
    master: Arc<AtomicFloat>,
    transport: Arc<TransportInfo>,
    commands: Sender<EngineCommand>,
}

impl MetronomeHandle {
    pub(crate) fn new(
        active: Arc<AtomicFlag>,
        master: Arc<AtomicFloat>,
        transport: Arc<TransportInfo>,
        commands: Sender<EngineCommand>,
    ) -> Self {
        Self {
            active,
            master,
            transport,
            commands,
        }
    }

    /// Start clicking. After a stop the engine relocates to the current
    /// frame rather than resuming mid-beat.
    pub fn start(self) -> Self {
        self.active.set(true);
        self
    }

    /// Stop clicking; sounding voices drain out.
    pub fn stop(self) -> Self {
        self.active.set(false);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Master volume: 0.0 to 1.0.
    pub fn volume(self, volume: f32) -> Self {
        self.master.set(volume.clamp(0.0, 1.0));
        self
    }

    pub fn get_volume(&self) -> f32 {
        self.master.get()
    }

    /// Move the timeline to an absolute frame.
    pub fn seek(self, frame: u64) -> Self {
        let _ = self.commands.send(EngineCommand::Locate(frame));
        self
    }

    /// Mark the host transport as rolling (only meaningful with
    /// transport following enabled).
    pub fn roll(self) -> Self {
        self.transport.set_rolling(true);
        self
    }

    /// Mark the host transport as stopped.
    pub fn halt(self) -> Self {
        self.transport.set_rolling(false);
        self
    }

    /// True once a finite map has played out.
    pub fn is_finished(&self) -> bool {
        self.transport.finished()
    }

    /// Published musical position (bar, beat, ticks, tempo).
    pub fn position(&self) -> TransportSnapshot {
        self.transport.snapshot()
    }
}
